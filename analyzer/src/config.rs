//! Loads the opcode override map from a small `name=number` text format.
//!
//! Unlike the core's internal decode errors (§7 of the design notes: local,
//! recoverable, logged-and-discarded), a malformed override file is a
//! caller-facing mistake — the caller configured the wrong protocol
//! revision file — so this surface reports a structured reason instead of
//! silently dropping lines.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// `line` is 1-indexed.
	MalformedLine { line: usize, text: String },
	InvalidOpcode { line: usize, value: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::MalformedLine { line, text } => {
				write!(f, "line {line}: expected `name=opcode`, got {text:?}")
			}
			ConfigError::InvalidOpcode { line, value } => {
				write!(f, "line {line}: {value:?} is not a valid u16 opcode")
			}
		}
	}
}

impl std::error::Error for ConfigError {}

/// Parses `name=opcode` lines, one override per line. Opcode values may be
/// written as decimal or `0x`-prefixed hex. Blank lines and lines starting
/// with `#` are skipped.
pub fn parse_overrides(text: &str) -> Result<HashMap<String, u16>, ConfigError> {
	let mut overrides = HashMap::new();
	for (index, raw_line) in text.lines().enumerate() {
		let line_no = index + 1;
		let line = raw_line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		let Some((name, value)) = line.split_once('=') else {
			return Err(ConfigError::MalformedLine { line: line_no, text: raw_line.to_string() });
		};
		let name = name.trim();
		let value = value.trim();
		if name.is_empty() {
			return Err(ConfigError::MalformedLine { line: line_no, text: raw_line.to_string() });
		}
		let opcode = parse_opcode(value)
			.ok_or_else(|| ConfigError::InvalidOpcode { line: line_no, value: value.to_string() })?;
		overrides.insert(name.to_string(), opcode);
	}
	Ok(overrides)
}

fn parse_opcode(value: &str) -> Option<u16> {
	if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		u16::from_str_radix(hex, 16).ok()
	} else {
		value.parse().ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_decimal_and_hex_values() {
		let text = "ActorStats=96\nActorSpawn=0x0064\n# a comment\n\n";
		let overrides = parse_overrides(text).unwrap();
		assert_eq!(overrides.get("ActorStats"), Some(&96));
		assert_eq!(overrides.get("ActorSpawn"), Some(&0x0064));
	}

	#[test]
	fn rejects_line_without_equals() {
		let err = parse_overrides("ActorStats 96").unwrap_err();
		assert!(matches!(err, ConfigError::MalformedLine { line: 1, .. }));
	}

	#[test]
	fn rejects_non_numeric_opcode() {
		let err = parse_overrides("ActorStats=not_a_number").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidOpcode { line: 1, .. }));
	}
}
