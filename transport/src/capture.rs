//! Readers for the two capture input formats the core accepts: a framed
//! binary format written by the pcap-to-bundle converter, and a hex-text
//! log format used for manually-annotated captures.

use std::io::{BufRead, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// From the responder (server).
	FromResponder,
	/// To the responder (client).
	ToResponder,
}

#[derive(Debug, Clone)]
pub struct CapturedBundle {
	pub direction: Direction,
	pub bytes: Vec<u8>,
}

/// Reads the framed binary format: `1 byte direction + 4 byte LE length +
/// N bytes raw bundle`, repeated to EOF.
pub struct FramedReader<R> {
	inner: R,
}

impl<R: Read> FramedReader<R> {
	pub fn new(inner: R) -> Self {
		Self { inner }
	}

	/// Reads the next frame, or `None` on clean EOF. A truncated trailing
	/// frame is logged and treated as EOF rather than an error.
	pub fn next_bundle(&mut self) -> Option<CapturedBundle> {
		let mut marker = [0u8; 1];
		match self.inner.read_exact(&mut marker) {
			Ok(()) => {}
			Err(_) => return None,
		}

		let direction = match marker[0] {
			b'<' => Direction::FromResponder,
			b'>' => Direction::ToResponder,
			other => {
				log::warn!("unrecognized capture direction marker: {other:#x}");
				return None;
			}
		};

		let mut len_buf = [0u8; 4];
		if self.inner.read_exact(&mut len_buf).is_err() {
			log::warn!("truncated capture frame: missing length");
			return None;
		}
		let len = u32::from_le_bytes(len_buf) as usize;

		let mut bytes = vec![0u8; len];
		if self.inner.read_exact(&mut bytes).is_err() {
			log::warn!("truncated capture frame: declared {len} bytes, fewer available");
			return None;
		}

		Some(CapturedBundle { direction, bytes })
	}
}

/// Reads the hex-text log format: one bundle per line, of the form
/// `YYYY-MM-DD HH:MM:SS.fff[<|>]<hex bytes>`.
pub struct HexLogReader<R> {
	lines: std::io::Lines<R>,
}

impl<R: BufRead> HexLogReader<R> {
	pub fn new(inner: R) -> Self {
		Self { lines: inner.lines() }
	}

	pub fn next_bundle(&mut self) -> Option<CapturedBundle> {
		loop {
			let line = self.lines.next()?.ok()?;
			if let Some(parsed) = parse_hex_log_line(&line) {
				return Some(parsed);
			}
			log::warn!("skipping unparsable capture log line");
		}
	}
}

fn parse_hex_log_line(line: &str) -> Option<CapturedBundle> {
	// Millisecond timestamp field is fixed-width: "YYYY-MM-DD HH:MM:SS.fff".
	const TIMESTAMP_LEN: usize = 23;
	if line.len() < TIMESTAMP_LEN + 1 {
		return None;
	}
	let marker = line.as_bytes()[TIMESTAMP_LEN];
	let direction = match marker {
		b'<' => Direction::FromResponder,
		b'>' => Direction::ToResponder,
		_ => return None,
	};
	let hex = &line[TIMESTAMP_LEN + 1..];
	let bytes = decode_hex(hex)?;
	Some(CapturedBundle { direction, bytes })
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
	let hex = hex.trim();
	if hex.len() % 2 != 0 {
		return None;
	}
	(0..hex.len())
		.step_by(2)
		.map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn reads_framed_bundles() {
		let mut buf = Vec::new();
		buf.push(b'<');
		buf.extend_from_slice(&3u32.to_le_bytes());
		buf.extend_from_slice(b"abc");
		buf.push(b'>');
		buf.extend_from_slice(&2u32.to_le_bytes());
		buf.extend_from_slice(b"xy");

		let mut reader = FramedReader::new(Cursor::new(buf));
		let first = reader.next_bundle().unwrap();
		assert_eq!(first.direction, Direction::FromResponder);
		assert_eq!(first.bytes, b"abc");

		let second = reader.next_bundle().unwrap();
		assert_eq!(second.direction, Direction::ToResponder);
		assert_eq!(second.bytes, b"xy");

		assert!(reader.next_bundle().is_none());
	}

	#[test]
	fn parses_hex_log_line() {
		let line = "2024-01-01 12:00:00.000<deadbeef";
		let parsed = parse_hex_log_line(line).unwrap();
		assert_eq!(parsed.direction, Direction::FromResponder);
		assert_eq!(parsed.bytes, vec![0xDE, 0xAD, 0xBE, 0xEF]);
	}

	#[test]
	fn reads_multiple_hex_log_lines() {
		let text = "2024-01-01 12:00:00.000<ab\n2024-01-01 12:00:00.001>cd\n";
		let mut reader = HexLogReader::new(Cursor::new(text.as_bytes()));
		assert_eq!(reader.next_bundle().unwrap().bytes, vec![0xAB]);
		assert_eq!(reader.next_bundle().unwrap().bytes, vec![0xCD]);
		assert!(reader.next_bundle().is_none());
	}
}
