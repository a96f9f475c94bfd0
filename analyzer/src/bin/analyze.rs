//! Thin example binary: reads one capture file and logs the resulting
//! actor/effect/chat state. It exists to exercise the library the way a
//! reader would actually run it, not as the CLI front end (argument
//! parsing, output formatting for a real tool) that is out of scope.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use analyzer::Analyzer;
use transport::capture::{FramedReader, HexLogReader};

fn main() -> ExitCode {
	env_logger::init();

	let mut args = env::args().skip(1);
	let Some(path) = args.next() else {
		eprintln!("usage: analyze <capture-file> [--hex-log]");
		return ExitCode::FAILURE;
	};
	let hex_log = args.any(|arg| arg == "--hex-log");

	let file = match File::open(&path) {
		Ok(file) => file,
		Err(err) => {
			eprintln!("failed to open {path}: {err}");
			return ExitCode::FAILURE;
		}
	};

	let mut analyzer = Analyzer::with_overrides(&Default::default(), &Default::default());
	let mut bundle_count = 0usize;

	if hex_log {
		let mut reader = HexLogReader::new(BufReader::new(file));
		while let Some(bundle) = reader.next_bundle() {
			analyzer.feed_captured(&bundle);
			bundle_count += 1;
		}
	} else {
		let mut reader = FramedReader::new(file);
		while let Some(bundle) = reader.next_bundle() {
			analyzer.feed_captured(&bundle);
			bundle_count += 1;
		}
	}

	log::info!("processed {bundle_count} bundles");
	for record in analyzer.chat().borrow().records() {
		println!("[{:?}] {}: {}", record.channel, record.from_name, record.message);
	}
	for event in analyzer.effects().borrow().events() {
		println!("effect {} -> {}: {}", event.source_actor_id, event.target_actor_id, event.signed_amount);
	}

	ExitCode::SUCCESS
}
