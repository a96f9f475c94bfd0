//! Extracts discrete application packets (bundles) from a byte stream,
//! resynchronizing on garbage and inflating compressed bodies.

use flate2::read::ZlibDecoder;
use std::io::Read;

use wire::bundle::{BundleHeader, SIZE as HEADER_SIZE};

/// One packet emitted by the reframer: either a complete bundle, or a
/// single-byte diagnostic produced while resynchronizing on a bad
/// signature.
#[derive(Debug, Clone)]
pub enum Framed {
	Bundle(Vec<u8>),
	Diagnostic(u8),
}

#[derive(Debug, Default)]
pub struct Reframer {
	buf: Vec<u8>,
}

impl Reframer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends newly-available bytes and drains as many complete packets as
	/// the buffer allows. Remaining bytes are retained as leftover for the
	/// next call.
	pub fn feed(&mut self, bytes: &[u8]) -> Vec<Framed> {
		self.buf.extend_from_slice(bytes);

		let mut out = Vec::new();
		loop {
			if self.buf.len() < HEADER_SIZE {
				break;
			}

			let magic: [u8; 16] = self.buf[..16].try_into().unwrap();
			if !BundleHeader::is_recognized_signature(&magic) {
				out.push(Framed::Diagnostic(self.buf.remove(0)));
				continue;
			}

			let header = match BundleHeader::decode(&self.buf) {
				Some(header) => header,
				None => break, // truncated header; wait for more bytes
			};

			let size = header.size as usize;
			if size < HEADER_SIZE || self.buf.len() < size {
				break; // declared size does not fit yet
			}

			let bundle = self.buf.drain(..size).collect();
			out.push(Framed::Bundle(bundle));
		}

		out
	}
}

/// Decompresses a bundle's body if `header.is_deflated()`, otherwise
/// returns it unchanged. Inflate failure is non-fatal: the caller is
/// expected to drop the bundle and log a diagnostic.
pub fn decompress_body(header: &BundleHeader, body: &[u8]) -> Option<Vec<u8>> {
	if !header.is_deflated() {
		return Some(body.to_vec());
	}

	let mut decoder = ZlibDecoder::new(body);
	let mut out = Vec::new();
	decoder.read_to_end(&mut out).ok()?;
	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use wire::bundle::{COMPRESSION_NONE, COMPRESSION_ZLIB, SIGNATURE_1};

	fn bundle_bytes(body: &[u8], compression: u8) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&SIGNATURE_1);
		let total = (HEADER_SIZE + body.len()) as u32;
		buf.extend_from_slice(&total.to_le_bytes());
		buf.extend_from_slice(&0u64.to_le_bytes()); // timestamp
		buf.push(compression);
		buf.push(0); // reserved
		buf.extend_from_slice(&1u16.to_le_bytes()); // message_count
		buf.extend_from_slice(body);
		buf
	}

	#[test]
	fn resyncs_on_garbage_then_emits_bundle() {
		let mut reframer = Reframer::new();
		let bundle = bundle_bytes(b"hello", COMPRESSION_NONE);
		let mut stream = vec![0xAA, 0xBB];
		stream.extend_from_slice(&bundle);

		let framed = reframer.feed(&stream);
		assert!(matches!(framed[0], Framed::Diagnostic(0xAA)));
		assert!(matches!(framed[1], Framed::Diagnostic(0xBB)));
		match &framed[2] {
			Framed::Bundle(bytes) => assert_eq!(bytes, &bundle),
			other => panic!("expected bundle, got {other:?}"),
		}
	}

	#[test]
	fn waits_for_more_bytes_when_short() {
		let mut reframer = Reframer::new();
		let bundle = bundle_bytes(b"hello", COMPRESSION_NONE);
		let framed = reframer.feed(&bundle[..bundle.len() - 1]);
		assert!(framed.is_empty());
	}

	#[test]
	fn decompresses_deflated_body() {
		use flate2::write::ZlibEncoder;
		use flate2::Compression;
		use std::io::Write;

		let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
		encoder.write_all(b"plain message bytes").unwrap();
		let compressed = encoder.finish().unwrap();

		let bundle = bundle_bytes(&compressed, COMPRESSION_ZLIB);
		let header = BundleHeader::decode(&bundle).unwrap();
		let body = &bundle[HEADER_SIZE..];
		let decompressed = decompress_body(&header, body).unwrap();
		assert_eq!(decompressed, b"plain message bytes");
	}
}
