//! The outermost envelope: one bundle per application packet, carrying zero
//! or more messages and an optional zlib-compressed body.

use util::cursor::Cursor;

/// One of the two magic values a bundle's signature may carry. Real capture
/// revisions rotate this value; both are accepted uniformly by the
/// reframer.
pub const SIGNATURE_1: [u8; 16] = *b"BNDL_MAGIC_ONE!!";
pub const SIGNATURE_2: [u8; 16] = *b"BNDL_MAGIC_TWO!!";

/// No compression; the body follows the header byte-for-byte.
pub const COMPRESSION_NONE: u8 = 0;
/// The body is zlib-deflated and must be inflated before framing messages
/// out of it.
pub const COMPRESSION_ZLIB: u8 = 1;

/// `magic(16) + size(4) + timestamp(8) + compression(1) + reserved(1) + message_count(2)`.
pub const SIZE: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct BundleHeader {
	pub magic: [u8; 16],
	/// Total length of the bundle, header included.
	pub size: u32,
	/// Milliseconds since the UNIX epoch.
	pub timestamp: u64,
	pub compression: u8,
	pub message_count: u16,
}

impl BundleHeader {
	pub fn is_recognized_signature(magic: &[u8; 16]) -> bool {
		*magic == SIGNATURE_1 || *magic == SIGNATURE_2
	}

	pub fn is_deflated(&self) -> bool {
		self.compression == COMPRESSION_ZLIB
	}

	/// Decodes a header from the front of `buf`. Does not validate the
	/// signature — callers that care about resynchronization check
	/// [`Self::is_recognized_signature`] on the raw bytes before committing
	/// to a decode, since a malformed signature should advance by one byte,
	/// not consume a whole header's worth.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let mut c = Cursor::new(buf);
		let magic: [u8; 16] = c.bytes(16)?.try_into().ok()?;
		let size = c.u32()?;
		let timestamp = c.u64()?;
		let compression = c.u8()?;
		c.skip(1)?; // reserved
		let message_count = c.u16()?;
		Some(Self { magic, size, timestamp, compression, message_count })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn header_bytes(sig: [u8; 16], size: u32, compression: u8, message_count: u16) -> Vec<u8> {
		let mut buf = Vec::with_capacity(SIZE);
		buf.extend_from_slice(&sig);
		buf.extend_from_slice(&size.to_le_bytes());
		buf.extend_from_slice(&1234u64.to_le_bytes());
		buf.push(compression);
		buf.push(0);
		buf.extend_from_slice(&message_count.to_le_bytes());
		buf
	}

	#[test]
	fn decodes_recognized_header() {
		let buf = header_bytes(SIGNATURE_1, 64, COMPRESSION_ZLIB, 3);
		let header = BundleHeader::decode(&buf).unwrap();
		assert_eq!(header.size, 64);
		assert_eq!(header.timestamp, 1234);
		assert!(header.is_deflated());
		assert_eq!(header.message_count, 3);
		assert!(BundleHeader::is_recognized_signature(&header.magic));
	}

	#[test]
	fn rejects_truncated_header() {
		let buf = header_bytes(SIGNATURE_1, 64, COMPRESSION_NONE, 1);
		assert!(BundleHeader::decode(&buf[..SIZE - 1]).is_none());
	}
}
