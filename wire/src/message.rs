//! The per-message header embedded in a bundle's body, and its IPC
//! extension.

use util::cursor::Cursor;

/// `size(4) + source_actor_id(4) + target_actor_id(4) + type(2)`.
pub const SIZE: usize = 14;

/// The common message `type` tag that marks an IPC message; every other
/// value is an unrelated session-management message the core does not
/// decode further.
pub const TYPE_IPC: u16 = 3;

/// The fixed `type1` value an IPC message header must carry.
pub const TYPE1_IPC: u16 = 0x14;

/// `type1(2) + opcode(2) + server_epoch(4)`, appended after [`SIZE`] when
/// `type == TYPE_IPC`.
pub const IPC_EXT_SIZE: usize = 8;

pub const IPC_HEADER_SIZE: usize = SIZE + IPC_EXT_SIZE;

#[derive(Debug, Clone, Copy)]
pub struct MessageHeader {
	/// Total length of this message, including this header.
	pub size: u32,
	pub source_actor_id: u32,
	pub target_actor_id: u32,
	pub kind: u16,
}

impl MessageHeader {
	pub fn is_ipc(&self) -> bool {
		self.kind == TYPE_IPC
	}

	pub fn decode(buf: &[u8]) -> Option<Self> {
		let mut c = Cursor::new(buf);
		let size = c.u32()?;
		let source_actor_id = c.u32()?;
		let target_actor_id = c.u32()?;
		let kind = c.u16()?;
		Some(Self { size, source_actor_id, target_actor_id, kind })
	}
}

/// The extended header carried by IPC messages, combining the common
/// fields with the opcode and server timestamp.
#[derive(Debug, Clone, Copy)]
pub struct IpcHeader {
	pub size: u32,
	pub source_actor_id: u32,
	pub target_actor_id: u32,
	pub opcode: u16,
	pub server_epoch: u32,
}

impl IpcHeader {
	/// Decodes the full IPC header, validating that `kind == TYPE_IPC` and
	/// `type1 == TYPE1_IPC`. Returns `None` (not an error the caller must
	/// log — the dispatcher treats a non-IPC or malformed message header as
	/// "skip this message") on any mismatch or truncation.
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let common = MessageHeader::decode(buf)?;
		if !common.is_ipc() {
			return None;
		}

		let mut c = Cursor::new(buf.get(SIZE..)?);
		let type1 = c.u16()?;
		if type1 != TYPE1_IPC {
			return None;
		}
		let opcode = c.u16()?;
		let server_epoch = c.u32()?;

		Some(Self {
			size: common.size,
			source_actor_id: common.source_actor_id,
			target_actor_id: common.target_actor_id,
			opcode,
			server_epoch,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ipc_bytes(size: u32, opcode: u16) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&size.to_le_bytes());
		buf.extend_from_slice(&0xAABBCCDDu32.to_le_bytes());
		buf.extend_from_slice(&0x1122_3344u32.to_le_bytes());
		buf.extend_from_slice(&TYPE_IPC.to_le_bytes());
		buf.extend_from_slice(&TYPE1_IPC.to_le_bytes());
		buf.extend_from_slice(&opcode.to_le_bytes());
		buf.extend_from_slice(&99u32.to_le_bytes());
		buf
	}

	#[test]
	fn decodes_ipc_header() {
		let buf = ipc_bytes(IPC_HEADER_SIZE as u32, 0x00F0);
		let header = IpcHeader::decode(&buf).unwrap();
		assert_eq!(header.opcode, 0x00F0);
		assert_eq!(header.source_actor_id, 0xAABBCCDD);
		assert_eq!(header.target_actor_id, 0x1122_3344);
		assert_eq!(header.server_epoch, 99);
	}

	#[test]
	fn rejects_non_ipc_type() {
		let mut buf = ipc_bytes(IPC_HEADER_SIZE as u32, 1);
		buf[12..14].copy_from_slice(&7u16.to_le_bytes());
		assert!(IpcHeader::decode(&buf).is_none());
	}

	#[test]
	fn rejects_bad_type1() {
		let mut buf = ipc_bytes(IPC_HEADER_SIZE as u32, 1);
		buf[14..16].copy_from_slice(&0u16.to_le_bytes());
		assert!(IpcHeader::decode(&buf).is_none());
	}
}
