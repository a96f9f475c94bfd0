//! Minimal IPv4 + TCP header parsing. Captures are assumed to use raw IP
//! framing (no link-layer header), matching a `Linktype::RAW` pcap
//! convention.

use std::net::Ipv4Addr;

use util::cursor::Cursor;

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpFlags {
	pub syn: bool,
	pub ack: bool,
	pub fin: bool,
	pub rst: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
	pub addr: Ipv4Addr,
	pub port: u16,
}

/// One reassembled TCP segment, stripped of its IP/TCP headers.
#[derive(Debug, Clone)]
pub struct TcpSegment {
	pub src: Endpoint,
	pub dst: Endpoint,
	pub seq: u32,
	pub flags: TcpFlags,
	pub payload: Vec<u8>,
}

impl TcpSegment {
	/// `next_seq` is the sequence number one past the end of this segment's
	/// payload; for segments carrying SYN or FIN, the protocol counts the
	/// control bit itself as consuming one sequence number.
	pub fn next_seq(&self) -> u32 {
		let control = u32::from(self.flags.syn) + u32::from(self.flags.fin);
		self.seq.wrapping_add(self.payload.len() as u32).wrapping_add(control)
	}
}

/// Parses one raw IP packet (IPv4 only) into a [`TcpSegment`]. Non-IPv4,
/// non-TCP, or truncated input is not a segment — the caller skips it
/// rather than treating it as an error.
pub fn parse_ipv4_tcp(buf: &[u8]) -> Option<TcpSegment> {
	let mut c = Cursor::new(buf);
	let ver_ihl = c.u8()?;
	if ver_ihl >> 4 != 4 {
		return None; // not IPv4
	}
	let ihl = (ver_ihl & 0x0F) as usize * 4;
	c.skip(1)?; // tos
	let total_len = c.u16()? as usize;
	c.skip(4)?; // id
	let frag = c.u16()?;
	if frag & 0x1FFF != 0 {
		return None; // fragmented; not supported
	}
	c.skip(1)?; // ttl
	let protocol = c.u8()?;
	if protocol != 6 {
		return None; // not TCP
	}
	c.skip(2)?; // header checksum
	let src_bytes = c.bytes(4)?;
	let dst_bytes = c.bytes(4)?;
	let src_addr = Ipv4Addr::new(src_bytes[0], src_bytes[1], src_bytes[2], src_bytes[3]);
	let dst_addr = Ipv4Addr::new(dst_bytes[0], dst_bytes[1], dst_bytes[2], dst_bytes[3]);
	if ihl > 20 {
		c.skip(ihl - 20)?; // options
	}

	let tcp_start = buf.get(ihl..total_len.min(buf.len()))?;
	let mut t = Cursor::new(tcp_start);
	let src_port = t.u16()?;
	let dst_port = t.u16()?;
	let seq = t.u32()?;
	t.skip(4)?; // ack
	let data_offset_flags = t.u16()?;
	let data_offset = ((data_offset_flags >> 12) & 0x0F) as usize * 4;
	let flags = TcpFlags {
		fin: data_offset_flags & 0x01 != 0,
		syn: data_offset_flags & 0x02 != 0,
		rst: data_offset_flags & 0x04 != 0,
		ack: data_offset_flags & 0x10 != 0,
	};
	t.skip(2)?; // window
	t.skip(2)?; // checksum
	t.skip(2)?; // urgent pointer

	let payload = tcp_start.get(data_offset..)?.to_vec();

	Some(TcpSegment {
		src: Endpoint { addr: src_addr, port: src_port },
		dst: Endpoint { addr: dst_addr, port: dst_port },
		seq,
		flags,
		payload,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build_packet(seq: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
		let total_len = 20 + 20 + payload.len();
		let mut buf = vec![0u8; total_len];
		buf[0] = 0x45; // version 4, IHL 5
		buf[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
		buf[9] = 6; // TCP
		buf[12..16].copy_from_slice(&[10, 0, 0, 1]);
		buf[16..20].copy_from_slice(&[10, 0, 0, 2]);
		let tcp = &mut buf[20..];
		tcp[0..2].copy_from_slice(&1234u16.to_be_bytes());
		tcp[2..4].copy_from_slice(&80u16.to_be_bytes());
		tcp[4..8].copy_from_slice(&seq.to_be_bytes());
		tcp[12..14].copy_from_slice(&((5u16 << 12) | flags as u16).to_be_bytes());
		tcp[20..].copy_from_slice(payload);
		buf
	}

	#[test]
	fn parses_payload_and_flags() {
		let buf = build_packet(1000, 0x02, b"hi"); // SYN
		let segment = parse_ipv4_tcp(&buf).unwrap();
		assert!(segment.flags.syn);
		assert_eq!(segment.seq, 1000);
		assert_eq!(segment.payload, b"hi");
		assert_eq!(segment.src.port, 1234);
	}

	#[test]
	fn next_seq_accounts_for_syn() {
		let buf = build_packet(1000, 0x02, b"");
		let segment = parse_ipv4_tcp(&buf).unwrap();
		assert_eq!(segment.next_seq(), 1001);
	}

	#[test]
	fn rejects_non_ipv4() {
		let mut buf = build_packet(1000, 0, b"x");
		buf[0] = 0x60; // version 6
		assert!(parse_ipv4_tcp(&buf).is_none());
	}
}
