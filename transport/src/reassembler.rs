//! Reconstructs a strictly contiguous, per-direction byte stream from a
//! sequence of (possibly out-of-order, possibly retransmitted) TCP
//! segments.

use std::collections::HashMap;

use crate::segment::{Endpoint, TcpSegment};

/// An unordered pair of endpoints, canonicalized so both directions of one
/// connection map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
	lo: Endpoint,
	hi: Endpoint,
}

impl ConnectionKey {
	fn new(a: Endpoint, b: Endpoint) -> Self {
		if (a.addr, a.port) <= (b.addr, b.port) {
			Self { lo: a, hi: b }
		} else {
			Self { lo: b, hi: a }
		}
	}
}

#[derive(Debug, Default)]
struct ConnectionStream {
	/// `None` until the first in-order segment (typically the SYN) is
	/// observed on this side.
	expected_seq: Option<u32>,
	pending: HashMap<u32, (Vec<u8>, u32)>,
	fin_seen: bool,
}

impl ConnectionStream {
	/// Stores the segment and drains every now-contiguous run starting at
	/// `expected_seq`, returning the concatenated bytes if any were
	/// emitted.
	fn feed(&mut self, segment: &TcpSegment) -> Option<Vec<u8>> {
		if segment.flags.syn && self.expected_seq.is_none() {
			self.expected_seq = Some(segment.next_seq());
			if segment.payload.is_empty() {
				return None;
			}
		}

		if let Some(expected) = self.expected_seq {
			if seq_before(segment.seq, expected) {
				// Retransmission of already-consumed data; ignore.
				return None;
			}
		}

		if !segment.payload.is_empty() || segment.flags.syn {
			self.pending.insert(segment.seq, (segment.payload.clone(), segment.next_seq()));
		}

		let expected = self.expected_seq?;
		let mut out = Vec::new();
		let mut cursor = expected;
		while let Some((payload, next)) = self.pending.remove(&cursor) {
			out.extend_from_slice(&payload);
			cursor = next;
		}
		self.expected_seq = Some(cursor);

		(!out.is_empty()).then_some(out)
	}
}

fn seq_before(seq: u32, expected: u32) -> bool {
	(expected.wrapping_sub(seq) as i32) > 0
}

#[derive(Debug, Default)]
struct Connection {
	a: ConnectionStream,
	b: ConnectionStream,
}

impl Connection {
	fn stream_for(&mut self, endpoint: Endpoint, key: &ConnectionKey) -> &mut ConnectionStream {
		if endpoint == key.lo {
			&mut self.a
		} else {
			&mut self.b
		}
	}

	fn both_fin(&self) -> bool {
		self.a.fin_seen && self.b.fin_seen
	}
}

/// One emitted contiguous run of bytes for one direction of one connection.
#[derive(Debug, Clone)]
pub struct Emission {
	pub key: ConnectionKey,
	pub from: Endpoint,
	pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Reassembler {
	connections: HashMap<ConnectionKey, Connection>,
}

impl Reassembler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one segment, returning the bytes newly available for delivery
	/// on its direction, if any.
	pub fn feed(&mut self, segment: &TcpSegment) -> Option<Emission> {
		let key = ConnectionKey::new(segment.src, segment.dst);

		if segment.flags.rst {
			self.connections.remove(&key);
			return None;
		}

		let connection = self.connections.entry(key).or_default();
		let stream = connection.stream_for(segment.src, &key);
		let bytes = stream.feed(segment);

		if segment.flags.fin && segment.flags.ack {
			stream.fin_seen = true;
		}

		let emission = bytes.map(|bytes| Emission { key, from: segment.src, bytes });

		if connection.both_fin() {
			self.connections.remove(&key);
		}

		emission
	}
}
