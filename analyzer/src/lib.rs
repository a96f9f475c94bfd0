//! Wires the transport, dispatch and tracker crates into one pipeline:
//! capture bytes (or raw TCP segments) in, normalized domain state out.

pub mod config;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dispatch::Dispatcher;
use tracker::{ActorTracker, ChatTracker, EffectCorrelator};
use transport::reframer::{self, Framed, Reframer};
use transport::segment::{Endpoint, TcpSegment};
use transport::{ConnectionKey, Reassembler};
use wire::opcodes::{Direction, OpcodeTable};
use wire::BundleHeader;

#[cfg(feature = "capture")]
use transport::capture::{CapturedBundle, Direction as CaptureDirection};

/// Owns the dispatcher, the three domain trackers, and the transport-level
/// state needed to turn either raw TCP segments or pre-bundled capture
/// bytes into dispatched IPC events.
pub struct Analyzer {
	dispatcher: Dispatcher,
	actors: Rc<RefCell<ActorTracker>>,
	effects: Rc<RefCell<EffectCorrelator>>,
	chat: Rc<RefCell<ChatTracker>>,
	reassembler: Reassembler,
	reframers: HashMap<(ConnectionKey, Endpoint), Reframer>,
}

impl Analyzer {
	pub fn new(server_opcodes: OpcodeTable, client_opcodes: OpcodeTable) -> Self {
		let mut dispatcher = Dispatcher::new(server_opcodes, client_opcodes);

		let actors = Rc::new(RefCell::new(ActorTracker::new()));
		let effects = Rc::new(RefCell::new(EffectCorrelator::new()));
		let chat = Rc::new(RefCell::new(ChatTracker::new()));

		ActorTracker::install(actors.clone(), &mut dispatcher);
		EffectCorrelator::install(effects.clone(), &mut dispatcher);
		ChatTracker::install(chat.clone(), actors.clone(), &mut dispatcher);

		Self {
			dispatcher,
			actors,
			effects,
			chat,
			reassembler: Reassembler::new(),
			reframers: HashMap::new(),
		}
	}

	/// Builds an analyzer from the compiled-in baseline opcode tables, with
	/// `server_overrides`/`client_overrides` applied on top (per §6's
	/// configuration surface: captures are protocol-revision specific).
	pub fn with_overrides(
		server_overrides: &HashMap<String, u16>,
		client_overrides: &HashMap<String, u16>,
	) -> Self {
		let mut server = OpcodeTable::server_default();
		server.apply_overrides(server_overrides);
		let mut client = OpcodeTable::client_default();
		client.apply_overrides(client_overrides);
		Self::new(server, client)
	}

	pub fn actors(&self) -> &Rc<RefCell<ActorTracker>> {
		&self.actors
	}

	pub fn effects(&self) -> &Rc<RefCell<EffectCorrelator>> {
		&self.effects
	}

	pub fn chat(&self) -> &Rc<RefCell<ChatTracker>> {
		&self.chat
	}

	/// Decodes a bundle header off `bytes`, decompresses the body if
	/// needed, and dispatches every IPC message inside it. Any failure
	/// (truncated header, bad inflate) is logged and the bundle dropped.
	pub fn feed_bundle(&mut self, direction: Direction, bytes: &[u8]) {
		let Some(header) = BundleHeader::decode(bytes) else {
			log::warn!("dropping bundle: header did not decode");
			return;
		};
		if bytes.len() < header.size as usize {
			log::warn!("dropping bundle: declared size does not fit available bytes");
			return;
		}
		let body = &bytes[wire::bundle::SIZE..header.size as usize];
		let Some(decompressed) = reframer::decompress_body(&header, body) else {
			log::warn!("dropping bundle: inflate failed");
			return;
		};
		self.dispatcher.dispatch_bundle(direction, &header, &decompressed);
	}

	/// Feeds one already-bundled capture record (either of the two §6
	/// capture formats), decoding and dispatching it directly — no
	/// transport-level reassembly or reframing is needed since the
	/// capture converter already performed both.
	#[cfg(feature = "capture")]
	pub fn feed_captured(&mut self, bundle: &CapturedBundle) {
		let direction = match bundle.direction {
			CaptureDirection::FromResponder => Direction::ServerToClient,
			CaptureDirection::ToResponder => Direction::ClientToServer,
		};
		self.feed_bundle(direction, &bundle.bytes);
	}

	/// Feeds one raw IP/TCP segment, running it through stream reassembly
	/// and bundle reframing before dispatch. `responder` identifies which
	/// endpoint is the server side of the connection (the first
	/// destination seen for a new connection, per §6).
	pub fn feed_segment(&mut self, segment: &TcpSegment, responder: Endpoint) {
		let Some(emission) = self.reassembler.feed(segment) else {
			return;
		};

		let direction =
			if emission.from == responder { Direction::ServerToClient } else { Direction::ClientToServer };

		let reframer = self.reframers.entry((emission.key, emission.from)).or_default();
		for framed in reframer.feed(&emission.bytes) {
			match framed {
				Framed::Bundle(bytes) => self.feed_bundle(direction, &bytes),
				Framed::Diagnostic(byte) => {
					log::debug!("reframer resync: dropped garbage byte {byte:#x}");
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wire::bundle::{COMPRESSION_NONE, SIGNATURE_1};
	use wire::message::{IPC_HEADER_SIZE, TYPE1_IPC, TYPE_IPC};

	fn ipc_message(opcode: u16, body: &[u8]) -> Vec<u8> {
		let mut buf = Vec::new();
		let total = (IPC_HEADER_SIZE + body.len()) as u32;
		buf.extend_from_slice(&total.to_le_bytes());
		buf.extend_from_slice(&7u32.to_le_bytes()); // source_actor_id
		buf.extend_from_slice(&0u32.to_le_bytes());
		buf.extend_from_slice(&TYPE_IPC.to_le_bytes());
		buf.extend_from_slice(&TYPE1_IPC.to_le_bytes());
		buf.extend_from_slice(&opcode.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes());
		buf.extend_from_slice(body);
		buf
	}

	fn bundle(body: &[u8]) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&SIGNATURE_1);
		let total = (wire::bundle::SIZE + body.len()) as u32;
		buf.extend_from_slice(&total.to_le_bytes());
		buf.extend_from_slice(&5000u64.to_le_bytes());
		buf.push(COMPRESSION_NONE);
		buf.push(0);
		buf.extend_from_slice(&1u16.to_le_bytes());
		buf.extend_from_slice(body);
		buf
	}

	#[test]
	fn dispatches_actor_stats_into_tracker() {
		let mut analyzer = Analyzer::with_overrides(&HashMap::new(), &HashMap::new());

		let mut stats_body = Vec::new();
		stats_body.extend_from_slice(&100u32.to_le_bytes());
		stats_body.extend_from_slice(&50u16.to_le_bytes());
		let message = ipc_message(0x0060, &stats_body);
		let bytes = bundle(&message);

		analyzer.feed_bundle(Direction::ServerToClient, &bytes);

		let actors = analyzer.actors().borrow();
		let actor = actors.get(7).expect("actor 7 tracked");
		assert_eq!(actor.hp, Some(100));
		assert_eq!(actor.mp, Some(50));
		assert_eq!(actor.last_updated_at, 5000);
	}
}
