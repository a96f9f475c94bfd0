//! Routes decoded IPC payloads from a bundle to registered handlers, by
//! opcode and by the nested actor-control category.

use std::collections::HashMap;

use wire::actor_control::ActorControlPayload;
use wire::message::{IpcHeader, MessageHeader};
use wire::opcodes::{Direction, OpcodeTable, Schema};
use wire::payload::IpcPayload;
use wire::BundleHeader;

type IpcHandler = Box<dyn FnMut(&BundleHeader, &IpcHeader, &IpcPayload)>;
type WildcardHandler = Box<dyn FnMut(&BundleHeader, &MessageHeader, &[u8])>;
type ActorControlHandler = Box<dyn FnMut(&BundleHeader, &IpcHeader, &ActorControlPayload)>;

/// Opcode-keyed and category-keyed handler registry plus the opcode tables
/// needed to resolve a raw opcode to a [`Schema`] per direction.
pub struct Dispatcher {
	server_opcodes: OpcodeTable,
	client_opcodes: OpcodeTable,
	by_opcode: HashMap<(Direction, u16), Vec<IpcHandler>>,
	wildcard: Vec<WildcardHandler>,
	by_category: HashMap<u16, Vec<ActorControlHandler>>,
}

impl Dispatcher {
	pub fn new(server_opcodes: OpcodeTable, client_opcodes: OpcodeTable) -> Self {
		Self {
			server_opcodes,
			client_opcodes,
			by_opcode: HashMap::new(),
			wildcard: Vec::new(),
			by_category: HashMap::new(),
		}
	}

	/// Registers a handler for the opcode in `direction` currently mapped to
	/// `schema`. A schema not present in the table (e.g. overridden out, or
	/// never configured for this direction) is logged and the registration
	/// is dropped rather than panicking. Invocation order across handlers
	/// registered for the same opcode is registration order.
	pub fn register(
		&mut self,
		direction: Direction,
		schema: Schema,
		handler: impl FnMut(&BundleHeader, &IpcHeader, &IpcPayload) + 'static,
	) {
		let Some(opcode) = self.table_for(direction).opcode_for_schema(schema) else {
			log::warn!("no opcode configured for schema {schema:?} in {direction:?}; handler dropped");
			return;
		};
		self.by_opcode.entry((direction, opcode)).or_default().push(Box::new(handler));
	}

	/// Registers a wildcard handler, invoked with the raw IPC payload bytes
	/// of every IPC message regardless of opcode. Used for side effects
	/// like latching the logged-in actor id from the first observed IPC.
	pub fn register_wildcard(&mut self, handler: impl FnMut(&BundleHeader, &MessageHeader, &[u8]) + 'static) {
		self.wildcard.push(Box::new(handler));
	}

	/// Registers a handler for a single actor-control category, invoked
	/// when any `ActorControl*` opcode arrives whose nested category
	/// matches.
	pub fn register_actor_control(
		&mut self,
		category: u16,
		handler: impl FnMut(&BundleHeader, &IpcHeader, &ActorControlPayload) + 'static,
	) {
		self.by_category.entry(category).or_default().push(Box::new(handler));
	}

	fn table_for(&self, direction: Direction) -> &OpcodeTable {
		match direction {
			Direction::ServerToClient => &self.server_opcodes,
			Direction::ClientToServer => &self.client_opcodes,
		}
	}

	/// Parses every message in a bundle body and dispatches it. Unknown
	/// opcodes, unknown actor-control categories, and malformed messages
	/// are silently skipped; the dispatcher never propagates a decode
	/// failure.
	pub fn dispatch_bundle(&mut self, direction: Direction, bundle_header: &BundleHeader, body: &[u8]) {
		let mut offset = 0usize;
		while offset < body.len() {
			let Some(message) = MessageHeader::decode(&body[offset..]) else {
				log::debug!("stopping bundle dispatch: unparsable message header at offset {offset}");
				break;
			};
			let message_size = message.size as usize;
			if message_size == 0 || offset + message_size > body.len() {
				log::debug!("dropping message: declared size does not fit remaining body");
				break;
			}
			let message_bytes = &body[offset..offset + message_size];
			offset += message_size;

			if !message.is_ipc() {
				continue;
			}

			let Some(ipc_header) = IpcHeader::decode(message_bytes) else {
				continue;
			};
			let ipc_body = &message_bytes[wire::message::IPC_HEADER_SIZE..];

			for handler in &mut self.wildcard {
				handler(bundle_header, &message, ipc_body);
			}

			let Some(schema) = self.table_for(direction).schema_for(ipc_header.opcode) else {
				continue;
			};

			match schema {
				Schema::ActorControl | Schema::ActorControlSelf | Schema::ActorControlTarget => {
					let Some(payload) = ActorControlPayload::decode(ipc_body) else { continue };
					let category = actor_control_category(&payload);
					if let Some(handlers) = self.by_category.get_mut(&category) {
						for handler in handlers {
							handler(bundle_header, &ipc_header, &payload);
						}
					}
				}
				_ => {
					let Some(payload) = IpcPayload::decode(schema, ipc_body) else { continue };
					if let Some(handlers) = self.by_opcode.get_mut(&(direction, ipc_header.opcode)) {
						for handler in handlers {
							handler(bundle_header, &ipc_header, &payload);
						}
					}
				}
			}
		}
	}
}

fn actor_control_category(payload: &ActorControlPayload) -> u16 {
	use wire::actor_control::*;
	match payload {
		ActorControlPayload::ClassJobChange { .. } => CATEGORY_CLASS_JOB_CHANGE,
		ActorControlPayload::Death { .. } => CATEGORY_DEATH,
		ActorControlPayload::Aggro { .. } => CATEGORY_AGGRO,
		ActorControlPayload::EffectOverTime { .. } => CATEGORY_EFFECT_OVER_TIME,
		ActorControlPayload::Unknown(stub) => stub.category,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn message_bytes(opcode: u16, body: &[u8]) -> Vec<u8> {
		let mut buf = Vec::new();
		let total = (wire::message::IPC_HEADER_SIZE + body.len()) as u32;
		buf.extend_from_slice(&total.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes()); // source_actor_id
		buf.extend_from_slice(&0u32.to_le_bytes()); // target_actor_id
		buf.extend_from_slice(&wire::message::TYPE_IPC.to_le_bytes());
		buf.extend_from_slice(&wire::message::TYPE1_IPC.to_le_bytes());
		buf.extend_from_slice(&opcode.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes()); // server_epoch
		buf.extend_from_slice(body);
		buf
	}

	fn dummy_bundle_header() -> BundleHeader {
		BundleHeader {
			magic: wire::bundle::SIGNATURE_1,
			size: 0,
			timestamp: 1234,
			compression: wire::bundle::COMPRESSION_NONE,
			message_count: 1,
		}
	}

	#[test]
	fn dispatches_known_opcode_to_registered_handler() {
		let mut dispatcher = Dispatcher::new(OpcodeTable::server_default(), OpcodeTable::client_default());
		let seen = Rc::new(RefCell::new(None));
		let seen_clone = seen.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ActorStats, move |_, _, payload| {
			if let IpcPayload::ActorStats(stats) = payload {
				*seen_clone.borrow_mut() = Some(stats.hp);
			}
		});

		let mut body = Vec::new();
		body.extend_from_slice(&100u32.to_le_bytes());
		body.extend_from_slice(&50u16.to_le_bytes());
		let message = message_bytes(0x0060, &body);

		dispatcher.dispatch_bundle(Direction::ServerToClient, &dummy_bundle_header(), &message);
		assert_eq!(*seen.borrow(), Some(100));
	}

	#[test]
	fn unknown_opcode_is_silently_skipped() {
		let mut dispatcher = Dispatcher::new(OpcodeTable::server_default(), OpcodeTable::client_default());
		let message = message_bytes(0xFFFF, &[]);
		dispatcher.dispatch_bundle(Direction::ServerToClient, &dummy_bundle_header(), &message);
	}

	#[test]
	fn actor_control_dispatches_by_category() {
		let mut dispatcher = Dispatcher::new(OpcodeTable::server_default(), OpcodeTable::client_default());
		let seen = Rc::new(RefCell::new(None));
		let seen_clone = seen.clone();
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_DEATH, move |_, _, payload| {
			if let ActorControlPayload::Death { killer_actor_id } = payload {
				*seen_clone.borrow_mut() = Some(*killer_actor_id);
			}
		});

		let mut body = Vec::new();
		body.extend_from_slice(&wire::actor_control::CATEGORY_DEATH.to_le_bytes());
		body.extend_from_slice(&0u16.to_le_bytes());
		body.extend_from_slice(&99u32.to_le_bytes());
		body.extend_from_slice(&0u32.to_le_bytes());
		body.extend_from_slice(&0u32.to_le_bytes());
		let message = message_bytes(0x0068, &body);

		dispatcher.dispatch_bundle(Direction::ServerToClient, &dummy_bundle_header(), &message);
		assert_eq!(*seen.borrow(), Some(99));
	}
}
