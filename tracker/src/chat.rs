//! Normalizes the server's and client's several chat opcode variants into
//! one uniform [`ChatRecord`].

use std::cell::RefCell;
use std::rc::Rc;

use dispatch::Dispatcher;
use wire::opcodes::{Direction, Schema};
use wire::payload::IpcPayload;

use crate::actor::ActorTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChannel {
	Party,
	FreeCompany,
	Tell,
	TellReceive,
}

#[derive(Debug, Clone)]
pub struct ChatRecord {
	pub channel: ChatChannel,
	pub from_actor_id: Option<u32>,
	pub from_name: String,
	pub from_world_id: Option<u16>,
	pub message: String,
	pub to_name: Option<String>,
	pub to_world_id: Option<u16>,
}

#[derive(Default)]
pub struct ChatTracker {
	records: Vec<ChatRecord>,
}

impl ChatTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(&self) -> &[ChatRecord] {
		&self.records
	}

	pub fn install(
		chat: Rc<RefCell<ChatTracker>>,
		actors: Rc<RefCell<ActorTracker>>,
		dispatcher: &mut Dispatcher,
	) {
		let c = chat.clone();
		dispatcher.register(Direction::ServerToClient, Schema::Chat, move |_bundle, _ipc, payload| {
			if let IpcPayload::Chat(chat) = payload {
				c.borrow_mut().records.push(ChatRecord {
					channel: ChatChannel::FreeCompany,
					from_actor_id: chat.from_actor_id,
					from_name: chat.from_name.clone(),
					from_world_id: Some(chat.from_world_id),
					message: chat.message.clone(),
					to_name: None,
					to_world_id: None,
				});
			}
		});

		let c = chat.clone();
		let a = actors.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ChatParty, move |_bundle, _ipc, payload| {
			if let IpcPayload::ChatParty(party) = payload {
				let channel = if Some(party.party_id) == a.borrow().current_party_id() {
					ChatChannel::Party
				} else {
					// Observed to alias in captures when the party id is
					// not (or no longer) the tracker's current party.
					ChatChannel::FreeCompany
				};
				c.borrow_mut().records.push(ChatRecord {
					channel,
					from_actor_id: Some(party.from_actor_id),
					from_name: party.from_name.clone(),
					from_world_id: Some(party.from_world_id),
					message: party.message.clone(),
					to_name: None,
					to_world_id: None,
				});
			}
		});

		let c = chat.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ChatTell, move |_bundle, _ipc, payload| {
			if let IpcPayload::ChatTell(tell) = payload {
				c.borrow_mut().records.push(ChatRecord {
					channel: ChatChannel::TellReceive,
					from_actor_id: None,
					from_name: tell.from_name.clone(),
					from_world_id: Some(tell.from_world_id),
					message: tell.message.clone(),
					to_name: None,
					to_world_id: None,
				});
			}
		});

		let c = chat.clone();
		let a = actors.clone();
		dispatcher.register(Direction::ClientToServer, Schema::RequestChat, move |_bundle, _ipc, payload| {
			if let IpcPayload::RequestChat(request) = payload {
				let tracker = a.borrow();
				let login_id = tracker.login_actor_id();
				let from_name = login_id.and_then(|id| tracker.get(id)).and_then(|a| a.name.clone());
				c.borrow_mut().records.push(ChatRecord {
					channel: ChatChannel::FreeCompany,
					from_actor_id: login_id,
					from_name: from_name.unwrap_or_default(),
					from_world_id: None,
					message: request.message.clone(),
					to_name: None,
					to_world_id: None,
				});
			}
		});

		let c = chat.clone();
		let a = actors.clone();
		dispatcher.register(Direction::ClientToServer, Schema::RequestChatParty, move |_bundle, _ipc, payload| {
			if let IpcPayload::RequestChatParty(request) = payload {
				let tracker = a.borrow();
				let login_id = tracker.login_actor_id();
				let from_name = login_id.and_then(|id| tracker.get(id)).and_then(|a| a.name.clone());
				let channel = if Some(request.party_id) == tracker.current_party_id() {
					ChatChannel::Party
				} else {
					ChatChannel::FreeCompany
				};
				c.borrow_mut().records.push(ChatRecord {
					channel,
					from_actor_id: login_id,
					from_name: from_name.unwrap_or_default(),
					from_world_id: None,
					message: request.message.clone(),
					to_name: None,
					to_world_id: None,
				});
			}
		});

		let c = chat;
		let a = actors;
		dispatcher.register(Direction::ClientToServer, Schema::RequestTell, move |_bundle, _ipc, payload| {
			if let IpcPayload::RequestTell(request) = payload {
				let tracker = a.borrow();
				let login_id = tracker.login_actor_id();
				let from_name = login_id.and_then(|id| tracker.get(id)).and_then(|a| a.name.clone());
				c.borrow_mut().records.push(ChatRecord {
					channel: ChatChannel::Tell,
					from_actor_id: login_id,
					from_name: from_name.unwrap_or_default(),
					from_world_id: None,
					message: request.message.clone(),
					to_name: Some(request.to_name.clone()),
					to_world_id: Some(request.to_world_id),
				});
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dispatch::Dispatcher;
	use wire::bundle::{BundleHeader, COMPRESSION_NONE, SIGNATURE_1};
	use wire::message::{IPC_HEADER_SIZE, TYPE1_IPC, TYPE_IPC};
	use wire::opcodes::OpcodeTable;

	#[test]
	fn records_start_empty() {
		let chat = ChatTracker::new();
		assert!(chat.records().is_empty());
	}

	#[test]
	fn chat_channel_variants_are_distinct() {
		assert_ne!(ChatChannel::Party, ChatChannel::FreeCompany);
		assert_ne!(ChatChannel::Tell, ChatChannel::TellReceive);
	}

	fn ipc_message(opcode: u16, body: &[u8]) -> Vec<u8> {
		let mut buf = Vec::new();
		let total = (IPC_HEADER_SIZE + body.len()) as u32;
		buf.extend_from_slice(&total.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes()); // source_actor_id
		buf.extend_from_slice(&0u32.to_le_bytes()); // target_actor_id
		buf.extend_from_slice(&TYPE_IPC.to_le_bytes());
		buf.extend_from_slice(&TYPE1_IPC.to_le_bytes());
		buf.extend_from_slice(&opcode.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes()); // server_epoch
		buf.extend_from_slice(body);
		buf
	}

	fn dummy_bundle_header() -> BundleHeader {
		BundleHeader { magic: SIGNATURE_1, size: 0, timestamp: 1, compression: COMPRESSION_NONE, message_count: 1 }
	}

	fn party_list_body(party_id: u32) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&party_id.to_le_bytes());
		buf.push(0); // member_count
		buf.extend_from_slice(&[0, 0, 0]); // padding
		buf
	}

	fn request_chat_party_body(party_id: u32, message: &str) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&party_id.to_le_bytes());
		buf.extend_from_slice(&(message.len() as u16).to_le_bytes());
		buf.extend_from_slice(message.as_bytes());
		buf
	}

	#[test]
	fn request_chat_party_splits_by_current_party() {
		let mut dispatcher = Dispatcher::new(OpcodeTable::server_default(), OpcodeTable::client_default());
		let actors = Rc::new(RefCell::new(ActorTracker::new()));
		let chat = Rc::new(RefCell::new(ChatTracker::new()));
		ActorTracker::install(actors.clone(), &mut dispatcher);
		ChatTracker::install(chat.clone(), actors.clone(), &mut dispatcher);

		let party_list = ipc_message(0x006C, &party_list_body(9));
		dispatcher.dispatch_bundle(Direction::ServerToClient, &dummy_bundle_header(), &party_list);
		assert_eq!(actors.borrow().current_party_id(), Some(9));

		let matching = ipc_message(0x0041, &request_chat_party_body(9, "hi"));
		dispatcher.dispatch_bundle(Direction::ClientToServer, &dummy_bundle_header(), &matching);

		let mismatched = ipc_message(0x0041, &request_chat_party_body(5, "yo"));
		dispatcher.dispatch_bundle(Direction::ClientToServer, &dummy_bundle_header(), &mismatched);

		let records = chat.borrow();
		let records = records.records();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].channel, ChatChannel::Party);
		assert_eq!(records[1].channel, ChatChannel::FreeCompany);
	}
}
