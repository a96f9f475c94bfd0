//! The actor table: the single source of truth for in-game entity state,
//! built up from the `ActorSpawn`/`ActorStats`/`ActorStatusEffectList`/…
//! opcode family.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dispatch::Dispatcher;
use wire::actor_control::ActorControlPayload;
use wire::opcodes::{Direction, Schema};
use wire::payload::{self, IpcPayload, Position};

/// The reserved sentinel id naming the "root" actor, which has no owner.
pub const ROOT_ACTOR_ID: u32 = 0xE000_0000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
	Never,
	At(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct StatusEffect {
	pub effect_id: u16,
	pub param: u16,
	pub expiry: Expiry,
	pub source_actor_id: u32,
}

impl StatusEffect {
	fn neutral() -> Self {
		Self { effect_id: 0, param: 0, expiry: Expiry::Never, source_actor_id: 0 }
	}

	fn from_wire(wire: payload::StatusEffectWire, bundle_timestamp: u64) -> Self {
		Self {
			effect_id: wire.effect_id,
			param: wire.param,
			expiry: expiry_from_duration(wire.duration, bundle_timestamp),
			source_actor_id: wire.source_actor_id,
		}
	}
}

fn expiry_from_duration(duration: i32, bundle_timestamp: u64) -> Expiry {
	if duration <= 0 {
		Expiry::Never
	} else {
		Expiry::At(bundle_timestamp + duration as u64)
	}
}

#[derive(Debug, Clone, Default)]
pub struct Actor {
	pub spawn_id: Option<u32>,
	pub home_world_id: Option<u16>,
	pub pos: Option<Position>,
	pub rotation: Option<f32>,
	pub hp: Option<u32>,
	pub max_hp: Option<u32>,
	pub mp: Option<u16>,
	pub max_mp: Option<u16>,
	pub owner_id: Option<u32>,
	pub name: Option<String>,
	pub zone_id: Option<u16>,
	pub bnpc_name_id: Option<u32>,
	pub class_or_job: Option<u8>,
	pub level: Option<u8>,
	pub synced_level: Option<u8>,
	pub shield_ratio: f32,
	pub aggroed: bool,
	pub last_updated_at: u64,
	pub status_effects: Vec<StatusEffect>,
	pub outgoing_enmity: HashMap<u32, u8>,
}

impl Actor {
	fn touch(&mut self, bundle_timestamp: u64) {
		self.last_updated_at = self.last_updated_at.max(bundle_timestamp);
	}

	/// Writes slot `index`, growing the list with neutral slots if needed.
	fn set_status_effect(&mut self, index: usize, effect: StatusEffect) {
		if self.status_effects.len() <= index {
			self.status_effects.resize_with(index + 1, StatusEffect::neutral);
		}
		self.status_effects[index] = effect;
	}

	fn replace_status_effects_from_list(&mut self, effects: &[payload::StatusEffectWire], bundle_timestamp: u64) {
		for (i, &wire) in effects.iter().enumerate() {
			self.set_status_effect(i, StatusEffect::from_wire(wire, bundle_timestamp));
		}
	}

	/// Euclidean distance to another actor, if both have a known position.
	pub fn distance(&self, other: &Actor) -> Option<f32> {
		let a = self.pos?;
		let b = other.pos?;
		let (dx, dy, dz) = (a.x - b.x, a.y - b.y, a.z - b.z);
		Some((dx * dx + dy * dy + dz * dz).sqrt())
	}
}

#[derive(Debug, Clone)]
pub struct PartyMember {
	pub character_id: u32,
	pub name: String,
}

#[derive(Default)]
pub struct ActorTracker {
	actors: HashMap<u32, Actor>,
	spawn_to_actor: HashMap<u32, u32>,
	/// Latched from the `target_actor_id` of the first IPC message observed
	/// on the connection (the server addresses its first unicast message to
	/// the logged-in actor).
	login_actor_id: Option<u32>,
	current_party_id: Option<u32>,
	party_members: Vec<PartyMember>,
	alliance_slots: Vec<u32>,
}

impl ActorTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn login_actor_id(&self) -> Option<u32> {
		self.login_actor_id
	}

	pub fn current_party_id(&self) -> Option<u32> {
		self.current_party_id
	}

	pub fn get(&self, actor_id: u32) -> Option<&Actor> {
		self.actors.get(&actor_id)
	}

	pub fn actor_for_spawn(&self, spawn_id: u32) -> Option<&Actor> {
		self.spawn_to_actor.get(&spawn_id).and_then(|id| self.actors.get(id))
	}

	fn entry(&mut self, actor_id: u32) -> &mut Actor {
		self.actors.entry(actor_id).or_default()
	}

	/// Wires every actor-tracker handler into `dispatcher`. `tracker` is
	/// shared with the effect correlator and chat tracker, which read but
	/// never mutate it.
	pub fn install(tracker: Rc<RefCell<ActorTracker>>, dispatcher: &mut Dispatcher) {
		let t = tracker.clone();
		dispatcher.register_wildcard(move |_bundle, message, _body| {
			let mut tracker = t.borrow_mut();
			if tracker.login_actor_id.is_none() {
				tracker.login_actor_id = Some(message.target_actor_id);
			}
		});

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ActorStats, move |bundle, ipc, payload| {
			if let IpcPayload::ActorStats(stats) = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				actor.hp = Some(stats.hp);
				actor.mp = Some(stats.mp);
				actor.touch(bundle.timestamp);
			}
		});

		for schema in [Schema::ActorSpawn, Schema::ActorSpawnNpc, Schema::ActorSpawnNpc2] {
			let t = tracker.clone();
			dispatcher.register(Direction::ServerToClient, schema, move |bundle, ipc, payload| {
				if let IpcPayload::ActorSpawn(spawn) = payload {
					let mut tracker = t.borrow_mut();
					let actor_id = ipc.source_actor_id;
					tracker.spawn_to_actor.insert(spawn.spawn_id, actor_id);
					let actor = tracker.entry(actor_id);
					actor.spawn_id = Some(spawn.spawn_id);
					actor.owner_id = Some(spawn.owner_id);
					actor.bnpc_name_id = Some(spawn.bnpc_name_id);
					actor.level = Some(spawn.level);
					actor.class_or_job = Some(spawn.class_or_job);
					actor.max_hp = Some(spawn.max_hp);
					actor.max_mp = Some(spawn.max_mp);
					actor.hp = Some(spawn.hp);
					actor.mp = Some(spawn.mp);
					actor.pos = Some(spawn.pos);
					actor.rotation = Some(spawn.rotation);
					actor.name = Some(spawn.name.clone());
					actor.status_effects.clear();
					actor.replace_status_effects_from_list(&spawn.status_effects, bundle.timestamp);
					actor.touch(bundle.timestamp);
				}
			});
		}

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ActorDespawn, move |_bundle, _ipc, payload| {
			if let IpcPayload::ActorDespawn(despawn) = payload {
				t.borrow_mut().spawn_to_actor.remove(&despawn.spawn_id);
			}
		});

		for schema in
			[Schema::ActorSetPos, Schema::ActorMove, Schema::RequestMoveInstance, Schema::RequestMove]
		{
			let direction =
				if matches!(schema, Schema::RequestMoveInstance | Schema::RequestMove) {
					Direction::ClientToServer
				} else {
					Direction::ServerToClient
				};
			let t = tracker.clone();
			dispatcher.register(direction, schema, move |bundle, ipc, payload| {
				if let IpcPayload::PositionUpdate(update) = payload {
					let mut tracker = t.borrow_mut();
					let actor = tracker.entry(ipc.source_actor_id);
					actor.pos = Some(update.pos);
					actor.rotation = Some(update.rotation);
					actor.touch(bundle.timestamp);
				}
			});
		}

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::ActorModelEquip, move |bundle, ipc, payload| {
			if let IpcPayload::ActorModelEquip(equip) = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				actor.class_or_job = Some(equip.class_or_job);
				actor.level = Some(equip.level);
				actor.touch(bundle.timestamp);
			}
		});

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::PlayerParams, move |bundle, ipc, payload| {
			if let IpcPayload::PlayerParams(params) = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				actor.max_hp = Some(params.max_hp);
				actor.max_mp = Some(params.max_mp);
				actor.touch(bundle.timestamp);
			}
		});

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::AggroList, move |bundle, ipc, payload| {
			if let IpcPayload::AggroList(list) = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				actor.outgoing_enmity = list.entries.iter().copied().collect();
				actor.touch(bundle.timestamp);
			}
		});

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::InitZone, move |bundle, ipc, payload| {
			if let IpcPayload::InitZone(zone) = payload {
				let mut tracker = t.borrow_mut();
				tracker.spawn_to_actor.clear();
				let Some(login_actor_id) = tracker.login_actor_id.or(Some(ipc.target_actor_id)) else {
					return;
				};
				let actor = tracker.entry(login_actor_id);
				actor.zone_id = Some(zone.zone_id);
				actor.pos = Some(zone.pos);
				actor.touch(bundle.timestamp);
			}
		});

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::EffectResult, move |bundle, _ipc, payload| {
			if let IpcPayload::EffectResult(result) = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(result.actor_id);
				actor.hp = Some(result.hp);
				actor.max_hp = Some(result.max_hp);
				actor.mp = Some(result.mp);
				actor.shield_ratio = payload::shield_ratio(result.shield_percent);
				for entry in &result.entries {
					let status = StatusEffect {
						effect_id: entry.effect_id,
						param: entry.param,
						expiry: expiry_from_duration(entry.duration, bundle.timestamp),
						source_actor_id: entry.source_actor_id,
					};
					actor.set_status_effect(entry.index as usize, status);
				}
				actor.touch(bundle.timestamp);
			}
		});

		for schema in
			[Schema::ActorStatusEffectList, Schema::ActorStatusEffectList2, Schema::ActorStatusEffectListBoss]
		{
			let t = tracker.clone();
			dispatcher.register(Direction::ServerToClient, schema, move |bundle, ipc, payload| {
				if let IpcPayload::ActorStatusEffectList(list) = payload {
					let mut tracker = t.borrow_mut();
					let actor = tracker.entry(ipc.source_actor_id);
					actor.level = Some(list.level);
					actor.class_or_job = Some(list.class_or_job);
					actor.max_hp = Some(list.max_hp);
					actor.max_mp = Some(list.max_mp);
					actor.hp = Some(list.hp);
					actor.mp = Some(list.mp);
					actor.shield_ratio = payload::shield_ratio(list.shield_percent);
					actor.status_effects.clear();
					actor.replace_status_effects_from_list(&list.effects, bundle.timestamp);
					actor.touch(bundle.timestamp);
				}
			});
		}

		for schema in [Schema::PartyList, Schema::PartyModify] {
			let t = tracker.clone();
			dispatcher.register(Direction::ServerToClient, schema, move |_bundle, _ipc, payload| {
				if let IpcPayload::PartyList(list) = payload {
					let mut tracker = t.borrow_mut();
					tracker.current_party_id = Some(list.party_id);
					tracker.party_members = list
						.members
						.iter()
						.map(|m| PartyMember { character_id: m.character_id, name: m.name.clone() })
						.collect();
				}
			});
		}

		let t = tracker.clone();
		dispatcher.register(Direction::ServerToClient, Schema::AllianceList, move |_bundle, _ipc, payload| {
			if let IpcPayload::AllianceList(list) = payload {
				t.borrow_mut().alliance_slots = list.slots.clone();
			}
		});

		let t = tracker.clone();
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_CLASS_JOB_CHANGE, move |_bundle, ipc, payload| {
			if let ActorControlPayload::ClassJobChange { class_job_id } = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				actor.class_or_job = Some(*class_job_id as u8);
			}
		});

		let t = tracker.clone();
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_AGGRO, move |_bundle, ipc, payload| {
			if let ActorControlPayload::Aggro { .. } = payload {
				t.borrow_mut().entry(ipc.source_actor_id).aggroed = true;
			}
		});

		let t = tracker;
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_EFFECT_OVER_TIME, move |_bundle, ipc, payload| {
			if let ActorControlPayload::EffectOverTime { kind, amount, .. } = payload {
				let mut tracker = t.borrow_mut();
				let actor = tracker.entry(ipc.source_actor_id);
				let max_hp = actor.max_hp.unwrap_or(u32::MAX);
				let hp = actor.hp.unwrap_or(0);
				let hp = match kind {
					wire::actor_control::OverTimeKind::Heal => hp.saturating_add(*amount),
					wire::actor_control::OverTimeKind::Damage => hp.saturating_sub(*amount),
				};
				actor.hp = Some(hp.min(max_hp));
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_effect_slot_grows_sparsely() {
		let mut actor = Actor::default();
		actor.set_status_effect(
			2,
			StatusEffect { effect_id: 9, param: 0, expiry: Expiry::At(1030), source_actor_id: 5 },
		);
		assert_eq!(actor.status_effects.len(), 3);
		assert_eq!(actor.status_effects[0].effect_id, 0);
		assert_eq!(actor.status_effects[1].effect_id, 0);
		assert_eq!(actor.status_effects[2].effect_id, 9);
	}

	#[test]
	fn expiry_from_nonpositive_duration_is_never() {
		assert_eq!(expiry_from_duration(0, 1000), Expiry::Never);
		assert_eq!(expiry_from_duration(-5, 1000), Expiry::Never);
		assert_eq!(expiry_from_duration(30, 1000), Expiry::At(1030));
	}

	#[test]
	fn last_updated_at_is_monotonic() {
		let mut actor = Actor::default();
		actor.touch(100);
		actor.touch(50);
		assert_eq!(actor.last_updated_at, 100);
		actor.touch(200);
		assert_eq!(actor.last_updated_at, 200);
	}

	#[test]
	fn distance_is_none_without_both_positions() {
		let a = Actor::default();
		let b = Actor::default();
		assert!(a.distance(&b).is_none());
	}
}
