//! Typed payload schemas for every opcode this crate understands, and the
//! closed `IpcPayload` sum type that ties a decoded schema back to the
//! [`crate::opcodes::Schema`] that selected it.

use crate::opcodes::Schema;
use util::cursor::Cursor;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
	pub x: f32,
	pub y: f32,
	pub z: f32,
}

impl Position {
	fn decode(c: &mut Cursor) -> Option<Self> {
		Some(Self { x: c.f32()?, y: c.f32()?, z: c.f32()? })
	}
}

#[derive(Debug, Clone, Copy)]
pub struct ActorStats {
	pub hp: u32,
	pub mp: u16,
}

#[derive(Debug, Clone)]
pub struct ActorSpawn {
	pub spawn_id: u32,
	pub owner_id: u32,
	pub bnpc_name_id: u32,
	pub level: u8,
	pub class_or_job: u8,
	pub max_hp: u32,
	pub max_mp: u16,
	pub hp: u32,
	pub mp: u16,
	pub pos: Position,
	pub rotation: f32,
	pub name: String,
	pub status_effects: Vec<StatusEffectWire>,
}

#[derive(Debug, Clone, Copy)]
pub struct ActorDespawn {
	pub spawn_id: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionUpdate {
	pub pos: Position,
	pub rotation: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ActorModelEquip {
	pub class_or_job: u8,
	pub level: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerParams {
	pub max_hp: u32,
	pub max_mp: u16,
}

#[derive(Debug, Clone)]
pub struct AggroList {
	pub entries: Vec<(u32, u8)>,
}

#[derive(Debug, Clone, Copy)]
pub struct InitZone {
	pub zone_id: u16,
	pub pos: Position,
}

/// A single entry of the list form of status effects, carried positionally
/// by index in the embedded list (see [`ActorStatusEffectList`]).
#[derive(Debug, Clone, Copy)]
pub struct StatusEffectWire {
	pub effect_id: u16,
	pub param: u16,
	/// Seconds remaining; `<= 0` means "never expires".
	pub duration: i32,
	pub source_actor_id: u32,
}

impl StatusEffectWire {
	const SIZE: usize = 12;

	fn decode(c: &mut Cursor) -> Option<Self> {
		let effect_id = c.u16()?;
		let param = c.u16()?;
		let duration = c.u32()? as i32;
		let source_actor_id = c.u32()?;
		Some(Self { effect_id, param, duration, source_actor_id })
	}
}

/// A modification-info entry, as carried by [`EffectResult`]: identical
/// fields to [`StatusEffectWire`], but addressed by an explicit slot index
/// rather than position.
#[derive(Debug, Clone, Copy)]
pub struct StatusEffectModification {
	pub index: u8,
	pub effect_id: u16,
	pub param: u16,
	pub duration: i32,
	pub source_actor_id: u32,
}

#[derive(Debug, Clone)]
pub struct EffectResult {
	/// The affected actor — the target the correlator's pending entries are
	/// keyed by, per the header's `actor_id`.
	pub actor_id: u32,
	/// Correlates this result back to the `EffectAnnouncement` that
	/// triggered it.
	pub global_sequence_id: u32,
	pub hp: u32,
	pub max_hp: u32,
	pub mp: u16,
	/// Wire percentage, 0-100; see [`crate::payload::shield_ratio`].
	pub shield_percent: u8,
	pub entries: Vec<StatusEffectModification>,
}

/// Converts the wire shield percentage (0-100) into the [0,1] ratio used by
/// the actor model.
pub fn shield_ratio(shield_percent: u8) -> f32 {
	(shield_percent.min(100) as f32) / 100.0
}

#[derive(Debug, Clone)]
pub struct ActorStatusEffectList {
	pub level: u8,
	pub class_or_job: u8,
	pub max_hp: u32,
	pub max_mp: u16,
	pub hp: u32,
	pub mp: u16,
	pub shield_percent: u8,
	pub effects: Vec<StatusEffectWire>,
}

#[derive(Debug, Clone)]
pub struct PartyMember {
	/// Zero for a member whose character is not currently resolvable; kept
	/// as an opaque name in that case.
	pub character_id: u32,
	pub name: String,
}

#[derive(Debug, Clone)]
pub struct PartyList {
	pub party_id: u32,
	pub members: Vec<PartyMember>,
}

/// An alliance's raw slot table; an empty slot carries the root sentinel id
/// `0xE000_0000` rather than `0`.
#[derive(Debug, Clone)]
pub struct AllianceList {
	pub slots: Vec<u32>,
}

pub const ALLIANCE_EMPTY_SLOT: u32 = 0xE000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownEffectType {
	Damage,
	Heal,
	Other,
}

#[derive(Debug, Clone, Copy)]
pub struct ActionEffect {
	pub effect_on_source: bool,
	pub known_effect_type: KnownEffectType,
	pub value: u16,
	pub action_id: u16,
}

impl ActionEffect {
	const SIZE: usize = 6;

	fn decode(c: &mut Cursor) -> Option<Self> {
		let flags = c.u8()?;
		let kind = c.u8()?;
		let value = c.u16()?;
		let action_id = c.u16()?;
		Some(Self {
			effect_on_source: flags & 0x01 != 0,
			known_effect_type: match kind {
				1 => KnownEffectType::Damage,
				2 => KnownEffectType::Heal,
				_ => KnownEffectType::Other,
			},
			value,
			action_id,
		})
	}
}

#[derive(Debug, Clone)]
pub struct EffectTarget {
	pub target_id: u32,
	pub effects: Vec<ActionEffect>,
}

/// The `Effect01`/`Effect08`/`Effect16`/`Effect24`/`Effect32` family: one
/// opcode per maximum target fan-out, otherwise an identical layout.
#[derive(Debug, Clone)]
pub struct EffectAnnouncement {
	pub global_sequence_id: u32,
	pub source_actor_id: u32,
	pub targets: Vec<EffectTarget>,
}

impl EffectAnnouncement {
	fn decode(buf: &[u8], max_targets: usize) -> Option<Self> {
		let mut c = Cursor::new(buf);
		let global_sequence_id = c.u32()?;
		let source_actor_id = c.u32()?;
		let target_count = c.u8()? as usize;
		if target_count > max_targets {
			return None;
		}
		c.skip(3)?; // padding
		let mut targets = Vec::with_capacity(target_count);
		for _ in 0..target_count {
			let target_id = c.u32()?;
			let effect_count = c.u8()? as usize;
			c.skip(3)?; // padding
			let mut effects = Vec::with_capacity(effect_count);
			for _ in 0..effect_count {
				let bytes = c.bytes(ActionEffect::SIZE)?;
				effects.push(ActionEffect::decode(&mut Cursor::new(bytes))?);
			}
			targets.push(EffectTarget { target_id, effects });
		}
		Some(Self { global_sequence_id, source_actor_id, targets })
	}
}

#[derive(Debug, Clone)]
pub struct Chat {
	pub from_actor_id: Option<u32>,
	pub from_world_id: u16,
	pub from_name: String,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct ChatParty {
	pub party_id: u32,
	pub from_actor_id: u32,
	pub from_world_id: u16,
	pub from_name: String,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct ChatTell {
	/// A tell received by the logged-in actor carries no character id for
	/// the sender, only a name and home world.
	pub from_name: String,
	pub from_world_id: u16,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct RequestChat {
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct RequestChatParty {
	pub party_id: u32,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct RequestTell {
	pub to_name: String,
	pub to_world_id: u16,
	pub message: String,
}

/// The full set of decoded IPC payloads this crate recognizes, keyed by the
/// [`Schema`] the opcode table resolved. A `None` return from
/// [`IpcPayload::decode`] means either an unrecognized schema or a
/// truncated/malformed body — both are silently-skippable per the core's
/// error handling policy.
#[derive(Debug, Clone)]
pub enum IpcPayload {
	ActorStats(ActorStats),
	ActorSpawn(ActorSpawn),
	ActorDespawn(ActorDespawn),
	PositionUpdate(PositionUpdate),
	ActorModelEquip(ActorModelEquip),
	PlayerParams(PlayerParams),
	AggroList(AggroList),
	InitZone(InitZone),
	EffectResult(EffectResult),
	ActorStatusEffectList(ActorStatusEffectList),
	PartyList(PartyList),
	AllianceList(AllianceList),
	EffectAnnouncement(EffectAnnouncement),
	Chat(Chat),
	ChatParty(ChatParty),
	ChatTell(ChatTell),
	RequestChat(RequestChat),
	RequestChatParty(RequestChatParty),
	RequestTell(RequestTell),
}

impl IpcPayload {
	pub fn decode(schema: Schema, buf: &[u8]) -> Option<Self> {
		Some(match schema {
			Schema::ActorStats => {
				let mut c = Cursor::new(buf);
				IpcPayload::ActorStats(ActorStats { hp: c.u32()?, mp: c.u16()? })
			}
			Schema::ActorSpawn | Schema::ActorSpawnNpc | Schema::ActorSpawnNpc2 => {
				let mut c = Cursor::new(buf);
				let spawn_id = c.u32()?;
				let owner_id = c.u32()?;
				let bnpc_name_id = c.u32()?;
				let level = c.u8()?;
				let class_or_job = c.u8()?;
				c.skip(2)?; // padding
				let max_hp = c.u32()?;
				let max_mp = c.u16()?;
				let hp = c.u32()?;
				let mp = c.u16()?;
				let pos = Position::decode(&mut c)?;
				let rotation = c.f32()?;
				let name = c.fixed_str(32)?;
				let effect_count = c.u8()? as usize;
				c.skip(3)?; // padding
				let mut status_effects = Vec::with_capacity(effect_count);
				for _ in 0..effect_count {
					status_effects.push(StatusEffectWire::decode(&mut c)?);
				}
				IpcPayload::ActorSpawn(ActorSpawn {
					spawn_id,
					owner_id,
					bnpc_name_id,
					level,
					class_or_job,
					max_hp,
					max_mp,
					hp,
					mp,
					pos,
					rotation,
					name,
					status_effects,
				})
			}
			Schema::ActorDespawn => {
				let mut c = Cursor::new(buf);
				IpcPayload::ActorDespawn(ActorDespawn { spawn_id: c.u32()? })
			}
			Schema::ActorSetPos
			| Schema::ActorMove
			| Schema::RequestMoveInstance
			| Schema::RequestMove => {
				let mut c = Cursor::new(buf);
				let pos = Position::decode(&mut c)?;
				let rotation = c.f32()?;
				IpcPayload::PositionUpdate(PositionUpdate { pos, rotation })
			}
			Schema::ActorModelEquip => {
				let mut c = Cursor::new(buf);
				let class_or_job = c.u8()?;
				let level = c.u8()?;
				IpcPayload::ActorModelEquip(ActorModelEquip { class_or_job, level })
			}
			Schema::PlayerParams => {
				let mut c = Cursor::new(buf);
				let max_hp = c.u32()?;
				let max_mp = c.u16()?;
				IpcPayload::PlayerParams(PlayerParams { max_hp, max_mp })
			}
			Schema::AggroList => {
				let mut c = Cursor::new(buf);
				let entry_count = c.u8()? as usize;
				c.skip(3)?; // padding
				let mut entries = Vec::with_capacity(entry_count);
				for _ in 0..entry_count {
					let target_id = c.u32()?;
					let percent = c.u8()?;
					c.skip(3)?; // padding
					entries.push((target_id, percent));
				}
				IpcPayload::AggroList(AggroList { entries })
			}
			Schema::InitZone => {
				let mut c = Cursor::new(buf);
				let zone_id = c.u16()?;
				c.skip(2)?; // padding
				let pos = Position::decode(&mut c)?;
				IpcPayload::InitZone(InitZone { zone_id, pos })
			}
			Schema::EffectResult => {
				let mut c = Cursor::new(buf);
				let actor_id = c.u32()?;
				let global_sequence_id = c.u32()?;
				let hp = c.u32()?;
				let max_hp = c.u32()?;
				let mp = c.u16()?;
				let shield_percent = c.u8()?;
				let entry_count = c.u8()? as usize;
				let mut entries = Vec::with_capacity(entry_count);
				for _ in 0..entry_count {
					let index = c.u8()?;
					c.skip(3)?; // padding
					let effect_id = c.u16()?;
					let param = c.u16()?;
					let duration = c.u32()? as i32;
					let source_actor_id = c.u32()?;
					entries.push(StatusEffectModification {
						index,
						effect_id,
						param,
						duration,
						source_actor_id,
					});
				}
				IpcPayload::EffectResult(EffectResult {
					actor_id,
					global_sequence_id,
					hp,
					max_hp,
					mp,
					shield_percent,
					entries,
				})
			}
			Schema::ActorStatusEffectList
			| Schema::ActorStatusEffectList2
			| Schema::ActorStatusEffectListBoss => {
				let mut c = Cursor::new(buf);
				let level = c.u8()?;
				let class_or_job = c.u8()?;
				c.skip(2)?; // padding
				let max_hp = c.u32()?;
				let max_mp = c.u16()?;
				let hp = c.u32()?;
				let mp = c.u16()?;
				let shield_percent = c.u8()?;
				let effect_count = c.u8()? as usize;
				let mut effects = Vec::with_capacity(effect_count);
				for _ in 0..effect_count {
					effects.push(StatusEffectWire::decode(&mut c)?);
				}
				IpcPayload::ActorStatusEffectList(ActorStatusEffectList {
					level,
					class_or_job,
					max_hp,
					max_mp,
					hp,
					mp,
					shield_percent,
					effects,
				})
			}
			Schema::PartyList | Schema::PartyModify => {
				let mut c = Cursor::new(buf);
				let party_id = c.u32()?;
				let member_count = c.u8()? as usize;
				c.skip(3)?; // padding
				let mut members = Vec::with_capacity(member_count);
				for _ in 0..member_count {
					let character_id = c.u32()?;
					let name = c.fixed_str(32)?;
					members.push(PartyMember { character_id, name });
				}
				IpcPayload::PartyList(PartyList { party_id, members })
			}
			Schema::AllianceList => {
				let mut c = Cursor::new(buf);
				let slot_count = c.u8()? as usize;
				c.skip(3)?; // padding
				let mut slots = Vec::with_capacity(slot_count);
				for _ in 0..slot_count {
					slots.push(c.u32()?);
				}
				IpcPayload::AllianceList(AllianceList { slots })
			}
			Schema::Effect01 => IpcPayload::EffectAnnouncement(EffectAnnouncement::decode(buf, 1)?),
			Schema::Effect08 => IpcPayload::EffectAnnouncement(EffectAnnouncement::decode(buf, 8)?),
			Schema::Effect16 => IpcPayload::EffectAnnouncement(EffectAnnouncement::decode(buf, 16)?),
			Schema::Effect24 => IpcPayload::EffectAnnouncement(EffectAnnouncement::decode(buf, 24)?),
			Schema::Effect32 => IpcPayload::EffectAnnouncement(EffectAnnouncement::decode(buf, 32)?),
			Schema::Chat => {
				let mut c = Cursor::new(buf);
				let raw_actor_id = c.u32()?;
				let from_world_id = c.u16()?;
				c.skip(2)?; // padding
				let from_name = c.fixed_str(32)?;
				let message = c.prefixed_str()?;
				let from_actor_id = (raw_actor_id != 0).then_some(raw_actor_id);
				IpcPayload::Chat(Chat { from_actor_id, from_world_id, from_name, message })
			}
			Schema::ChatParty => {
				let mut c = Cursor::new(buf);
				let party_id = c.u32()?;
				let from_actor_id = c.u32()?;
				let from_world_id = c.u16()?;
				c.skip(2)?; // padding
				let from_name = c.fixed_str(32)?;
				let message = c.prefixed_str()?;
				IpcPayload::ChatParty(ChatParty { party_id, from_actor_id, from_world_id, from_name, message })
			}
			Schema::ChatTell => {
				let mut c = Cursor::new(buf);
				let from_name = c.fixed_str(32)?;
				let from_world_id = c.u16()?;
				c.skip(2)?; // padding
				let message = c.prefixed_str()?;
				IpcPayload::ChatTell(ChatTell { from_name, from_world_id, message })
			}
			Schema::RequestChat => {
				let mut c = Cursor::new(buf);
				IpcPayload::RequestChat(RequestChat { message: c.prefixed_str()? })
			}
			Schema::RequestChatParty => {
				let mut c = Cursor::new(buf);
				let party_id = c.u32()?;
				let message = c.prefixed_str()?;
				IpcPayload::RequestChatParty(RequestChatParty { party_id, message })
			}
			Schema::RequestTell => {
				let mut c = Cursor::new(buf);
				let to_name = c.fixed_str(32)?;
				let to_world_id = c.u16()?;
				c.skip(2)?; // padding
				let message = c.prefixed_str()?;
				IpcPayload::RequestTell(RequestTell { to_name, to_world_id, message })
			}
			Schema::ActorControl | Schema::ActorControlSelf | Schema::ActorControlTarget => {
				return None; // decoded via `crate::actor_control` instead
			}
		})
	}
}
