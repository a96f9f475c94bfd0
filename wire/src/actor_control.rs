//! The `ActorControl` family of opcodes carries a secondary category
//! discriminant inside the payload itself, so the dispatcher has to look
//! one level deeper than the opcode table to know what happened.

use util::cursor::Cursor;

pub const CATEGORY_CLASS_JOB_CHANGE: u16 = 0x0005;
pub const CATEGORY_DEATH: u16 = 0x0006;
pub const CATEGORY_AGGRO: u16 = 0x0016;
pub const CATEGORY_EFFECT_OVER_TIME: u16 = 0x0033;

/// The raw `category(2) + padding(2) + param1(4) + param2(4) + param3(4)`
/// stub every `ActorControl*` opcode shares, before the category-specific
/// fields are interpreted.
#[derive(Debug, Clone, Copy)]
pub struct ActorControlStub {
	pub category: u16,
	pub param1: u32,
	pub param2: u32,
	pub param3: u32,
}

impl ActorControlStub {
	pub const SIZE: usize = 16;

	pub fn decode(buf: &[u8]) -> Option<Self> {
		let mut c = Cursor::new(buf);
		let category = c.u16()?;
		c.skip(2)?;
		let param1 = c.u32()?;
		let param2 = c.u32()?;
		let param3 = c.u32()?;
		Some(Self { category, param1, param2, param3 })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverTimeKind {
	Damage,
	Heal,
}

/// The category-specific payloads this analyzer understands. Categories it
/// does not recognize decode to [`ActorControlPayload::Unknown`] rather than
/// failing — the dispatcher still reports the raw stub to anyone listening
/// for it.
#[derive(Debug, Clone, Copy)]
pub enum ActorControlPayload {
	ClassJobChange { class_job_id: u32 },
	Death { killer_actor_id: u32 },
	Aggro { target_actor_id: u32, enmity: u32 },
	EffectOverTime { kind: OverTimeKind, amount: u32, buff_id: u32 },
	Unknown(ActorControlStub),
}

impl ActorControlPayload {
	pub fn decode(buf: &[u8]) -> Option<Self> {
		let stub = ActorControlStub::decode(buf)?;
		Some(match stub.category {
			CATEGORY_CLASS_JOB_CHANGE => {
				ActorControlPayload::ClassJobChange { class_job_id: stub.param1 }
			}
			CATEGORY_DEATH => ActorControlPayload::Death { killer_actor_id: stub.param1 },
			CATEGORY_AGGRO => {
				ActorControlPayload::Aggro { target_actor_id: stub.param1, enmity: stub.param2 }
			}
			// param1: 0 = Damage, 1 = Heal. buff_id (param3) is 0 when the
			// tick did not originate from a status effect.
			CATEGORY_EFFECT_OVER_TIME => ActorControlPayload::EffectOverTime {
				kind: if stub.param1 == 1 { OverTimeKind::Heal } else { OverTimeKind::Damage },
				amount: stub.param2,
				buff_id: stub.param3,
			},
			_ => ActorControlPayload::Unknown(stub),
		})
	}
}
