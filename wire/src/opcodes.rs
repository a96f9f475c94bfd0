//! Opcode tables mapping the stable schema names this crate decodes to the
//! (revision-dependent) numeric values observed on the wire.
//!
//! Opcodes are not stable across server patches, so the table is built from
//! compiled-in defaults and then may be overridden from configuration
//! (see the `analyzer` crate's config loader) without touching code.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
	ServerToClient,
	ClientToServer,
}

/// The payload schema an opcode decodes into. Kept separate from the
/// `payload` module's actual decode dispatch so the table can be built and
/// overridden without depending on the decoders themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
	ActorStats,
	ActorSpawn,
	ActorSpawnNpc,
	ActorSpawnNpc2,
	ActorDespawn,
	ActorSetPos,
	ActorMove,
	RequestMoveInstance,
	RequestMove,
	ActorModelEquip,
	PlayerParams,
	AggroList,
	InitZone,
	EffectResult,
	ActorStatusEffectList,
	ActorStatusEffectList2,
	ActorStatusEffectListBoss,
	PartyList,
	PartyModify,
	AllianceList,
	Effect01,
	Effect08,
	Effect16,
	Effect24,
	Effect32,
	Chat,
	ChatParty,
	ChatTell,
	RequestChat,
	RequestChatParty,
	RequestTell,
	ActorControl,
	ActorControlSelf,
	ActorControlTarget,
}

#[derive(Debug, Clone)]
pub struct OpcodeTable {
	direction: Direction,
	by_name: HashMap<&'static str, u16>,
	by_opcode: HashMap<u16, Schema>,
}

macro_rules! baseline {
	($table:expr, $([$name:expr, $opcode:expr, $schema:expr]),+ $(,)?) => {
		$(
			$table.by_name.insert($name, $opcode);
			$table.by_opcode.insert($opcode, $schema);
		)+
	};
}

impl OpcodeTable {
	fn empty(direction: Direction) -> Self {
		Self { direction, by_name: HashMap::new(), by_opcode: HashMap::new() }
	}

	/// The baseline server-to-client opcode set this crate ships with. These
	/// numbers are placeholders until overridden from configuration — real
	/// deployments always override them to match the observed server
	/// revision, since actual opcode values change every patch.
	pub fn server_default() -> Self {
		let mut table = Self::empty(Direction::ServerToClient);
		baseline!(table,
			["ActorStats", 0x0060, Schema::ActorStats],
			["ActorSpawn", 0x0064, Schema::ActorSpawn],
			["ActorSpawnNpc", 0x00C8, Schema::ActorSpawnNpc],
			["ActorSpawnNpc2", 0x00C9, Schema::ActorSpawnNpc2],
			["ActorDespawn", 0x0065, Schema::ActorDespawn],
			["ActorSetPos", 0x0070, Schema::ActorSetPos],
			["ActorMove", 0x0066, Schema::ActorMove],
			["ActorModelEquip", 0x0078, Schema::ActorModelEquip],
			["PlayerParams", 0x0079, Schema::PlayerParams],
			["AggroList", 0x007A, Schema::AggroList],
			["InitZone", 0x0032, Schema::InitZone],
			["EffectResult", 0x006B, Schema::EffectResult],
			["ActorStatusEffectList", 0x0067, Schema::ActorStatusEffectList],
			["ActorStatusEffectList2", 0x0090, Schema::ActorStatusEffectList2],
			["ActorStatusEffectListBoss", 0x0091, Schema::ActorStatusEffectListBoss],
			["PartyList", 0x006C, Schema::PartyList],
			["PartyModify", 0x006D, Schema::PartyModify],
			["AllianceList", 0x006E, Schema::AllianceList],
			["Effect01", 0x00A0, Schema::Effect01],
			["Effect08", 0x00A1, Schema::Effect08],
			["Effect16", 0x00A2, Schema::Effect16],
			["Effect24", 0x00A3, Schema::Effect24],
			["Effect32", 0x00A4, Schema::Effect32],
			["Chat", 0x00B0, Schema::Chat],
			["ChatParty", 0x00B1, Schema::ChatParty],
			["ChatTell", 0x00B2, Schema::ChatTell],
			["ActorControl", 0x0068, Schema::ActorControl],
			["ActorControlSelf", 0x0069, Schema::ActorControlSelf],
			["ActorControlTarget", 0x006A, Schema::ActorControlTarget],
		);
		table
	}

	/// The baseline client-to-server opcode set.
	pub fn client_default() -> Self {
		let mut table = Self::empty(Direction::ClientToServer);
		baseline!(table,
			["RequestMoveInstance", 0x0032, Schema::RequestMoveInstance],
			["RequestMove", 0x0033, Schema::RequestMove],
			["RequestChat", 0x0040, Schema::RequestChat],
			["RequestChatParty", 0x0041, Schema::RequestChatParty],
			["RequestTell", 0x0042, Schema::RequestTell],
		);
		table
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	pub fn schema_for(&self, opcode: u16) -> Option<Schema> {
		self.by_opcode.get(&opcode).copied()
	}

	/// The numeric opcode currently bound to `schema`, if this table has
	/// one. Schemas always map to exactly one opcode per direction.
	pub fn opcode_for_schema(&self, schema: Schema) -> Option<u16> {
		self.by_opcode.iter().find(|&(_, &s)| s == schema).map(|(&opcode, _)| opcode)
	}

	/// Replaces the numeric opcode bound to each named schema. Names not
	/// recognized by this table are logged and otherwise ignored — a typo
	/// in a config file should not abort a whole analysis run.
	pub fn apply_overrides(&mut self, overrides: &HashMap<String, u16>) {
		for (name, &new_opcode) in overrides {
			let Some((&static_name, &old_opcode)) =
				self.by_name.iter().find(|(&k, _)| k == name.as_str())
			else {
				log::warn!("unknown opcode name in override table: {name}");
				continue;
			};
			let Some(schema) = self.by_opcode.remove(&old_opcode) else {
				continue;
			};
			self.by_name.insert(static_name, new_opcode);
			self.by_opcode.insert(new_opcode, schema);
		}
	}
}
