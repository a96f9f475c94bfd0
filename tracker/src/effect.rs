//! Correlates effect announcements (`Effect01`/`…/Effect32`) with their
//! per-target `EffectResult` confirmations, and with `ActorControl Death`
//! cancellations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dispatch::Dispatcher;
use wire::actor_control::ActorControlPayload;
use wire::opcodes::{Direction, Schema};
use wire::payload::{ActionEffect, IpcPayload, KnownEffectType};

/// A signed hp/mp delta domain event: `-` for damage, `+` for heal.
#[derive(Debug, Clone, Copy)]
pub struct EffectEvent {
	pub timestamp: u64,
	pub source_actor_id: u32,
	pub target_actor_id: u32,
	pub signed_amount: i32,
	pub action_id: u16,
}

#[derive(Debug, Clone)]
struct PendingEffect {
	source_actor_id: u32,
	effects_per_target: HashMap<u32, Vec<ActionEffect>>,
}

#[derive(Default)]
pub struct EffectCorrelator {
	pending: HashMap<u32, PendingEffect>,
	events: Vec<EffectEvent>,
}

impl EffectCorrelator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> &[EffectEvent] {
		&self.events
	}

	pub fn pending_count(&self) -> usize {
		self.pending.len()
	}

	fn on_announcement(&mut self, global_sequence_id: u32, source_actor_id: u32, targets: Vec<(u32, Vec<ActionEffect>)>) {
		self.pending.insert(
			global_sequence_id,
			PendingEffect { source_actor_id, effects_per_target: targets.into_iter().collect() },
		);
	}

	fn on_result(&mut self, timestamp: u64, global_sequence_id: u32, target_actor_id: u32) {
		let Some(pending) = self.pending.get_mut(&global_sequence_id) else {
			return; // out-of-order or lost announcement; drop silently
		};
		let Some(effects) = pending.effects_per_target.remove(&target_actor_id) else {
			return; // target not in the announcement; drop silently
		};

		let source_actor_id = pending.source_actor_id;
		for effect in effects {
			let affected = if effect.effect_on_source { source_actor_id } else { target_actor_id };
			let signed_amount = match effect.known_effect_type {
				KnownEffectType::Damage => -(effect.value as i32),
				KnownEffectType::Heal => effect.value as i32,
				KnownEffectType::Other => continue,
			};
			self.events.push(EffectEvent {
				timestamp,
				source_actor_id,
				target_actor_id: affected,
				signed_amount,
				action_id: effect.action_id,
			});
		}

		if pending.effects_per_target.is_empty() {
			self.pending.remove(&global_sequence_id);
		}
	}

	/// Cancels every pending entry announced by `dying_actor_id`. A dead
	/// actor's announced effects do not apply if the result never arrives.
	fn on_death(&mut self, dying_actor_id: u32) {
		self.pending.retain(|_, pending| pending.source_actor_id != dying_actor_id);
	}

	fn on_effect_over_time(&mut self, timestamp: u64, actor_id: u32, kind: wire::actor_control::OverTimeKind, amount: u32) {
		let signed_amount = match kind {
			wire::actor_control::OverTimeKind::Damage => -(amount as i32),
			wire::actor_control::OverTimeKind::Heal => amount as i32,
		};
		self.events.push(EffectEvent {
			timestamp,
			source_actor_id: 0, // over-time ticks carry no source; treated as unknown
			target_actor_id: actor_id,
			signed_amount,
			action_id: 0,
		});
	}

	pub fn install(correlator: Rc<RefCell<EffectCorrelator>>, dispatcher: &mut Dispatcher) {
		for schema in
			[Schema::Effect01, Schema::Effect08, Schema::Effect16, Schema::Effect24, Schema::Effect32]
		{
			let c = correlator.clone();
			dispatcher.register(Direction::ServerToClient, schema, move |_bundle, _ipc, payload| {
				if let IpcPayload::EffectAnnouncement(announcement) = payload {
					let targets = announcement
						.targets
						.iter()
						.map(|t| (t.target_id, t.effects.clone()))
						.collect();
					c.borrow_mut().on_announcement(
						announcement.global_sequence_id,
						announcement.source_actor_id,
						targets,
					);
				}
			});
		}

		let c = correlator.clone();
		dispatcher.register(Direction::ServerToClient, Schema::EffectResult, move |bundle, _ipc, payload| {
			if let IpcPayload::EffectResult(result) = payload {
				// Keyed by the result's own `actor_id` (the affected party);
				// the announcement's stored source remains the attacker.
				c.borrow_mut().on_result(bundle.timestamp, result.global_sequence_id, result.actor_id);
			}
		});

		let c = correlator.clone();
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_EFFECT_OVER_TIME, move |bundle, ipc, payload| {
			if let ActorControlPayload::EffectOverTime { kind, amount, .. } = payload {
				c.borrow_mut().on_effect_over_time(bundle.timestamp, ipc.source_actor_id, *kind, *amount);
			}
		});

		let c = correlator;
		dispatcher.register_actor_control(wire::actor_control::CATEGORY_DEATH, move |_bundle, ipc, payload| {
			if let ActorControlPayload::Death { .. } = payload {
				c.borrow_mut().on_death(ipc.source_actor_id);
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wire::payload::ActionEffect;

	fn damage(value: u16) -> ActionEffect {
		ActionEffect { effect_on_source: false, known_effect_type: KnownEffectType::Damage, value, action_id: 1 }
	}

	fn heal(value: u16) -> ActionEffect {
		ActionEffect { effect_on_source: false, known_effect_type: KnownEffectType::Heal, value, action_id: 1 }
	}

	#[test]
	fn correlates_two_targets_and_clears_pending() {
		let mut correlator = EffectCorrelator::new();
		correlator.on_announcement(42, 1, vec![(2, vec![damage(1000)]), (3, vec![heal(500)])]);

		correlator.on_result(0, 42, 2);
		correlator.on_result(0, 42, 3);

		let events: Vec<i32> = correlator.events().iter().map(|e| e.signed_amount).collect();
		assert_eq!(events, vec![-1000, 500]);
		assert_eq!(correlator.pending_count(), 0);
	}

	#[test]
	fn death_cancels_pending_entries_from_source() {
		let mut correlator = EffectCorrelator::new();
		correlator.on_announcement(7, 1, vec![(2, vec![damage(100)])]);
		correlator.on_death(1);
		assert_eq!(correlator.pending_count(), 0);

		correlator.on_result(0, 7, 2);
		assert!(correlator.events().is_empty());
	}

	#[test]
	fn result_for_unknown_target_is_dropped_silently() {
		let mut correlator = EffectCorrelator::new();
		correlator.on_announcement(1, 1, vec![(2, vec![damage(10)])]);
		correlator.on_result(0, 1, 99);
		assert!(correlator.events().is_empty());
		assert_eq!(correlator.pending_count(), 1);
	}
}
