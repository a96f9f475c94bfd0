//! Stateful domain trackers: the actor table, the effect correlator, and
//! the chat tracker. All three consume decoded IPCs via the dispatcher and
//! never feed back into it.

pub mod actor;
pub mod chat;
pub mod effect;

pub use actor::{Actor, ActorTracker};
pub use chat::{ChatRecord, ChatTracker};
pub use effect::{EffectCorrelator, EffectEvent};
