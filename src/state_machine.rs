//! Intake conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` maps (step, context, turn) to a new step, a reply and a list
//! of effects. All I/O is performed by the engine after the transition.

mod effect;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, TABLE_APPOINTMENTS, TABLE_EMERGENCIES};
pub use state::{Lifecycle, Reply, Step, Turn, TurnContext};
pub use transition::{transition, TransitionResult};
