//! First-response gate
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! gate decides, the runtime executes the resulting effects.

mod effect;
mod event;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{CompletionOutcome, Event};
pub use transition::{transition, TransitionError, TransitionResult};
