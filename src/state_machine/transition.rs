//! Pure gate transition function
//!
//! Open --submit--> Busy --completion--> Closed --reset--> Open.
//! Clear Chat empties the log but leaves the gate flags as they are.

use super::{CompletionOutcome, Effect, Event};
use crate::session::{ChatMessage, GateState, SessionState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons the gate refuses an event. State is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A response is already being generated")]
    Busy,
    #[error("First response already saved; reset to ask a new question")]
    GateClosed,
    #[error("No completion is pending")]
    NoCompletionPending,
    #[error("API key is empty")]
    EmptyApiKey,
}

/// Pure transition function.
///
/// Given the same state and event it always produces the same result, with
/// no I/O. The caller swaps in `new_state` and runs the effects in order.
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::Submit { text, at } => {
            match state.gate_state() {
                GateState::Open => {}
                GateState::Busy => return Err(TransitionError::Busy),
                GateState::Closed => return Err(TransitionError::GateClosed),
            }
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let user_message = ChatMessage::user(text, at);
            let mut next = state.clone();
            next.set_processing(true);
            next.append_message(user_message.clone());
            let history = next.history();

            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_message(user_message))
                .with_effect(Effect::PublishState)
                .with_effect(Effect::RequestCompletion { history }))
        }

        Event::CompletionFinished { outcome, at } => {
            if !state.processing() {
                return Err(TransitionError::NoCompletionPending);
            }
            Ok(close_gate(state, outcome, at))
        }

        Event::ResetFirstResponse => {
            let mut next = state.clone();
            next.reset_first_response_gate();
            Ok(TransitionResult::new(next).with_effect(Effect::PublishState))
        }

        Event::ClearChat { at } => {
            let mut next = state.clone();
            next.reset_conversation(at);
            Ok(TransitionResult::new(next).with_effect(Effect::PublishState))
        }

        Event::KeyVerified { api_key } => {
            if api_key.trim().is_empty() {
                return Err(TransitionError::EmptyApiKey);
            }
            let mut next = state.clone();
            next.set_api_key(api_key);
            next.set_verified(true);
            Ok(TransitionResult::new(next).with_effect(Effect::PublishState))
        }
    }
}

/// Busy -> Closed. Success or failure, the reply is saved and the gate shuts.
fn close_gate(
    state: &SessionState,
    outcome: CompletionOutcome,
    at: chrono::DateTime<chrono::Utc>,
) -> TransitionResult {
    let reply = ChatMessage::assistant(outcome.into_content(), at);
    let mut next = state.clone();
    next.append_message(reply.clone());
    next.set_first_response(reply.clone());
    next.set_processing(false);

    TransitionResult::new(next)
        .with_effect(Effect::notify_message(reply.clone()))
        .with_effect(Effect::notify_first_response(reply))
        .with_effect(Effect::PublishState)
}
