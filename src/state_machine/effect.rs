//! Effects produced by gate transitions

use crate::llm::LlmMessage;
use crate::session::ChatMessage;

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the collaborator for a reply to this history
    RequestCompletion { history: Vec<LlmMessage> },

    /// Publish the new snapshot to observers
    PublishState,

    /// Tell connected clients a message was appended
    NotifyMessage { message: ChatMessage },

    /// Tell connected clients the first response was saved
    NotifyFirstResponse { message: ChatMessage },
}

impl Effect {
    pub fn notify_message(message: ChatMessage) -> Self {
        Effect::NotifyMessage { message }
    }

    pub fn notify_first_response(message: ChatMessage) -> Self {
        Effect::NotifyFirstResponse { message }
    }
}
