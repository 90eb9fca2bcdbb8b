//! Events that can occur in a session

use crate::llm::{LlmError, LlmResponse};
use chrono::{DateTime, Utc};

/// Events that trigger gate transitions.
///
/// Timestamps travel with the event so `transition` stays pure.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        text: String,
        at: DateTime<Utc>,
    },
    ResetFirstResponse,
    ClearChat {
        at: DateTime<Utc>,
    },

    /// A credential passed the probe and becomes the session's key
    KeyVerified {
        api_key: String,
    },

    // Collaborator events
    CompletionFinished {
        outcome: CompletionOutcome,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn submit(text: impl Into<String>) -> Self {
        Event::Submit {
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn clear_chat() -> Self {
        Event::ClearChat { at: Utc::now() }
    }

    /// Short name for logs; never includes user text or credentials
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit { .. } => "submit",
            Event::ResetFirstResponse => "reset_first_response",
            Event::ClearChat { .. } => "clear_chat",
            Event::KeyVerified { .. } => "key_verified",
            Event::CompletionFinished { .. } => "completion_finished",
        }
    }
}

/// What the completion collaborator produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Reply(String),
    Failed(String),
}

impl CompletionOutcome {
    /// Text of the assistant message this outcome becomes.
    /// Failures are shown to the user rather than raised.
    pub fn into_content(self) -> String {
        match self {
            CompletionOutcome::Reply(text) => text,
            CompletionOutcome::Failed(reason) => format!("Error: {reason}"),
        }
    }
}

impl From<Result<LlmResponse, LlmError>> for CompletionOutcome {
    fn from(result: Result<LlmResponse, LlmError>) -> Self {
        match result {
            Ok(response) => CompletionOutcome::Reply(response.text),
            Err(e) => CompletionOutcome::Failed(e.message),
        }
    }
}
