//! Session state store
//!
//! One `SessionState` per connected user. Fields are private; every change
//! goes through a named mutation so the gate flags can never be half-set.

use crate::llm::LlmMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synthetic assistant message every conversation starts with
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

const PLACEHOLDER_OPEN: &str = "Ask your question...";
const PLACEHOLDER_CLOSED: &str = "Chat disabled - reset to ask new question";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single entry in the conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
        }
    }

    pub fn greeting(timestamp: DateTime<Utc>) -> Self {
        Self::assistant(GREETING, timestamp)
    }

    pub fn to_llm_message(&self) -> LlmMessage {
        match self.role {
            Role::User => LlmMessage::user(self.content.clone()),
            Role::Assistant => LlmMessage::assistant(self.content.clone()),
        }
    }
}

/// Where the first-response gate currently stands. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Accepting a submission
    Open,
    /// A completion is in flight
    Busy,
    /// First response saved; input disabled until reset
    Closed,
}

/// Authoritative per-session record
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    messages: Vec<ChatMessage>,
    api_key: String,
    api_key_verified: bool,
    processing: bool,
    first_response: Option<ChatMessage>,
    first_response_saved: bool,
    chat_disabled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl SessionState {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            messages: vec![ChatMessage::greeting(created_at)],
            api_key: String::new(),
            api_key_verified: false,
            processing: false,
            first_response: None,
            first_response_saved: false,
            chat_disabled: false,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_key_verified(&self) -> bool {
        self.api_key_verified
    }

    pub fn processing(&self) -> bool {
        self.processing
    }

    pub fn first_response(&self) -> Option<&ChatMessage> {
        self.first_response.as_ref()
    }

    pub fn first_response_saved(&self) -> bool {
        self.first_response_saved
    }

    pub fn chat_disabled(&self) -> bool {
        self.chat_disabled
    }

    pub fn gate_state(&self) -> GateState {
        if self.processing {
            GateState::Busy
        } else if self.first_response_saved {
            GateState::Closed
        } else {
            GateState::Open
        }
    }

    /// Whether the rendering layer should disable the input control
    pub fn input_disabled(&self) -> bool {
        self.first_response_saved || self.processing
    }

    pub fn input_placeholder(&self) -> &'static str {
        if self.first_response_saved {
            PLACEHOLDER_CLOSED
        } else {
            PLACEHOLDER_OPEN
        }
    }

    /// Conversation history in the collaborator's role/content shape
    pub fn history(&self) -> Vec<LlmMessage> {
        self.messages.iter().map(ChatMessage::to_llm_message).collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            api_key_verified: self.api_key_verified,
            processing: self.processing,
            first_response: self.first_response.clone(),
            first_response_saved: self.first_response_saved,
            chat_disabled: self.chat_disabled,
            gate: self.gate_state(),
            input_disabled: self.input_disabled(),
            input_placeholder: self.input_placeholder().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// "Clear Chat": back to the lone greeting. Gate flags are left alone.
    pub fn reset_conversation(&mut self, at: DateTime<Utc>) {
        self.messages = vec![ChatMessage::greeting(at)];
        self.processing = false;
    }

    /// "Reset First Response": reopens the gate, keeps the history.
    pub fn reset_first_response_gate(&mut self) {
        self.first_response = None;
        self.first_response_saved = false;
        self.chat_disabled = false;
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = key.into();
    }

    pub fn set_verified(&mut self, verified: bool) {
        self.api_key_verified = verified;
    }

    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    /// Save the reply and close the gate in one step
    pub fn set_first_response(&mut self, message: ChatMessage) {
        self.first_response = Some(message);
        self.first_response_saved = true;
        self.chat_disabled = true;
    }
}

/// Read-only view handed to the rendering layer. Never carries the API key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub api_key_verified: bool,
    pub processing: bool,
    pub first_response: Option<ChatMessage>,
    pub first_response_saved: bool,
    pub chat_disabled: bool,
    pub gate: GateState,
    pub input_disabled: bool,
    pub input_placeholder: String,
}
