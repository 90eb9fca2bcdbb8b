//! Runtime for executing sessions
//!
//! Every session gets its own actor task owning its `SessionState`. The
//! manager only hands out channels; no state is shared between sessions.

mod executor;


pub use executor::SessionRuntime;

use crate::llm::{self, LlmConfig, LlmService};
use crate::session::{ChatMessage, SessionSnapshot, SessionState};
use crate::state_machine::{Event, TransitionError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;

/// How long a session with no commands and no subscribers is kept
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Request parameters applied to every gated completion
#[derive(Debug, Clone, Copy)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&LlmConfig> for CompletionSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

/// An event plus an optional channel for the outcome
pub struct SessionCommand {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<SessionSnapshot, TransitionError>>>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChange { session: SessionSnapshot },
    Message { message: ChatMessage },
    FirstResponse { message: ChatMessage },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session runtime stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Send an event and wait until it and everything it triggers has run
    pub async fn send(&self, event: Event) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(SessionCommand {
                event,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| SessionError::Stopped)?;

        let result = reply_rx.await.map_err(|_| SessionError::Stopped)?;
        Ok(result?)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to session updates
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }
}

/// Spawn a runtime for a fresh session.
///
/// The returned task finishes once the runtime stops, either because every
/// handle was dropped or because `idle_timeout` elapsed.
pub fn spawn_session(
    session_id: &str,
    llm: Arc<dyn LlmService>,
    settings: CompletionSettings,
    idle_timeout: Option<Duration>,
) -> (SessionHandle, JoinHandle<()>) {
    let state = SessionState::default();
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());

    let runtime = SessionRuntime::new(
        session_id,
        state,
        llm,
        settings,
        command_rx,
        broadcast_tx.clone(),
        snapshot_tx,
    )
    .with_idle_timeout(idle_timeout);

    let task = tokio::spawn(runtime.run());

    let handle = SessionHandle {
        command_tx,
        broadcast_tx,
        snapshot_rx,
    };
    (handle, task)
}

/// Manager for all session runtimes
pub struct SessionManager {
    llm: Arc<dyn LlmService>,
    settings: CompletionSettings,
    idle_timeout: Option<Duration>,
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl SessionManager {
    pub fn new(llm: Arc<dyn LlmService>, settings: CompletionSettings) -> Self {
        Self {
            llm,
            settings,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Override how long an unused session lives; `None` keeps it until removed
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Allocate a new session with default state
    pub async fn create(&self) -> (String, SessionHandle) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (handle, task) = spawn_session(
            &session_id,
            self.llm.clone(),
            self.settings,
            self.idle_timeout,
        );

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), handle.clone());

        // Forget the session once its runtime stops on its own
        let sessions = Arc::clone(&self.sessions);
        let id = session_id.clone();
        tokio::spawn(async move {
            let _ = task.await;
            if sessions.write().await.remove(&id).is_some() {
                tracing::info!(session_id = %id, "Idle session reclaimed");
            }
        });

        tracing::info!(session_id = %session_id, "Session created");
        (session_id, handle)
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Drop a session; its runtime stops once the last handle is gone
    pub async fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| tracing::info!(session_id = %session_id, "Session removed"))
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub async fn send_event(
        &self,
        session_id: &str,
        event: Event,
    ) -> Result<SessionSnapshot, SessionError> {
        self.get(session_id).await?.send(event).await
    }

    /// Probe `api_key`; on success it becomes the session's credential.
    ///
    /// The probe runs outside the session actor, so verifying never waits
    /// behind an in-flight completion. A failed probe changes nothing.
    pub async fn verify_api_key(
        &self,
        session_id: &str,
        api_key: &str,
    ) -> Result<(bool, SessionSnapshot), SessionError> {
        let handle = self.get(session_id).await?;

        match llm::verify_api_key(self.llm.as_ref(), api_key).await {
            Ok(()) => {
                let snapshot = handle
                    .send(Event::KeyVerified {
                        api_key: api_key.to_string(),
                    })
                    .await?;
                tracing::info!(session_id = %session_id, "API key verified");
                Ok((true, snapshot))
            }
            Err(e) => {
                tracing::info!(
                    session_id = %session_id,
                    kind = e.kind.as_str(),
                    "API key verification failed"
                );
                Ok((false, handle.snapshot()))
            }
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }
}
