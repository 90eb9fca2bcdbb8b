//! Session runtime executor

use super::{CompletionSettings, SessionCommand, SessionEvent};
use crate::llm::{LlmRequest, LlmService};
use crate::session::{SessionSnapshot, SessionState};
use crate::state_machine::{transition, CompletionOutcome, Effect, Event, TransitionError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Owns one session's state and is the only code that ever mutates it.
///
/// Commands are handled strictly one at a time, completion call included,
/// so the `processing` flag never sees a concurrent submission.
pub struct SessionRuntime {
    session_id: String,
    state: SessionState,
    llm: Arc<dyn LlmService>,
    settings: CompletionSettings,
    command_rx: mpsc::Receiver<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    idle_timeout: Option<Duration>,
}

impl SessionRuntime {
    pub fn new(
        session_id: impl Into<String>,
        state: SessionState,
        llm: Arc<dyn LlmService>,
        settings: CompletionSettings,
        command_rx: mpsc::Receiver<SessionCommand>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            llm,
            settings,
            command_rx,
            broadcast_tx,
            snapshot_tx,
            idle_timeout: None,
        }
    }

    /// Stop after `idle` without commands, unless a client is still streaming
    #[must_use]
    pub fn with_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        self.idle_timeout = idle;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting session runtime");

        while let Some(command) = self.next_command().await {
            let result = self.process_event(command.event).await;
            if let Some(reply) = command.reply {
                // Caller may have gone away; the state change stands regardless
                let _ = reply.send(result);
            }
        }

        tracing::info!(session_id = %self.session_id, "Session runtime stopped");
    }

    /// Wait for the next command. `None` once every handle is gone or the
    /// session has sat idle with nobody subscribed.
    async fn next_command(&mut self) -> Option<SessionCommand> {
        let Some(idle) = self.idle_timeout else {
            return self.command_rx.recv().await;
        };

        loop {
            match tokio::time::timeout(idle, self.command_rx.recv()).await {
                Ok(command) => return command,
                Err(_) if self.broadcast_tx.receiver_count() > 0 => {}
                Err(_) => {
                    tracing::info!(
                        session_id = %self.session_id,
                        idle_secs = idle.as_secs(),
                        "Session idle"
                    );
                    return None;
                }
            }
        }
    }

    /// Apply an event and every event its effects generate.
    ///
    /// Only a rejection of the initial event is returned to the caller;
    /// rejections of generated events are logged and broadcast.
    pub async fn process_event(&mut self, event: Event) -> Result<SessionSnapshot, TransitionError> {
        let mut events_to_process = vec![event];
        let mut initial = true;

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();

            let result = match transition(&self.state, current_event) {
                Ok(r) => r,
                Err(e) if initial => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        event = event_name,
                        reason = %e,
                        "Event rejected"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        event = event_name,
                        reason = %e,
                        "Generated event rejected"
                    );
                    let _ = self.broadcast_tx.send(SessionEvent::Error {
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            initial = false;

            self.state = result.new_state;
            tracing::debug!(
                session_id = %self.session_id,
                event = event_name,
                gate = ?self.state.gate_state(),
                messages = self.state.messages().len(),
                "Transition applied"
            );

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(self.state.snapshot())
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::PublishState => {
                let snapshot = self.state.snapshot();
                self.snapshot_tx.send_replace(snapshot.clone());
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::StateChange { session: snapshot });
                None
            }

            Effect::NotifyMessage { message } => {
                let _ = self.broadcast_tx.send(SessionEvent::Message { message });
                None
            }

            Effect::NotifyFirstResponse { message } => {
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::FirstResponse { message });
                None
            }

            Effect::RequestCompletion { history } => {
                tracing::info!(
                    session_id = %self.session_id,
                    turns = history.len(),
                    "Requesting first response"
                );

                let request = LlmRequest::new(history)
                    .with_max_tokens(self.settings.max_tokens)
                    .with_temperature(self.settings.temperature);

                // Awaited inline: the session stays Busy until the collaborator answers
                let result = self.llm.complete(self.state.api_key(), &request).await;

                Some(Event::CompletionFinished {
                    outcome: CompletionOutcome::from(result),
                    at: Utc::now(),
                })
            }
        }
    }

    /// Current state, for tests
    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }
}
