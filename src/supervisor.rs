//! Session supervisor: orchestration glue for sandboxed executions
//!
//! On session start the supervisor acquires a process from the isolation
//! backend, registers the session, and drives the protocol multiplexer,
//! forwarding classified events to the caller's stream. Every terminal
//! condition (natural exit, caller stop, input timeout, staleness reaping)
//! converges on one idempotent teardown routine, so the isolated process is
//! reclaimed exactly once regardless of which path fires first.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::errors::{Result, RunboxError};
use crate::protocol::{multiplex, Event, ExitOutcome};
use crate::runtime::{IsolationBackend, ProcessHandle};
use crate::session::{InputRelay, SessionRegistry, SessionState};

/// Capacity of each session's event channel
const EVENT_BUFFER: usize = 64;

/// Orchestrates session lifecycle across the registry, relay, and backend
pub struct SessionSupervisor {
    backend: Arc<dyn IsolationBackend>,
    registry: Arc<SessionRegistry>,
    relay: Arc<InputRelay>,
    config: RunnerConfig,
}

impl SessionSupervisor {
    pub fn new(config: RunnerConfig, backend: Arc<dyn IsolationBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            registry: Arc::new(SessionRegistry::new()),
            relay: Arc::new(InputRelay::new(config.input_timeout)),
            config,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start executing caller-supplied code in a fresh session
    ///
    /// Fails with `RuntimeUnavailable` if the sandbox image cannot be
    /// prepared; otherwise returns the session id and its event stream
    /// immediately. Later failures are reported as stream events, never as
    /// a broken stream, so the caller always holds a stable handle to stop
    /// the session or feed it input.
    pub async fn start_session(
        self: &Arc<Self>,
        code: String,
    ) -> Result<(String, mpsc::Receiver<Event>)> {
        self.backend.ensure_ready().await?;

        let id = Uuid::new_v4().to_string();
        let cancel = self.registry.create(&id)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx
            .send(Event::SessionStart {
                session_id: id.clone(),
            })
            .await;

        info!("starting session {}", id);

        let supervisor = Arc::clone(self);
        let session_id = id.clone();
        tokio::spawn(async move {
            supervisor.run_session(session_id, code, tx, cancel).await;
        });

        Ok((id, rx))
    }

    /// Answer a session's outstanding input request
    pub fn submit_input(&self, session_id: &str, value: String) -> Result<()> {
        match self.registry.state(session_id) {
            None => Err(RunboxError::NoSuchSession(session_id.to_string())),
            Some(SessionState::AwaitingInput) => self.relay.resolve(session_id, value),
            Some(_) => Err(RunboxError::NotAwaitingInput(session_id.to_string())),
        }
    }

    /// Request termination of a session from any state
    ///
    /// Teardown itself runs on the session's driving task; this only signals
    /// it, which keeps `terminate` exactly-once even when a stop races a
    /// natural exit or an input timeout.
    pub fn stop_session(&self, session_id: &str) -> Result<()> {
        match self.registry.cancel_handle(session_id) {
            Some(cancel) => {
                info!("stop requested for session {}", session_id);
                cancel.notify_one();
                Ok(())
            }
            None => Err(RunboxError::NoSuchSession(session_id.to_string())),
        }
    }

    async fn run_session(
        self: Arc<Self>,
        id: String,
        code: String,
        events: mpsc::Sender<Event>,
        cancel: Arc<Notify>,
    ) {
        let mut handle = match self.backend.spawn(&id).await {
            Ok(handle) => handle,
            Err(e) => {
                // Startup raced with failure: the caller already holds the
                // session id, so report through the stream.
                let cause = format!("failed to start isolated process: {}", e);
                self.finish(&id, None, Some(cause), &events).await;
                return;
            }
        };

        let outcome = tokio::select! {
            outcome = multiplex(&id, &mut handle, &code, &events, &self.relay, &self.registry) => outcome,
            _ = cancel.notified() => ExitOutcome::Cancelled,
        };

        // A process that reached a terminal condition on its own does not
        // need the cooperative stop round trip.
        let graceful = matches!(
            outcome,
            ExitOutcome::Cancelled | ExitOutcome::InputTimeout | ExitOutcome::ProtocolViolation(_)
        );

        let cause = match outcome {
            ExitOutcome::Exited { code: 0 } | ExitOutcome::Cancelled => None,
            ExitOutcome::Exited { code } => Some(format!("process exited with code {}", code)),
            ExitOutcome::InputTimeout => Some(format!(
                "input not supplied within {}s",
                self.config.input_timeout.as_secs()
            )),
            ExitOutcome::ProtocolViolation(detail) => {
                Some(format!("guest protocol violation: {}", detail))
            }
            ExitOutcome::Failed(detail) => Some(detail),
        };

        self.finish(&id, Some((handle, graceful)), cause, &events)
            .await;
    }

    /// Idempotent teardown: first caller does the work, later ones no-op
    async fn finish(
        &self,
        id: &str,
        handle: Option<(ProcessHandle, bool)>,
        cause: Option<String>,
        events: &mpsc::Sender<Event>,
    ) {
        if self.registry.remove(id).is_none() {
            return;
        }

        // Unblock anything still parked on an input request for this
        // session before touching the process.
        self.relay.cancel(id);

        if let Some((mut handle, graceful)) = handle {
            if let Err(e) = self.backend.terminate(&mut handle, graceful).await {
                warn!("termination of session {} reported: {}", id, e);
            }
        }

        if let Some(content) = cause {
            let _ = events.send(Event::Error { content }).await;
        }
        let _ = events.send(Event::Complete).await;

        info!("session {} terminated", id);
    }
}
