//! Input relay: rendezvous between input requests and later answers
//!
//! Each pending input is a single-resolution settlement slot keyed by
//! session id. It is resolved by the caller's input-submission path, failed
//! by deadline expiry, or cancelled when the session begins termination —
//! whichever happens first; late arrivals observe `NoSuchPendingInput`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::errors::{Result, RunboxError};

/// Settlement of one pending input request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAnswer {
    /// The caller supplied a value
    Value(String),
    /// The session is terminating; no value will arrive
    Cancelled,
}

struct PendingInput {
    tx: oneshot::Sender<InputAnswer>,
}

/// Owns the mapping from session id to its pending input request
pub struct InputRelay {
    pending: Mutex<HashMap<String, PendingInput>>,
    input_timeout: Duration,
}

impl InputRelay {
    pub fn new(input_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            input_timeout,
        }
    }

    /// Register a pending input request for a session
    ///
    /// At most one request may be pending per session at any instant.
    pub fn register(&self, session_id: &str) -> Result<oneshot::Receiver<InputAnswer>> {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(session_id) {
            return Err(RunboxError::DuplicatePendingInput(session_id.to_string()));
        }

        let (tx, rx) = oneshot::channel();
        pending.insert(session_id.to_string(), PendingInput { tx });
        Ok(rx)
    }

    /// Resolve a pending input request with the caller's value
    pub fn resolve(&self, session_id: &str, value: String) -> Result<()> {
        let slot = {
            let mut pending = self.pending.lock().unwrap();
            pending
                .remove(session_id)
                .ok_or_else(|| RunboxError::NoSuchPendingInput(session_id.to_string()))?
        };
        // The waiting side may have been dropped by a concurrent teardown;
        // the settlement itself still counts as delivered.
        let _ = slot.tx.send(InputAnswer::Value(value));
        Ok(())
    }

    /// Cancel any pending input request for a session
    ///
    /// A missing slot is fine: cancellation races with resolution and
    /// timeout, and the first settlement wins.
    pub fn cancel(&self, session_id: &str) {
        let slot = {
            let mut pending = self.pending.lock().unwrap();
            pending.remove(session_id)
        };
        if let Some(slot) = slot {
            let _ = slot.tx.send(InputAnswer::Cancelled);
        }
    }

    /// Await the settlement of a registered input request
    ///
    /// Fails with `InputTimeout` when the deadline elapses, atomically
    /// removing the slot so a late `resolve` observes `NoSuchPendingInput`.
    pub async fn wait(
        &self,
        session_id: &str,
        mut rx: oneshot::Receiver<InputAnswer>,
    ) -> Result<InputAnswer> {
        match timeout(self.input_timeout, &mut rx).await {
            Ok(Ok(answer)) => Ok(answer),
            // Sender dropped without settling: treat as cancellation.
            Ok(Err(_)) => Ok(InputAnswer::Cancelled),
            Err(_) => {
                let slot = {
                    let mut pending = self.pending.lock().unwrap();
                    pending.remove(session_id)
                };
                match slot {
                    Some(_) => Err(RunboxError::InputTimeout(self.input_timeout)),
                    // A resolve slipped in just as the deadline fired; the
                    // settled value wins over the timeout.
                    None => match rx.try_recv() {
                        Ok(answer) => Ok(answer),
                        Err(_) => Err(RunboxError::InputTimeout(self.input_timeout)),
                    },
                }
            }
        }
    }

    /// Whether a session currently has a pending input request
    pub fn has_pending(&self, session_id: &str) -> bool {
        self.pending.lock().unwrap().contains_key(session_id)
    }
}
