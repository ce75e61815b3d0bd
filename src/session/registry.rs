//! Session registry: the single source of truth for live sessions

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

use crate::errors::{Result, RunboxError};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Process requested but not yet confirmed alive
    Created,
    /// Process alive, no outstanding input request
    Running,
    /// Exactly one input request outstanding
    AwaitingInput,
}

/// Snapshot view of one live session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

struct SessionEntry {
    state: SessionState,
    created_at: DateTime<Utc>,
    started: Instant,
    cancel: Arc<Notify>,
}

/// Owns the mapping from session id to session state
///
/// All mutating operations are atomic with respect to concurrent callers:
/// two concurrent `create` calls with the same id yield exactly one success,
/// and `remove` hands the entry to exactly one caller.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session, returning its cancellation handle
    pub fn create(&self, id: &str) -> Result<Arc<Notify>> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(id) {
            return Err(RunboxError::DuplicateSession(id.to_string()));
        }

        let cancel = Arc::new(Notify::new());
        sessions.insert(
            id.to_string(),
            SessionEntry {
                state: SessionState::Created,
                created_at: Utc::now(),
                started: Instant::now(),
                cancel: Arc::clone(&cancel),
            },
        );
        Ok(cancel)
    }

    /// Snapshot of one session, if live
    pub fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(id).map(|entry| Session {
            id: id.to_string(),
            state: entry.state,
            created_at: entry.created_at,
        })
    }

    /// Current state of one session, if live
    pub fn state(&self, id: &str) -> Option<SessionState> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(id).map(|entry| entry.state)
    }

    /// Update a session's state; returns false if the session is gone
    pub fn set_state(&self, id: &str, state: SessionState) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Cancellation handle for one session, if live
    pub fn cancel_handle(&self, id: &str) -> Option<Arc<Notify>> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(id).map(|entry| Arc::clone(&entry.cancel))
    }

    /// Remove a session; idempotent, only the first caller gets the entry
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(id).map(|entry| Session {
            id: id.to_string(),
            state: entry.state,
            created_at: entry.created_at,
        })
    }

    /// Snapshot of all live sessions
    pub fn list_active(&self) -> Vec<Session> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .iter()
            .map(|(id, entry)| Session {
                id: id.clone(),
                state: entry.state,
                created_at: entry.created_at,
            })
            .collect()
    }

    /// Ids of sessions older than the given threshold
    pub fn stale_sessions(&self, ttl: Duration) -> Vec<String> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .iter()
            .filter(|(_, entry)| entry.started.elapsed() > ttl)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
