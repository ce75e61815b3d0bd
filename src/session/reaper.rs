//! Background reaper for stale sessions

use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::errors::RunboxError;
use crate::supervisor::SessionSupervisor;

/// Periodic sweep terminating sessions that exceed the staleness threshold
///
/// Runs independently of caller activity so abandoned sessions cannot hold
/// isolated processes alive forever.
pub struct StaleSessionReaper;

impl StaleSessionReaper {
    /// Spawn the reaper loop on the runtime
    pub fn spawn(supervisor: Arc<SessionSupervisor>) -> JoinHandle<()> {
        let ttl = supervisor.config().session_ttl;
        let sweep_every = supervisor.config().reap_interval;

        tokio::spawn(async move {
            let mut ticker = interval(sweep_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                for id in supervisor.registry().stale_sessions(ttl) {
                    info!("reaping stale session {}", id);
                    match supervisor.stop_session(&id) {
                        Ok(()) => {}
                        // The session exited naturally between the snapshot
                        // and the stop; nothing to do.
                        Err(RunboxError::NoSuchSession(_)) => {}
                        Err(e) => warn!("failed to reap session {}: {}", id, e),
                    }
                }
            }
        })
    }
}
