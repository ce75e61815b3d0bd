//! runbox: sandboxed interactive code execution
//!
//! Runs untrusted, caller-supplied code inside isolated, resource-bounded
//! containers and exposes each execution as a line-oriented event stream
//! with real-time interactive input.
//!
//! # Modules
//!
//! - **runtime**: Sandbox image lifecycle and isolated process spawning
//! - **session**: Session registry, input relay, and staleness reaping
//! - **protocol**: Event protocol and stream multiplexing
//! - **supervisor**: Session lifecycle orchestration
//!
//! # Example
//!
//! ```ignore
//! use runbox::{DockerBackend, RunnerConfigBuilder, SessionSupervisor};
//! use std::sync::Arc;
//!
//! let config = RunnerConfigBuilder::new().memory_limit_str("256M")?.build()?;
//! let backend = Arc::new(DockerBackend::new(config.clone()));
//! let supervisor = SessionSupervisor::new(config, backend);
//!
//! let (id, mut events) = supervisor.start_session("print('hi')".into()).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod utils;

// Layered modules
pub mod protocol;
pub mod runtime;
pub mod session;

// Orchestration
pub mod supervisor;

// Public API
pub use config::{RunnerConfig, RunnerConfigBuilder};
pub use errors::{Result, RunboxError};
pub use protocol::{Event, GuestMessage, CODE_SENTINEL};
pub use runtime::{DockerBackend, IsolationBackend, ProcessHandle};
pub use session::{
    InputAnswer, InputRelay, Session, SessionRegistry, SessionState, StaleSessionReaper,
};
pub use supervisor::SessionSupervisor;

#[cfg(test)]
mod tests {
    use crate::RunnerConfigBuilder;

    #[test]
    fn test_module_imports() {
        // Verify core API is accessible
        let _config = RunnerConfigBuilder::new().build().unwrap();
    }
}
