//! Isolation runtime: sandbox image management and process spawning
//!
//! # Features
//!
//! - **Image lifecycle**: Verify/build the reusable sandbox image
//! - **Spawning**: One network-less, resource-bounded container per session
//! - **Termination**: Cooperative stop with forceful escalation and a
//!   substrate-level backstop

pub mod docker;
pub mod process;
pub use docker::{DockerBackend, IsolationBackend};
pub use process::ProcessHandle;
