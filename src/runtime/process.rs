//! Handle for a running isolated process

use std::io;
use std::process::ExitStatus;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};

/// Owns one running isolated process and its three streams
///
/// A handle is owned exclusively by its session for the session's lifetime;
/// it is surrendered to `IsolationBackend::terminate` during teardown.
pub struct ProcessHandle {
    child: Child,
    container_name: Option<String>,
    pub(crate) stdin: Option<ChildStdin>,
    pub(crate) stdout: Option<ChildStdout>,
    pub(crate) stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    /// Wrap an already-spawned child whose streams were piped
    ///
    /// `container_name` identifies the underlying isolation boundary for
    /// out-of-band termination; pass `None` for bare processes.
    pub fn from_child(mut child: Child, container_name: Option<String>) -> Self {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Self {
            child,
            container_name,
            stdin,
            stdout,
            stderr,
        }
    }

    /// Name of the underlying isolation container, if any
    pub fn container_name(&self) -> Option<&str> {
        self.container_name.as_deref()
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        // Close stdin first so a guest blocked on reads cannot deadlock us.
        self.stdin.take();
        self.child.wait().await
    }

    /// Check for exit without blocking
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Forcefully kill the process; a no-op if it already exited
    pub async fn kill(&mut self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await
    }
}
