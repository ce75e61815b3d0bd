//! Docker-backed isolation runtime
//!
//! Builds and verifies the reusable sandbox image, spawns one isolated
//! container per session with CPU, memory, PID, and network restrictions,
//! and guarantees container reclamation on every termination path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{debug, info, warn};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::errors::{Result, RunboxError};
use crate::runtime::process::ProcessHandle;
use crate::utils::container_name;

/// Guest runner baked into the sandbox image
const GUEST_RUNNER: &str = include_str!("guest/runner.py");

/// Path of the runner inside the image
const RUNNER_PATH: &str = "/opt/runbox/runner.py";

const DOCKERFILE: &str = "FROM python:3.12-slim\n\
RUN useradd --create-home runner\n\
COPY runner.py /opt/runbox/runner.py\n\
USER runner\n\
WORKDIR /home/runner\n";

/// The mechanism that spawns and reclaims isolated processes
///
/// Implemented by [`DockerBackend`] in production; test suites substitute
/// their own backend to exercise the orchestration without a container
/// substrate.
#[async_trait]
pub trait IsolationBackend: Send + Sync {
    /// Verify the reusable sandbox image exists, building it if absent
    async fn ensure_ready(&self) -> Result<()>;

    /// Spawn a freshly isolated process for a session
    async fn spawn(&self, session_id: &str) -> Result<ProcessHandle>;

    /// Terminate the process and reclaim its isolation boundary
    ///
    /// Safe to call multiple times and on an already-exited handle. When
    /// `graceful`, a cooperative termination signal precedes the kill.
    async fn terminate(&self, handle: &mut ProcessHandle, graceful: bool) -> Result<()>;
}

/// Docker-backed implementation of the isolation runtime
pub struct DockerBackend {
    config: RunnerConfig,
    image_ready: AtomicBool,
}

impl DockerBackend {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            image_ready: AtomicBool::new(false),
        }
    }

    async fn image_exists(&self) -> bool {
        Command::new("docker")
            .args(["image", "inspect", &self.config.image_tag])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn build_image(&self) -> Result<()> {
        let build_dir: PathBuf =
            std::env::temp_dir().join(format!("runbox-build-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&build_dir)?;
        std::fs::write(build_dir.join("Dockerfile"), DOCKERFILE)?;
        std::fs::write(build_dir.join("runner.py"), GUEST_RUNNER)?;

        info!("building sandbox image {}", self.config.image_tag);

        let output = Command::new("docker")
            .args(["build", "-t", &self.config.image_tag])
            .arg(&build_dir)
            .output()
            .await;

        // Clean up the build context regardless of the result.
        let _ = std::fs::remove_dir_all(&build_dir);

        let output = output.map_err(|e| {
            RunboxError::RuntimeUnavailable(format!("failed to invoke docker build: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunboxError::RuntimeUnavailable(format!(
                "docker build failed for {}: {}",
                self.config.image_tag,
                stderr.trim()
            )));
        }

        info!("sandbox image {} ready", self.config.image_tag);
        Ok(())
    }
}

#[async_trait]
impl IsolationBackend for DockerBackend {
    async fn ensure_ready(&self) -> Result<()> {
        if self.image_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if !self.image_exists().await {
            self.build_image().await?;
        }

        self.image_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn spawn(&self, session_id: &str) -> Result<ProcessHandle> {
        let name = container_name(session_id);
        let cpus = f64::from(self.config.cpu_percent) / 100.0;

        let child = Command::new("docker")
            .args(["run", "-i", "--rm", "--network", "none"])
            .args(["--memory", &self.config.memory_limit.to_string()])
            .args(["--cpus", &format!("{:.2}", cpus)])
            .args(["--pids-limit", &self.config.pids_limit.to_string()])
            .args(["--name", &name])
            .arg(&self.config.image_tag)
            .args(["python3", RUNNER_PATH, session_id])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunboxError::Spawn(format!("docker run failed: {}", e)))?;

        debug!("spawned container {} for session {}", name, session_id);
        Ok(ProcessHandle::from_child(child, Some(name)))
    }

    async fn terminate(&self, handle: &mut ProcessHandle, graceful: bool) -> Result<()> {
        let already_exited = handle.try_wait().unwrap_or(None).is_some();

        if graceful && !already_exited {
            if let Some(name) = handle.container_name() {
                let grace_secs = self.config.grace_period.as_secs().max(1);
                let _ = Command::new("docker")
                    .args(["stop", "-t", &grace_secs.to_string(), name])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .output()
                    .await;
            }
        }

        if !already_exited {
            let wait = tokio::time::timeout(self.config.grace_period, handle.wait()).await;
            if wait.is_err() {
                if let Err(e) = handle.kill().await {
                    warn!("failed to kill isolated process: {}", e);
                }
            }
        }

        // Backstop: reclaim the container itself, tolerating "already gone".
        if let Some(name) = handle.container_name() {
            let _ = Command::new("docker")
                .args(["rm", "-f", name])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await;
        }

        Ok(())
    }
}
