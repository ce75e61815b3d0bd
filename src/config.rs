//! Runner configuration

use std::time::Duration;

use crate::errors::{Result, RunboxError};
use crate::utils;

/// Configuration for the isolation runtime and session lifecycle
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Tag of the reusable sandbox image
    pub image_tag: String,
    /// Memory limit in bytes for each isolated process
    pub memory_limit: u64,
    /// CPU share percentage (0-100] for each isolated process
    pub cpu_percent: u32,
    /// Maximum process/thread count inside the sandbox
    pub pids_limit: u32,
    /// How long a pending input request may stay unanswered
    pub input_timeout: Duration,
    /// Age after which the reaper terminates a session
    pub session_ttl: Duration,
    /// Interval between reaper sweeps
    pub reap_interval: Duration,
    /// Grace window between cooperative and forceful termination
    pub grace_period: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            image_tag: "runbox-python:latest".to_string(),
            memory_limit: 128 * 1024 * 1024,
            cpu_percent: 50,
            pids_limit: 64,
            input_timeout: Duration::from_secs(120),
            session_ttl: Duration::from_secs(300),
            reap_interval: Duration::from_secs(30),
            grace_period: Duration::from_secs(1),
        }
    }
}

impl RunnerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.image_tag.is_empty() {
            return Err(RunboxError::InvalidConfig(
                "Image tag cannot be empty".to_string(),
            ));
        }

        if self.memory_limit == 0 {
            return Err(RunboxError::InvalidConfig(
                "Memory limit must be non-zero".to_string(),
            ));
        }

        if self.cpu_percent == 0 || self.cpu_percent > 100 {
            return Err(RunboxError::InvalidConfig(format!(
                "CPU percentage must be in (0, 100], got {}",
                self.cpu_percent
            )));
        }

        if self.pids_limit == 0 {
            return Err(RunboxError::InvalidConfig(
                "PID limit must be non-zero".to_string(),
            ));
        }

        if self.input_timeout.is_zero() {
            return Err(RunboxError::InvalidConfig(
                "Input timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder pattern for runner configuration
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Create new builder with defaults
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    /// Set sandbox image tag
    pub fn image_tag(mut self, tag: &str) -> Self {
        self.config.image_tag = tag.to_string();
        self
    }

    /// Set memory limit in bytes
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.config.memory_limit = bytes;
        self
    }

    /// Set memory limit from string (e.g., "100M")
    pub fn memory_limit_str(self, s: &str) -> Result<Self> {
        let bytes = utils::parse_memory_size(s)?;
        Ok(self.memory_limit(bytes))
    }

    /// Set CPU limit by percentage (0-100]
    pub fn cpu_limit_percent(mut self, percent: u32) -> Self {
        self.config.cpu_percent = percent;
        self
    }

    /// Set maximum PIDs
    pub fn pids_limit(mut self, limit: u32) -> Self {
        self.config.pids_limit = limit;
        self
    }

    /// Set the input request timeout
    pub fn input_timeout(mut self, timeout: Duration) -> Self {
        self.config.input_timeout = timeout;
        self
    }

    /// Set the staleness threshold for the reaper
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    /// Set the reaper sweep interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// Set the termination grace window
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period = grace;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<RunnerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunnerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_memory_limit_str() {
        let config = RunnerConfigBuilder::new()
            .memory_limit_str("256M")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.memory_limit, 256 * 1024 * 1024);
    }

    #[test]
    fn test_builder_invalid_memory_str() {
        assert!(RunnerConfigBuilder::new().memory_limit_str("bogus").is_err());
    }

    #[test]
    fn test_builder_cpu_percent() {
        let config = RunnerConfigBuilder::new()
            .cpu_limit_percent(75)
            .build()
            .unwrap();
        assert_eq!(config.cpu_percent, 75);
    }

    #[test]
    fn test_validate_rejects_zero_cpu() {
        let config = RunnerConfig {
            cpu_percent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excess_cpu() {
        let config = RunnerConfig {
            cpu_percent: 150,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_image_tag() {
        let config = RunnerConfig {
            image_tag: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_pids() {
        let config = RunnerConfig {
            pids_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_timeouts() {
        let config = RunnerConfigBuilder::new()
            .input_timeout(Duration::from_secs(10))
            .session_ttl(Duration::from_secs(60))
            .reap_interval(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.input_timeout, Duration::from_secs(10));
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.reap_interval, Duration::from_secs(5));
    }
}
