//! Utility functions for session orchestration

use crate::errors::{Result, RunboxError};

/// Parse memory size string (e.g., "100M", "1G")
pub fn parse_memory_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    let (num_str, multiplier) = if s.ends_with("G") {
        (&s[..s.len() - 1], 1024u64 * 1024 * 1024)
    } else if s.ends_with("M") {
        (&s[..s.len() - 1], 1024u64 * 1024)
    } else if s.ends_with("K") {
        (&s[..s.len() - 1], 1024u64)
    } else if s.ends_with("B") {
        (&s[..s.len() - 1], 1u64)
    } else {
        (s.as_str(), 1u64)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| RunboxError::InvalidConfig(format!("Invalid memory size: {}", s)))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| RunboxError::InvalidConfig(format!("Memory size overflow: {}", s)))
}

/// Derive the container name for a session id
///
/// The prefix makes runbox containers identifiable for out-of-band
/// inspection and termination (`docker ps`, `docker kill`).
pub fn container_name(session_id: &str) -> String {
    format!("runbox-{}", session_id)
}
