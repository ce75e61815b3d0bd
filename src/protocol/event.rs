//! Event stream protocol and guest message classification

use serde::{Deserialize, Serialize};

/// Sentinel line terminating the program text on the guest's stdin
pub const CODE_SENTINEL: &str = "__END_OF_CODE__";

/// One unit of the streaming protocol delivered to the caller
///
/// Events are serialized as one JSON object per line. For a given session,
/// `SessionStart` is always first and `Complete` is always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStart {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Output {
        content: String,
    },
    Error {
        content: String,
    },
    InputRequest {
        content: String,
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Complete,
}

impl Event {
    /// Serialize to a newline-terminated wire record
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"));
        line.push('\n');
        line
    }
}

/// A structured record emitted by the guest process on its output stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuestMessage {
    Output {
        content: String,
    },
    Error {
        content: String,
    },
    InputRequest {
        prompt: String,
        #[serde(rename = "sessionId", default)]
        session_id: Option<String>,
    },
}

/// Classify one output-stream record
///
/// Records that do not parse as a recognized structured message are treated
/// as plain text. This is deliberate tolerance: the guest's incidental
/// diagnostic prints must coexist with the structured protocol.
pub fn classify_line(line: &str) -> Option<GuestMessage> {
    serde_json::from_str(line).ok()
}
