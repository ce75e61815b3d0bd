//! Protocol layer: event stream and output multiplexing
//!
//! This module defines the line-oriented event protocol shared with callers
//! and the multiplexer that turns an isolated process's raw streams into
//! classified events.
//!
//! # Features
//!
//! - **Events**: Tagged JSON records (`session_start`, `output`, `error`,
//!   `input_request`, `complete`)
//! - **Classification**: Structured guest messages with plain-text fallback
//! - **Multiplexing**: Output/diagnostic/input-round-trip coordination

pub mod event;
pub mod mux;
pub use event::{classify_line, Event, GuestMessage, CODE_SENTINEL};
pub use mux::{multiplex, ExitOutcome};
