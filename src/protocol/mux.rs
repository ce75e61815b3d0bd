//! Protocol multiplexer: drives one isolated process's streams
//!
//! Reads the process output stream as newline-delimited records, classifies
//! each into protocol messages or plain text, and drives the input round
//! trip (emit `input_request`, await relay resolution, write the answer back
//! to the process's stdin). The diagnostic stream is never parsed; every
//! record from it becomes an `error` event.

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::errors::RunboxError;
use crate::protocol::event::{classify_line, Event, GuestMessage, CODE_SENTINEL};
use crate::runtime::ProcessHandle;
use crate::session::{InputAnswer, InputRelay, SessionRegistry, SessionState};

/// Terminal condition observed while multiplexing a session's streams
#[derive(Debug)]
pub enum ExitOutcome {
    /// Process exited on its own with the given code
    Exited { code: i32 },
    /// A pending input request was not answered within its deadline
    InputTimeout,
    /// The session was cancelled while multiplexing
    Cancelled,
    /// The guest violated the message contract
    ProtocolViolation(String),
    /// Stream plumbing failed mid-session
    Failed(String),
}

/// Drive a session's process until a terminal condition
///
/// Takes ownership of the handle's streams; the handle itself stays with the
/// caller so it can be passed to termination afterward.
pub async fn multiplex(
    session_id: &str,
    handle: &mut ProcessHandle,
    code: &str,
    events: &mpsc::Sender<Event>,
    relay: &InputRelay,
    registry: &SessionRegistry,
) -> ExitOutcome {
    let Some(mut stdin) = handle.stdin.take() else {
        return ExitOutcome::Failed("process stdin not captured".to_string());
    };
    let Some(stdout) = handle.stdout.take() else {
        return ExitOutcome::Failed("process stdout not captured".to_string());
    };

    // Feed the program text, terminated by the sentinel line.
    let mut program = code.to_string();
    if !program.ends_with('\n') {
        program.push('\n');
    }
    program.push_str(CODE_SENTINEL);
    program.push('\n');

    if let Err(e) = stdin.write_all(program.as_bytes()).await {
        return ExitOutcome::Failed(format!("failed to write program text: {}", e));
    }
    if let Err(e) = stdin.flush().await {
        return ExitOutcome::Failed(format!("failed to flush program text: {}", e));
    }

    registry.set_state(session_id, SessionState::Running);

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = handle.stderr.take().map(|s| BufReader::new(s).lines());
    let mut err_open = err_lines.is_some();

    loop {
        let line = tokio::select! {
            line = out_lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    return ExitOutcome::Failed(format!("output stream read failed: {}", e))
                }
            },
            // Diagnostic stream: forwarded verbatim as error events, never
            // parsed as protocol messages.
            line = async { err_lines.as_mut().unwrap().next_line().await }, if err_open => {
                match line {
                    Ok(Some(line)) => {
                        if events.send(Event::Error { content: line }).await.is_err() {
                            return ExitOutcome::Cancelled;
                        }
                    }
                    Ok(None) | Err(_) => err_open = false,
                }
                continue;
            }
        };

        match classify_line(&line) {
            Some(GuestMessage::InputRequest { prompt, .. }) => {
                let rx = match relay.register(session_id) {
                    Ok(rx) => rx,
                    Err(RunboxError::DuplicatePendingInput(_)) => {
                        return ExitOutcome::ProtocolViolation(
                            "input_request received while one is already pending".to_string(),
                        );
                    }
                    Err(e) => return ExitOutcome::Failed(e.to_string()),
                };
                registry.set_state(session_id, SessionState::AwaitingInput);

                let request = Event::InputRequest {
                    content: prompt,
                    session_id: session_id.to_string(),
                };
                if events.send(request).await.is_err() {
                    relay.cancel(session_id);
                    return ExitOutcome::Cancelled;
                }

                // The guest may die while its request is pending (crash,
                // resource kill); the exit must win over the input deadline
                // so the stream reports the real cause promptly.
                let settled = tokio::select! {
                    answer = relay.wait(session_id, rx) => answer,
                    status = handle.wait() => {
                        relay.cancel(session_id);
                        if let Some(mut err_lines) = err_lines.take() {
                            while let Ok(Some(line)) = err_lines.next_line().await {
                                if events.send(Event::Error { content: line }).await.is_err() {
                                    return ExitOutcome::Cancelled;
                                }
                            }
                        }
                        return match status {
                            Ok(status) => ExitOutcome::Exited {
                                code: status.code().unwrap_or(-1),
                            },
                            Err(e) => {
                                ExitOutcome::Failed(format!("failed to reap process: {}", e))
                            }
                        };
                    }
                };

                match settled {
                    Ok(InputAnswer::Value(value)) => {
                        registry.set_state(session_id, SessionState::Running);
                        let mut answer = value;
                        answer.push('\n');
                        if let Err(e) = stdin.write_all(answer.as_bytes()).await {
                            return ExitOutcome::Failed(format!(
                                "failed to relay input answer: {}",
                                e
                            ));
                        }
                        if let Err(e) = stdin.flush().await {
                            return ExitOutcome::Failed(format!(
                                "failed to flush input answer: {}",
                                e
                            ));
                        }
                    }
                    Ok(InputAnswer::Cancelled) => return ExitOutcome::Cancelled,
                    Err(RunboxError::InputTimeout(_)) => return ExitOutcome::InputTimeout,
                    Err(e) => return ExitOutcome::Failed(e.to_string()),
                }
            }
            Some(GuestMessage::Output { content }) => {
                if events.send(Event::Output { content }).await.is_err() {
                    return ExitOutcome::Cancelled;
                }
            }
            Some(GuestMessage::Error { content }) => {
                if events.send(Event::Error { content }).await.is_err() {
                    return ExitOutcome::Cancelled;
                }
            }
            None => {
                // Not a well-formed protocol record: plain text output.
                if events.send(Event::Output { content: line }).await.is_err() {
                    return ExitOutcome::Cancelled;
                }
            }
        }
    }

    // Output stream closed: flush remaining diagnostics and reap.
    drop(stdin);
    if let Some(mut err_lines) = err_lines {
        while let Ok(Some(line)) = err_lines.next_line().await {
            if events.send(Event::Error { content: line }).await.is_err() {
                return ExitOutcome::Cancelled;
            }
        }
    }

    match handle.wait().await {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            debug!("session {} process exited with code {}", session_id, code);
            ExitOutcome::Exited { code }
        }
        Err(e) => ExitOutcome::Failed(format!("failed to reap process: {}", e)),
    }
}
