// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal plumbing: shared stdin lines, host callbacks and output streaming.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rh_core::{BlobId, OutputStream, SessionEvent};
use rh_engine::HostCallbacks;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// How long to wait for buffered output after the host stops.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

type LineSource = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Input lines shared by the prompt loop and host callbacks.
#[derive(Clone)]
pub struct Terminal {
    lines: Arc<Mutex<LineSource>>,
}

impl Terminal {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub async fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        let mut lines = self.lines.lock().await;
        write_flush(&mut io::stdout().lock(), prompt)?;
        lines.next_line().await
    }
}

/// Answers host callbacks from the terminal.
pub struct TerminalCallbacks {
    terminal: Terminal,
}

impl TerminalCallbacks {
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal }
    }
}

#[async_trait]
impl HostCallbacks for TerminalCallbacks {
    async fn show_message(&self, message: &str) {
        eprintln!("{}", message);
    }

    async fn read_user_input(&self, prompt: &str, _max_length: u32) -> String {
        match self.terminal.read_line(prompt).await {
            Ok(Some(line)) => line,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read input for host");
                String::new()
            }
        }
    }

    async fn plot(&self, blob: BlobId) {
        eprintln!("[plot stored as blob {}]", blob);
    }
}

/// Copy host output to stdout/stderr until the host disconnects.
pub async fn stream_output(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Output { stream, text }) => {
                let written = match stream {
                    OutputStream::Stdout => write_flush(&mut io::stdout().lock(), &text),
                    OutputStream::Stderr => write_flush(&mut io::stderr().lock(), &text),
                };
                if let Err(e) = written {
                    tracing::warn!(error = %e, "failed to write host output");
                }
            }
            Ok(SessionEvent::Disconnected { reason, resetting }) => {
                if !resetting {
                    eprintln!("host disconnected: {}", reason);
                }
                return;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dropped host output")
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

fn write_flush(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

/// Give the output task a moment to print what the host sent last.
pub async fn drain(output: JoinHandle<()>) {
    if tokio::time::timeout(OUTPUT_DRAIN, output).await.is_err() {
        tracing::debug!("output still streaming at exit");
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
