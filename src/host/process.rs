//! Child-process host speaking newline-delimited JSON
//!
//! Each submission is written to the child's stdin as one JSON line. Every
//! line the child prints on stdout is parsed as a [`HostEvent`]; stderr is
//! forwarded to the log.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};

use super::{FormHost, HostEvent, Submission};
use crate::error::{BrokerError, BrokerResult, HostError};

pub struct ProcessHost {
    stdin: Arc<Mutex<ChildStdin>>,
    _child: Child,
}

impl ProcessHost {
    /// Start `program` and return the host plus the stream of its events
    ///
    /// The event stream ends when the child closes its stdout.
    pub fn spawn(
        program: &str,
        args: &[String],
    ) -> BrokerResult<(Self, mpsc::UnboundedReceiver<HostEvent>)> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrokerError::HostUnavailable("host stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrokerError::HostUnavailable("host stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrokerError::HostUnavailable("host stderr unavailable".to_string()))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match HostEvent::from_line(&line) {
                    Ok(event) => {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!("form host stdout parse error: {} line={}", error, line);
                    }
                }
            }
            tracing::debug!("form host stdout closed");
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                tracing::warn!("form host stderr: {}", line);
            }
        });

        tracing::info!(program, "form host started");

        Ok((
            Self {
                stdin: Arc::new(Mutex::new(stdin)),
                _child: child,
            },
            event_rx,
        ))
    }
}

#[async_trait]
impl FormHost for ProcessHost {
    async fn present(&self, submission: &Submission) -> Result<(), HostError> {
        let payload = serde_json::to_string(submission)
            .map_err(|error| HostError::Malformed(error.to_string()))?;

        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|error| HostError::Unavailable(format!("failed to write form: {error}")))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|error| HostError::Unavailable(format!("failed to write form: {error}")))?;
        stdin
            .flush()
            .await
            .map_err(|error| HostError::Unavailable(format!("failed to flush form: {error}")))?;
        Ok(())
    }
}
