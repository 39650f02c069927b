use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{Completion, CompletionParams, Provider, TokenUsage};
use crate::error::{PeError, Result};

/// Runs a shell command with the prompt on stdin and uses its stdout as the
/// completion.
///
/// The model, if any, is exported to the command as `PE_MODEL`. A command
/// that outlives the call's timeout is killed.
#[derive(Debug, Clone)]
pub struct ExecProvider {
    id: String,
    command: String,
}

impl ExecProvider {
    pub fn new(command: &str) -> Result<Self> {
        let command = command.trim();
        if command.is_empty() {
            return Err(PeError::Provider {
                provider: "exec".to_string(),
                message: "missing command, use exec:<command>".to_string(),
            });
        }
        Ok(Self {
            id: format!("exec:{command}"),
            command: command.to_string(),
        })
    }

    fn error(&self, message: String) -> PeError {
        PeError::Provider {
            provider: self.id.clone(),
            message,
        }
    }

    fn wait(&self, child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus> {
        let wait_error = |e: std::io::Error| self.error(format!("failed to wait for command: {e}"));
        let Some(timeout) = timeout else {
            return child.wait().map_err(wait_error);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.error(format!("timed out after {timeout:?}")));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read a pipe to the end on its own thread so a chatty child never blocks
/// on a full pipe while we poll it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl Provider for ExecProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        debug!(command = %self.command, "running exec provider");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(model) = &params.model {
            cmd.env("PE_MODEL", model);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| self.error(format!("failed to execute: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            thread::spawn(move || {
                // A command that ignores stdin closes the pipe early.
                let _ = stdin.write_all(prompt.as_bytes());
            });
        }
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // On timeout the readers are left detached; a grandchild may still
        // hold the pipes open.
        let status = self.wait(&mut child, params.timeout)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(self.error(format!(
                "exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&stdout).into_owned();
        let usage = TokenUsage::estimate(prompt, &text);
        Ok(Completion { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdin_to_stdout() {
        let provider = ExecProvider::new("tr a-z A-Z").unwrap();
        let out = provider
            .complete("shout this", &CompletionParams::default())
            .unwrap();
        assert_eq!(out.text, "SHOUT THIS");
        assert_eq!(provider.id(), "exec:tr a-z A-Z");
    }

    #[test]
    fn test_model_is_exported() {
        let provider = ExecProvider::new("printf '%s' \"$PE_MODEL\"").unwrap();
        let params = CompletionParams {
            model: Some("tiny".into()),
            ..Default::default()
        };
        assert_eq!(provider.complete("", &params).unwrap().text, "tiny");
    }

    #[test]
    fn test_failure_status_is_an_error() {
        let provider = ExecProvider::new("echo boom >&2; exit 3").unwrap();
        let err = provider
            .complete("x", &CompletionParams::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit"), "{message}");
    }

    #[test]
    fn test_slow_command_times_out() {
        let provider = ExecProvider::new("sleep 5").unwrap();
        let params = CompletionParams::default().with_timeout(Some(Duration::from_millis(100)));

        let started = Instant::now();
        let err = provider.complete("x", &params).unwrap_err();
        assert!(err.to_string().contains("timed out after 100ms"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_fast_command_within_timeout() {
        let provider = ExecProvider::new("cat").unwrap();
        let params = CompletionParams::default().with_timeout(Some(Duration::from_secs(10)));
        assert_eq!(provider.complete("ok", &params).unwrap().text, "ok");
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(ExecProvider::new("  ").is_err());
    }
}
