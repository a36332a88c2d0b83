//! Model collaborator backed by an external program.

use crossbeam_channel::RecvTimeoutError;
use iedit_core::{ModelClient, ModelError};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL: Duration = Duration::from_millis(10);

/// Runs `program args..` once per unit with the prompt on stdin and takes
/// its stdout as the response. Stderr goes to the terminal.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandModel {
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    fn kill(&self, child: &mut Child) -> ModelError {
        log::warn!("{} timed out after {:?}; killing it", self.program, self.timeout);
        let _ = child.kill();
        let _ = child.wait();
        ModelError::Timeout(self.timeout)
    }
}

impl ModelClient for CommandModel {
    fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ModelError::Invocation(format!("cannot start {}: {e}", self.program)))?;
        let deadline = Instant::now() + self.timeout;

        // Feed stdin and drain stdout on their own threads so a chatty
        // child can never block on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_owned();
            thread::spawn(move || {
                // A child that exits without reading is judged by its status.
                let _ = stdin.write_all(prompt.as_bytes());
            });
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModelError::Invocation("child stdout was not captured".into()))?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });

        let output = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(self.kill(&mut child)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ModelError::Invocation("stdout reader vanished".into()));
            }
        };

        // Closing stdout is not the same as exiting; the same deadline applies.
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                return Err(self.kill(&mut child));
            }
            thread::sleep(EXIT_POLL);
        };
        if !status.success() {
            return Err(ModelError::Invocation(format!(
                "{} exited with {status}",
                self.program
            )));
        }

        let text = String::from_utf8_lossy(&output).into_owned();
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
