//! Subprocess executor for the Subversion toolchain.
//!
//! Builds argument vectors from immutable [`CommandSpec`]s, spawns the
//! external binary with fully buffered output capture, and enforces a hard
//! timeout: an external tool that hangs is killed and surfaced as
//! [`SvnError::Timeout`] instead of hanging the request forever.
//!
//! Output is buffered, not streamed. The tools are only ever asked for
//! bounded metadata and listings, never bulk repository content.

use crate::svn::SvnError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for the child to exit.
const WAIT_POLL_MS: u64 = 10;

/// An immutable description of one toolchain invocation.
///
/// Flags are rendered in insertion order, so the same spec always produces
/// the same argv and the same log line. A flag with no value is a boolean
/// switch.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    executable: PathBuf,
    subcommand: String,
    args: Vec<(String, Option<String>)>,
    target: Option<String>,
}

impl CommandSpec {
    pub fn new(executable: &Path, subcommand: &str) -> Self {
        Self {
            executable: executable.to_path_buf(),
            subcommand: subcommand.to_string(),
            args: Vec::new(),
            target: None,
        }
    }

    /// Append a boolean switch.
    pub fn flag(mut self, name: &str) -> Self {
        self.args.push((name.to_string(), None));
        self
    }

    /// Append a flag carrying a value.
    pub fn option(mut self, name: &str, value: &str) -> Self {
        self.args.push((name.to_string(), Some(value.to_string())));
        self
    }

    /// Set the positional target (repository URI or filesystem path).
    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Argument vector after the executable: subcommand, flags in insertion
    /// order, target last.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(2 + self.args.len() * 2);
        argv.push(self.subcommand.clone());
        for (flag, value) in &self.args {
            argv.push(flag.clone());
            if let Some(value) = value {
                argv.push(value.clone());
            }
        }
        if let Some(target) = &self.target {
            argv.push(target.clone());
        }
        argv
    }

    /// Reproducible single-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.executable.to_string_lossy().to_string();
        for arg in self.argv() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}

/// Captured outcome of one invocation. Never mutated after capture.
#[derive(Debug)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

fn drain(mut reader: impl Read + Send + 'static) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

/// Run the command to completion, capturing stdout, stderr and exit code.
///
/// The exit code is captured, not judged: adapters decide whether non-zero
/// is an error for their operation. Exceeding `timeout` kills the child
/// hard and returns [`SvnError::Timeout`].
pub fn execute(spec: &CommandSpec, timeout: Duration) -> Result<CommandResult, SvnError> {
    let command_line = spec.display();
    tracing::debug!(command = %command_line, "executing toolchain command");

    let mut child = Command::new(spec.executable())
        .args(spec.argv())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SvnError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    // Readers run on their own threads so a chatty child cannot deadlock
    // against a full pipe while we poll for exit.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(command = %command_line, "toolchain command timed out, killed");
                    return Err(SvnError::Timeout {
                        command: command_line,
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(Duration::from_millis(WAIT_POLL_MS));
            }
            Err(source) => {
                let _ = child.kill();
                return Err(SvnError::Io {
                    command: command_line,
                    source,
                });
            }
        }
    };

    let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
    let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
    let exit_code = status.code().unwrap_or(-1);

    tracing::debug!(command = %command_line, exit_code, "toolchain command finished");
    Ok(CommandResult {
        exit_code,
        stdout,
        stderr,
    })
}

/// Run the command and require exit status zero.
pub fn execute_checked(spec: &CommandSpec, timeout: Duration) -> Result<CommandResult, SvnError> {
    let result = execute(spec, timeout)?;
    if result.exit_code != 0 {
        return Err(SvnError::Exit {
            command: spec.display(),
            code: result.exit_code,
            stderr: result.stderr_str().trim().to_string(),
        });
    }
    Ok(result)
}
