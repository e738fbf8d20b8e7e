use anyhow::{Context, Result};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Returned (inside `anyhow::Error`) when a command exceeds its time limit
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTimedOut {
    pub command: String,
    pub limit: Duration,
}

impl fmt::Display for CommandTimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command '{}' timed out after {}s",
            self.command,
            self.limit.as_secs()
        )
    }
}

impl std::error::Error for CommandTimedOut {}

/// Trait for executing system commands, allowing for mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments and capture its output.
    /// The child is killed once `timeout` elapses.
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<Output>;
}

/// Real command executor using std::process::Command
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<Output> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", command))?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match timeout {
            None => child.wait()?,
            Some(limit) => {
                let started = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if started.elapsed() >= limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CommandTimedOut {
                            command: command.to_string(),
                            limit,
                        }
                        .into());
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Mock command executor for testing
#[cfg(test)]
pub struct MockCommandExecutor {
    /// Pre-configured outputs, matched in order
    outputs: std::sync::Mutex<Vec<MockCommandResult>>,
    /// Every invocation as `command arg1 arg2 ...`
    calls: std::sync::Mutex<Vec<String>>,
    /// Fail every invocation as if the binary did not exist
    unavailable: bool,
}

/// Scripted result. Matches when `command` is equal and every entry of
/// `args` appears among the invocation's arguments.
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct MockCommandResult {
    pub command: String,
    pub args: Vec<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Report the invocation as having run past its time limit
    pub timed_out: bool,
}

#[cfg(test)]
impl MockCommandResult {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    pub fn failing(mut self, exit_code: i32, stderr: &str) -> Self {
        self.exit_code = exit_code;
        self.stderr = stderr.to_string();
        self
    }

    pub fn timing_out(mut self) -> Self {
        self.timed_out = true;
        self
    }

    fn matches(&self, command: &str, args: &[&str]) -> bool {
        self.command == command && self.args.iter().all(|a| args.contains(&a.as_str()))
    }
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self {
            outputs: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::Mutex::new(Vec::new()),
            unavailable: false,
        }
    }

    pub fn with_outputs(outputs: Vec<MockCommandResult>) -> Self {
        Self {
            outputs: std::sync::Mutex::new(outputs),
            ..Self::new()
        }
    }

    /// Executor whose binary cannot be found
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn add_output(&self, output: MockCommandResult) {
        let mut outputs = self.outputs.lock().unwrap();
        outputs.push(output);
    }

    /// All recorded invocations
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded invocations containing `needle`
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }
}

#[cfg(test)]
impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        _working_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<Output> {
        let mut line = vec![command];
        line.extend_from_slice(args);
        let line = line.join(" ");
        self.calls.lock().unwrap().push(line.clone());

        if self.unavailable {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"))
                .with_context(|| format!("Failed to execute {}", command));
        }

        let outputs = self.outputs.lock().unwrap();
        if let Some(mock_result) = outputs.iter().find(|r| r.matches(command, args)) {
            if mock_result.timed_out {
                return Err(CommandTimedOut {
                    command: line,
                    limit: timeout.unwrap_or_default(),
                }
                .into());
            }
            return Ok(Output {
                status: create_exit_status(mock_result.exit_code),
                stdout: mock_result.stdout.clone().into_bytes(),
                stderr: mock_result.stderr.clone().into_bytes(),
            });
        }

        // Default: successful empty output
        Ok(Output {
            status: create_exit_status(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(test)]
fn create_exit_status(code: i32) -> std::process::ExitStatus {
    // ExitStatus can't be constructed directly
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status stores the exit code in the high byte
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}
