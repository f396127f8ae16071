//! External process execution.
//!
//! [`ToolRunner`] is the seam between the format analyzer and the operating
//! system. [`ProcessRunner`] spawns a real child process; tests substitute a
//! recording fake.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::LinterError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Hard deadline for the whole invocation.
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line for log messages.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// Runs external commands.
///
/// A non-zero exit status is not an error; callers inspect [`ToolOutput`].
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, LinterError>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, LinterError> {
        debug!("Running: {}", invocation.display());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LinterError::tool_launch(&invocation.program, e.to_string()))?;

        // Drain both pipes concurrently so a chatty tool cannot block on a
        // full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match invocation.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout, &invocation.program)?,
            None => child.wait()?,
        };

        let output = ToolOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!(
            "'{}' exited with {:?} ({} bytes of output)",
            invocation.program,
            output.code,
            output.stdout.len() + output.stderr.len()
        );
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            warn!("Failed to read tool output: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Waits for `child`, killing it once `timeout` has elapsed.
///
/// The child has been reaped when this returns, whatever the outcome.
fn wait_with_deadline(
    child: &mut std::process::Child,
    timeout: Duration,
    program: &str,
) -> Result<ExitStatus, LinterError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!("'{}' exceeded {}s; killing it", program, timeout.as_secs());
            if let Err(e) = child.kill() {
                debug!("kill failed: {}", e);
            }
            child.wait()?;
            return Err(LinterError::ToolTimeout {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("dotnet", "/tmp")
            .arg("format")
            .arg("/tmp/deltalint.csproj");
        assert_eq!(invocation.display(), "dotnet format /tmp/deltalint.csproj");
    }

    #[test]
    fn test_combined_output() {
        let output = ToolOutput {
            code: Some(2),
            stdout: "a".to_string(),
            stderr: "b\n".to_string(),
        };
        assert_eq!(output.combined(), "a\nb\n");
        assert!(!output.success());
    }

    #[test]
    fn test_launch_failure() {
        let temp = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("/nonexistent/deltalint-tool", temp.path());
        let err = ProcessRunner.run(&invocation).unwrap_err();
        assert!(matches!(err, LinterError::ToolLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_both_streams_and_exit_code() {
        let temp = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("sh", temp.path())
            .arg("-c")
            .arg("echo out; echo err 1>&2; exit 3");
        let output = ProcessRunner.run(&invocation).unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let temp = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("sh", temp.path())
            .arg("-c")
            .arg("exec sleep 30")
            .timeout(Some(Duration::from_millis(200)));

        let started = Instant::now();
        let err = ProcessRunner.run(&invocation).unwrap_err();

        assert!(matches!(err, LinterError::ToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
