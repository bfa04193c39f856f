use std::time::Duration;

pub mod ops;

/// Marker placed in stderr when a command is cut off by its timeout.
/// Callers classify a timed-out command like any other nonzero exit.
pub const TIMEOUT_MARKER: &str = "TimeoutExpired";

/// Captured outcome of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Successful output with the given stdout. Mostly useful for scripting
    /// mock responses in tests.
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Sentinel returned when a command ran past its timeout.
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            exit_code: 1,
            stdout: String::new(),
            stderr: TIMEOUT_MARKER.to_string(),
            elapsed,
        }
    }
}
