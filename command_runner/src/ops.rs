use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_process::Command;
use backup_log::StatusLog;

use crate::CommandOutput;

/// Trait for shell command execution.
///
/// This trait abstracts command execution to allow for different
/// implementations, including mocks for testing purposes. Note that `run`
/// never fails: a timeout or spawn error is folded into the returned
/// [`CommandOutput`] so callers classify every outcome the same way.
#[async_trait::async_trait]
pub trait CommandRunnerOps: Send + Sync {
    /// Runs `command` in a subshell, bounded by `timeout`.
    ///
    /// # Arguments
    /// * `command` - Shell command line, passed to `sh -c`
    /// * `verbose` - Echo captured stdout/stderr to the console for this call
    /// * `timeout` - Upper bound on the child's runtime
    async fn run(&self, command: &str, verbose: bool, timeout: Duration) -> CommandOutput;
}

/// Default implementation that spawns real child processes.
///
/// Every invocation is logged to the status log before execution. Output is
/// echoed to the console when the per-call or the global verbose flag is set.
pub struct DefaultCommandRunnerOps {
    log: Arc<StatusLog>,
    verbose: bool,
}

impl DefaultCommandRunnerOps {
    pub fn new(log: Arc<StatusLog>, verbose: bool) -> Self {
        Self { log, verbose }
    }
}

#[async_trait::async_trait]
impl CommandRunnerOps for DefaultCommandRunnerOps {
    async fn run(&self, command: &str, verbose: bool, timeout: Duration) -> CommandOutput {
        if let Err(e) = self.log.log(&format!("Running command: {command}")) {
            tracing::warn!("Failed to write to status log: {e}");
        }

        let started = Instant::now();
        let child_output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output();

        let output = match async_std::future::timeout(timeout, child_output).await {
            Err(_) => {
                // Dropping the output future kills the child.
                if let Err(e) = self.log.log(&format!("Command timed out: {command}")) {
                    tracing::warn!("Failed to write to status log: {e}");
                }
                CommandOutput::timed_out(started.elapsed())
            }
            Ok(Err(e)) => CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: e.to_string(),
                elapsed: started.elapsed(),
            },
            Ok(Ok(output)) => CommandOutput {
                exit_code: output.status.code().unwrap_or(1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                elapsed: started.elapsed(),
            },
        };

        if verbose || self.verbose {
            println!("{}", output.stdout);
            println!("{}", output.stderr);
        }
        output
    }
}

/// Represents a recorded call to a command runner operation.
///
/// Used by [`MockCommandRunnerOps`] to track and verify command invocations
/// in tests.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub command: String,
    pub verbose: bool,
    pub timeout: Duration,
}

/// Mock implementation for testing command execution.
///
/// Responses are scripted by command substring: the first registered pattern
/// contained in the invoked command line wins. Unmatched commands succeed
/// with empty output. All calls are tracked in order.
#[derive(Clone, Default)]
pub struct MockCommandRunnerOps {
    responses: Arc<Mutex<Vec<(String, CommandOutput)>>>,
    sequenced: Arc<Mutex<Vec<SequencedResponse>>>,
    calls: Arc<Mutex<Vec<RecordedCommand>>>,
}

struct SequencedResponse {
    pattern: String,
    nth: usize,
    seen: usize,
    output: CommandOutput,
}

impl MockCommandRunnerOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output returned for commands containing `pattern`.
    pub fn respond_with(&self, pattern: impl Into<String>, output: CommandOutput) {
        self.responses.lock().unwrap().push((pattern.into(), output));
    }

    /// Script a nonzero exit with the given stderr for matching commands.
    pub fn fail_matching(&self, pattern: impl Into<String>, stderr: impl Into<String>) {
        self.respond_with(pattern, CommandOutput::failed(1, stderr));
    }

    /// Script an output consumed only by the `nth` call (1-based) whose
    /// command contains `pattern`. Other matching calls fall through to the
    /// plain responses.
    pub fn respond_when_called(
        &self,
        pattern: impl Into<String>,
        nth: usize,
        output: CommandOutput,
    ) {
        self.sequenced.lock().unwrap().push(SequencedResponse {
            pattern: pattern.into(),
            nth,
            seen: 0,
            output,
        });
    }

    /// Returns all calls made to `run`, in order.
    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns just the command lines, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.command.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CommandRunnerOps for MockCommandRunnerOps {
    async fn run(&self, command: &str, verbose: bool, timeout: Duration) -> CommandOutput {
        self.calls.lock().unwrap().push(RecordedCommand {
            command: command.to_string(),
            verbose,
            timeout,
        });

        let mut sequenced = self.sequenced.lock().unwrap();
        let mut hit = None;
        for rule in sequenced.iter_mut() {
            if command.contains(rule.pattern.as_str()) {
                rule.seen += 1;
                if rule.seen == rule.nth && hit.is_none() {
                    hit = Some(rule.output.clone());
                }
            }
        }
        if let Some(output) = hit {
            return output;
        }

        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::succeeded(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_log(dir: &std::path::Path) -> Arc<StatusLog> {
        Arc::new(StatusLog::new(dir.join("backup.log"), false))
    }

    #[async_std::test]
    async fn test_default_runner_captures_output() {
        let dir = tempdir().unwrap();
        let runner = DefaultCommandRunnerOps::new(test_log(dir.path()), false);

        let output = runner
            .run("echo hello && echo oops >&2", false, Duration::from_secs(30))
            .await;

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[async_std::test]
    async fn test_default_runner_reports_exit_code() {
        let dir = tempdir().unwrap();
        let runner = DefaultCommandRunnerOps::new(test_log(dir.path()), false);

        let output = runner.run("exit 3", false, Duration::from_secs(30)).await;

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[async_std::test]
    async fn test_default_runner_logs_invocation() {
        let dir = tempdir().unwrap();
        let log = test_log(dir.path());
        let runner = DefaultCommandRunnerOps::new(log.clone(), false);

        runner.run("true", false, Duration::from_secs(30)).await;

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("Running command: true"));
    }

    #[async_std::test]
    async fn test_default_runner_timeout_sentinel() {
        let dir = tempdir().unwrap();
        let runner = DefaultCommandRunnerOps::new(test_log(dir.path()), false);

        let output = runner
            .run("sleep 10", false, Duration::from_millis(100))
            .await;

        assert_eq!(output.exit_code, 1);
        assert!(output.stdout.is_empty());
        assert_eq!(output.stderr, crate::TIMEOUT_MARKER);
    }

    #[async_std::test]
    async fn test_mock_matches_by_substring_in_order() {
        let mock = MockCommandRunnerOps::new();
        mock.respond_with("list locks", CommandOutput::succeeded("lock-id-1"));
        mock.fail_matching("forget", "repository locked");

        let locks = mock
            .run("restic -r /repo list locks", true, Duration::from_secs(600))
            .await;
        assert_eq!(locks.stdout, "lock-id-1");

        let forget = mock
            .run("restic -r /repo forget --prune", true, Duration::from_secs(600))
            .await;
        assert_eq!(forget.exit_code, 1);
        assert_eq!(forget.stderr, "repository locked");

        // Unscripted commands succeed with empty output.
        let other = mock.run("du -sh /repo", false, Duration::from_secs(600)).await;
        assert!(other.success());

        assert_eq!(mock.total_calls(), 3);
        assert_eq!(mock.commands()[0], "restic -r /repo list locks");
        assert_eq!(mock.calls()[1].timeout, Duration::from_secs(600));
    }

    #[async_std::test]
    async fn test_mock_sequenced_response_hits_only_nth_call() {
        let mock = MockCommandRunnerOps::new();
        mock.respond_when_called("list locks", 2, CommandOutput::succeeded("lock-id-1"));

        let first = mock.run("restic list locks", true, Duration::from_secs(5)).await;
        assert!(first.stdout.is_empty());

        let second = mock.run("restic list locks", true, Duration::from_secs(5)).await;
        assert_eq!(second.stdout, "lock-id-1");

        let third = mock.run("restic list locks", true, Duration::from_secs(5)).await;
        assert!(third.stdout.is_empty());
    }
}
