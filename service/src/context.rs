use std::sync::Arc;

use backup_config::BackupConfig;
use backup_log::StatusLog;
use chrono::{DateTime, Local};
use command_runner::ops::CommandRunnerOps;

use crate::file_system_ops::FileSystemOps;

/// Context object that flows through the backup pipeline.
///
/// Carries the shared dependencies every step needs plus the state the run
/// accumulates: the HTML report body, the ordered error list, and the overall
/// success flag. The flag is monotonic: it starts `true` and nothing resets
/// it once a recorded error has flipped it to `false`.
pub struct RunContext<R: CommandRunnerOps, F: FileSystemOps> {
    pub config: Arc<BackupConfig>,
    pub runner: Arc<R>,
    pub fs_ops: Arc<F>,
    pub log: Arc<StatusLog>,
    pub started_at: DateTime<Local>,

    report_body: String,
    error_lines: Vec<String>,
    backup_success: bool,
}

impl<R: CommandRunnerOps, F: FileSystemOps> RunContext<R, F> {
    pub fn new(
        config: Arc<BackupConfig>,
        runner: Arc<R>,
        fs_ops: Arc<F>,
        log: Arc<StatusLog>,
    ) -> Self {
        Self {
            config,
            runner,
            fs_ops,
            log,
            started_at: Local::now(),
            report_body: String::new(),
            error_lines: Vec::new(),
            backup_success: true,
        }
    }

    /// Records a paragraph in the report and the status log.
    pub fn record(&mut self, message: &str) {
        self.push(message, false, false);
    }

    /// Records a section heading in the report and a banner in the log.
    pub fn record_section(&mut self, message: &str) {
        self.push(message, true, false);
    }

    /// Records an error: the styled fragment goes into the report body and
    /// the error list, and the run is marked failed.
    pub fn record_error(&mut self, message: &str) {
        self.push(message, false, true);
    }

    /// Writes a line to the status log without adding it to the report.
    /// Used for detail lines (stderr excerpts, skip notices) that would only
    /// clutter the email.
    pub fn log_line(&self, message: &str) {
        if let Err(e) = self.log.log(message) {
            tracing::warn!("Failed to write to status log: {e}");
        }
    }

    pub fn report_body(&self) -> &str {
        &self.report_body
    }

    pub fn error_lines(&self) -> &[String] {
        &self.error_lines
    }

    pub fn backup_success(&self) -> bool {
        self.backup_success
    }

    // Single funnel for every recorded message. The error-list append, the
    // success flip and the body append happen together, before the log write:
    // a failed log write must not lose a recorded error.
    fn push(&mut self, message: &str, section: bool, error: bool) {
        let mut fragment = if section {
            format!("<h2>{message}</h2>")
        } else {
            format!("<p>{message}</p>")
        };
        if error {
            fragment = format!("<strong style='color: red;'>{fragment}</strong><br>");
            self.error_lines.push(fragment.clone());
            self.backup_success = false;
        }
        self.report_body.push_str(&fragment);
        self.report_body.push('\n');

        let logged = if section {
            self.log.log_section(message)
        } else {
            self.log.log(message)
        };
        if let Err(e) = logged {
            tracing::warn!("Failed to write to status log: {e}");
        }
    }
}
