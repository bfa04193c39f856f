use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::duration_format::format_duration;
use crate::error::Error;
use crate::file_system_ops::FileSystemOps;

/// Machine-readable outcome of one run, persisted to the status directory so
/// monitoring can pick it up even when email delivery is down.
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub server_name: String,
    pub success: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Written as a `Log File` line on failed runs so the operator knows
    /// where to look.
    pub log_file: Option<PathBuf>,
}

impl StatusRecord {
    /// Start timestamp in the file name keeps one artifact per run.
    pub fn file_name(&self) -> String {
        format!(
            "backup_status_{}_{}.txt",
            self.server_name,
            self.started_at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn render(&self) -> String {
        let duration = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        let mut lines = format!(
            "Server: {}\nStatus: {}\nStart Time: {}\nEnd Time: {}\nDuration: {}\n",
            self.server_name,
            if self.success { "Success" } else { "Failed" },
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            format_duration(duration)
        );
        if let Some(log_file) = &self.log_file {
            lines.push_str(&format!("Log File: {}\n", log_file.display()));
        }
        lines
    }

    /// Writes the record into `status_dir` and returns the artifact path.
    pub fn write_to<F: FileSystemOps>(&self, fs_ops: &F, status_dir: &Path) -> Result<PathBuf, Error> {
        let path = status_dir.join(self.file_name());
        fs_ops.write_file(&path, &self.render())?;
        Ok(path)
    }
}

/// Appends the email outcome to an already-written status artifact.
pub fn append_email_outcome<F: FileSystemOps>(
    fs_ops: &F,
    artifact: &Path,
    status: &str,
    error: Option<&str>,
) -> Result<(), Error> {
    let mut lines = format!("Email Status: {status}\n");
    if let Some(error) = error {
        lines.push_str(&format!("Email Error: {error}\n"));
    }
    fs_ops.append_file(artifact, &lines)?;
    Ok(())
}
