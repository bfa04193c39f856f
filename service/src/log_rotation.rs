use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::FileSystemOps;
use crate::pipeline::BackupStep;

/// Deletes old run logs from the log directory, keeping the newest
/// `retention_days` files by modification time. The limit is a file count,
/// not an age; one run per day makes the two equivalent in practice.
pub struct LogRotationStep;

#[async_trait::async_trait]
impl<R: CommandRunnerOps, F: FileSystemOps> BackupStep<R, F> for LogRotationStep {
    fn name(&self) -> &'static str {
        "log_rotation"
    }

    async fn execute(&self, context: &mut RunContext<R, F>) {
        context.record_section("Log Rotation");
        context.record(&format!(
            "Rotating backup logs, keeping the last {} files...",
            context.config.retention_days
        ));

        let mut entries = match context.fs_ops.read_dir(&context.config.log_dir) {
            Ok(entries) => entries,
            Err(e) => {
                context.record_error(&format!(
                    "Error: Cannot list log directory {}! {e}",
                    context.config.log_dir.display()
                ));
                return;
            }
        };

        let keep = context.config.retention_days;
        if entries.len() <= keep {
            context.record("No old log files to delete.");
            return;
        }

        entries.sort_by_key(|entry| entry.modified);
        let excess = entries.len() - keep;
        let mut deleted = 0usize;
        for entry in entries.into_iter().take(excess) {
            match context.fs_ops.remove_file(&entry.path) {
                Ok(()) => {
                    context.log_line(&format!("Deleted old log file: {}", entry.path.display()));
                    deleted += 1;
                }
                Err(e) => {
                    context.record_error(&format!(
                        "Error: Cannot delete old log file {}! {e}",
                        entry.path.display()
                    ));
                }
            }
        }
        context.record(&format!("Deleted {deleted} old log files."));
    }
}
