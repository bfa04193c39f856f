use std::time::Duration;

use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::FileSystemOps;

const STATS_TIMEOUT: Duration = Duration::from_secs(3600);
const DU_TIMEOUT: Duration = Duration::from_secs(3600);

const UNKNOWN: &str = "unknown";

/// Records the size section of the report: logical (restorable) size of the
/// repository, its on-disk size after deduplication and compression, and the
/// size of the local staging directory. Each figure is attempted
/// independently; a failure yields "unknown" rather than blocking the rest.
pub async fn report_size_information<R: CommandRunnerOps, F: FileSystemOps>(
    context: &mut RunContext<R, F>,
) {
    context.record_section("Backup Size Information");

    let uncompressed = uncompressed_size(context).await;
    let compressed = compressed_size(context).await;
    let staging_mb = staging_size_mb(context);

    context.record(&format!(
        "Restic repository uncompressed size: {uncompressed}"
    ));
    context.record(&format!("Restic repository compressed size: {compressed}"));
    match staging_mb {
        Some(mb) => context.record(&format!("Total size of backup folder: {mb:.2} MB")),
        None => context.record("Total size of backup folder: unknown"),
    }
}

/// Pulls the transferred/stored figures out of restic's backup summary line,
/// e.g. `Added to the repository: 1.2 GiB (800 MiB stored)`.
pub fn extract_backup_size(stdout: &str) -> Option<(String, String)> {
    let line = stdout
        .lines()
        .find(|line| line.contains("Added to the repository:"))?;
    let rest = line.split("Added to the repository:").nth(1)?;
    let transferred = rest.split(" (").next()?.trim().to_string();
    let stored = rest.split('(').nth(1)?.split(" stored").next()?.trim().to_string();
    Some((transferred, stored))
}

async fn uncompressed_size<R: CommandRunnerOps, F: FileSystemOps>(
    context: &RunContext<R, F>,
) -> String {
    let command = format!(
        "restic -r {} --password-file {} stats --mode restore-size",
        context.config.restic_repository.display(),
        context.config.restic_password_file.display()
    );
    let output = context.runner.run(&command, true, STATS_TIMEOUT).await;
    if output.success() {
        if let Some(line) = output.stdout.lines().find(|line| line.contains("Total Size")) {
            if let Some(value) = line.split(':').nth(1) {
                return value.trim().to_string();
            }
        }
    }
    UNKNOWN.to_string()
}

async fn compressed_size<R: CommandRunnerOps, F: FileSystemOps>(
    context: &RunContext<R, F>,
) -> String {
    let command = format!("du -sh {}", context.config.restic_repository.display());
    let output = context.runner.run(&command, true, DU_TIMEOUT).await;
    if output.success() {
        if let Some(size) = output.stdout.split_whitespace().next() {
            return size.to_string();
        }
    }
    UNKNOWN.to_string()
}

fn staging_size_mb<R: CommandRunnerOps, F: FileSystemOps>(
    context: &RunContext<R, F>,
) -> Option<f64> {
    context
        .fs_ops
        .dir_size(&context.config.base_backup_dir)
        .ok()
        .map(|bytes| bytes as f64 / (1024.0 * 1024.0))
}
