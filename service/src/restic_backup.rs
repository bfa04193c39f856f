use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use backup_config::BackupConfig;
use chrono::{Datelike, Local};
use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::duration_format::format_duration;
use crate::file_system_ops::FileSystemOps;
use crate::pipeline::BackupStep;
use crate::size_calculator::{extract_backup_size, report_size_information};

const LOCK_CHECK_TIMEOUT: Duration = Duration::from_secs(600);
const BACKUP_TIMEOUT: Duration = Duration::from_secs(3600);
const FORGET_TIMEOUT: Duration = Duration::from_secs(600);

/// Cadence label attached to a run based on the day of month. Affects only
/// the wording of log and report messages; the backup itself is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupCadence {
    Daily,
    Weekly,
    Monthly,
}

impl BackupCadence {
    pub fn for_day(day: u32) -> Self {
        if day == 1 {
            BackupCadence::Monthly
        } else if day % 7 == 0 {
            BackupCadence::Weekly
        } else {
            BackupCadence::Daily
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackupCadence::Daily => "daily",
            BackupCadence::Weekly => "weekly",
            BackupCadence::Monthly => "monthly",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            BackupCadence::Daily => "Daily",
            BackupCadence::Weekly => "Weekly",
            BackupCadence::Monthly => "Monthly",
        }
    }
}

/// The set of paths handed to restic: the configured defaults plus every
/// service path group with at least one directory present on this host.
pub fn collect_backup_targets<F: FileSystemOps>(
    config: &BackupConfig,
    fs_ops: &F,
) -> BTreeSet<PathBuf> {
    let mut targets: BTreeSet<PathBuf> = config.default_paths.iter().cloned().collect();
    for paths in config.service_paths.values() {
        if paths.iter().any(|path| fs_ops.is_dir(path)) {
            targets.extend(paths.iter().cloned());
        }
    }
    targets
}

/// Runs the restic backup against the collected target set, reports size
/// statistics, and applies the retention policy.
///
/// The repository lock is checked first: a held lock aborts the whole step,
/// including sizes and retention. The check-then-act window is not atomic;
/// restic's own lock is the real arbiter and a concurrent run will simply
/// fail there.
pub struct ResticBackupStep;

#[async_trait::async_trait]
impl<R: CommandRunnerOps, F: FileSystemOps> BackupStep<R, F> for ResticBackupStep {
    fn name(&self) -> &'static str {
        "restic_backup"
    }

    async fn execute(&self, context: &mut RunContext<R, F>) {
        let cadence = BackupCadence::for_day(Local::now().day());
        run_backup(context, cadence).await;
    }
}

async fn run_backup<R: CommandRunnerOps, F: FileSystemOps>(
    context: &mut RunContext<R, F>,
    cadence: BackupCadence,
) {
    context.record_section(&format!("Restic {} Backup", cadence.title()));
    context.record(&format!("Starting restic {} backup...", cadence.label()));

    if is_repository_locked(context).await {
        context.record_error(
            "Error: Restic repository is locked! Cannot start backup. \
             Use `restic unlock` to unlock the repository.",
        );
        return;
    }

    let targets = collect_backup_targets(&context.config, context.fs_ops.as_ref());
    let target_list = targets
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let backup_command = format!(
        "restic -r {} --password-file {} backup {}",
        context.config.restic_repository.display(),
        context.config.restic_password_file.display(),
        target_list
    );
    let output = context.runner.run(&backup_command, true, BACKUP_TIMEOUT).await;

    if !output.success() {
        let line = context.log.next_line_number();
        context.record_error(&format!(
            "Error: Restic {} backup failed! See log for details at line {line}.",
            cadence.label()
        ));
        context.log_line(&format!(
            "Error: Restic {} backup failed! {}",
            cadence.label(),
            output.stderr
        ));
    } else {
        context.record(&format!(
            "Restic {} backup completed successfully in {}.",
            cadence.label(),
            format_duration(output.elapsed)
        ));
        let files_processed = output.stdout.matches("processed").count();
        match extract_backup_size(&output.stdout) {
            Some((transferred, stored)) => context.record(&format!(
                "Files processed: {files_processed}, Data transferred: {transferred}, \
                 Data stored: {stored}"
            )),
            None => context.record(&format!(
                "Files processed: {files_processed}, Backup size: unknown"
            )),
        }
    }

    // Sizes and retention run even after a failed backup; each classifies
    // and records its own outcome.
    report_size_information(context).await;
    apply_retention_policy(context).await;
}

/// Prunes old snapshots: the most recent 7 daily, 4 weekly, 12 monthly and
/// 1 yearly are kept. Re-checks the lock; a held lock records an error and
/// skips the prune.
async fn apply_retention_policy<R: CommandRunnerOps, F: FileSystemOps>(
    context: &mut RunContext<R, F>,
) {
    context.record("Applying retention policy...");

    if is_repository_locked(context).await {
        context.record_error(
            "Error: Restic repository is locked! Cannot apply retention policy. \
             Use `restic unlock` to unlock the repository.",
        );
        return;
    }

    let forget_command = format!(
        "restic -r {} --password-file {} forget --keep-daily 7 --keep-weekly 4 \
         --keep-monthly 12 --keep-yearly 1 --prune",
        context.config.restic_repository.display(),
        context.config.restic_password_file.display()
    );
    let output = context.runner.run(&forget_command, true, FORGET_TIMEOUT).await;

    if !output.success() {
        let line = context.log.next_line_number();
        context.record_error(&format!(
            "Error: Retention policy application failed! See log for details at line {line}."
        ));
        context.log_line(&format!(
            "Error: Retention policy application failed! {}",
            output.stderr
        ));
    } else {
        context.record(&format!(
            "Retention policy applied successfully in {}.",
            format_duration(output.elapsed)
        ));
    }
}

/// Locked means the lock listing succeeded and printed at least one lock.
/// A failing check is logged and treated as unlocked so a broken `list
/// locks` never blocks the backup; restic itself still refuses to run
/// against a genuinely locked repository.
async fn is_repository_locked<R: CommandRunnerOps, F: FileSystemOps>(
    context: &RunContext<R, F>,
) -> bool {
    let repository = context.config.restic_repository.display();
    let command = format!(
        "restic -r {} --password-file {} list locks",
        repository,
        context.config.restic_password_file.display()
    );
    let output = context.runner.run(&command, true, LOCK_CHECK_TIMEOUT).await;

    if !output.success() {
        context.log_line(&format!(
            "Error checking locks for repository {}: {}",
            repository, output.stderr
        ));
        return false;
    }
    if !output.stdout.trim().is_empty() {
        context.log_line(&format!("Restic repository {repository} is locked."));
        return true;
    }
    context.log_line(&format!("Restic repository {repository} is not locked."));
    false
}
