use std::sync::Arc;

use chrono::Local;
use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::database_backup::DatabaseBackupStep;
use crate::file_system_ops::FileSystemOps;
use crate::log_rotation::LogRotationStep;
use crate::mailer_ops::MailerOps;
use crate::notifier::Notifier;
use crate::pipeline::BackupPipeline;
use crate::restic_backup::ResticBackupStep;
use crate::software_inventory::SoftwareInventoryStep;

/// Orchestrates one full run: banner, pipeline, banner, notification.
///
/// `simulate_failure` records a synthetic error after the pipeline so the
/// failure reporting path can be exercised end to end against real backups.
pub struct BackupService<M: MailerOps> {
    notifier: Notifier<M>,
    simulate_failure: bool,
}

impl<M: MailerOps> BackupService<M> {
    pub fn new(mailer: Arc<M>, simulate_failure: bool) -> Self {
        Self {
            notifier: Notifier::new(mailer),
            simulate_failure,
        }
    }

    pub async fn run<R: CommandRunnerOps, F: FileSystemOps>(
        &self,
        context: &mut RunContext<R, F>,
    ) {
        if let Err(e) = context.log.log_section("Backup Process Started") {
            tracing::warn!("Failed to write to status log: {e}");
        }

        let pipeline = BackupPipeline::with_steps(vec![
            Box::new(DatabaseBackupStep),
            Box::new(ResticBackupStep),
            Box::new(SoftwareInventoryStep),
            Box::new(LogRotationStep),
        ]);
        pipeline.execute(context).await;

        if self.simulate_failure {
            context.record_error("Error: Simulated failure for testing purposes!");
        }

        let finished_at = Local::now();
        if let Err(e) = context.log.log_section("Backup Process Completed") {
            tracing::warn!("Failed to write to status log: {e}");
        }

        self.notifier.dispatch(context, finished_at).await;
    }
}
