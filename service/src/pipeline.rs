use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::FileSystemOps;

/// A trait for defining backup pipeline steps.
///
/// Each step receives the mutable run context and reports its outcome by
/// recording into it. Steps do not return errors: a failing step marks the
/// run failed through the context and the pipeline moves on, so one broken
/// external tool never prevents the remaining backups from being attempted.
#[async_trait::async_trait]
pub trait BackupStep<R: CommandRunnerOps, F: FileSystemOps>: Send + Sync {
    /// Returns the name of this step for logging and debugging.
    fn name(&self) -> &'static str;

    /// Determines if this step should execute based on current context.
    fn should_execute(&self, _context: &RunContext<R, F>) -> bool {
        true // By default, always execute
    }

    /// Execute the step, recording results into the context.
    async fn execute(&self, context: &mut RunContext<R, F>);
}

/// Executes a fixed sequence of backup steps in order.
pub struct BackupPipeline<R: CommandRunnerOps, F: FileSystemOps> {
    steps: Vec<Box<dyn BackupStep<R, F>>>,
}

impl<R: CommandRunnerOps, F: FileSystemOps> BackupPipeline<R, F> {
    /// Create a pipeline with the given steps.
    pub fn with_steps(steps: Vec<Box<dyn BackupStep<R, F>>>) -> Self {
        Self { steps }
    }

    /// Runs every step in sequence. No step is gated on an earlier step's
    /// success; only the final report depends on the aggregate outcome.
    pub async fn execute(&self, context: &mut RunContext<R, F>) {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::info!("Step {} will be skipped based on context", step.name());
                continue;
            }

            tracing::info!("Executing step: {}", step.name());
            step.execute(context).await;
        }
    }
}
