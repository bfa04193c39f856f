use std::sync::Arc;

use chrono::{DateTime, Local};
use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::duration_format::format_duration;
use crate::file_system_ops::FileSystemOps;
use crate::mailer_ops::{EmailMessage, MailerOps};
use crate::status_record::{append_email_outcome, StatusRecord};

/// Final stage of a run: renders the HTML report, persists the status
/// artifact, and attempts the email. Delivery problems are appended to the
/// artifact and never escalated; by this point the backups themselves are
/// done and the run's outcome is already decided.
pub struct Notifier<M: MailerOps> {
    mailer: Arc<M>,
}

impl<M: MailerOps> Notifier<M> {
    pub fn new(mailer: Arc<M>) -> Self {
        Self { mailer }
    }

    pub async fn dispatch<R: CommandRunnerOps, F: FileSystemOps>(
        &self,
        context: &RunContext<R, F>,
        finished_at: DateTime<Local>,
    ) {
        let config = &context.config;
        let success = context.backup_success();
        let html = build_report(context, finished_at);

        // Transient copy of the body, kept only for the duration of the
        // send so a delivery failure can be diagnosed from disk.
        if let Err(e) = context.fs_ops.write_file(&config.email_body_path, &html) {
            context.log_line(&format!(
                "Cannot write email body file {}: {e}",
                config.email_body_path.display()
            ));
        }

        let record = StatusRecord {
            server_name: config.server_name.clone(),
            success,
            started_at: context.started_at,
            finished_at,
            log_file: (!success).then(|| config.log_file.clone()),
        };
        let artifact = match record.write_to(context.fs_ops.as_ref(), &config.status_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                context.log_line(&format!("Cannot write status artifact: {e}"));
                None
            }
        };

        let (email_status, email_error) = if success && !config.send_success_email {
            context.log_line("Backup succeeded; success emails are disabled, not sending.");
            ("Skipped".to_string(), None)
        } else {
            let message = EmailMessage {
                from: config.email_from.clone(),
                to: config.email_to.clone(),
                subject: subject_line(success, &config.server_name, context.started_at),
                html_body: html,
                attachment: (!success).then(|| config.log_file.clone()),
            };
            match self.mailer.send(&message).await {
                Ok(()) => {
                    context.log_line("Status email sent.");
                    ("Sent".to_string(), None)
                }
                Err(e) => {
                    context.log_line(&format!("Failed to send status email: {e}"));
                    ("Failed".to_string(), Some(e.to_string()))
                }
            }
        };

        if let Some(artifact) = artifact {
            if let Err(e) = append_email_outcome(
                context.fs_ops.as_ref(),
                &artifact,
                &email_status,
                email_error.as_deref(),
            ) {
                context.log_line(&format!("Cannot append email outcome: {e}"));
            }
        }

        // The body file is transient whatever happened to the email.
        if let Err(e) = context.fs_ops.remove_file(&config.email_body_path) {
            context.log_line(&format!(
                "Cannot delete email body file {}: {e}",
                config.email_body_path.display()
            ));
        }
    }
}

pub fn subject_line(success: bool, server_name: &str, started_at: DateTime<Local>) -> String {
    format!(
        "Backup {} for {} - {}",
        if success { "Success" } else { "Failed" },
        server_name,
        started_at.format("%Y-%m-%d")
    )
}

fn build_report<R: CommandRunnerOps, F: FileSystemOps>(
    context: &RunContext<R, F>,
    finished_at: DateTime<Local>,
) -> String {
    let duration = (finished_at - context.started_at).to_std().unwrap_or_default();
    format!(
        "<html><body>\n\
         <h1>Backup Report for {}</h1>\n\
         <p>Backup started at {}</p>\n\
         {}\
         <h2>Backup Timing</h2>\n\
         <p>Start Time: {}</p>\n\
         <p>End Time: {}</p>\n\
         <p>Duration: {}</p>\n\
         </body></html>\n",
        context.config.server_name,
        context.started_at.format("%Y-%m-%d %H:%M:%S"),
        context.report_body(),
        context.started_at.format("%Y-%m-%d %H:%M:%S"),
        finished_at.format("%Y-%m-%d %H:%M:%S"),
        format_duration(duration)
    )
}
