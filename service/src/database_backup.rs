use std::time::Duration;

use chrono::Local;
use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::FileSystemOps;
use crate::pipeline::BackupStep;

/// System catalogs that are never dumped.
const EXCLUDED_DATABASES: [&str; 2] = ["information_schema", "performance_schema"];

/// mysqldump can exit 0 and still report an internal error on stderr; the
/// marker makes such dumps count as failures.
const DUMP_ERROR_MARKER: &str = "mysqldump: Got error:";

const LIST_TIMEOUT: Duration = Duration::from_secs(600);
const DUMP_TIMEOUT: Duration = Duration::from_secs(600);

/// Dumps every non-system database into a per-date directory, one compressed
/// file per database. A single failing dump is recorded and the loop keeps
/// going: partial success is expected and reported per database.
pub struct DatabaseBackupStep;

#[async_trait::async_trait]
impl<R: CommandRunnerOps, F: FileSystemOps> BackupStep<R, F> for DatabaseBackupStep {
    fn name(&self) -> &'static str {
        "database_backup"
    }

    fn should_execute(&self, context: &RunContext<R, F>) -> bool {
        context.config.mysql.is_some()
    }

    async fn execute(&self, context: &mut RunContext<R, F>) {
        let Some(mysql) = context.config.mysql.clone() else {
            return;
        };

        context.record_section("Database Backup");
        context.log_line("Starting database backup...");

        let backup_date = Local::now().format("%Y-%m-%d").to_string();
        let dump_dir = context.config.mysql_backup_dir.join(&backup_date);
        if let Err(e) = context.fs_ops.create_dir_all(&dump_dir) {
            context.record_error(&format!(
                "Error: Cannot create database backup directory {}! {e}",
                dump_dir.display()
            ));
            return;
        }

        let list_command = format!(
            "/usr/bin/mysql -u {} -p{} -e 'SHOW DATABASES;'",
            mysql.user, mysql.password
        );
        let listing = context.runner.run(&list_command, false, LIST_TIMEOUT).await;
        if !listing.success() {
            let line = context.log.next_line_number();
            context.record_error(&format!(
                "Error: Cannot list databases! See log for details at line {line}."
            ));
            context.log_line(&format!("Error: Cannot list databases! {}", listing.stderr));
            return;
        }

        // First token is the SHOW DATABASES header row.
        let databases: Vec<String> = listing
            .stdout
            .split_whitespace()
            .skip(1)
            .map(str::to_string)
            .collect();

        for database in databases {
            if EXCLUDED_DATABASES.contains(&database.as_str()) {
                context.log_line(&format!("Skipping backup for database: {database}"));
                continue;
            }

            let dump_file = dump_dir.join(format!("{database}.sql.gz"));
            let dump_command = format!(
                "/usr/bin/mysqldump -u {} -p{} {} | gzip > {}",
                mysql.user,
                mysql.password,
                database,
                dump_file.display()
            );
            let dump = context.runner.run(&dump_command, false, DUMP_TIMEOUT).await;

            if !dump.success() || dump.stderr.contains(DUMP_ERROR_MARKER) {
                let line = context.log.next_line_number();
                context.record_error(&format!(
                    "Error: Database backup failed for {database}! See log for details at line {line}."
                ));
                context.log_line(&format!(
                    "Error: Database backup failed for {database}! {}",
                    dump.stderr
                ));
            } else {
                context.record(&format!("Database {database} backed up successfully."));
            }
        }
    }
}
