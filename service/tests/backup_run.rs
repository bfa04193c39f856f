//! End-to-end runs against a real temp directory: mocked commands and mail,
//! real filesystem, real status log.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use backup_config::{BackupConfig, MysqlConfig, SmtpConfig};
use backup_log::StatusLog;
use command_runner::ops::MockCommandRunnerOps;
use command_runner::CommandOutput;
use service::backup_service::BackupService;
use service::context::RunContext;
use service::file_system_ops::StdFileSystemOps;
use service::mailer_ops::MockMailerOps;
use service::repository_init::RepositoryInitializer;

fn run_config(root: &Path) -> BackupConfig {
    BackupConfig {
        server_name: "testserver.example.org".to_string(),
        log_dir: root.join("logs"),
        log_file: root.join("logs/backup.log"),
        base_backup_dir: root.join("backup"),
        mysql_backup_dir: root.join("backup/mysql"),
        status_dir: root.join("status"),
        email_body_path: root.join("backup/email_body.html"),
        software_list_file: root.join("backup/software_list.txt"),
        restic_repository: root.join("restic"),
        restic_password_file: root.join("restic_password"),
        default_paths: vec![root.join("data")],
        service_paths: BTreeMap::new(),
        mysql: Some(MysqlConfig {
            user: "root".to_string(),
            password: "secret".to_string(),
        }),
        smtp: SmtpConfig {
            server: "smtp.example.org".to_string(),
            port: 587,
            username: "backup@example.org".to_string(),
            password: "smtp-secret".to_string(),
        },
        email_from: "backup@example.org".to_string(),
        email_to: vec!["admin@example.org".to_string()],
        send_success_email: false,
        retention_days: 7,
    }
}

fn run_context(
    config: Arc<BackupConfig>,
    runner: Arc<MockCommandRunnerOps>,
) -> RunContext<MockCommandRunnerOps, StdFileSystemOps> {
    let log = Arc::new(StatusLog::new(&config.log_file, false));
    RunContext::new(config, runner, Arc::new(StdFileSystemOps), log)
}

fn prepare(config: &Arc<BackupConfig>, runner: &Arc<MockCommandRunnerOps>) {
    let log = Arc::new(StatusLog::new(&config.log_file, false));
    let initializer = RepositoryInitializer::new(
        config.clone(),
        runner.clone(),
        Arc::new(StdFileSystemOps),
        log,
    );
    initializer.ensure_directories().unwrap();
}

fn status_artifact(status_dir: &Path) -> String {
    let mut artifacts: Vec<_> = std::fs::read_dir(status_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(artifacts.len(), 1, "expected exactly one status artifact");
    std::fs::read_to_string(artifacts.remove(0)).unwrap()
}

#[async_std::test]
async fn failing_dump_produces_failed_status_and_email_with_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(run_config(dir.path()));
    let runner = Arc::new(MockCommandRunnerOps::new());
    prepare(&config, &runner);

    runner.respond_with(
        "SHOW DATABASES",
        CommandOutput::succeeded("Database\nappdb\n"),
    );
    runner.fail_matching("mysqldump", "Access denied for user 'root'");
    runner.respond_with("lsb_release", CommandOutput::succeeded("Ubuntu\n"));

    let mut context = run_context(config.clone(), runner.clone());
    let mailer = Arc::new(MockMailerOps::new());
    BackupService::new(mailer.clone(), false).run(&mut context).await;

    assert!(!context.backup_success());

    let status = status_artifact(&config.status_dir);
    assert!(status.contains("Server: testserver.example.org\n"));
    assert!(status.contains("Status: Failed\n"));
    assert!(status.contains(&format!("Log File: {}\n", config.log_file.display())));
    assert!(status.contains("Email Status: Sent\n"));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(
        sent[0]
            .subject
            .starts_with("Backup Failed for testserver.example.org - ")
    );
    assert_eq!(sent[0].attachment.as_deref(), Some(config.log_file.as_path()));
    assert!(sent[0].html_body.contains("Database backup failed for appdb"));

    // Transient body file is gone, the log survives and names the failure.
    assert!(!config.email_body_path.exists());
    let log = std::fs::read_to_string(&config.log_file).unwrap();
    assert!(log.contains("Access denied for user 'root'"));
}

#[async_std::test]
async fn clean_run_skips_email_and_records_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(run_config(dir.path()));
    let runner = Arc::new(MockCommandRunnerOps::new());
    prepare(&config, &runner);

    runner.respond_with(
        "SHOW DATABASES",
        CommandOutput::succeeded("Database\nappdb\n"),
    );
    runner.respond_with("lsb_release", CommandOutput::succeeded("Debian\n"));
    runner.respond_with(
        " backup ",
        CommandOutput::succeeded("Added to the repository: 1.2 GiB (800 MiB stored)\nprocessed 10 files\n"),
    );

    let mut context = run_context(config.clone(), runner.clone());
    let mailer = Arc::new(MockMailerOps::new());
    BackupService::new(mailer.clone(), false).run(&mut context).await;

    assert!(context.backup_success());
    assert_eq!(mailer.total_sent(), 0);

    let status = status_artifact(&config.status_dir);
    assert!(status.contains("Status: Success\n"));
    assert!(status.contains("Email Status: Skipped\n"));
    assert!(!status.contains("Log File:"));
    assert!(!config.email_body_path.exists());
}

#[async_std::test]
async fn first_run_initializes_the_repository() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(run_config(dir.path()));
    let runner = Arc::new(MockCommandRunnerOps::new());
    let log = Arc::new(StatusLog::new(&config.log_file, false));
    let initializer = RepositoryInitializer::new(
        config.clone(),
        runner.clone(),
        Arc::new(StdFileSystemOps),
        log,
    );
    initializer.ensure_directories().unwrap();

    initializer.ensure_repository_initialized().await.unwrap();

    let password = std::fs::read_to_string(&config.restic_password_file).unwrap();
    assert_eq!(password.len(), 20);
    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].ends_with(" init"));
}
