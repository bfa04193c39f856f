//! Shared fixtures for unit tests: a configuration rooted in a temp
//! directory and a run context wired to the mock ops.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use backup_config::{BackupConfig, MysqlConfig, SmtpConfig};
use backup_log::StatusLog;
use command_runner::ops::MockCommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::mock::MockFileSystemOps;

pub(crate) fn test_config(root: &Path) -> BackupConfig {
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
        default_paths: vec!["/etc".into(), "/home".into()],
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

pub(crate) fn test_context(root: &Path) -> RunContext<MockCommandRunnerOps, MockFileSystemOps> {
    std::fs::create_dir_all(root.join("logs")).unwrap();
    let config = Arc::new(test_config(root));
    let log = Arc::new(StatusLog::new(&config.log_file, false));
    RunContext::new(
        config,
        Arc::new(MockCommandRunnerOps::new()),
        Arc::new(MockFileSystemOps::new()),
        log,
    )
}
