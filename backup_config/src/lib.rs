use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use error::ConfigError;

pub mod error;

/// Database credentials for the dump step. Servers without a database simply
/// leave this section out and the step is skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct MysqlConfig {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Per-server configuration, loaded from a TOML file keyed by the server's
/// fully qualified domain name.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    pub server_name: String,

    /// Directory holding run logs; pruned by the log-rotation step.
    pub log_dir: PathBuf,
    /// Log file for the current run.
    pub log_file: PathBuf,
    /// Local staging directory covering everything this tool writes.
    pub base_backup_dir: PathBuf,
    /// Where per-date database dump directories are created.
    pub mysql_backup_dir: PathBuf,
    /// Shared directory for per-run status artifacts, consumed by the
    /// cross-server summary mailer.
    pub status_dir: PathBuf,
    /// Transient file the report body is written to before sending.
    pub email_body_path: PathBuf,
    /// Target file for the installed-software inventory.
    pub software_list_file: PathBuf,

    pub restic_repository: PathBuf,
    pub restic_password_file: PathBuf,

    /// Paths always included in the restic backup.
    #[serde(default)]
    pub default_paths: Vec<PathBuf>,
    /// Service-specific path groups; a group is included when any of its
    /// directories exists on this host at run time.
    #[serde(default)]
    pub service_paths: BTreeMap<String, Vec<PathBuf>>,

    pub mysql: Option<MysqlConfig>,

    pub smtp: SmtpConfig,
    pub email_from: String,
    pub email_to: Vec<String>,
    /// Send a report email even when the run succeeded.
    #[serde(default)]
    pub send_success_email: bool,

    /// Number of run logs kept by the log-rotation step. Despite the
    /// day-flavored name this is a file count, not an age cutoff: the step
    /// keeps the N most recently modified entries.
    pub retention_days: usize,
}

impl BackupConfig {
    /// Location of the configuration file for a given server name.
    pub fn config_path(server_name: &str) -> PathBuf {
        PathBuf::from(format!("/root/backup_config_{server_name}.toml"))
    }

    /// Loads the configuration for this server from its canonical path.
    pub fn load_for_server(server_name: &str) -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path(server_name), server_name)
    }

    /// Loads from an explicit path, checking that the file actually names
    /// this server. Copying another host's config over is a setup mistake
    /// worth failing loudly on.
    pub fn load_from(path: &Path, server_name: &str) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.display().to_string()));
        }
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: BackupConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if config.server_name != server_name {
            return Err(ConfigError::ServerMismatch {
                path: path.display().to_string(),
                expected: server_name.to_string(),
                found: config.server_name,
            });
        }
        Ok(config)
    }
}
