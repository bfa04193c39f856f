use std::sync::Arc;
use std::time::Duration;

use backup_config::BackupConfig;
use backup_log::StatusLog;
use command_runner::ops::CommandRunnerOps;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Error;
use crate::file_system_ops::FileSystemOps;

const INIT_TIMEOUT: Duration = Duration::from_secs(600);

const PASSWORD_LENGTH: usize = 20;
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"-_";

/// Startup preparation that runs before the pipeline: the working
/// directories must exist and the restic repository must be initialized.
/// Failures here are fatal, like a broken configuration.
pub struct RepositoryInitializer<R: CommandRunnerOps, F: FileSystemOps> {
    config: Arc<BackupConfig>,
    runner: Arc<R>,
    fs_ops: Arc<F>,
    log: Arc<StatusLog>,
}

impl<R: CommandRunnerOps, F: FileSystemOps> RepositoryInitializer<R, F> {
    pub fn new(
        config: Arc<BackupConfig>,
        runner: Arc<R>,
        fs_ops: Arc<F>,
        log: Arc<StatusLog>,
    ) -> Self {
        Self {
            config,
            runner,
            fs_ops,
            log,
        }
    }

    pub fn ensure_directories(&self) -> Result<(), Error> {
        for dir in [
            &self.config.base_backup_dir,
            &self.config.mysql_backup_dir,
            &self.config.log_dir,
            &self.config.status_dir,
        ] {
            self.fs_ops.create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Initializes the restic repository on first run: generates a password,
    /// writes it to the password file with owner-only permissions, and runs
    /// `restic init`. A repository with a `data` directory is taken as
    /// already initialized.
    pub async fn ensure_repository_initialized(&self) -> Result<(), Error> {
        let marker = self.config.restic_repository.join("data");
        if self.fs_ops.exists(&marker) {
            return Ok(());
        }

        self.log
            .log("Restic repository not found, initializing a new one.")?;

        let password = generate_password(PASSWORD_LENGTH);
        self.fs_ops
            .write_file(&self.config.restic_password_file, &password)?;
        self.fs_ops
            .restrict_permissions(&self.config.restic_password_file)?;

        let command = format!(
            "restic -r {} --password-file {} init",
            self.config.restic_repository.display(),
            self.config.restic_password_file.display()
        );
        let output = self.runner.run(&command, true, INIT_TIMEOUT).await;
        if !output.success() {
            return Err(Error::RepositoryError(format!(
                "Cannot initialize restic repository {}: {}",
                self.config.restic_repository.display(),
                output.stderr
            )));
        }

        self.log.log(&format!(
            "Initialized restic repository {}.",
            self.config.restic_repository.display()
        ))?;
        Ok(())
    }
}

/// Random repository password with a guaranteed mix of character classes:
/// at least 4 lowercase, 4 uppercase, 4 digits and 2 of `-` `_`.
fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = Vec::with_capacity(length);

    for (set, count) in [(LOWERCASE, 4), (UPPERCASE, 4), (DIGITS, 4), (SPECIAL, 2)] {
        for _ in 0..count {
            chars.push(set[rng.gen_range(0..set.len())]);
        }
    }
    let all: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SPECIAL].concat();
    while chars.len() < length {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    // The alphabet is ASCII, so the bytes form a valid string.
    String::from_utf8_lossy(&chars).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_system_ops::mock::MockFileSystemOps;
    use crate::test_support::test_config;
    use command_runner::ops::MockCommandRunnerOps;
    use tempfile::tempdir;

    fn initializer(
        root: &std::path::Path,
    ) -> RepositoryInitializer<MockCommandRunnerOps, MockFileSystemOps> {
        std::fs::create_dir_all(root.join("logs")).unwrap();
        let config = Arc::new(test_config(root));
        let log = Arc::new(StatusLog::new(&config.log_file, false));
        RepositoryInitializer::new(
            config,
            Arc::new(MockCommandRunnerOps::new()),
            Arc::new(MockFileSystemOps::new()),
            log,
        )
    }

    #[test]
    fn test_generated_password_has_required_classes() {
        for _ in 0..100 {
            let password = generate_password(PASSWORD_LENGTH);
            assert_eq!(password.len(), PASSWORD_LENGTH);
            assert!(password.bytes().filter(|b| b.is_ascii_lowercase()).count() >= 4);
            assert!(password.bytes().filter(|b| b.is_ascii_uppercase()).count() >= 4);
            assert!(password.bytes().filter(|b| b.is_ascii_digit()).count() >= 4);
            assert!(password.bytes().filter(|b| SPECIAL.contains(b)).count() >= 2);
        }
    }

    #[test]
    fn test_ensure_directories_creates_the_working_set() {
        let dir = tempdir().unwrap();
        let init = initializer(dir.path());

        init.ensure_directories().unwrap();

        for path in [
            &init.config.base_backup_dir,
            &init.config.mysql_backup_dir,
            &init.config.log_dir,
            &init.config.status_dir,
        ] {
            assert!(init.fs_ops.is_dir(path));
        }
    }

    #[async_std::test]
    async fn test_existing_repository_is_left_alone() {
        let dir = tempdir().unwrap();
        let init = initializer(dir.path());
        init.fs_ops
            .add_dir(init.config.restic_repository.join("data").to_string_lossy());

        init.ensure_repository_initialized().await.unwrap();

        assert_eq!(init.runner.total_calls(), 0);
        assert!(
            init.fs_ops
                .contents_of(&init.config.restic_password_file.to_string_lossy())
                .is_none()
        );
    }

    #[async_std::test]
    async fn test_missing_repository_is_initialized() {
        let dir = tempdir().unwrap();
        let init = initializer(dir.path());

        init.ensure_repository_initialized().await.unwrap();

        let password = init
            .fs_ops
            .contents_of(&init.config.restic_password_file.to_string_lossy())
            .unwrap();
        assert_eq!(password.len(), PASSWORD_LENGTH);

        let commands = init.runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].ends_with(" init"));
        assert!(commands[0].contains("--password-file"));
    }

    #[async_std::test]
    async fn test_init_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let init = initializer(dir.path());
        init.runner.fail_matching(" init", "config file already exists");

        let result = init.ensure_repository_initialized().await;

        assert!(matches!(result, Err(Error::RepositoryError(_))));
    }
}
