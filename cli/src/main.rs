mod logging;

use std::sync::Arc;

use async_std::task;
use backup_config::BackupConfig;
use backup_log::StatusLog;
use clap::Parser;
use command_runner::ops::DefaultCommandRunnerOps;
use service::backup_service::BackupService;
use service::context::RunContext;
use service::file_system_ops::StdFileSystemOps;
use service::mailer_ops::SmtpMailerOps;
use service::repository_init::RepositoryInitializer;

#[derive(Parser, Debug)]
#[command(about = "Runs the nightly host backup: database dumps, restic snapshot, \
software inventory, log rotation and a status email")]
struct Cli {
    /// Echo command output and log lines to the console
    #[arg(short, long)]
    verbose: bool,

    /// Record a synthetic failure to exercise the failure reporting path
    #[arg(long)]
    simulate_failure: bool,

    /// Server name used to locate the configuration file (defaults to this
    /// host's name)
    #[arg(long)]
    server_name: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    task::block_on(async {
        let args = Cli::parse();
        let server_name = match args.server_name {
            Some(name) => name,
            None => gethostname::gethostname().to_string_lossy().into_owned(),
        };
        let config = Arc::new(BackupConfig::load_for_server(&server_name)?);

        let log = Arc::new(StatusLog::new(&config.log_file, args.verbose));
        let runner = Arc::new(DefaultCommandRunnerOps::new(log.clone(), args.verbose));
        let fs_ops = Arc::new(StdFileSystemOps);

        let initializer = RepositoryInitializer::new(
            config.clone(),
            runner.clone(),
            fs_ops.clone(),
            log.clone(),
        );
        initializer.ensure_directories()?;
        initializer.ensure_repository_initialized().await?;

        let mailer = Arc::new(SmtpMailerOps::new(config.smtp.clone()));
        let mut context = RunContext::new(config, runner, fs_ops, log);
        BackupService::new(mailer, args.simulate_failure)
            .run(&mut context)
            .await;

        Ok(())
    })
}
