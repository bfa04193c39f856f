use std::time::Duration;

use command_runner::ops::CommandRunnerOps;

use crate::context::RunContext;
use crate::file_system_ops::FileSystemOps;
use crate::pipeline::BackupStep;

const DETECT_TIMEOUT: Duration = Duration::from_secs(60);
const LIST_TIMEOUT: Duration = Duration::from_secs(600);

const DPKG_DISTRIBUTIONS: [&str; 2] = ["Ubuntu", "Debian"];
const RPM_DISTRIBUTIONS: [&str; 3] = ["CentOS", "RedHatEnterpriseServer", "Fedora"];

/// Writes the list of installed packages to the configured file so a restore
/// can reinstall the same software. The package tool is chosen from the
/// distribution id reported by `lsb_release -is`.
pub struct SoftwareInventoryStep;

#[async_trait::async_trait]
impl<R: CommandRunnerOps, F: FileSystemOps> BackupStep<R, F> for SoftwareInventoryStep {
    fn name(&self) -> &'static str {
        "software_inventory"
    }

    async fn execute(&self, context: &mut RunContext<R, F>) {
        context.record_section("Software Inventory");
        context.record("Backing up the list of installed software...");

        let detection = context
            .runner
            .run("lsb_release -is", false, DETECT_TIMEOUT)
            .await;
        if !detection.success() {
            let line = context.log.next_line_number();
            context.record_error(&format!(
                "Error: Cannot detect the Linux distribution! See log for details at line {line}."
            ));
            context.log_line(&format!(
                "Error: Cannot detect the Linux distribution! {}",
                detection.stderr
            ));
            return;
        }

        let distribution = detection.stdout.trim().to_string();
        let list_file = context.config.software_list_file.display().to_string();
        let list_command = if DPKG_DISTRIBUTIONS.contains(&distribution.as_str()) {
            format!("dpkg --get-selections > {list_file}")
        } else if RPM_DISTRIBUTIONS.contains(&distribution.as_str()) {
            format!("rpm -qa > {list_file}")
        } else {
            context.record_error(&format!(
                "Error: Unsupported Linux distribution {distribution}! \
                 Cannot back up the software list."
            ));
            return;
        };

        let listing = context.runner.run(&list_command, false, LIST_TIMEOUT).await;
        if !listing.success() {
            let line = context.log.next_line_number();
            context.record_error(&format!(
                "Error: Software list backup failed! See log for details at line {line}."
            ));
            context.log_line(&format!(
                "Error: Software list backup failed! {}",
                listing.stderr
            ));
        } else {
            context.record(&format!(
                "Software list backed up successfully to {list_file}."
            ));
        }
    }
}
