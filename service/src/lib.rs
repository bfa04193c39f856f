pub mod backup_service;
pub mod context;
pub mod database_backup;
pub mod duration_format;
pub mod error;
pub mod file_system_ops;
pub mod log_rotation;
pub mod mailer_ops;
pub mod notifier;
pub mod pipeline;
pub mod repository_init;
pub mod restic_backup;
pub mod size_calculator;
pub mod software_inventory;
pub mod status_record;

#[cfg(test)]
pub(crate) mod test_support;
