use thiserror::Error;

/// Configuration problems are the only startup-fatal errors in the tool:
/// nothing runs before a valid configuration is loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file {0} does not exist. Ensure the correct config file is present.")]
    Missing(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
    #[error("The configuration file {path} is not intended for this server ({expected}): it names {found}.")]
    ServerMismatch {
        path: String,
        expected: String,
        found: String,
    },
}
