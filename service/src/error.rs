use thiserror::Error;

/// Errors that can escape the service layer. Step failures are not errors:
/// they are recorded into the run context and the run keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Log error: {0}")]
    LogError(String),
    #[error("Mail error: {0}")]
    MailError(String),
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<backup_log::error::StatusLogError> for Error {
    fn from(err: backup_log::error::StatusLogError) -> Self {
        Error::LogError(err.to_string())
    }
}
