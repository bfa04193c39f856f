use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusLogError {
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StatusLogError {
    fn from(err: std::io::Error) -> Self {
        StatusLogError::IoError(err.to_string())
    }
}
