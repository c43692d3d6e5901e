use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("setup error: {0}")]
    SetupError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("authorization error: {0}")]
    AuthorizationError(String),

    #[error("output error: {0}")]
    OutputError(String),
}
