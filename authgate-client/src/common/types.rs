use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, PartialEq, Error)]
pub enum CommonError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("db error: {0}")]
    DBError(String),

    #[error("keystore error: {0}")]
    KeyStoreError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

pub trait ToValidate {
    fn validate(&self) -> Result<(), CommonError>;
}
