use derive_more::{AsRef, Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::keystore::types::KeyStoreError;

use super::Connection;

/// ConnectionError is a base error types for the `Connection` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ConnectionError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("connection not found: {0}")]
    NotFoundError(String),

    #[error("connection already exists: {0}")]
    DuplicateError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("keystore error: {0}")]
    KeyStoreError(String),
}

impl From<KeyStoreError> for ConnectionError {
    fn from(err: KeyStoreError) -> Self {
        ConnectionError::KeyStoreError(err.to_string())
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into, AsRef,
)]
#[serde(crate = "self::serde")]
pub struct ConnectionID(String);

impl ConnectionID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Status tells whether the connection participates in polling
///
/// A connection becomes [`Status::Inactive`] when it is revoked locally or
/// when the server answers that it no longer knows it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "self::serde")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

/// `RepoBuilder` is the durable storage contract for connection records
///
/// Implementations are assumed crash consistent. The records returned by `load`
/// keep the order they were saved in.
#[async_trait]
pub trait RepoBuilder: Send + Sync {
    async fn load(&self) -> Result<Vec<Connection>, ConnectionError>;
    async fn save(&self, connection: &Connection) -> Result<(), ConnectionError>;
    async fn delete(&self, id: &ConnectionID) -> Result<(), ConnectionError>;
}
