use derive_more::{AsRef, Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::connection::types::{ConnectionError, ConnectionID};
use crate::keystore::types::{Ciphertext, KeyStoreError};
use crate::keystore::ALGORITHM;
use crate::request::types::RequestDescriptor;

/// `AuthorizationError` is the error taxonomy of the protocol engine
///
/// [`AuthorizationError::NetworkError`] is transient and safe to retry, while
/// [`AuthorizationError::ConnectionNotFoundError`] is authoritative: the server no
/// longer knows the connection.
#[derive(Debug, PartialEq, Error, Clone)]
pub enum AuthorizationError {
    #[error("key not found: {0}")]
    KeyNotFoundError(String),

    #[error("key generation error: {0}")]
    KeyGenerationError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("connection not found: {0}")]
    ConnectionNotFoundError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("decision rejected: {0}")]
    DecisionRejectedError(String),

    #[error("decision already in flight: {0}")]
    DecisionInFlightError(String),

    #[error("unknown authorization: {0}")]
    UnknownAuthorizationError(String),

    #[error("user authentication denied")]
    AuthenticationDenied,

    #[error("keystore error: {0}")]
    KeyStoreError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

impl From<KeyStoreError> for AuthorizationError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::KeyNotFoundError(msg) => AuthorizationError::KeyNotFoundError(msg),
            KeyStoreError::KeyGenerationError(msg) => AuthorizationError::KeyGenerationError(msg),
            KeyStoreError::DecryptionError(msg) => AuthorizationError::DecryptionError(msg),
            KeyStoreError::EncryptionError(msg)
            | KeyStoreError::SignatureError(msg)
            | KeyStoreError::StorageError(msg) => AuthorizationError::KeyStoreError(msg),
        }
    }
}

impl From<ConnectionError> for AuthorizationError {
    fn from(err: ConnectionError) -> Self {
        AuthorizationError::ConnectionError(err.to_string())
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into, AsRef,
)]
#[serde(crate = "self::serde")]
pub struct AuthorizationID(String);

impl AuthorizationID {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `AuthorizationCode` binds a decision to the exact payload the user has seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From, Into, AsRef)]
#[serde(crate = "self::serde")]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `AuthorizationKey` identifies one authorization across every connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorizationKey {
    connection_id: ConnectionID,
    authorization_id: AuthorizationID,
}

impl AuthorizationKey {
    pub fn new(connection_id: ConnectionID, authorization_id: AuthorizationID) -> Self {
        Self {
            connection_id,
            authorization_id,
        }
    }

    pub fn connection_id(&self) -> &ConnectionID {
        &self.connection_id
    }

    pub fn authorization_id(&self) -> &AuthorizationID {
        &self.authorization_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Deny,
}

impl Decision {
    pub fn is_confirm(&self) -> bool {
        matches!(self, Decision::Confirm)
    }
}

/// `EncryptedAuthorization` is an authorization as received from the server
///
/// `key`, `iv` and `data` are base64 strings holding the ephemeral public key,
/// the nonce and the ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct EncryptedAuthorization {
    pub id: AuthorizationID,
    pub connection_id: ConnectionID,
    pub algorithm: String,
    pub key: String,
    pub iv: String,
    pub data: String,
}

impl EncryptedAuthorization {
    pub fn from_ciphertext(
        id: AuthorizationID,
        connection_id: ConnectionID,
        ciphertext: &Ciphertext,
    ) -> Self {
        Self {
            id,
            connection_id,
            algorithm: ALGORITHM.to_string(),
            key: STANDARD.encode(ciphertext.ephemeral_key()),
            iv: STANDARD.encode(ciphertext.nonce()),
            data: STANDARD.encode(ciphertext.data()),
        }
    }

    pub fn to_ciphertext(&self) -> Result<Ciphertext, KeyStoreError> {
        if self.algorithm != ALGORITHM {
            return Err(KeyStoreError::DecryptionError(format!(
                "unsupported algorithm: {}",
                self.algorithm
            )));
        }

        let decode = |field: &str, value: &str| {
            STANDARD
                .decode(value)
                .map_err(|err| KeyStoreError::DecryptionError(format!("{}: {}", field, err)))
        };

        Ok(Ciphertext::new(
            decode("key", &self.key)?,
            decode("iv", &self.iv)?,
            decode("data", &self.data)?,
        ))
    }
}

/// `Authorization` is the decrypted content of a pending authorization
///
/// It only lives in memory for the current polling cycle and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Authorization {
    id: AuthorizationID,
    connection_id: ConnectionID,
    title: String,
    description: String,

    #[serde(default)]
    payload: Option<Value>,

    authorization_code: AuthorizationCode,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Authorization {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AuthorizationID,
        connection_id: ConnectionID,
        title: String,
        description: String,
        payload: Option<Value>,
        authorization_code: AuthorizationCode,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            connection_id,
            title,
            description,
            payload,
            authorization_code,
            created_at,
            expires_at,
        }
    }

    pub fn key(&self) -> AuthorizationKey {
        AuthorizationKey::new(self.connection_id.clone(), self.id.clone())
    }

    pub fn id(&self) -> &AuthorizationID {
        &self.id
    }

    pub fn connection_id(&self) -> &ConnectionID {
        &self.connection_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn authorization_code(&self) -> &AuthorizationCode {
        &self.authorization_code
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// lifetime is the total validity window in seconds
    pub fn lifetime(&self) -> i64 {
        (self.expires_at - self.created_at).num_seconds().max(0)
    }
}

/// `HttpResponse` is the raw outcome of a round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: String) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// `TransportBuilder` executes a prepared request
///
/// Implementations only report transport failures (including timeouts) as
/// [`AuthorizationError::NetworkError`]. Any received response, whatever its
/// status, is returned as [`HttpResponse`] and classified by the engine.
#[async_trait]
pub trait TransportBuilder: Send + Sync {
    async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse, AuthorizationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    ConfirmAuthorization,
}

/// `CredentialGate` is the local user verification step (biometrics, passcode)
#[async_trait]
pub trait CredentialGate: Send + Sync {
    async fn authenticate(&self, purpose: Purpose) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::standard::chrono::Duration;
    use rst_common::standard::serde_json;

    #[test]
    fn test_lifetime() {
        let now = Utc::now();
        let authorization = Authorization::new(
            AuthorizationID::from("1".to_string()),
            ConnectionID::generate(),
            "Payment".to_string(),
            "Pay 10 EUR".to_string(),
            None,
            AuthorizationCode::from("code".to_string()),
            now,
            now + Duration::seconds(60),
        );
        assert_eq!(authorization.lifetime(), 60);

        let inverted = Authorization::new(
            AuthorizationID::from("2".to_string()),
            ConnectionID::generate(),
            "Payment".to_string(),
            "Pay 10 EUR".to_string(),
            None,
            AuthorizationCode::from("code".to_string()),
            now,
            now - Duration::seconds(5),
        );
        assert_eq!(inverted.lifetime(), 0);
    }

    #[test]
    fn test_parse_decrypted_payload() {
        let raw = r#"{
            "id": "42",
            "connection_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "title": "Login",
            "description": "Sign in from a new device",
            "authorization_code": "abc",
            "created_at": "2024-01-01T10:00:00Z",
            "expires_at": "2024-01-01T10:05:00Z"
        }"#;

        let authorization: Authorization = serde_json::from_str(raw).unwrap();
        assert_eq!(authorization.id().as_str(), "42");
        assert_eq!(authorization.lifetime(), 300);
        assert!(authorization.payload().is_none());
        assert_eq!(authorization.authorization_code().as_str(), "abc");
    }

    #[test]
    fn test_envelope_to_ciphertext() {
        let ciphertext = Ciphertext::new(vec![1, 2], vec![3, 4], vec![5, 6]);
        let envelope = EncryptedAuthorization::from_ciphertext(
            AuthorizationID::from("1".to_string()),
            ConnectionID::generate(),
            &ciphertext,
        );
        assert_eq!(envelope.to_ciphertext().unwrap(), ciphertext);

        let mut unsupported = envelope.clone();
        unsupported.algorithm = "RSA".to_string();
        assert!(matches!(
            unsupported.to_ciphertext(),
            Err(KeyStoreError::DecryptionError(_))
        ));

        let mut malformed = envelope;
        malformed.iv = "###".to_string();
        assert!(matches!(
            malformed.to_ciphertext(),
            Err(KeyStoreError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_keystore_error_mapping() {
        let mapped: AuthorizationError = KeyStoreError::DecryptionError("bad".to_string()).into();
        assert_eq!(mapped, AuthorizationError::DecryptionError("bad".to_string()));

        let mapped: AuthorizationError = KeyStoreError::KeyNotFoundError("tag".to_string()).into();
        assert_eq!(mapped, AuthorizationError::KeyNotFoundError("tag".to_string()));
    }
}
