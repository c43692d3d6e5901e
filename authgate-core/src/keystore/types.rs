use std::fmt;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::connection::types::ConnectionID;

pub const KEY_TAG_PREFIX: &str = "authgate.connection";

/// `KeyStoreError` covers every failure raised while touching key material
#[derive(Debug, PartialEq, Error, Clone)]
pub enum KeyStoreError {
    #[error("key not found: {0}")]
    KeyNotFoundError(String),

    #[error("key generation error: {0}")]
    KeyGenerationError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// `KeyTag` is the storage identifier of a connection key pair
///
/// It is always derived from the connection id, so the same connection
/// resolves to the same key pair across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct KeyTag(String);

impl KeyTag {
    pub fn from_connection(connection_id: &ConnectionID) -> Self {
        Self(format!("{}.{}", KEY_TAG_PREFIX, connection_id))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for KeyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Signature` is a compact (r || s) ECDSA signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_base64(value: &str) -> Result<Self, KeyStoreError> {
        STANDARD
            .decode(value)
            .map(Self)
            .map_err(|err| KeyStoreError::SignatureError(err.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

/// `Ciphertext` is an ECIES message addressed to a single connection key
///
/// - `ephemeral_key`: SEC1 encoded sender public key
/// - `nonce`: 12 bytes AEAD nonce
/// - `data`: encrypted bytes including the authentication tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    ephemeral_key: Vec<u8>,
    nonce: Vec<u8>,
    data: Vec<u8>,
}

impl Ciphertext {
    pub fn new(ephemeral_key: Vec<u8>, nonce: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            ephemeral_key,
            nonce,
            data,
        }
    }

    pub fn ephemeral_key(&self) -> &[u8] {
        &self.ephemeral_key
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `PublicKeyInfo` is the shareable half of a connection key pair
///
/// This is the value handed to the pairing handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    tag: KeyTag,
    key: Vec<u8>,
}

impl PublicKeyInfo {
    pub fn new(tag: KeyTag, key: Vec<u8>) -> Self {
        Self { tag, key }
    }

    pub fn tag(&self) -> &KeyTag {
        &self.tag
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.key)
    }
}

/// `KeyStoreBuilder` is the custody contract for connection key pairs
///
/// Implementations must be safe under concurrent calls for different connections,
/// while `generate` and `delete` must never race a `sign` or `decrypt` touching
/// the same connection.
#[async_trait]
pub trait KeyStoreBuilder: Send + Sync {
    /// generate creates and durably stores a new key pair for the connection,
    /// replacing any previous one, and returns its public half
    async fn generate(&self, connection_id: &ConnectionID) -> Result<PublicKeyInfo, KeyStoreError>;

    async fn sign(
        &self,
        connection_id: &ConnectionID,
        message: &[u8],
    ) -> Result<Signature, KeyStoreError>;

    async fn decrypt(
        &self,
        connection_id: &ConnectionID,
        ciphertext: &Ciphertext,
    ) -> Result<Vec<u8>, KeyStoreError>;

    /// delete removes the key pair, no error is returned if it does not exist
    async fn delete(&self, connection_id: &ConnectionID) -> Result<(), KeyStoreError>;

    async fn public_key(&self, connection_id: &ConnectionID)
        -> Result<PublicKeyInfo, KeyStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_tag_is_derived_from_connection() {
        let connection_id = ConnectionID::from("7b0d2f8e-3c51-4a8e-9a3f-1f2e3d4c5b6a".to_string());
        let tag = KeyTag::from_connection(&connection_id);

        assert_eq!(
            tag.as_str(),
            "authgate.connection.7b0d2f8e-3c51-4a8e-9a3f-1f2e3d4c5b6a"
        );
        assert_eq!(tag, KeyTag::from_connection(&connection_id));
    }

    #[test]
    fn test_signature_base64() {
        let signature = Signature::new(vec![1, 2, 3, 4]);
        let encoded = signature.to_base64();
        assert_eq!(encoded, "AQIDBA==");

        let decoded = Signature::from_base64(&encoded);
        assert!(decoded.is_ok());
        assert_eq!(decoded.unwrap(), signature);

        let invalid = Signature::from_base64("%%%");
        assert!(matches!(invalid, Err(KeyStoreError::SignatureError(_))));
    }
}
