use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::keypair::NONCE_LEN;
use super::types::{KeyStoreError, KeyTag};
use super::KeyPair;

const SEALING_KEY_LEN: usize = 32;

/// `SealingKey` wraps key pairs before they are handed to a durable backend
///
/// A sealed blob is `nonce || ciphertext` and is bound to its [`KeyTag`] through
/// the AEAD associated data, so a blob moved under another tag will not open.
pub struct SealingKey(Zeroizing<[u8; SEALING_KEY_LEN]>);

impl SealingKey {
    pub fn from_hex(value: &str) -> Result<Self, KeyStoreError> {
        let decoded = Zeroizing::new(
            hex::decode(value).map_err(|err| KeyStoreError::StorageError(err.to_string()))?,
        );

        if decoded.len() != SEALING_KEY_LEN {
            return Err(KeyStoreError::StorageError(format!(
                "sealing key must be {} bytes",
                SEALING_KEY_LEN
            )));
        }

        let mut key = Zeroizing::new([0u8; SEALING_KEY_LEN]);
        key.copy_from_slice(decoded.as_slice());
        Ok(Self(key))
    }

    pub fn seal(&self, tag: &KeyTag, keypair: &KeyPair) -> Result<Vec<u8>, KeyStoreError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let secret = keypair.to_bytes();
        let sealed = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: secret.as_slice(),
                    aad: tag.as_str().as_bytes(),
                },
            )
            .map_err(|err| KeyStoreError::KeyGenerationError(err.to_string()))?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    pub fn unseal(&self, tag: &KeyTag, blob: &[u8]) -> Result<KeyPair, KeyStoreError> {
        if blob.len() <= NONCE_LEN {
            return Err(KeyStoreError::StorageError("sealed key is truncated".to_string()));
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let secret = Zeroizing::new(
            self.cipher()
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: sealed,
                        aad: tag.as_str().as_bytes(),
                    },
                )
                .map_err(|_| {
                    KeyStoreError::StorageError(format!("unable to unseal key: {}", tag))
                })?,
        );

        KeyPair::from_bytes(secret.as_slice())
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.0.as_slice()))
    }
}
