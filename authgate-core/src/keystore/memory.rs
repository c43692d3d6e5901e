use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::connection::types::ConnectionID;

use super::types::{Ciphertext, KeyStoreBuilder, KeyStoreError, KeyTag, PublicKeyInfo, Signature};
use super::KeyPair;

/// `MemoryKeyStore` keeps key pairs in process memory
///
/// Used by tests and by hosts that re-pair on every start. `sign` and `decrypt`
/// share the read side of the lock, `generate` and `delete` take the write side.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<RwLock<HashMap<KeyTag, KeyPair>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, connection_id: &ConnectionID) -> bool {
        let tag = KeyTag::from_connection(connection_id);
        self.keys.read().await.contains_key(&tag)
    }

    pub async fn count(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl KeyStoreBuilder for MemoryKeyStore {
    async fn generate(&self, connection_id: &ConnectionID) -> Result<PublicKeyInfo, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key(tag.clone());

        self.keys.write().await.insert(tag, keypair);
        Ok(public_key)
    }

    async fn sign(
        &self,
        connection_id: &ConnectionID,
        message: &[u8],
    ) -> Result<Signature, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let keys = self.keys.read().await;
        let keypair = keys
            .get(&tag)
            .ok_or_else(|| KeyStoreError::KeyNotFoundError(tag.to_string()))?;

        keypair.sign(message)
    }

    async fn decrypt(
        &self,
        connection_id: &ConnectionID,
        ciphertext: &Ciphertext,
    ) -> Result<Vec<u8>, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let keys = self.keys.read().await;
        let keypair = keys
            .get(&tag)
            .ok_or_else(|| KeyStoreError::KeyNotFoundError(tag.to_string()))?;

        keypair.decrypt(ciphertext)
    }

    async fn delete(&self, connection_id: &ConnectionID) -> Result<(), KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        self.keys.write().await.remove(&tag);
        Ok(())
    }

    async fn public_key(
        &self,
        connection_id: &ConnectionID,
    ) -> Result<PublicKeyInfo, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let keys = self.keys.read().await;
        keys.get(&tag)
            .map(|keypair| keypair.public_key(tag.clone()))
            .ok_or_else(|| KeyStoreError::KeyNotFoundError(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::keystore::{encrypt_for, verify};

    fn connection(id: &str) -> ConnectionID {
        ConnectionID::from(id.to_string())
    }

    #[tokio::test]
    async fn test_generate_sign_decrypt() {
        let store = MemoryKeyStore::new();
        let alice = connection("alice");

        let public_key = store.generate(&alice).await.unwrap();
        assert_eq!(public_key.tag(), &KeyTag::from_connection(&alice));
        assert!(store.contains(&alice).await);

        let signature = store.sign(&alice, b"message").await.unwrap();
        assert!(verify(public_key.as_bytes(), b"message", &signature).is_ok());

        let ciphertext = encrypt_for(public_key.as_bytes(), b"hello").unwrap();
        let plaintext = store.decrypt(&alice, &ciphertext).await.unwrap();
        assert_eq!(plaintext, b"hello".to_vec());

        let exported = store.public_key(&alice).await.unwrap();
        assert_eq!(exported, public_key);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryKeyStore::new();
        let unknown = connection("unknown");

        let signed = store.sign(&unknown, b"message").await;
        assert!(matches!(signed, Err(KeyStoreError::KeyNotFoundError(_))));

        let ciphertext = Ciphertext::new(vec![], vec![], vec![]);
        let decrypted = store.decrypt(&unknown, &ciphertext).await;
        assert!(matches!(decrypted, Err(KeyStoreError::KeyNotFoundError(_))));
    }

    #[tokio::test]
    async fn test_cross_connection_decryption_fails() {
        let store = MemoryKeyStore::new();
        let alice = connection("alice");
        let bob = connection("bob");

        let alice_key = store.generate(&alice).await.unwrap();
        let _ = store.generate(&bob).await.unwrap();

        let ciphertext = encrypt_for(alice_key.as_bytes(), b"for alice only").unwrap();
        let result = store.decrypt(&bob, &ciphertext).await;
        assert!(matches!(result, Err(KeyStoreError::DecryptionError(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryKeyStore::new();
        let alice = connection("alice");

        let _ = store.generate(&alice).await.unwrap();
        assert!(store.delete(&alice).await.is_ok());
        assert!(store.delete(&alice).await.is_ok());
        assert!(!store.contains(&alice).await);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_generate_rotates_key() {
        let store = MemoryKeyStore::new();
        let alice = connection("alice");

        let first = store.generate(&alice).await.unwrap();
        let ciphertext = encrypt_for(first.as_bytes(), b"stale").unwrap();

        let second = store.generate(&alice).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.count().await, 1);

        let result = store.decrypt(&alice, &ciphertext).await;
        assert!(matches!(result, Err(KeyStoreError::DecryptionError(_))));
    }

    #[tokio::test]
    async fn test_rotation_never_races_readers() {
        let store = MemoryKeyStore::new();
        let alice = connection("alice");

        let initial = store.generate(&alice).await.unwrap();
        let ciphertext = encrypt_for(initial.as_bytes(), b"hello").unwrap();

        let writer = {
            let store = store.clone();
            let alice = alice.clone();
            tokio::spawn(async move {
                let mut generated = Vec::new();
                for round in 0..24 {
                    if round % 3 == 2 {
                        store.delete(&alice).await.unwrap();
                    } else {
                        generated.push(store.generate(&alice).await.unwrap());
                    }
                    tokio::task::yield_now().await;
                }
                generated
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let alice = alice.clone();
                let ciphertext = ciphertext.clone();
                tokio::spawn(async move {
                    let mut signatures = Vec::new();
                    for _ in 0..24 {
                        match store.sign(&alice, b"message").await {
                            Ok(signature) => signatures.push(signature),
                            Err(err) => {
                                assert!(matches!(err, KeyStoreError::KeyNotFoundError(_)), "{}", err)
                            }
                        }

                        match store.decrypt(&alice, &ciphertext).await {
                            Ok(plaintext) => assert_eq!(plaintext, b"hello".to_vec()),
                            Err(err) => assert!(
                                matches!(
                                    err,
                                    KeyStoreError::KeyNotFoundError(_)
                                        | KeyStoreError::DecryptionError(_)
                                ),
                                "{}",
                                err
                            ),
                        }
                        tokio::task::yield_now().await;
                    }
                    signatures
                })
            })
            .collect();

        let mut keys = writer.await.unwrap();
        keys.push(initial);

        for reader in readers {
            for signature in reader.await.unwrap() {
                assert!(keys
                    .iter()
                    .any(|key| verify(key.as_bytes(), b"message", &signature).is_ok()));
            }
        }
    }
}
