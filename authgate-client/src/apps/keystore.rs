use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::RwLock;

use rstdev_storage::engine::rocksdb::executor::Executor;

use authgate_core::connection::types::ConnectionID;
use authgate_core::keystore::types::{
    Ciphertext, KeyStoreBuilder, KeyStoreError, KeyTag, PublicKeyInfo, Signature,
};
use authgate_core::keystore::{KeyPair, SealingKey};

use super::db;

const KEYSTORE_KEY_PREFIX: &str = "keystore";

/// `RocksKeyStore` keeps every connection key pair sealed inside RocksDB
///
/// Secrets are sealed with the configured master key before they touch the disk
/// and are only unsealed for the duration of a single `sign` or `decrypt` call.
#[derive(Clone)]
pub struct RocksKeyStore {
    db: Executor,
    sealing: Arc<SealingKey>,
    guard: Arc<RwLock<()>>,
}

impl RocksKeyStore {
    pub fn new(db: Executor, sealing: SealingKey) -> Self {
        Self {
            db,
            sealing: Arc::new(sealing),
            guard: Arc::new(RwLock::new(())),
        }
    }

    fn build_key(&self, tag: &KeyTag) -> String {
        format!("{}:{}", KEYSTORE_KEY_PREFIX, tag)
    }

    async fn load_keypair(&self, tag: &KeyTag) -> Result<KeyPair, KeyStoreError> {
        let blob = db::get(&self.db, self.build_key(tag))
            .await
            .map_err(KeyStoreError::StorageError)?
            .ok_or_else(|| KeyStoreError::KeyNotFoundError(tag.to_string()))?;

        self.sealing.unseal(tag, &blob)
    }
}

#[async_trait]
impl KeyStoreBuilder for RocksKeyStore {
    async fn generate(&self, connection_id: &ConnectionID) -> Result<PublicKeyInfo, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let keypair = KeyPair::generate();
        let sealed = self.sealing.seal(&tag, &keypair)?;

        let _guard = self.guard.write().await;
        db::save(&self.db, self.build_key(&tag), sealed)
            .await
            .map_err(KeyStoreError::StorageError)?;

        debug!("[keystore:generate] key stored: {}", tag);
        Ok(keypair.public_key(tag))
    }

    async fn sign(
        &self,
        connection_id: &ConnectionID,
        message: &[u8],
    ) -> Result<Signature, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let _guard = self.guard.read().await;

        self.load_keypair(&tag).await?.sign(message)
    }

    async fn decrypt(
        &self,
        connection_id: &ConnectionID,
        ciphertext: &Ciphertext,
    ) -> Result<Vec<u8>, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let _guard = self.guard.read().await;

        self.load_keypair(&tag).await?.decrypt(ciphertext)
    }

    async fn delete(&self, connection_id: &ConnectionID) -> Result<(), KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);

        let _guard = self.guard.write().await;
        db::remove(&self.db, self.build_key(&tag))
            .await
            .map_err(KeyStoreError::StorageError)?;

        debug!("[keystore:delete] key removed: {}", tag);
        Ok(())
    }

    async fn public_key(
        &self,
        connection_id: &ConnectionID,
    ) -> Result<PublicKeyInfo, KeyStoreError> {
        let tag = KeyTag::from_connection(connection_id);
        let _guard = self.guard.read().await;

        let keypair = self.load_keypair(&tag).await?;
        Ok(keypair.public_key(tag))
    }
}
