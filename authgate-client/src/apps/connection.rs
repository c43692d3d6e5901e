use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, warn};
use rst_common::with_tokio::tokio::sync::Mutex;

use rstdev_storage::engine::rocksdb::executor::Executor;

use authgate_core::connection::types::{ConnectionError, ConnectionID, RepoBuilder};
use authgate_core::connection::Connection;

use super::db;

const DEFAULT_BUCKET: &str = "default";

const CONNECTION_KEY_PREFIX: &str = "connection";
const CONNECTION_INDEX_PREFIX: &str = "connection_index";

/// `ConnectionRepository` persists connection records inside RocksDB
///
/// Each record is stored under its own key. The bucket index keeps the ids in the
/// order they were first saved so `load` returns records in creation order.
#[derive(Clone)]
pub struct ConnectionRepository {
    db: Executor,
    bucket: String,
    lock: Arc<Mutex<()>>,
}

impl ConnectionRepository {
    pub fn new(db: Executor) -> Self {
        Self {
            db,
            bucket: DEFAULT_BUCKET.to_string(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    fn build_record_key(&self, id: &ConnectionID) -> String {
        format!("{}:{}:{}", CONNECTION_KEY_PREFIX, self.bucket, id)
    }

    fn build_index_key(&self) -> String {
        format!("{}:{}", CONNECTION_INDEX_PREFIX, self.bucket)
    }

    async fn load_index(&self) -> Result<Vec<ConnectionID>, ConnectionError> {
        let value = db::get(&self.db, self.build_index_key())
            .await
            .map_err(ConnectionError::StorageError)?;

        match value {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| ConnectionError::StorageError(err.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn save_index(&self, index: &[ConnectionID]) -> Result<(), ConnectionError> {
        let bytes =
            serde_json::to_vec(index).map_err(|err| ConnectionError::StorageError(err.to_string()))?;

        db::save(&self.db, self.build_index_key(), bytes)
            .await
            .map_err(ConnectionError::StorageError)
    }
}

#[async_trait]
impl RepoBuilder for ConnectionRepository {
    async fn load(&self) -> Result<Vec<Connection>, ConnectionError> {
        let _lock = self.lock.lock().await;
        let index = self.load_index().await?;

        let mut connections = Vec::with_capacity(index.len());
        for id in index.iter() {
            let value = db::get(&self.db, self.build_record_key(id))
                .await
                .map_err(ConnectionError::StorageError)?;

            match value {
                Some(bytes) => connections.push(Connection::try_from(bytes)?),
                None => warn!("[repository:load] indexed connection is missing: {}", id),
            }
        }

        debug!("[repository:load] loaded connections: {}", connections.len());
        Ok(connections)
    }

    async fn save(&self, connection: &Connection) -> Result<(), ConnectionError> {
        let _lock = self.lock.lock().await;

        let id = connection.id().to_owned();
        let bytes: Vec<u8> = connection.clone().try_into()?;
        db::save(&self.db, self.build_record_key(&id), bytes)
            .await
            .map_err(ConnectionError::StorageError)?;

        let mut index = self.load_index().await?;
        if !index.contains(&id) {
            index.push(id);
            self.save_index(&index).await?;
        }

        Ok(())
    }

    async fn delete(&self, id: &ConnectionID) -> Result<(), ConnectionError> {
        let _lock = self.lock.lock().await;

        let mut index = self.load_index().await?;
        let before = index.len();
        index.retain(|current| current != id);
        if index.len() != before {
            self.save_index(&index).await?;
        }

        db::remove(&self.db, self.build_record_key(id))
            .await
            .map_err(ConnectionError::StorageError)
    }
}
