use std::sync::Arc;

use rst_common::with_logging::log::{debug, info, warn};
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::keystore::types::{KeyStoreBuilder, PublicKeyInfo};

use super::types::{ConnectionError, ConnectionID, RepoBuilder, Status};
use super::Connection;

/// `ConnectionRegistry` is the in-memory view of every known connection
///
/// Every mutation is written through to the repository while the registry lock is
/// held, so the cached list and the durable records never diverge. Enumeration
/// order is creation order.
pub struct ConnectionRegistry<TRepo, TKeyStore>
where
    TRepo: RepoBuilder,
    TKeyStore: KeyStoreBuilder,
{
    repo: Arc<TRepo>,
    keystore: Arc<TKeyStore>,
    connections: Arc<RwLock<Vec<Connection>>>,
}

impl<TRepo, TKeyStore> Clone for ConnectionRegistry<TRepo, TKeyStore>
where
    TRepo: RepoBuilder,
    TKeyStore: KeyStoreBuilder,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            keystore: self.keystore.clone(),
            connections: self.connections.clone(),
        }
    }
}

impl<TRepo, TKeyStore> ConnectionRegistry<TRepo, TKeyStore>
where
    TRepo: RepoBuilder,
    TKeyStore: KeyStoreBuilder,
{
    pub fn new(repo: Arc<TRepo>, keystore: Arc<TKeyStore>) -> Self {
        Self {
            repo,
            keystore,
            connections: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn keystore(&self) -> Arc<TKeyStore> {
        self.keystore.clone()
    }

    /// load replaces the cached list with the repository content
    pub async fn load(&self) -> Result<usize, ConnectionError> {
        let mut loaded = self.repo.load().await?;
        loaded.sort_by_key(|connection| connection.created_at());

        let total = loaded.len();
        *self.connections.write().await = loaded;

        debug!("[registry:load] total connections: {}", total);
        Ok(total)
    }

    /// register stores a freshly paired connection and creates its key pair
    ///
    /// The returned public key is the value to hand over to the remote service.
    pub async fn register(&self, connection: Connection) -> Result<PublicKeyInfo, ConnectionError> {
        let mut connections = self.connections.write().await;
        if connections.iter().any(|known| known.id() == connection.id()) {
            return Err(ConnectionError::DuplicateError(connection.id().to_string()));
        }

        let public_key = self.keystore.generate(connection.id()).await?;
        if let Err(err) = self.repo.save(&connection).await {
            if let Err(cleanup) = self.keystore.delete(connection.id()).await {
                warn!(
                    "[registry:register] unable to drop key for {}: {}",
                    connection.id(),
                    cleanup
                );
            }

            return Err(err);
        }

        info!("[registry:register] connection registered: {}", connection.id());
        connections.push(connection);
        Ok(public_key)
    }

    pub async fn all(&self) -> Vec<Connection> {
        self.connections.read().await.clone()
    }

    /// active returns the connections eligible for polling
    pub async fn active(&self) -> Vec<Connection> {
        self.connections
            .read()
            .await
            .iter()
            .filter(|connection| connection.is_active())
            .cloned()
            .collect()
    }

    pub async fn by_id(&self, id: &ConnectionID) -> Option<Connection> {
        self.connections
            .read()
            .await
            .iter()
            .find(|connection| connection.id() == id)
            .cloned()
    }

    pub async fn set_inactive(&self, id: &ConnectionID) -> Result<(), ConnectionError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .iter_mut()
            .find(|connection| connection.id() == id)
            .ok_or(ConnectionError::NotFoundError(id.to_string()))?;

        if !connection.is_active() {
            return Ok(());
        }

        let mut updated = connection.clone();
        updated.set_status(Status::Inactive);
        self.repo.save(&updated).await?;
        *connection = updated;

        info!("[registry:set_inactive] connection deactivated: {}", id);
        Ok(())
    }

    pub async fn rename(&self, id: &ConnectionID, name: &str) -> Result<Connection, ConnectionError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .iter_mut()
            .find(|connection| connection.id() == id)
            .ok_or(ConnectionError::NotFoundError(id.to_string()))?;

        let mut updated = connection.clone();
        updated.rename(name)?;
        self.repo.save(&updated).await?;
        *connection = updated.clone();

        Ok(updated)
    }

    /// reconnect gives an inactive connection a fresh key pair and reactivates it
    ///
    /// The returned public key has to go through the pairing handshake again.
    pub async fn reconnect(&self, id: &ConnectionID) -> Result<PublicKeyInfo, ConnectionError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .iter_mut()
            .find(|connection| connection.id() == id)
            .ok_or(ConnectionError::NotFoundError(id.to_string()))?;

        if connection.is_active() {
            return Err(ConnectionError::ValidationError(format!(
                "connection is still active: {}",
                id
            )));
        }

        let public_key = self.keystore.generate(id).await?;
        let mut updated = connection.clone();
        updated.set_status(Status::Active);
        self.repo.save(&updated).await?;
        *connection = updated;

        info!("[registry:reconnect] connection reactivated: {}", id);
        Ok(public_key)
    }

    /// remove destroys the connection together with its key pair
    ///
    /// The record goes first, so a failed delete leaves both the record and its
    /// key pair in place.
    pub async fn remove(&self, id: &ConnectionID) -> Result<(), ConnectionError> {
        let mut connections = self.connections.write().await;
        let position = connections
            .iter()
            .position(|connection| connection.id() == id)
            .ok_or(ConnectionError::NotFoundError(id.to_string()))?;

        self.repo.delete(id).await?;
        connections.remove(position);
        self.drop_key(id).await;

        info!("[registry:remove] connection removed: {}", id);
        Ok(())
    }

    /// remove_all wipes every connection and key pair
    pub async fn remove_all(&self) -> Result<usize, ConnectionError> {
        let mut connections = self.connections.write().await;
        let mut removed = 0;

        while let Some(connection) = connections.first().cloned() {
            self.repo.delete(connection.id()).await?;
            connections.remove(0);
            self.drop_key(connection.id()).await;
            removed += 1;
        }

        info!("[registry:remove_all] total removed: {}", removed);
        Ok(removed)
    }

    async fn drop_key(&self, id: &ConnectionID) {
        if let Err(err) = self.keystore.delete(id).await {
            warn!("[registry:drop_key] unable to drop key for {}: {}", id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockall::mock;
    use mockall::predicate::eq;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::chrono::{Duration, Utc};
    use rst_common::with_tokio::tokio;

    use crate::keystore::MemoryKeyStore;

    mock!(
        FakeRepo{}

        #[async_trait]
        impl RepoBuilder for FakeRepo {
            async fn load(&self) -> Result<Vec<Connection>, ConnectionError>;
            async fn save(&self, connection: &Connection) -> Result<(), ConnectionError>;
            async fn delete(&self, id: &ConnectionID) -> Result<(), ConnectionError>;
        }
    );

    fn build_connection(name: &str, age_secs: i64) -> Connection {
        Connection::builder()
            .with_base_url("https://bank.example.com")
            .with_access_token("token")
            .with_name(name)
            .with_created_at(Utc::now() - Duration::seconds(age_secs))
            .build()
            .unwrap()
    }

    fn generate_registry(
        repo: MockFakeRepo,
    ) -> (ConnectionRegistry<MockFakeRepo, MemoryKeyStore>, MemoryKeyStore) {
        let keystore = MemoryKeyStore::new();
        let registry = ConnectionRegistry::new(Arc::new(repo), Arc::new(keystore.clone()));
        (registry, keystore)
    }

    #[tokio::test]
    async fn test_load_orders_by_creation() {
        let newest = build_connection("newest", 10);
        let oldest = build_connection("oldest", 300);
        let middle = build_connection("middle", 60);

        let mut repo = MockFakeRepo::new();
        let stored = vec![newest.clone(), oldest.clone(), middle.clone()];
        repo.expect_load()
            .times(1)
            .returning(move || Ok(stored.clone()));

        let (registry, _) = generate_registry(repo);
        let total = registry.load().await.unwrap();
        assert_eq!(total, 3);

        let names: Vec<String> = registry
            .all()
            .await
            .iter()
            .map(|connection| connection.name().to_string())
            .collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
    }

    #[tokio::test]
    async fn test_register_generates_key() {
        let connection = build_connection("bank", 0);
        let expected_id = connection.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save()
            .times(1)
            .withf(move |saved: &Connection| saved.id() == &expected_id)
            .returning(|_| Ok(()));

        let (registry, keystore) = generate_registry(repo);
        let public_key = registry.register(connection.clone()).await.unwrap();

        assert_eq!(public_key.tag(), connection.key_tag());
        assert!(keystore.contains(connection.id()).await);
        assert_eq!(registry.all().await.len(), 1);

        let duplicate = registry.register(connection).await;
        assert!(matches!(duplicate, Err(ConnectionError::DuplicateError(_))));
    }

    #[tokio::test]
    async fn test_register_failure_drops_key() {
        let connection = build_connection("bank", 0);

        let mut repo = MockFakeRepo::new();
        repo.expect_save()
            .times(1)
            .returning(|_| Err(ConnectionError::StorageError("disk full".to_string())));

        let (registry, keystore) = generate_registry(repo);
        let result = registry.register(connection.clone()).await;

        assert!(matches!(result, Err(ConnectionError::StorageError(_))));
        assert!(!keystore.contains(connection.id()).await);
        assert!(registry.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_inactive_excludes_from_active() {
        let first = build_connection("first", 20);
        let second = build_connection("second", 10);
        let second_id = second.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(3).returning(|_| Ok(()));

        let (registry, _) = generate_registry(repo);
        let _ = registry.register(first.clone()).await.unwrap();
        let _ = registry.register(second.clone()).await.unwrap();

        registry.set_inactive(&second_id).await.unwrap();
        // already inactive, no extra write
        registry.set_inactive(&second_id).await.unwrap();

        let active = registry.active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), first.id());

        let stored = registry.by_id(&second_id).await.unwrap();
        assert_eq!(stored.status(), Status::Inactive);
        assert_eq!(registry.all().await.len(), 2);

        let unknown = registry.set_inactive(&ConnectionID::generate()).await;
        assert!(matches!(unknown, Err(ConnectionError::NotFoundError(_))));
    }

    #[tokio::test]
    async fn test_rename() {
        let connection = build_connection("bank", 0);
        let id = connection.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(2).returning(|_| Ok(()));

        let (registry, _) = generate_registry(repo);
        let _ = registry.register(connection).await.unwrap();

        let renamed = registry.rename(&id, "Savings").await.unwrap();
        assert_eq!(renamed.name(), "Savings");
        assert_eq!(registry.by_id(&id).await.unwrap().name(), "Savings");

        let invalid = registry.rename(&id, " ").await;
        assert!(matches!(invalid, Err(ConnectionError::ValidationError(_))));
        assert_eq!(registry.by_id(&id).await.unwrap().name(), "Savings");
    }

    #[tokio::test]
    async fn test_remove_cascades_key_deletion() {
        let connection = build_connection("bank", 0);
        let id = connection.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(1).returning(|_| Ok(()));
        repo.expect_delete()
            .times(1)
            .with(eq(id.clone()))
            .returning(|_| Ok(()));

        let (registry, keystore) = generate_registry(repo);
        let _ = registry.register(connection).await.unwrap();
        assert!(keystore.contains(&id).await);

        registry.remove(&id).await.unwrap();
        assert!(!keystore.contains(&id).await);
        assert!(registry.by_id(&id).await.is_none());

        let missing = registry.remove(&id).await;
        assert!(matches!(missing, Err(ConnectionError::NotFoundError(_))));
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_key() {
        let connection = build_connection("bank", 0);
        let id = connection.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(1).returning(|_| Ok(()));
        repo.expect_delete()
            .times(1)
            .returning(|_| Err(ConnectionError::StorageError("disk full".to_string())));

        let (registry, keystore) = generate_registry(repo);
        let _ = registry.register(connection).await.unwrap();

        let result = registry.remove(&id).await;
        assert!(matches!(result, Err(ConnectionError::StorageError(_))));

        assert!(keystore.contains(&id).await);
        assert!(registry.by_id(&id).await.is_some());
        assert_eq!(registry.active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_all_failure_keeps_remaining_keys() {
        let first = build_connection("first", 20);
        let second = build_connection("second", 10);
        let first_id = first.id().clone();
        let second_id = second.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(2).returning(|_| Ok(()));

        let deletable = first_id.clone();
        repo.expect_delete().times(2).returning(move |id| {
            if id == &deletable {
                Ok(())
            } else {
                Err(ConnectionError::StorageError("disk full".to_string()))
            }
        });

        let (registry, keystore) = generate_registry(repo);
        let _ = registry.register(first).await.unwrap();
        let _ = registry.register(second).await.unwrap();

        let result = registry.remove_all().await;
        assert!(matches!(result, Err(ConnectionError::StorageError(_))));

        assert!(!keystore.contains(&first_id).await);
        assert!(registry.by_id(&first_id).await.is_none());
        assert!(keystore.contains(&second_id).await);
        assert!(registry.by_id(&second_id).await.is_some());
    }

    #[tokio::test]
    async fn test_reconnect() {
        let connection = build_connection("bank", 0);
        let id = connection.id().clone();

        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(3).returning(|_| Ok(()));

        let (registry, keystore) = generate_registry(repo);
        let first_key = registry.register(connection).await.unwrap();

        let still_active = registry.reconnect(&id).await;
        assert!(matches!(still_active, Err(ConnectionError::ValidationError(_))));

        registry.set_inactive(&id).await.unwrap();
        let second_key = registry.reconnect(&id).await.unwrap();

        assert_ne!(first_key.as_bytes(), second_key.as_bytes());
        assert_eq!(keystore.public_key(&id).await.unwrap(), second_key);
        assert_eq!(registry.active().await.len(), 1);

        let unknown = registry.reconnect(&ConnectionID::generate()).await;
        assert!(matches!(unknown, Err(ConnectionError::NotFoundError(_))));
    }

    #[tokio::test]
    async fn test_remove_all() {
        let mut repo = MockFakeRepo::new();
        repo.expect_save().times(3).returning(|_| Ok(()));
        repo.expect_delete().times(3).returning(|_| Ok(()));

        let (registry, keystore) = generate_registry(repo);
        for name in ["a", "b", "c"] {
            let _ = registry.register(build_connection(name, 0)).await.unwrap();
        }

        let removed = registry.remove_all().await.unwrap();
        assert_eq!(removed, 3);
        assert!(registry.all().await.is_empty());
        assert_eq!(keystore.count().await, 0);
    }
}
