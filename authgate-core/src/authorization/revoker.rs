use std::sync::Arc;

use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::types::{ConnectionError, ConnectionID, RepoBuilder};
use crate::connection::{Connection, ConnectionRegistry};
use crate::keystore::types::KeyStoreBuilder;
use crate::request::RequestBuilder;

use super::response;
use super::types::{AuthorizationError, TransportBuilder};

/// `ConnectionRevoker` tells the server a pairing is gone before dropping it locally
///
/// Revocation is best effort. Only active connections are revoked, and a failed
/// revoke is logged without blocking the local removal.
pub struct ConnectionRevoker<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
{
    registry: ConnectionRegistry<TRepo, TKeyStore>,
    requests: RequestBuilder<TKeyStore>,
    transport: Arc<TTransport>,
}

impl<TKeyStore, TRepo, TTransport> Clone for ConnectionRevoker<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
{
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            requests: self.requests.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<TKeyStore, TRepo, TTransport> ConnectionRevoker<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
{
    pub fn new(
        registry: ConnectionRegistry<TRepo, TKeyStore>,
        requests: RequestBuilder<TKeyStore>,
        transport: Arc<TTransport>,
    ) -> Self {
        Self {
            registry,
            requests,
            transport,
        }
    }

    /// revoke sends the signed revoke request for one connection
    pub async fn revoke(&self, connection: &Connection) -> Result<(), AuthorizationError> {
        let request = self.requests.revoke(connection).await?;
        let reply = self.transport.execute(request).await?;
        response::parse_revoke(&reply)
    }

    /// remove revokes the connection server side, then removes it with its key pair
    pub async fn remove(&self, id: &ConnectionID) -> Result<(), ConnectionError> {
        let connection = self
            .registry
            .by_id(id)
            .await
            .ok_or(ConnectionError::NotFoundError(id.to_string()))?;

        self.try_revoke(&connection).await;
        self.registry.remove(id).await
    }

    /// remove_all revokes every active connection, then wipes all of them
    pub async fn remove_all(&self) -> Result<usize, ConnectionError> {
        let active = self.registry.active().await;
        for connection in active.iter() {
            self.try_revoke(connection).await;
        }

        let removed = self.registry.remove_all().await?;
        info!(
            "[revoker:remove_all] revoked: {} | removed: {}",
            active.len(),
            removed
        );
        Ok(removed)
    }

    async fn try_revoke(&self, connection: &Connection) {
        if !connection.is_active() {
            debug!(
                "[revoker] {} is inactive, skipping server revoke",
                connection.id()
            );
            return;
        }

        match self.revoke(connection).await {
            Ok(_) => info!("[revoker] connection revoked: {}", connection.id()),
            Err(err) => warn!(
                "[revoker] unable to revoke {}, removing locally: {}",
                connection.id(),
                err
            ),
        }
    }
}
