use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info, warn};
use rst_common::with_tokio::tokio::{
    self,
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::{interval, MissedTickBehavior},
};

use crate::connection::types::{ConnectionID, RepoBuilder};
use crate::connection::{Connection, ConnectionRegistry};
use crate::keystore::types::KeyStoreBuilder;
use crate::request::RequestBuilder;

use super::response;
use super::tracker::Tracker;
use super::types::{
    Authorization, AuthorizationError, AuthorizationID, EncryptedAuthorization, TransportBuilder,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { connections: usize, items: usize },
    Skipped,
}

struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `Poller` fetches pending authorizations from every active connection
///
/// One cycle issues a single `list` request per active connection, in parallel,
/// and publishes the merged result once every connection has answered. Cycles
/// never overlap: a cycle requested while another one runs is skipped.
pub struct Poller<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
{
    registry: ConnectionRegistry<TRepo, TKeyStore>,
    requests: RequestBuilder<TKeyStore>,
    transport: Arc<TTransport>,
    tracker: Tracker,
    in_flight: Arc<AtomicBool>,
}

impl<TKeyStore, TRepo, TTransport> Clone for Poller<TKeyStore, TRepo, TTransport>
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
            tracker: self.tracker.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<TKeyStore, TRepo, TTransport> Poller<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder + 'static,
    TRepo: RepoBuilder + 'static,
    TTransport: TransportBuilder + 'static,
{
    pub fn new(
        registry: ConnectionRegistry<TRepo, TKeyStore>,
        requests: RequestBuilder<TKeyStore>,
        transport: Arc<TTransport>,
        tracker: Tracker,
    ) -> Self {
        Self {
            registry,
            requests,
            transport,
            tracker,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// poll_once runs a single cycle over the current active connections
    pub async fn poll_once(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[poller:cycle] previous cycle still running, skipped");
            return CycleOutcome::Skipped;
        }
        let _guard = FlightGuard(self.in_flight.clone());

        let connections = self.registry.active().await;
        if connections.is_empty() {
            self.tracker.sync(Vec::new());
            return CycleOutcome::Completed {
                connections: 0,
                items: 0,
            };
        }

        let total = connections.len();
        let mut tasks = JoinSet::new();
        for (index, connection) in connections.into_iter().enumerate() {
            let poller = self.clone();
            tasks.spawn(async move {
                let result = poller.fetch_connection(&connection).await;
                (index, connection.id().clone(), result)
            });
        }

        let mut results: Vec<Option<Vec<Authorization>>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(items))) => results[index] = Some(items),
                Ok((_, connection_id, Err(err))) => self.handle_failure(&connection_id, err).await,
                Err(err) => warn!("[poller:cycle] fetch task aborted: {}", err),
            }
        }

        let mut seen = HashSet::new();
        let merged: Vec<Authorization> = results
            .into_iter()
            .flatten()
            .flatten()
            .filter(|item| seen.insert(item.key()))
            .collect();

        let items = merged.len();
        self.tracker.sync(merged);
        debug!("[poller:cycle] connections: {} | items: {}", total, items);

        CycleOutcome::Completed {
            connections: total,
            items,
        }
    }

    /// fetch loads a single authorization and adds it to the tracked set
    ///
    /// Used when a push event names an authorization the last cycle has not seen yet.
    pub async fn fetch(
        &self,
        connection_id: &ConnectionID,
        authorization_id: &AuthorizationID,
    ) -> Result<Authorization, AuthorizationError> {
        let connection = self
            .registry
            .by_id(connection_id)
            .await
            .filter(|connection| connection.is_active())
            .ok_or_else(|| {
                AuthorizationError::ConnectionError(format!(
                    "no active connection: {}",
                    connection_id
                ))
            })?;

        let result = self.fetch_single(&connection, authorization_id).await;
        match result {
            Ok(item) => {
                self.tracker.track(item.clone());
                Ok(item)
            }
            Err(err) => {
                if matches!(err, AuthorizationError::ConnectionNotFoundError(_)) {
                    self.deactivate(connection_id).await;
                }
                Err(err)
            }
        }
    }

    /// start runs cycles on a fixed interval until the handle is stopped
    pub fn start(&self, period: Duration) -> PollerHandle {
        let period = if period.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            period
        };

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let poller = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("[poller] started, interval: {:?}", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = poller.poll_once().await;
                        debug!("[poller] cycle outcome: {:?}", outcome);
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("[poller] stopped");
        });

        PollerHandle { shutdown, task }
    }

    async fn fetch_connection(
        &self,
        connection: &Connection,
    ) -> Result<Vec<Authorization>, AuthorizationError> {
        let request = self.requests.list(connection).await?;
        let reply = self.transport.execute(request).await?;
        let envelopes = response::parse_list(&reply)?;

        let mut items = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let id = envelope.id.clone();
            match self.open(connection, envelope).await {
                Ok(item) => items.push(item),
                Err(err) => warn!(
                    "[poller:decrypt] dropping {} from {}: {}",
                    id,
                    connection.id(),
                    err
                ),
            }
        }

        Ok(items)
    }

    async fn fetch_single(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
    ) -> Result<Authorization, AuthorizationError> {
        let request = self.requests.get(connection, authorization_id).await?;
        let reply = self.transport.execute(request).await?;
        let envelope = response::parse_single(&reply)?;

        if &envelope.id != authorization_id {
            return Err(AuthorizationError::ProtocolError(format!(
                "requested {} but received {}",
                authorization_id, envelope.id
            )));
        }

        self.open(connection, envelope).await
    }

    /// open decrypts an envelope and checks it belongs to the connection it came from
    async fn open(
        &self,
        connection: &Connection,
        envelope: EncryptedAuthorization,
    ) -> Result<Authorization, AuthorizationError> {
        if &envelope.connection_id != connection.id() {
            return Err(AuthorizationError::ProtocolError(format!(
                "envelope addressed to {}",
                envelope.connection_id
            )));
        }

        let ciphertext = envelope.to_ciphertext()?;
        let value = self
            .requests
            .signer()
            .decrypt(connection.id(), &ciphertext)
            .await?;

        let authorization: Authorization = serde_json::from_value(value)
            .map_err(|err| AuthorizationError::ProtocolError(err.to_string()))?;

        if authorization.id() != &envelope.id || authorization.connection_id() != connection.id() {
            return Err(AuthorizationError::ProtocolError(
                "decrypted payload does not match its envelope".to_string(),
            ));
        }

        Ok(authorization)
    }

    async fn handle_failure(&self, connection_id: &ConnectionID, err: AuthorizationError) {
        match err {
            AuthorizationError::ConnectionNotFoundError(msg) => {
                warn!(
                    "[poller:fetch] connection {} unknown to server: {}",
                    connection_id, msg
                );
                self.deactivate(connection_id).await;
            }
            other => warn!("[poller:fetch] connection {}: {}", connection_id, other),
        }
    }

    async fn deactivate(&self, connection_id: &ConnectionID) {
        if let Err(err) = self.registry.set_inactive(connection_id).await {
            warn!(
                "[poller] unable to deactivate connection {}: {}",
                connection_id, err
            );
        }
    }
}

/// `PollerHandle` controls a running poller task
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// stop lets an in-flight cycle finish, then waits for the task to exit
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!("[poller] task ended abnormally: {}", err);
        }
    }
}
