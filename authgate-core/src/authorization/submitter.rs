use std::sync::Arc;

use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::types::{ConnectionID, RepoBuilder};
use crate::connection::{Connection, ConnectionRegistry};
use crate::keystore::types::KeyStoreBuilder;
use crate::request::RequestBuilder;

use super::lifecycle::State;
use super::response;
use super::tracker::Tracker;
use super::types::{
    AuthorizationCode, AuthorizationError, AuthorizationID, AuthorizationKey, CredentialGate,
    Decision, Purpose, TransportBuilder,
};

/// `DecisionSubmitter` sends a confirm or deny decision and records its outcome
///
/// The tracked item switches to `Confirming`/`Denying` before the request leaves,
/// then to `Confirmed`/`Denied` on acknowledgment or to `Error` on any failure.
/// A failed decision can be submitted again, the server treats the same code and
/// flag idempotently.
pub struct DecisionSubmitter<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
{
    registry: ConnectionRegistry<TRepo, TKeyStore>,
    requests: RequestBuilder<TKeyStore>,
    transport: Arc<TTransport>,
    tracker: Tracker,
}

impl<TKeyStore, TRepo, TTransport> Clone for DecisionSubmitter<TKeyStore, TRepo, TTransport>
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
        }
    }
}

impl<TKeyStore, TRepo, TTransport> DecisionSubmitter<TKeyStore, TRepo, TTransport>
where
    TKeyStore: KeyStoreBuilder,
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
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
        }
    }

    pub async fn submit(
        &self,
        connection_id: &ConnectionID,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
        decision: Decision,
    ) -> Result<State, AuthorizationError> {
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

        let key = AuthorizationKey::new(connection_id.clone(), authorization_id.clone());
        self.tracker.begin(&key, decision)?;
        debug!(
            "[submitter:submit] {:?} sent for {}/{}",
            decision, connection_id, authorization_id
        );

        match self.send(&connection, authorization_id, code, decision).await {
            Ok(_) => {
                let state = self.tracker.complete(&key, decision)?;
                info!(
                    "[submitter:submit] {}/{} ended as {:?}",
                    connection_id, authorization_id, state
                );
                Ok(state)
            }
            Err(err) => {
                let state = self.tracker.fail(&key)?;
                warn!(
                    "[submitter:submit] {}/{} failed, state: {:?}, error: {}",
                    connection_id, authorization_id, state, err
                );

                if matches!(err, AuthorizationError::ConnectionNotFoundError(_)) {
                    if let Err(deactivate) = self.registry.set_inactive(connection_id).await {
                        warn!("[submitter:submit] unable to deactivate: {}", deactivate);
                    }
                }

                Err(err)
            }
        }
    }

    /// submit_with_gate requires the local credential check before a confirm
    ///
    /// Denying never prompts. A refused check leaves the authorization untouched.
    pub async fn submit_with_gate<TGate>(
        &self,
        gate: &TGate,
        connection_id: &ConnectionID,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
        decision: Decision,
    ) -> Result<State, AuthorizationError>
    where
        TGate: CredentialGate + ?Sized,
    {
        if decision.is_confirm() && !gate.authenticate(Purpose::ConfirmAuthorization).await {
            warn!(
                "[submitter:gate] user verification refused for {}",
                authorization_id
            );
            return Err(AuthorizationError::AuthenticationDenied);
        }

        self.submit(connection_id, authorization_id, code, decision)
            .await
    }

    async fn send(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
        decision: Decision,
    ) -> Result<(), AuthorizationError> {
        let request = self
            .requests
            .decision(connection, authorization_id, code, decision)
            .await?;

        let operation = request.operation();
        let reply = self.transport.execute(request).await?;
        response::parse_decision(&reply, operation, authorization_id)
    }
}
