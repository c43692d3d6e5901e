//! `authgate-client` wires the `authgate-core` engine to real infrastructure
//!
//! It provides the TOML configuration, the RocksDB backed key store and connection
//! repository and the `reqwest` transport. [`AuthGate`] assembles all of them into
//! a ready to use registry, poller, decision submitter and connection revoker.
use std::sync::Arc;
use std::time::Duration;

use rst_common::with_logging::log::info;

use authgate_core::authorization::{ConnectionRevoker, DecisionSubmitter, Poller, Tracker};
use authgate_core::connection::ConnectionRegistry;
use authgate_core::request::RequestBuilder;
use authgate_core::signature::SignatureService;

pub mod common;

mod apps;
mod config;
mod http;

pub use apps::{ConnectionRepository, RocksKeyStore};
pub use config::{Config, Parser as ConfigManager};
pub use http::Transport;

use common::helpers::validate;
use common::types::CommonError;

pub type Registry = ConnectionRegistry<ConnectionRepository, RocksKeyStore>;
pub type AuthPoller = Poller<RocksKeyStore, ConnectionRepository, Transport>;
pub type Submitter = DecisionSubmitter<RocksKeyStore, ConnectionRepository, Transport>;
pub type Revoker = ConnectionRevoker<RocksKeyStore, ConnectionRepository, Transport>;

/// `AuthGate` is the assembled authenticator runtime
#[derive(Clone)]
pub struct AuthGate {
    config: Config,
    registry: Registry,
    poller: AuthPoller,
    submitter: Submitter,
    revoker: Revoker,
}

impl AuthGate {
    /// new parses the given configuration file and opens its storage
    pub async fn new(conf_file: String) -> Result<Self, CommonError> {
        let config = ConfigManager::new(conf_file)
            .parse()
            .map_err(|err| CommonError::ConfigError(err.to_string()))?;

        validate(config.clone())?;

        let db = apps::db::setup_database(config.db())?;
        let sealing = config.keystore().sealing_key()?;

        let keystore = RocksKeyStore::new(db.clone(), sealing);
        let repo = ConnectionRepository::new(db);
        Self::assemble(config, repo, keystore).await
    }

    /// assemble builds the runtime from already opened storage adapters
    pub async fn assemble(
        config: Config,
        repo: ConnectionRepository,
        keystore: RocksKeyStore,
    ) -> Result<Self, CommonError> {
        let keystore = Arc::new(keystore);
        let transport = Arc::new(Transport::new(config.app().request_timeout())?);

        let registry = ConnectionRegistry::new(Arc::new(repo), keystore.clone());
        let total = registry
            .load()
            .await
            .map_err(|err| CommonError::ConnectionError(err.to_string()))?;

        let requests = RequestBuilder::new(
            SignatureService::new(keystore),
            &config.app().language(),
        );
        let tracker = Tracker::new();

        let poller = Poller::new(
            registry.clone(),
            requests.clone(),
            transport.clone(),
            tracker.clone(),
        );
        let submitter = DecisionSubmitter::new(
            registry.clone(),
            requests.clone(),
            transport.clone(),
            tracker,
        );
        let revoker = ConnectionRevoker::new(registry.clone(), requests, transport);

        info!("[authgate:assemble] runtime ready, connections: {}", total);
        Ok(Self {
            config,
            registry,
            poller,
            submitter,
            revoker,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn poller(&self) -> &AuthPoller {
        &self.poller
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    pub fn revoker(&self) -> &Revoker {
        &self.revoker
    }

    pub fn tracker(&self) -> &Tracker {
        self.poller.tracker()
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.app().poll_interval()
    }
}
