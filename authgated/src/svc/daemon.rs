use std::collections::HashMap;
use std::time::Duration;

use rst_common::with_logging::log::{info, warn};
use rst_common::with_tokio::tokio::{self, time::interval};
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use authgate_client::AuthGate;
use authgate_core::authorization::types::AuthorizationKey;
use authgate_core::authorization::{AuthorizationView, State};

use crate::errors::DaemonError;

const TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct Daemon {
    config: String,
}

impl Daemon {
    pub fn new(config: String) -> Daemon {
        Self { config }
    }

    pub fn init_tracing() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!(
                        "{}=debug,authgate_core=debug,authgate_client=debug",
                        env!("CARGO_CRATE_NAME")
                    )
                    .into()
                }),
            )
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    pub async fn authgate(&self) -> Result<AuthGate, DaemonError> {
        AuthGate::new(self.config.to_owned())
            .await
            .map_err(|err| DaemonError::SetupError(err.to_string()))
    }

    /// run polls every active connection until the process receives ctrl-c
    ///
    /// A one second ticker drives the countdown of every tracked authorization.
    pub async fn run(&self) -> Result<(), DaemonError> {
        let authgate = self.authgate().await?;
        let tracker = authgate.tracker().clone();

        let handle = authgate.poller().start(authgate.poll_interval());
        let mut updates = tracker.subscribe();
        let mut ticker = interval(TICK_PERIOD);
        let mut states: HashMap<AuthorizationKey, State> = HashMap::new();

        info!(
            "[daemon:run] polling every {:?}, press ctrl-c to stop",
            authgate.poll_interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = tracker.tick();
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }

                    let views = updates.borrow_and_update().clone();
                    report_transitions(&mut states, &views);
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(err) = signal {
                        warn!("[daemon:run] unable to listen for ctrl-c: {}", err);
                    }
                    break;
                }
            }
        }

        handle.stop().await;
        info!("[daemon:run] poller stopped");
        Ok(())
    }
}

fn report_transitions(states: &mut HashMap<AuthorizationKey, State>, views: &[AuthorizationView]) {
    let mut current = HashMap::with_capacity(views.len());
    for view in views {
        let key = view.authorization().key();
        if states.get(&key) != Some(&view.state()) {
            info!(
                "[daemon:run] {} | {} | {} | state: {:?} | remaining: {}s",
                key.connection_id(),
                key.authorization_id(),
                view.authorization().title(),
                view.state(),
                view.remaining()
            );
        }

        current.insert(key, view.state());
    }

    *states = current;
}
