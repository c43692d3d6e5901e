use cli_table::{print_stdout, WithTitle};

use rst_common::with_logging::log::{debug, info};

use authgate_client::AuthGate;
use authgate_core::authorization::types::{AuthorizationID, Decision};
use authgate_core::authorization::CycleOutcome;
use authgate_core::connection::types::ConnectionID;
use authgate_core::connection::Connection;

use crate::errors::DaemonError;

use super::types::{AuthorizationRow, ConnectionRow};
use super::{AuthorizationCommands, ConnectionCommands, ConsoleGate};

pub async fn connection_handler(
    authgate: &AuthGate,
    commands: ConnectionCommands,
) -> Result<(), DaemonError> {
    let registry = authgate.registry();

    match commands {
        ConnectionCommands::Add(args) => {
            debug!("[connection:add] base_url: {}", args.base_url);

            let mut builder = Connection::builder()
                .with_base_url(&args.base_url)
                .with_access_token(&args.access_token);

            if let Some(id) = args.id.as_deref() {
                builder = builder.with_id(id);
            }

            if let Some(name) = args.name.as_deref() {
                builder = builder.with_name(name);
            }

            let connection = builder
                .build()
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            let public_key = registry
                .register(connection.clone())
                .await
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            info!("[connection:add] paired: {}", connection.id());
            println!("connection id: {}", connection.id());
            println!("public key: {}", public_key.to_base64());
        }
        ConnectionCommands::Rename(args) => {
            let renamed = registry
                .rename(&ConnectionID::from(args.id), &args.name)
                .await
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            info!("[connection:rename] {} renamed to {}", renamed.id(), renamed.name());
        }
        ConnectionCommands::Reconnect(args) => {
            let public_key = registry
                .reconnect(&ConnectionID::from(args.id.clone()))
                .await
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            info!("[connection:reconnect] new key pair for: {}", args.id);
            println!("public key: {}", public_key.to_base64());
        }
        ConnectionCommands::Remove(args) => {
            authgate
                .revoker()
                .remove(&ConnectionID::from(args.id.clone()))
                .await
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            info!("[connection:remove] removed: {}", args.id);
        }
        ConnectionCommands::RemoveAll => {
            let total = authgate
                .revoker()
                .remove_all()
                .await
                .map_err(|err| DaemonError::ConnectionError(err.to_string()))?;

            info!("[connection:remove_all] removed: {}", total);
        }
        ConnectionCommands::List => {
            let rows: Vec<ConnectionRow> = registry
                .all()
                .await
                .iter()
                .map(ConnectionRow::from)
                .collect();

            print_stdout(rows.with_title())
                .map_err(|err| DaemonError::OutputError(err.to_string()))?;
        }
    }

    Ok(())
}

pub async fn authorization_handler(
    authgate: &AuthGate,
    commands: AuthorizationCommands,
) -> Result<(), DaemonError> {
    match commands {
        AuthorizationCommands::List => {
            let outcome = authgate.poller().poll_once().await;
            debug!("[authorization:list] cycle: {:?}", outcome);

            if let CycleOutcome::Completed { connections, .. } = outcome {
                info!("[authorization:list] polled connections: {}", connections);
            }

            let rows: Vec<AuthorizationRow> = authgate
                .tracker()
                .snapshot()
                .iter()
                .map(AuthorizationRow::from)
                .collect();

            print_stdout(rows.with_title())
                .map_err(|err| DaemonError::OutputError(err.to_string()))?;
        }
        AuthorizationCommands::Decide(args) => {
            let connection_id = ConnectionID::from(args.connection);
            let authorization_id = AuthorizationID::from(args.authorization);

            let authorization = authgate
                .poller()
                .fetch(&connection_id, &authorization_id)
                .await
                .map_err(|err| DaemonError::AuthorizationError(err.to_string()))?;

            println!("{}", authorization.title());
            println!("{}", authorization.description());
            if let Some(payload) = authorization.payload() {
                println!("{}", payload);
            }

            let decision = if args.deny {
                Decision::Deny
            } else {
                Decision::Confirm
            };

            let state = authgate
                .submitter()
                .submit_with_gate(
                    &ConsoleGate,
                    &connection_id,
                    &authorization_id,
                    authorization.authorization_code(),
                    decision,
                )
                .await
                .map_err(|err| DaemonError::AuthorizationError(err.to_string()))?;

            info!("[authorization:decide] {} is now {:?}", authorization_id, state);
        }
    }

    Ok(())
}
