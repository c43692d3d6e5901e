//! Response classification for the authorization endpoints
//!
//! Successful payloads are wrapped in `{"data": ...}`. Failed calls carry
//! `{"error_class": "...", "error_message": "..."}`. Only the
//! `ConnectionNotFound` error class revokes a connection, a bare 404 does not.
use rst_common::standard::serde::{self, de::DeserializeOwned, Deserialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::warn;

use crate::request::types::Operation;

use super::types::{AuthorizationError, AuthorizationID, EncryptedAuthorization, HttpResponse};

pub const ERROR_CLASS_CONNECTION_NOT_FOUND: &str = "ConnectionNotFound";

#[derive(Deserialize)]
#[serde(crate = "self::serde")]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize, Default)]
#[serde(crate = "self::serde")]
struct ErrorBody {
    #[serde(default)]
    error_class: Option<String>,

    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "self::serde")]
struct DecisionOutcome {
    success: bool,

    #[serde(default)]
    id: Option<AuthorizationID>,
}

/// classify maps a non successful response to the error taxonomy
pub fn classify(response: &HttpResponse, operation: Operation) -> Result<(), AuthorizationError> {
    if response.is_success() {
        return Ok(());
    }

    let error: ErrorBody = serde_json::from_str(response.body()).unwrap_or_default();
    let message = error
        .error_message
        .unwrap_or_else(|| format!("unexpected status {}", response.status()));

    if error.error_class.as_deref() == Some(ERROR_CLASS_CONNECTION_NOT_FOUND) {
        return Err(AuthorizationError::ConnectionNotFoundError(message));
    }

    match response.status() {
        408 | 429 | 500..=599 => Err(AuthorizationError::NetworkError(message)),
        _ if operation.is_decision() => Err(AuthorizationError::DecisionRejectedError(message)),
        _ => Err(AuthorizationError::ProtocolError(message)),
    }
}

/// parse_list extracts the envelopes of a list response
///
/// Items that do not match the envelope shape are skipped, the others are kept.
pub fn parse_list(response: &HttpResponse) -> Result<Vec<EncryptedAuthorization>, AuthorizationError> {
    classify(response, Operation::List)?;

    let items: Vec<Value> = parse_data(response)?;
    let total = items.len();
    let envelopes: Vec<EncryptedAuthorization> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!("[response:list] skipping malformed item: {}", err);
                None
            }
        })
        .collect();

    if envelopes.len() != total {
        warn!(
            "[response:list] kept {} of {} items",
            envelopes.len(),
            total
        );
    }

    Ok(envelopes)
}

pub fn parse_single(response: &HttpResponse) -> Result<EncryptedAuthorization, AuthorizationError> {
    classify(response, Operation::Get)?;
    parse_data(response)
}

/// parse_decision accepts `{"data": {"success": true, "id": "..."}}` only
pub fn parse_decision(
    response: &HttpResponse,
    operation: Operation,
    authorization_id: &AuthorizationID,
) -> Result<(), AuthorizationError> {
    classify(response, operation)?;

    let outcome: DecisionOutcome = parse_data(response)?;
    if !outcome.success {
        return Err(AuthorizationError::DecisionRejectedError(format!(
            "server declined decision for {}",
            authorization_id
        )));
    }

    match outcome.id {
        Some(id) if &id != authorization_id => {
            Err(AuthorizationError::DecisionRejectedError(format!(
                "decision acknowledged for {} instead of {}",
                id, authorization_id
            )))
        }
        _ => Ok(()),
    }
}

/// parse_revoke accepts any successful answer to a connection revoke
pub fn parse_revoke(response: &HttpResponse) -> Result<(), AuthorizationError> {
    classify(response, Operation::Revoke)
}

fn parse_data<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, AuthorizationError> {
    serde_json::from_str::<Envelope<T>>(response.body())
        .map(|envelope| envelope.data)
        .map_err(|err| AuthorizationError::ProtocolError(err.to_string()))
}
