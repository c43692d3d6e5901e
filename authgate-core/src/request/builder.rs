use http::Method;

use rst_common::standard::serde_json;

use crate::authorization::types::{AuthorizationCode, AuthorizationID, Decision};
use crate::connection::Connection;
use crate::keystore::types::{KeyStoreBuilder, KeyStoreError};
use crate::signature::SignatureService;

use super::types::{DecisionBody, Operation, RequestDescriptor};

pub const AUTHORIZATIONS_PATH: &str = "api/authenticator/v1/authorizations";
pub const CONNECTIONS_PATH: &str = "api/authenticator/v1/connections";
pub const DEFAULT_LANGUAGE: &str = "en";

/// `RequestBuilder` maps a protocol operation to a signed [`RequestDescriptor`]
///
/// Signatures are deterministic, so identical inputs always give identical
/// descriptors.
pub struct RequestBuilder<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    signer: SignatureService<TKeyStore>,
    language: String,
}

impl<TKeyStore> Clone for RequestBuilder<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            language: self.language.clone(),
        }
    }
}

impl<TKeyStore> RequestBuilder<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    pub fn new(signer: SignatureService<TKeyStore>, language: &str) -> Self {
        let language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language.trim()
        };

        Self {
            signer,
            language: language.to_string(),
        }
    }

    pub fn signer(&self) -> &SignatureService<TKeyStore> {
        &self.signer
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub async fn list(&self, connection: &Connection) -> Result<RequestDescriptor, KeyStoreError> {
        let url = collection_url(connection.base_url());
        self.build(connection, Operation::List, Method::GET, url, None)
            .await
    }

    pub async fn get(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
    ) -> Result<RequestDescriptor, KeyStoreError> {
        let url = item_url(connection.base_url(), authorization_id);
        self.build(connection, Operation::Get, Method::GET, url, None)
            .await
    }

    pub async fn confirm(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
    ) -> Result<RequestDescriptor, KeyStoreError> {
        self.decision(connection, authorization_id, code, Decision::Confirm)
            .await
    }

    pub async fn deny(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
    ) -> Result<RequestDescriptor, KeyStoreError> {
        self.decision(connection, authorization_id, code, Decision::Deny)
            .await
    }

    /// revoke asks the server to forget the connection the request is signed for
    pub async fn revoke(&self, connection: &Connection) -> Result<RequestDescriptor, KeyStoreError> {
        let url = format!(
            "{}/{}",
            connection.base_url().trim_end_matches('/'),
            CONNECTIONS_PATH
        );
        self.build(connection, Operation::Revoke, Method::DELETE, url, None)
            .await
    }

    pub async fn decision(
        &self,
        connection: &Connection,
        authorization_id: &AuthorizationID,
        code: &AuthorizationCode,
        decision: Decision,
    ) -> Result<RequestDescriptor, KeyStoreError> {
        let body = serde_json::to_string(&DecisionBody {
            confirm: decision.is_confirm(),
            authorization_code: code.as_str(),
        })
        .map_err(|err| KeyStoreError::SignatureError(err.to_string()))?;

        let operation = match decision {
            Decision::Confirm => Operation::Confirm,
            Decision::Deny => Operation::Deny,
        };

        let url = item_url(connection.base_url(), authorization_id);
        self.build(connection, operation, Method::PUT, url, Some(body))
            .await
    }

    async fn build(
        &self,
        connection: &Connection,
        operation: Operation,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> Result<RequestDescriptor, KeyStoreError> {
        let signed = self
            .signer
            .sign(connection.id(), &method, &url, body.as_deref())
            .await?;

        let headers = SignatureService::<TKeyStore>::headers(
            connection.access_token(),
            signed.signature(),
            &self.language,
        );

        Ok(RequestDescriptor::new(operation, method, url, headers, body))
    }
}

fn collection_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), AUTHORIZATIONS_PATH)
}

fn item_url(base_url: &str, authorization_id: &AuthorizationID) -> String {
    format!("{}/{}", collection_url(base_url), authorization_id)
}
