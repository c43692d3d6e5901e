use std::sync::Arc;

use mockall::mock;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{Duration, Utc};
use rst_common::standard::serde_json::{self, json};

use crate::connection::types::{ConnectionError, ConnectionID, RepoBuilder};
use crate::connection::{Connection, ConnectionRegistry};
use crate::keystore::types::PublicKeyInfo;
use crate::keystore::{encrypt_for, MemoryKeyStore};
use crate::request::types::RequestDescriptor;
use crate::request::RequestBuilder;
use crate::signature::SignatureService;

use super::types::{
    Authorization, AuthorizationCode, AuthorizationError, AuthorizationID,
    EncryptedAuthorization, HttpResponse, TransportBuilder,
};

mock!(
    pub FakeRepo{}

    #[async_trait]
    impl RepoBuilder for FakeRepo {
        async fn load(&self) -> Result<Vec<Connection>, ConnectionError>;
        async fn save(&self, connection: &Connection) -> Result<(), ConnectionError>;
        async fn delete(&self, id: &ConnectionID) -> Result<(), ConnectionError>;
    }
);

mock!(
    pub FakeTransport{}

    #[async_trait]
    impl TransportBuilder for FakeTransport {
        async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse, AuthorizationError>;
    }
);

pub type Registry = ConnectionRegistry<MockFakeRepo, MemoryKeyStore>;

pub fn generate_registry() -> (Registry, RequestBuilder<MemoryKeyStore>) {
    let mut repo = MockFakeRepo::new();
    repo.expect_load().returning(|| Ok(Vec::new()));
    repo.expect_save().returning(|_| Ok(()));
    repo.expect_delete().returning(|_| Ok(()));

    let keystore = Arc::new(MemoryKeyStore::new());
    let registry = ConnectionRegistry::new(Arc::new(repo), keystore.clone());
    let requests = RequestBuilder::new(SignatureService::new(keystore), "en");
    (registry, requests)
}

pub async fn register(registry: &Registry, base_url: &str) -> (Connection, PublicKeyInfo) {
    let connection = Connection::builder()
        .with_base_url(base_url)
        .with_access_token("token")
        .build()
        .unwrap();

    let public_key = registry.register(connection.clone()).await.unwrap();
    (connection, public_key)
}

pub fn build_authorization(connection_id: &ConnectionID, id: &str, remaining: i64) -> Authorization {
    let now = Utc::now();
    Authorization::new(
        AuthorizationID::from(id.to_string()),
        connection_id.clone(),
        format!("Authorization {}", id),
        "Confirm the payment".to_string(),
        Some(json!({"amount": "10.00", "currency": "EUR"})),
        AuthorizationCode::from(format!("code-{}", id)),
        now - Duration::seconds(10),
        now + Duration::seconds(remaining),
    )
}

/// seal encrypts an authorization the way the server does
pub fn seal(public_key: &PublicKeyInfo, authorization: &Authorization) -> EncryptedAuthorization {
    let plaintext = serde_json::to_vec(authorization).unwrap();
    let ciphertext = encrypt_for(public_key.as_bytes(), &plaintext).unwrap();
    EncryptedAuthorization::from_ciphertext(
        authorization.id().clone(),
        authorization.connection_id().clone(),
        &ciphertext,
    )
}

pub fn list_body(envelopes: &[EncryptedAuthorization]) -> String {
    json!({ "data": envelopes }).to_string()
}

pub fn single_body(envelope: &EncryptedAuthorization) -> String {
    json!({ "data": envelope }).to_string()
}

pub fn connection_not_found_body() -> String {
    json!({"error_class": "ConnectionNotFound", "error_message": "connection revoked"}).to_string()
}
