use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;

use rst_common::standard::serde_json::{self, Value};

use crate::connection::types::ConnectionID;
use crate::keystore::types::{Ciphertext, KeyStoreBuilder, KeyStoreError, Signature};

use super::types::{
    SignedPayload, HEADER_ACCEPT_LANGUAGE, HEADER_ACCESS_TOKEN, HEADER_SIGNATURE,
};

/// `SignatureService` signs and decrypts through the key store
///
/// The canonical signing string is `METHOD + URL + BODY`, where `BODY` is the
/// exact JSON text sent on the wire, or an empty string when there is none.
pub struct SignatureService<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    keystore: Arc<TKeyStore>,
}

impl<TKeyStore> Clone for SignatureService<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    fn clone(&self) -> Self {
        Self {
            keystore: self.keystore.clone(),
        }
    }
}

impl<TKeyStore> SignatureService<TKeyStore>
where
    TKeyStore: KeyStoreBuilder,
{
    pub fn new(keystore: Arc<TKeyStore>) -> Self {
        Self { keystore }
    }

    pub fn signing_string(method: &Method, url: &str, body: Option<&str>) -> String {
        format!("{}{}{}", method.as_str(), url, body.unwrap_or(""))
    }

    pub async fn sign(
        &self,
        connection_id: &ConnectionID,
        method: &Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<SignedPayload, KeyStoreError> {
        let signing_string = Self::signing_string(method, url, body);
        let signature = self
            .keystore
            .sign(connection_id, signing_string.as_bytes())
            .await?;

        Ok(SignedPayload::new(
            connection_id.clone(),
            signing_string,
            signature,
        ))
    }

    pub fn headers(
        access_token: &str,
        signature: &Signature,
        language: &str,
    ) -> BTreeMap<String, String> {
        BTreeMap::from([
            (HEADER_ACCESS_TOKEN.to_string(), access_token.to_string()),
            (HEADER_SIGNATURE.to_string(), signature.to_base64()),
            (HEADER_ACCEPT_LANGUAGE.to_string(), language.to_string()),
        ])
    }

    /// decrypt opens a payload addressed to the connection and parses it as JSON
    pub async fn decrypt(
        &self,
        connection_id: &ConnectionID,
        ciphertext: &Ciphertext,
    ) -> Result<Value, KeyStoreError> {
        let plaintext = self.keystore.decrypt(connection_id, ciphertext).await?;
        serde_json::from_slice(&plaintext)
            .map_err(|err| KeyStoreError::DecryptionError(format!("invalid cleartext: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::with_tokio::tokio;

    use crate::keystore::{encrypt_for, verify, MemoryKeyStore};

    fn generate_service() -> (SignatureService<MemoryKeyStore>, MemoryKeyStore) {
        let keystore = MemoryKeyStore::new();
        (SignatureService::new(Arc::new(keystore.clone())), keystore)
    }

    #[test]
    fn test_signing_string() {
        let with_body = SignatureService::<MemoryKeyStore>::signing_string(
            &Method::PUT,
            "https://bank.example.com/api/authenticator/v1/authorizations/1",
            Some("{\"confirm\":true}"),
        );
        assert_eq!(
            with_body,
            "PUThttps://bank.example.com/api/authenticator/v1/authorizations/1{\"confirm\":true}"
        );

        let without_body = SignatureService::<MemoryKeyStore>::signing_string(
            &Method::GET,
            "https://bank.example.com/a",
            None,
        );
        assert_eq!(without_body, "GEThttps://bank.example.com/a");
    }

    #[tokio::test]
    async fn test_sign_verifiable_with_public_key() {
        let (service, keystore) = generate_service();
        let connection_id = ConnectionID::generate();
        let public_key = keystore.generate(&connection_id).await.unwrap();

        let payload = service
            .sign(&connection_id, &Method::GET, "https://bank.example.com/a", None)
            .await
            .unwrap();

        assert_eq!(payload.connection_id(), &connection_id);
        assert_eq!(payload.key_tag(), public_key.tag());
        assert!(verify(
            public_key.as_bytes(),
            payload.signing_string().as_bytes(),
            payload.signature()
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_sign_without_key() {
        let (service, _) = generate_service();
        let result = service
            .sign(&ConnectionID::generate(), &Method::GET, "https://a", None)
            .await;

        assert!(matches!(result, Err(KeyStoreError::KeyNotFoundError(_))));
    }

    #[test]
    fn test_headers() {
        let signature = Signature::new(vec![1, 2, 3, 4]);
        let headers = SignatureService::<MemoryKeyStore>::headers("token", &signature, "en");

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Access-Token"), Some(&"token".to_string()));
        assert_eq!(headers.get("Signature"), Some(&"AQIDBA==".to_string()));
        assert_eq!(headers.get("Accept-Language"), Some(&"en".to_string()));
    }

    #[tokio::test]
    async fn test_decrypt_json() {
        let (service, keystore) = generate_service();
        let connection_id = ConnectionID::generate();
        let public_key = keystore.generate(&connection_id).await.unwrap();

        let ciphertext = encrypt_for(public_key.as_bytes(), br#"{"title":"Login"}"#).unwrap();
        let value = service.decrypt(&connection_id, &ciphertext).await.unwrap();
        assert_eq!(value["title"], "Login");

        let not_json = encrypt_for(public_key.as_bytes(), b"plain text").unwrap();
        let result = service.decrypt(&connection_id, &not_json).await;
        assert!(matches!(result, Err(KeyStoreError::DecryptionError(_))));
    }

    #[tokio::test]
    async fn test_decrypt_with_other_connection_key() {
        let (service, keystore) = generate_service();
        let alice = ConnectionID::generate();
        let bob = ConnectionID::generate();
        let alice_key = keystore.generate(&alice).await.unwrap();
        let _ = keystore.generate(&bob).await.unwrap();

        let ciphertext = encrypt_for(alice_key.as_bytes(), br#"{"title":"Login"}"#).unwrap();
        let result = service.decrypt(&bob, &ciphertext).await;
        assert!(matches!(result, Err(KeyStoreError::DecryptionError(_))));
    }
}
