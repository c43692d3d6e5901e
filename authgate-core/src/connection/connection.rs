use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::keystore::types::KeyTag;

use super::types::{ConnectionError, ConnectionID, Status};

/// `Connection` is a paired trust relationship with a remote service
///
/// The record only references its key pair by [`KeyTag`], the key material
/// itself stays inside the key store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Connection {
    id: ConnectionID,
    base_url: String,
    access_token: String,
    name: String,
    status: Status,
    key_tag: KeyTag,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub fn id(&self) -> &ConnectionID {
        &self.id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn key_tag(&self) -> &KeyTag {
        &self.key_tag
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn rename(&mut self, name: &str) -> Result<(), ConnectionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConnectionError::ValidationError(
                "connection: name is empty".to_string(),
            ));
        }

        self.name = name.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// `ConnectionBuilder` assembles a validated [`Connection`]
///
/// `base_url` and `access_token` are mandatory. A random id is generated when
/// none is given, and the display name falls back to the base url.
#[derive(Default)]
pub struct ConnectionBuilder {
    id: Option<String>,
    base_url: Option<String>,
    access_token: Option<String>,
    name: Option<String>,
    status: Option<Status>,
    created_at: Option<DateTime<Utc>>,
}

impl ConnectionBuilder {
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_access_token(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn build(self) -> Result<Connection, ConnectionError> {
        let id = match self.id {
            Some(id) => {
                Uuid::parse_str(&id).map_err(|err| {
                    ConnectionError::ValidationError(format!("connection: invalid id: {}", err))
                })?;
                ConnectionID::from(id)
            }
            None => ConnectionID::generate(),
        };

        let base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConnectionError::ValidationError(
                "connection: base_url is missing".to_string(),
            ))?;

        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(ConnectionError::ValidationError(format!(
                "connection: unsupported base_url: {}",
                base_url
            )));
        }

        let access_token = self
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConnectionError::ValidationError(
                "connection: access_token is missing".to_string(),
            ))?;

        let name = self
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| base_url.clone());

        let created_at = self.created_at.unwrap_or_else(Utc::now);
        let key_tag = KeyTag::from_connection(&id);

        Ok(Connection {
            id,
            base_url,
            access_token,
            name,
            status: self.status.unwrap_or(Status::Active),
            key_tag,
            created_at,
            updated_at: created_at,
        })
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|e| BaseError::ToJSONError(e.to_string()))
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|e| ConnectionError::EntityError(e.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|e| ConnectionError::EntityError(e.to_string()))
    }
}
