use crate::connection::types::ConnectionID;
use crate::keystore::types::{KeyTag, Signature};

pub const HEADER_ACCESS_TOKEN: &str = "Access-Token";
pub const HEADER_SIGNATURE: &str = "Signature";
pub const HEADER_ACCEPT_LANGUAGE: &str = "Accept-Language";

/// `SignedPayload` is a signature plus the context it was produced in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    connection_id: ConnectionID,
    key_tag: KeyTag,
    signing_string: String,
    signature: Signature,
}

impl SignedPayload {
    pub fn new(connection_id: ConnectionID, signing_string: String, signature: Signature) -> Self {
        let key_tag = KeyTag::from_connection(&connection_id);
        Self {
            connection_id,
            key_tag,
            signing_string,
            signature,
        }
    }

    pub fn connection_id(&self) -> &ConnectionID {
        &self.connection_id
    }

    pub fn key_tag(&self) -> &KeyTag {
        &self.key_tag
    }

    pub fn signing_string(&self) -> &str {
        &self.signing_string
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}
