use std::fmt;

use rst_common::standard::serde::{self, Deserialize};

use authgate_core::keystore::SealingKey;

use crate::common::types::{CommonError, ToValidate};

/// KeyStore holds the master key used to seal connection key pairs at rest
#[derive(Deserialize, Clone)]
#[serde(crate = "self::serde")]
pub struct KeyStore {
    pub(super) master_key: String,
}

impl KeyStore {
    pub fn sealing_key(&self) -> Result<SealingKey, CommonError> {
        SealingKey::from_hex(self.master_key.trim())
            .map_err(|err| CommonError::KeyStoreError(err.to_string()))
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("master_key", &"<redacted>")
            .finish()
    }
}

impl ToValidate for KeyStore {
    fn validate(&self) -> Result<(), CommonError> {
        if self.master_key.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: keystore:master_key is missing".to_string(),
            ));
        }

        self.sealing_key().map(|_| ()).map_err(|_| {
            CommonError::ValidationError(
                "config: keystore:master_key must be 32 bytes hex".to_string(),
            )
        })
    }
}
