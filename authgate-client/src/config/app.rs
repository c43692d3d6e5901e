use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use authgate_core::request::DEFAULT_LANGUAGE;

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
#[serde(default)]
pub struct App {
    pub(super) language: String,
    pub(super) poll_interval_secs: u64,
    pub(super) request_timeout_secs: u64,
}

impl App {
    pub fn language(&self) -> String {
        self.language.to_owned()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for App {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            poll_interval_secs: 2,
            request_timeout_secs: 10,
        }
    }
}

impl ToValidate for App {
    fn validate(&self) -> Result<(), CommonError> {
        if self.language.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: app:language is missing".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(CommonError::ValidationError(
                "config: app:poll_interval_secs must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CommonError::ValidationError(
                "config: app:request_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
