use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{App, Database, KeyStore};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Config {
    #[serde(default)]
    pub(super) app: App,
    pub(super) keystore: KeyStore,
    pub(super) database: Database,
}

impl Config {
    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    pub fn db(&self) -> &Database {
        &self.database
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.app.validate()?;
        self.keystore.validate()?;
        self.database.validate()?;

        Ok(())
    }
}
