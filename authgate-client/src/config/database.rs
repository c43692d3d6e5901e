use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

/// `Database` locates the RocksDB instance shared by the key store and the
/// connection repository
///
/// The open flags are optional and default to opening or creating the database.
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Database {
    pub(super) path: String,
    pub(super) cf_name: String,
    pub(super) wal_dir: String,

    #[serde(default = "enabled")]
    pub(super) create_if_missing: bool,

    #[serde(default = "enabled")]
    pub(super) create_missing_columns: bool,

    #[serde(default)]
    pub(super) error_if_exists: bool,
}

fn enabled() -> bool {
    true
}

impl Database {
    pub fn path(&self) -> String {
        self.path.to_owned()
    }

    pub fn cf_name(&self) -> String {
        self.cf_name.to_owned()
    }

    pub fn wal_dir(&self) -> String {
        self.wal_dir.to_owned()
    }

    pub fn create_if_missing(&self) -> bool {
        self.create_if_missing
    }

    pub fn create_missing_columns(&self) -> bool {
        self.create_missing_columns
    }

    pub fn error_if_exists(&self) -> bool {
        self.error_if_exists
    }
}

impl ToValidate for Database {
    fn validate(&self) -> Result<(), CommonError> {
        let required = [
            ("path", &self.path),
            ("cf_name", &self.cf_name),
            ("wal_dir", &self.wal_dir),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(CommonError::ValidationError(format!(
                "config: database:{} is missing",
                field
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    use rstdev_config::format::use_toml;
    use rstdev_config::parser::from_file;
    use rstdev_config::{types::ConfigError, Builder};

    use crate::common::helpers;

    fn database(path: &str, cf_name: &str, wal_dir: &str) -> Database {
        Database {
            path: path.to_string(),
            cf_name: cf_name.to_string(),
            wal_dir: wal_dir.to_string(),
            create_if_missing: true,
            create_missing_columns: true,
            error_if_exists: false,
        }
    }

    #[test]
    fn test_parse_defaults_open_flags() -> Result<(), ConfigError> {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        let toml_file = format!("{}/config_db.toml", path.display());
        let config_db: Database = Builder::new(from_file(toml_file)).fetch()?.parse(use_toml)?;

        assert_eq!(config_db.path(), "./authgate-storage");
        assert_eq!(config_db.cf_name(), "authgate-cf");
        assert_eq!(config_db.wal_dir(), "./authgate-wal");
        assert!(config_db.create_if_missing());
        assert!(config_db.create_missing_columns());
        assert!(!config_db.error_if_exists());
        Ok(())
    }

    #[test]
    fn test_validation_names_missing_field() {
        let table = [
            (database("", "authgate-cf", "./wal"), "database:path"),
            (database("./db", " ", "./wal"), "database:cf_name"),
            (database("./db", "authgate-cf", ""), "database:wal_dir"),
        ];

        for (config, field) in table {
            let validation = helpers::validate(config);
            assert!(validation.unwrap_err().to_string().contains(field));
        }

        assert!(helpers::validate(database("./db", "authgate-cf", "./wal")).is_ok())
    }
}
