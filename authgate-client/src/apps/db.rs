use rst_common::with_logging::log::debug;

use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::engine::rocksdb::executor::Executor;
use rstdev_storage::engine::rocksdb::options::Options;
use rstdev_storage::engine::rocksdb::types::{Instruction, OutputOpts};

use crate::common::types::CommonError;
use crate::config::Database;

/// setup_database opens the RocksDB instance described by the storage config
pub fn setup_database(database: &Database) -> Result<Executor, CommonError> {
    let (path, cf_name) = (database.path(), database.cf_name());
    debug!("[db:setup] path: {path} | cf name: {cf_name}");

    let opts = database.clone();
    let mut db_opts = Options::new(path, cf_name.clone());
    db_opts.build_default_opts().set_db_opts(move |opt| {
        opt.create_if_missing(opts.create_if_missing());
        opt.create_missing_column_families(opts.create_missing_columns());
        opt.set_error_if_exists(opts.error_if_exists());
        opt.set_wal_dir(opts.wal_dir());

        opt
    });

    let mut db = DB::new(db_opts).map_err(|err| CommonError::DBError(err.to_string()))?;
    let db_instance = db
        .build()
        .map_err(|err| CommonError::DBError(err.to_string()))?;

    db.set_db(db_instance);
    Ok(Executor::new(db, cf_name))
}

pub async fn save(db: &Executor, key: String, value: Vec<u8>) -> Result<(), String> {
    db.exec(Instruction::SaveCf { key, value })
        .await
        .map(|_| ())
        .map_err(|err| err.to_string())
}

pub async fn get(db: &Executor, key: String) -> Result<Option<Vec<u8>>, String> {
    let out = db
        .exec(Instruction::GetCf { key })
        .await
        .map_err(|err| err.to_string())?;

    match out {
        OutputOpts::SingleByte { value } => Ok(value),
        _ => Err(String::from("invalid output return type")),
    }
}

pub async fn remove(db: &Executor, key: String) -> Result<(), String> {
    db.exec(Instruction::RemoveCf { key })
        .await
        .map(|_| ())
        .map_err(|err| err.to_string())
}
