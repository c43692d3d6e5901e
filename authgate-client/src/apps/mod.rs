pub mod db;

mod keystore;
pub use keystore::RocksKeyStore;

mod connection;
pub use connection::ConnectionRepository;
