mod database;
pub use database::Database;

mod app;
pub use app::App;

mod keystore;
pub use keystore::KeyStore;

mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;
