//! `connection` holds the paired connections known to this authenticator
//!
//! A [`Connection`] is a trust relationship with one remote service. It owns exactly
//! one key pair in the key store, referenced through its [`crate::keystore::types::KeyTag`].
pub mod types;

mod connection;
pub use connection::{Connection, ConnectionBuilder};

mod registry;
pub use registry::ConnectionRegistry;
