//! `authgate-core` is the authorization protocol engine behind the AuthGate authenticator
//!
//! It owns one signing/decryption identity per paired connection, builds signed outbound
//! requests, decrypts inbound authorization payloads, polls every active connection and
//! tracks each authorization until it reaches a terminal state.
//!
//! The crate performs no I/O by itself. Storage and network access are injected through
//! the collaborator traits:
//!
//! - [`keystore::types::KeyStoreBuilder`] for key custody
//! - [`connection::types::RepoBuilder`] for durable connection records
//! - [`authorization::types::TransportBuilder`] for HTTP round trips
//! - [`authorization::types::CredentialGate`] for the local user verification step
pub mod authorization;
pub mod connection;
pub mod keystore;
pub mod request;
pub mod signature;
