//! `request` assembles signed outbound requests without performing any I/O
pub mod types;

mod builder;
pub use builder::{RequestBuilder, AUTHORIZATIONS_PATH, CONNECTIONS_PATH, DEFAULT_LANGUAGE};
