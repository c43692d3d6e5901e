//! `signature` turns request parts into a canonical string, signs it and
//! opens encrypted payloads on behalf of a connection
pub mod types;

mod service;
pub use service::SignatureService;
