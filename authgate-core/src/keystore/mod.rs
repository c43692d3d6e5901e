//! `keystore` provides custody of the per-connection key pairs
//!
//! Private key material never leaves this module. Consumers only receive
//! signatures, decrypted bytes and public keys.
pub mod types;

mod keypair;
pub use keypair::{encrypt_for, verify, KeyPair, ALGORITHM};

mod sealing;
pub use sealing::SealingKey;

mod memory;
pub use memory::MemoryKeyStore;
