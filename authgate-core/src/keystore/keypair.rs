use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use k256::ecdh::{self, EphemeralSecret};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::types::{Ciphertext, KeyStoreError, KeyTag, PublicKeyInfo, Signature};

/// Algorithm label carried by every encrypted authorization envelope
pub const ALGORITHM: &str = "ECIES-K256-CHACHA20POLY1305";

pub(crate) const NONCE_LEN: usize = 12;
const HKDF_INFO: &[u8] = b"authgate/authorization/v1";

/// `KeyPair` is a secp256k1 identity owned by a single connection
///
/// The same key both signs outbound requests (deterministic ECDSA) and opens
/// the ECIES envelopes the server encrypts for this connection.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyStoreError> {
        SecretKey::from_slice(bytes)
            .map(|secret| Self { secret })
            .map_err(|_| KeyStoreError::StorageError("invalid key material".to_string()))
    }

    pub(crate) fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    pub fn public_key(&self, tag: KeyTag) -> PublicKeyInfo {
        let encoded = self.secret.public_key().to_sec1_bytes().to_vec();
        PublicKeyInfo::new(tag, encoded)
    }

    pub fn sign(&self, message: &[u8]) -> Result<Signature, KeyStoreError> {
        let signing_key = SigningKey::from(&self.secret);
        let signature: EcdsaSignature = signing_key
            .try_sign(message)
            .map_err(|err| KeyStoreError::SignatureError(err.to_string()))?;

        Ok(Signature::new(signature.to_bytes().to_vec()))
    }

    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>, KeyStoreError> {
        if ciphertext.nonce().len() != NONCE_LEN {
            return Err(KeyStoreError::DecryptionError(
                "invalid nonce length".to_string(),
            ));
        }

        let ephemeral = PublicKey::from_sec1_bytes(ciphertext.ephemeral_key())
            .map_err(|_| KeyStoreError::DecryptionError("invalid ephemeral key".to_string()))?;

        let shared = ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), ephemeral.as_affine());
        let key = derive_key(shared.raw_secret_bytes().as_slice(), ciphertext.ephemeral_key())?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
        cipher
            .decrypt(Nonce::from_slice(ciphertext.nonce()), ciphertext.data())
            .map_err(|_| {
                KeyStoreError::DecryptionError("ciphertext does not match this key".to_string())
            })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyPair { .. }")
    }
}

/// encrypt_for produces an envelope that only the owner of `public_key` can open
///
/// This is the server side of the exchange. The engine itself never encrypts
/// authorizations, but pairing tools and tests need to produce them.
pub fn encrypt_for(public_key: &[u8], plaintext: &[u8]) -> Result<Ciphertext, KeyStoreError> {
    let recipient = PublicKey::from_sec1_bytes(public_key)
        .map_err(|_| KeyStoreError::EncryptionError("invalid recipient key".to_string()))?;

    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_key = ephemeral.public_key().to_sec1_bytes().to_vec();
    let shared = ephemeral.diffie_hellman(&recipient);
    let key = derive_key(shared.raw_secret_bytes().as_slice(), &ephemeral_key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let data = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|err| KeyStoreError::EncryptionError(err.to_string()))?;

    Ok(Ciphertext::new(ephemeral_key, nonce.to_vec(), data))
}

/// verify checks a signature produced by [`KeyPair::sign`]
pub fn verify(
    public_key: &[u8],
    message: &[u8],
    signature: &Signature,
) -> Result<(), KeyStoreError> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|err| KeyStoreError::SignatureError(err.to_string()))?;

    let parsed = EcdsaSignature::from_slice(signature.as_bytes())
        .map_err(|err| KeyStoreError::SignatureError(err.to_string()))?;

    verifying_key
        .verify(message, &parsed)
        .map_err(|err| KeyStoreError::SignatureError(err.to_string()))
}

fn derive_key(shared: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, KeyStoreError> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), shared);
    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf.expand(HKDF_INFO, okm.as_mut_slice())
        .map_err(|err| KeyStoreError::DecryptionError(err.to_string()))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag() -> KeyTag {
        KeyTag::from_connection(&"c0ffee00-0000-4000-8000-000000000001".to_string().into())
    }

    #[test]
    fn test_sign_is_deterministic_and_verifiable() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key(tag());

        let first = keypair.sign(b"GEThttps://example.com/api").unwrap();
        let second = keypair.sign(b"GEThttps://example.com/api").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_bytes().len(), 64);

        let verified = verify(public_key.as_bytes(), b"GEThttps://example.com/api", &first);
        assert!(verified.is_ok());

        let tampered = verify(public_key.as_bytes(), b"PUThttps://example.com/api", &first);
        assert!(matches!(tampered, Err(KeyStoreError::SignatureError(_))));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key(tag());

        let ciphertext = encrypt_for(public_key.as_bytes(), b"{\"title\":\"payment\"}").unwrap();
        let plaintext = keypair.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, b"{\"title\":\"payment\"}".to_vec());
    }

    #[test]
    fn test_decrypt_with_another_key_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let ciphertext = encrypt_for(alice.public_key(tag()).as_bytes(), b"secret").unwrap();
        let result = bob.decrypt(&ciphertext);
        assert!(matches!(result, Err(KeyStoreError::DecryptionError(_))));
    }

    #[test]
    fn test_decrypt_malformed_input() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key(tag());
        let valid = encrypt_for(public_key.as_bytes(), b"secret").unwrap();

        let short_nonce = Ciphertext::new(
            valid.ephemeral_key().to_vec(),
            vec![0u8; 4],
            valid.data().to_vec(),
        );
        assert!(matches!(
            keypair.decrypt(&short_nonce),
            Err(KeyStoreError::DecryptionError(_))
        ));

        let bad_point = Ciphertext::new(vec![9u8; 10], valid.nonce().to_vec(), valid.data().to_vec());
        assert!(matches!(
            keypair.decrypt(&bad_point),
            Err(KeyStoreError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_restore_from_bytes() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_bytes(keypair.to_bytes().as_slice()).unwrap();
        assert_eq!(keypair.public_key(tag()), restored.public_key(tag()));

        let invalid = KeyPair::from_bytes(&[0u8; 3]);
        assert!(matches!(invalid, Err(KeyStoreError::StorageError(_))));
    }
}
