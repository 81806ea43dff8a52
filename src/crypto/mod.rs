//! Credential encryption
//!
//! Key generators for salts and IVs live in [`keygen`]; password-based
//! AES-256-CBC encryptors in [`encryptor`].

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod encryptor;
pub mod keygen;

pub use encryptor::{
    AesBytesEncryptor, BytesEncryptor, HexEncodingTextEncryptor, NoOpTextEncryptor, TextEncryptor,
};
pub use keygen::{BytesKeyGenerator, StringKeyGenerator};

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid salt: {reason}")]
    InvalidSalt { reason: String },
    #[error("encryption password must not be empty")]
    InvalidPassword,
    #[error("invalid key length: expected {expected}, got {actual} bytes")]
    InvalidKeyLength { expected: &'static str, actual: usize },
    #[error("ciphertext is shorter than its initialization vector")]
    InvalidCiphertext,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid encoding: {reason}")]
    InvalidEncoding { reason: String },
}

/// Symmetric key material, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wraps a 32-byte AES-256 key.
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != encryptor::KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: "32 byte key",
                actual: bytes.len(),
            });
        }
        Ok(SecretKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}
