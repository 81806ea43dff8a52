//! Password-based AES-256-CBC encryption for credentials at rest.
//!
//! The key is derived with PBKDF2-HMAC-SHA256 (1024 iterations) from a
//! password and a hex-encoded salt. Ciphertext is laid out as `IV || data`.
//! Every call builds its own cipher context, so one encryptor can be shared
//! freely between threads.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use super::keygen::{self, BytesKeyGenerator};
use super::{CryptoError, SecretKey};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const PBKDF2_ITERATIONS: u32 = 1024;
pub const KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;

/// Encrypts and decrypts raw bytes.
pub trait BytesEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Encrypts and decrypts text.
pub trait TextEncryptor: Send + Sync {
    fn encrypt(&self, text: &str) -> Result<String, CryptoError>;

    fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError>;
}

/// Derives the AES key from `password` and the hex-encoded `hex_salt`.
pub fn derive_key(password: &str, hex_salt: &str) -> Result<SecretKey, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::InvalidPassword);
    }
    let salt = hex::decode(hex_salt).map_err(|e| CryptoError::InvalidSalt {
        reason: e.to_string(),
    })?;
    if salt.is_empty() {
        return Err(CryptoError::InvalidSalt {
            reason: "salt is empty".to_string(),
        });
    }

    let mut key = vec![0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);
    SecretKey::new(key)
}

/// AES-256-CBC with PKCS#7 padding and a per-call IV.
pub struct AesBytesEncryptor {
    key: SecretKey,
    iv_generator: Box<dyn BytesKeyGenerator>,
}

impl AesBytesEncryptor {
    pub fn new(
        password: &str,
        hex_salt: &str,
        iv_generator: Box<dyn BytesKeyGenerator>,
    ) -> Result<Self, CryptoError> {
        Self::with_key(derive_key(password, hex_salt)?, iv_generator)
    }

    pub fn with_key(
        key: SecretKey,
        iv_generator: Box<dyn BytesKeyGenerator>,
    ) -> Result<Self, CryptoError> {
        if iv_generator.key_length() != IV_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: "16 byte initialization vector",
                actual: iv_generator.key_length(),
            });
        }
        Ok(Self { key, iv_generator })
    }
}

impl BytesEncryptor for AesBytesEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv = self.iv_generator.generate_key();
        let cipher = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: "32 byte key and 16 byte initialization vector",
                actual: iv.len(),
            })?;
        let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut result = Vec::with_capacity(IV_LENGTH + encrypted.len());
        result.extend_from_slice(&iv);
        result.extend_from_slice(&encrypted);
        Ok(result)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < IV_LENGTH {
            return Err(CryptoError::InvalidCiphertext);
        }
        let (iv, data) = ciphertext.split_at(IV_LENGTH);

        let cipher = Aes256CbcDec::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|_| CryptoError::InvalidCiphertext)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for AesBytesEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesBytesEncryptor")
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Hex-encodes the ciphertext produced by a [`BytesEncryptor`].
#[derive(Clone)]
pub struct HexEncodingTextEncryptor {
    inner: Arc<dyn BytesEncryptor>,
}

impl HexEncodingTextEncryptor {
    pub fn new(inner: Arc<dyn BytesEncryptor>) -> Self {
        Self { inner }
    }
}

impl TextEncryptor for HexEncodingTextEncryptor {
    fn encrypt(&self, text: &str) -> Result<String, CryptoError> {
        self.inner.encrypt(text.as_bytes()).map(hex::encode)
    }

    fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(encrypted).map_err(|e| CryptoError::InvalidEncoding {
            reason: e.to_string(),
        })?;
        let decrypted = self.inner.decrypt(&bytes)?;
        String::from_utf8(decrypted).map_err(|e| CryptoError::InvalidEncoding {
            reason: e.to_string(),
        })
    }
}

/// Passes text through untouched. Offers no protection at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTextEncryptor;

impl TextEncryptor for NoOpTextEncryptor {
    fn encrypt(&self, text: &str) -> Result<String, CryptoError> {
        Ok(text.to_string())
    }

    fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        Ok(encrypted.to_string())
    }
}

/// Bytes encryptor with a fresh random IV per call.
pub fn standard(password: &str, hex_salt: &str) -> Result<AesBytesEncryptor, CryptoError> {
    AesBytesEncryptor::new(
        password,
        hex_salt,
        Box::new(keygen::secure_random_with_length(IV_LENGTH)?),
    )
}

/// Text encryptor over [`standard`]; output is hex.
pub fn text(password: &str, hex_salt: &str) -> Result<HexEncodingTextEncryptor, CryptoError> {
    Ok(HexEncodingTextEncryptor::new(Arc::new(standard(
        password, hex_salt,
    )?)))
}

/// Text encryptor with a fixed IV: equal plaintexts give equal ciphertexts.
///
/// This makes encrypted columns searchable by equality and also reveals which
/// rows share a value. Do not use it for secrets.
pub fn queryable_text(
    password: &str,
    hex_salt: &str,
) -> Result<HexEncodingTextEncryptor, CryptoError> {
    let encryptor = AesBytesEncryptor::new(password, hex_salt, Box::new(keygen::shared(IV_LENGTH)?))?;
    Ok(HexEncodingTextEncryptor::new(Arc::new(encryptor)))
}

/// Identity encryptor for local development.
pub fn no_op_text() -> NoOpTextEncryptor {
    tracing::warn!("Using no-op text encryptor; credentials will be stored in plaintext");
    NoOpTextEncryptor
}
