//! Key generators for salts and initialization vectors.

use rand::RngCore;
use rand::rngs::OsRng;

use super::CryptoError;

/// Default length in bytes of generated keys.
pub const DEFAULT_KEY_LENGTH: usize = 8;

/// Produces byte keys of a fixed length.
pub trait BytesKeyGenerator: Send + Sync {
    fn key_length(&self) -> usize;

    fn generate_key(&self) -> Vec<u8>;
}

/// Produces string keys.
pub trait StringKeyGenerator: Send + Sync {
    fn generate_key(&self) -> String;
}

/// Fresh bytes from the operating system's CSPRNG on every call.
#[derive(Debug, Clone)]
pub struct SecureRandomBytesKeyGenerator {
    key_length: usize,
}

impl SecureRandomBytesKeyGenerator {
    pub fn new(key_length: usize) -> Result<Self, CryptoError> {
        if key_length == 0 {
            return Err(CryptoError::InvalidKeyLength {
                expected: "at least 1 byte",
                actual: key_length,
            });
        }
        Ok(Self { key_length })
    }
}

impl BytesKeyGenerator for SecureRandomBytesKeyGenerator {
    fn key_length(&self) -> usize {
        self.key_length
    }

    fn generate_key(&self) -> Vec<u8> {
        let mut key = vec![0u8; self.key_length];
        OsRng.fill_bytes(&mut key);
        key
    }
}

/// Generates one random key up front and returns it on every call.
///
/// Used for the fixed IV of queryable encryption.
#[derive(Clone)]
pub struct SharedKeyGenerator {
    key: Vec<u8>,
}

impl SharedKeyGenerator {
    pub fn new(key_length: usize) -> Result<Self, CryptoError> {
        let key = SecureRandomBytesKeyGenerator::new(key_length)?.generate_key();
        Ok(Self { key })
    }
}

impl BytesKeyGenerator for SharedKeyGenerator {
    fn key_length(&self) -> usize {
        self.key.len()
    }

    fn generate_key(&self) -> Vec<u8> {
        self.key.clone()
    }
}

impl std::fmt::Debug for SharedKeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyGenerator")
            .field("key_length", &self.key.len())
            .finish_non_exhaustive()
    }
}

/// Hex-encodes the output of a bytes generator.
pub struct HexEncodingStringKeyGenerator {
    inner: Box<dyn BytesKeyGenerator>,
}

impl HexEncodingStringKeyGenerator {
    pub fn new(inner: Box<dyn BytesKeyGenerator>) -> Self {
        Self { inner }
    }
}

impl StringKeyGenerator for HexEncodingStringKeyGenerator {
    fn generate_key(&self) -> String {
        hex::encode(self.inner.generate_key())
    }
}

/// Secure random generator with the default 8-byte length.
pub fn secure_random() -> SecureRandomBytesKeyGenerator {
    SecureRandomBytesKeyGenerator {
        key_length: DEFAULT_KEY_LENGTH,
    }
}

/// Secure random generator of `key_length` bytes.
pub fn secure_random_with_length(
    key_length: usize,
) -> Result<SecureRandomBytesKeyGenerator, CryptoError> {
    SecureRandomBytesKeyGenerator::new(key_length)
}

/// Generator that returns the same random key of `key_length` bytes forever.
pub fn shared(key_length: usize) -> Result<SharedKeyGenerator, CryptoError> {
    SharedKeyGenerator::new(key_length)
}

/// Hex string keys, 16 characters long (8 random bytes).
pub fn string() -> HexEncodingStringKeyGenerator {
    HexEncodingStringKeyGenerator::new(Box::new(secure_random()))
}
