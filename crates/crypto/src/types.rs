//! Zeroizing cryptographic key types
//!
//! Key material handed over by the collaborator layer lives only in these
//! wrappers. They clear memory on drop, compare in constant time and never
//! print their contents.

use std::fmt;

use subtle::ConstantTimeEq;
use wristband_protocol::BitVector;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of an AES-128 key in bytes
pub const KEY_LEN: usize = 16;

/// AES-128 key (16 bytes) that zeroizes on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AesKey(pub(crate) [u8; KEY_LEN]);

impl AesKey {
    /// Create a key from a 16-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength {
                expected: KEY_LEN,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(AesKey(key))
    }

    /// Parse a key from 32 hex characters
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(text.trim())?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        AesKey(bytes)
    }

    /// The all-zero key tags ship with
    pub fn zero() -> Self {
        AesKey([0u8; KEY_LEN])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Key as a 128-bit vector, first byte most significant
    pub fn to_bits(&self) -> BitVector {
        BitVector::from_bytes(&self.0)
    }
}

impl PartialEq for AesKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for AesKey {}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

/// The two independent keys a provisioned wristband carries
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Controls access to protected pages
    pub data_protection: AesKey,
    /// Controls retrieval of the real UID
    pub uid_retrieval: AesKey,
}

impl KeyMaterial {
    pub fn new(data_protection: AesKey, uid_retrieval: AesKey) -> Self {
        Self {
            data_protection,
            uid_retrieval,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Key-related errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid key encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
