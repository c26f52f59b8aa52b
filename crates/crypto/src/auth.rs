//! Mutual authentication handshake
//!
//! ```text
//! reader                                      tag
//!   1A kt                         ───────▶
//!                                 ◀───────    AF || E(K, RndB)
//!   AF || E(K, RndA || RndB')     ───────▶
//!                                 ◀───────    00 || E(K, RndA')
//! ```
//!
//! `X'` is `X` rotated left by one byte. Every message is AES-128-CBC under a
//! zero IV. A completed handshake yields the session MAC key
//! `CMAC(K, SV)` used for secure messaging, so MACs from one session are
//! worthless in the next.

use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use wristband_protocol::{BitError, BitVector, BLOCK_LEN};

use crate::block::{cbc_decrypt, cbc_encrypt, CryptoError, BLOCK_BITS};
use crate::cmac::{cmac, CmacError};
use crate::helpers::generate_challenge;
use crate::types::{AesKey, KeyError};

const SV_PREFIX: [u8; 6] = [0x5A, 0xA5, 0x00, 0x01, 0x00, 0x80];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unexpected handshake message length: expected {expected} bytes, got {got}")]
    UnexpectedLength { expected: usize, got: usize },

    #[error("handshake confirmed before the tag challenge was answered")]
    OutOfOrder,

    #[error("tag answered with a wrong challenge")]
    ChallengeMismatch,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Cmac(#[from] CmacError),

    #[error(transparent)]
    Bits(#[from] BitError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Rotate a challenge left by one byte
pub fn rotate_challenge(rnd: &BitVector) -> BitVector {
    rnd.rotl(8)
}

fn single_block(bytes: &[u8]) -> Result<BitVector, AuthError> {
    if bytes.len() != BLOCK_LEN {
        return Err(AuthError::UnexpectedLength {
            expected: BLOCK_LEN,
            got: bytes.len(),
        });
    }
    Ok(BitVector::from_bytes(bytes))
}

// Big-endian byte range [from, to) of a vector.
fn byte_range(v: &BitVector, from: usize, to: usize) -> Result<BitVector, BitError> {
    v.slice(v.len() - to * 8, v.len() - from * 8)
}

/// Derive the session MAC key from both challenges
///
/// `SV = 5A A5 00 01 00 80 || RndA[0..2] || (RndA[2..8] ^ RndB[0..6]) || RndB[6..16] || RndA[8..16]`
pub fn session_mac_key(
    key: &AesKey,
    rnd_a: &BitVector,
    rnd_b: &BitVector,
) -> Result<AesKey, AuthError> {
    for rnd in [rnd_a, rnd_b] {
        if rnd.len() != BLOCK_BITS {
            return Err(CryptoError::InvalidBlockLength(rnd.len()).into());
        }
    }
    let sv = BitVector::from_bytes(&SV_PREFIX)
        .cat(&byte_range(rnd_a, 0, 2)?)
        .cat(&byte_range(rnd_a, 2, 8)?.xor(&byte_range(rnd_b, 0, 6)?)?)
        .cat(&byte_range(rnd_b, 6, 16)?)
        .cat(&byte_range(rnd_a, 8, 16)?);
    let mac = cmac(key, &sv)?;
    Ok(AesKey::from_slice(&mac.to_bytes())?)
}

/// Reader side of one authentication attempt
pub struct Handshake {
    key: AesKey,
    rnd_a: BitVector,
    rnd_b: Option<BitVector>,
}

impl Handshake {
    /// Start a handshake with a fresh random `RndA`
    pub fn new<R: RngCore + ?Sized>(key: &AesKey, rng: &mut R) -> Self {
        Self::with_challenge(key, generate_challenge(rng))
    }

    pub fn with_challenge(key: &AesKey, rnd_a: [u8; BLOCK_LEN]) -> Self {
        Self {
            key: key.clone(),
            rnd_a: BitVector::from_bytes(&rnd_a),
            rnd_b: None,
        }
    }

    /// Answer `E(K, RndB)` with `E(K, RndA || RndB')`
    pub fn respond(&mut self, encrypted_rnd_b: &[u8]) -> Result<[u8; 2 * BLOCK_LEN], AuthError> {
        let rnd_b = cbc_decrypt(&self.key, &single_block(encrypted_rnd_b)?)?;
        let token = cbc_encrypt(&self.key, &self.rnd_a.cat(&rotate_challenge(&rnd_b)))?;
        self.rnd_b = Some(rnd_b);

        let mut out = [0u8; 2 * BLOCK_LEN];
        out.copy_from_slice(&token.to_bytes());
        Ok(out)
    }

    /// Check `E(K, RndA')` and derive the session MAC key
    pub fn confirm(self, encrypted_rnd_a: &[u8]) -> Result<AesKey, AuthError> {
        let rnd_b = self.rnd_b.as_ref().ok_or(AuthError::OutOfOrder)?;
        let answer = cbc_decrypt(&self.key, &single_block(encrypted_rnd_a)?)?.to_bytes();
        let expected = rotate_challenge(&self.rnd_a).to_bytes();
        if !bool::from(answer[..].ct_eq(&expected[..])) {
            return Err(AuthError::ChallengeMismatch);
        }
        session_mac_key(&self.key, &self.rnd_a, rnd_b)
    }
}
