//! AES-128 block primitives over bit vectors
//!
//! Single-block encrypt/decrypt plus zero-IV CBC for multi-block messages.
//! Blocks are taken from the most significant end of a vector, so the first
//! byte on the wire is the first byte of the first block.

use aes::cipher::{BlockDecrypt, BlockEncrypt};
use thiserror::Error;
use wristband_protocol::{BitError, BitVector, BLOCK_LEN};

use crate::helpers::create_aes_cipher;
use crate::types::AesKey;

/// Bits per AES block
pub const BLOCK_BITS: usize = BLOCK_LEN * 8;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid block length: expected {expected} bits, got {0}", expected = BLOCK_BITS)]
    InvalidBlockLength(usize),

    #[error("CBC input must be a non-empty multiple of {block} bits, got {0}", block = BLOCK_BITS)]
    InvalidCbcLength(usize),

    #[error(transparent)]
    Bits(#[from] BitError),
}

fn block_bytes(block: &BitVector) -> Result<[u8; BLOCK_LEN], CryptoError> {
    if block.len() != BLOCK_BITS {
        return Err(CryptoError::InvalidBlockLength(block.len()));
    }
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&block.to_bytes());
    Ok(out)
}

/// Encrypt one 128-bit block
pub fn encrypt_block(key: &AesKey, block: &BitVector) -> Result<BitVector, CryptoError> {
    let mut buf = block_bytes(block)?;
    create_aes_cipher(key).encrypt_block((&mut buf).into());
    Ok(BitVector::from_bytes(&buf))
}

/// Decrypt one 128-bit block
pub fn decrypt_block(key: &AesKey, block: &BitVector) -> Result<BitVector, CryptoError> {
    let mut buf = block_bytes(block)?;
    create_aes_cipher(key).decrypt_block((&mut buf).into());
    Ok(BitVector::from_bytes(&buf))
}

/// Split a vector into 128-bit blocks, most significant block first
pub fn split_blocks(data: &BitVector) -> Result<Vec<BitVector>, CryptoError> {
    if data.is_empty() || data.len() % BLOCK_BITS != 0 {
        return Err(CryptoError::InvalidCbcLength(data.len()));
    }
    let total = data.len();
    (0..total / BLOCK_BITS)
        .map(|k| {
            data.slice(total - BLOCK_BITS * (k + 1), total - BLOCK_BITS * k)
                .map_err(CryptoError::from)
        })
        .collect()
}

/// AES-128-CBC encryption with a zero IV
pub fn cbc_encrypt(key: &AesKey, data: &BitVector) -> Result<BitVector, CryptoError> {
    let mut chain = BitVector::new(BLOCK_BITS);
    let mut out = BitVector::new(0);
    for block in split_blocks(data)? {
        chain = encrypt_block(key, &block.xor(&chain)?)?;
        out = out.cat(&chain);
    }
    Ok(out)
}

/// AES-128-CBC decryption with a zero IV
pub fn cbc_decrypt(key: &AesKey, data: &BitVector) -> Result<BitVector, CryptoError> {
    let mut chain = BitVector::new(BLOCK_BITS);
    let mut out = BitVector::new(0);
    for block in split_blocks(data)? {
        let plain = decrypt_block(key, &block)?.xor(&chain)?;
        out = out.cat(&plain);
        chain = block;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(text: &str) -> BitVector {
        BitVector::from_bytes(&hex::decode(text).unwrap())
    }

    #[test]
    fn test_fips197_vector() {
        // FIPS-197 Appendix C.1
        let key = AesKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let plain = bits("00112233445566778899aabbccddeeff");
        let cipher = encrypt_block(&key, &plain).unwrap();
        assert_eq!(cipher.to_hex(), "69c4e0d86a7b0430d8cdb78070b4c55a");
        assert_eq!(decrypt_block(&key, &cipher).unwrap(), plain);
    }

    #[test]
    fn test_block_length_enforced() {
        let key = AesKey::zero();
        assert!(matches!(
            encrypt_block(&key, &BitVector::new(64)),
            Err(CryptoError::InvalidBlockLength(64))
        ));
    }

    #[test]
    fn test_split_blocks_order() {
        let data = bits("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let blocks = split_blocks(&data).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].to_hex(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(blocks[1].to_hex(), "101112131415161718191a1b1c1d1e1f");
        assert!(split_blocks(&BitVector::new(0)).is_err());
        assert!(split_blocks(&BitVector::new(136)).is_err());
    }

    #[test]
    fn test_cbc_first_block_matches_ecb() {
        let key = AesKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let data = bits("00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff");
        let encrypted = cbc_encrypt(&key, &data).unwrap();
        assert_eq!(encrypted.len(), 256);
        assert_eq!(
            encrypted.slice(128, 256).unwrap().to_hex(),
            "69c4e0d86a7b0430d8cdb78070b4c55a"
        );
        // Chaining makes the identical second block encrypt differently.
        assert_ne!(encrypted.slice(0, 128).unwrap(), encrypted.slice(128, 256).unwrap());
        assert_eq!(cbc_decrypt(&key, &encrypted).unwrap(), data);
    }
}
