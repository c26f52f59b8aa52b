//! Cryptographic helper functions
//!
//! Cipher initialization and random challenge generation.

use aes::cipher::KeyInit;
use aes::Aes128;
use rand::RngCore;
use wristband_protocol::BLOCK_LEN;

use crate::types::AesKey;

/// Create an AES-128 block cipher from a key
pub fn create_aes_cipher(key: &AesKey) -> Aes128 {
    Aes128::new(key.as_bytes().into())
}

/// Draw a random 128-bit challenge
pub fn generate_challenge<R: RngCore + ?Sized>(rng: &mut R) -> [u8; BLOCK_LEN] {
    let mut challenge = [0u8; BLOCK_LEN];
    rng.fill_bytes(&mut challenge);
    challenge
}
