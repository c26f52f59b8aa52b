//! Wristband Cryptographic Operations
//!
//! This crate provides the cryptography behind the wristband tag protocol:
//! - Zeroizing key types that automatically clear memory
//! - AES-128 block and zero-IV CBC primitives over [`BitVector`]
//! - CMAC-AES-128 with constant-time verification of truncated MACs
//! - The three-pass mutual authentication and session MAC key derivation
//!
//! # Security Features
//!
//! - **Zeroization**: key material uses `zeroize` to clear memory on drop
//! - **Constant-time comparison**: MAC and challenge checks use `subtle::ConstantTimeEq`
//! - **Redaction**: key types never print their bytes
//!
//! # Example
//!
//! ```
//! use wristband_crypto::{cmac, AesKey};
//! use wristband_protocol::BitVector;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = AesKey::from_hex("2b7e151628aed2a6abf7158809cf4f3c")?;
//! let message = BitVector::from_bytes(&hex_literal());
//! let mac = cmac(&key, &message)?;
//! assert_eq!(mac.to_hex(), "070a16b46b4d4144f79bdd9dd04a287c");
//! # Ok(())
//! # }
//! # fn hex_literal() -> Vec<u8> {
//! #     vec![0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96,
//! #          0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a]
//! # }
//! # example().unwrap();
//! ```
//!
//! [`BitVector`]: wristband_protocol::BitVector

pub mod auth;
pub mod block;
pub mod cmac;
pub mod helpers;
pub mod types;

// Re-export commonly used types
pub use auth::{rotate_challenge, session_mac_key, AuthError, Handshake};
pub use block::{
    cbc_decrypt, cbc_encrypt, decrypt_block, encrypt_block, split_blocks, CryptoError, BLOCK_BITS,
};
pub use cmac::{cmac, subkeys, truncated_mac, verify_truncated, CmacError, Subkeys};
pub use helpers::{create_aes_cipher, generate_challenge};
pub use types::{AesKey, KeyError, KeyMaterial, KEY_LEN};
