//! CMAC-AES-128 with constant-time verification
//!
//! NIST SP 800-38B over [`BitVector`] messages:
//! 1. `L = AES(K, 0^128)`
//! 2. `K1 = L << 1`, XOR `0x87` into the last byte if `msb(L)`
//! 3. `K2 = K1 << 1`, XOR `0x87` into the last byte if `msb(K1)`
//! 4. A complete last block is XORed with `K1`; otherwise the message is
//!    padded with `10..0` and the last block XORed with `K2`
//! 5. CBC-MAC with a zero IV; the final block is the tag
//!
//! The tag protocol transmits only the last [`MAC_LEN`] bytes.

use subtle::ConstantTimeEq;
use thiserror::Error;
use wristband_protocol::{BitError, BitVector, MAC_LEN};

use crate::block::{encrypt_block, split_blocks, CryptoError, BLOCK_BITS};
use crate::types::AesKey;

const RB: u8 = 0x87;

#[derive(Debug, Error)]
pub enum CmacError {
    #[error("CMAC input must not be empty")]
    EmptyMessage,

    #[error("CMAC verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Bits(#[from] BitError),
}

/// CMAC subkeys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subkeys {
    pub k1: BitVector,
    pub k2: BitVector,
}

fn double(block: &BitVector) -> Result<BitVector, CmacError> {
    let mut out = block.shl(1);
    if block.msb() == Some(true) {
        let last = out.gle(0)?;
        out.sle(0, last ^ RB)?;
    }
    Ok(out)
}

/// Derive `K1` and `K2` from the key
pub fn subkeys(key: &AesKey) -> Result<Subkeys, CmacError> {
    let l = encrypt_block(key, &BitVector::new(BLOCK_BITS))?;
    let k1 = double(&l)?;
    let k2 = double(&k1)?;
    Ok(Subkeys { k1, k2 })
}

/// Full 128-bit CMAC over a non-empty message
pub fn cmac(key: &AesKey, message: &BitVector) -> Result<BitVector, CmacError> {
    if message.is_empty() {
        return Err(CmacError::EmptyMessage);
    }
    let Subkeys { k1, k2 } = subkeys(key)?;

    let rem = message.len() % BLOCK_BITS;
    let (padded, last_key) = if rem == 0 {
        (message.clone(), k1)
    } else {
        let width = BLOCK_BITS - rem;
        let mut pad = BitVector::new(width);
        pad.set(width - 1, true)?;
        (message.cat(&pad), k2)
    };

    let mut blocks = split_blocks(&padded)?;
    if let Some(last) = blocks.pop() {
        blocks.push(last.xor(&last_key)?);
    }

    let mut chain = BitVector::new(BLOCK_BITS);
    for block in blocks {
        chain = encrypt_block(key, &block.xor(&chain)?)?;
    }
    Ok(chain)
}

/// The last [`MAC_LEN`] bytes of the CMAC, as sent over the air
pub fn truncated_mac(key: &AesKey, message: &BitVector) -> Result<[u8; MAC_LEN], CmacError> {
    let full = cmac(key, message)?.to_bytes();
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&full[full.len() - MAC_LEN..]);
    Ok(out)
}

/// Verify a truncated MAC using constant-time comparison
pub fn verify_truncated(key: &AesKey, message: &BitVector, mac: &[u8]) -> Result<(), CmacError> {
    let expected = truncated_mac(key, message)?;
    if expected[..].ct_eq(mac).into() {
        Ok(())
    } else {
        Err(CmacError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST SP 800-38B, Appendix D.1 (AES-128)
    const NIST_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const NIST_MSG: &str = "6bc1bee22e409f96e93d7e117393172a\
                            ae2d8a571e03ac9c9eb76fac45af8e51\
                            30c81c46a35ce411e5fbc1191a0a52ef\
                            f69f2445df4f9b17ad2b417be66c3710";

    fn nist_key() -> AesKey {
        AesKey::from_hex(NIST_KEY).unwrap()
    }

    fn nist_prefix(bytes: usize) -> BitVector {
        BitVector::from_bytes(&hex::decode(NIST_MSG).unwrap()[..bytes])
    }

    #[test]
    fn test_nist_subkeys() {
        let keys = subkeys(&nist_key()).unwrap();
        assert_eq!(keys.k1.to_hex(), "fbeed618357133667c85e08f7236a8de");
        assert_eq!(keys.k2.to_hex(), "f7ddac306ae266ccf90bc11ee46d513b");
    }

    #[test]
    fn test_nist_single_block() {
        let mac = cmac(&nist_key(), &nist_prefix(16)).unwrap();
        assert_eq!(mac.to_hex(), "070a16b46b4d4144f79bdd9dd04a287c");
    }

    #[test]
    fn test_nist_partial_block() {
        let mac = cmac(&nist_key(), &nist_prefix(40)).unwrap();
        assert_eq!(mac.to_hex(), "dfa66747de9ae63030ca32611497c827");
    }

    #[test]
    fn test_nist_four_blocks() {
        let mac = cmac(&nist_key(), &nist_prefix(64)).unwrap();
        assert_eq!(mac.to_hex(), "51f0bebf7e3b9d92fc49741779363cfe");
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(matches!(
            cmac(&nist_key(), &BitVector::new(0)),
            Err(CmacError::EmptyMessage)
        ));
    }

    #[test]
    fn test_truncated_mac_is_suffix() {
        let full = cmac(&nist_key(), &nist_prefix(16)).unwrap().to_hex();
        let short = truncated_mac(&nist_key(), &nist_prefix(16)).unwrap();
        assert_eq!(hex::encode(short), &full[16..]);
    }

    #[test]
    fn test_verify_detects_flipped_bit() {
        let message = nist_prefix(40);
        let mut mac = truncated_mac(&nist_key(), &message).unwrap();
        assert!(verify_truncated(&nist_key(), &message, &mac).is_ok());

        mac[7] ^= 0x01;
        assert!(matches!(
            verify_truncated(&nist_key(), &message, &mac),
            Err(CmacError::VerificationFailed)
        ));
        assert!(verify_truncated(&nist_key(), &message, &mac[..4]).is_err());
    }
}
