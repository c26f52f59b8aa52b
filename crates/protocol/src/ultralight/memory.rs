//! UID pages and key slot layout

use std::fmt;

use crate::bits::BitVector;
use crate::ultralight::{FrameError, PAGE_SIZE};

const CASCADE_TAG: u8 = 0x88;

/// 7-byte tag serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid(pub [u8; 7]);

impl Uid {
    /// Parse the UID from a READ of page 0, verifying both check bytes
    pub fn from_read(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 9 {
            return Err(FrameError::UnexpectedLength {
                expected: 9,
                got: bytes.len(),
            });
        }
        let uid = [bytes[0], bytes[1], bytes[2], bytes[4], bytes[5], bytes[6], bytes[7]];
        let bcc0 = CASCADE_TAG ^ uid[0] ^ uid[1] ^ uid[2];
        let bcc1 = uid[3] ^ uid[4] ^ uid[5] ^ uid[6];
        if bytes[3] != bcc0 || bytes[8] != bcc1 {
            return Err(FrameError::UidChecksum);
        }
        Ok(Uid(uid))
    }

    pub fn from_u64(value: u64) -> Self {
        let b = value.to_be_bytes();
        Uid([b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    /// Pages 0..2 as the tag stores them
    pub fn to_pages(&self) -> [u8; 3 * PAGE_SIZE] {
        let u = self.0;
        [
            u[0],
            u[1],
            u[2],
            CASCADE_TAG ^ u[0] ^ u[1] ^ u[2],
            u[3],
            u[4],
            u[5],
            u[6],
            u[3] ^ u[4] ^ u[5] ^ u[6],
            0x48,
            0x00,
            0x00,
        ]
    }

    pub fn as_u64(&self) -> u64 {
        let u = self.0;
        u64::from_be_bytes([0, u[0], u[1], u[2], u[3], u[4], u[5], u[6]])
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Split a 128-bit key into the four pages of a key slot
///
/// The tag stores keys least significant byte first.
pub fn key_to_pages(key: &[u8; 16]) -> [[u8; PAGE_SIZE]; 4] {
    let le = BitVector::from_bytes(key).to_bytes_le();
    let mut pages = [[0u8; PAGE_SIZE]; 4];
    for (page, chunk) in pages.iter_mut().zip(le.chunks_exact(PAGE_SIZE)) {
        page.copy_from_slice(chunk);
    }
    pages
}
