//! Traits for single-page encoding and decoding

use crate::ultralight::{FrameError, PAGE_SIZE};

/// Types that can be decoded from one 4-byte tag page
pub trait PageDecode: Sized {
    fn decode_page(page: [u8; PAGE_SIZE]) -> Result<Self, FrameError>;

    /// Decode from the first page of a READ response
    fn decode_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let page: [u8; PAGE_SIZE] = bytes
            .get(..PAGE_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(FrameError::UnexpectedLength {
                expected: PAGE_SIZE,
                got: bytes.len(),
            })?;
        Self::decode_page(page)
    }
}

/// Types that can be written as one 4-byte tag page
pub trait PageEncode {
    fn encode_page(&self) -> [u8; PAGE_SIZE];
}
