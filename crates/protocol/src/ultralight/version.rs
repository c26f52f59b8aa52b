//! GET_VERSION response

use crate::ultralight::FrameError;

/// GET_VERSION answer of an Ultralight AES tag (17 pF variant)
pub const ULTRALIGHT_AES_VERSION: [u8; 8] = [0x00, 0x04, 0x03, 0x01, 0x04, 0x00, 0x0F, 0x03];

const VENDOR_NXP: u8 = 0x04;
const PRODUCT_ULTRALIGHT: u8 = 0x03;
const MAJOR_AES: u8 = 0x04;

/// Parsed GET_VERSION answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub vendor: u8,
    pub product_type: u8,
    pub product_subtype: u8,
    pub major: u8,
    pub minor: u8,
    pub storage_size: u8,
    pub protocol: u8,
}

impl VersionInfo {
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let b: [u8; 8] = bytes.try_into().map_err(|_| FrameError::UnexpectedLength {
            expected: 8,
            got: bytes.len(),
        })?;
        Ok(Self {
            vendor: b[1],
            product_type: b[2],
            product_subtype: b[3],
            major: b[4],
            minor: b[5],
            storage_size: b[6],
            protocol: b[7],
        })
    }

    /// True for the AES variant of the Ultralight family
    pub fn is_ultralight_aes(&self) -> bool {
        self.vendor == VENDOR_NXP && self.product_type == PRODUCT_ULTRALIGHT && self.major == MAJOR_AES
    }
}
