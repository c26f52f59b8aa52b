//! Configuration page codecs
//!
//! ```text
//! CFG0 (page 0x29)
//! ┌───────────────────────┬─────┬──────────────┬───────┐
//! │ flags (bit1 = SEC_MSG)│ RFU │ bit0 = RID   │ AUTH0 │
//! └───────────────────────┴─────┴──────────────┴───────┘
//! CFG1 (page 0x2A)
//! ┌──────────────────────────────────┬─────┬─────┬─────┐
//! │ access (bit7 PROT, bit6 CFGLCK)  │ RFU │ RFU │ RFU │
//! └──────────────────────────────────┴─────┴─────┴─────┘
//! ```

use crate::traits::{PageDecode, PageEncode};
use crate::ultralight::{FrameError, AUTH0_DISABLED, PAGE_SIZE};

const SEC_MSG_ACT: u8 = 0x02;
const RID_ACT: u8 = 0x01;
const PROT: u8 = 0x80;
const CFGLCK: u8 = 0x40;

/// First configuration page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cfg0 {
    /// CMAC secure messaging required for every command after authentication
    pub secure_messaging: bool,
    /// Random UID during anticollision
    pub random_id: bool,
    /// First page that requires authentication
    pub auth0: u8,
}

impl Default for Cfg0 {
    fn default() -> Self {
        Self {
            secure_messaging: false,
            random_id: false,
            auth0: AUTH0_DISABLED,
        }
    }
}

impl Cfg0 {
    /// True when `page` lies at or above the AUTH0 boundary
    pub fn protects(&self, page: u8) -> bool {
        page >= self.auth0
    }
}

impl PageDecode for Cfg0 {
    fn decode_page(page: [u8; PAGE_SIZE]) -> Result<Self, FrameError> {
        Ok(Self {
            secure_messaging: page[0] & SEC_MSG_ACT != 0,
            random_id: page[2] & RID_ACT != 0,
            auth0: page[3],
        })
    }
}

impl PageEncode for Cfg0 {
    fn encode_page(&self) -> [u8; PAGE_SIZE] {
        let flags = if self.secure_messaging { SEC_MSG_ACT } else { 0 };
        let rid = if self.random_id { RID_ACT } else { 0 };
        [flags, 0x00, rid, self.auth0]
    }
}

/// Second configuration page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessConfig {
    /// Reads at or above AUTH0 also require authentication
    pub read_protect: bool,
    /// Configuration pages are permanently locked
    pub config_lock: bool,
}

impl PageDecode for AccessConfig {
    fn decode_page(page: [u8; PAGE_SIZE]) -> Result<Self, FrameError> {
        Ok(Self {
            read_protect: page[0] & PROT != 0,
            config_lock: page[0] & CFGLCK != 0,
        })
    }
}

impl PageEncode for AccessConfig {
    fn encode_page(&self) -> [u8; PAGE_SIZE] {
        let mut access = 0u8;
        if self.read_protect {
            access |= PROT;
        }
        if self.config_lock {
            access |= CFGLCK;
        }
        [access, 0x00, 0x00, 0x00]
    }
}
