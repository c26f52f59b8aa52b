//! Ultralight-AES Command Set and Memory Map
//!
//! ## Memory layout
//!
//! ```text
//! page  0x00..0x02  UID0 UID1 UID2 BCC0 | UID3..UID6 | BCC1 int lock lock
//! page  0x04..0x07  banner (16 bytes, readable)
//! page  0x08..0x0B  PIN / content (16 bytes, first protected page by default)
//! page  0x04..0x27  user memory
//! page  0x29        CFG0: [flags, rfu, rid_act, AUTH0]
//! page  0x2A        CFG1: [access, rfu, rfu, rfu]
//! page  0x30..0x33  data protection key  (write only, LSB first)
//! page  0x34..0x37  UID retrieval key    (write only, LSB first)
//! ```
//!
//! All page payloads are big-endian except key material, which the tag
//! stores least significant byte first.

mod config;
mod memory;
mod version;

pub use config::{AccessConfig, Cfg0};
pub use memory::{key_to_pages, Uid};
pub use version::{VersionInfo, ULTRALIGHT_AES_VERSION};

use thiserror::Error;

/// Number of 4-byte pages on the tag
pub const PAGE_COUNT: u8 = 0x3C;

/// Bytes per page
pub const PAGE_SIZE: usize = 4;

/// Bytes returned by one READ (four pages)
pub const READ_LEN: usize = 16;

/// AES block size in bytes
pub const BLOCK_LEN: usize = 16;

/// Bytes of CMAC transmitted with secure messaging
pub const MAC_LEN: usize = 8;

/// 4-bit ACK as delivered by the reader
pub const ACK: u8 = 0x0A;

/// First byte of an authentication answer that expects a second step
pub const AUTH_CONTINUE: u8 = 0xAF;

/// First byte of a successful final authentication answer
pub const AUTH_COMPLETE: u8 = 0x00;

/// AUTH0 value that leaves the whole memory unprotected
pub const AUTH0_DISABLED: u8 = PAGE_COUNT;

pub const PAGE_UID: u8 = 0x00;
pub const PAGE_BANNER: u8 = 0x04;
pub const PAGE_PIN: u8 = 0x08;
pub const USER_PAGE_FIRST: u8 = 0x04;
pub const USER_PAGE_LAST: u8 = 0x27;
pub const PAGE_CFG0: u8 = 0x29;
pub const PAGE_CFG1: u8 = 0x2A;
pub const PAGE_DATA_PROT_KEY: u8 = 0x30;
pub const PAGE_UID_RETR_KEY: u8 = 0x34;

/// Errors raised while framing or parsing tag data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("page 0x{page:02x} outside tag memory (0x00..0x{end:02x})", end = PAGE_COUNT)]
    PageOutOfRange { page: u8 },

    #[error("unexpected frame length: expected {expected} bytes, got {got}")]
    UnexpectedLength { expected: usize, got: usize },

    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("invalid key type {0}")]
    InvalidKeyType(u8),

    #[error("key slot {0:?} cannot be written")]
    ReadOnlyKey(KeyType),

    #[error("UID check byte mismatch")]
    UidChecksum,
}

/// Check a page index against the tag memory size
pub fn check_page(page: u8) -> Result<u8, FrameError> {
    if page >= PAGE_COUNT {
        return Err(FrameError::PageOutOfRange { page });
    }
    Ok(page)
}

/// Command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    GetVersion = 0x60,
    Read = 0x30,
    Write = 0xA2,
    Authenticate1 = 0x1A,
    Authenticate2 = 0xAF,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Result<Self, FrameError> {
        match byte {
            0x60 => Ok(Opcode::GetVersion),
            0x30 => Ok(Opcode::Read),
            0xA2 => Ok(Opcode::Write),
            0x1A => Ok(Opcode::Authenticate1),
            0xAF => Ok(Opcode::Authenticate2),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// AES key slots on the tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    /// Guards read/write access to protected pages
    DataProtection = 0x00,
    /// Unlocks the real UID when random ID is active
    UidRetrieval = 0x01,
    /// NXP originality key, never writable
    Originality = 0x02,
}

impl KeyType {
    pub fn from_byte(byte: u8) -> Result<Self, FrameError> {
        match byte {
            0x00 => Ok(KeyType::DataProtection),
            0x01 => Ok(KeyType::UidRetrieval),
            0x02 => Ok(KeyType::Originality),
            other => Err(FrameError::InvalidKeyType(other)),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// First page of the key slot
    pub fn first_page(self) -> Result<u8, FrameError> {
        match self {
            KeyType::DataProtection => Ok(PAGE_DATA_PROT_KEY),
            KeyType::UidRetrieval => Ok(PAGE_UID_RETR_KEY),
            KeyType::Originality => Err(FrameError::ReadOnlyKey(self)),
        }
    }
}
