//! Wristband Tag Protocol Types
//!
//! This crate contains the protocol-level building blocks for Ultralight-AES
//! class wristband tags:
//! - [`BitVector`], the bit-addressable buffer every frame and MAC is built on
//! - opcodes, key slots and the tag memory map
//! - page codecs for the configuration pages, GET_VERSION and the UID
//!
//! This crate contains NO cryptographic operations and NO I/O.

pub mod bits;
pub mod traits;
pub mod ultralight;

pub use bits::{BitError, BitVector};
pub use traits::{PageDecode, PageEncode};
pub use ultralight::{
    check_page, key_to_pages, AccessConfig, Cfg0, FrameError, KeyType, Opcode, Uid, VersionInfo,
    ACK, AUTH0_DISABLED, AUTH_COMPLETE, AUTH_CONTINUE, BLOCK_LEN, MAC_LEN, PAGE_BANNER, PAGE_CFG0,
    PAGE_CFG1, PAGE_COUNT, PAGE_DATA_PROT_KEY, PAGE_PIN, PAGE_SIZE, PAGE_UID, PAGE_UID_RETR_KEY,
    READ_LEN, ULTRALIGHT_AES_VERSION, USER_PAGE_FIRST, USER_PAGE_LAST,
};
