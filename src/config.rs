//! Scanner configuration
//!
//! Describes how blank wristbands are provisioned and which scratch page the
//! diagnostic sequence may overwrite. Loaded from JSON; every field is
//! optional.
//!
//! ```json
//! {
//!   "banner": "wristband-v1",
//!   "default_pin": "0000000000000000",
//!   "auth0_page": 8,
//!   "read_protect": true,
//!   "factory_key": "00000000000000000000000000000000",
//!   "diagnostic_page": 16
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wristband_crypto::{AesKey, KeyError};
use wristband_protocol::{AUTH0_DISABLED, PAGE_PIN, READ_LEN, USER_PAGE_LAST};

/// Pages occupied by the banner and by the pin
const REGION_PAGES: u8 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid factory key: {0}")]
    Key(#[from] KeyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    /// Text written to the banner pages, zero padded
    pub banner: String,
    /// Content written to the pin pages of a fresh wristband
    pub default_pin: String,
    /// First page requiring authentication after provisioning
    pub auth0_page: u8,
    /// Also require authentication for reads above `auth0_page`
    pub read_protect: bool,
    /// Data protection key of blank wristbands, as hex
    pub factory_key: String,
    /// Scratch page used by the diagnostic sequence
    pub diagnostic_page: u8,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            banner: "wristband-v1".to_string(),
            default_pin: "0".repeat(READ_LEN),
            auth0_page: PAGE_PIN,
            read_protect: true,
            factory_key: "00".repeat(READ_LEN),
            diagnostic_page: 0x10,
        }
    }
}

impl ScannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.banner.is_ascii() || self.banner.len() > READ_LEN {
            return Err(ConfigError::Invalid(format!(
                "banner must be at most {READ_LEN} ASCII characters"
            )));
        }
        if !is_valid_pin(&self.default_pin) {
            return Err(ConfigError::Invalid(format!(
                "default_pin must be exactly {READ_LEN} ASCII characters"
            )));
        }
        if !(PAGE_PIN..=AUTH0_DISABLED).contains(&self.auth0_page) {
            return Err(ConfigError::Invalid(format!(
                "auth0_page 0x{:02x} must lie between 0x{PAGE_PIN:02x} and 0x{AUTH0_DISABLED:02x}",
                self.auth0_page
            )));
        }
        let first_free = PAGE_PIN + REGION_PAGES;
        if !(first_free..=USER_PAGE_LAST).contains(&self.diagnostic_page) {
            return Err(ConfigError::Invalid(format!(
                "diagnostic_page 0x{:02x} must lie between 0x{first_free:02x} and 0x{USER_PAGE_LAST:02x}",
                self.diagnostic_page
            )));
        }
        self.factory_key()?;
        Ok(())
    }

    /// Banner as written to the tag
    pub fn banner_bytes(&self) -> [u8; READ_LEN] {
        let mut out = [0u8; READ_LEN];
        let len = self.banner.len().min(READ_LEN);
        out[..len].copy_from_slice(&self.banner.as_bytes()[..len]);
        out
    }

    pub fn pin_bytes(&self) -> Result<[u8; READ_LEN], ConfigError> {
        pin_bytes(&self.default_pin).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "default_pin must be exactly {READ_LEN} ASCII characters"
            ))
        })
    }

    pub fn factory_key(&self) -> Result<AesKey, ConfigError> {
        Ok(AesKey::from_hex(&self.factory_key)?)
    }
}

pub(crate) fn is_valid_pin(pin: &str) -> bool {
    pin.is_ascii() && pin.len() == READ_LEN
}

/// Pin text as the 16 bytes stored on the tag
pub(crate) fn pin_bytes(pin: &str) -> Option<[u8; READ_LEN]> {
    if !is_valid_pin(pin) {
        return None;
    }
    pin.as_bytes().try_into().ok()
}
