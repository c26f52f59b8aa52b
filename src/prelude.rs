//! Wristband Prelude
//!
//! Everything the platform glue and the collaborator layer usually need.
//!
//! ```rust
//! use wristband::prelude::*;
//!
//! let request = ScanRequest::Test {
//!     key0: Some(AesKey::zero()),
//!     key1: Some(AesKey::from_bytes([0x11; 16])),
//! };
//! assert_eq!(request.kind(), "test");
//! ```

// Scan boundary
pub use crate::config::{ConfigError, ScannerConfig};
pub use crate::orchestrator::{handle_tag, PendingRequest, Scanner};
pub use crate::scan::{ScanFailure, ScanRequest, ScanResult, TestEntry, UidPinMap};

// Link and session
pub use crate::error::{ScanError, SessionError};
pub use crate::session::TagSession;
pub use crate::tag::{LinkError, NfcTag};

// Key material
pub use wristband_crypto::{AesKey, KeyMaterial};
pub use wristband_protocol::{KeyType, Uid};
