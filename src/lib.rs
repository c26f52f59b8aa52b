//! Wristband scanning core
//!
//! Talks to Ultralight AES wristbands over an [`NfcTag`] link: mutual AES
//! authentication, CMAC secure messaging, provisioning and identification.
//! The collaborator layer submits a [`ScanRequest`] and gets back exactly one
//! [`ScanResult`] per tag touch.
//!
//! # Example
//!
//! ```no_run
//! use wristband::prelude::*;
//!
//! # fn example(tag: &mut dyn NfcTag, keys: KeyMaterial) -> Result<(), ConfigError> {
//! let mut scanner = Scanner::new(ScannerConfig::default())?;
//! scanner.pending().submit(ScanRequest::Read { keys: Some(keys) });
//!
//! // Called by the platform glue when a tag enters the field
//! if let Some(result) = scanner.on_tag_discovered(tag) {
//!     println!("{}", serde_json::to_string(&result).unwrap());
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod scan;
pub mod session;
pub mod tag;

pub use codec::{CodecError, Command, MacContext};
pub use config::{ConfigError, ScannerConfig};
pub use error::{ScanError, SessionError};
pub use orchestrator::{classify, handle_tag, PendingRequest, Scanner};
pub use scan::{ScanFailure, ScanRequest, ScanResult, TestEntry, UidPinMap};
pub use session::{FastRead, SessionState, TagSession};
pub use tag::{LinkError, NfcTag};

pub use wristband_crypto as crypto;
pub use wristband_protocol as protocol;
