//! Scan Orchestrator
//!
//! Runs one [`ScanRequest`] against one tag and always produces exactly one
//! [`ScanResult`]. Failures of any layer are classified into a
//! [`ScanFailure`] here and nowhere else.
//!
//! ```text
//! Read     connect → fast read (uid key, data key) → banner check → Read{uid, content}
//! Write    connect → auth(data key, CMAC) → CMAC on → AUTH0 → read protect → provision → Write
//!            rejected: reconnect → auth(factory key) → CMAC on → ...
//! Rewrite  connect → auth(current key) → read uid → pin lookup → provision → Write
//! Test     connect → diagnostic sequence → Test{log}
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info, warn};
use wristband_crypto::KeyMaterial;
use wristband_protocol::{FrameError, KeyType, PAGE_BANNER, PAGE_PIN, READ_LEN};

use crate::codec::CodecError;
use crate::config::{pin_bytes, ConfigError, ScannerConfig};
use crate::error::{ScanError, SessionError};
use crate::scan::{ScanFailure, ScanRequest, ScanResult};
use crate::session::TagSession;
use crate::tag::NfcTag;

/// Map any scan error to the failure reported to the collaborator
pub fn classify(err: &ScanError) -> ScanFailure {
    let message = err.to_string();
    match err {
        ScanError::NoKey(_) => ScanFailure::NoKey(message),
        ScanError::Config(_) | ScanError::InvalidPin { .. } => ScanFailure::Incompatible(message),
        ScanError::UidNotFound(_) | ScanError::BannerMismatch => ScanFailure::Other(message),
        ScanError::Session(e) => match e {
            SessionError::Link(_) => ScanFailure::Lost(message),
            SessionError::Incompatible(_)
            | SessionError::Codec(CodecError::Frame(
                FrameError::PageOutOfRange { .. }
                | FrameError::InvalidKeyType(_)
                | FrameError::ReadOnlyKey(_),
            )) => ScanFailure::Incompatible(message),
            _ if e.is_auth_failure() => ScanFailure::Auth(message),
            _ => ScanFailure::Other(message),
        },
    }
}

fn require<'r, K>(key: &'r Option<K>, name: &'static str) -> Result<&'r K, ScanError> {
    key.as_ref().ok_or(ScanError::NoKey(name))
}

/// Execute `request` against `tag`
///
/// Blocks until the request completes or the tag is lost. Never panics on
/// tag behavior and never returns more than one result.
pub fn handle_tag<T: NfcTag + ?Sized>(
    tag: &mut T,
    request: &ScanRequest,
    config: &ScannerConfig,
    rng: &mut dyn RngCore,
) -> ScanResult {
    debug!(request = request.kind(), "handling tag");
    let outcome = if tag.supports_nfca() {
        execute(tag, request, config, rng)
    } else {
        Err(SessionError::Incompatible("tag does not expose NFC-A".to_string()).into())
    };

    match outcome {
        Ok(result) => {
            info!(request = request.kind(), "scan succeeded");
            result
        }
        Err(err) => {
            let reason = classify(&err);
            warn!(request = request.kind(), ?reason, "scan failed");
            ScanResult::Fail { reason }
        }
    }
}

fn execute<T: NfcTag + ?Sized>(
    tag: &mut T,
    request: &ScanRequest,
    config: &ScannerConfig,
    rng: &mut dyn RngCore,
) -> Result<ScanResult, ScanError> {
    match request {
        ScanRequest::Read { keys } => {
            let keys = require(keys, "key material")?;
            let mut session = TagSession::connect(tag, rng)?;
            let read = session.fast_read(&keys.uid_retrieval, &keys.data_protection)?;
            if read.banner != config.banner_bytes() {
                return Err(ScanError::BannerMismatch);
            }
            info!(uid = %read.uid, "wristband read");
            Ok(ScanResult::Read {
                uid: read.uid.as_u64(),
                content: read.content,
            })
        }
        ScanRequest::Write { keys } => {
            let keys = require(keys, "key material")?;
            let factory_key = config.factory_key()?;
            let pin = config.pin_bytes()?;

            let mut session = TagSession::connect(&mut *tag, &mut *rng)?;
            match session.authenticate(&keys.data_protection, KeyType::DataProtection, true) {
                Ok(()) => protect_and_provision(&mut session, config, keys, &pin)?,
                Err(SessionError::AuthRejected(code)) => {
                    // Blank tag: it still holds the factory key
                    debug!(code, "data protection key rejected, using factory key");
                    drop(session);
                    let mut session = TagSession::connect(tag, rng)?;
                    session.authenticate(&factory_key, KeyType::DataProtection, false)?;
                    protect_and_provision(&mut session, config, keys, &pin)?;
                }
                Err(e) => return Err(e.into()),
            }
            Ok(ScanResult::Write)
        }
        ScanRequest::Rewrite {
            keys,
            new_keys,
            pins,
        } => {
            let keys = require(keys, "key material")?;
            let mut session = TagSession::connect(tag, rng)?;
            session.authenticate(&keys.data_protection, KeyType::DataProtection, true)?;
            let uid = session.read_uid()?;
            let pin = pins.get(&uid.as_u64()).ok_or(ScanError::UidNotFound(uid))?;
            let pin = pin_bytes(pin).ok_or(ScanError::InvalidPin {
                uid,
                expected: READ_LEN,
            })?;
            provision(&mut session, config, new_keys.as_ref().unwrap_or(keys), &pin)?;
            Ok(ScanResult::Write)
        }
        ScanRequest::Test { key0, key1 } => {
            let key0 = require(key0, "key0")?;
            let key1 = require(key1, "key1")?;
            let mut session = TagSession::connect(tag, rng)?;
            let log = session.test_on_page(key0, key1, config.diagnostic_page)?;
            Ok(ScanResult::Test { log })
        }
    }
}

/// Turn on secure messaging, AUTH0 and read protection, then provision
fn protect_and_provision<T: NfcTag + ?Sized>(
    session: &mut TagSession<'_, T>,
    config: &ScannerConfig,
    keys: &KeyMaterial,
    pin: &[u8; READ_LEN],
) -> Result<(), SessionError> {
    session.set_cmac(true)?;
    session.set_auth0(config.auth0_page)?;
    session.set_read_protect(config.read_protect)?;
    provision(session, config, keys, pin)
}

/// Write banner, pin and both keys
fn provision<T: NfcTag + ?Sized>(
    session: &mut TagSession<'_, T>,
    config: &ScannerConfig,
    keys: &KeyMaterial,
    pin: &[u8; READ_LEN],
) -> Result<(), SessionError> {
    session.write_pages(PAGE_BANNER, &config.banner_bytes())?;
    session.write_pages(PAGE_PIN, pin)?;
    session.write_key(KeyType::DataProtection, &keys.data_protection)?;
    session.write_key(KeyType::UidRetrieval, &keys.uid_retrieval)?;
    debug!("wristband provisioned");
    Ok(())
}

/// Single-slot holder for the next request
///
/// Shared between the collaborator, which submits requests, and the reader
/// callback, which takes them on tag discovery.
#[derive(Debug, Default)]
pub struct PendingRequest {
    slot: Mutex<Option<ScanRequest>>,
}

impl PendingRequest {
    fn slot(&self) -> MutexGuard<'_, Option<ScanRequest>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the pending request, returning the one it displaced
    pub fn submit(&self, request: ScanRequest) -> Option<ScanRequest> {
        self.slot().replace(request)
    }

    pub fn take(&self) -> Option<ScanRequest> {
        self.slot().take()
    }

    pub fn clear(&self) {
        self.slot().take();
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }
}

/// Explicit scanner context owned by the platform glue
pub struct Scanner {
    config: ScannerConfig,
    rng: Box<dyn RngCore + Send>,
    pending: Arc<PendingRequest>,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, OsRng)
    }

    /// Use a caller-supplied challenge source
    pub fn with_rng<R: RngCore + Send + 'static>(
        config: ScannerConfig,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: Box::new(rng),
            pending: Arc::new(PendingRequest::default()),
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Handle to the request slot for the collaborator layer
    pub fn pending(&self) -> Arc<PendingRequest> {
        Arc::clone(&self.pending)
    }

    pub fn handle_tag<T: NfcTag + ?Sized>(
        &mut self,
        tag: &mut T,
        request: &ScanRequest,
    ) -> ScanResult {
        handle_tag(tag, request, &self.config, &mut *self.rng)
    }

    /// Reader callback: consume the pending request, or ignore the tag
    pub fn on_tag_discovered<T: NfcTag + ?Sized>(&mut self, tag: &mut T) -> Option<ScanResult> {
        let Some(request) = self.pending.take() else {
            debug!("no pending request, tag ignored");
            return None;
        };
        Some(self.handle_tag(tag, &request))
    }
}
