//! Error types for tag sessions and scans
//!
//! Lower layers keep their own error enums (`BitError`, `FrameError`,
//! `CmacError`, `CodecError`, `LinkError`, ...). [`SessionError`] gathers
//! everything that can go wrong while talking to one tag and [`ScanError`]
//! adds the request-level conditions the orchestrator checks. Neither
//! crosses into the collaborator layer: the orchestrator classifies them
//! into a [`ScanFailure`](crate::ScanFailure).

use thiserror::Error;
use wristband_crypto::AuthError;
use wristband_protocol::{FrameError, Uid};

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::tag::LinkError;

/// Errors raised by a [`TagSession`](crate::TagSession)
#[derive(Debug, Error)]
pub enum SessionError {
    /// The tag is not an Ultralight AES class tag
    #[error("incompatible tag: {0}")]
    Incompatible(String),

    /// The contactless link failed
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Framing, NAK or secure messaging error
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Handshake answer did not check out
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Tag answered NAK during the handshake
    #[error("authentication rejected by tag (NAK 0x{0:x})")]
    AuthRejected(u8),

    #[error("page 0x{page:02x} requires authentication")]
    NotAuthenticated { page: u8 },

    #[error("session is not connected")]
    NotConnected,
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        Self::Codec(CodecError::Frame(err))
    }
}

impl SessionError {
    /// Returns true if the tag left the field or the link timed out
    pub fn is_link_loss(&self) -> bool {
        matches!(self, Self::Link(_))
    }

    /// Returns true for handshake failures and response CMAC mismatches
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::AuthRejected(_) | Self::Codec(CodecError::InvalidResponseCmac)
        )
    }

    /// Returns true if tapping the tag again may succeed
    ///
    /// Only link failures qualify. Nothing is retried internally; the
    /// collaborator asks the user for another tap.
    pub fn is_retryable(&self) -> bool {
        self.is_link_loss()
    }

    /// Returns a suggestion for resolving this error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Link(_) => Some("Hold the wristband still against the reader and tap again"),
            Self::Incompatible(_) => Some("Use an Ultralight AES wristband"),
            Self::Auth(_) | Self::AuthRejected(_) => {
                Some("Check that the wristband was provisioned with these keys")
            }
            Self::Codec(CodecError::InvalidResponseCmac) => {
                Some("Response integrity check failed; tap again and report repeated failures")
            }
            Self::Codec(CodecError::CounterExhausted) => Some("Tap again to start a new session"),
            _ => None,
        }
    }
}

/// Errors raised while executing one [`ScanRequest`](crate::ScanRequest)
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request lacks key material the operation needs
    #[error("{0} not supplied")]
    NoKey(&'static str),

    /// The tag serial number has no entry in the collaborator's pin map
    #[error("uid not found")]
    UidNotFound(Uid),

    #[error("banner mismatch")]
    BannerMismatch,

    #[error("pin for uid {uid} must be {expected} ASCII bytes")]
    InvalidPin { uid: Uid, expected: usize },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
