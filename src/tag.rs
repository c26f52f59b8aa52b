//! Physical tag link
//!
//! The platform glue that owns the NFC reader implements [`NfcTag`] for the
//! handle it receives on tag discovery. Everything above this trait is
//! platform independent.

use thiserror::Error;

/// Failures of the contactless link itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("tag left the field")]
    TagLost,

    #[error("transceive timed out")]
    Timeout,

    #[error("link I/O error: {0}")]
    Io(String),
}

/// A tag handle delivered by the reader
pub trait NfcTag {
    /// True when the tag exposes NFC-A (ISO 14443-3A) transceive
    fn supports_nfca(&self) -> bool;

    /// Open the link
    fn connect(&mut self) -> Result<(), LinkError>;

    /// Send one raw frame and return the raw answer
    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>, LinkError>;

    /// Close the link; never fails
    fn close(&mut self);
}
