//! Scan requests and results exchanged with the collaborator layer
//!
//! A [`ScanRequest`] says what to do with the next tag; exactly one
//! [`ScanResult`] comes back per tag touch. Results serialize with serde
//! so the collaborator can forward them as JSON; requests carry key
//! material and never serialize.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use wristband_crypto::{AesKey, KeyMaterial};
use wristband_protocol::READ_LEN;

/// Tag serial number (as `u64`) to the 16-character pin stored on it
pub type UidPinMap = HashMap<u64, String>;

/// The operation to perform on the next tag
#[derive(Clone)]
pub enum ScanRequest {
    /// Identify a provisioned wristband
    Read { keys: Option<KeyMaterial> },
    /// Provision a blank wristband
    Write { keys: Option<KeyMaterial> },
    /// Re-provision a wristband whose current keys are `keys`
    ///
    /// The pin comes from `pins`; `new_keys` replaces the keys when given.
    Rewrite {
        keys: Option<KeyMaterial>,
        new_keys: Option<KeyMaterial>,
        pins: UidPinMap,
    },
    /// Run the diagnostic sequence
    Test {
        key0: Option<AesKey>,
        key1: Option<AesKey>,
    },
}

impl ScanRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanRequest::Read { .. } => "read",
            ScanRequest::Write { .. } => "write",
            ScanRequest::Rewrite { .. } => "rewrite",
            ScanRequest::Test { .. } => "test",
        }
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanRequest::{}", self.kind())
    }
}

/// One step of the diagnostic sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntry {
    pub message: String,
    pub passed: bool,
}

impl TestEntry {
    pub fn new(message: impl Into<String>, passed: bool) -> Self {
        Self {
            message: message.into(),
            passed,
        }
    }
}

/// Why a scan failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ScanFailure {
    Incompatible(String),
    Lost(String),
    Auth(String),
    Other(String),
    NoKey(String),
}

impl ScanFailure {
    pub fn message(&self) -> &str {
        match self {
            ScanFailure::Incompatible(m)
            | ScanFailure::Lost(m)
            | ScanFailure::Auth(m)
            | ScanFailure::Other(m)
            | ScanFailure::NoKey(m) => m,
        }
    }
}

/// Outcome of one tag touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanResult {
    Read { uid: u64, content: [u8; READ_LEN] },
    Write,
    Fail { reason: ScanFailure },
    Test { log: Vec<TestEntry> },
}

impl ScanResult {
    pub fn is_success(&self) -> bool {
        match self {
            ScanResult::Fail { .. } => false,
            ScanResult::Test { log } => log.iter().all(|entry| entry.passed),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_json() {
        let result = ScanResult::Fail {
            reason: ScanFailure::Other("uid not found".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "fail",
                "reason": { "kind": "other", "message": "uid not found" }
            })
        );
        let back: ScanResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);

        let json = serde_json::to_value(ScanResult::Write).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "write" }));
    }

    #[test]
    fn test_read_result_json() {
        let result = ScanResult::Read {
            uid: 0x04A1_B2C3_D4E5_F6,
            content: *b"0000000000000000",
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"type\":\"read\""));
        assert!(json.contains(&0x04A1_B2C3_D4E5_F6u64.to_string()));
    }

    #[test]
    fn test_request_debug_hides_keys() {
        let request = ScanRequest::Test {
            key0: Some(AesKey::from_bytes([0x42; 16])),
            key1: None,
        };
        let printed = format!("{request:?}");
        assert_eq!(printed, "ScanRequest::test");
        assert!(!printed.contains("42"));
    }

    #[test]
    fn test_success() {
        assert!(ScanResult::Write.is_success());
        assert!(!ScanResult::Test {
            log: vec![TestEntry::new("a", true), TestEntry::new("b", false)]
        }
        .is_success());
        assert_eq!(
            ScanFailure::NoKey("no data protection key supplied".into()).message(),
            "no data protection key supplied"
        );
    }
}
