//! Production QA sequence for freshly written tags
//!
//! The sequence expects a tag in factory configuration (no AUTH0
//! protection, secure messaging off) whose data protection key is `key0`.
//! It exercises plain and CMAC protected I/O, page protection and a key
//! change, then restores the factory configuration. The first failing step
//! ends the run; a lost link aborts it with an error.

use tracing::{debug, info};
use wristband_crypto::AesKey;
use wristband_protocol::{KeyType, AUTH0_DISABLED, PAGE_SIZE};

use crate::error::SessionError;
use crate::scan::TestEntry;
use crate::session::TagSession;
use crate::tag::NfcTag;

const PLAIN_PATTERN: [u8; PAGE_SIZE] = [0xA5, 0x5A, 0x0F, 0xF0];
const CMAC_PATTERN: [u8; PAGE_SIZE] = [0xC3, 0x3C, 0x96, 0x69];

struct Diagnostic<'k> {
    key0: &'k AesKey,
    key1: &'k AesKey,
    page: u8,
}

type Step<'a, 'k, T> = (
    &'static str,
    fn(&mut TagSession<'a, T>, &Diagnostic<'k>) -> Result<bool, SessionError>,
);

impl<'a, T: NfcTag + ?Sized> TagSession<'a, T> {
    fn reads_back(&mut self, page: u8, expected: [u8; PAGE_SIZE]) -> Result<bool, SessionError> {
        let data = self.read(page)?;
        Ok(data[..PAGE_SIZE] == expected)
    }

    /// Run the diagnostic sequence on scratch page `page`
    pub fn test_on_page(
        &mut self,
        key0: &AesKey,
        key1: &AesKey,
        page: u8,
    ) -> Result<Vec<TestEntry>, SessionError> {
        let diag = Diagnostic { key0, key1, page };
        let steps: [Step<'a, '_, T>; 14] = [
            ("GET_VERSION reports Ultralight AES", |s, _| {
                Ok(s.get_version()?.is_ultralight_aes())
            }),
            ("unauthenticated write", |s, d| {
                s.write(d.page, PLAIN_PATTERN).map(|_| true)
            }),
            ("unauthenticated read back", |s, d| {
                s.reads_back(d.page, PLAIN_PATTERN)
            }),
            ("authenticate with key0", |s, d| {
                s.authenticate(d.key0, KeyType::DataProtection, false)
                    .map(|_| true)
            }),
            ("enable secure messaging", |s, _| s.set_cmac(true).map(|_| true)),
            ("CMAC write", |s, d| s.write(d.page, CMAC_PATTERN).map(|_| true)),
            ("CMAC read back", |s, d| s.reads_back(d.page, CMAC_PATTERN)),
            ("protect scratch page", |s, d| {
                s.set_auth0(d.page)?;
                s.set_read_protect(true)?;
                Ok(true)
            }),
            ("install key1", |s, d| {
                s.write_key(KeyType::DataProtection, d.key1).map(|_| true)
            }),
            ("authenticate with key1", |s, d| {
                s.authenticate(d.key1, KeyType::DataProtection, true)
                    .map(|_| true)
            }),
            ("protected read", |s, d| s.reads_back(d.page, CMAC_PATTERN)),
            ("key0 rejected", |s, d| {
                match s.authenticate(d.key0, KeyType::DataProtection, true) {
                    Ok(()) => Ok(false),
                    Err(e) if e.is_auth_failure() => Ok(true),
                    Err(e) => Err(e),
                }
            }),
            ("restore factory configuration", |s, d| {
                s.authenticate(d.key1, KeyType::DataProtection, true)?;
                s.write_key(KeyType::DataProtection, d.key0)?;
                s.set_read_protect(false)?;
                s.set_auth0(AUTH0_DISABLED)?;
                s.set_cmac(false)?;
                Ok(true)
            }),
            ("authenticate with key0 after restore", |s, d| {
                s.authenticate(d.key0, KeyType::DataProtection, false)?;
                s.reads_back(d.page, CMAC_PATTERN)
            }),
        ];

        let mut log = Vec::with_capacity(steps.len());
        for (message, step) in steps {
            match step(self, &diag) {
                Ok(passed) => {
                    debug!(step = message, passed, "diagnostic step");
                    log.push(TestEntry::new(message, passed));
                    if !passed {
                        break;
                    }
                }
                Err(e) if e.is_link_loss() => return Err(e),
                Err(e) => {
                    debug!(step = message, "diagnostic step failed: {}", e);
                    log.push(TestEntry::new(format!("{message}: {e}"), false));
                    break;
                }
            }
        }
        info!(
            steps = log.len(),
            passed = log.iter().all(|entry| entry.passed),
            "diagnostic sequence finished"
        );
        Ok(log)
    }
}
