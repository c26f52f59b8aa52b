//! Tag Session
//!
//! One [`TagSession`] lives for one tag touch:
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──authenticate──▶ Authenticated{counter}
//!       ▲                       │                              │
//!       └─────── close / link loss / drop ─────────────────────┘
//! ```
//!
//! While authenticated with secure messaging enabled every command except
//! the handshake carries a truncated CMAC under the session MAC key, and the
//! counter advances by one for every successful command. The session key and
//! counter never outlive the session.

use rand::RngCore;
use tracing::{debug, warn};
use wristband_crypto::{AesKey, Handshake};
use wristband_protocol::ultralight::check_page;
use wristband_protocol::{
    key_to_pages, AccessConfig, Cfg0, KeyType, PageDecode, PageEncode, Uid, VersionInfo,
    AUTH0_DISABLED, PAGE_BANNER, PAGE_CFG0, PAGE_CFG1, PAGE_PIN, PAGE_SIZE, PAGE_UID, READ_LEN,
};

use crate::codec::{
    decode_ack, decode_auth_challenge, decode_auth_confirmation, decode_read, decode_version,
    open_response, CodecError, Command, MacContext,
};
use crate::error::SessionError;
use crate::tag::NfcTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
}

/// What a fast read returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastRead {
    pub uid: Uid,
    pub banner: [u8; READ_LEN],
    pub content: [u8; READ_LEN],
}

/// Stateful conversation with one tag
pub struct TagSession<'a, T: NfcTag + ?Sized> {
    tag: &'a mut T,
    rng: &'a mut dyn RngCore,
    state: SessionState,
    cmac_enabled: bool,
    counter: u16,
    auth0_boundary: Option<u8>,
    read_protect: bool,
    mac_key: Option<AesKey>,
}

impl<'a, T: NfcTag + ?Sized> TagSession<'a, T> {
    /// Open the link and check that the tag is an Ultralight AES tag
    pub fn connect(tag: &'a mut T, rng: &'a mut dyn RngCore) -> Result<Self, SessionError> {
        if !tag.supports_nfca() {
            return Err(SessionError::Incompatible(
                "tag does not expose NFC-A".to_string(),
            ));
        }
        tag.connect()?;

        let mut session = Self {
            tag,
            rng,
            state: SessionState::Connected,
            cmac_enabled: false,
            counter: 0,
            auth0_boundary: None,
            read_protect: false,
            mac_key: None,
        };
        let version = session.get_version()?;
        if !version.is_ultralight_aes() {
            return Err(SessionError::Incompatible(format!(
                "not an Ultralight AES tag (vendor 0x{:02x}, type 0x{:02x}, major 0x{:02x})",
                version.vendor, version.product_type, version.major
            )));
        }
        debug!(storage = version.storage_size, "tag connected");
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn cmac_enabled(&self) -> bool {
        self.cmac_enabled
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn auth0_boundary(&self) -> Option<u8> {
        self.auth0_boundary
    }

    fn drop_authentication(&mut self) {
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Connected;
        }
        self.mac_key = None;
        self.counter = 0;
    }

    /// Send one command, applying secure messaging when it is active
    fn exchange(&mut self, command: &Command) -> Result<Vec<u8>, SessionError> {
        if self.state == SessionState::Disconnected {
            return Err(SessionError::NotConnected);
        }
        let key = match &self.mac_key {
            Some(key) if self.cmac_enabled && command.is_protectable() => Some(key),
            _ => None,
        };
        let ctx = key.map(|key| MacContext {
            key,
            counter: self.counter,
        });

        // The counter advances with or without MACs, so it is checked for both
        let next_counter = if self.state == SessionState::Authenticated && command.is_protectable()
        {
            Some(
                self.counter
                    .checked_add(1)
                    .ok_or(CodecError::CounterExhausted)?,
            )
        } else {
            None
        };
        let frame = match &ctx {
            Some(ctx) => command.encode_protected(ctx)?,
            None => command.encode()?,
        };

        let response = match self.tag.transceive(&frame) {
            Ok(response) => response,
            Err(e) => {
                warn!(opcode = ?command.opcode(), "link lost: {}", e);
                self.close();
                return Err(e.into());
            }
        };

        let opened = open_response(&response, ctx.as_ref()).map(<[u8]>::to_vec);
        match opened {
            Ok(data) => {
                if let Some(next) = next_counter {
                    self.counter = next;
                }
                Ok(data)
            }
            Err(e) => {
                debug!(opcode = ?command.opcode(), "command failed: {}", e);
                self.drop_authentication();
                Err(e.into())
            }
        }
    }

    fn require_access(&self, page: u8, write: bool) -> Result<(), SessionError> {
        if self.is_authenticated() {
            return Ok(());
        }
        match self.auth0_boundary {
            Some(boundary) if page >= boundary && (write || self.read_protect) => {
                Err(SessionError::NotAuthenticated { page })
            }
            _ => Ok(()),
        }
    }

    pub fn get_version(&mut self) -> Result<VersionInfo, SessionError> {
        let data = self.exchange(&Command::GetVersion)?;
        Ok(decode_version(&data)?)
    }

    /// Two-step mutual authentication
    ///
    /// On success the session is authenticated with `counter = 0` and
    /// secure messaging set to `enable_cmac`. The tag must agree: its CFG0
    /// secure messaging bit decides whether it expects MACs.
    pub fn authenticate(
        &mut self,
        key: &AesKey,
        key_type: KeyType,
        enable_cmac: bool,
    ) -> Result<(), SessionError> {
        self.drop_authentication();
        let mut handshake = Handshake::new(key, &mut *self.rng);

        let answer = self.auth_exchange(&Command::Authenticate1 { key_type })?;
        let token = handshake.respond(&decode_auth_challenge(&answer)?)?;

        let answer = self.auth_exchange(&Command::Authenticate2 { token })?;
        let mac_key = handshake.confirm(&decode_auth_confirmation(&answer)?)?;

        self.mac_key = Some(mac_key);
        self.counter = 0;
        self.cmac_enabled = enable_cmac;
        self.state = SessionState::Authenticated;
        debug!(?key_type, cmac = enable_cmac, "authenticated");
        Ok(())
    }

    fn auth_exchange(&mut self, command: &Command) -> Result<Vec<u8>, SessionError> {
        self.exchange(command).map_err(|e| match e {
            SessionError::Codec(CodecError::Nak(code)) => SessionError::AuthRejected(code),
            other => other,
        })
    }

    /// Read 16 bytes starting at `page`
    pub fn read(&mut self, page: u8) -> Result<[u8; READ_LEN], SessionError> {
        check_page(page)?;
        self.require_access(page, false)?;
        let data = self.exchange(&Command::Read { page })?;
        Ok(decode_read(&data)?)
    }

    /// Write one page
    pub fn write(&mut self, page: u8, data: [u8; PAGE_SIZE]) -> Result<(), SessionError> {
        check_page(page)?;
        self.require_access(page, true)?;
        let answer = self.exchange(&Command::Write { page, data })?;
        Ok(decode_ack(&answer)?)
    }

    /// Write consecutive pages starting at `page`; `data` is zero padded
    pub fn write_pages(&mut self, page: u8, data: &[u8]) -> Result<(), SessionError> {
        for (offset, chunk) in data.chunks(PAGE_SIZE).enumerate() {
            let mut buf = [0u8; PAGE_SIZE];
            buf[..chunk.len()].copy_from_slice(chunk);
            let target = u8::try_from(offset)
                .ok()
                .and_then(|offset| page.checked_add(offset))
                .ok_or(wristband_protocol::FrameError::PageOutOfRange { page })?;
            self.write(target, buf)?;
        }
        Ok(())
    }

    /// Serial number from pages 0..2, check bytes verified
    pub fn read_uid(&mut self) -> Result<Uid, SessionError> {
        let data = self.read(PAGE_UID)?;
        Ok(Uid::from_read(&data)?)
    }

    /// Quick identification of a provisioned tag
    ///
    /// One handshake with the data protection key covers the serial number,
    /// the banner and the content pages. A tag with random ID active only
    /// reveals its real serial number after a handshake with the UID
    /// retrieval key, so that case takes a second round before switching
    /// back to the data protection key.
    pub fn fast_read(
        &mut self,
        uid_key: &AesKey,
        data_key: &AesKey,
    ) -> Result<FastRead, SessionError> {
        self.authenticate(data_key, KeyType::DataProtection, true)?;
        let uid = if self.read_cfg0()?.random_id {
            debug!("random id active, retrieving serial number");
            self.authenticate(uid_key, KeyType::UidRetrieval, true)?;
            let uid = self.read_uid()?;
            self.authenticate(data_key, KeyType::DataProtection, true)?;
            uid
        } else {
            self.read_uid()?
        };
        let banner = self.read(PAGE_BANNER)?;
        let content = self.read(PAGE_PIN)?;
        debug!(%uid, "fast read complete");
        Ok(FastRead {
            uid,
            banner,
            content,
        })
    }

    /// Install a key; the originality key cannot be written
    pub fn write_key(&mut self, key_type: KeyType, key: &AesKey) -> Result<(), SessionError> {
        let first = key_type.first_page()?;
        for (page, data) in (first..).zip(key_to_pages(key.as_bytes())) {
            self.write(page, data)?;
        }
        debug!(?key_type, "key written");
        Ok(())
    }

    fn read_cfg0(&mut self) -> Result<Cfg0, SessionError> {
        let data = self.read(PAGE_CFG0)?;
        Ok(Cfg0::decode_slice(&data)?)
    }

    /// Turn secure messaging on or off for the following commands
    pub fn set_cmac(&mut self, enable: bool) -> Result<(), SessionError> {
        let mut cfg = self.read_cfg0()?;
        cfg.secure_messaging = enable;
        self.write(PAGE_CFG0, cfg.encode_page())?;
        self.cmac_enabled = enable;
        debug!(enable, "secure messaging configured");
        Ok(())
    }

    /// Move the AUTH0 boundary; `AUTH0_DISABLED` removes protection
    pub fn set_auth0(&mut self, page: u8) -> Result<(), SessionError> {
        if page > AUTH0_DISABLED {
            return Err(wristband_protocol::FrameError::PageOutOfRange { page }.into());
        }
        let mut cfg = self.read_cfg0()?;
        cfg.auth0 = page;
        self.write(PAGE_CFG0, cfg.encode_page())?;
        self.auth0_boundary = (page < AUTH0_DISABLED).then_some(page);
        debug!(page, "auth0 configured");
        Ok(())
    }

    /// Require authentication for reads at or above AUTH0 as well
    pub fn set_read_protect(&mut self, enable: bool) -> Result<(), SessionError> {
        let data = self.read(PAGE_CFG1)?;
        let mut access = AccessConfig::decode_slice(&data)?;
        access.read_protect = enable;
        self.write(PAGE_CFG1, access.encode_page())?;
        self.read_protect = enable;
        debug!(enable, "read protection configured");
        Ok(())
    }

    /// Close the link and discard the session key
    pub fn close(&mut self) {
        self.drop_authentication();
        if self.state != SessionState::Disconnected {
            self.tag.close();
            self.state = SessionState::Disconnected;
        }
    }
}

impl<T: NfcTag + ?Sized> Drop for TagSession<'_, T> {
    fn drop(&mut self) {
        self.close();
    }
}
