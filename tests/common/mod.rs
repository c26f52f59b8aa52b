//! Common test utilities for wristband integration tests
//!
//! [`SimulatedTag`] behaves like an Ultralight AES wristband: it runs the
//! tag side of the mutual authentication, checks and produces secure
//! messaging MACs, enforces AUTH0 and read protection, can hide its serial
//! number behind random ID, and can inject faults (link loss, a flipped
//! response bit, missing NFC-A).

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use wristband::codec::mac_input;
use wristband::crypto::{
    cbc_decrypt, cbc_encrypt, encrypt_block, rotate_challenge, session_mac_key, truncated_mac,
    verify_truncated, AesKey, KeyMaterial,
};
use wristband::protocol::{
    AccessConfig, BitVector, Cfg0, KeyType, PageDecode, PageEncode, Uid, ACK, AUTH_COMPLETE,
    AUTH_CONTINUE, MAC_LEN, PAGE_BANNER, PAGE_CFG0, PAGE_CFG1, PAGE_COUNT, PAGE_DATA_PROT_KEY,
    PAGE_PIN, PAGE_SIZE, PAGE_UID_RETR_KEY, ULTRALIGHT_AES_VERSION,
};
use wristband::{LinkError, NfcTag, ScannerConfig};

/// Serial number used by most tests
pub const TEST_UID: u64 = 0x04A1_B2C3_D4E5_F6;

/// Content of the pin pages after provisioning with the default config
pub const DEFAULT_PIN: &[u8; 16] = b"0000000000000000";

/// Serial number a random ID tag shows without UID retrieval
pub const RANDOM_UID: u64 = 0x08_1357_9BDF_0246;

const NAK_INVALID: u8 = 0x00;
const NAK_AUTH: u8 = 0x04;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn data_key() -> AesKey {
    AesKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap()
}

pub fn uid_key() -> AesKey {
    AesKey::from_hex("101112131415161718191a1b1c1d1e1f").unwrap()
}

pub fn test_keys() -> KeyMaterial {
    KeyMaterial::new(data_key(), uid_key())
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED)
}

pub fn banner() -> [u8; 16] {
    ScannerConfig::default().banner_bytes()
}

struct TagAuth {
    key_type: KeyType,
    mac_key: AesKey,
    counter: u16,
}

struct PendingAuth {
    key_type: KeyType,
    rnd_b: [u8; 16],
}

/// In-memory Ultralight AES wristband
pub struct SimulatedTag {
    pages: [[u8; PAGE_SIZE]; PAGE_COUNT as usize],
    // Key slots as stored, least significant byte first
    key_slots: [[u8; 16]; 2],
    uid: Uid,
    nfca: bool,
    connected: bool,
    auth: Option<TagAuth>,
    pending: Option<PendingAuth>,
    last_mac_key: Option<AesKey>,
    rng: StdRng,
    exchanges: usize,
    lose_after: Option<usize>,
    tamper: Option<(usize, usize)>,
    frames: Vec<Vec<u8>>,
}

impl SimulatedTag {
    /// Blank tag: zero keys, no protection, secure messaging off
    pub fn factory(uid: u64) -> Self {
        let uid = Uid::from_u64(uid);
        let mut pages = [[0u8; PAGE_SIZE]; PAGE_COUNT as usize];
        for (page, chunk) in pages.iter_mut().zip(uid.to_pages().chunks_exact(PAGE_SIZE)) {
            page.copy_from_slice(chunk);
        }
        pages[PAGE_CFG0 as usize] = Cfg0::default().encode_page();
        pages[PAGE_CFG1 as usize] = AccessConfig::default().encode_page();
        Self {
            pages,
            key_slots: [[0u8; 16]; 2],
            uid,
            nfca: true,
            connected: false,
            auth: None,
            pending: None,
            last_mac_key: None,
            rng: StdRng::seed_from_u64(uid.as_u64()),
            exchanges: 0,
            lose_after: None,
            tamper: None,
            frames: Vec::new(),
        }
    }

    /// Tag in the state a successful Write leaves behind
    pub fn provisioned(uid: u64, keys: &KeyMaterial, banner: &[u8; 16], pin: &[u8; 16]) -> Self {
        let mut tag = Self::factory(uid);
        tag.fill(PAGE_BANNER, banner);
        tag.fill(PAGE_PIN, pin);
        tag.set_key(KeyType::DataProtection, &keys.data_protection);
        tag.set_key(KeyType::UidRetrieval, &keys.uid_retrieval);
        tag.pages[PAGE_CFG0 as usize] = Cfg0 {
            secure_messaging: true,
            random_id: false,
            auth0: PAGE_PIN,
        }
        .encode_page();
        tag.pages[PAGE_CFG1 as usize] = AccessConfig {
            read_protect: true,
            config_lock: false,
        }
        .encode_page();
        tag
    }

    pub fn without_nfca(mut self) -> Self {
        self.nfca = false;
        self
    }

    /// Hide the serial number behind the UID retrieval key
    pub fn with_random_id(mut self) -> Self {
        let mut cfg = self.cfg0();
        cfg.random_id = true;
        self.pages[PAGE_CFG0 as usize] = cfg.encode_page();
        self
    }

    /// Drop the link on every exchange after the first `n`
    pub fn lose_after(mut self, n: usize) -> Self {
        self.lose_after = Some(n);
        self
    }

    /// Flip `bit` of the answer to exchange number `exchange` (1-based)
    pub fn tamper(mut self, exchange: usize, bit: usize) -> Self {
        self.tamper = Some((exchange, bit));
        self
    }

    pub fn fill(&mut self, first: u8, data: &[u8]) {
        for (offset, chunk) in data.chunks(PAGE_SIZE).enumerate() {
            let page = &mut self.pages[first as usize + offset];
            page[..chunk.len()].copy_from_slice(chunk);
        }
    }

    pub fn set_key(&mut self, key_type: KeyType, key: &AesKey) {
        let mut le = *key.as_bytes();
        le.reverse();
        self.key_slots[slot(key_type)] = le;
    }

    pub fn key(&self, key_type: KeyType) -> AesKey {
        let mut be = self.key_slots[slot(key_type)];
        be.reverse();
        AesKey::from_bytes(be)
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn page(&self, page: u8) -> [u8; PAGE_SIZE] {
        self.pages[page as usize]
    }

    pub fn region(&self, first: u8) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (i, chunk) in out.chunks_mut(PAGE_SIZE).enumerate() {
            chunk.copy_from_slice(&self.pages[first as usize + i]);
        }
        out
    }

    pub fn cfg0(&self) -> Cfg0 {
        Cfg0::decode_page(self.pages[PAGE_CFG0 as usize]).unwrap()
    }

    pub fn access(&self) -> AccessConfig {
        AccessConfig::decode_page(self.pages[PAGE_CFG1 as usize]).unwrap()
    }

    /// Tag-side counter, when authenticated
    pub fn counter(&self) -> Option<u16> {
        self.auth.as_ref().map(|auth| auth.counter)
    }

    /// Session MAC key of the most recent handshake, kept after close
    pub fn last_mac_key(&self) -> Option<&AesKey> {
        self.last_mac_key.as_ref()
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    /// Every frame received, in order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn process(&mut self, frame: &[u8]) -> Vec<u8> {
        match frame.first() {
            Some(0x1A) => self.authenticate1(frame),
            Some(0xAF) => self.authenticate2(frame),
            _ => self.secure_command(frame),
        }
    }

    fn authenticate1(&mut self, frame: &[u8]) -> Vec<u8> {
        self.auth = None;
        self.pending = None;
        let key_type = match frame {
            [_, 0x00] => KeyType::DataProtection,
            [_, 0x01] => KeyType::UidRetrieval,
            _ => return vec![NAK_INVALID],
        };
        let mut rnd_b = [0u8; 16];
        self.rng.fill_bytes(&mut rnd_b);
        let challenge = cbc_encrypt(&self.key(key_type), &BitVector::from_bytes(&rnd_b)).unwrap();
        self.pending = Some(PendingAuth { key_type, rnd_b });

        let mut answer = vec![AUTH_CONTINUE];
        answer.extend_from_slice(&challenge.to_bytes());
        answer
    }

    fn authenticate2(&mut self, frame: &[u8]) -> Vec<u8> {
        let Some(pending) = self.pending.take() else {
            return vec![NAK_INVALID];
        };
        if frame.len() != 33 {
            return vec![NAK_INVALID];
        }
        let key = self.key(pending.key_type);
        let plain = cbc_decrypt(&key, &BitVector::from_bytes(&frame[1..])).unwrap().to_bytes();
        let rnd_b = BitVector::from_bytes(&pending.rnd_b);
        if plain[16..] != rotate_challenge(&rnd_b).to_bytes()[..] {
            return vec![NAK_INVALID];
        }

        let rnd_a = BitVector::from_bytes(&plain[..16]);
        let mac_key = session_mac_key(&key, &rnd_a, &rnd_b).unwrap();
        self.last_mac_key = Some(mac_key.clone());
        self.auth = Some(TagAuth {
            key_type: pending.key_type,
            mac_key,
            counter: 0,
        });
        let mut answer = vec![AUTH_COMPLETE];
        answer.extend_from_slice(
            &encrypt_block(&key, &rotate_challenge(&rnd_a)).unwrap().to_bytes(),
        );
        answer
    }

    fn secure_command(&mut self, frame: &[u8]) -> Vec<u8> {
        let secure = self.auth.is_some() && self.cfg0().secure_messaging;
        let verified = match &self.auth {
            Some(auth) if secure && frame.len() > MAC_LEN => {
                let (body, mac) = frame.split_at(frame.len() - MAC_LEN);
                verify_truncated(&auth.mac_key, &mac_input(auth.counter, body), mac)
                    .ok()
                    .map(|_| body.to_vec())
            }
            Some(_) if secure => None,
            _ => Some(frame.to_vec()),
        };
        let Some(body) = verified else {
            return self.nak(NAK_AUTH);
        };

        match self.command(&body) {
            Ok(mut answer) => {
                if let Some(auth) = &mut self.auth {
                    if secure {
                        let mac =
                            truncated_mac(&auth.mac_key, &mac_input(auth.counter + 1, &answer))
                                .unwrap();
                        answer.extend_from_slice(&mac);
                    }
                    auth.counter += 1;
                }
                answer
            }
            Err(code) => self.nak(code),
        }
    }

    fn nak(&mut self, code: u8) -> Vec<u8> {
        self.auth = None;
        vec![code]
    }

    /// Pages 0..2 as a reader sees them; random ID masks the serial number
    /// unless the session was opened with the UID retrieval key
    fn visible_page(&self, index: u8) -> [u8; PAGE_SIZE] {
        let revealed = self
            .auth
            .as_ref()
            .is_some_and(|auth| auth.key_type == KeyType::UidRetrieval);
        if index < 3 && self.cfg0().random_id && !revealed {
            let masked = Uid::from_u64(RANDOM_UID).to_pages();
            let offset = index as usize * PAGE_SIZE;
            let mut page = [0u8; PAGE_SIZE];
            page.copy_from_slice(&masked[offset..offset + PAGE_SIZE]);
            return page;
        }
        self.pages[index as usize]
    }

    fn guarded(&self, page: u8, write: bool) -> bool {
        if self.auth.is_some() {
            return false;
        }
        page >= self.cfg0().auth0 && (write || self.access().read_protect)
    }

    fn command(&mut self, body: &[u8]) -> Result<Vec<u8>, u8> {
        match *body {
            [0x60] => Ok(ULTRALIGHT_AES_VERSION.to_vec()),
            [0x30, page] => {
                if page >= PAGE_COUNT {
                    return Err(NAK_INVALID);
                }
                if self.guarded(page, false) {
                    return Err(NAK_AUTH);
                }
                let mut out = Vec::with_capacity(16);
                for i in 0..4u8 {
                    let index = (page + i) % PAGE_COUNT;
                    out.extend_from_slice(&self.visible_page(index));
                }
                Ok(out)
            }
            [0xA2, page, d0, d1, d2, d3] => {
                if page >= PAGE_COUNT || page < 3 {
                    return Err(NAK_INVALID);
                }
                if self.guarded(page, true) {
                    return Err(NAK_AUTH);
                }
                let data = [d0, d1, d2, d3];
                match page {
                    p if (PAGE_DATA_PROT_KEY..PAGE_DATA_PROT_KEY + 4).contains(&p) => {
                        let offset = (p - PAGE_DATA_PROT_KEY) as usize * PAGE_SIZE;
                        self.key_slots[0][offset..offset + PAGE_SIZE].copy_from_slice(&data);
                    }
                    p if (PAGE_UID_RETR_KEY..PAGE_UID_RETR_KEY + 4).contains(&p) => {
                        let offset = (p - PAGE_UID_RETR_KEY) as usize * PAGE_SIZE;
                        self.key_slots[1][offset..offset + PAGE_SIZE].copy_from_slice(&data);
                    }
                    p => self.pages[p as usize] = data,
                }
                Ok(vec![ACK])
            }
            _ => Err(NAK_INVALID),
        }
    }
}

fn slot(key_type: KeyType) -> usize {
    match key_type {
        KeyType::DataProtection => 0,
        KeyType::UidRetrieval => 1,
        KeyType::Originality => panic!("originality key is not simulated"),
    }
}

impl NfcTag for SimulatedTag {
    fn supports_nfca(&self) -> bool {
        self.nfca
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        self.connected = true;
        self.auth = None;
        self.pending = None;
        Ok(())
    }

    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>, LinkError> {
        self.exchanges += 1;
        if !self.connected {
            return Err(LinkError::TagLost);
        }
        if self.lose_after.is_some_and(|n| self.exchanges > n) {
            self.connected = false;
            self.auth = None;
            return Err(LinkError::TagLost);
        }
        self.frames.push(frame.to_vec());

        let mut answer = self.process(frame);
        if let Some((exchange, bit)) = self.tamper {
            if exchange == self.exchanges {
                let bit = bit % (answer.len() * 8);
                answer[bit / 8] ^= 1 << (bit % 8);
            }
        }
        Ok(answer)
    }

    fn close(&mut self) {
        self.connected = false;
        self.auth = None;
        self.pending = None;
    }
}
