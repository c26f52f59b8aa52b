//! Command Codec
//!
//! Frames commands for the tag and opens its answers. With secure messaging
//! a command carries the last 8 bytes of
//! `CMAC(session key, counter_le16 || command)` and the answer carries the
//! last 8 bytes of `CMAC(session key, (counter + 1)_le16 || answer)`.
//!
//! ```text
//! GET_VERSION   60                    -> 8 bytes
//! READ          30 page               -> 16 bytes
//! WRITE         A2 page d0 d1 d2 d3   -> ACK (0A)
//! AUTH part 1   1A key_type           -> AF || E(K, RndB)
//! AUTH part 2   AF token[32]          -> 00 || E(K, RndA')
//! ```
//!
//! The codec only frames and parses bytes. What the bytes mean is decided
//! by the session and the orchestrator.

use thiserror::Error;
use wristband_crypto::{truncated_mac, verify_truncated, AesKey, CmacError};
use wristband_protocol::ultralight::check_page;
use wristband_protocol::{
    BitError, BitVector, FrameError, KeyType, Opcode, VersionInfo, ACK, AUTH_COMPLETE,
    AUTH_CONTINUE, BLOCK_LEN, MAC_LEN, PAGE_SIZE, READ_LEN,
};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("tag answered NAK 0x{0:x}")]
    Nak(u8),

    #[error("invalid response CMAC")]
    InvalidResponseCmac,

    #[error("{0:?} cannot be sent with secure messaging")]
    NotProtectable(Opcode),

    #[error("unexpected response status 0x{0:02x}")]
    UnexpectedStatus(u8),

    #[error("session counter exhausted")]
    CounterExhausted,

    #[error(transparent)]
    Cmac(#[from] CmacError),

    #[error(transparent)]
    Bits(#[from] BitError),
}

/// One command of the tag command set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetVersion,
    Read { page: u8 },
    Write { page: u8, data: [u8; PAGE_SIZE] },
    Authenticate1 { key_type: KeyType },
    Authenticate2 { token: [u8; 2 * BLOCK_LEN] },
}

/// Secure messaging state for one exchange
pub struct MacContext<'a> {
    pub key: &'a AesKey,
    pub counter: u16,
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::GetVersion => Opcode::GetVersion,
            Command::Read { .. } => Opcode::Read,
            Command::Write { .. } => Opcode::Write,
            Command::Authenticate1 { .. } => Opcode::Authenticate1,
            Command::Authenticate2 { .. } => Opcode::Authenticate2,
        }
    }

    /// Whether the command may carry a CMAC (authentication never does)
    pub fn is_protectable(&self) -> bool {
        !matches!(
            self,
            Command::Authenticate1 { .. } | Command::Authenticate2 { .. }
        )
    }

    /// Plain frame; page indices are checked before anything is built
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let op = self.opcode().to_byte();
        let frame = match self {
            Command::GetVersion => vec![op],
            Command::Read { page } => vec![op, check_page(*page)?],
            Command::Write { page, data } => {
                let mut frame = vec![op, check_page(*page)?];
                frame.extend_from_slice(data);
                frame
            }
            Command::Authenticate1 { key_type } => vec![op, key_type.to_byte()],
            Command::Authenticate2 { token } => {
                let mut frame = vec![op];
                frame.extend_from_slice(token);
                frame
            }
        };
        Ok(frame)
    }

    /// Frame followed by the truncated CMAC under `mac`
    pub fn encode_protected(&self, mac: &MacContext<'_>) -> Result<Vec<u8>, CodecError> {
        if !self.is_protectable() {
            return Err(CodecError::NotProtectable(self.opcode()));
        }
        let mut frame = self.encode()?;
        let tag = truncated_mac(mac.key, &mac_input(mac.counter, &frame))?;
        frame.extend_from_slice(&tag);
        Ok(frame)
    }
}

/// `counter_le16 || bytes` as a bit string
pub fn mac_input(counter: u16, bytes: &[u8]) -> BitVector {
    BitVector::from_bytes(&counter.to_le_bytes()).cat(&BitVector::from_bytes(bytes))
}

/// Check for NAK and, under secure messaging, verify and strip the answer MAC
///
/// The answer MAC is computed with `counter + 1`.
pub fn open_response<'r>(
    response: &'r [u8],
    mac: Option<&MacContext<'_>>,
) -> Result<&'r [u8], CodecError> {
    match response {
        [] => {
            return Err(FrameError::UnexpectedLength {
                expected: 1,
                got: 0,
            }
            .into())
        }
        [status] if *status != ACK => return Err(CodecError::Nak(*status)),
        _ => {}
    }

    let Some(ctx) = mac else {
        return Ok(response);
    };
    if response.len() <= MAC_LEN {
        return Err(FrameError::UnexpectedLength {
            expected: MAC_LEN + 1,
            got: response.len(),
        }
        .into());
    }
    let next = ctx
        .counter
        .checked_add(1)
        .ok_or(CodecError::CounterExhausted)?;
    let (data, tag) = response.split_at(response.len() - MAC_LEN);
    verify_truncated(ctx.key, &mac_input(next, data), tag).map_err(|e| match e {
        CmacError::VerificationFailed => CodecError::InvalidResponseCmac,
        other => CodecError::Cmac(other),
    })?;
    Ok(data)
}

fn exact<const N: usize>(data: &[u8]) -> Result<[u8; N], CodecError> {
    data.try_into().map_err(|_| {
        FrameError::UnexpectedLength {
            expected: N,
            got: data.len(),
        }
        .into()
    })
}

pub fn decode_version(data: &[u8]) -> Result<VersionInfo, CodecError> {
    Ok(VersionInfo::parse(data)?)
}

pub fn decode_read(data: &[u8]) -> Result<[u8; READ_LEN], CodecError> {
    exact::<READ_LEN>(data)
}

pub fn decode_ack(data: &[u8]) -> Result<(), CodecError> {
    match data {
        [ACK] => Ok(()),
        [status] => Err(CodecError::UnexpectedStatus(*status)),
        _ => Err(FrameError::UnexpectedLength {
            expected: 1,
            got: data.len(),
        }
        .into()),
    }
}

fn decode_auth(data: &[u8], status: u8) -> Result<[u8; BLOCK_LEN], CodecError> {
    let framed = exact::<{ BLOCK_LEN + 1 }>(data)?;
    if framed[0] != status {
        return Err(CodecError::UnexpectedStatus(framed[0]));
    }
    exact::<BLOCK_LEN>(&framed[1..])
}

/// `AF || E(K, RndB)` from authentication part 1
pub fn decode_auth_challenge(data: &[u8]) -> Result<[u8; BLOCK_LEN], CodecError> {
    decode_auth(data, AUTH_CONTINUE)
}

/// `00 || E(K, RndA')` from authentication part 2
pub fn decode_auth_confirmation(data: &[u8]) -> Result<[u8; BLOCK_LEN], CodecError> {
    decode_auth(data, AUTH_COMPLETE)
}
