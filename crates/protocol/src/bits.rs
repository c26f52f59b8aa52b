//! Bit-addressable vectors
//!
//! A [`BitVector`] is a fixed-length bit string read as an unsigned number:
//! bit 0 is the least significant bit and bit `len - 1` the most significant.
//! Two byte views share the same storage:
//!
//! - big-endian (`gbe`/`sbe`): byte 0 holds the most significant bits. This is
//!   the order bytes travel over the air and the order of [`BitVector::to_bytes`].
//! - little-endian (`gle`/`sle`): byte 0 holds bits 0..8.
//!
//! Lengths are fixed at construction. Index and length violations are
//! reported as [`BitError`]; nothing is truncated or wrapped.

use std::fmt;

use thiserror::Error;

/// Errors raised by [`BitVector`] operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("bit index {index} out of range for a vector of {len} bits")]
    BitOutOfRange { index: usize, len: usize },

    #[error("byte index {index} out of range for a vector of {bytes} bytes")]
    ByteOutOfRange { index: usize, bytes: usize },

    #[error("value 0x{value:02x} does not fit the {width} bits available at byte {index}")]
    ByteOverflow { index: usize, value: u8, width: usize },

    #[error("length mismatch: {left} bits vs {right} bits")]
    LengthMismatch { left: usize, right: usize },

    #[error("invalid slice [{start}, {end}) of a vector of {len} bits")]
    InvalidSlice { start: usize, end: usize, len: usize },
}

/// Fixed-length bit string
///
/// Storage is little-endian and always `ceil(len / 8)` bytes long; bits of
/// the last byte above `len` stay zero.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    len: usize,
    bytes: Vec<u8>,
}

impl BitVector {
    /// Create an all-zero vector of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            len,
            bytes: vec![0u8; len.div_ceil(8)],
        }
    }

    /// Wrap a big-endian byte buffer (`bytes[0]` is the most significant byte)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut storage = bytes.to_vec();
        storage.reverse();
        Self {
            len: bytes.len() * 8,
            bytes: storage,
        }
    }

    /// Wrap a little-endian byte buffer (`bytes[0]` is the least significant byte)
    pub fn from_bytes_le(bytes: &[u8]) -> Self {
        Self {
            len: bytes.len() * 8,
            bytes: bytes.to_vec(),
        }
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of storage bytes, `ceil(len / 8)`
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Read bit `index`
    pub fn get(&self, index: usize) -> Result<bool, BitError> {
        self.check_bit(index)?;
        Ok(self.bit(index))
    }

    /// Write bit `index`
    pub fn set(&mut self, index: usize, value: bool) -> Result<(), BitError> {
        self.check_bit(index)?;
        self.put_bit(index, value);
        Ok(())
    }

    /// Most significant bit, `None` for an empty vector
    pub fn msb(&self) -> Option<bool> {
        self.len.checked_sub(1).map(|top| self.bit(top))
    }

    /// Big-endian byte read: byte 0 is the most significant byte
    pub fn gbe(&self, index: usize) -> Result<u8, BitError> {
        let pos = self.be_position(index)?;
        Ok(self.bytes[pos])
    }

    /// Big-endian byte write
    pub fn sbe(&mut self, index: usize, value: u8) -> Result<(), BitError> {
        let pos = self.be_position(index)?;
        self.store_byte(pos, index, value)
    }

    /// Little-endian byte read: byte 0 is the least significant byte
    pub fn gle(&self, index: usize) -> Result<u8, BitError> {
        self.check_byte(index)?;
        Ok(self.bytes[index])
    }

    /// Little-endian byte write
    pub fn sle(&mut self, index: usize, value: u8) -> Result<(), BitError> {
        self.check_byte(index)?;
        self.store_byte(index, index, value)
    }

    /// Concatenate `self` (high bits) with `low` (low bits)
    ///
    /// The result is `self.len() + low.len()` bits long, so
    /// `a.cat(&b).slice(0, b.len())` yields `b` again.
    pub fn cat(&self, low: &BitVector) -> BitVector {
        let mut out = BitVector::new(self.len + low.len);
        for i in 0..low.len {
            out.put_bit(i, low.bit(i));
        }
        for i in 0..self.len {
            out.put_bit(low.len + i, self.bit(i));
        }
        out
    }

    /// Shift left by `n` bits; bits pushed past the top are dropped and
    /// zeros enter at the bottom
    pub fn shl(&self, n: usize) -> BitVector {
        let mut out = BitVector::new(self.len);
        for i in n..self.len {
            out.put_bit(i, self.bit(i - n));
        }
        out
    }

    /// Rotate left by `n` bits
    pub fn rotl(&self, n: usize) -> BitVector {
        if self.len == 0 {
            return self.clone();
        }
        let n = n % self.len;
        let mut out = BitVector::new(self.len);
        for i in 0..self.len {
            out.put_bit((i + n) % self.len, self.bit(i));
        }
        out
    }

    /// Bitwise XOR of two vectors of equal length
    pub fn xor(&self, other: &BitVector) -> Result<BitVector, BitError> {
        if self.len != other.len {
            return Err(BitError::LengthMismatch {
                left: self.len,
                right: other.len,
            });
        }
        let bytes = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        Ok(BitVector {
            len: self.len,
            bytes,
        })
    }

    /// Bits `[start, end)` as a new vector; `start == end` gives an empty vector
    pub fn slice(&self, start: usize, end: usize) -> Result<BitVector, BitError> {
        if start > end || end > self.len {
            return Err(BitError::InvalidSlice {
                start,
                end,
                len: self.len,
            });
        }
        let mut out = BitVector::new(end - start);
        for i in 0..out.len {
            out.put_bit(i, self.bit(start + i));
        }
        Ok(out)
    }

    /// Big-endian byte rendering (inverse of [`BitVector::from_bytes`])
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.bytes.clone();
        out.reverse();
        out
    }

    /// Little-endian byte rendering
    pub fn to_bytes_le(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Lowercase hex of the big-endian bytes
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn check_bit(&self, index: usize) -> Result<(), BitError> {
        if index >= self.len {
            return Err(BitError::BitOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    fn check_byte(&self, index: usize) -> Result<(), BitError> {
        if index >= self.bytes.len() {
            return Err(BitError::ByteOutOfRange {
                index,
                bytes: self.bytes.len(),
            });
        }
        Ok(())
    }

    fn be_position(&self, index: usize) -> Result<usize, BitError> {
        self.check_byte(index)?;
        Ok(self.bytes.len() - 1 - index)
    }

    /// Store `value` at storage position `pos`, refusing bits above `len`
    fn store_byte(&mut self, pos: usize, index: usize, value: u8) -> Result<(), BitError> {
        let width = (self.len - pos * 8).min(8);
        if width < 8 && value >> width != 0 {
            return Err(BitError::ByteOverflow {
                index,
                value,
                width,
            });
        }
        self.bytes[pos] = value;
        Ok(())
    }

    // Callers guarantee `index < len`.
    fn bit(&self, index: usize) -> bool {
        (self.bytes[index / 8] >> (index % 8)) & 1 == 1
    }

    fn put_bit(&mut self, index: usize, value: bool) {
        let mask = 1u8 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({} bits, 0x{})", self.len, self.to_hex())
    }
}
