//! Variable-length integer encoding and decoding.
//!
//! Implements Google's Protocol Buffers variable-length integer encoding for
//! `u64`: each byte carries 7 bits of value and a continuation bit. Lengths
//! on the wire are biased towards small values, so varints keep frames
//! compact without sacrificing the 64-bit range.

use crate::Error;
use bytes::{Buf, BufMut};

const DATA_BITS_PER_BYTE: usize = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// Maximum number of bytes in the encoding of a `u64`.
pub const MAX_LEN: usize = 10;

/// Writes `value` to the buffer as a varint.
pub fn write(mut value: u64, buf: &mut impl BufMut) {
    while value >= CONTINUATION_BIT_MASK as u64 {
        buf.put_u8((value as u8 & DATA_BITS_MASK) | CONTINUATION_BIT_MASK);
        value >>= DATA_BITS_PER_BYTE;
    }
    buf.put_u8(value as u8);
}

/// Reads a varint-encoded `u64` from the buffer.
///
/// Rejects encodings longer than [MAX_LEN] bytes and non-canonical trailing
/// zero bytes (two distinct encodings of the same value would break
/// sign-bytes determinism).
pub fn read(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut value: u64 = 0;
    for index in 0..MAX_LEN {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();
        let data = byte & DATA_BITS_MASK;
        let shift = index * DATA_BITS_PER_BYTE;
        // The tenth byte may only contribute a single bit.
        if index == MAX_LEN - 1 && byte > 1 {
            return Err(Error::InvalidVarint);
        }
        value |= (data as u64) << shift;
        if byte & CONTINUATION_BIT_MASK == 0 {
            if index > 0 && data == 0 {
                return Err(Error::InvalidVarint);
            }
            return Ok(value);
        }
    }
    Err(Error::InvalidVarint)
}

/// Returns the number of bytes `write` produces for `value`.
pub fn size(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(DATA_BITS_PER_BYTE)
}
