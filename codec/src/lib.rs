//! Serialize structured data into a canonical binary form.
//!
//! Every message a remote signer signs (and every request exchanged with it)
//! is encoded through the traits in this crate. Encoding is deterministic:
//! the same value always produces the same bytes, which is what makes
//! signature verification over independently reconstructed sign-bytes
//! meaningful.
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use valharness_codec::{Decode, Encode, EncodeSize, Error, Read, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Point {
//!     x: u32,
//!     y: u32,
//! }
//!
//! impl Write for Point {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.x.write(buf);
//!         self.y.write(buf);
//!     }
//! }
//!
//! impl EncodeSize for Point {
//!     fn encode_size(&self) -> usize {
//!         self.x.encode_size() + self.y.encode_size()
//!     }
//! }
//!
//! impl Read for Point {
//!     fn read(buf: &mut impl Buf) -> Result<Self, Error> {
//!         let x = u32::read(buf)?;
//!         let y = u32::read(buf)?;
//!         Ok(Self { x, y })
//!     }
//! }
//!
//! let point = Point { x: 7, y: 11 };
//! let encoded = point.encode();
//! assert_eq!(Point::decode(&encoded[..]).unwrap(), point);
//! ```

use bytes::{Buf, BufMut};

mod error;
pub use error::Error;
mod hex;
pub use hex::{from_hex, from_hex_formatted, hex};
mod primitives;
pub mod varint;

/// Trait for types that can be written (encoded) to a buffer.
pub trait Write {
    /// Encodes this value by writing to a buffer.
    fn write(&self, buf: &mut impl BufMut);
}

/// Trait for types that know the exact length of their encoding.
pub trait EncodeSize {
    /// The number of bytes `write` will produce for this value.
    fn encode_size(&self) -> usize;
}

/// Trait for types that can be encoded to an owned buffer.
pub trait Encode: Write + EncodeSize {
    /// Encodes a value to a `Vec<u8>`.
    ///
    /// Panics if the `write` implementation does not produce exactly
    /// `encode_size` bytes (a determinism bug in the implementation).
    fn encode(&self) -> Vec<u8> {
        let size = self.encode_size();
        let mut buf = Vec::with_capacity(size);
        self.write(&mut buf);
        assert_eq!(buf.len(), size, "write() did not write expected bytes");
        buf
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Trait for types that can be read (decoded) from a buffer.
pub trait Read: Sized {
    /// Reads a value from the buffer, consuming the necessary bytes.
    ///
    /// Implementations must bound any allocation by the bytes remaining in
    /// the buffer; callers cap the size of untrusted input (e.g. a network
    /// frame) before handing it to `read`.
    fn read(buf: &mut impl Buf) -> Result<Self, Error>;
}

/// Trait for types that can be decoded from a buffer, ensuring the entire
/// buffer is consumed.
pub trait Decode: Read {
    /// Decodes a value from a buffer, rejecting trailing bytes.
    fn decode(mut buf: impl Buf) -> Result<Self, Error> {
        let result = Self::read(&mut buf)?;
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }
        Ok(result)
    }
}

impl<T: Read> Decode for T {}

/// Returns an error if the buffer has fewer than `size` bytes remaining.
pub fn at_least(buf: &impl Buf, size: usize) -> Result<(), Error> {
    if buf.remaining() < size {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}

/// Concatenate a namespace and a message, prepended by a varint encoding of
/// the namespace length.
///
/// This produces a unique byte sequence (no collisions) for each
/// `(namespace, msg)` pair, and is how sign-bytes are scoped to a chain
/// identifier.
pub fn union_unique(namespace: &[u8], msg: &[u8]) -> Vec<u8> {
    let ns_len = namespace.len() as u64;
    let mut result = Vec::with_capacity(varint::size(ns_len) + namespace.len() + msg.len());
    varint::write(ns_len, &mut result);
    result.extend_from_slice(namespace);
    result.extend_from_slice(msg);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_extra_data() {
        let buf = [0u8, 0, 0, 7, 9];
        assert_eq!(u32::decode(&buf[..4]).unwrap(), 7);
        assert!(matches!(u32::decode(&buf[..]), Err(Error::ExtraData(1))));
    }

    #[test]
    fn test_union_unique() {
        // Shifting bytes between namespace and message must change the
        // encoding, otherwise namespacing is meaningless.
        let a = union_unique(b"chain-1", b"payload");
        let b = union_unique(b"chain-1p", b"ayload");
        assert_ne!(a, b);
        assert_eq!(a, union_unique(b"chain-1", b"payload"));
    }

    #[test]
    fn test_union_unique_empty_namespace() {
        let joined = union_unique(b"", b"msg");
        assert_eq!(joined, [&[0u8][..], b"msg"].concat());
    }
}
