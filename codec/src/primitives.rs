//! Codec implementations for primitive types.
//!
//! All fixed-size integers are written big-endian to avoid host-endian
//! ambiguity. Variable-length collections (`Vec<u8>`, `String`) are prefixed
//! with a varint length.

use crate::{at_least, varint, EncodeSize, Error, Read, Write};
use bytes::{Buf, BufMut};

macro_rules! impl_numeric {
    ($type:ty, $read_method:ident, $write_method:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }
        }

        impl EncodeSize for $type {
            #[inline]
            fn encode_size(&self) -> usize {
                std::mem::size_of::<$type>()
            }
        }

        impl Read for $type {
            #[inline]
            fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$read_method())
            }
        }
    };
}

impl_numeric!(u8, get_u8, put_u8);
impl_numeric!(u32, get_u32, put_u32);
impl_numeric!(u64, get_u64, put_u64);
impl_numeric!(i32, get_i32, put_i32);
impl_numeric!(i64, get_i64, put_i64);

impl Write for bool {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(if *self { 1 } else { 0 });
    }
}

impl EncodeSize for bool {
    #[inline]
    fn encode_size(&self) -> usize {
        1
    }
}

impl Read for bool {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidBool),
        }
    }
}

impl<const N: usize> Write for [u8; N] {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> EncodeSize for [u8; N] {
    #[inline]
    fn encode_size(&self) -> usize {
        N
    }
}

impl<const N: usize> Read for [u8; N] {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        at_least(buf, N)?;
        let mut out = [0u8; N];
        buf.copy_to_slice(&mut out);
        Ok(out)
    }
}

impl<T: Write> Write for Option<T> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Some(value) => {
                true.write(buf);
                value.write(buf);
            }
            None => false.write(buf),
        }
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    fn encode_size(&self) -> usize {
        match self {
            Some(value) => 1 + value.encode_size(),
            None => 1,
        }
    }
}

impl<T: Read> Read for Option<T> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        if bool::read(buf)? {
            Ok(Some(T::read(buf)?))
        } else {
            Ok(None)
        }
    }
}

impl Write for Vec<u8> {
    fn write(&self, buf: &mut impl BufMut) {
        varint::write(self.len() as u64, buf);
        buf.put_slice(self);
    }
}

impl EncodeSize for Vec<u8> {
    fn encode_size(&self) -> usize {
        varint::size(self.len() as u64) + self.len()
    }
}

impl Read for Vec<u8> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let len = varint::read(buf)?;
        // Bounding by the remaining bytes keeps a hostile length prefix from
        // forcing an oversized allocation.
        let len = usize::try_from(len).map_err(|_| Error::InvalidVarint)?;
        at_least(buf, len)?;
        let mut out = vec![0u8; len];
        buf.copy_to_slice(&mut out);
        Ok(out)
    }
}

impl Write for String {
    fn write(&self, buf: &mut impl BufMut) {
        varint::write(self.len() as u64, buf);
        buf.put_slice(self.as_bytes());
    }
}

impl EncodeSize for String {
    fn encode_size(&self) -> usize {
        varint::size(self.len() as u64) + self.len()
    }
}

impl Read for String {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let bytes = Vec::<u8>::read(buf)?;
        String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid utf-8"))
    }
}
