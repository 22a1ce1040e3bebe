//! Block identification.

use crate::{sha256, ValidationError};
use bytes::{Buf, BufMut};
use valharness_codec::{EncodeSize, Error as CodecError, Read, Write};

/// Identifies the parts a block was split into for gossip: a hash over the
/// part set plus the number of parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartSetHeader {
    pub total: i32,
    pub hash: Vec<u8>,
}

impl PartSetHeader {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total < 0 {
            return Err(ValidationError::NegativePartTotal(self.total));
        }
        if self.hash.len() != sha256::DIGEST_LENGTH {
            return Err(ValidationError::InvalidHashLength {
                expected: sha256::DIGEST_LENGTH,
                got: self.hash.len(),
            });
        }
        Ok(())
    }
}

impl Write for PartSetHeader {
    fn write(&self, buf: &mut impl BufMut) {
        self.total.write(buf);
        self.hash.write(buf);
    }
}

impl EncodeSize for PartSetHeader {
    fn encode_size(&self) -> usize {
        self.total.encode_size() + self.hash.encode_size()
    }
}

impl Read for PartSetHeader {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let total = i32::read(buf)?;
        let hash = Vec::<u8>::read(buf)?;
        Ok(Self { total, hash })
    }
}

/// Identifies a block by content hash without transmitting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockId {
    pub hash: Vec<u8>,
    pub parts: PartSetHeader,
}

impl BlockId {
    /// Builds a block id whose block and part-set hashes are both `digest`,
    /// split into `total` parts.
    pub fn from_digest(digest: [u8; sha256::DIGEST_LENGTH], total: i32) -> Self {
        Self {
            hash: digest.to_vec(),
            parts: PartSetHeader {
                total,
                hash: digest.to_vec(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hash.len() != sha256::DIGEST_LENGTH {
            return Err(ValidationError::InvalidHashLength {
                expected: sha256::DIGEST_LENGTH,
                got: self.hash.len(),
            });
        }
        self.parts.validate()
    }
}

impl Write for BlockId {
    fn write(&self, buf: &mut impl BufMut) {
        self.hash.write(buf);
        self.parts.write(buf);
    }
}

impl EncodeSize for BlockId {
    fn encode_size(&self) -> usize {
        self.hash.encode_size() + self.parts.encode_size()
    }
}

impl Read for BlockId {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let hash = Vec::<u8>::read(buf)?;
        let parts = PartSetHeader::read(buf)?;
        Ok(Self { hash, parts })
    }
}
