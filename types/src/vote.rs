//! Consensus vote messages.

use crate::{sha256, BlockId, Signature, Timestamp, ValidationError};
use bytes::{Buf, BufMut};
use std::fmt::{Display, Formatter};
use valharness_codec::{union_unique, EncodeSize, Error as CodecError, Read, Write};

/// The kind of vote being cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteType {
    Prevote = 1,
    Precommit = 2,
}

impl VoteType {
    /// Every vote subtype a remote signer must support, in protocol order.
    pub const ALL: [VoteType; 2] = [VoteType::Prevote, VoteType::Precommit];
}

impl Display for VoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteType::Prevote => write!(f, "prevote"),
            VoteType::Precommit => write!(f, "precommit"),
        }
    }
}

impl Write for VoteType {
    fn write(&self, buf: &mut impl BufMut) {
        (*self as u8).write(buf);
    }
}

impl EncodeSize for VoteType {
    fn encode_size(&self) -> usize {
        1
    }
}

impl Read for VoteType {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            1 => Ok(VoteType::Prevote),
            2 => Ok(VoteType::Precommit),
            _ => Err(CodecError::Invalid("VoteType", "unknown discriminant")),
        }
    }
}

/// A validator's vote over a block at a given height and round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub vote_type: VoteType,
    pub height: i64,
    pub round: i32,
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub validator_address: Vec<u8>,
    pub validator_index: i32,
    pub signature: Option<Signature>,
}

impl Vote {
    /// Builds an unsigned vote.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vote_type: VoteType,
        height: i64,
        round: i32,
        block_id: BlockId,
        timestamp: Timestamp,
        validator_address: Vec<u8>,
        validator_index: i32,
    ) -> Self {
        Self {
            vote_type,
            height,
            round,
            block_id,
            timestamp,
            validator_address,
            validator_index,
            signature: None,
        }
    }

    /// Checks stateless validity of a signed vote.
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.height < 0 {
            return Err(ValidationError::NegativeHeight(self.height));
        }
        if self.round < 0 {
            return Err(ValidationError::NegativeRound(self.round));
        }
        self.block_id.validate()?;
        if self.validator_address.len() != sha256::ADDRESS_LENGTH {
            return Err(ValidationError::InvalidAddressLength {
                expected: sha256::ADDRESS_LENGTH,
                got: self.validator_address.len(),
            });
        }
        if self.validator_index < 0 {
            return Err(ValidationError::NegativeValidatorIndex(
                self.validator_index,
            ));
        }
        if self.signature.is_none() {
            return Err(ValidationError::MissingSignature);
        }
        Ok(())
    }

    /// The canonical bytes a signature over this vote commits to, scoped to
    /// `chain_id`.
    ///
    /// The validator address and index identify the voter, not the vote, and
    /// are excluded along with the signature.
    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            self.vote_type.encode_size()
                + self.height.encode_size()
                + self.round.encode_size()
                + self.block_id.encode_size()
                + self.timestamp.encode_size(),
        );
        self.vote_type.write(&mut buf);
        self.height.write(&mut buf);
        self.round.write(&mut buf);
        self.block_id.write(&mut buf);
        self.timestamp.write(&mut buf);
        union_unique(chain_id.as_bytes(), &buf)
    }
}

impl Write for Vote {
    fn write(&self, buf: &mut impl BufMut) {
        self.vote_type.write(buf);
        self.height.write(buf);
        self.round.write(buf);
        self.block_id.write(buf);
        self.timestamp.write(buf);
        self.validator_address.write(buf);
        self.validator_index.write(buf);
        self.signature.write(buf);
    }
}

impl EncodeSize for Vote {
    fn encode_size(&self) -> usize {
        self.vote_type.encode_size()
            + self.height.encode_size()
            + self.round.encode_size()
            + self.block_id.encode_size()
            + self.timestamp.encode_size()
            + self.validator_address.encode_size()
            + self.validator_index.encode_size()
            + self.signature.encode_size()
    }
}

impl Read for Vote {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let vote_type = VoteType::read(buf)?;
        let height = i64::read(buf)?;
        let round = i32::read(buf)?;
        let block_id = BlockId::read(buf)?;
        let timestamp = Timestamp::read(buf)?;
        let validator_address = Vec::<u8>::read(buf)?;
        let validator_index = i32::read(buf)?;
        let signature = Option::<Signature>::read(buf)?;
        Ok(Self {
            vote_type,
            height,
            round,
            block_id,
            timestamp,
            validator_address,
            validator_index,
            signature,
        })
    }
}
