//! Consensus proposal messages.

use crate::{BlockId, Signature, Timestamp, ValidationError};
use bytes::{Buf, BufMut};
use valharness_codec::{union_unique, EncodeSize, Error as CodecError, Read, Write};

/// Signed-message type discriminant for proposals.
pub const PROPOSAL_TYPE: u8 = 32;

/// A proposal for a block at a given height and round.
///
/// `pol_round` is the proof-of-lock round: `-1` means the proposer holds no
/// lock from a prior round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub height: i64,
    pub round: i32,
    pub pol_round: i32,
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub signature: Option<Signature>,
}

impl Proposal {
    /// Builds an unsigned proposal.
    pub fn new(
        height: i64,
        round: i32,
        pol_round: i32,
        block_id: BlockId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            height,
            round,
            pol_round,
            block_id,
            timestamp,
            signature: None,
        }
    }

    /// Checks stateless validity of a signed proposal.
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.height < 0 {
            return Err(ValidationError::NegativeHeight(self.height));
        }
        if self.round < 0 {
            return Err(ValidationError::NegativeRound(self.round));
        }
        if self.pol_round < -1 {
            return Err(ValidationError::InvalidPolRound(self.pol_round));
        }
        self.block_id.validate()?;
        if self.signature.is_none() {
            return Err(ValidationError::MissingSignature);
        }
        Ok(())
    }

    /// The canonical bytes a signature over this proposal commits to, scoped
    /// to `chain_id`.
    ///
    /// The signature field is deliberately excluded so the same bytes are
    /// produced before and after signing.
    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            1 + self.height.encode_size()
                + self.round.encode_size()
                + self.pol_round.encode_size()
                + self.block_id.encode_size()
                + self.timestamp.encode_size(),
        );
        PROPOSAL_TYPE.write(&mut buf);
        self.height.write(&mut buf);
        self.round.write(&mut buf);
        self.pol_round.write(&mut buf);
        self.block_id.write(&mut buf);
        self.timestamp.write(&mut buf);
        union_unique(chain_id.as_bytes(), &buf)
    }
}

impl Write for Proposal {
    fn write(&self, buf: &mut impl BufMut) {
        self.height.write(buf);
        self.round.write(buf);
        self.pol_round.write(buf);
        self.block_id.write(buf);
        self.timestamp.write(buf);
        self.signature.write(buf);
    }
}

impl EncodeSize for Proposal {
    fn encode_size(&self) -> usize {
        self.height.encode_size()
            + self.round.encode_size()
            + self.pol_round.encode_size()
            + self.block_id.encode_size()
            + self.timestamp.encode_size()
            + self.signature.encode_size()
    }
}

impl Read for Proposal {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let height = i64::read(buf)?;
        let round = i32::read(buf)?;
        let pol_round = i32::read(buf)?;
        let block_id = BlockId::read(buf)?;
        let timestamp = Timestamp::read(buf)?;
        let signature = Option::<Signature>::read(buf)?;
        Ok(Self {
            height,
            round,
            pol_round,
            block_id,
            timestamp,
            signature,
        })
    }
}
