//! Request/response messages exchanged with a remote signer.
//!
//! Messages are carried in length-prefixed frames; the encoding here is only
//! the frame payload (a tag byte followed by the message body).

use crate::{Proposal, PublicKey, Vote};
use bytes::{Buf, BufMut};
use valharness_codec::{EncodeSize, Error as CodecError, Read, Write};

/// Messages sent by the validator side to the remote signer.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Ask for the signer's public key.
    PubKey,
    /// Ask the signer to sign a proposal for the given chain.
    SignProposal { chain_id: String, proposal: Proposal },
    /// Ask the signer to sign a vote for the given chain.
    SignVote { chain_id: String, vote: Vote },
    /// Liveness probe.
    Ping,
    /// Best-effort request that the signer terminate its session. Carries no
    /// response.
    PoisonPill,
}

impl Write for Request {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::PubKey => 0u8.write(buf),
            Self::SignProposal { chain_id, proposal } => {
                1u8.write(buf);
                chain_id.write(buf);
                proposal.write(buf);
            }
            Self::SignVote { chain_id, vote } => {
                2u8.write(buf);
                chain_id.write(buf);
                vote.write(buf);
            }
            Self::Ping => 3u8.write(buf),
            Self::PoisonPill => 4u8.write(buf),
        }
    }
}

impl EncodeSize for Request {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::PubKey | Self::Ping | Self::PoisonPill => 0,
            Self::SignProposal { chain_id, proposal } => {
                chain_id.encode_size() + proposal.encode_size()
            }
            Self::SignVote { chain_id, vote } => chain_id.encode_size() + vote.encode_size(),
        }
    }
}

impl Read for Request {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            0 => Ok(Self::PubKey),
            1 => {
                let chain_id = String::read(buf)?;
                let proposal = Proposal::read(buf)?;
                Ok(Self::SignProposal { chain_id, proposal })
            }
            2 => {
                let chain_id = String::read(buf)?;
                let vote = Vote::read(buf)?;
                Ok(Self::SignVote { chain_id, vote })
            }
            3 => Ok(Self::Ping),
            4 => Ok(Self::PoisonPill),
            _ => Err(CodecError::Invalid("Request", "unknown tag")),
        }
    }
}

/// Messages sent by the remote signer back to the validator side.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    PubKey(PublicKey),
    SignedProposal(Proposal),
    SignedVote(Vote),
    Pong,
    /// The signer refused or failed to serve the request.
    Error(String),
}

impl Write for Response {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::PubKey(public_key) => {
                0u8.write(buf);
                public_key.write(buf);
            }
            Self::SignedProposal(proposal) => {
                1u8.write(buf);
                proposal.write(buf);
            }
            Self::SignedVote(vote) => {
                2u8.write(buf);
                vote.write(buf);
            }
            Self::Pong => 3u8.write(buf),
            Self::Error(description) => {
                4u8.write(buf);
                description.write(buf);
            }
        }
    }
}

impl EncodeSize for Response {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::PubKey(public_key) => public_key.encode_size(),
            Self::SignedProposal(proposal) => proposal.encode_size(),
            Self::SignedVote(vote) => vote.encode_size(),
            Self::Pong => 0,
            Self::Error(description) => description.encode_size(),
        }
    }
}

impl Read for Response {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            0 => Ok(Self::PubKey(PublicKey::read(buf)?)),
            1 => Ok(Self::SignedProposal(Proposal::read(buf)?)),
            2 => Ok(Self::SignedVote(Vote::read(buf)?)),
            3 => Ok(Self::Pong),
            4 => Ok(Self::Error(String::read(buf)?)),
            _ => Err(CodecError::Invalid("Response", "unknown tag")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sha256, BlockId, Ed25519, Timestamp, VoteType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use valharness_codec::{Decode, Encode};

    #[test]
    fn test_request_roundtrip() {
        let proposal = Proposal::new(
            1,
            0,
            -1,
            BlockId::from_digest(sha256::hash(b"hash"), 4),
            Timestamp { secs: 10, nanos: 0 },
        );
        let request = Request::SignProposal {
            chain_id: "chain-a".into(),
            proposal,
        };
        assert_eq!(Request::decode(&request.encode()[..]).unwrap(), request);
        assert_eq!(
            Request::decode(&Request::PoisonPill.encode()[..]).unwrap(),
            Request::PoisonPill
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let signer = Ed25519::generate(&mut StdRng::seed_from_u64(0));
        let response = Response::PubKey(signer.public_key());
        assert_eq!(Response::decode(&response.encode()[..]).unwrap(), response);

        let mut vote = Vote::new(
            VoteType::Prevote,
            1,
            0,
            BlockId::from_digest(sha256::hash(b"hash"), 4),
            Timestamp { secs: 10, nanos: 0 },
            sha256::address_hash(b"addr").to_vec(),
            0,
        );
        vote.signature = Some(signer.sign(&vote.sign_bytes("chain-a")));
        let response = Response::SignedVote(vote);
        assert_eq!(Response::decode(&response.encode()[..]).unwrap(), response);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(
            Request::decode(&[9u8][..]),
            Err(CodecError::Invalid("Request", _))
        ));
        assert!(matches!(
            Response::decode(&[9u8][..]),
            Err(CodecError::Invalid("Response", _))
        ));
    }
}
