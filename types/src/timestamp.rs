//! Canonical message timestamps.

use bytes::{Buf, BufMut};
use std::time::{SystemTime, UNIX_EPOCH};
use valharness_codec::{EncodeSize, Error as CodecError, Read, Write};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// A wall-clock instant with a fixed canonical encoding (seconds since the
/// Unix epoch plus a sub-second nanosecond component).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system(SystemTime::now())
    }

    /// Converts a [SystemTime]; instants before the epoch clamp to the epoch.
    pub fn from_system(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => Self {
                secs: elapsed.as_secs() as i64,
                nanos: elapsed.subsec_nanos(),
            },
            Err(_) => Self { secs: 0, nanos: 0 },
        }
    }
}

impl Write for Timestamp {
    fn write(&self, buf: &mut impl BufMut) {
        self.secs.write(buf);
        self.nanos.write(buf);
    }
}

impl EncodeSize for Timestamp {
    fn encode_size(&self) -> usize {
        self.secs.encode_size() + self.nanos.encode_size()
    }
}

impl Read for Timestamp {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let secs = i64::read(buf)?;
        let nanos = u32::read(buf)?;
        if nanos >= NANOS_PER_SECOND {
            return Err(CodecError::Invalid("Timestamp", "nanos out of range"));
        }
        Ok(Self { secs, nanos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valharness_codec::{Decode, Encode};

    #[test]
    fn test_roundtrip() {
        let timestamp = Timestamp {
            secs: 1_700_000_000,
            nanos: 123_456_789,
        };
        assert_eq!(
            Timestamp::decode(&timestamp.encode()[..]).unwrap(),
            timestamp
        );
    }

    #[test]
    fn test_rejects_overflowing_nanos() {
        let mut buf = Vec::new();
        0i64.write(&mut buf);
        NANOS_PER_SECOND.write(&mut buf);
        assert!(matches!(
            Timestamp::decode(&buf[..]),
            Err(CodecError::Invalid("Timestamp", _))
        ));
    }
}
