//! The packed 64-bit timestamp mongodb uses to order oplog entries.
//!
//! The high 32 bits are seconds since the epoch, the low 32 bits are a
//! counter that keeps entries written within the same second unique.
//! Comparison is unsigned comparison of the packed value, so oplog order is
//! plain `Ord` here.

use bson::Timestamp;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::io::{Read, Write};

use crate::Result;

/// One oplog ordering token, carried through the pipeline unchanged and
/// persisted as its decimal form by the checkpoint coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OpTime(u64);

impl OpTime {
    pub const ZERO: OpTime = OpTime(0);

    pub fn new(time: u32, ordinal: u32) -> OpTime {
        OpTime(((time as u64) << 32) | ordinal as u64)
    }

    pub fn from_u64(packed: u64) -> OpTime {
        OpTime(packed)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Wall clock time in UTC. Only the seconds half contributes, the
    /// ordinal never shifts the clock.
    pub fn time(&self) -> DateTime<Utc> {
        // seconds fit in u32, so the conversion can't be out of range.
        Utc.timestamp_opt((self.0 >> 32) as i64, 0).unwrap()
    }

    /// The counter half of the timestamp.
    pub fn ordinal(&self) -> u32 {
        self.0 as u32
    }

    /// Write the decimal form exhaustively.
    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(self.0.to_string().as_bytes())?;
        Ok(())
    }

    /// Read `r` to end-of-stream and parse the decimal form.
    pub fn load<R: Read>(r: &mut R) -> Result<OpTime> {
        let mut buf = String::new();
        r.read_to_string(&mut buf)?;
        Ok(OpTime(buf.trim().parse::<u64>()?))
    }
}

impl From<Timestamp> for OpTime {
    fn from(ts: Timestamp) -> OpTime {
        OpTime::new(ts.time, ts.increment)
    }
}

impl From<OpTime> for Timestamp {
    fn from(t: OpTime) -> Timestamp {
        Timestamp {
            time: (t.0 >> 32) as u32,
            increment: t.0 as u32,
        }
    }
}

impl fmt::Display for OpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Ordinal: {}", self.time(), self.ordinal())
    }
}
