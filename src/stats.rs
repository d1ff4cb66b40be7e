//! Process-wide operability counters.
//!
//! Exported under stable names: `Total $set`, `Total $unset`,
//! `Total complete objects` and `Last optime seen`. Initialized at process
//! start, never torn down.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::OpTime;

static SETS: AtomicU64 = AtomicU64::new(0);
static UNSETS: AtomicU64 = AtomicU64::new(0);
static COMPLETE: AtomicU64 = AtomicU64::new(0);
static DROPPED: AtomicU64 = AtomicU64::new(0);
static LAST_OPTIME: AtomicU64 = AtomicU64::new(0);

pub const SETS_NAME: &str = "Total $set";
pub const UNSETS_NAME: &str = "Total $unset";
pub const COMPLETE_NAME: &str = "Total complete objects";
pub const LAST_OPTIME_NAME: &str = "Last optime seen";

pub fn add_set() {
    SETS.fetch_add(1, Ordering::Relaxed);
}

pub fn add_unset() {
    UNSETS.fetch_add(1, Ordering::Relaxed);
}

pub fn add_complete() {
    COMPLETE.fetch_add(1, Ordering::Relaxed);
}

pub fn add_dropped() {
    DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn set_last_optime(t: OpTime) {
    LAST_OPTIME.store(t.as_u64(), Ordering::Relaxed);
}

/// Read-only view of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sets: u64,
    pub unsets: u64,
    pub complete: u64,
    pub dropped: u64,
    pub last_optime: OpTime,
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}, {}: {}, {}: {}, {}: {}",
            SETS_NAME,
            self.sets,
            UNSETS_NAME,
            self.unsets,
            COMPLETE_NAME,
            self.complete,
            LAST_OPTIME_NAME,
            self.last_optime
        )
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sets: SETS.load(Ordering::Relaxed),
        unsets: UNSETS.load(Ordering::Relaxed),
        complete: COMPLETE.load(Ordering::Relaxed),
        dropped: DROPPED.load(Ordering::Relaxed),
        last_optime: OpTime::from_u64(LAST_OPTIME.load(Ordering::Relaxed)),
    }
}

/// Emit all counters through tracing.
pub fn report() {
    let s = snapshot();
    info!(dropped = s.dropped, "{}", s);
}
