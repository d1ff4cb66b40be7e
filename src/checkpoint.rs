//! Durable progress tracking: the most recent optime confirmed handed to
//! the sink-side batch, persisted once a second.

use crossbeam::channel::{tick, Receiver};
use crossbeam::select;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::optime::OpTime;
use crate::stats;

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Read the resume point left behind by a previous run. A missing file
/// means no resume point; so does an unparseable one. Neither is fatal.
pub fn load_optime(path: &Path) -> Option<OpTime> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            info!(?path, %e, "Failed to load previous optime, starting without a resume point. ");
            return None;
        }
    };
    match OpTime::load(&mut f) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(?path, %e, "Saved optime is unreadable, starting without a resume point. ");
            None
        }
    }
}

/// Single-writer coordinator persisting confirmed optimes.
///
/// Consumes from a 1-slot channel and flushes at 1 Hz, so on a crash at
/// most one second of already-delivered operations is re-read on restart.
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Checkpointer {
        Checkpointer { path: path.into() }
    }

    /// Run until `confirmed` closes. Any pending value is flushed on the
    /// way out.
    pub fn run(&self, confirmed: Receiver<OpTime>) {
        let ticker = tick(FLUSH_INTERVAL);
        let mut pending: Option<OpTime> = None;
        loop {
            select! {
                recv(confirmed) -> msg => match msg {
                    Ok(t) => pending = Some(t),
                    Err(_) => {
                        if let Some(t) = pending.take() {
                            self.flush_logged(t);
                        }
                        return;
                    }
                },
                recv(ticker) -> _ => {
                    if let Some(t) = pending.take() {
                        if !self.flush_logged(t) {
                            // keep it for the next tick.
                            pending = Some(t);
                        }
                    }
                }
            }
        }
    }

    fn flush_logged(&self, t: OpTime) -> bool {
        match self.flush(t) {
            Ok(()) => {
                stats::set_last_optime(t);
                true
            }
            Err(e) => {
                error!(?e, "Error saving oplog timestamp. ");
                false
            }
        }
    }

    /// Atomic overwrite: sibling temp file, fsync, rename over the live
    /// file.
    fn flush(&self, t: OpTime) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let mut f = File::create(&tmp)?;
        t.save(&mut f)?;
        f.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
