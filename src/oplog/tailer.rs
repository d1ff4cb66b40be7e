//! Tailing of the oplog on one server.

use bson::{doc, Document};
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use crossbeam::select;
use mongodb::options::{CursorType, FindOptions};
use mongodb::sync::Client;
use std::time::Duration;
use tracing::{info, warn};

use super::entry::OplogEntry;
use super::helper;
use crate::error::{Result, RiverError};
use crate::optime::OpTime;
use crate::{NAMESPACE_KEY, OPLOG_COLL, OPLOG_DB, TIMESTAMP_KEY};

/// Upper bound for one server-side await while the oplog is idle. The
/// driver keeps issuing getMores underneath, this only caps each round
/// trip.
const AWAIT_TIME: Duration = Duration::from_secs(1);

/// Send an ordered, at-least-once stream of oplog entries matching
/// `namespace` onto `records`, closing it on return.
///
/// With `initial` set, or without a usable resume point, a full snapshot of
/// the target collection is emitted first as synthetic inserts; the tail
/// then begins strictly after the oplog head observed at snapshot start.
/// `stop` is the cancellation signal (closed by the orchestrator) and is
/// observed at every hand-off. A cursor parked in a server-side await with
/// nothing arriving can't see it; the orchestrator bounds its wait for this
/// function's result instead of joining the thread.
pub fn tail(
    client: &Client,
    namespace: &str,
    initial: bool,
    resume_from: Option<OpTime>,
    records: Sender<OplogEntry>,
    stop: Receiver<()>,
) -> Result<()> {
    let oplog_coll = client.database(OPLOG_DB).collection::<Document>(OPLOG_COLL);

    let mut resume = resume_from.unwrap_or(OpTime::ZERO);
    if initial || resume.is_zero() {
        // Adopt the current oplog head before snapshotting, so the tail
        // afterwards begins strictly after everything the snapshot saw.
        resume = helper::get_latest_ts(&oplog_coll)?;
        info!(%resume, namespace, "Begin initial snapshot. ");
        if !snapshot(client, namespace, &records, &stop)? {
            return Ok(());
        }
        info!(namespace, "Initial snapshot complete. ");
    }

    let filter = doc! {
        NAMESPACE_KEY: namespace,
        TIMESTAMP_KEY: { "$gt": bson::Timestamp::from(resume) },
    };
    let options = FindOptions::builder()
        .cursor_type(CursorType::TailableAwait)
        .no_cursor_timeout(true)
        .max_await_time(AWAIT_TIME)
        .build();
    let mut cursor = oplog_coll.find(filter, options)?;
    info!(%resume, namespace, "Tailing oplog. ");

    loop {
        match cursor.next() {
            Some(Ok(doc)) => {
                let entry = match OplogEntry::from_doc(doc) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(?e, "Skipping undecodable oplog entry. ");
                        continue;
                    }
                };
                select! {
                    send(records, entry) -> res => {
                        if res.is_err() {
                            return Ok(());
                        }
                    }
                    recv(stop) -> _ => return Ok(()),
                }
            }
            Some(Err(e)) => {
                if stopped(&stop) {
                    return Ok(());
                }
                return Err(RiverError::from(e));
            }
            // A tailable cursor only runs dry once the server has killed
            // it; that is the normal end of this stream.
            None => return Ok(()),
        }
    }
}

/// Emit every document of the target collection as a synthetic insert.
/// Returns false if `stop` fired or the far end went away mid-iteration.
fn snapshot(
    client: &Client,
    namespace: &str,
    records: &Sender<OplogEntry>,
    stop: &Receiver<()>,
) -> Result<bool> {
    let (db, coll) = namespace
        .split_once('.')
        .filter(|(db, coll)| !db.is_empty() && !coll.is_empty())
        .ok_or_else(|| RiverError::InvalidNamespace {
            ns: namespace.to_string(),
        })?;

    let cursor = client
        .database(db)
        .collection::<Document>(coll)
        .find(None, FindOptions::builder().batch_size(1000).build())?;

    for doc in cursor {
        let entry = OplogEntry::synthetic_insert(namespace, doc?);
        select! {
            send(records, entry) -> res => {
                if res.is_err() {
                    return Ok(false);
                }
            }
            recv(stop) -> _ => return Ok(false),
        }
    }
    Ok(true)
}

fn stopped(stop: &Receiver<()>) -> bool {
    matches!(stop.try_recv(), Err(TryRecvError::Disconnected))
}
