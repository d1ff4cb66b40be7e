use bson::{doc, Document};
use mongodb::options::FindOneOptions;
use mongodb::sync::Collection;

use crate::error::{Result, RiverError};
use crate::optime::OpTime;
use crate::TIMESTAMP_KEY;

/// Get the newest timestamp in the oplog, by reverse natural order. This is
/// the point a tail following an initial snapshot resumes from.
pub fn get_latest_ts(coll: &Collection<Document>) -> Result<OpTime> {
    coll.find_one(
        None,
        FindOneOptions::builder().sort(doc! {"$natural": -1}).build(),
    )?
    .map(|d| {
        d.get_timestamp(TIMESTAMP_KEY)
            .map(OpTime::from)
            .map_err(RiverError::from)
    })
    .unwrap_or(Err(RiverError::EmptyDoc))
}
