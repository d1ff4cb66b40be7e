//! Structured oplog entry definition.
//!
//! Most oplog information comes from here:
//! https://github.com/mongodb/mongo/blob/master/src/mongo/db/repl/oplog_entry.idl
//!
//! Useful fields:
//! ts: The time when the oplog entry was created. (Timestamp)
//! op: The operation type. (enum OpType)
//! ns: The namespace on which to apply the operation. (String)
//! o: The operation applied. (Document)
//! o2: Additional information about the operation applied. (Document)

use bson::oid::ObjectId;
use bson::{Document, Timestamp};
use serde::Deserialize;

use crate::error::{Result, RiverError};
use crate::optime::OpTime;
use crate::ID_KEY;

/// The type of an operation in the oplog. A closed sum: anything else
/// (noops, index builds, ...) fails to decode and is skipped by the tailer.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    /// represented by "i"
    #[serde(rename = "i")]
    Insert,
    /// represented by "u"
    #[serde(rename = "u")]
    Update,
    /// represented by "d"
    #[serde(rename = "d")]
    Delete,
    /// represented by "c"
    #[serde(rename = "c")]
    Command,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Insert => "i",
            OpType::Update => "u",
            OpType::Delete => "d",
            OpType::Command => "c",
        }
    }
}

/// One entry of the oplog, the unit the tailer hands to the mapper.
#[derive(Deserialize, Debug, Clone)]
pub struct OplogEntry {
    /// The time when the oplog entry was created.
    pub ts: Timestamp,
    /// The operation type.
    pub op: OpType,
    /// The namespace on which to apply the operation.
    pub ns: String,
    /// The object to be inserted, the parts to be updated, or an id of what
    /// to delete.
    #[serde(default)]
    pub o: Document,
    /// The target document on update queries, carries the id.
    #[serde(default)]
    pub o2: Option<Document>,
}

impl OplogEntry {
    /// Decode a raw oplog document. Unknown `op` tags are a decode error.
    pub fn from_doc(doc: Document) -> std::result::Result<OplogEntry, bson::de::Error> {
        bson::from_document(doc)
    }

    /// Build the synthetic insert entry the initial snapshot emits per
    /// stored document. Snapshot entries carry a zero timestamp so a crash
    /// mid-snapshot resumes from scratch.
    pub fn synthetic_insert(ns: &str, doc: Document) -> OplogEntry {
        OplogEntry {
            ts: Timestamp {
                time: 0,
                increment: 0,
            },
            op: OpType::Insert,
            ns: ns.to_string(),
            o: doc,
            o2: None,
        }
    }

    pub fn optime(&self) -> OpTime {
        OpTime::from(self.ts)
    }

    /// The object id of this entry: from `o2` on updates, from `o`
    /// otherwise. Must be a native objectid.
    pub fn object_id(&self) -> Result<ObjectId> {
        let object = match self.op {
            OpType::Update => self.o2.as_ref().ok_or(RiverError::MissingId)?,
            _ => &self.o,
        };
        object.get_object_id(ID_KEY).map_err(|_| RiverError::MissingId)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bson::doc;

    #[test]
    fn test_decode_rejects_unknown_op() {
        let noop = doc! {
            "ts": Timestamp { time: 1, increment: 0 },
            "op": "n",
            "ns": "",
            "o": { "msg": "periodic noop" },
        };
        assert!(OplogEntry::from_doc(noop).is_err());
    }

    #[test]
    fn test_object_id_source_depends_on_op() {
        let id = ObjectId::parse_str("52e7db73f4eb27371874b289").unwrap();
        let update = OplogEntry::from_doc(doc! {
            "ts": Timestamp { time: 1, increment: 0 },
            "op": "u",
            "ns": "api.users",
            "o": { "$set": { "a": 1 } },
            "o2": { "_id": id },
        })
        .unwrap();
        assert_eq!(update.object_id().unwrap(), id);

        let insert = OplogEntry::from_doc(doc! {
            "ts": Timestamp { time: 1, increment: 0 },
            "op": "i",
            "ns": "api.users",
            "o": { "_id": id, "a": 1 },
        })
        .unwrap();
        assert_eq!(insert.object_id().unwrap(), id);
    }

    #[test]
    fn test_object_id_must_be_native() {
        let entry = OplogEntry::from_doc(doc! {
            "ts": Timestamp { time: 1, increment: 0 },
            "op": "i",
            "ns": "api.users",
            "o": { "_id": "not-an-objectid" },
        })
        .unwrap();
        assert!(matches!(entry.object_id(), Err(RiverError::MissingId)));
    }
}
