//! Mapping of oplog entries to elasticsearch operations.

use bson::{doc, Document};
use mongodb::sync::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Result, RiverError};
use crate::oplog::{OpType, OplogEntry};
use crate::optime::OpTime;
use crate::{stats, DELETED_KEY, ID_KEY, SET_KEY, UNSET_KEY};

/// What to do on the sink for one mapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Index,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// One sink-ready operation: everything a bulk entry needs, plus the source
/// timestamp for checkpointing.
#[derive(Debug, Clone)]
pub struct EsOperation {
    pub action: Action,
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub document: Map<String, Value>,
    pub ts: OpTime,
}

/// Changes documents in specific ways before they leave the mapper.
pub trait Manipulator: Send + Sync {
    fn manipulate(&self, doc: &mut Map<String, Value>) -> Result<()>;
}

impl<F> Manipulator for F
where
    F: Fn(&mut Map<String, Value>) -> Result<()> + Send + Sync,
{
    fn manipulate(&self, doc: &mut Map<String, Value>) -> Result<()> {
        self(doc)
    }
}

/// Maps oplog entries to [EsOperation]s.
///
/// Holds the namespace-to-index map, the ordered manipulator chain, and the
/// source session used when a `$unset` update forces a full re-index.
pub struct EsMapper {
    index_map: HashMap<String, String>,
    manipulators: Vec<Box<dyn Manipulator>>,
    source: Option<Client>,
    unset_as_null: bool,
}

impl EsMapper {
    pub fn new(
        index_map: HashMap<String, String>,
        manipulators: Vec<Box<dyn Manipulator>>,
        source: Option<Client>,
    ) -> EsMapper {
        EsMapper {
            index_map,
            manipulators,
            source,
            unset_as_null: false,
        }
    }

    /// Switch `$unset` handling to the legacy null-valued `$set` rendering
    /// instead of re-fetching the full document.
    pub fn with_unset_as_null(mut self, legacy: bool) -> EsMapper {
        self.unset_as_null = legacy;
        self
    }

    /// Translate one oplog entry into a sink operation.
    pub fn map(&self, entry: &OplogEntry) -> Result<EsOperation> {
        let (db, doc_type) = split_namespace(&entry.ns)?;
        let index = self
            .index_map
            .get(db)
            .cloned()
            .ok_or_else(|| RiverError::UnmappedNamespace { db: db.to_string() })?;
        let id = entry.object_id()?.to_hex();

        let (mut action, mut document) = match entry.op {
            OpType::Insert => {
                stats::add_complete();
                (Action::Index, document_to_json(entry.o.clone()))
            }
            OpType::Delete => (Action::Delete, Map::new()),
            OpType::Update => self.map_update(entry, db, doc_type)?,
            OpType::Command => {
                return Err(RiverError::UnsupportedOp {
                    op: entry.op.as_str().to_string(),
                })
            }
        };

        // Soft delete convention: a true `deleted` flag means the document
        // should leave the index no matter what the oplog op was.
        if document.get(DELETED_KEY) == Some(&Value::Bool(true)) {
            action = Action::Delete;
            document.clear();
        }

        if action != Action::Delete {
            for manip in &self.manipulators {
                manip.manipulate(&mut document)?;
            }
        }

        Ok(EsOperation {
            action,
            index,
            doc_type: doc_type.to_string(),
            id,
            document,
            ts: entry.optime(),
        })
    }

    fn map_update(
        &self,
        entry: &OplogEntry,
        db: &str,
        coll: &str,
    ) -> Result<(Action, Map<String, Value>)> {
        let has_set = entry.o.contains_key(SET_KEY);
        let has_unset = entry.o.contains_key(UNSET_KEY);
        if has_set {
            stats::add_set();
        }
        if has_unset {
            stats::add_unset();
        }

        if has_unset {
            if self.unset_as_null {
                // Legacy rendering: pretend there is a $set carrying nulls,
                // which is enough when the sink tolerates null-as-absent.
                let mut doc = match entry.o.get_document(SET_KEY) {
                    Ok(sets) => document_to_json(sets.clone()),
                    Err(_) => Map::new(),
                };
                for key in entry.o.get_document(UNSET_KEY)?.keys() {
                    doc.insert(key.clone(), Value::Null);
                }
                return Ok((Action::Update, doc));
            }
            // The sink can't partially unset a field without a scripted
            // update, so replace: read the current full document and index
            // it wholesale. A miss means the document was deleted later in
            // the oplog and its tombstone will handle it.
            let client = self.source.as_ref().ok_or(RiverError::EmptyDoc)?;
            let full = client
                .database(db)
                .collection::<Document>(coll)
                .find_one(doc! { ID_KEY: entry.object_id()? }, None)?
                .ok_or(RiverError::EmptyDoc)?;
            stats::add_complete();
            return Ok((Action::Index, document_to_json(full)));
        }

        if has_set {
            let sets = entry.o.get_document(SET_KEY)?.clone();
            return Ok((Action::Update, document_to_json(sets)));
        }

        // All other updates carry a full replacement document.
        stats::add_complete();
        Ok((Action::Index, document_to_json(entry.o.clone())))
    }
}

/// Split a namespace on the first `.` into database and collection.
pub(crate) fn split_namespace(ns: &str) -> Result<(&str, &str)> {
    ns.split_once('.')
        .filter(|(db, coll)| !db.is_empty() && !coll.is_empty())
        .ok_or_else(|| RiverError::InvalidNamespace { ns: ns.to_string() })
}

/// Convert a bson document into the plain json tree that travels to the
/// sink. This is the only place driver types leak out of, so the rest of the
/// pipeline never sees bson.
pub(crate) fn document_to_json(doc: Document) -> Map<String, Value> {
    doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()
}

fn bson_to_json(value: bson::Bson) -> Value {
    use bson::Bson;
    match value {
        Bson::Document(d) => Value::Object(document_to_json(d)),
        Bson::Array(a) => Value::Array(a.into_iter().map(bson_to_json).collect()),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Timestamp(ts) => Value::from(OpTime::from(ts).as_u64()),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => other.into_relaxed_extjson(),
    }
}
