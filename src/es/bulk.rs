//! The elasticsearch bulk request body format.
//!
//! https://www.elastic.co/guide/en/elasticsearch/reference/current/docs-bulk.html

use serde::Serialize;
use serde_json::{Map, Value};

use super::operation::{Action, EsOperation};
use crate::error::{Result, RiverError};

const NEWLINE: u8 = b'\n';

/// First line of a bulk entry, identifying what to act on. Field order is
/// part of the wire fixture, hence a struct rather than a map.
#[derive(Serialize)]
struct EntryHeader<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

/// Update documents are wrapped so the sink upserts fields that show up
/// for the first time.
#[derive(Serialize)]
struct UpdateWrapper<'a> {
    doc: &'a Map<String, Value>,
    doc_as_upsert: bool,
}

/// Accumulates bulk operations into one length-bounded request body.
///
/// [add](BulkBody::add) returns [RiverError::BufferFull] once the configured
/// byte bound is met; the body should then be sent and
/// [reset](BulkBody::reset) before more operations can be added.
pub struct BulkBody {
    buf: Vec<u8>,
    max_bytes: usize,
    done: bool,
}

impl BulkBody {
    pub fn new(max_bytes: usize) -> BulkBody {
        BulkBody {
            buf: Vec::new(),
            max_bytes,
            done: false,
        }
    }

    /// Append one operation.
    ///
    /// Returns [RiverError::BufferFull] if the body is already finalized, or
    /// if the byte bound is met on entry; in the latter case the body is
    /// finalized and the rejected operation must be retried on a fresh body.
    /// Either way the rejected operation is never partially written.
    pub fn add(&mut self, op: &EsOperation) -> Result<()> {
        if self.done {
            return Err(RiverError::BufferFull);
        }
        if self.buf.len() >= self.max_bytes {
            self.done();
            return Err(RiverError::BufferFull);
        }

        // Render the whole entry aside first, so encode failures leave the
        // body untouched.
        let header = serde_json::to_string(&EntryHeader {
            index: &op.index,
            doc_type: &op.doc_type,
            id: &op.id,
        })?;
        let mut entry = Vec::with_capacity(header.len() + 16);
        entry.extend_from_slice(format!("{{\"{}\":{}}}", op.action.as_str(), header).as_bytes());
        entry.push(NEWLINE);
        match op.action {
            // Deletes carry no document line.
            Action::Delete => {}
            Action::Update => {
                if op.document.is_empty() {
                    return Err(RiverError::EmptyUpdate);
                }
                serde_json::to_writer(
                    &mut entry,
                    &UpdateWrapper {
                        doc: &op.document,
                        doc_as_upsert: true,
                    },
                )?;
                entry.push(NEWLINE);
            }
            Action::Index => {
                serde_json::to_writer(&mut entry, &op.document)?;
                entry.push(NEWLINE);
            }
        }

        self.buf.extend_from_slice(&entry);
        Ok(())
    }

    /// Append the final newline that terminates a bulk body, exactly once.
    pub fn done(&mut self) {
        if !self.done {
            self.buf.push(NEWLINE);
            self.done = true;
        }
    }

    /// Clear the buffer and the done flag, making the body reusable.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.done = false;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}
