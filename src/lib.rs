//! Tail a MongoDB replica's oplog and mirror one namespace into an
//! Elasticsearch index in real time.
//!
//! The pipeline is a chain of threads connected by bounded channels:
//! tailer -> mapper -> slurpers, with a checkpoint coordinator persisting the
//! last hand-delivered oplog timestamp once a second. See [Pipeline] for the
//! wiring and shutdown order.

mod checkpoint;
mod config;
mod error;
mod es;
mod oplog;
mod optime;
mod pipeline;
pub mod stats;

const OPLOG_DB: &str = "local";
const OPLOG_COLL: &str = "oplog.rs";

// oplog relative keys.
const TIMESTAMP_KEY: &str = "ts";
const NAMESPACE_KEY: &str = "ns";
const ID_KEY: &str = "_id";
const SET_KEY: &str = "$set";
const UNSET_KEY: &str = "$unset";
const DELETED_KEY: &str = "deleted";

pub use checkpoint::{load_optime, Checkpointer};
pub use config::RiverConfig;
pub use error::{Result, RiverError};
pub use es::{slurp, Action, BulkBody, EsClient, EsMapper, EsOperation, Manipulator};
pub use oplog::{tail, OpType, OplogEntry};
pub use optime::OpTime;
pub use pipeline::Pipeline;
