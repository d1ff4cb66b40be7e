#![allow(missing_docs)]

use bson::document::ValueAccessError;
use mongodb::error::Error as MongoError;
use std::num::ParseIntError;
use std::result::Result as StdResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiverError {
    #[error("Mongodb connection error")]
    Mongo {
        #[from]
        source: MongoError,
    },
    #[error("Mongodb document value error")]
    Bson {
        #[from]
        source: ValueAccessError,
    },
    #[error("Elasticsearch transport error")]
    EsTransport {
        #[from]
        source: reqwest::Error,
    },
    #[error("Unexpected status code from elasticsearch: {status}\n{body}")]
    EsBadStatus { status: u16, body: String },
    #[error("Invalid namespace: {ns:?}")]
    InvalidNamespace { ns: String },
    #[error("No mapped index found for: {db:?}")]
    UnmappedNamespace { db: String },
    #[error("_id does not exist in object, or is not an objectid")]
    MissingId,
    #[error("Operation of type {op:?} is not supported")]
    UnsupportedOp { op: String },
    #[error("Manipulator rejected document: {detail}")]
    Manipulation { detail: String },
    #[error("Empty document, nothing would get changed")]
    EmptyUpdate,
    #[error("No more operations can be added")]
    BufferFull,
    #[error("Can't fetch doc from mongodb")]
    EmptyDoc,
    #[error("Bulk body encode error")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Optime is not a decimal integer")]
    OptimeParse {
        #[from]
        source: ParseIntError,
    },
    #[error("Checkpoint file error")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("Can't install signal handler")]
    Signal {
        #[from]
        source: ctrlc::Error,
    },
}

pub type Result<T> = StdResult<T, RiverError>;
