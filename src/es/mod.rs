//! Elasticsearch side of the pipeline: mapping, bulk protocol, transport.

mod bulk;
mod client;
mod operation;
mod slurper;

pub use bulk::BulkBody;
pub use client::EsClient;
pub use operation::{Action, EsMapper, EsOperation, Manipulator};
pub use slurper::slurp;
