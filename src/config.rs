//! River configuration. Usually filled in from the command line, but the
//! struct deserializes from toml as well:
//!
//! ```toml
//! mongo = "localhost"
//! es = "http://localhost:9200"
//! index = "testing"
//! ns = "api.users"
//! concurrency = 2
//! db = "/var/lib/mongo_river/optime.db"
//! ```
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Result, RiverError};

/// Global river configuration. Knobs mirror the command line surface.
#[derive(Deserialize, Debug, Clone)]
pub struct RiverConfig {
    /// Source mongodb host or uri to tail, must be a replica set member.
    mongo: String,
    /// Elasticsearch base url, `/_bulk` is appended for requests.
    es: String,
    /// Elasticsearch index the namespace maps to.
    index: String,
    /// Namespace `db.collection` to replicate.
    ns: String,
    /// Force an initial full snapshot before tailing.
    #[serde(default)]
    initial: bool,
    /// Number of parallel slurper workers (and sink connections).
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    /// Checkpoint file the last delivered optime is persisted to.
    #[serde(default = "default_optime_path", rename = "db")]
    optime_path: String,
    /// Emit a periodic counter report when non-empty.
    #[serde(default)]
    debug: String,
    /// Compatibility toggle: treat `$unset` keys as null-valued `$set`
    /// entries instead of re-indexing the full document.
    #[serde(default)]
    unset_as_null: bool,
    /// Upper bound for one bulk request body, in bytes.
    #[serde(default = "default_bulk_max_bytes")]
    bulk_max_bytes: usize,
}

fn default_concurrency() -> usize {
    1
}

fn default_optime_path() -> String {
    "/tmp/mongo_river.db".to_string()
}

fn default_bulk_max_bytes() -> usize {
    1024 * 1024
}

impl RiverConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mongo: String,
        es: String,
        index: String,
        ns: String,
        initial: bool,
        concurrency: usize,
        optime_path: String,
        debug: String,
    ) -> RiverConfig {
        RiverConfig {
            mongo,
            es,
            index,
            ns,
            initial,
            concurrency,
            optime_path,
            debug,
            unset_as_null: false,
            bulk_max_bytes: default_bulk_max_bytes(),
        }
    }

    /// Source uri with a direct connection forced, so we attach to the one
    /// replica we were pointed at instead of discovering the set.
    pub fn source_uri(&self) -> String {
        let base = if self.mongo.contains("://") {
            self.mongo.clone()
        } else {
            format!("mongodb://{}", self.mongo)
        };
        if base.contains('?') {
            format!("{}&directConnection=true", base)
        } else {
            format!("{}/?directConnection=true", base.trim_end_matches('/'))
        }
    }

    /// Bulk endpoint on the sink.
    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.es.trim_end_matches('/'))
    }

    /// Namespace database part -> elasticsearch index.
    pub fn index_map(&self) -> Result<HashMap<String, String>> {
        let (db, _) = self.split_namespace()?;
        let mut map = HashMap::new();
        map.insert(db.to_string(), self.index.clone());
        Ok(map)
    }

    /// Split the configured namespace on the first `.`.
    pub fn split_namespace(&self) -> Result<(&str, &str)> {
        self.ns
            .split_once('.')
            .filter(|(db, coll)| !db.is_empty() && !coll.is_empty())
            .ok_or_else(|| RiverError::InvalidNamespace {
                ns: self.ns.clone(),
            })
    }

    pub fn get_ns(&self) -> &str {
        &self.ns
    }

    pub fn get_initial(&self) -> bool {
        self.initial
    }

    pub fn get_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn get_optime_path(&self) -> &str {
        &self.optime_path
    }

    pub fn get_debug(&self) -> &str {
        &self.debug
    }

    pub fn get_unset_as_null(&self) -> bool {
        self.unset_as_null
    }

    pub fn set_unset_as_null(&mut self, legacy: bool) {
        self.unset_as_null = legacy;
    }

    pub fn get_bulk_max_bytes(&self) -> usize {
        self.bulk_max_bytes
    }
}
