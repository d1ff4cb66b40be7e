use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::bulk::BulkBody;
use crate::error::{Result, RiverError};

// Kept for compatibility with what the sink has always been sent.
const BULK_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Shared client for the sink's bulk endpoint. Immutable after
/// construction; one instance serves all slurper workers.
pub struct EsClient {
    http: HttpClient,
    url: String,
}

impl EsClient {
    /// `max_conns` sizes the idle connection pool, one slot per worker.
    pub fn new(url: String, max_conns: usize) -> Result<EsClient> {
        let http = HttpClient::builder()
            .pool_max_idle_per_host(max_conns)
            .build()?;
        Ok(EsClient { http, url })
    }

    /// Finalize and POST `body`. The body is reset to accept new operations
    /// only when the sink answers 200; on any failure the bytes stay put so
    /// the caller can retry the same batch.
    pub fn send_bulk(&self, body: &mut BulkBody) -> Result<()> {
        body.done();
        debug!(bytes = body.len(), "Sending bulk body. ");
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, BULK_CONTENT_TYPE)
            .body(body.bytes().to_vec())
            .send()?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RiverError::EsBadStatus {
                status,
                body: response.text().unwrap_or_default(),
            });
        }
        body.reset();
        Ok(())
    }
}
