//! Slurper workers: drain mapped operations, batch them into bulk bodies
//! and dispatch to the sink.

use crossbeam::channel::{tick, Receiver};
use crossbeam::select;
use std::time::Duration;
use tracing::{info, warn};

use super::bulk::BulkBody;
use super::client::EsClient;
use super::operation::EsOperation;
use crate::error::RiverError;
use crate::stats;

/// Flush a non-empty body at least this often, bounding delivery latency
/// under low throughput.
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const BACKOFF_START: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(10);

/// Run one slurper worker until `actions` closes; closing is the graceful
/// stop signal and any pending batch is flushed before returning. The
/// orchestrator may run several workers over the same channel and client;
/// each worker owns its own body.
pub fn slurp(client: &EsClient, actions: &Receiver<EsOperation>, max_bytes: usize) {
    let mut body = BulkBody::new(max_bytes);
    let ticker = tick(FLUSH_INTERVAL);

    loop {
        select! {
            recv(actions) -> msg => match msg {
                Ok(op) => admit(client, &mut body, &op),
                Err(_) => {
                    if !body.is_empty() {
                        if let Err(e) = client.send_bulk(&mut body) {
                            warn!(?e, "Final bulk flush failed, batch lost at shutdown. ");
                        }
                    }
                    info!("Slurper stopped. ");
                    return;
                }
            },
            recv(ticker) -> _ => {
                if !body.is_empty() {
                    if let Err(e) = client.send_bulk(&mut body) {
                        warn!(?e, "Periodic bulk flush failed, batch retained. ");
                    }
                }
            }
        }
    }
}

/// Add one operation to the body, flushing when full.
///
/// A sink failure keeps the body and retries the flush with capped
/// exponential backoff. The worker stalls while the sink is down; through
/// the rendezvous channels that stall is backpressure on the mapper and
/// tailer, and nothing is dropped or spawned.
fn admit(client: &EsClient, body: &mut BulkBody, op: &EsOperation) {
    let mut backoff = BACKOFF_START;
    loop {
        match body.add(op) {
            Ok(()) => return,
            Err(RiverError::BufferFull) => {
                if let Err(e) = client.send_bulk(body) {
                    warn!(
                        ?e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Bulk send failed, backing off. "
                    );
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
            }
            Err(e) => {
                warn!(?e, id = %op.id, "Dropping operation. ");
                stats::add_dropped();
                return;
            }
        }
    }
}
