//! Wires the pipeline together: tailer -> mapper -> slurpers, with the
//! checkpoint coordinator on the side. Owns no domain logic.

use crossbeam::channel::{bounded, tick, Receiver, Sender};
use crossbeam::select;
use mongodb::sync::Client;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::checkpoint::{load_optime, Checkpointer};
use crate::config::RiverConfig;
use crate::error::Result;
use crate::es::{slurp, EsClient, EsMapper, EsOperation, Manipulator};
use crate::oplog::{tail, OplogEntry};
use crate::optime::OpTime;
use crate::stats;

/// Bounded wait for the tailer's terminal result at shutdown. A cursor
/// parked in a server-side await can't be closed from here; past this we
/// abandon it and let process exit clean up.
const TAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DEBUG_REPORT_INTERVAL: Duration = Duration::from_secs(10);

pub struct Pipeline {
    conf: RiverConfig,
    manipulators: Vec<Box<dyn Manipulator>>,
}

impl Pipeline {
    pub fn new(conf: RiverConfig) -> Pipeline {
        Pipeline {
            conf,
            manipulators: Vec::new(),
        }
    }

    /// Append a manipulator applied to every mapped document, in insertion
    /// order.
    pub fn add_manipulator(&mut self, manip: Box<dyn Manipulator>) {
        self.manipulators.push(manip);
    }

    /// Run the pipeline until the tailer finishes, every slurper dies, or
    /// an interrupt arrives; then shut down in order with a final flush.
    pub fn run(self) -> Result<()> {
        let Pipeline { conf, manipulators } = self;

        let resume = load_optime(Path::new(conf.get_optime_path()));
        // A failed dial is fatal and becomes the process exit error.
        let source = Client::with_uri_str(&conf.source_uri())?;
        let es_client = Arc::new(EsClient::new(conf.bulk_url(), conf.get_concurrency())?);

        let (record_tx, record_rx) = bounded::<OplogEntry>(0);
        let (action_tx, action_rx) = bounded::<EsOperation>(0);
        let (confirmed_tx, confirmed_rx) = bounded::<OpTime>(1);
        // Signaled by dropping the sender; every stage selects on it.
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (interrupt_tx, interrupt_rx) = bounded::<()>(1);

        ctrlc::set_handler(move || {
            let _ = interrupt_tx.try_send(());
        })?;

        let ckpt = Checkpointer::new(conf.get_optime_path());
        let ckpt_handle = thread::Builder::new()
            .name("checkpoint".to_string())
            .spawn(move || ckpt.run(confirmed_rx))?;

        let (tail_result_tx, tail_result_rx) = bounded::<Result<()>>(1);
        {
            let client = source.clone();
            let ns = conf.get_ns().to_string();
            let initial = conf.get_initial();
            let stop = stop_rx.clone();
            let _ = thread::Builder::new()
                .name("tailer".to_string())
                .spawn(move || {
                    let res = tail(&client, &ns, initial, resume, record_tx, stop);
                    let _ = tail_result_tx.send(res);
                })?;
        }

        let mapper = EsMapper::new(conf.index_map()?, manipulators, Some(source))
            .with_unset_as_null(conf.get_unset_as_null());
        let (mapper_done_tx, mapper_done_rx) = bounded::<()>(0);
        {
            let stop = stop_rx.clone();
            let _ = thread::Builder::new()
                .name("mapper".to_string())
                .spawn(move || {
                    run_mapper(&mapper, record_rx, action_tx, confirmed_tx, stop);
                    drop(mapper_done_tx);
                })?;
        }

        let (slurp_done_tx, slurp_done_rx) = bounded::<()>(0);
        let mut slurpers = Vec::with_capacity(conf.get_concurrency());
        for n in 0..conf.get_concurrency() {
            let client = es_client.clone();
            let actions = action_rx.clone();
            let done = slurp_done_tx.clone();
            let max_bytes = conf.get_bulk_max_bytes();
            let handle = thread::Builder::new()
                .name(format!("slurper-{}", n))
                .spawn(move || {
                    slurp(&client, &actions, max_bytes);
                    drop(done);
                })?;
            slurpers.push(handle);
        }
        drop(slurp_done_tx);
        drop(action_rx);

        if !conf.get_debug().is_empty() {
            let stop = stop_rx.clone();
            let _ = thread::Builder::new()
                .name("stats".to_string())
                .spawn(move || {
                    let ticker = tick(DEBUG_REPORT_INTERVAL);
                    loop {
                        select! {
                            recv(ticker) -> _ => stats::report(),
                            recv(stop) -> _ => return,
                        }
                    }
                })?;
        }

        select! {
            recv(mapper_done_rx) -> _ => info!("MongoDB tailer returned. "),
            recv(slurp_done_rx) -> _ => info!("ES slurpers returned. "),
            recv(interrupt_rx) -> _ => info!("Interrupted, closing down. "),
        }
        drop(stop_tx);

        let tail_res = match tail_result_rx.recv_timeout(TAIL_DRAIN_TIMEOUT) {
            Ok(Ok(())) => {
                info!("No errors occurred in mongo tail. ");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(?e, "Tailer returned an error. ");
                Err(e)
            }
            Err(_) => {
                warn!("Tailer still blocked on the oplog cursor, abandoning it. ");
                Ok(())
            }
        };

        // The mapper lets go of the action channel, then the slurpers drain
        // and flush their last bodies.
        let _ = mapper_done_rx.recv();
        for handle in slurpers {
            let _ = handle.join();
        }
        // The mapper's confirmed sender is gone by now, so the checkpointer
        // writes its final value and returns.
        let _ = ckpt_handle.join();

        stats::report();
        info!("Bye!");
        tail_res
    }
}

/// The mapper loop alternates strictly between pulling one record and
/// handing off its mapped operation, so at most one operation is in flight
/// beyond the channels; cancellation can interrupt either state. Each
/// successful hand-off confirms the record's timestamp to the checkpointer,
/// in source order.
fn run_mapper(
    mapper: &EsMapper,
    records: Receiver<OplogEntry>,
    actions: Sender<EsOperation>,
    confirmed: Sender<OpTime>,
    stop: Receiver<()>,
) {
    loop {
        let entry = select! {
            recv(records) -> msg => match msg {
                Ok(entry) => entry,
                Err(_) => return,
            },
            recv(stop) -> _ => return,
        };

        let op = match mapper.map(&entry) {
            Ok(op) => op,
            Err(e) => {
                warn!(?e, ns = %entry.ns, "Dropping record. ");
                stats::add_dropped();
                continue;
            }
        };

        let ts = op.ts;
        select! {
            send(actions, op) -> res => {
                if res.is_err() {
                    return;
                }
                let _ = confirmed.send(ts);
            }
            recv(stop) -> _ => return,
        }
    }
}
