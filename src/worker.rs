//! Worker pool — §4.7. A fixed number of tasks pull transactions off a
//! shared queue and run the pipeline to completion synchronously (no
//! `.await` inside [`crate::pipeline::Pipeline::execute`] itself); only
//! the surrounding dequeue/encode/send steps are async.
//!
//! The pipeline is held behind [`SharedPipeline`] so a reload (§4.9: "the
//! new pipeline is built in full, then swapped in with a single pointer
//! update") never blocks an in-flight transaction: a worker takes a
//! clone of the `Arc<ActivePipeline>` at the start of each transaction
//! and runs it to completion even if a reload swaps the outer pointer
//! mid-flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::listener::{encode_for_send, Inbound, Listener, Outbound, SocketId};
use crate::pipeline::Pipeline;
use crate::registry::OptionRegistry;
use crate::stats::Stats;
use crate::transaction::{Disposition, Transaction};

/// one generation of the registry + pipeline pair, swapped atomically on
/// reload.
pub struct ActivePipeline {
    pub registry: Arc<OptionRegistry>,
    pub pipeline: Pipeline,
}

/// the handle workers and the reload path share. A worker clones the
/// inner `Arc<ActivePipeline>` once per transaction; a reload only ever
/// replaces the outer pointer.
pub type SharedPipeline = Arc<RwLock<Arc<ActivePipeline>>>;

pub fn shared(initial: ActivePipeline) -> SharedPipeline {
    Arc::new(RwLock::new(Arc::new(initial)))
}

/// swap in a freshly built pipeline; in-flight transactions already
/// holding the previous `Arc<ActivePipeline>` finish against it.
pub async fn reload(shared: &SharedPipeline, next: ActivePipeline) {
    let mut guard = shared.write().await;
    *guard = Arc::new(next);
}

/// spawn `worker_count` tasks draining `inbound`, running the current
/// pipeline generation against each transaction, and forwarding
/// `Disposition::Emit` responses to `outbound`. Transactions dropped
/// (decode degraded past usefulness, handler failure, deadline exceeded)
/// are counted but never reach `outbound`.
pub fn spawn_workers(
    worker_count: usize,
    inbound: Arc<tokio::sync::Mutex<mpsc::Receiver<Inbound>>>,
    pipeline: SharedPipeline,
    outbound: mpsc::Sender<Outbound>,
    stats: Stats,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..worker_count)
        .map(|index| {
            let inbound = inbound.clone();
            let pipeline = pipeline.clone();
            let outbound = outbound.clone();
            let stats = stats.clone();
            tokio::spawn(async move { worker_loop(index, inbound, pipeline, outbound, stats).await })
        })
        .collect()
}

async fn worker_loop(
    _index: usize,
    inbound: Arc<tokio::sync::Mutex<mpsc::Receiver<Inbound>>>,
    pipeline: SharedPipeline,
    outbound: mpsc::Sender<Outbound>,
    stats: Stats,
) {
    loop {
        let item = {
            let mut receiver = inbound.lock().await;
            receiver.recv().await
        };
        let Some(Inbound {
            mut transaction,
            partially_decoded,
        }) = item
        else {
            return;
        };
        if partially_decoded {
            // the option decode downgraded something to `Unknown`; the
            // transaction still runs, handlers just see a degraded view.
            transaction.mark("partially-decoded");
        }

        let active = { pipeline.read().await.clone() };
        let started = Instant::now();
        active.pipeline.execute(&mut transaction);
        let elapsed = started.elapsed();

        let disposition = transaction.disposition();
        stats.record_latency(disposition_label(disposition), elapsed.as_secs_f64());
        stats.record_message(request_type_label(&transaction), disposition_label(disposition));
        if transaction.timed_out() {
            stats.record_timeout();
        }

        if disposition != Disposition::Emit {
            continue;
        }
        let Some(socket_id) = transaction.get_local::<SocketId>().copied() else {
            warn!(transaction_id = transaction.id(), "emit disposition but no socket id recorded");
            continue;
        };
        let Some(response) = transaction.response() else {
            warn!(transaction_id = transaction.id(), "emit disposition but no response set");
            continue;
        };
        match encode_for_send(response) {
            Ok(bytes) => {
                let out = Outbound {
                    bytes,
                    dst_addr: transaction.src_addr(),
                    via: socket_id,
                };
                if outbound.send(out).await.is_err() {
                    warn!("outbound channel closed");
                    return;
                }
            }
            Err(err) => {
                stats.record_encode_failure();
                warn!(transaction_id = transaction.id(), error = %err, "failed to encode response");
            }
        }
    }
}

fn disposition_label(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Emit => "emit",
        Disposition::Drop => "drop",
    }
}

fn request_type_label(txn: &Transaction) -> String {
    format!("{:?}", txn.request_type())
}

/// drains `outbound` and sends each datagram through `listener`, and
/// drains `deadline`-bound retirement of transactions that never got a
/// chance to send (channel full for too long) is left to the caller's
/// bounded channel capacity — a full queue simply backpressures the
/// listener's receive loop, per §4.7's "no unbounded buffering".
pub async fn send_loop(listener: Arc<Listener>, mut outbound: mpsc::Receiver<Outbound>, stats: Stats) {
    while let Some(out) = outbound.recv().await {
        if let Err(err) = listener.send(&out).await {
            stats.record_send_failure();
            warn!(error = %err, "failed to send response");
        }
    }
}

/// convenience for callers that want a simple duration-based deadline
/// applied uniformly (§4.7's bounded per-transaction budget) rather than
/// a per-handler one computed from configuration.
pub fn apply_default_deadline(txn: &mut Transaction, budget: Duration) {
    txn.set_deadline(budget);
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::filter::{linearize, Filter, FilterNode};
    use crate::message::{Message, Solicit};
    use crate::options::DhcpOptions;
    use crate::registry::OptionRegistryBuilder;

    fn empty_active_pipeline() -> ActivePipeline {
        let registry = Arc::new(OptionRegistryBuilder::with_builtin_options().freeze());
        let root = FilterNode::new(Filter::AlwaysMatch);
        let entries = linearize(&root);
        ActivePipeline {
            registry: registry.clone(),
            pipeline: Pipeline::new(registry, entries),
        }
    }

    #[tokio::test]
    async fn reload_swaps_without_blocking_readers() {
        let shared_pipeline = shared(empty_active_pipeline());
        let before = shared_pipeline.read().await.clone();
        reload(&shared_pipeline, empty_active_pipeline()).await;
        let after = shared_pipeline.read().await.clone();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    /// exercises the worker loop end to end: a transaction dropped for
    /// exceeding its deadline before `handle` ever ran still needs to be
    /// counted, both against `messages_total{disposition="drop"}` and
    /// against the dedicated `timeouts_total` counter.
    #[tokio::test]
    async fn a_dropped_transaction_with_no_response_is_still_counted() {
        let shared_pipeline = shared(empty_active_pipeline());
        let stats = Stats::new();

        let (inbound_tx, inbound_rx) = mpsc::channel(1);
        let inbound_rx = Arc::new(tokio::sync::Mutex::new(inbound_rx));
        let (outbound_tx, mut outbound_rx) = mpsc::channel(1);

        let handle = tokio::spawn(worker_loop(0, inbound_rx, shared_pipeline, outbound_tx, stats.clone()));

        let mut txn = Transaction::new(
            1,
            Message::Solicit(Solicit {
                transaction_id: 1,
                opts: DhcpOptions::new(),
            }),
            "[::1]:546".parse::<SocketAddr>().unwrap(),
            "[::1]:547".parse::<SocketAddr>().unwrap(),
        );
        // already past its deadline by the time the worker runs the
        // pipeline, so `handle` never runs and no response is built.
        txn.set_deadline(Duration::from_nanos(0));
        tokio::time::sleep(Duration::from_millis(1)).await;

        inbound_tx
            .send(Inbound {
                transaction: txn,
                partially_decoded: false,
            })
            .await
            .unwrap();
        drop(inbound_tx);

        let _ = handle.await;
        assert!(outbound_rx.try_recv().is_err());

        let dump = stats.render_key_value();
        assert!(dump.contains("dhcv6d_messages_total=1"));
        assert!(dump.contains("dhcv6d_timeouts_total=1"));
    }
}
