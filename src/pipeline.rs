//! Drives a linearized filter/handler chain over one transaction at a
//! time.
//!
//! The pipeline itself performs no I/O and holds no per-transaction
//! state between calls — [`Pipeline::execute`] is a pure function of a
//! `&mut Transaction` plus the linearized entries built once at
//! configuration load time. Workers in [`crate::worker`] call it
//! synchronously inside their processing loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::filter::LinearizedEntry;
use crate::handler::{Handler, HandlerOutcome, Phase};
use crate::registry::OptionRegistry;
use crate::transaction::{Disposition, Transaction, TransactionState};

/// a linearized entry tagged with the phase it was scheduled under. A
/// handler declaring more than one phase appears once per phase it
/// participates in, each copy dispatched through the matching hook.
#[derive(Clone)]
struct ScheduledEntry {
    entry: LinearizedEntry,
    phase: Phase,
}

/// the fully linearized pipeline: one flat list per phase, each entry
/// already carrying its filter path so evaluation is a straight
/// iteration with no tree walk.
pub struct Pipeline {
    registry: Arc<OptionRegistry>,
    pre: Vec<ScheduledEntry>,
    handle: Vec<ScheduledEntry>,
    post: Vec<ScheduledEntry>,
}

impl Pipeline {
    /// partition a flat linearization (as produced by
    /// [`crate::filter::linearize`]) by phase, preserving declared
    /// order within each phase and sorting by precedence as the
    /// secondary key (stable sort keeps the config-order tie-break from
    /// §4.4).
    pub fn new(registry: Arc<OptionRegistry>, entries: Vec<LinearizedEntry>) -> Self {
        let mut pre = Vec::new();
        let mut handle = Vec::new();
        let mut post = Vec::new();
        for entry in entries {
            for phase in entry.handler.phases() {
                let bucket = match phase {
                    Phase::Pre => &mut pre,
                    Phase::Handle => &mut handle,
                    Phase::Post => &mut post,
                };
                bucket.push(ScheduledEntry {
                    entry: entry.clone(),
                    phase: *phase,
                });
            }
        }
        pre.sort_by_key(|e| e.entry.handler.precedence());
        handle.sort_by_key(|e| e.entry.handler.precedence());
        post.sort_by_key(|e| e.entry.handler.precedence());
        Pipeline {
            registry,
            pre,
            handle,
            post,
        }
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    /// run a transaction through pre, handle, and post phases in order,
    /// checking the deadline between phases (not inside a phase — a
    /// handler that overruns still finishes its own hook). Per
    /// invariant (5), `disposition` can only move toward `Drop`; the
    /// `post` phase still runs on a dropped transaction so
    /// `run_on_drop` handlers get a chance to record it.
    pub fn execute(&self, txn: &mut Transaction) {
        let start = Instant::now();

        self.run_phase(&self.pre, txn, false);
        txn.advance(TransactionState::Classified);

        if self.check_deadline(txn) {
            txn.advance(TransactionState::Answered);
            txn.advance(TransactionState::Finalized);
            self.run_phase(&self.post, txn, true);
            self.finish(txn);
            return;
        }

        self.run_phase(&self.handle, txn, txn.disposition() == Disposition::Drop);
        txn.advance(TransactionState::Answered);

        if self.check_deadline(txn) {
            txn.advance(TransactionState::Finalized);
            self.run_phase(&self.post, txn, true);
            self.finish(txn);
            return;
        }

        self.run_phase(&self.post, txn, txn.disposition() == Disposition::Drop);
        txn.advance(TransactionState::Finalized);
        self.finish(txn);

        debug!(
            transaction_id = txn.id(),
            elapsed_us = start.elapsed().as_micros(),
            disposition = ?txn.disposition(),
            "transaction finalized"
        );
    }

    /// true if the deadline has passed; logs a warning the first time
    /// it's observed for this transaction and forces the disposition to
    /// `Drop`.
    fn check_deadline(&self, txn: &mut Transaction) -> bool {
        if txn.deadline_exceeded() {
            warn!(transaction_id = txn.id(), "transaction deadline exceeded");
            txn.set_disposition(Disposition::Drop);
            txn.mark_timed_out();
            true
        } else {
            false
        }
    }

    fn run_phase(&self, entries: &[ScheduledEntry], txn: &mut Transaction, only_run_on_drop: bool) {
        for scheduled in entries {
            let entry = &scheduled.entry;
            if !entry.applies(txn) {
                continue;
            }
            if only_run_on_drop && !entry.handler.run_on_drop() {
                continue;
            }
            let outcome = dispatch(scheduled, txn);
            match outcome {
                Ok(HandlerOutcome::Continue) => {}
                Ok(HandlerOutcome::StopPhase) => break,
                Err(err) => {
                    warn!(
                        transaction_id = txn.id(),
                        handler = entry.handler.name(),
                        error = %err,
                        "handler failed"
                    );
                    txn.set_disposition(Disposition::Drop);
                    break;
                }
            }
        }
    }

    fn finish(&self, txn: &mut Transaction) {
        match txn.disposition() {
            Disposition::Emit => txn.advance(TransactionState::Emitted),
            Disposition::Drop => txn.advance(TransactionState::Dropped),
        }
    }
}

/// calls the one hook meaningful for the phase this entry was
/// scheduled under. Handler hooks are synchronous by design (§4.7: "no
/// suspension within a transaction") so dispatch is a plain call, not
/// an await point.
fn dispatch(
    scheduled: &ScheduledEntry,
    txn: &mut Transaction,
) -> Result<HandlerOutcome, crate::error::HandlerError> {
    match scheduled.phase {
        Phase::Pre => scheduled.entry.handler.pre(txn),
        Phase::Handle => scheduled.entry.handler.handle(txn),
        Phase::Post => scheduled.entry.handler.post(txn),
    }
}
