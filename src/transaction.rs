//! Per-datagram transaction context threaded through the filter/handler
//! pipeline.
//!
//! Shaped after the request-context object a dispatcher hands each
//! worker in request/response server cores: one value constructed per
//! inbound datagram, carrying the parsed request, a response under
//! construction, and a scratch area handlers use to pass facts to each
//! other without reaching for shared state. It is never shared across
//! threads — a `Transaction` lives and dies inside one worker's
//! processing of one datagram.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::message::{Message, MessageType};
use crate::options::{DhcpOption, DhcpOptions, OptionCode};

/// default time budget for a transaction, measured from the moment the
/// datagram was read off the socket
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(1);

/// what ultimately happens to the response a transaction built.
///
/// Monotonic: once a handler sets `Drop`, no later handler — pre,
/// handle, or post — may set it back to `Emit`. [`Transaction::set_disposition`]
/// enforces this; a flip attempt is silently ignored rather than
/// panicking, since a handler downstream of the one that dropped the
/// transaction has no way to know that happened without checking first,
/// and the post phase still needs to run for `run_on_drop` handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// send `response` back to the peer
    Emit,
    /// discard the transaction; nothing is sent
    Drop,
}

/// lifecycle stage of a transaction, advanced by the pipeline driver as
/// each phase completes. Backward transitions are forbidden —
/// [`Transaction::advance`] panics if asked to move to a stage at or
/// before the current one, since that would indicate a bug in the
/// driver rather than a condition handlers can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransactionState {
    /// request decoded, filter linearization not yet run
    Parsed,
    /// filter chain selected, pre-phase handlers have run
    Classified,
    /// handle-phase handlers have run
    Answered,
    /// post-phase handlers have run
    Finalized,
    /// response handed back to the listener for sending
    Emitted,
    /// transaction discarded, nothing sent
    Dropped,
}

impl TransactionState {
    fn rank(self) -> u8 {
        match self {
            TransactionState::Parsed => 0,
            TransactionState::Classified => 1,
            TransactionState::Answered => 2,
            TransactionState::Finalized => 3,
            TransactionState::Emitted => 4,
            TransactionState::Dropped => 4,
        }
    }
}

/// type-keyed scratch storage, scoped to one transaction. Handlers use
/// this to pass facts to later handlers in the same run (e.g. a
/// classifier handler recording a resolved subnet for an allocator
/// handler to read back) without a shared map keyed by string and
/// without a bespoke field on `Transaction` for every possible fact.
#[derive(Default)]
struct Scratch {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Scratch {
    fn set<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
    }

    fn get_mut_or_default<T: Send + Sync + Default + 'static>(&mut self) -> &mut T {
        self.values
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("TypeId uniquely identifies T")
    }

    fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch")
            .field("len", &self.values.len())
            .finish()
    }
}

/// One inbound datagram's trip through the pipeline.
///
/// `request` is never mutated after construction — handlers observe it
/// but build their answer into `response`. `response` starts empty;
/// filters and handlers populate it over the handle/post phases. By the
/// time the transaction reaches [`TransactionState::Finalized`] with
/// [`Disposition::Emit`], invariant (4) — exactly one server-id option
/// present — and invariant (2) — option order preserved — are expected
/// to hold; `RelayFramingHandler` and `ServerIdHandler` in
/// [`crate::handler::builtin`] are what make that true rather than the
/// transaction type itself.
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    request: Message,
    response: Option<Message>,
    src_addr: SocketAddr,
    dst_addr: SocketAddr,
    received_at: Instant,
    deadline: Duration,
    marks: HashSet<String>,
    scratch: Scratch,
    disposition: Disposition,
    state: TransactionState,
    timed_out: bool,
}

impl Transaction {
    /// build a fresh transaction for a just-decoded request. Starts in
    /// [`TransactionState::Parsed`] with [`Disposition::Emit`] — a
    /// transaction is assumed worth answering until a filter or handler
    /// says otherwise.
    pub fn new(id: u64, request: Message, src_addr: SocketAddr, dst_addr: SocketAddr) -> Self {
        Transaction {
            id,
            request,
            response: None,
            src_addr,
            dst_addr,
            received_at: Instant::now(),
            deadline: DEFAULT_DEADLINE,
            marks: HashSet::new(),
            scratch: Scratch::default(),
            disposition: Disposition::Emit,
            state: TransactionState::Parsed,
            timed_out: false,
        }
    }

    /// override the default one-second deadline
    pub fn set_deadline(&mut self, deadline: Duration) {
        self.deadline = deadline;
    }

    /// monotonically increasing id assigned by the worker that owns this
    /// transaction, used to correlate log lines and stats.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &Message {
        &self.request
    }

    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Message> {
        self.response.as_mut()
    }

    /// install the response message a handler built. Subsequent calls
    /// replace the prior response outright — only the `handle` phase is
    /// expected to call this (per §4.5, exactly one handler produces the
    /// response shape; later `handle`-phase handlers then mutate options
    /// on it rather than replacing the message).
    pub fn set_response(&mut self, response: Message) {
        self.response = Some(response);
    }

    pub fn src_addr(&self) -> SocketAddr {
        self.src_addr
    }

    pub fn dst_addr(&self) -> SocketAddr {
        self.dst_addr
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// true once `received_at + deadline` has passed. Checked by the
    /// pipeline driver between phases, not inside handler bodies.
    pub fn deadline_exceeded(&self) -> bool {
        self.received_at.elapsed() >= self.deadline
    }

    /// true if [`Pipeline::check_deadline`](crate::pipeline::Pipeline) ever
    /// found this transaction past its deadline and dropped it with reason
    /// `Timeout` (§5). Distinguishes a timeout drop from any other drop
    /// reason so the worker can record it against the dedicated
    /// `timeouts_total` counter (§4.8) rather than folding it into the
    /// generic drop count.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// mark this transaction as having been dropped for exceeding its
    /// deadline. Called only by the pipeline driver.
    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// move to the next lifecycle stage. Panics on a backward or
    /// sideways transition: the pipeline driver is the only caller, and
    /// a misordered call there is a programming error, not a condition
    /// to recover from.
    pub fn advance(&mut self, next: TransactionState) {
        assert!(
            next.rank() > self.state.rank() || (self.state.rank() == 3 && next.rank() == 4),
            "transaction {} tried to move backward: {:?} -> {:?}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// set the disposition, honoring monotonicity: once `Drop` has been
    /// set, a later attempt to set `Emit` is a no-op. This is invariant
    /// (5) from the data model.
    pub fn set_disposition(&mut self, disposition: Disposition) {
        if self.disposition == Disposition::Drop && disposition == Disposition::Emit {
            return;
        }
        self.disposition = disposition;
    }

    /// attach a string tag to this transaction, consulted by
    /// [`crate::filter::Filter::MarkedWith`]
    pub fn mark(&mut self, tag: impl Into<String>) {
        self.marks.insert(tag.into());
    }

    pub fn has_mark(&self, tag: &str) -> bool {
        self.marks.contains(tag)
    }

    pub fn marks(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().map(String::as_str)
    }

    pub fn set_local<T: Send + Sync + 'static>(&mut self, value: T) {
        self.scratch.set(value);
    }

    pub fn get_local<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.scratch.get::<T>()
    }

    pub fn get_mut_local<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.scratch.get_mut::<T>()
    }

    pub fn get_mut_local_or_default<T: Send + Sync + Default + 'static>(&mut self) -> &mut T {
        self.scratch.get_mut_or_default::<T>()
    }

    pub fn remove_local<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.scratch.remove::<T>()
    }

    /// the request's own message type — `RelayForw`/`RelayRepl` for a
    /// relayed datagram. See [`Transaction::innermost_request_type`] for
    /// the client's actual message type.
    pub fn request_type(&self) -> MessageType {
        self.request.message_type()
    }

    /// the client's message type, unwrapping any relay framing. Equal to
    /// [`Transaction::request_type`] for a directly-received request.
    pub fn innermost_request_type(&self) -> MessageType {
        crate::message::innermost(&self.request).message_type()
    }

    /// find the first option matching `code` in the request, unwrapping
    /// any relay-message nesting first (the client's own options live in
    /// the innermost message).
    pub fn request_option(&self, code: OptionCode) -> Option<&DhcpOption> {
        crate::message::innermost(&self.request)
            .opts()
            .and_then(|opts| opts.get(code))
    }

    /// find the first option matching `code` in the response built so
    /// far, if any
    pub fn response_option(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.response
            .as_ref()
            .and_then(|m| m.opts())
            .and_then(|opts| opts.get(code))
    }

    /// add or, if the registry says `code` is at-most-one, replace an
    /// option in the response. Callers that need append-only semantics
    /// regardless of registry metadata should push directly via
    /// `response_mut().unwrap().opts_mut()`.
    pub fn upsert_response_option(
        &mut self,
        registry: &crate::registry::OptionRegistry,
        option: DhcpOption,
    ) {
        let code = option.code();
        if let Some(resp) = self.response.as_mut() {
            if let Some(opts) = resp.opts_mut() {
                if registry.multiplicity(code) == crate::registry::Multiplicity::AtMostOne {
                    opts.remove_all(code);
                }
                opts.push(option);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Solicit;
    use std::net::{IpAddr, Ipv6Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), port)
    }

    fn sample_txn() -> Transaction {
        let req = Message::Solicit(Solicit {
            transaction_id: 42,
            opts: DhcpOptions::new(),
        });
        Transaction::new(1, req, addr(546), addr(547))
    }

    #[test]
    fn disposition_is_monotonic_once_dropped() {
        let mut txn = sample_txn();
        txn.set_disposition(Disposition::Drop);
        txn.set_disposition(Disposition::Emit);
        assert_eq!(txn.disposition(), Disposition::Drop);
    }

    #[test]
    fn scratch_round_trips_typed_values() {
        let mut txn = sample_txn();
        #[derive(Debug, PartialEq)]
        struct Subnet(u32);
        assert!(txn.get_local::<Subnet>().is_none());
        txn.set_local(Subnet(7));
        assert_eq!(txn.get_local::<Subnet>(), Some(&Subnet(7)));
        assert_eq!(txn.remove_local::<Subnet>(), Some(Subnet(7)));
        assert!(txn.get_local::<Subnet>().is_none());
    }

    #[test]
    #[should_panic(expected = "tried to move backward")]
    fn advance_rejects_backward_transitions() {
        let mut txn = sample_txn();
        txn.advance(TransactionState::Classified);
        txn.advance(TransactionState::Parsed);
    }

    #[test]
    fn marks_are_queryable() {
        let mut txn = sample_txn();
        assert!(!txn.has_mark("relay"));
        txn.mark("relay");
        assert!(txn.has_mark("relay"));
    }

    #[test]
    fn timed_out_defaults_to_false_until_marked() {
        let mut txn = sample_txn();
        assert!(!txn.timed_out());
        txn.mark_timed_out();
        assert!(txn.timed_out());
    }
}
