//! Handler trait and the pipeline's built-in handler set.
//!
//! A [`Handler`] opts into one or more [`Phase`]s; the pipeline driver in
//! [`crate::pipeline`] invokes only the hook matching the phase it is
//! currently running. Handlers are otherwise ordinary `Arc<dyn Handler>`
//! values attached to [`crate::filter::FilterNode`]s — there is no
//! separate handler registry, since a handler with no filter attachment
//! point never runs.

use crate::error::HandlerError;
use crate::transaction::{Disposition, Transaction};

/// which of the three passes a handler's hook belongs to, per §4.3:
/// pre-phase handlers classify and mark the transaction; handle-phase
/// handlers build the response; post-phase handlers finalize it
/// (framing, counters, logging) and are the only ones invoked on a
/// dropped transaction when `run_on_drop` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Handle,
    Post,
}

/// what a handler's hook decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// run the next handler in this phase
    Continue,
    /// stop running handlers for the remainder of this phase (not the
    /// whole pipeline — later phases still run, subject to
    /// `disposition`)
    StopPhase,
}

/// A pipeline participant. Most handlers implement exactly one of
/// `pre`/`handle`/`post` and return `Ok(())` trivially from the others
/// via the default bodies; [`Handler::phases`] tells the driver which
/// hooks are meaningful so it can skip calling the no-op ones.
///
/// Hooks are synchronous — the pipeline runs entirely on a worker's own
/// stack with no yield points, so a handler that needs async I/O (a
/// store lookup, say) is expected to block its worker thread or hand
/// off to a pre-resolved value computed outside the pipeline. Workers
/// themselves are tokio tasks; only the dispatch loop around the
/// pipeline is async, not the pipeline itself.
pub trait Handler: Send + Sync {
    /// stable name, used in config, logs, and the `stats` control
    /// command
    fn name(&self) -> &'static str;

    /// which phases this handler participates in
    fn phases(&self) -> &'static [Phase];

    /// relative ordering within a phase, lower runs first. Handlers with
    /// equal precedence run in configuration order (§4.4's tie-break
    /// rule).
    fn precedence(&self) -> i32 {
        0
    }

    /// if true, this handler's `post` hook still runs even when
    /// `txn.disposition()` is `Drop` by the time the post phase starts.
    /// Used for handlers that must record a drop (counters, audit
    /// logging) rather than ones that finish building a response.
    fn run_on_drop(&self) -> bool {
        false
    }

    fn pre(&self, _txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
        Ok(HandlerOutcome::Continue)
    }

    fn handle(&self, _txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
        Ok(HandlerOutcome::Continue)
    }

    fn post(&self, _txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
        Ok(HandlerOutcome::Continue)
    }
}

/// mandatory, always-on post-phase handlers and the optional
/// configurable handlers named in the built-in handler set.
pub mod builtin {
    use std::collections::HashMap;
    use std::net::Ipv6Addr;
    use std::sync::Mutex;

    use super::{Handler, HandlerOutcome, Phase};
    use crate::duid::Duid;
    use crate::error::HandlerError;
    use crate::message::{Message, MessageType};
    use crate::options::basic::ReconfAccept;
    use crate::options::ia::{IaAddr, Status, StatusCode};
    use crate::options::{DhcpOption, OptionCode};
    use crate::transaction::{Disposition, Transaction};

    /// ensures the response carries exactly one server-id option,
    /// satisfying invariant (4). Runs last among post handlers that
    /// write options, since it must see whatever `ServerId` the handle
    /// phase may already have added and not duplicate it.
    pub struct ServerIdHandler {
        pub server_id: Duid,
    }

    impl Handler for ServerIdHandler {
        fn name(&self) -> &'static str {
            "server-id"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Post]
        }
        fn precedence(&self) -> i32 {
            100
        }
        fn post(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            if let Some(resp) = txn.response_mut() {
                if let Some(opts) = resp.opts_mut() {
                    opts.remove_all(OptionCode::ServerId);
                    opts.push(DhcpOption::ServerId(self.server_id.clone()));
                }
            }
            Ok(HandlerOutcome::Continue)
        }
    }

    /// maps a client request type to the correct response type per
    /// RFC 8415 §18.3 (Solicit -> Advertise unless rapid-commit applies,
    /// Request/Renew/Rebind/Release/Decline/InformationRequest -> Reply).
    /// Runs in the handle phase, before handlers that populate options,
    /// since it decides the shape of `response`.
    pub struct ResponseTypeHandler;

    impl Handler for ResponseTypeHandler {
        fn name(&self) -> &'static str {
            "response-type"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Handle]
        }
        fn precedence(&self) -> i32 {
            -100
        }
        fn handle(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            use crate::message::*;
            use crate::options::DhcpOptions;

            let inner = innermost(txn.request());
            let txn_id = match inner {
                Message::Solicit(m) => m.transaction_id,
                Message::Request(m) => m.transaction_id,
                Message::Confirm(m) => m.transaction_id,
                Message::Renew(m) => m.transaction_id,
                Message::Rebind(m) => m.transaction_id,
                Message::Release(m) => m.transaction_id,
                Message::Decline(m) => m.transaction_id,
                Message::InformationRequest(m) => m.transaction_id,
                _ => return Ok(HandlerOutcome::Continue),
            };

            let rapid_commit = txn.request_option(OptionCode::RapidCommit).is_some();

            let response = match txn.innermost_request_type() {
                MessageType::Solicit if rapid_commit => Message::Reply(Reply {
                    transaction_id: txn_id,
                    opts: DhcpOptions::new(),
                }),
                MessageType::Solicit => Message::Advertise(Advertise {
                    transaction_id: txn_id,
                    opts: DhcpOptions::new(),
                }),
                MessageType::Request
                | MessageType::Confirm
                | MessageType::Renew
                | MessageType::Rebind
                | MessageType::Release
                | MessageType::Decline
                | MessageType::InformationRequest => Message::Reply(Reply {
                    transaction_id: txn_id,
                    opts: DhcpOptions::new(),
                }),
                _ => return Ok(HandlerOutcome::Continue),
            };
            txn.set_response(response);
            Ok(HandlerOutcome::Continue)
        }
    }

    /// copies the client-id from request to response unchanged, a
    /// mandatory part of every reply per RFC 8415 §18.3.
    pub struct EchoClientIdHandler;

    impl Handler for EchoClientIdHandler {
        fn name(&self) -> &'static str {
            "echo-client-id"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Handle]
        }
        fn precedence(&self) -> i32 {
            -90
        }
        fn handle(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            let client_id = txn.request_option(OptionCode::ClientId).cloned();
            if let (Some(DhcpOption::ClientId(duid)), Some(resp)) = (client_id, txn.response_mut()) {
                if let Some(opts) = resp.opts_mut() {
                    opts.push(DhcpOption::ClientId(duid));
                }
            }
            Ok(HandlerOutcome::Continue)
        }
    }

    /// in-memory backing for [`StaticAddressPoolHandler`]: a fixed list
    /// of addresses handed out first-come-first-served, keyed by client
    /// DUID so repeated requests from the same client see the same
    /// lease. Not a [`crate::store::LeaseStore`] implementation — this
    /// handler demonstrates the handle-phase contract against a trivial
    /// backing, the way a store-backed handler would look with a real
    /// one substituted in.
    pub struct StaticAddressPoolHandler {
        pool: Vec<Ipv6Addr>,
        preferred_life: u32,
        valid_life: u32,
        leases: Mutex<HashMap<Duid, Ipv6Addr>>,
    }

    impl StaticAddressPoolHandler {
        pub fn new(pool: Vec<Ipv6Addr>, preferred_life: u32, valid_life: u32) -> Self {
            StaticAddressPoolHandler {
                pool,
                preferred_life,
                valid_life,
                leases: Mutex::new(HashMap::new()),
            }
        }

        fn allocate(&self, client: &Duid) -> Option<Ipv6Addr> {
            let mut leases = self.leases.lock().expect("lease map poisoned");
            if let Some(addr) = leases.get(client) {
                return Some(*addr);
            }
            let taken: std::collections::HashSet<_> = leases.values().copied().collect();
            let addr = self.pool.iter().copied().find(|a| !taken.contains(a))?;
            leases.insert(client.clone(), addr);
            Some(addr)
        }
    }

    impl Handler for StaticAddressPoolHandler {
        fn name(&self) -> &'static str {
            "static-address-pool"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Handle]
        }
        fn handle(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            let client = match txn.request_option(OptionCode::ClientId) {
                Some(DhcpOption::ClientId(duid)) => duid.clone(),
                _ => return Ok(HandlerOutcome::Continue),
            };
            let requested_ia = match txn.request_option(OptionCode::IaNa) {
                Some(DhcpOption::IaNa(ia)) => ia.clone(),
                _ => return Ok(HandlerOutcome::Continue),
            };

            let allocation = self.allocate(&client);
            let Some(resp) = txn.response_mut() else {
                return Ok(HandlerOutcome::Continue);
            };
            let Some(opts) = resp.opts_mut() else {
                return Ok(HandlerOutcome::Continue);
            };

            use crate::options::ia::IaNa as IaNaOpt;
            use crate::options::DhcpOptions;

            let mut ia_opts = DhcpOptions::new();
            match allocation {
                Some(addr) => {
                    ia_opts.push(DhcpOption::IaAddr(IaAddr {
                        addr,
                        preferred_life: self.preferred_life,
                        valid_life: self.valid_life,
                        opts: DhcpOptions::new(),
                    }));
                }
                None => {
                    ia_opts.push(DhcpOption::StatusCode(StatusCode::failure(
                        Status::NoAddrsAvail,
                        "address pool exhausted",
                    )));
                }
            }
            opts.push(DhcpOption::IaNa(IaNaOpt {
                id: requested_ia.id,
                t1: requested_ia.t1,
                t2: requested_ia.t2,
                opts: ia_opts,
            }));
            Ok(HandlerOutcome::Continue)
        }
    }

    /// walks every IA_NA/IA_PD in the response and ensures each carries a
    /// status code, defaulting to `Success` when a handle-phase handler
    /// populated addresses/prefixes but left status implicit.
    pub struct IaStatusHandler;

    impl Handler for IaStatusHandler {
        fn name(&self) -> &'static str {
            "ia-status"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Post]
        }
        fn precedence(&self) -> i32 {
            10
        }
        fn post(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            let Some(resp) = txn.response_mut() else {
                return Ok(HandlerOutcome::Continue);
            };
            let Some(opts) = resp.opts_mut() else {
                return Ok(HandlerOutcome::Continue);
            };
            for opt in opts.iter_mut() {
                if let DhcpOption::IaNa(ia) = opt {
                    if ia.opts.get(OptionCode::StatusCode).is_none() {
                        ia.opts.push(DhcpOption::StatusCode(StatusCode::success()));
                    }
                }
                if let DhcpOption::IaPd(ia) = opt {
                    if ia.opts.get(OptionCode::StatusCode).is_none() {
                        ia.opts.push(DhcpOption::StatusCode(StatusCode::success()));
                    }
                }
            }
            Ok(HandlerOutcome::Continue)
        }
    }

    /// strips options the client never asked for via option-request
    /// (ORO), leaving only options the handle phase is required to
    /// always send (server-id, client-id, IA containers, status code).
    /// Mandatory, runs after every option-populating handler.
    pub struct StripUnsolicitedHandler;

    impl Handler for StripUnsolicitedHandler {
        fn name(&self) -> &'static str {
            "strip-unsolicited"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Post]
        }
        fn precedence(&self) -> i32 {
            50
        }
        fn post(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            let requested: Vec<u16> = match txn.request_option(OptionCode::Oro) {
                Some(DhcpOption::Oro(oro)) => oro.0.clone(),
                _ => return Ok(HandlerOutcome::Continue),
            };
            const ALWAYS_SENT: &[OptionCode] = &[
                OptionCode::ServerId,
                OptionCode::ClientId,
                OptionCode::IaNa,
                OptionCode::IaTa,
                OptionCode::IaPd,
                OptionCode::StatusCode,
                OptionCode::RelayMsg,
                OptionCode::RapidCommit,
                OptionCode::Preference,
            ];
            let Some(resp) = txn.response_mut() else {
                return Ok(HandlerOutcome::Continue);
            };
            let Some(opts) = resp.opts_mut() else {
                return Ok(HandlerOutcome::Continue);
            };
            opts.0.retain(|opt| {
                let code: u16 = opt.code().into();
                ALWAYS_SENT.contains(&opt.code()) || requested.contains(&code)
            });
            Ok(HandlerOutcome::Continue)
        }
    }

    /// if the request arrived wrapped in RelayForw, wraps the response in
    /// a matching RelayRepl chain with mirrored hop count and addresses,
    /// per invariant (3). Mandatory, runs last of all post handlers since
    /// every other post handler expects to see the unwrapped response.
    pub struct RelayFramingHandler;

    impl Handler for RelayFramingHandler {
        fn name(&self) -> &'static str {
            "relay-framing"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Post]
        }
        fn precedence(&self) -> i32 {
            i32::MAX
        }
        fn run_on_drop(&self) -> bool {
            false
        }
        fn post(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            use crate::message::RelayMessage;
            use crate::options::relay::RelayMsg;
            use crate::options::DhcpOptions;

            let Message::RelayForw(relay) = txn.request() else {
                return Ok(HandlerOutcome::Continue);
            };
            let hop_count = relay.hop_count;
            let link_address = relay.link_address;
            let peer_address = relay.peer_address;
            let interface_id = relay.opts.get(OptionCode::InterfaceId).cloned();

            let Some(inner) = txn.response_mut().take() else {
                return Ok(HandlerOutcome::Continue);
            };

            let mut wrapper_opts = DhcpOptions::new();
            wrapper_opts.push(DhcpOption::RelayMsg(RelayMsg(Box::new(inner))));
            if let Some(interface_id) = interface_id {
                wrapper_opts.push(interface_id);
            }
            txn.set_response(Message::RelayRepl(RelayMessage {
                hop_count,
                link_address,
                peer_address,
                opts: wrapper_opts,
            }));
            Ok(HandlerOutcome::Continue)
        }
    }

    /// answers rapid-commit Solicits by confirming the commit, per
    /// RFC 8415 §18.3.2: a Reply built in response to rapid-commit must
    /// itself carry a Rapid Commit option.
    pub struct RapidCommitHandler;

    impl Handler for RapidCommitHandler {
        fn name(&self) -> &'static str {
            "rapid-commit"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Handle]
        }
        fn precedence(&self) -> i32 {
            -80
        }
        fn handle(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            if txn.request_option(OptionCode::RapidCommit).is_none() {
                return Ok(HandlerOutcome::Continue);
            }
            if let Some(resp) = txn.response_mut() {
                if let Some(opts) = resp.opts_mut() {
                    opts.push(DhcpOption::RapidCommit(Default::default()));
                    opts.push(DhcpOption::ReconfAccept(ReconfAccept::default()));
                }
            }
            Ok(HandlerOutcome::Continue)
        }
    }

    /// silently drops client-originated message types a server should
    /// never answer if received unwrapped (resolves the open question of
    /// what to do with a client message type arriving directly: count
    /// and discard rather than reply with an error).
    pub struct RejectDirectClientMessagesHandler {
        pub dropped_counter: std::sync::Arc<std::sync::atomic::AtomicU64>,
    }

    impl Handler for RejectDirectClientMessagesHandler {
        fn name(&self) -> &'static str {
            "reject-direct-client-messages"
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Pre]
        }
        fn precedence(&self) -> i32 {
            i32::MIN
        }
        fn pre(&self, txn: &mut Transaction) -> Result<HandlerOutcome, HandlerError> {
            use crate::message::Message;

            let malformed_relay = crate::message::is_malformed_direct_relay(txn.request()).is_err();
            let is_server_or_reply_type = !txn.request().is_client_originated()
                && !matches!(txn.request(), Message::RelayForw(_));
            if malformed_relay || is_server_or_reply_type {
                self.dropped_counter
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                txn.set_disposition(Disposition::Drop);
                return Ok(HandlerOutcome::StopPhase);
            }
            Ok(HandlerOutcome::Continue)
        }
    }
}
