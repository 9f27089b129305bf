//! Filter tree — selects which handlers apply to a transaction.
//!
//! A tree of predicates is declared in configuration; at load time it is
//! linearized into a flat list of (filter chain, handler) pairs so the
//! pipeline driver never has to walk a tree per datagram. Linearization
//! order is depth-first, children in declared order, a parent's own
//! handlers (if it's also a handler attachment point) running before its
//! children's.

use std::net::Ipv6Addr;
use std::sync::Arc;

use ipnet::Ipv6Net;

use crate::duid::Duid;
use crate::handler::Handler;
use crate::transaction::Transaction;

/// a single predicate evaluated against a transaction. Filters compose
/// into a tree via [`FilterNode::children`]; a node's handlers apply
/// only to transactions that satisfy every filter from the root down to
/// that node.
#[derive(Debug, Clone)]
pub enum Filter {
    /// matches every transaction; used at the tree root and for
    /// catch-all leaves
    AlwaysMatch,
    /// inverts another filter
    Not(Box<Filter>),
    /// matches transactions carrying the given mark (set by an earlier
    /// handler via [`Transaction::mark`])
    MarkedWith(String),
    /// matches requests whose source address falls in the given subnet
    SubnetMatch(Ipv6Net),
    /// matches requests arriving through relay options that name the
    /// given interface id
    InterfaceMatch(String),
    /// matches requests whose client DUID equals the given value
    DuidMatch(Duid),
    /// matches requests carrying a Remote-ID option with the given
    /// enterprise number
    RemoteIdMatch { enterprise_number: u32 },
    /// matches requests carrying the given Subscriber-ID
    SubscriberIdMatch(Vec<u8>),
    /// an escape hatch for predicates this crate doesn't name directly.
    /// Configuration cannot produce this variant; it exists for
    /// handlers registered programmatically.
    Custom(Arc<dyn Fn(&Transaction) -> bool + Send + Sync>),
}

impl Filter {
    /// evaluate this filter against a transaction
    pub fn matches(&self, txn: &Transaction) -> bool {
        match self {
            Filter::AlwaysMatch => true,
            Filter::Not(inner) => !inner.matches(txn),
            Filter::MarkedWith(tag) => txn.has_mark(tag),
            Filter::SubnetMatch(net) => net.contains(&source_address(txn)),
            Filter::InterfaceMatch(expected) => interface_id(txn)
                .map(|found| &found == expected)
                .unwrap_or(false),
            Filter::DuidMatch(expected) => client_duid(txn)
                .map(|found| &found == expected)
                .unwrap_or(false),
            Filter::RemoteIdMatch { enterprise_number } => remote_id_enterprise(txn)
                .map(|found| found == *enterprise_number)
                .unwrap_or(false),
            Filter::SubscriberIdMatch(expected) => subscriber_id(txn)
                .map(|found| &found == expected)
                .unwrap_or(false),
            Filter::Custom(f) => f(txn),
        }
    }
}

fn source_address(txn: &Transaction) -> Ipv6Addr {
    match txn.src_addr().ip() {
        std::net::IpAddr::V6(addr) => addr,
        std::net::IpAddr::V4(addr) => addr.to_ipv6_mapped(),
    }
}

fn interface_id(txn: &Transaction) -> Option<String> {
    use crate::options::{DhcpOption, OptionCode};
    match txn.request_option(OptionCode::InterfaceId) {
        Some(DhcpOption::InterfaceId(opt)) => Some(String::from_utf8_lossy(&opt.0).into_owned()),
        _ => None,
    }
}

fn client_duid(txn: &Transaction) -> Option<Duid> {
    use crate::options::{DhcpOption, OptionCode};
    match txn.request_option(OptionCode::ClientId) {
        Some(DhcpOption::ClientId(duid)) => Some(duid.clone()),
        _ => None,
    }
}

fn remote_id_enterprise(txn: &Transaction) -> Option<u32> {
    use crate::options::{DhcpOption, OptionCode};
    match txn.request_option(OptionCode::RemoteId) {
        Some(DhcpOption::RemoteId(opt)) => Some(opt.enterprise_number),
        _ => None,
    }
}

fn subscriber_id(txn: &Transaction) -> Option<Vec<u8>> {
    use crate::options::{DhcpOption, OptionCode};
    match txn.request_option(OptionCode::SubscriberId) {
        Some(DhcpOption::SubscriberId(opt)) => Some(opt.0.clone()),
        _ => None,
    }
}

/// a node in the declared filter tree. Each node may carry its own
/// handlers — applied to any transaction reaching the node, i.e. one
/// matching every filter from the root down to it — and child nodes
/// that narrow the match further.
pub struct FilterNode {
    pub filter: Filter,
    pub handlers: Vec<Arc<dyn Handler>>,
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    pub fn new(filter: Filter) -> Self {
        FilterNode {
            filter,
            handlers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_child(mut self, child: FilterNode) -> Self {
        self.children.push(child);
        self
    }
}

/// one filter, paired with the handler it guards, as selected by
/// linearization. `path` holds every filter from the root to this node
/// inclusive — a transaction only receives `handler` if it matches all
/// of them.
#[derive(Clone)]
pub struct LinearizedEntry {
    pub path: Vec<Filter>,
    pub handler: Arc<dyn Handler>,
}

impl LinearizedEntry {
    /// true if the transaction satisfies every filter on this entry's path
    pub fn applies(&self, txn: &Transaction) -> bool {
        self.path.iter().all(|f| f.matches(txn))
    }
}

/// flatten a filter tree into a list of (path, handler) pairs, depth
/// first, in declared order, a node's own handlers preceding its
/// children's. This is done once at configuration load time so the hot
/// path (one evaluation per transaction) never walks a tree.
pub fn linearize(root: &FilterNode) -> Vec<LinearizedEntry> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    linearize_into(root, &mut path, &mut out);
    out
}

fn linearize_into(node: &FilterNode, path: &mut Vec<Filter>, out: &mut Vec<LinearizedEntry>) {
    path.push(node.filter.clone());
    for handler in &node.handlers {
        out.push(LinearizedEntry {
            path: path.clone(),
            handler: handler.clone(),
        });
    }
    for child in &node.children {
        linearize_into(child, path, out);
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Phase, HandlerOutcome};
    use crate::message::Solicit;
    use crate::options::DhcpOptions;
    use crate::message::Message;
    use std::net::{IpAddr, SocketAddr};

    struct NoopHandler(&'static str);

    impl Handler for NoopHandler {
        fn name(&self) -> &'static str {
            self.0
        }
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Handle]
        }
        fn handle(&self, _txn: &mut Transaction) -> Result<HandlerOutcome, crate::error::HandlerError> {
            Ok(HandlerOutcome::Continue)
        }
    }

    fn sample_txn() -> Transaction {
        let req = Message::Solicit(Solicit {
            transaction_id: 1,
            opts: DhcpOptions::new(),
        });
        Transaction::new(
            1,
            req,
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 546),
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 547),
        )
    }

    #[test]
    fn linearize_preserves_declared_order_depth_first() {
        let tree = FilterNode::new(Filter::AlwaysMatch)
            .with_handler(Arc::new(NoopHandler("root")))
            .with_child(
                FilterNode::new(Filter::MarkedWith("relay".into()))
                    .with_handler(Arc::new(NoopHandler("child-a"))),
            )
            .with_child(
                FilterNode::new(Filter::Not(Box::new(Filter::MarkedWith("relay".into()))))
                    .with_handler(Arc::new(NoopHandler("child-b"))),
            );
        let entries = linearize(&tree);
        let names: Vec<_> = entries.iter().map(|e| e.handler.name()).collect();
        assert_eq!(names, vec!["root", "child-a", "child-b"]);
    }

    #[test]
    fn subnet_match_respects_prefix_length() {
        let net: Ipv6Net = "2001:db8::/32".parse().unwrap();
        let inside: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let outside: Ipv6Addr = "2001:db9::1".parse().unwrap();
        assert!(net.contains(&inside));
        assert!(!net.contains(&outside));
    }

    #[test]
    fn marked_with_filter_reads_transaction_marks() {
        let mut txn = sample_txn();
        let f = Filter::MarkedWith("relay".into());
        assert!(!f.matches(&txn));
        txn.mark("relay");
        assert!(f.matches(&txn));
    }
}
