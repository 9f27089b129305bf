//! Listener/dispatcher — §4.6. Binds one UDP socket per configured
//! interface (or a single wildcard socket if none are named), joins the
//! All-DHCP-Relay-Agents-and-Servers (`ff02::1:2`) and All-DHCP-Servers
//! (`ff05::1:3`) multicast groups, and turns inbound datagrams into
//! [`Transaction`]s fed to the worker pool. Outbound responses are sent
//! back through the same socket a request arrived on, tracked via
//! [`SocketId`] stashed in the transaction's scratch space.

use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::tree::ListenerConfig;
use crate::error::IoError;
use crate::message::{decode_message, encode_message, Message};
use crate::stats::Stats;
use crate::transaction::Transaction;

/// identifies which bound socket a transaction arrived through, so its
/// response is sent back out the same one. Stored in
/// [`Transaction`]'s typed scratch via `set_local`/`get_local` rather
/// than as a dedicated field, since only the listener and worker care
/// about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketId(pub usize);

/// a decoded request paired with the socket it should be answered on.
pub struct Inbound {
    pub transaction: Transaction,
    pub partially_decoded: bool,
}

/// a response ready to go out, naming the socket to send it from.
pub struct Outbound {
    pub bytes: Vec<u8>,
    pub dst_addr: SocketAddr,
    pub via: SocketId,
}

struct BoundSocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

/// the bound socket set plus the channels used to move datagrams to and
/// from the worker pool.
pub struct Listener {
    sockets: Vec<Arc<BoundSocket>>,
    next_transaction_id: Arc<AtomicU64>,
}

impl Listener {
    /// bind one socket per `config.interface` entry, or a single socket
    /// on `config.address`/`config.port` if none are named, joining
    /// every group in `config.multicast_join` on each. A named interface
    /// is bound to that device alone via `SO_BINDTODEVICE` (through
    /// `socket2::Socket::bind_device`), so replies for a request
    /// received on one interface's socket actually go back out that
    /// interface rather than a duplicate wildcard socket indistinguishable
    /// from the others.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, IoError> {
        let mut sockets = Vec::new();
        if config.interface.is_empty() {
            sockets.push(Arc::new(bind_one(
                config.address,
                config.port,
                &config.multicast_join,
                None,
            )?));
        } else {
            for name in &config.interface {
                sockets.push(Arc::new(bind_one(
                    config.address,
                    config.port,
                    &config.multicast_join,
                    Some(name.as_str()),
                )?));
            }
        }
        Ok(Listener {
            sockets,
            next_transaction_id: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    /// spawn the receive loop for every bound socket, decoding datagrams
    /// and pushing [`Inbound`] transactions onto `inbound`. Each socket
    /// gets its own task, and the handles are returned rather than
    /// awaited here so a caller can abort every one of them together to
    /// actually stop accepting (§5) instead of aborting one wrapper task
    /// whose children keep running.
    pub fn recv_loop(&self, inbound: mpsc::Sender<Inbound>, stats: Stats) -> Vec<tokio::task::JoinHandle<()>> {
        self.sockets
            .iter()
            .enumerate()
            .map(|(index, socket)| {
                let socket = socket.clone();
                let inbound = inbound.clone();
                let stats = stats.clone();
                let next_id = self.next_transaction_id.clone();
                tokio::spawn(recv_on_socket(SocketId(index), socket, inbound, stats, next_id))
            })
            .collect()
    }

    /// send one outbound datagram through the socket it names.
    pub async fn send(&self, out: &Outbound) -> Result<(), IoError> {
        let socket = self
            .sockets
            .get(out.via.0)
            .expect("worker only emits SocketId values this listener produced");
        socket
            .socket
            .send_to(&out.bytes, out.dst_addr)
            .await
            .map(|_| ())
            .map_err(|source| IoError::Send {
                addr: out.dst_addr.to_string(),
                source,
            })
    }
}

async fn recv_on_socket(
    id: SocketId,
    socket: Arc<BoundSocket>,
    inbound: mpsc::Sender<Inbound>,
    stats: Stats,
    next_id: Arc<AtomicU64>,
) {
    let mut buf = vec![0u8; 65536];
    loop {
        let (len, src_addr) = match socket.socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "recv_from failed");
                continue;
            }
        };
        match decode_message(&buf[..len]) {
            Ok((message, partially_decoded)) => {
                let transaction_id = next_id.fetch_add(1, Ordering::Relaxed);
                let mut txn = Transaction::new(transaction_id, message, src_addr, socket.local_addr);
                txn.set_local(id);
                if inbound
                    .send(Inbound {
                        transaction: txn,
                        partially_decoded,
                    })
                    .await
                    .is_err()
                {
                    debug!("inbound channel closed, stopping receive loop");
                    return;
                }
            }
            Err(err) => {
                stats.record_decode_failure();
                debug!(error = %err, src = %src_addr, "dropping undecodable datagram");
            }
        }
    }
}

fn bind_one(address: Ipv6Addr, port: u16, groups: &[Ipv6Addr], interface: Option<&str>) -> Result<BoundSocket, IoError> {
    let addr = SocketAddrV6::new(address, port, 0, 0);
    let bind_label = match interface {
        Some(name) => format!("{addr}%{name}"),
        None => addr.to_string(),
    };
    let domain = Domain::IPV6;
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(|source| IoError::Bind {
        addr: bind_label.clone(),
        source,
    })?;
    socket.set_reuse_address(true).map_err(|source| IoError::Bind {
        addr: bind_label.clone(),
        source,
    })?;
    socket.set_nonblocking(true).map_err(|source| IoError::Bind {
        addr: bind_label.clone(),
        source,
    })?;

    if let Some(name) = interface {
        // restricts this socket to the named device (SO_BINDTODEVICE on
        // Linux) so a multi-interface `listener.interface` configuration
        // produces sockets that are actually distinct, not N duplicate
        // wildcard binds relying on SO_REUSEADDR to coexist.
        socket.bind_device(Some(name.as_bytes())).map_err(|source| IoError::Bind {
            addr: bind_label.clone(),
            source,
        })?;
    }

    let sock_addr: SocketAddr = SocketAddr::V6(addr);
    socket.bind(&sock_addr.into()).map_err(|source| IoError::Bind {
        addr: bind_label.clone(),
        source,
    })?;

    for group in groups {
        // joined with scope id 0 (unspecified); once bound to a device
        // via `bind_device` above, the kernel scopes the join to that
        // device's link for a wildcard address.
        socket
            .join_multicast_v6(group, 0)
            .map_err(|source| IoError::Bind {
                addr: bind_label.clone(),
                source,
            })?;
    }

    let std_socket: std::net::UdpSocket = socket.into();
    let tokio_socket = UdpSocket::from_std(std_socket).map_err(|source| IoError::Bind {
        addr: bind_label.clone(),
        source,
    })?;
    Ok(BoundSocket {
        local_addr: SocketAddr::V6(addr),
        socket: tokio_socket,
    })
}

/// re-encode a [`Message`] for [`Listener::send`]; split out so workers
/// can call it without reaching into `message` directly.
pub fn encode_for_send(message: &Message) -> Result<Vec<u8>, crate::error::EncodeError> {
    encode_message(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_wildcard_socket_succeeds() {
        let socket = bind_one(Ipv6Addr::UNSPECIFIED, 0, &[], None).unwrap();
        assert!(matches!(socket.local_addr, SocketAddr::V6(_)));
    }
}
