//! DHCPv6 messages — RFC 8415 §8, RFC 5007/5460 (leasequery), RFC 3315
//! relay framing.
//!
//! Every non-relay message shares the same wire shape: a 1-byte message
//! type, a 3-byte transaction ID, and a trailing options blob. Relay
//! messages (`RelayForw`/`RelayRepl`) drop the transaction ID in favor of
//! hop-count and link/peer addresses, and carry the original message
//! nested inside a Relay Message option (`OPTION_RELAY_MSG`).

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::options::DhcpOptions;

/// UDP port DHCPv6 servers and relay agents listen on.
pub const SERVER_PORT: u16 = 547;
/// UDP port DHCPv6 clients listen on.
pub const CLIENT_PORT: u16 = 546;

/// DHCPv6 message type, RFC 8415 §7.3 plus the leasequery extensions of
/// RFC 5007 §3.2 and RFC 5460 §§5,7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// 1: client to server/relay, locate servers
    Solicit,
    /// 2: server to client, in response to Solicit
    Advertise,
    /// 3: client to server/relay, request bindings
    Request,
    /// 4: client to server/relay, confirm bindings still appropriate
    Confirm,
    /// 5: client to server/relay, extend lifetimes
    Renew,
    /// 6: client to server/relay, rebind without a known server
    Rebind,
    /// 7: server to client, in response to Request/Renew/Rebind/... etc
    Reply,
    /// 8: client to server/relay, release assigned bindings
    Release,
    /// 9: client to server/relay, decline an assigned address
    Decline,
    /// 10: server to client, asks client to Renew/Rebind/Information-Request
    Reconfigure,
    /// 11: client to server/relay, request configuration without addresses
    InformationRequest,
    /// 12: relay to server/relay, wraps a client message
    RelayForw,
    /// 13: server to relay, wraps a server message
    RelayRepl,
    /// 14 (RFC 5007): requester to server, query a lease
    LeaseQuery,
    /// 15 (RFC 5007): server to requester, reply to a leasequery
    LeaseQueryReply,
    /// 16 (RFC 5460): server to requester, terminates a bulk-leasequery
    /// TCP session after all matching data has been sent
    LeaseQueryDone,
    /// 17 (RFC 5460): server to requester, one lease record within a
    /// bulk-leasequery reply stream
    LeaseQueryData,
    /// unrecognized message type, preserved verbatim
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(n: u8) -> Self {
        use MessageType::*;
        match n {
            1 => Solicit,
            2 => Advertise,
            3 => Request,
            4 => Confirm,
            5 => Renew,
            6 => Rebind,
            7 => Reply,
            8 => Release,
            9 => Decline,
            10 => Reconfigure,
            11 => InformationRequest,
            12 => RelayForw,
            13 => RelayRepl,
            14 => LeaseQuery,
            15 => LeaseQueryReply,
            16 => LeaseQueryDone,
            17 => LeaseQueryData,
            n => Unknown(n),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> u8 {
        use MessageType::*;
        match t {
            Solicit => 1,
            Advertise => 2,
            Request => 3,
            Confirm => 4,
            Renew => 5,
            Rebind => 6,
            Reply => 7,
            Release => 8,
            Decline => 9,
            Reconfigure => 10,
            InformationRequest => 11,
            RelayForw => 12,
            RelayRepl => 13,
            LeaseQuery => 14,
            LeaseQueryReply => 15,
            LeaseQueryDone => 16,
            LeaseQueryData => 17,
            Unknown(n) => n,
        }
    }
}

fn decode_txn_body(decoder: &mut Decoder<'_>) -> DecodeResult<(u32, DhcpOptions)> {
    let b = decoder.read::<3>()?;
    let xid = u32::from_be_bytes([0, b[0], b[1], b[2]]);
    let opts = DhcpOptions::decode(decoder)?;
    Ok((xid, opts))
}

fn encode_txn_body(e: &mut Encoder<'_>, transaction_id: u32, opts: &DhcpOptions) -> EncodeResult<()> {
    let bytes = transaction_id.to_be_bytes();
    e.write_slice(&bytes[1..])?;
    opts.encode(e)
}

macro_rules! message_body {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub struct $name {
            /// client-chosen transaction ID (low 24 bits significant); echoed
            /// verbatim by the server in its reply
            pub transaction_id: u32,
            /// message options
            pub opts: DhcpOptions,
        }
    };
}

message_body!(Solicit, "a Solicit message, RFC 8415 §18.2.1");
message_body!(Advertise, "an Advertise message, RFC 8415 §18.3.9");
message_body!(Request, "a Request message, RFC 8415 §18.2.2");
message_body!(Confirm, "a Confirm message, RFC 8415 §18.2.3");
message_body!(Renew, "a Renew message, RFC 8415 §18.2.4");
message_body!(Rebind, "a Rebind message, RFC 8415 §18.2.5");
message_body!(Reply, "a Reply message, RFC 8415 §18.3.10");
message_body!(Release, "a Release message, RFC 8415 §18.2.6");
message_body!(Decline, "a Decline message, RFC 8415 §18.2.7");
message_body!(Reconfigure, "a Reconfigure message, RFC 8415 §18.3.11");
message_body!(
    InformationRequest,
    "an Information-Request message, RFC 8415 §18.2.6"
);
message_body!(LeaseQuery, "a LEASEQUERY message, RFC 5007 §4.1.1");
message_body!(
    LeaseQueryReply,
    "a LEASEQUERY-REPLY message, RFC 5007 §4.1.2"
);
message_body!(
    LeaseQueryDone,
    "a LEASEQUERY-DONE message, RFC 5460 §5.4, terminates a bulk-leasequery TCP stream"
);
message_body!(
    LeaseQueryData,
    "a LEASEQUERY-DATA message, RFC 5460 §5.3, one record within a bulk-leasequery reply"
);

/// shared shape of RelayForw (RFC 8415 §8.1) and RelayRepl (§8.2): no
/// transaction ID of its own — the inner message, reached via the nested
/// Relay Message option, carries that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    /// number of relay agents this message has passed through so far
    pub hop_count: u8,
    /// address of the link the client is attached to
    pub link_address: Ipv6Addr,
    /// address the relay received this message from (the client's address
    /// for the first relay, or the previous relay's link-local address)
    pub peer_address: Ipv6Addr,
    /// options, including the nested Relay Message option and any
    /// Interface-ID/Remote-ID/Subscriber-ID the relay attaches
    pub opts: DhcpOptions,
}

fn decode_relay_body(decoder: &mut Decoder<'_>) -> DecodeResult<RelayMessage> {
    let hop_count = decoder.read_u8()?;
    let link_address = Ipv6Addr::from(decoder.read::<16>()?);
    let peer_address = Ipv6Addr::from(decoder.read::<16>()?);
    let opts = DhcpOptions::decode(decoder)?;
    Ok(RelayMessage {
        hop_count,
        link_address,
        peer_address,
        opts,
    })
}

fn encode_relay_body(e: &mut Encoder<'_>, relay: &RelayMessage) -> EncodeResult<()> {
    e.write_u8(relay.hop_count)?;
    e.write_slice(&relay.link_address.octets())?;
    e.write_slice(&relay.peer_address.octets())?;
    relay.opts.encode(e)
}

/// A complete DHCPv6 message, tagged by its message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// 1
    Solicit(Solicit),
    /// 2
    Advertise(Advertise),
    /// 3
    Request(Request),
    /// 4
    Confirm(Confirm),
    /// 5
    Renew(Renew),
    /// 6
    Rebind(Rebind),
    /// 7
    Reply(Reply),
    /// 8
    Release(Release),
    /// 9
    Decline(Decline),
    /// 10
    Reconfigure(Reconfigure),
    /// 11
    InformationRequest(InformationRequest),
    /// 12
    RelayForw(RelayMessage),
    /// 13
    RelayRepl(RelayMessage),
    /// 14
    LeaseQuery(LeaseQuery),
    /// 15
    LeaseQueryReply(LeaseQueryReply),
    /// 16
    LeaseQueryDone(LeaseQueryDone),
    /// 17
    LeaseQueryData(LeaseQueryData),
}

impl Message {
    /// the message type tag for this message
    pub fn message_type(&self) -> MessageType {
        use Message::*;
        match self {
            Solicit(_) => MessageType::Solicit,
            Advertise(_) => MessageType::Advertise,
            Request(_) => MessageType::Request,
            Confirm(_) => MessageType::Confirm,
            Renew(_) => MessageType::Renew,
            Rebind(_) => MessageType::Rebind,
            Reply(_) => MessageType::Reply,
            Release(_) => MessageType::Release,
            Decline(_) => MessageType::Decline,
            Reconfigure(_) => MessageType::Reconfigure,
            InformationRequest(_) => MessageType::InformationRequest,
            RelayForw(_) => MessageType::RelayForw,
            RelayRepl(_) => MessageType::RelayRepl,
            LeaseQuery(_) => MessageType::LeaseQuery,
            LeaseQueryReply(_) => MessageType::LeaseQueryReply,
            LeaseQueryDone(_) => MessageType::LeaseQueryDone,
            LeaseQueryData(_) => MessageType::LeaseQueryData,
        }
    }

    /// options carried by this message. Always `Some`; every variant
    /// carries a uniform option list.
    pub fn opts(&self) -> Option<&DhcpOptions> {
        use Message::*;
        Some(match self {
            Solicit(m) => &m.opts,
            Advertise(m) => &m.opts,
            Request(m) => &m.opts,
            Confirm(m) => &m.opts,
            Renew(m) => &m.opts,
            Rebind(m) => &m.opts,
            Reply(m) => &m.opts,
            Release(m) => &m.opts,
            Decline(m) => &m.opts,
            Reconfigure(m) => &m.opts,
            InformationRequest(m) => &m.opts,
            RelayForw(m) => &m.opts,
            RelayRepl(m) => &m.opts,
            LeaseQuery(m) => &m.opts,
            LeaseQueryReply(m) => &m.opts,
            LeaseQueryDone(m) => &m.opts,
            LeaseQueryData(m) => &m.opts,
        })
    }

    /// mutable access to the options carried by this message
    pub fn opts_mut(&mut self) -> Option<&mut DhcpOptions> {
        use Message::*;
        Some(match self {
            Solicit(m) => &mut m.opts,
            Advertise(m) => &mut m.opts,
            Request(m) => &mut m.opts,
            Confirm(m) => &mut m.opts,
            Renew(m) => &mut m.opts,
            Rebind(m) => &mut m.opts,
            Reply(m) => &mut m.opts,
            Release(m) => &mut m.opts,
            Decline(m) => &mut m.opts,
            Reconfigure(m) => &mut m.opts,
            InformationRequest(m) => &mut m.opts,
            RelayForw(m) => &mut m.opts,
            RelayRepl(m) => &mut m.opts,
            LeaseQuery(m) => &mut m.opts,
            LeaseQueryReply(m) => &mut m.opts,
            LeaseQueryDone(m) => &mut m.opts,
            LeaseQueryData(m) => &mut m.opts,
        })
    }

    /// true if this message type is only ever sent by a client (a server
    /// receiving one directly, not wrapped in a RelayForw, is malformed
    /// traffic per RFC 8415 §16)
    pub fn is_client_originated(&self) -> bool {
        matches!(
            self.message_type(),
            MessageType::Solicit
                | MessageType::Request
                | MessageType::Confirm
                | MessageType::Renew
                | MessageType::Rebind
                | MessageType::Release
                | MessageType::Decline
                | MessageType::InformationRequest
                | MessageType::LeaseQuery
        )
    }
}

impl Decodable for Message {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let msg_type = decoder.read_u8()?;
        Ok(match MessageType::from(msg_type) {
            MessageType::Solicit => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Solicit(Solicit { transaction_id, opts })
            }
            MessageType::Advertise => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Advertise(Advertise { transaction_id, opts })
            }
            MessageType::Request => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Request(Request { transaction_id, opts })
            }
            MessageType::Confirm => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Confirm(Confirm { transaction_id, opts })
            }
            MessageType::Renew => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Renew(Renew { transaction_id, opts })
            }
            MessageType::Rebind => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Rebind(Rebind { transaction_id, opts })
            }
            MessageType::Reply => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Reply(Reply { transaction_id, opts })
            }
            MessageType::Release => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Release(Release { transaction_id, opts })
            }
            MessageType::Decline => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Decline(Decline { transaction_id, opts })
            }
            MessageType::Reconfigure => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::Reconfigure(Reconfigure { transaction_id, opts })
            }
            MessageType::InformationRequest => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::InformationRequest(InformationRequest { transaction_id, opts })
            }
            MessageType::RelayForw => Message::RelayForw(decode_relay_body(decoder)?),
            MessageType::RelayRepl => Message::RelayRepl(decode_relay_body(decoder)?),
            MessageType::LeaseQuery => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::LeaseQuery(LeaseQuery { transaction_id, opts })
            }
            MessageType::LeaseQueryReply => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::LeaseQueryReply(LeaseQueryReply { transaction_id, opts })
            }
            MessageType::LeaseQueryDone => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::LeaseQueryDone(LeaseQueryDone { transaction_id, opts })
            }
            MessageType::LeaseQueryData => {
                let (transaction_id, opts) = decode_txn_body(decoder)?;
                Message::LeaseQueryData(LeaseQueryData { transaction_id, opts })
            }
            MessageType::Unknown(n) => return Err(DecodeError::UnknownMessageType(n)),
        })
    }
}

impl Encodable for Message {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u8(self.message_type().into())?;
        match self {
            Message::Solicit(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Advertise(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Request(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Confirm(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Renew(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Rebind(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Reply(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Release(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Decline(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::Reconfigure(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::InformationRequest(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::RelayForw(relay) => encode_relay_body(e, relay)?,
            Message::RelayRepl(relay) => encode_relay_body(e, relay)?,
            Message::LeaseQuery(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::LeaseQueryReply(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::LeaseQueryDone(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
            Message::LeaseQueryData(m) => encode_txn_body(e, m.transaction_id, &m.opts)?,
        }
        Ok(())
    }
}

/// validates the invariant from §3 that a relay message's options "must
/// include exactly one relay-message option whose value is itself a
/// full Message". Non-relay messages always pass; used by the
/// wire-sanity check in [`crate::handler::builtin::RejectDirectClientMessagesHandler`].
pub fn is_malformed_direct_relay(msg: &Message) -> DecodeResult<()> {
    use crate::options::OptionCode;

    if !matches!(msg, Message::RelayForw(_) | Message::RelayRepl(_)) {
        return Ok(());
    }
    let opts = msg.opts().expect("relay variants always carry options");
    match opts.get_all(OptionCode::RelayMsg).count() {
        1 => Ok(()),
        n => Err(DecodeError::InvalidData(format!(
            "relay message must carry exactly one relay-message option, found {n}"
        ))),
    }
}

/// the innermost non-relay message, unwrapping as many nested Relay
/// Message options as are present. A message that is not a relay frame
/// at all is its own innermost message. Used wherever a handler needs
/// the client's own request regardless of how many relay agents it
/// passed through (§4.1: "the client's own options live in the
/// innermost message").
pub fn innermost(msg: &Message) -> &Message {
    use crate::options::{DhcpOption, OptionCode};

    let mut current = msg;
    while let Message::RelayForw(relay) | Message::RelayRepl(relay) = current {
        match relay.opts.get(OptionCode::RelayMsg) {
            Some(DhcpOption::RelayMsg(inner)) => current = &inner.0,
            _ => break,
        }
    }
    current
}

/// decode a complete datagram into a [`Message`], per §4.1's
/// `decode(bytes) -> (Message, consumed)`. UDP datagrams are always
/// fully consumed; the boolean flags whether any option along the way
/// was downgraded to [`crate::options::UnknownOption`] because it
/// failed its normal structural decode (§4.1: "the message is marked
/// 'partially decoded'").
pub fn decode_message(bytes: &[u8]) -> DecodeResult<(Message, bool)> {
    let mut decoder = Decoder::new(bytes);
    let msg = Message::decode(&mut decoder)?;
    Ok((msg, decoder.is_partially_decoded()))
}

/// encode a complete [`Message`] to bytes, per §4.1's `encode(Message)
/// -> bytes`.
pub fn encode_message(msg: &Message) -> EncodeResult<Vec<u8>> {
    msg.to_vec()
}

/// encode `msg` for a bulk-leasequery TCP stream: the same wire codec as
/// [`encode_message`], prefixed with its length as a big-endian `u16`
/// (§6: "the same option codec framed by a 2-byte length prefix").
/// `LeaseQueryDone`/`LeaseQueryData` are the message kinds this framing
/// exists for, but nothing here restricts it to them — the frame is a
/// property of the transport, not the message kind.
pub fn encode_tcp_frame(msg: &Message) -> EncodeResult<Vec<u8>> {
    let body = encode_message(msg)?;
    let len: u16 = body
        .len()
        .try_into()
        .map_err(|_| EncodeError::StringSizeTooBig { len: body.len() })?;
    let mut framed = Vec::with_capacity(2 + body.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// decode one length-prefixed message from the front of a bulk-leasequery
/// TCP byte stream, returning the message and the number of bytes
/// consumed from `bytes` (frame header plus body) so the caller can
/// advance its stream buffer. `Err(DecodeError::NotEnoughBytes)` means
/// the caller has not yet read a full frame and should buffer more from
/// the socket before retrying — it is not a malformed-stream error.
pub fn decode_tcp_frame(bytes: &[u8]) -> DecodeResult<(Message, usize)> {
    if bytes.len() < 2 {
        return Err(DecodeError::NotEnoughBytes);
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let end = 2 + len;
    if bytes.len() < end {
        return Err(DecodeError::NotEnoughBytes);
    }
    let (msg, _) = decode_message(&bytes[2..end])?;
    Ok((msg, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duid::Duid;
    use crate::options::{DhcpOption, Oro};

    #[test]
    fn solicit_round_trips() {
        let msg = Message::Solicit(Solicit {
            transaction_id: 0x12_3456,
            opts: DhcpOptions(vec![
                DhcpOption::ClientId(Duid::ethernet_ll([1, 2, 3, 4, 5, 6])),
                DhcpOption::Oro(Oro(vec![23, 24])),
            ]),
        });
        let bytes = msg.to_vec().unwrap();
        assert_eq!(bytes[0], 1);
        let decoded = Message::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn relay_forw_wraps_inner_solicit() {
        use crate::options::RelayMsg;

        let inner = Message::Solicit(Solicit {
            transaction_id: 42,
            opts: DhcpOptions(vec![DhcpOption::ClientId(Duid::ethernet_ll([
                0xa, 0xb, 0xc, 0xd, 0xe, 0xf,
            ]))]),
        });
        let relay = Message::RelayForw(RelayMessage {
            hop_count: 0,
            link_address: "2001:db8::1".parse().unwrap(),
            peer_address: "fe80::1".parse().unwrap(),
            opts: DhcpOptions(vec![DhcpOption::RelayMsg(RelayMsg(Box::new(inner.clone())))]),
        });
        let bytes = relay.to_vec().unwrap();
        assert_eq!(bytes[0], 12);
        let decoded = Message::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(relay, decoded);
        if let Message::RelayForw(r) = decoded {
            let DhcpOption::RelayMsg(RelayMsg(boxed)) = r.opts.get(crate::options::OptionCode::RelayMsg).unwrap() else {
                panic!("expected relay message option");
            };
            assert_eq!(**boxed, inner);
        } else {
            panic!("expected RelayForw");
        }
    }

    #[test]
    fn unknown_message_type_fails_to_decode() {
        let bytes = [200u8, 1, 2, 3, 4];
        let err = Message::decode(&mut Decoder::new(&bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownMessageType(200)));
    }

    #[test]
    fn decode_message_reports_no_degradation_for_clean_input() {
        let msg = Message::Solicit(Solicit {
            transaction_id: 7,
            opts: DhcpOptions(vec![DhcpOption::ClientId(Duid::ethernet_ll([
                1, 2, 3, 4, 5, 6,
            ]))]),
        });
        let bytes = encode_message(&msg).unwrap();
        let (decoded, partial) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert!(!partial);
    }

    #[test]
    fn innermost_unwraps_nested_relay_chain() {
        use crate::options::RelayMsg;

        let solicit = Message::Solicit(Solicit {
            transaction_id: 9,
            opts: DhcpOptions(vec![DhcpOption::ClientId(Duid::ethernet_ll([1; 6]))]),
        });
        let inner_relay = Message::RelayForw(RelayMessage {
            hop_count: 0,
            link_address: "2001:db8::1".parse().unwrap(),
            peer_address: "fe80::1".parse().unwrap(),
            opts: DhcpOptions(vec![DhcpOption::RelayMsg(RelayMsg(Box::new(solicit.clone())))]),
        });
        let outer_relay = Message::RelayForw(RelayMessage {
            hop_count: 1,
            link_address: "2001:db8::1".parse().unwrap(),
            peer_address: "2001:db8::2".parse().unwrap(),
            opts: DhcpOptions(vec![DhcpOption::RelayMsg(RelayMsg(Box::new(inner_relay)))]),
        });
        assert_eq!(innermost(&outer_relay), &solicit);
        assert_eq!(innermost(&solicit), &solicit);
    }

    #[test]
    fn tcp_frame_round_trips_and_reports_consumed_length() {
        let msg = Message::LeaseQueryData(LeaseQueryData {
            transaction_id: 5,
            opts: DhcpOptions::new(),
        });
        let framed = encode_tcp_frame(&msg).unwrap();
        let body_len = framed.len() - 2;
        assert_eq!(u16::from_be_bytes([framed[0], framed[1]]) as usize, body_len);

        let (decoded, consumed) = decode_tcp_frame(&framed).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn tcp_frame_decode_reports_not_enough_bytes_for_a_partial_frame() {
        let msg = Message::LeaseQueryDone(LeaseQueryDone {
            transaction_id: 1,
            opts: DhcpOptions::new(),
        });
        let framed = encode_tcp_frame(&msg).unwrap();
        // header present but body truncated
        let truncated = &framed[..framed.len() - 1];
        assert!(matches!(
            decode_tcp_frame(truncated).unwrap_err(),
            DecodeError::NotEnoughBytes
        ));
        // not even a full header yet
        assert!(matches!(
            decode_tcp_frame(&framed[..1]).unwrap_err(),
            DecodeError::NotEnoughBytes
        ));
    }

    #[test]
    fn tcp_frame_decode_consumes_only_its_own_frame_from_a_longer_stream() {
        let first = Message::LeaseQueryData(LeaseQueryData {
            transaction_id: 1,
            opts: DhcpOptions::new(),
        });
        let second = Message::LeaseQueryDone(LeaseQueryDone {
            transaction_id: 2,
            opts: DhcpOptions::new(),
        });
        let mut stream = encode_tcp_frame(&first).unwrap();
        stream.extend(encode_tcp_frame(&second).unwrap());

        let (decoded_first, consumed) = decode_tcp_frame(&stream).unwrap();
        assert_eq!(decoded_first, first);
        let (decoded_second, _) = decode_tcp_frame(&stream[consumed..]).unwrap();
        assert_eq!(decoded_second, second);
    }

    #[test]
    fn relay_message_missing_relay_msg_option_is_malformed() {
        let relay = Message::RelayForw(RelayMessage {
            hop_count: 0,
            link_address: "2001:db8::1".parse().unwrap(),
            peer_address: "fe80::1".parse().unwrap(),
            opts: DhcpOptions::new(),
        });
        assert!(is_malformed_direct_relay(&relay).is_err());
    }
}
