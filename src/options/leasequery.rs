//! Leasequery (RFC 5007) and bulk leasequery (RFC 5460) options. Bulk
//! leasequery's TCP framing lives in `crate::message` alongside the
//! `LeaseQuery`/`LeaseQueryReply`/`LeaseQueryDone`/`LeaseQueryData` message
//! types; this module covers only the options those messages carry.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::decoder::{Decodable, Decoder};
use crate::duid::Duid;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::{DhcpOptions, OptionCode};

/// Leasequery query types, RFC 5007 §3.1 plus RFC 5460 §5.1/5.3 additions
/// for bulk leasequery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    /// query by IPv6 address
    ByAddress,
    /// query by client DUID
    ByClientId,
    /// RFC 5460: query by relay agent DUID
    ByRelayId,
    /// RFC 5460: query by link-address
    ByLinkAddress,
    /// RFC 5460: query by Remote-ID option content
    ByRemoteId,
    /// unrecognized query type, preserved verbatim
    Unknown(u8),
}

impl From<u8> for QueryType {
    fn from(n: u8) -> Self {
        use QueryType::*;
        match n {
            1 => ByAddress,
            2 => ByClientId,
            3 => ByRelayId,
            4 => ByLinkAddress,
            5 => ByRemoteId,
            n => Unknown(n),
        }
    }
}

impl From<QueryType> for u8 {
    fn from(q: QueryType) -> Self {
        use QueryType::*;
        match q {
            ByAddress => 1,
            ByClientId => 2,
            ByRelayId => 3,
            ByLinkAddress => 4,
            ByRemoteId => 5,
            Unknown(n) => n,
        }
    }
}

/// LQ_QUERY option (option 44): the query itself, carried in a
/// `LeaseQuery` message. `query_options` holds the identifying option for
/// the chosen query type (ClientId, RelayId, RemoteId, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LqQuery {
    /// selects which identifying option in `query_options` applies
    pub query_type: QueryType,
    /// link this query is scoped to, or `::` for "any link"
    pub link_address: Ipv6Addr,
    /// the identifying option(s) for the query type, plus ORO etc.
    pub query_options: DhcpOptions,
}

impl Decodable for LqQuery {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let query_type = QueryType::from(decoder.read_u8()?);
        let link_address = Ipv6Addr::from(decoder.read::<16>()?);
        decoder.enter_container()?;
        let query_options = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(LqQuery {
            query_type,
            link_address,
            query_options,
        })
    }
}

impl Encodable for LqQuery {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.query_options.to_vec()?;
        e.write_u16(OptionCode::LqQuery.into())?;
        e.write_u16((17 + body.len()) as u16)?;
        e.write_u8(self.query_type.into())?;
        e.write_slice(&self.link_address.octets())?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// CLIENT_DATA option (option 45): a container of suboptions describing one
/// lease (typically IAAddr/IAPrefix plus CLT_TIME), returned in
/// `LeaseQueryReply`/`LeaseQueryData`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientData(pub DhcpOptions);

impl Decodable for ClientData {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(ClientData(opts))
    }
}

impl Encodable for ClientData {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::ClientData.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// CLT_TIME option (option 46): seconds elapsed since the lease was last
/// confirmed with the client, as of when the reply was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CltTime(pub u32);

impl Decodable for CltTime {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(CltTime(decoder.read_u32()?))
    }
}

impl Encodable for CltTime {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::CltTime.into())?;
        e.write_u16(4)?;
        e.write_u32(self.0)?;
        Ok(())
    }
}

/// LQ_RELAY_DATA option (option 47): the last relay-forwarded message seen
/// for a lease, exactly as received, wrapped with the relay's peer address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LqRelayData {
    /// address of the relay agent that forwarded the message
    pub peer_address: Ipv6Addr,
    /// the raw relayed DHCPv6 message (opaque; not re-decoded here)
    pub relay_message: Vec<u8>,
}

impl Decodable for LqRelayData {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let peer_address = Ipv6Addr::from(decoder.read::<16>()?);
        let relay_message = decoder.buffer().to_vec();
        Ok(LqRelayData {
            peer_address,
            relay_message,
        })
    }
}

impl Encodable for LqRelayData {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::LqRelayData.into())?;
        e.write_u16((16 + self.relay_message.len()) as u16)?;
        e.write_slice(&self.peer_address.octets())?;
        e.write_slice(&self.relay_message)?;
        Ok(())
    }
}

/// LQ_CLIENT_LINK option (option 48): every link-address currently
/// associated with the queried client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LqClientLink(pub Vec<Ipv6Addr>);

impl Decodable for LqClientLink {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(LqClientLink(decoder.read_ipv6s(decoder.remaining())?))
    }
}

impl Encodable for LqClientLink {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::LqClientLink.into())?;
        e.write_u16((self.0.len() * 16) as u16)?;
        for addr in &self.0 {
            e.write_slice(&addr.octets())?;
        }
        Ok(())
    }
}

/// RELAY_ID option (option 53), RFC 5460 §5.3.1: a relay agent's DUID, used
/// both to scope a by-relay-id query and to identify the relay in a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayId(pub Duid);

impl Decodable for RelayId {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(RelayId(Duid::decode(decoder)?))
    }
}

impl Encodable for RelayId {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::RelayId.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DhcpOption;

    #[test]
    fn lq_query_round_trips_with_nested_client_id() {
        let q = LqQuery {
            query_type: QueryType::ByClientId,
            link_address: "2001:db8::".parse().unwrap(),
            query_options: DhcpOptions(vec![DhcpOption::ClientId(Duid::ethernet_ll([
                1, 2, 3, 4, 5, 6,
            ]))]),
        };
        let bytes = q.to_vec().unwrap();
        let decoded = LqQuery::decode(&mut Decoder::new(&bytes[4..])).unwrap();
        assert_eq!(q, decoded);
    }

    #[test]
    fn lq_client_link_round_trips() {
        let link = LqClientLink(vec!["2001:db8::1".parse().unwrap(), "2001:db8::2".parse().unwrap()]);
        let bytes = link.to_vec().unwrap();
        let decoded = LqClientLink::decode(&mut Decoder::new(&bytes[4..])).unwrap();
        assert_eq!(link, decoded);
    }
}
