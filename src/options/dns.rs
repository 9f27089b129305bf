//! DNS Recursive Name Server and Domain Search List options, RFC 3646.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::decoder::{Decodable, Decoder};
use crate::domain::DomainList;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// DNS Recursive Name Server option (option 23)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DnsServers(pub Vec<Ipv6Addr>);

impl Decodable for DnsServers {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let servers = decoder.read_ipv6s(decoder.remaining())?;
        Ok(DnsServers(servers))
    }
}

impl Encodable for DnsServers {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::DnsServers.into())?;
        e.write_u16((self.0.len() * 16) as u16)?;
        for addr in &self.0 {
            e.write_slice(&u128::from(*addr).to_be_bytes())?;
        }
        Ok(())
    }
}

/// Domain Search List option (option 24)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainSearchList(pub DomainList);

impl Decodable for DomainSearchList {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(DomainSearchList(DomainList::decode_bounded(
            decoder.buffer(),
        )?))
    }
}

impl Encodable for DomainSearchList {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::DomainList.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_servers_round_trip() {
        let opt = DnsServers(vec!["2001:db8::53".parse().unwrap()]);
        let bytes = opt.to_vec().unwrap();
        assert_eq!(DnsServers::decode(&mut Decoder::new(&bytes[4..])).unwrap(), opt);
    }
}
