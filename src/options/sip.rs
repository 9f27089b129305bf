//! SIP Servers options, RFC 3319.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::decoder::{Decodable, Decoder};
use crate::domain::DomainList;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// SIP Servers Domain Name List option (option 21)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SipServerD(pub DomainList);

impl Decodable for SipServerD {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(SipServerD(DomainList::decode_bounded(decoder.buffer())?))
    }
}

impl Encodable for SipServerD {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::SipServerD.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// SIP Servers IPv6 Address List option (option 22)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SipServerA(pub Vec<Ipv6Addr>);

impl Decodable for SipServerA {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(SipServerA(decoder.read_ipv6s(decoder.remaining())?))
    }
}

impl Encodable for SipServerA {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::SipServerA.into())?;
        e.write_u16((self.0.len() * 16) as u16)?;
        for addr in &self.0 {
            e.write_slice(&u128::from(*addr).to_be_bytes())?;
        }
        Ok(())
    }
}
