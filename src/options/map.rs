//! Softwire / MAP (Mapping of Address and Port) options, RFC 7597 (MAP-E),
//! RFC 7599 (MAP-T), and RFC 7756 (Lightweight 4over6), collected under the
//! umbrella of RFC 7598's S46 option family.
//!
//! RFC 7598 §4 encodes IPv4/IPv6 prefixes in the minimum number of bytes
//! needed for the declared prefix length (`ceil(prefix_len / 8)`), not a
//! fixed-width field; [`encode_v6_prefix`]/[`decode_v6_prefix`] implement
//! that convention once for every option in this module.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::options::{DhcpOption, DhcpOptions, OptionCode};

/// encode an IPv6 prefix using only the bytes needed for `prefix_len` bits
fn encode_v6_prefix(e: &mut Encoder<'_>, prefix_len: u8, prefix: Ipv6Addr) -> EncodeResult<()> {
    let nbytes = (prefix_len as usize).div_ceil(8);
    let bytes = prefix.octets();
    e.write_slice(&bytes[..nbytes])
}

/// decode an IPv6 prefix stored in `ceil(prefix_len / 8)` bytes, zero-padded
/// to a full address
fn decode_v6_prefix(decoder: &mut Decoder<'_>, prefix_len: u8) -> DecodeResult<Ipv6Addr> {
    if prefix_len > 128 {
        return Err(DecodeError::InvalidData(format!(
            "ipv6 prefix length {prefix_len} exceeds 128"
        )));
    }
    let nbytes = (prefix_len as usize).div_ceil(8);
    let slice = decoder.read_slice(nbytes)?;
    let mut octets = [0u8; 16];
    octets[..nbytes].copy_from_slice(slice);
    Ok(Ipv6Addr::from(octets))
}

/// S46 Rule option (option 89): one Basic Mapping Rule (BMR) or Forwarding
/// Mapping Rule (FMR), carried inside S46_CONT_MAPE/S46_CONT_MAPT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S46Rule {
    /// bit 0 (MSB) of the flags octet: 1 = FMR, 0 = BMR-only
    pub fmr: bool,
    /// number of bits from the shared IPv4 address used to build the EA-bits
    pub ea_len: u8,
    /// IPv4 prefix length
    pub prefix4_len: u8,
    /// IPv4 prefix
    pub ipv4_prefix: Ipv4Addr,
    /// IPv6 prefix length
    pub prefix6_len: u8,
    /// IPv6 prefix
    pub ipv6_prefix: Ipv6Addr,
    /// nested S46_PORTPARAMS, if port-restricted
    pub opts: DhcpOptions,
}

impl Decodable for S46Rule {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let flags = decoder.read_u8()?;
        let ea_len = decoder.read_u8()?;
        let prefix4_len = decoder.read_u8()?;
        let ipv4_prefix = decoder.read_ipv4(4)?;
        let prefix6_len = decoder.read_u8()?;
        let ipv6_prefix = decode_v6_prefix(decoder, prefix6_len)?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(S46Rule {
            fmr: flags & 0x80 != 0,
            ea_len,
            prefix4_len,
            ipv4_prefix,
            prefix6_len,
            ipv6_prefix,
            opts,
        })
    }
}

impl Encodable for S46Rule {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let nbytes = (self.prefix6_len as usize).div_ceil(8);
        let opts_body = self.opts.to_vec()?;
        let len = 4 + 1 + nbytes + opts_body.len();
        e.write_u16(OptionCode::S46Rule.into())?;
        e.write_u16(len as u16)?;
        e.write_u8(if self.fmr { 0x80 } else { 0 })?;
        e.write_u8(self.ea_len)?;
        e.write_u8(self.prefix4_len)?;
        e.write_slice(&self.ipv4_prefix.octets())?;
        e.write_u8(self.prefix6_len)?;
        encode_v6_prefix(e, self.prefix6_len, self.ipv6_prefix)?;
        e.write_slice(&opts_body)?;
        Ok(())
    }
}

/// S46 Border Relay option (option 90): the tunnel-concentrator address for
/// MAP-E (RFC 7597) and Lightweight 4over6 (RFC 7756).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct S46Br(pub Ipv6Addr);

impl Decodable for S46Br {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(S46Br(Ipv6Addr::from(decoder.read::<16>()?)))
    }
}

impl Encodable for S46Br {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::S46Br.into())?;
        e.write_u16(16)?;
        e.write_slice(&self.0.octets())?;
        Ok(())
    }
}

/// S46 Default Mapping Rule option (option 91), MAP-T only (RFC 7599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct S46Dmr {
    /// DMR IPv6 prefix length
    pub prefix6_len: u8,
    /// DMR IPv6 prefix
    pub prefix6: Ipv6Addr,
}

impl Decodable for S46Dmr {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let prefix6_len = decoder.read_u8()?;
        let prefix6 = decode_v6_prefix(decoder, prefix6_len)?;
        Ok(S46Dmr { prefix6_len, prefix6 })
    }
}

impl Encodable for S46Dmr {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let nbytes = (self.prefix6_len as usize).div_ceil(8);
        e.write_u16(OptionCode::S46Dmr.into())?;
        e.write_u16((1 + nbytes) as u16)?;
        e.write_u8(self.prefix6_len)?;
        encode_v6_prefix(e, self.prefix6_len, self.prefix6)?;
        Ok(())
    }
}

/// S46 IPv4/IPv6 Address Binding option (option 92), Lightweight 4over6
/// (RFC 7756): a single subscriber's IPv4 address bound to an IPv6 prefix,
/// optionally narrowed by a nested S46_PORTPARAMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S46V4V6Bind {
    /// bound IPv4 address
    pub ipv4_address: Ipv4Addr,
    /// bound IPv6 prefix length
    pub prefix6_len: u8,
    /// bound IPv6 prefix
    pub ipv6_prefix: Ipv6Addr,
    /// nested S46_PORTPARAMS, if port-restricted
    pub opts: DhcpOptions,
}

impl Decodable for S46V4V6Bind {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let ipv4_address = decoder.read_ipv4(4)?;
        let prefix6_len = decoder.read_u8()?;
        let ipv6_prefix = decode_v6_prefix(decoder, prefix6_len)?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(S46V4V6Bind {
            ipv4_address,
            prefix6_len,
            ipv6_prefix,
            opts,
        })
    }
}

impl Encodable for S46V4V6Bind {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let nbytes = (self.prefix6_len as usize).div_ceil(8);
        let opts_body = self.opts.to_vec()?;
        let len = 4 + 1 + nbytes + opts_body.len();
        e.write_u16(OptionCode::S46V4V6Bind.into())?;
        e.write_u16(len as u16)?;
        e.write_slice(&self.ipv4_address.octets())?;
        e.write_u8(self.prefix6_len)?;
        encode_v6_prefix(e, self.prefix6_len, self.ipv6_prefix)?;
        e.write_slice(&opts_body)?;
        Ok(())
    }
}

/// S46 Port Parameters option (option 93): the PSID-based port-set
/// restriction, RFC 7598 §5.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct S46PortParams {
    /// number of high-order bits of the port shared between subscribers
    pub offset: u8,
    /// PSID length in bits
    pub psid_len: u8,
    /// PSID value, right-justified in a u16
    pub psid: u16,
}

impl Decodable for S46PortParams {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(S46PortParams {
            offset: decoder.read_u8()?,
            psid_len: decoder.read_u8()?,
            psid: decoder.read_u16()?,
        })
    }
}

impl Encodable for S46PortParams {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::S46PortParams.into())?;
        e.write_u16(4)?;
        e.write_u8(self.offset)?;
        e.write_u8(self.psid_len)?;
        e.write_u16(self.psid)?;
        Ok(())
    }
}

/// S46 MAP-E Container option (option 94): holds one or more S46_RULE
/// suboptions, RFC 7597.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct S46ContMape(pub DhcpOptions);

impl Decodable for S46ContMape {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(S46ContMape(opts))
    }
}

impl Encodable for S46ContMape {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::S46ContMape.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// S46 MAP-T Container option (option 95): holds S46_RULE/S46_BR/S46_DMR
/// suboptions, RFC 7599.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct S46ContMapt(pub DhcpOptions);

impl Decodable for S46ContMapt {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(S46ContMapt(opts))
    }
}

impl Encodable for S46ContMapt {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::S46ContMapt.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// S46 Lightweight 4over6 Container option (option 96): holds S46_BR and
/// S46_V4V6BIND suboptions, RFC 7756.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct S46ContLw(pub DhcpOptions);

impl Decodable for S46ContLw {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(S46ContLw(opts))
    }
}

impl Encodable for S46ContLw {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::S46ContLw.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s46_rule_round_trips_with_short_v6_prefix() {
        let rule = S46Rule {
            fmr: true,
            ea_len: 16,
            prefix4_len: 24,
            ipv4_prefix: "192.0.2.0".parse().unwrap(),
            prefix6_len: 40,
            ipv6_prefix: "2001:db8:1200::".parse().unwrap(),
            opts: DhcpOptions::default(),
        };
        let bytes = rule.to_vec().unwrap();
        // 4(type+len) + 1(flags) + 1(ea) + 1(prefix4_len) + 4(v4) + 1(prefix6_len) + 5(v6 bytes)
        assert_eq!(bytes.len(), 4 + 1 + 1 + 1 + 4 + 1 + 5);
        let decoded = S46Rule::decode(&mut Decoder::new(&bytes[4..])).unwrap();
        assert_eq!(rule, decoded);
    }

    #[test]
    fn s46_cont_mape_round_trips_nested_rule() {
        let rule = DhcpOption::S46Rule(S46Rule {
            fmr: false,
            ea_len: 8,
            prefix4_len: 32,
            ipv4_prefix: "198.51.100.1".parse().unwrap(),
            prefix6_len: 128,
            ipv6_prefix: "2001:db8::1".parse().unwrap(),
            opts: DhcpOptions::default(),
        });
        let cont = S46ContMape(DhcpOptions(vec![rule]));
        let bytes = cont.to_vec().unwrap();
        let decoded = S46ContMape::decode(&mut Decoder::new(&bytes[4..])).unwrap();
        assert_eq!(cont, decoded);
    }
}
