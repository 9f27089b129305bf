//! Identity Association containers — RFC 8415 §21.4-21.6, RFC 3633 (IA_PD).

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::options::{DhcpOption, DhcpOptions, OptionCode};

/// seconds value meaning "infinite lifetime", RFC 8415 §7.7
pub const INFINITY: u32 = 0xffff_ffff;

/// Identity Association for Non-temporary Addresses (option 3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IaNa {
    /// identity association id, unique per client
    pub id: u32,
    /// renew timer in seconds (0 = server chooses)
    pub t1: u32,
    /// rebind timer in seconds (0 = server chooses)
    pub t2: u32,
    /// nested options: IAAddr, StatusCode, etc.
    pub opts: DhcpOptions,
}

impl Decodable for IaNa {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let id = decoder.read_u32()?;
        let t1 = decoder.read_u32()?;
        let t2 = decoder.read_u32()?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(IaNa { id, t1, t2, opts })
    }
}

impl Encodable for IaNa {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.opts.to_vec()?;
        e.write_u16(OptionCode::IaNa.into())?;
        e.write_u16((12 + body.len()) as u16)?;
        e.write_u32(self.id)?;
        e.write_u32(self.t1)?;
        e.write_u32(self.t2)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// Identity Association for Temporary Addresses (option 4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IaTa {
    /// identity association id
    pub id: u32,
    /// nested options
    pub opts: DhcpOptions,
}

impl Decodable for IaTa {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let id = decoder.read_u32()?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(IaTa { id, opts })
    }
}

impl Encodable for IaTa {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.opts.to_vec()?;
        e.write_u16(OptionCode::IaTa.into())?;
        e.write_u16((4 + body.len()) as u16)?;
        e.write_u32(self.id)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// Identity Association for Prefix Delegation (option 25, RFC 3633)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IaPd {
    /// identity association id
    pub id: u32,
    /// renew timer in seconds
    pub t1: u32,
    /// rebind timer in seconds
    pub t2: u32,
    /// nested options: IAPrefix, StatusCode, etc.
    pub opts: DhcpOptions,
}

impl Decodable for IaPd {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let id = decoder.read_u32()?;
        let t1 = decoder.read_u32()?;
        let t2 = decoder.read_u32()?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        Ok(IaPd { id, t1, t2, opts })
    }
}

impl Encodable for IaPd {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.opts.to_vec()?;
        e.write_u16(OptionCode::IaPd.into())?;
        e.write_u16((12 + body.len()) as u16)?;
        e.write_u32(self.id)?;
        e.write_u32(self.t1)?;
        e.write_u32(self.t2)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// IA Address option (option 5), carried inside IA_NA/IA_TA
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IaAddr {
    /// leased address
    pub addr: std::net::Ipv6Addr,
    /// preferred lifetime in seconds
    pub preferred_life: u32,
    /// valid lifetime in seconds
    pub valid_life: u32,
    /// nested status-code etc.
    pub opts: DhcpOptions,
}

impl IaAddr {
    /// spec invariant: preferred-lifetime <= valid-lifetime unless either
    /// side is INFINITY
    pub fn lifetimes_valid(&self) -> bool {
        self.valid_life == INFINITY || self.preferred_life <= self.valid_life
    }
}

impl Decodable for IaAddr {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let bytes = decoder.read::<16>()?;
        let addr = std::net::Ipv6Addr::from(bytes);
        let preferred_life = decoder.read_u32()?;
        let valid_life = decoder.read_u32()?;
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        let this = IaAddr {
            addr,
            preferred_life,
            valid_life,
            opts,
        };
        if !this.lifetimes_valid() {
            return Err(DecodeError::InvalidData(
                "IAAddr preferred-lifetime exceeds valid-lifetime".into(),
            ));
        }
        Ok(this)
    }
}

impl Encodable for IaAddr {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        if !self.lifetimes_valid() {
            return Err(EncodeError::InvalidData(
                "IAAddr preferred-lifetime exceeds valid-lifetime".into(),
            ));
        }
        let body = self.opts.to_vec()?;
        e.write_u16(OptionCode::IaAddr.into())?;
        e.write_u16((24 + body.len()) as u16)?;
        e.write_slice(&u128::from(self.addr).to_be_bytes())?;
        e.write_u32(self.preferred_life)?;
        e.write_u32(self.valid_life)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// IA Prefix option (option 26, RFC 3633), carried inside IA_PD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IaPrefix {
    /// preferred lifetime in seconds
    pub preferred_life: u32,
    /// valid lifetime in seconds
    pub valid_life: u32,
    /// prefix length in bits
    pub prefix_len: u8,
    /// delegated prefix
    pub prefix: std::net::Ipv6Addr,
    /// nested status-code etc.
    pub opts: DhcpOptions,
}

impl IaPrefix {
    /// spec invariant: preferred-lifetime <= valid-lifetime unless infinite
    pub fn lifetimes_valid(&self) -> bool {
        self.valid_life == INFINITY || self.preferred_life <= self.valid_life
    }
}

impl Decodable for IaPrefix {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let preferred_life = decoder.read_u32()?;
        let valid_life = decoder.read_u32()?;
        let prefix_len = decoder.read_u8()?;
        let bytes = decoder.read::<16>()?;
        let prefix = std::net::Ipv6Addr::from(bytes);
        decoder.enter_container()?;
        let opts = DhcpOptions::decode(decoder)?;
        decoder.leave_container();
        let this = IaPrefix {
            preferred_life,
            valid_life,
            prefix_len,
            prefix,
            opts,
        };
        if !this.lifetimes_valid() {
            return Err(DecodeError::InvalidData(
                "IAPrefix preferred-lifetime exceeds valid-lifetime".into(),
            ));
        }
        Ok(this)
    }
}

impl Encodable for IaPrefix {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        if !self.lifetimes_valid() {
            return Err(EncodeError::InvalidData(
                "IAPrefix preferred-lifetime exceeds valid-lifetime".into(),
            ));
        }
        let body = self.opts.to_vec()?;
        e.write_u16(OptionCode::IaPrefix.into())?;
        e.write_u16((25 + body.len()) as u16)?;
        e.write_u32(self.preferred_life)?;
        e.write_u32(self.valid_life)?;
        e.write_u8(self.prefix_len)?;
        e.write_slice(&u128::from(self.prefix).to_be_bytes())?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// DHCPv6 status codes, RFC 8415 §21.13 plus leasequery/bulk-leasequery
/// extensions (RFC 5007/5460).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// success
    Success,
    /// unspecified failure
    UnspecFail,
    /// server has no addresses available to assign
    NoAddrsAvail,
    /// client record unknown to the server
    NoBinding,
    /// requested address not appropriate for the link
    NotOnLink,
    /// server wants client to retry via multicast
    UseMulticast,
    /// server has no prefixes available to assign
    NoPrefixAvail,
    /// RFC 5007: query type not supported
    UnknownQueryType,
    /// RFC 5007: malformed query
    MalformedQuery,
    /// RFC 5007: server not configured for leasequery
    NotConfigured,
    /// RFC 5007: requester not allowed to issue this query
    NotAllowed,
    /// unrecognized/unimplemented status
    Unknown(u16),
}

impl From<u16> for Status {
    fn from(n: u16) -> Self {
        use Status::*;
        match n {
            0 => Success,
            1 => UnspecFail,
            2 => NoAddrsAvail,
            3 => NoBinding,
            4 => NotOnLink,
            5 => UseMulticast,
            6 => NoPrefixAvail,
            7 => UnknownQueryType,
            8 => MalformedQuery,
            9 => NotConfigured,
            10 => NotAllowed,
            n => Unknown(n),
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> Self {
        use Status::*;
        match s {
            Success => 0,
            UnspecFail => 1,
            NoAddrsAvail => 2,
            NoBinding => 3,
            NotOnLink => 4,
            UseMulticast => 5,
            NoPrefixAvail => 6,
            UnknownQueryType => 7,
            MalformedQuery => 8,
            NotConfigured => 9,
            NotAllowed => 10,
            Unknown(n) => n,
        }
    }
}

/// Status Code option (option 13)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// numeric status
    pub status: Status,
    /// human-readable (UTF-8) message, may be empty
    pub message: String,
}

impl StatusCode {
    /// construct a `Success` status with no message, the common case
    /// post-handlers insert when committing a lease.
    pub fn success() -> Self {
        StatusCode {
            status: Status::Success,
            message: String::new(),
        }
    }

    /// construct a failure status with a message
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        StatusCode {
            status,
            message: message.into(),
        }
    }
}

impl Decodable for StatusCode {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let status = Status::from(decoder.read_u16()?);
        let message = String::from_utf8_lossy(decoder.buffer()).into_owned();
        Ok(StatusCode { status, message })
    }
}

impl Encodable for StatusCode {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::StatusCode.into())?;
        e.write_u16((2 + self.message.len()) as u16)?;
        e.write_u16(self.status.into())?;
        e.write_slice(self.message.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DhcpOption;

    #[test]
    fn ia_na_round_trips_with_nested_addr() {
        let ia = IaNa {
            id: 1,
            t1: 1800,
            t2: 2880,
            opts: DhcpOptions(vec![DhcpOption::IaAddr(IaAddr {
                addr: "2001:db8::1".parse().unwrap(),
                preferred_life: 3600,
                valid_life: 7200,
                opts: DhcpOptions::default(),
            })]),
        };
        let bytes = ia.to_vec().unwrap();
        let decoded = IaNa::decode(&mut Decoder::new(&bytes[4..])).unwrap();
        assert_eq!(ia, decoded);
    }

    #[test]
    fn bad_lifetimes_rejected_on_decode_and_encode() {
        let bad = IaAddr {
            addr: "2001:db8::1".parse().unwrap(),
            preferred_life: 7200,
            valid_life: 3600,
            opts: DhcpOptions::default(),
        };
        assert!(bad.encode(&mut Encoder::new(&mut Vec::new())).is_err());

        // hand-build wire bytes with preferred > valid and confirm decode rejects
        let mut buf = Vec::new();
        {
            let mut e = Encoder::new(&mut buf);
            e.write_slice(&u128::from(bad.addr).to_be_bytes()).unwrap();
            e.write_u32(bad.preferred_life).unwrap();
            e.write_u32(bad.valid_life).unwrap();
        }
        assert!(IaAddr::decode(&mut Decoder::new(&buf)).is_err());
    }

    #[test]
    fn truncated_ia_na_fails_decode() {
        let ia = IaNa {
            id: 1,
            t1: 0,
            t2: 0,
            opts: DhcpOptions::default(),
        };
        let mut bytes = ia.to_vec().unwrap();
        // claim a longer body than is actually present
        let declared_len_hi_idx = 2;
        bytes[declared_len_hi_idx] = 0;
        bytes[declared_len_hi_idx + 1] = 40;
        bytes.truncate(bytes.len() - 4);
        assert!(IaNa::decode(&mut Decoder::new(&bytes[4..])).is_err()
            || DhcpOption::decode(&mut Decoder::new(&bytes)).is_err());
    }
}
