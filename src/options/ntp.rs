//! NTP Server option, RFC 5908, and the legacy SNTP Servers option,
//! RFC 4075.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

use crate::decoder::{Decodable, Decoder};
use crate::domain::Domain;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeResult};

/// NTP Server suboption codes, RFC 5908 §4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NtpSubOptionCode {
    /// unicast server address
    Server,
    /// multicast group address
    McastAddr,
    /// server FQDN
    Fqdn,
    /// unrecognized suboption
    Unknown(u16),
}

impl From<u16> for NtpSubOptionCode {
    fn from(n: u16) -> Self {
        use NtpSubOptionCode::*;
        match n {
            1 => Server,
            2 => McastAddr,
            3 => Fqdn,
            n => Unknown(n),
        }
    }
}

impl From<NtpSubOptionCode> for u16 {
    fn from(c: NtpSubOptionCode) -> u16 {
        use NtpSubOptionCode::*;
        match c {
            Server => 1,
            McastAddr => 2,
            Fqdn => 3,
            Unknown(n) => n,
        }
    }
}

/// a single NTP Server suboption value, RFC 5908 §4
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NtpSubOption {
    /// suboption 1: a unicast address of an NTP server or SNTP server
    Server(Ipv6Addr),
    /// suboption 2: an IPv6 multicast address of an NTP/SNTP multicast group
    McastAddr(Ipv6Addr),
    /// suboption 3: the FQDN of an NTP/SNTP server
    Fqdn(Domain),
    /// unrecognized suboption, preserved for round-trip
    Unknown { code: u16, data: Vec<u8> },
}

impl Decodable for NtpSubOption {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let code = decoder.read_u16()?;
        let len = decoder.read_u16()? as usize;
        let body = decoder.read_slice(len)?;
        let mut sub = Decoder::new(body);
        Ok(match NtpSubOptionCode::from(code) {
            NtpSubOptionCode::Server => {
                NtpSubOption::Server(Ipv6Addr::from(sub.read::<16>()?))
            }
            NtpSubOptionCode::McastAddr => {
                NtpSubOption::McastAddr(Ipv6Addr::from(sub.read::<16>()?))
            }
            NtpSubOptionCode::Fqdn => NtpSubOption::Fqdn(Domain::decode(&mut sub)?),
            NtpSubOptionCode::Unknown(n) => NtpSubOption::Unknown {
                code: n,
                data: body.to_vec(),
            },
        })
    }
}

impl Encodable for NtpSubOption {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        match self {
            NtpSubOption::Server(addr) => {
                e.write_u16(NtpSubOptionCode::Server.into())?;
                e.write_u16(16)?;
                e.write_slice(&u128::from(*addr).to_be_bytes())?;
            }
            NtpSubOption::McastAddr(addr) => {
                e.write_u16(NtpSubOptionCode::McastAddr.into())?;
                e.write_u16(16)?;
                e.write_slice(&u128::from(*addr).to_be_bytes())?;
            }
            NtpSubOption::Fqdn(name) => {
                let body = name.to_vec()?;
                e.write_u16(NtpSubOptionCode::Fqdn.into())?;
                e.write_u16(body.len() as u16)?;
                e.write_slice(&body)?;
            }
            NtpSubOption::Unknown { code, data } => {
                e.write_u16(*code)?;
                e.write_u16(data.len() as u16)?;
                e.write_slice(data)?;
            }
        }
        Ok(())
    }
}

/// NTP Server option (option 56): a container of suboptions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NtpServer(pub Vec<NtpSubOption>);

impl Decodable for NtpServer {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let mut subs = Vec::new();
        while !decoder.is_empty() {
            subs.push(NtpSubOption::decode(decoder)?);
        }
        decoder.leave_container();
        Ok(NtpServer(subs))
    }
}

impl Encodable for NtpServer {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        use crate::options::OptionCode;
        let mut body = Vec::new();
        {
            let mut sub_e = Encoder::new(&mut body);
            for s in &self.0 {
                s.encode(&mut sub_e)?;
            }
        }
        e.write_u16(OptionCode::NtpServer.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

/// SNTP Servers option (option 31, RFC 4075) — legacy, superseded by NTP
/// Server but still seen in the field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SntpServers(pub Vec<Ipv6Addr>);

impl Decodable for SntpServers {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        if decoder.remaining() % 16 != 0 {
            return Err(DecodeError::NotEnoughBytes);
        }
        Ok(SntpServers(decoder.read_ipv6s(decoder.remaining())?))
    }
}

impl Encodable for SntpServers {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        use crate::options::OptionCode;
        e.write_u16(OptionCode::SntpServers.into())?;
        e.write_u16((self.0.len() * 16) as u16)?;
        for addr in &self.0 {
            e.write_slice(&u128::from(*addr).to_be_bytes())?;
        }
        Ok(())
    }
}
