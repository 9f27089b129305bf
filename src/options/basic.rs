//! Small fixed-shape and flag options, RFC 8415 §21.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;
use crate::MessageType;

/// Option Request Option (option 6): the set of option codes the client
/// would like the server to include in its reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Oro(pub Vec<u16>);

impl Decodable for Oro {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let mut codes = Vec::new();
        while !decoder.is_empty() {
            codes.push(decoder.read_u16()?);
        }
        Ok(Oro(codes))
    }
}

impl Encodable for Oro {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::Oro.into())?;
        e.write_u16((self.0.len() * 2) as u16)?;
        for code in &self.0 {
            e.write_u16(*code)?;
        }
        Ok(())
    }
}

/// Authentication option (option 11) — carried verbatim; this crate does
/// not implement DHCPv6 authentication protocols, only framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// protocol identifier
    pub protocol: u8,
    /// algorithm identifier
    pub algorithm: u8,
    /// replay detection method
    pub rdm: u8,
    /// replay detection value
    pub replay_detection: u64,
    /// authentication information
    pub auth_info: Vec<u8>,
}

impl Decodable for Auth {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(Auth {
            protocol: decoder.read_u8()?,
            algorithm: decoder.read_u8()?,
            rdm: decoder.read_u8()?,
            replay_detection: decoder.read_u64()?,
            auth_info: decoder.buffer().to_vec(),
        })
    }
}

impl Encodable for Auth {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::Auth.into())?;
        e.write_u16((11 + self.auth_info.len()) as u16)?;
        e.write_u8(self.protocol)?;
        e.write_u8(self.algorithm)?;
        e.write_u8(self.rdm)?;
        e.write_u64(self.replay_detection)?;
        e.write_slice(&self.auth_info)?;
        Ok(())
    }
}

/// User Class option (option 15): a list of opaque, length-prefixed class
/// strings supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserClass(pub Vec<Vec<u8>>);

/// Vendor Class option (option 16)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorClass {
    /// IANA enterprise number
    pub enterprise_number: u32,
    /// opaque, length-prefixed class data entries
    pub data: Vec<Vec<u8>>,
}

fn decode_length_prefixed_list(decoder: &mut Decoder<'_>) -> DecodeResult<Vec<Vec<u8>>> {
    let mut items = Vec::new();
    while !decoder.is_empty() {
        let len = decoder.read_u16()? as usize;
        items.push(decoder.read_slice(len)?.to_vec());
    }
    Ok(items)
}

fn encode_length_prefixed_list(e: &mut Encoder<'_>, items: &[Vec<u8>]) -> EncodeResult<()> {
    for item in items {
        e.write_u16(item.len() as u16)?;
        e.write_slice(item)?;
    }
    Ok(())
}

fn length_prefixed_list_len(items: &[Vec<u8>]) -> usize {
    items.iter().map(|i| 2 + i.len()).sum()
}

impl Decodable for UserClass {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(UserClass(decode_length_prefixed_list(decoder)?))
    }
}

impl Encodable for UserClass {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::UserClass.into())?;
        e.write_u16(length_prefixed_list_len(&self.0) as u16)?;
        encode_length_prefixed_list(e, &self.0)
    }
}

impl Decodable for VendorClass {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let enterprise_number = decoder.read_u32()?;
        Ok(VendorClass {
            enterprise_number,
            data: decode_length_prefixed_list(decoder)?,
        })
    }
}

impl Encodable for VendorClass {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::VendorClass.into())?;
        e.write_u16((4 + length_prefixed_list_len(&self.data)) as u16)?;
        e.write_u32(self.enterprise_number)?;
        encode_length_prefixed_list(e, &self.data)
    }
}

/// Vendor-specific Information option (option 17): an opaque,
/// enterprise-scoped sub-option blob. This crate preserves the raw
/// sub-option bytes rather than recursively parsing them, since their
/// schema is vendor-private; extensions that understand a given
/// enterprise number can parse `data` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOpts {
    /// IANA enterprise number
    pub enterprise_number: u32,
    /// raw vendor sub-option bytes
    pub data: Vec<u8>,
}

impl Decodable for VendorOpts {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let enterprise_number = decoder.read_u32()?;
        let data = decoder.buffer().to_vec();
        decoder.leave_container();
        Ok(VendorOpts {
            enterprise_number,
            data,
        })
    }
}

impl Encodable for VendorOpts {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::VendorOpts.into())?;
        e.write_u16((4 + self.data.len()) as u16)?;
        e.write_u32(self.enterprise_number)?;
        e.write_slice(&self.data)?;
        Ok(())
    }
}

/// Reconfigure Message option (option 19): the message type the server
/// wants the client to send in response to a Reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfMsg(pub MessageType);

impl Decodable for ReconfMsg {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(ReconfMsg(MessageType::from(decoder.read_u8()?)))
    }
}

impl Encodable for ReconfMsg {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::ReconfMsg.into())?;
        e.write_u16(1)?;
        e.write_u8(self.0.into())?;
        Ok(())
    }
}

macro_rules! unit_option {
    ($name:ident, $code:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub struct $name;

        impl Decodable for $name {
            fn decode(_decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
                Ok($name)
            }
        }

        impl Encodable for $name {
            fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
                e.write_u16($code.into())?;
                e.write_u16(0)?;
                Ok(())
            }
        }
    };
}

unit_option!(RapidCommit, OptionCode::RapidCommit, "Rapid Commit option (option 14): present with zero length to request/grant a two-message exchange.");
unit_option!(ReconfAccept, OptionCode::ReconfAccept, "Reconfigure Accept option (option 20): present with zero length.");

/// Preference option (option 7): server-chosen preference value used by
/// clients to pick among multiple Advertise responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference(pub u8);

impl Decodable for Preference {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(Preference(decoder.read_u8()?))
    }
}

impl Encodable for Preference {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::Preference.into())?;
        e.write_u16(1)?;
        e.write_u8(self.0)?;
        Ok(())
    }
}

/// Elapsed Time option (option 8), in hundredths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTime(pub u16);

impl Decodable for ElapsedTime {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(ElapsedTime(decoder.read_u16()?))
    }
}

impl Encodable for ElapsedTime {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::ElapsedTime.into())?;
        e.write_u16(2)?;
        e.write_u16(self.0)?;
        Ok(())
    }
}

/// Server Unicast option (option 12): the address a client may use to
/// unicast subsequent requests directly to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUnicast(pub std::net::Ipv6Addr);

impl Decodable for ServerUnicast {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(ServerUnicast(std::net::Ipv6Addr::from(decoder.read::<16>()?)))
    }
}

impl Encodable for ServerUnicast {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::ServerUnicast.into())?;
        e.write_u16(16)?;
        e.write_slice(&u128::from(self.0).to_be_bytes())?;
        Ok(())
    }
}

/// Interface-ID option (option 18): opaque identifier a relay attaches so
/// it can route the reply back to the correct client-facing interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceId(pub Vec<u8>);

impl Decodable for InterfaceId {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(InterfaceId(decoder.buffer().to_vec()))
    }
}

impl Encodable for InterfaceId {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::InterfaceId.into())?;
        e.write_u16(self.0.len() as u16)?;
        e.write_slice(&self.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oro_round_trips() {
        let oro = Oro(vec![23, 24, 82]);
        let bytes = oro.to_vec().unwrap();
        assert_eq!(Oro::decode(&mut Decoder::new(&bytes[4..])).unwrap(), oro);
    }

    #[test]
    fn rapid_commit_has_zero_length() {
        let rc = RapidCommit;
        let bytes = rc.to_vec().unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(&bytes[2..4], &[0, 0]);
    }
}
