//! Relay agent identification options: Remote-ID (RFC 4649),
//! Subscriber-ID (RFC 4580), and Client Link-Layer Address (RFC 6939).
//! Inserted by relay agents into RelayForw messages; servers consult them
//! to classify and authorize requests (§4.4 `RemoteIdMatch` /
//! `SubscriberIdMatch` filters).

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::duid::HType;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// Remote-ID option (option 37)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteId {
    /// relay agent's IANA enterprise number
    pub enterprise_number: u32,
    /// opaque, relay-defined remote identifier
    pub remote_id: Vec<u8>,
}

impl Decodable for RemoteId {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(RemoteId {
            enterprise_number: decoder.read_u32()?,
            remote_id: decoder.buffer().to_vec(),
        })
    }
}

impl Encodable for RemoteId {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::RemoteId.into())?;
        e.write_u16((4 + self.remote_id.len()) as u16)?;
        e.write_u32(self.enterprise_number)?;
        e.write_slice(&self.remote_id)?;
        Ok(())
    }
}

/// Subscriber-ID option (option 38)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberId(pub Vec<u8>);

impl Decodable for SubscriberId {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(SubscriberId(decoder.buffer().to_vec()))
    }
}

impl Encodable for SubscriberId {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::SubscriberId.into())?;
        e.write_u16(self.0.len() as u16)?;
        e.write_slice(&self.0)?;
        Ok(())
    }
}

/// Client Link-Layer Address option (option 79): the link-layer address
/// of the client as observed by the first-hop relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLinkLayerAddr {
    /// hardware type, matching DUID-LL/DUID-LLT conventions
    #[serde(with = "htype_serde")]
    pub link_layer_type: HType,
    /// link-layer address bytes
    pub address: Vec<u8>,
}

mod htype_serde {
    use super::HType;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(h: &HType, s: S) -> Result<S::Ok, S::Error> {
        u16::from(*h).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<HType, D::Error> {
        Ok(HType::from(u16::deserialize(d)?))
    }
}

impl Decodable for ClientLinkLayerAddr {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let link_layer_type = HType::from(decoder.read_u16()?);
        let address = decoder.buffer().to_vec();
        Ok(ClientLinkLayerAddr {
            link_layer_type,
            address,
        })
    }
}

impl Encodable for ClientLinkLayerAddr {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::ClientLinkLayerAddr.into())?;
        e.write_u16((2 + self.address.len()) as u16)?;
        e.write_u16(self.link_layer_type.into())?;
        e.write_slice(&self.address)?;
        Ok(())
    }
}
