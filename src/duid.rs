//! DHCP Unique Identifiers (DUID) — RFC 8415 §11.
//!
//! A DUID is tagged by a 2-byte type code. Four types are defined by RFC
//! 8415/3315; any other type code decodes to [`Duid::Opaque`], preserving
//! the type code and raw bytes so re-encoding an unrecognized DUID is
//! byte-identical to the input.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};

/// DUID type codes, RFC 8415 §11.1-11.4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DuidTypeCode {
    /// link-layer address plus time
    Llt = 1,
    /// vendor enterprise number plus opaque identifier
    En = 2,
    /// link-layer address
    Ll = 3,
    /// UUID, RFC 6355
    Uuid = 4,
}

impl From<DuidTypeCode> for u16 {
    fn from(c: DuidTypeCode) -> u16 {
        c as u16
    }
}

/// Hardware type, as assigned by IANA (ARP parameters registry). Only the
/// handful of values actually seen on the wire are named; anything else
/// round-trips as [`HType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HType {
    /// Ethernet (10Mb)
    Eth,
    /// IEEE 802
    Ieee802,
    /// unrecognized hardware type, preserves the raw value
    Unknown(u16),
}

impl From<u16> for HType {
    fn from(n: u16) -> Self {
        match n {
            1 => HType::Eth,
            6 => HType::Ieee802,
            other => HType::Unknown(other),
        }
    }
}

impl From<HType> for u16 {
    fn from(h: HType) -> Self {
        match h {
            HType::Eth => 1,
            HType::Ieee802 => 6,
            HType::Unknown(n) => n,
        }
    }
}

/// A DHCP Unique Identifier.
///
/// Constructed as a tagged variant for the four known types; an unknown
/// type code is preserved verbatim in [`Duid::Opaque`] so that decoding and
/// re-encoding an option carrying it is byte-identical (spec invariant 1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duid {
    /// DUID-LLT: link-layer address plus time
    Llt {
        /// hardware type
        #[serde(with = "htype_serde")]
        htype: HType,
        /// seconds since midnight (UTC), Jan 1, 2000
        time: u32,
        /// link-layer address bytes
        link_layer: Vec<u8>,
    },
    /// DUID-EN: enterprise number plus an opaque, vendor-defined identifier
    En {
        /// IANA private enterprise number
        enterprise_number: u32,
        /// vendor-defined identifier
        identifier: Vec<u8>,
    },
    /// DUID-LL: link-layer address
    Ll {
        /// hardware type
        #[serde(with = "htype_serde")]
        htype: HType,
        /// link-layer address bytes
        link_layer: Vec<u8>,
    },
    /// DUID-UUID: a 16-byte UUID
    Uuid([u8; 16]),
    /// unrecognized DUID type, preserved verbatim
    Opaque {
        /// raw type code on the wire
        type_code: u16,
        /// remaining bytes, unparsed
        data: Vec<u8>,
    },
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

impl Duid {
    /// construct a DUID-LL for the common Ethernet case
    pub fn ethernet_ll(mac: [u8; 6]) -> Self {
        Duid::Ll {
            htype: HType::Eth,
            link_layer: mac.to_vec(),
        }
    }

    /// construct a DUID-LLT for the common Ethernet case
    pub fn ethernet_llt(time: u32, mac: [u8; 6]) -> Self {
        Duid::Llt {
            htype: HType::Eth,
            time,
            link_layer: mac.to_vec(),
        }
    }

    /// length of the DUID as it will appear on the wire, including the
    /// 2-byte type code
    pub fn wire_len(&self) -> usize {
        2 + match self {
            Duid::Llt { link_layer, .. } => 6 + link_layer.len(),
            Duid::En { identifier, .. } => 4 + identifier.len(),
            Duid::Ll { link_layer, .. } => 2 + link_layer.len(),
            Duid::Uuid(_) => 16,
            Duid::Opaque { data, .. } => data.len(),
        }
    }
}

impl Encodable for Duid {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        match self {
            Duid::Llt {
                htype,
                time,
                link_layer,
            } => {
                e.write_u16(DuidTypeCode::Llt.into())?;
                e.write_u16((*htype).into())?;
                e.write_u32(*time)?;
                e.write_slice(link_layer)?;
            }
            Duid::En {
                enterprise_number,
                identifier,
            } => {
                e.write_u16(DuidTypeCode::En.into())?;
                e.write_u32(*enterprise_number)?;
                e.write_slice(identifier)?;
            }
            Duid::Ll { htype, link_layer } => {
                e.write_u16(DuidTypeCode::Ll.into())?;
                e.write_u16((*htype).into())?;
                e.write_slice(link_layer)?;
            }
            Duid::Uuid(bytes) => {
                e.write_u16(DuidTypeCode::Uuid.into())?;
                e.write_slice(bytes)?;
            }
            Duid::Opaque { type_code, data } => {
                e.write_u16(*type_code)?;
                e.write_slice(data)?;
            }
        }
        Ok(())
    }
}

impl Decodable for Duid {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let type_code = decoder.read_u16()?;
        Ok(match type_code {
            1 => Duid::Llt {
                htype: decoder.read_u16()?.into(),
                time: decoder.read_u32()?,
                link_layer: decoder.buffer().to_vec(),
            },
            2 => {
                let enterprise_number = decoder.read_u32()?;
                Duid::En {
                    enterprise_number,
                    identifier: decoder.buffer().to_vec(),
                }
            }
            3 => Duid::Ll {
                htype: decoder.read_u16()?.into(),
                link_layer: decoder.buffer().to_vec(),
            },
            4 => {
                let bytes = decoder.read::<16>()?;
                Duid::Uuid(bytes)
            }
            other => Duid::Opaque {
                type_code: other,
                data: decoder.buffer().to_vec(),
            },
        })
    }
}

/// link-local address derived conceptually from a DUID-LL/DUID-LLT's
/// embedded link-layer address, used by filters that want to match on MAC.
pub fn duid_link_layer(duid: &Duid) -> Option<&[u8]> {
    match duid {
        Duid::Llt { link_layer, .. } | Duid::Ll { link_layer, .. } => Some(link_layer),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duid_ll_round_trips() {
        let duid = Duid::ethernet_ll([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let bytes = duid.to_vec().unwrap();
        let decoded = Duid::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(duid, decoded);
    }

    #[test]
    fn duid_llt_round_trips() {
        let duid = Duid::ethernet_llt(0x1234_5678, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        let bytes = duid.to_vec().unwrap();
        let decoded = Duid::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(duid, decoded);
    }

    #[test]
    fn unknown_duid_type_is_opaque_and_round_trips() {
        let bytes = vec![0xff, 0xff, 1, 2, 3, 4];
        let decoded = Duid::decode(&mut Decoder::new(&bytes)).unwrap();
        assert!(matches!(decoded, Duid::Opaque { type_code: 0xffff, .. }));
        assert_eq!(decoded.to_vec().unwrap(), bytes);
    }
}
