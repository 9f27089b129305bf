//! DNS wire-format domain names, used by options that carry one or more
//! names (Domain Search List, SIP Servers Domain Name List, DS-Lite
//! AFTR-Name, NTP Server FQDN suboption).
//!
//! Encoding follows the classic DNS label format: a sequence of
//! length-prefixed labels terminated by a zero-length root label. This
//! crate never emits name compression pointers (spec requires encoders to
//! be unambiguous) but tolerates decoding names that omit the trailing
//! root label only when the containing option's declared length is
//! exhausted exactly at a label boundary.

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

/// A single domain name, stored as its dotted-string representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Domain(pub String);

impl Domain {
    /// construct from a dotted string, e.g. `"example.com"`
    pub fn new(s: impl Into<String>) -> Self {
        Domain(s.into())
    }

    fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|l| !l.is_empty())
    }
}

impl Encodable for Domain {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let mut total = 0usize;
        for label in self.labels() {
            if label.len() > MAX_LABEL_LEN {
                return Err(EncodeError::StringSizeTooBig { len: label.len() });
            }
            e.write_u8(label.len() as u8)?;
            e.write_slice(label.as_bytes())?;
            total += 1 + label.len();
        }
        if total + 1 > MAX_NAME_LEN {
            return Err(EncodeError::StringSizeTooBig { len: total });
        }
        e.write_u8(0)?; // root label
        Ok(())
    }
}

impl Decodable for Domain {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let mut labels = Vec::new();
        loop {
            let len = decoder.read_u8()? as usize;
            if len == 0 {
                break;
            }
            if len > MAX_LABEL_LEN {
                return Err(DecodeError::InvalidData(format!(
                    "dns label length {len} exceeds 63"
                )));
            }
            let slice = decoder.read_slice(len)?;
            labels.push(std::str::from_utf8(slice)?.to_owned());
        }
        Ok(Domain(labels.join(".")))
    }
}

/// A concatenated list of domain names, as used by Domain Search List (24)
/// and SIP Servers Domain Name List (21). Names are concatenated with no
/// separator other than each name's own root-label terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct DomainList(pub Vec<Domain>);

impl Encodable for DomainList {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        for name in &self.0 {
            name.encode(e)?;
        }
        Ok(())
    }
}

impl DomainList {
    /// decode names from a bounded slice until it is exhausted
    pub fn decode_bounded(bytes: &[u8]) -> DecodeResult<Self> {
        let mut decoder = Decoder::new(bytes);
        let mut names = Vec::new();
        while !decoder.is_empty() {
            names.push(Domain::decode(&mut decoder)?);
        }
        Ok(DomainList(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_round_trips() {
        let d = Domain::new("example.com");
        let bytes = d.to_vec().unwrap();
        assert_eq!(
            bytes,
            vec![7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0]
        );
        let decoded = Domain::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(d, decoded);
    }

    #[test]
    fn domain_list_round_trips() {
        let list = DomainList(vec![Domain::new("a.example.com"), Domain::new("b.example.com")]);
        let bytes = list.to_vec().unwrap();
        let decoded = DomainList::decode_bounded(&bytes).unwrap();
        assert_eq!(list, decoded);
    }
}
