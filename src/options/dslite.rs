//! DS-Lite AFTR-Name option, RFC 6334. Tells a DS-Lite B4 element the FQDN
//! of its AFTR (Address Family Transition Router) tunnel endpoint.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::domain::Domain;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// AFTR-Name option (option 64)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AftrName(pub Domain);

impl Decodable for AftrName {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(AftrName(Domain::decode(decoder)?))
    }
}

impl Encodable for AftrName {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::AftrName.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aftr_name_round_trips() {
        let opt = AftrName(Domain::new("aftr.example.com"));
        let bytes = opt.to_vec().unwrap();
        let mut d = Decoder::new(&bytes[4..]);
        let decoded = AftrName::decode(&mut d).unwrap();
        assert_eq!(opt, decoded);
    }
}
