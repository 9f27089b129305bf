//! Information Refresh Time option, RFC 8415 §21.23.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// Information Refresh Time option (option 32): how long (seconds) a
/// stateless client should wait before refreshing via Information-Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationRefreshTime(pub u32);

impl Decodable for InformationRefreshTime {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(InformationRefreshTime(decoder.read_u32()?))
    }
}

impl Encodable for InformationRefreshTime {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::InformationRefreshTime.into())?;
        e.write_u16(4)?;
        e.write_u32(self.0)?;
        Ok(())
    }
}
