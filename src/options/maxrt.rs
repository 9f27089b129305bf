//! SOL_MAX_RT / INF_MAX_RT options, RFC 7083. Let a server tell clients to
//! raise the maximum retransmission timeout for Solicit/Information-Request
//! without a config change on the client.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::options::OptionCode;

/// SOL_MAX_RT option (option 82): seconds, valid range 60-86400 per RFC
/// 7083 §5; out-of-range values are accepted on decode (clients are
/// responsible for bounds-checking) but flagged by `is_in_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolMaxRt(pub u32);

/// INF_MAX_RT option (option 83): same shape as SOL_MAX_RT, for
/// Information-Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfMaxRt(pub u32);

impl SolMaxRt {
    /// RFC 7083 §5: valid range is 60-86400 seconds
    pub fn is_in_range(&self) -> bool {
        (60..=86_400).contains(&self.0)
    }
}

impl InfMaxRt {
    /// RFC 7083 §5: valid range is 60-86400 seconds
    pub fn is_in_range(&self) -> bool {
        (60..=86_400).contains(&self.0)
    }
}

impl Decodable for SolMaxRt {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(SolMaxRt(decoder.read_u32()?))
    }
}

impl Encodable for SolMaxRt {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::SolMaxRt.into())?;
        e.write_u16(4)?;
        e.write_u32(self.0)?;
        Ok(())
    }
}

impl Decodable for InfMaxRt {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(InfMaxRt(decoder.read_u32()?))
    }
}

impl Encodable for InfMaxRt {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(OptionCode::InfMaxRt.into())?;
        e.write_u16(4)?;
        e.write_u32(self.0)?;
        Ok(())
    }
}
