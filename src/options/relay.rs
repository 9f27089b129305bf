//! Relay Message option (option 9) — carries a complete, nested DHCPv6
//! message inside a relay-forward/relay-reply.

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeResult, EncodeResult};
use crate::message::Message;
use crate::options::OptionCode;

/// wraps a boxed `Message` so the option enum stays a fixed size despite
/// the recursive relationship between messages and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMsg(pub Box<Message>);

impl Decodable for RelayMsg {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        decoder.enter_container()?;
        let msg = Message::decode(decoder)?;
        decoder.leave_container();
        Ok(RelayMsg(Box::new(msg)))
    }
}

impl Encodable for RelayMsg {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let body = self.0.to_vec()?;
        e.write_u16(OptionCode::RelayMsg.into())?;
        e.write_u16(body.len() as u16)?;
        e.write_slice(&body)?;
        Ok(())
    }
}
