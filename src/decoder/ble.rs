//! BLE legacy advertisement decoding
//!
//! Advertisement payload layout:
//! `[len] [0x16] [0xFA 0xFF] [0x0D] [counter] [25-byte message]`
//!
//! Legacy (BT4) advertisements carry one message each; long range (BT5)
//! advertisements may carry a whole message pack.

use tracing::trace;

use crate::odid::{self, MessageType};
use crate::record::SubMessage;

use super::{project, FrameError};

/// Offset of the message inside the advertisement payload
const MESSAGE_OFFSET: usize = 6;

/// Decode the message carried by a signature-matched advertisement
pub fn decode_advertisement(payload: &[u8]) -> Result<Vec<SubMessage>, FrameError> {
    let message = payload.get(MESSAGE_OFFSET..).unwrap_or(&[]);

    let Some(msg_type) = odid::message_type(message) else {
        return Ok(Vec::new());
    };

    match msg_type {
        MessageType::BasicId
        | MessageType::Location
        | MessageType::Auth
        | MessageType::SelfId
        | MessageType::System
        | MessageType::OperatorId => Ok(vec![odid::decode_message(message)?.into()]),
        MessageType::MessagePack => Ok(project(odid::decode_message_pack(message)?)),
        MessageType::Invalid => {
            trace!("Ignoring advertisement with message type {:#x}", message[0] >> 4);
            Ok(Vec::new())
        }
    }
}
