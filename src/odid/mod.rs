//! Open Drone ID (ASTM F3411 / ASD-STAN prEN 4709-002) message codec

mod codec;
mod nan;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use codec::{decode_message, decode_message_pack, message_type, CodecError};
pub use nan::{decode_nan_action_frame, NAN_DEST_ADDR};
pub use types::*;
