//! Wi-Fi NAN (Neighbor Awareness Networking) service discovery frames
//!
//! Frame layout after the 24-byte management header:
//! - NAN service discovery header: category 0x04, action 0x09, OUI 50:6F:9A, type 0x13
//! - Service descriptor attribute: id 0x03, length (LE), service id, instance id,
//!   requestor instance id, service control, service info length
//! - Service info: message counter, then a message pack

use super::codec::{decode_message_pack, CodecError};
use super::types::UasData;

/// Multicast destination used by remote ID NAN broadcasts
pub const NAN_DEST_ADDR: [u8; 6] = [0x51, 0x6F, 0x9A, 0x01, 0x00, 0x00];

/// First 6 bytes of SHA-256("org.opendroneid.remoteid")
pub const ODID_SERVICE_ID: [u8; 6] = [0x88, 0x69, 0x19, 0x9D, 0x92, 0x09];

const WIFI_ALLIANCE_OUI: [u8; 3] = [0x50, 0x6F, 0x9A];
const NAN_OUI_TYPE: u8 = 0x13;
const PUBLIC_ACTION_CATEGORY: u8 = 0x04;
const VENDOR_SPECIFIC_ACTION: u8 = 0x09;
const SERVICE_DESCRIPTOR_ATTR: u8 = 0x03;
const SERVICE_CONTROL_PUBLISH: u8 = 0x10;

const MGMT_HEADER_LEN: usize = 24;
const DISCOVERY_HEADER_LEN: usize = 6;
const DESCRIPTOR_ATTR_LEN: usize = 13;
/// Bytes of the descriptor attribute counted by its length field, excluding service info
const DESCRIPTOR_ATTR_BODY_LEN: usize = DESCRIPTOR_ATTR_LEN - 3;
const SERVICE_INFO_HEADER_LEN: usize = 1;

/// Frame control low byte: management type, action subtype
const FC_ACTION: u8 = 0xD0;
const FC_TYPE_SUBTYPE_MASK: u8 = 0xFC;

fn ensure(frame: &[u8], needed: usize) -> Result<(), CodecError> {
    if frame.len() < needed {
        return Err(CodecError::Truncated {
            needed,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Decode a whole NAN action frame into the message set it carries
pub fn decode_nan_action_frame(frame: &[u8]) -> Result<UasData, CodecError> {
    ensure(frame, MGMT_HEADER_LEN)?;
    if frame[0] & FC_TYPE_SUBTYPE_MASK != FC_ACTION {
        return Err(CodecError::NotNanFrame("not an action frame"));
    }
    if frame[4..10] != NAN_DEST_ADDR {
        return Err(CodecError::NotNanFrame("destination address"));
    }

    let mut at = MGMT_HEADER_LEN;
    ensure(frame, at + DISCOVERY_HEADER_LEN)?;
    let nsd = &frame[at..at + DISCOVERY_HEADER_LEN];
    if nsd[0] != PUBLIC_ACTION_CATEGORY
        || nsd[1] != VENDOR_SPECIFIC_ACTION
        || nsd[2..5] != WIFI_ALLIANCE_OUI
        || nsd[5] != NAN_OUI_TYPE
    {
        return Err(CodecError::NotNanFrame("service discovery header"));
    }
    at += DISCOVERY_HEADER_LEN;

    ensure(frame, at + DESCRIPTOR_ATTR_LEN)?;
    let attr = &frame[at..at + DESCRIPTOR_ATTR_LEN];
    let attr_len = u16::from_le_bytes([attr[1], attr[2]]) as usize;
    let service_info_len = attr[12] as usize;
    if attr[0] != SERVICE_DESCRIPTOR_ATTR
        || attr[3..9] != ODID_SERVICE_ID
        || attr[9] != 0x01
        || attr[11] != SERVICE_CONTROL_PUBLISH
    {
        return Err(CodecError::NotNanFrame("service descriptor attribute"));
    }
    if attr_len != DESCRIPTOR_ATTR_BODY_LEN + service_info_len {
        return Err(CodecError::NotNanFrame("service descriptor length"));
    }
    at += DESCRIPTOR_ATTR_LEN;

    ensure(frame, at + SERVICE_INFO_HEADER_LEN)?;
    at += SERVICE_INFO_HEADER_LEN;

    decode_message_pack(&frame[at..])
}
