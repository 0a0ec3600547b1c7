//! Standard message and message pack decoding
//!
//! All multi-byte fields are little endian. Scaled fields:
//! - latitude / longitude: int32 * 1e-7 degrees
//! - altitudes and height: uint16 * 0.5 - 1000 meters
//! - horizontal speed: 0.25 m/s steps, or 0.75 m/s steps above 63.75 m/s
//! - vertical speed: int8 * 0.5 m/s

use thiserror::Error;

use super::types::{
    Auth, BasicId, Location, Message, MessageType, OperatorId, SelfId, System, UasData,
    AUTH_PAGE_ZERO_DATA_SIZE, ID_SIZE, INVALID_TIMESTAMP, MESSAGE_SIZE, PACK_MAX_MESSAGES,
    STR_SIZE,
};

/// Message pack header: type/version, single message size, message count
const PACK_HEADER_SIZE: usize = 3;

/// Codec error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("buffer too short: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("unexpected message type {0:#x}")]
    UnexpectedType(u8),
    #[error("invalid message pack: {0}")]
    InvalidPack(&'static str),
    #[error("not a remote ID NAN action frame: {0}")]
    NotNanFrame(&'static str),
}

/// Message type of an encoded message (high nibble of byte 0)
pub fn message_type(buf: &[u8]) -> Option<MessageType> {
    buf.first().map(|b| MessageType::from(b >> 4))
}

/// Decode one 25-byte standard message.
///
/// Message packs are rejected here; use [`decode_message_pack`] for those.
pub fn decode_message(buf: &[u8]) -> Result<Message, CodecError> {
    if buf.len() < MESSAGE_SIZE {
        return Err(CodecError::Truncated {
            needed: MESSAGE_SIZE,
            actual: buf.len(),
        });
    }
    let msg = &buf[..MESSAGE_SIZE];

    match MessageType::from(msg[0] >> 4) {
        MessageType::BasicId => Ok(Message::BasicId(decode_basic_id(msg))),
        MessageType::Location => Ok(Message::Location(decode_location(msg))),
        MessageType::Auth => Ok(Message::Auth(decode_auth(msg))),
        MessageType::SelfId => Ok(Message::SelfId(decode_self_id(msg))),
        MessageType::System => Ok(Message::System(decode_system(msg))),
        MessageType::OperatorId => Ok(Message::OperatorId(decode_operator_id(msg))),
        MessageType::MessagePack | MessageType::Invalid => {
            Err(CodecError::UnexpectedType(msg[0] >> 4))
        }
    }
}

/// Decode a message pack into a fresh `UasData`
pub fn decode_message_pack(buf: &[u8]) -> Result<UasData, CodecError> {
    if buf.len() < PACK_HEADER_SIZE {
        return Err(CodecError::Truncated {
            needed: PACK_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    if MessageType::from(buf[0] >> 4) != MessageType::MessagePack {
        return Err(CodecError::UnexpectedType(buf[0] >> 4));
    }
    if buf[1] as usize != MESSAGE_SIZE {
        return Err(CodecError::InvalidPack("single message size"));
    }

    let count = buf[2] as usize;
    if count == 0 || count > PACK_MAX_MESSAGES {
        return Err(CodecError::InvalidPack("message count"));
    }

    let needed = PACK_HEADER_SIZE + count * MESSAGE_SIZE;
    if buf.len() < needed {
        return Err(CodecError::Truncated {
            needed,
            actual: buf.len(),
        });
    }

    let mut uas = UasData::default();
    for chunk in buf[PACK_HEADER_SIZE..needed].chunks_exact(MESSAGE_SIZE) {
        match decode_message(chunk) {
            Ok(msg) => uas.insert(msg),
            Err(_) => return Err(CodecError::InvalidPack("embedded message type")),
        }
    }

    Ok(uas)
}

fn le_u16(msg: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([msg[at], msg[at + 1]])
}

fn le_u32(msg: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([msg[at], msg[at + 1], msg[at + 2], msg[at + 3]])
}

fn le_i32(msg: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([msg[at], msg[at + 1], msg[at + 2], msg[at + 3]])
}

fn decode_lat_lon(raw: i32) -> f64 {
    raw as f64 / 10_000_000.0
}

fn decode_altitude(raw: u16) -> f32 {
    raw as f32 * 0.5 - 1000.0
}

fn decode_speed_horizontal(raw: u8, multiplier: u8) -> f32 {
    if multiplier == 0 {
        raw as f32 * 0.25
    } else {
        raw as f32 * 0.75 + 255.0 * 0.25
    }
}

fn decode_basic_id(msg: &[u8]) -> BasicId {
    let mut uas_id = [0u8; ID_SIZE];
    uas_id.copy_from_slice(&msg[2..2 + ID_SIZE]);
    BasicId {
        id_type: msg[1] >> 4,
        ua_type: msg[1] & 0x0F,
        uas_id,
    }
}

fn decode_location(msg: &[u8]) -> Location {
    let flags = msg[1];
    let ew_direction = (flags >> 1) & 1;
    let speed_mult = flags & 1;

    let direction = if ew_direction == 0 {
        msg[2] as f32
    } else {
        msg[2] as f32 + 180.0
    };

    let ts_raw = le_u16(msg, 21);
    let timestamp = if ts_raw == 0xFFFF {
        INVALID_TIMESTAMP
    } else {
        ts_raw as f32 / 10.0
    };

    Location {
        status: flags >> 4,
        height_type: (flags >> 2) & 1,
        direction,
        speed_horizontal: decode_speed_horizontal(msg[3], speed_mult),
        speed_vertical: (msg[4] as i8) as f32 * 0.5,
        latitude: decode_lat_lon(le_i32(msg, 5)),
        longitude: decode_lat_lon(le_i32(msg, 9)),
        altitude_baro: decode_altitude(le_u16(msg, 13)),
        altitude_geo: decode_altitude(le_u16(msg, 15)),
        height: decode_altitude(le_u16(msg, 17)),
        vert_accuracy: msg[19] >> 4,
        horiz_accuracy: msg[19] & 0x0F,
        baro_accuracy: msg[20] >> 4,
        speed_accuracy: msg[20] & 0x0F,
        timestamp,
        ts_accuracy: msg[23] & 0x0F,
    }
}

fn decode_auth(msg: &[u8]) -> Auth {
    let mut auth = Auth {
        auth_type: msg[1] >> 4,
        data_page: msg[1] & 0x0F,
        ..Default::default()
    };

    if auth.data_page == 0 {
        auth.last_page_index = msg[2];
        auth.length = msg[3];
        auth.timestamp = le_u32(msg, 4);
        auth.auth_data[..AUTH_PAGE_ZERO_DATA_SIZE].copy_from_slice(&msg[8..MESSAGE_SIZE]);
    } else {
        auth.auth_data.copy_from_slice(&msg[2..MESSAGE_SIZE]);
    }
    auth
}

fn decode_self_id(msg: &[u8]) -> SelfId {
    let mut desc = [0u8; STR_SIZE];
    desc.copy_from_slice(&msg[2..2 + STR_SIZE]);
    SelfId {
        desc_type: msg[1],
        desc,
    }
}

fn decode_system(msg: &[u8]) -> System {
    System {
        operator_location_type: msg[1] & 0x03,
        classification_type: (msg[1] >> 2) & 0x07,
        operator_latitude: decode_lat_lon(le_i32(msg, 2)),
        operator_longitude: decode_lat_lon(le_i32(msg, 6)),
        area_count: le_u16(msg, 10),
        area_radius: msg[12] as u16 * 10,
        area_ceiling: decode_altitude(le_u16(msg, 13)),
        area_floor: decode_altitude(le_u16(msg, 15)),
        category_eu: msg[17] >> 4,
        class_eu: msg[17] & 0x0F,
        operator_altitude_geo: decode_altitude(le_u16(msg, 18)),
        timestamp: le_u32(msg, 20),
    }
}

fn decode_operator_id(msg: &[u8]) -> OperatorId {
    let mut operator_id = [0u8; ID_SIZE];
    operator_id.copy_from_slice(&msg[2..2 + ID_SIZE]);
    OperatorId {
        operator_id_type: msg[1],
        operator_id,
    }
}
