//! Encoders used to build test vectors

use super::types::{ID_SIZE, MESSAGE_SIZE, STR_SIZE};

const PROTO_VERSION: u8 = 2;

fn copy_str(dst: &mut [u8], s: &str) {
    let n = s.len().min(dst.len());
    dst[..n].copy_from_slice(&s.as_bytes()[..n]);
}

fn encode_lat_lon(deg: f64) -> [u8; 4] {
    ((deg * 10_000_000.0).round() as i32).to_le_bytes()
}

fn encode_altitude(meters: f32) -> [u8; 2] {
    (((meters + 1000.0) / 0.5).round() as u16).to_le_bytes()
}

pub fn basic_id_message(id_type: u8, ua_type: u8, id: &str) -> [u8; MESSAGE_SIZE] {
    let mut msg = [0u8; MESSAGE_SIZE];
    msg[0] = PROTO_VERSION;
    msg[1] = (id_type << 4) | (ua_type & 0x0F);
    copy_str(&mut msg[2..2 + ID_SIZE], id);
    msg
}

/// Location with status "airborne", height above takeoff, timestamp 1234.5 s
pub fn location_message(
    lat: f64,
    lon: f64,
    altitude_geo: f32,
    height: f32,
    speed: f32,
    direction: f32,
) -> [u8; MESSAGE_SIZE] {
    let mut msg = [0u8; MESSAGE_SIZE];
    msg[0] = 0x10 | PROTO_VERSION;

    let (ew, dir) = if direction < 180.0 {
        (0u8, direction)
    } else {
        (1u8, direction - 180.0)
    };
    let (mult, speed_raw) = if speed <= 63.75 {
        (0u8, speed / 0.25)
    } else {
        (1u8, (speed - 63.75) / 0.75)
    };

    msg[1] = (2 << 4) | (ew << 1) | mult;
    msg[2] = dir.round() as u8;
    msg[3] = speed_raw.round() as u8;
    msg[4] = 4i8 as u8; // 2 m/s climb
    msg[5..9].copy_from_slice(&encode_lat_lon(lat));
    msg[9..13].copy_from_slice(&encode_lat_lon(lon));
    msg[13..15].copy_from_slice(&encode_altitude(altitude_geo - 2.0));
    msg[15..17].copy_from_slice(&encode_altitude(altitude_geo));
    msg[17..19].copy_from_slice(&encode_altitude(height));
    msg[19] = (4 << 4) | 10;
    msg[20] = (3 << 4) | 2;
    msg[21..23].copy_from_slice(&12345u16.to_le_bytes());
    msg[23] = 1;
    msg
}

/// System message with a takeoff-location operator and a 50 m area
pub fn system_message(operator_lat: f64, operator_lon: f64) -> [u8; MESSAGE_SIZE] {
    let mut msg = [0u8; MESSAGE_SIZE];
    msg[0] = 0x40 | PROTO_VERSION;
    msg[1] = (1 << 2) | 1;
    msg[2..6].copy_from_slice(&encode_lat_lon(operator_lat));
    msg[6..10].copy_from_slice(&encode_lat_lon(operator_lon));
    msg[10..12].copy_from_slice(&1u16.to_le_bytes());
    msg[12] = 5;
    msg[13..15].copy_from_slice(&encode_altitude(120.0));
    msg[15..17].copy_from_slice(&encode_altitude(0.0));
    msg[17] = (1 << 4) | 2;
    msg[18..20].copy_from_slice(&encode_altitude(95.0));
    msg[20..24].copy_from_slice(&150_000_000u32.to_le_bytes());
    msg
}

pub fn self_id_message(desc: &str) -> [u8; MESSAGE_SIZE] {
    let mut msg = [0u8; MESSAGE_SIZE];
    msg[0] = 0x30 | PROTO_VERSION;
    copy_str(&mut msg[2..2 + STR_SIZE], desc);
    msg
}

pub fn operator_id_message(id: &str) -> [u8; MESSAGE_SIZE] {
    let mut msg = [0u8; MESSAGE_SIZE];
    msg[0] = 0x50 | PROTO_VERSION;
    copy_str(&mut msg[2..2 + ID_SIZE], id);
    msg
}

pub fn message_pack(messages: &[[u8; MESSAGE_SIZE]]) -> Vec<u8> {
    let mut pack = vec![0xF0 | PROTO_VERSION, MESSAGE_SIZE as u8, messages.len() as u8];
    for msg in messages {
        pack.extend_from_slice(msg);
    }
    pack
}

/// A complete NAN service discovery action frame carrying `pack`
pub fn nan_action_frame(source: [u8; 6], pack: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(48 + pack.len());

    // 802.11 management header: action subtype
    frame.extend_from_slice(&[0xD0, 0x00, 0x00, 0x00]);
    frame.extend_from_slice(&super::nan::NAN_DEST_ADDR);
    frame.extend_from_slice(&source);
    frame.extend_from_slice(&source);
    frame.extend_from_slice(&[0x00, 0x00]);

    // Public action, vendor specific, Wi-Fi Alliance NAN
    frame.extend_from_slice(&[0x04, 0x09, 0x50, 0x6F, 0x9A, 0x13]);

    // Service descriptor attribute
    let service_info_len = 1 + pack.len();
    let attr_len = (10 + service_info_len) as u16;
    frame.push(0x03);
    frame.extend_from_slice(&attr_len.to_le_bytes());
    frame.extend_from_slice(&super::nan::ODID_SERVICE_ID);
    frame.extend_from_slice(&[0x01, 0x00, 0x10, service_info_len as u8]);

    // Service info: message counter, then the pack
    frame.push(0x07);
    frame.extend_from_slice(pack);
    frame
}

/// A beacon frame whose tagged parameters are `elements`, each `(tag, body)`
pub fn beacon_frame(source: [u8; 6], elements: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut frame = vec![0x80, 0x00, 0x00, 0x00];
    frame.extend_from_slice(&[0xFF; 6]);
    frame.extend_from_slice(&source);
    frame.extend_from_slice(&source);
    frame.extend_from_slice(&[0x00, 0x00]);
    // Fixed parameters: timestamp, beacon interval, capabilities
    frame.extend_from_slice(&[0u8; 8]);
    frame.extend_from_slice(&[0x64, 0x00, 0x21, 0x04]);
    assert_eq!(frame.len(), 36);

    for (tag, body) in elements {
        frame.push(*tag);
        frame.push(body.len() as u8);
        frame.extend_from_slice(body);
    }
    frame
}

/// Vendor element body for the standard beacon carrier: OUI, type, counter, pack
pub fn odid_vendor_body(oui: [u8; 3], pack: &[u8]) -> Vec<u8> {
    let mut body = oui.to_vec();
    body.push(0x0D);
    body.push(0x01);
    body.extend_from_slice(pack);
    body
}

/// BLE legacy advertisement carrying one message
pub fn ble_advertisement(msg: &[u8; MESSAGE_SIZE]) -> Vec<u8> {
    let mut adv = vec![(MESSAGE_SIZE + 5) as u8, 0x16, 0xFA, 0xFF, 0x0D, 0x03];
    adv.extend_from_slice(msg);
    adv
}
