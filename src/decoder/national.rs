//! Compact national (French) beacon format
//!
//! The vendor element is: tag 0xDD, length, OUI 6A:5C:35, vendor type,
//! then TLV fields `(tag: u8, length: u8, value)`. Numeric values are big endian.
//!
//! | tag | field                  | encoding         |
//! |-----|------------------------|------------------|
//! | 2   | operator ID            | text from byte 6 |
//! | 3   | aircraft ID            | text             |
//! | 4/5 | aircraft lat / lon     | i32 * 1e-5 deg   |
//! | 6   | altitude MSL           | i16 m            |
//! | 7   | height above takeoff   | i16 m            |
//! | 8/9 | operator lat / lon     | i32 * 1e-5 deg   |
//! | 10  | horizontal speed       | u8 m/s           |
//! | 11  | true heading           | u16 deg          |

use crate::record::NationalFields;

use super::FrameError;

/// TLV fields start after tag, length, OUI and vendor type
const FIELDS_OFFSET: usize = 6;

/// Operator ID text is preceded by a 6-byte prefix inside its value
const OPERATOR_ID_VALUE_OFFSET: usize = 6;

const TAG_OPERATOR_ID: u8 = 2;
const TAG_UAV_ID: u8 = 3;
const TAG_LATITUDE: u8 = 4;
const TAG_LONGITUDE: u8 = 5;
const TAG_ALTITUDE: u8 = 6;
const TAG_HEIGHT: u8 = 7;
const TAG_PILOT_LATITUDE: u8 = 8;
const TAG_PILOT_LONGITUDE: u8 = 9;
const TAG_SPEED: u8 = 10;
const TAG_HEADING: u8 = 11;

fn be_i32(value: &[u8]) -> Option<i32> {
    Some(i32::from_be_bytes(value.get(..4)?.try_into().ok()?))
}

fn be_i16(value: &[u8]) -> Option<i16> {
    Some(i16::from_be_bytes(value.get(..2)?.try_into().ok()?))
}

fn be_u16(value: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes(value.get(..2)?.try_into().ok()?))
}

fn coordinate(value: &[u8]) -> Option<f64> {
    be_i32(value).map(|raw| raw as f64 / 100_000.0)
}

/// Decode a whole vendor element (starting at its 0xDD tag).
///
/// A field whose value is too short for its type is skipped; a field that
/// runs past the element aborts the whole element.
pub fn decode_national(element: &[u8]) -> Result<NationalFields, FrameError> {
    let mut fields = NationalFields::default();
    let end = element.len();
    let mut at = FIELDS_OFFSET;

    while at < end {
        if at + 2 > end {
            return Err(FrameError::FieldOverrun { offset: at, length: 0 });
        }

        let tag = element[at];
        let length = element[at + 1] as usize;
        let value_end = at + 2 + length;
        if value_end > end {
            return Err(FrameError::FieldOverrun { offset: at, length });
        }
        let value = &element[at + 2..value_end];

        match tag {
            TAG_OPERATOR_ID => {
                if let Some(text) = value.get(OPERATOR_ID_VALUE_OFFSET..) {
                    fields.operator_id = Some(text.to_vec());
                }
            }
            TAG_UAV_ID => fields.uav_id = Some(value.to_vec()),
            TAG_LATITUDE => fields.latitude = coordinate(value).or(fields.latitude),
            TAG_LONGITUDE => fields.longitude = coordinate(value).or(fields.longitude),
            TAG_ALTITUDE => {
                fields.altitude_msl = be_i16(value).map(i32::from).or(fields.altitude_msl)
            }
            TAG_HEIGHT => fields.height_agl = be_i16(value).map(i32::from).or(fields.height_agl),
            TAG_PILOT_LATITUDE => {
                fields.pilot_latitude = coordinate(value).or(fields.pilot_latitude)
            }
            TAG_PILOT_LONGITUDE => {
                fields.pilot_longitude = coordinate(value).or(fields.pilot_longitude)
            }
            TAG_SPEED => fields.speed = value.first().map(|&v| v as i32).or(fields.speed),
            TAG_HEADING => fields.heading = be_u16(value).map(i32::from).or(fields.heading),
            _ => {}
        }

        at = value_end;
    }

    Ok(fields)
}
