//! Frame decoding - classify a captured frame and turn it into an observation
//!
//! Four wire formats are handled:
//! 1. Standard message pack in a beacon vendor element
//! 2. Standard message pack in a NAN service discovery action frame
//! 3. BLE legacy advertisement (one message per advertisement)
//! 4. Compact national beacon format (big-endian TLV)

mod ble;
pub mod classify;
mod national;

use thiserror::Error;

use crate::odid::{self, CodecError, UasData};
use crate::record::{MacAddr, SubMessage};

pub use classify::{classify, Classified, Family};

/// Offset of the transmitter address in a management frame header
const SOURCE_ADDR_OFFSET: usize = 10;

/// Captured frame kind, as reported by the capture side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Management,
    Control,
    Data,
    Advertisement,
}

/// One captured frame (Wi-Fi) or advertisement (BLE)
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub kind: FrameKind,
    pub rssi: i32,
    /// Advertiser address; Wi-Fi frames carry theirs in the header
    pub source: Option<MacAddr>,
    pub payload: Vec<u8>,
}

impl RawFrame {
    pub fn wifi(kind: FrameKind, rssi: i32, payload: Vec<u8>) -> Self {
        Self {
            kind,
            rssi,
            source: None,
            payload,
        }
    }

    pub fn advertisement(address: MacAddr, rssi: i32, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Advertisement,
            rssi,
            source: Some(address),
            payload,
        }
    }
}

/// Frame decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("management frame too short: {0} bytes")]
    TooShort(usize),
    #[error("element at offset {offset} claims {length} bytes past the end of a {frame_len}-byte frame")]
    ElementOverrun {
        offset: usize,
        length: usize,
        frame_len: usize,
    },
    #[error("field at offset {offset} claims {length} bytes past the end of its element")]
    FieldOverrun { offset: usize, length: usize },
    #[error("advertisement without an advertiser address")]
    MissingAddress,
    #[error("all-zero source address")]
    ZeroAddress,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl FrameError {
    /// Length/offset inconsistency, as opposed to a codec rejection
    pub fn is_malformed(&self) -> bool {
        !matches!(self, FrameError::Codec(_))
    }
}

/// A decoded sighting of one aircraft, ready to be applied to the track table
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub mac: MacAddr,
    pub rssi: i32,
    /// Milliseconds since the Unix epoch
    pub seen_ms: i64,
    pub family: Family,
    pub messages: Vec<SubMessage>,
}

/// Classify and decode a frame.
///
/// `Ok(None)` when the frame carries no remote ID payload.
pub fn decode_frame(frame: &RawFrame, seen_ms: i64) -> Result<Option<Observation>, FrameError> {
    let Some(Classified { family, span }) = classify(frame)? else {
        return Ok(None);
    };

    let bytes = frame.payload.as_slice();

    let (mac, messages) = match family {
        Family::NanAction => {
            let uas = odid::decode_nan_action_frame(bytes)?;
            (wifi_source(bytes)?, project(uas))
        }
        Family::BeaconPack => {
            let uas = odid::decode_message_pack(&bytes[span])?;
            (wifi_source(bytes)?, project(uas))
        }
        Family::BeaconNational => {
            let fields = national::decode_national(&bytes[span])?;
            (wifi_source(bytes)?, vec![SubMessage::National(fields)])
        }
        Family::BleLegacy => {
            let mac = frame.source.ok_or(FrameError::MissingAddress)?;
            (mac, ble::decode_advertisement(bytes)?)
        }
    };
    if mac.is_zero() {
        return Err(FrameError::ZeroAddress);
    }

    Ok(Some(Observation {
        mac,
        rssi: frame.rssi,
        seen_ms,
        family,
        messages,
    }))
}

fn wifi_source(bytes: &[u8]) -> Result<MacAddr, FrameError> {
    bytes
        .get(SOURCE_ADDR_OFFSET..)
        .and_then(MacAddr::from_slice)
        .ok_or(FrameError::TooShort(bytes.len()))
}

/// Sub-messages of a decoded pack that are projected into the record
pub(crate) fn project(uas: UasData) -> Vec<SubMessage> {
    let UasData {
        basic_id: [first_basic_id, _],
        location,
        auth,
        self_id,
        system,
        operator_id,
    } = uas;
    let [first_auth_page, ..] = auth;

    let mut out = Vec::with_capacity(6);
    out.extend(first_basic_id.map(SubMessage::BasicId));
    out.extend(location.map(SubMessage::Location));
    out.extend(system.map(SubMessage::System));
    out.extend(operator_id.map(SubMessage::OperatorId));
    out.extend(self_id.map(SubMessage::SelfId));
    out.extend(first_auth_page.map(SubMessage::Auth));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odid::testutil::*;

    const SOURCE: [u8; 6] = [0x60, 0x60, 0x1F, 0xAA, 0xBB, 0xCC];

    #[test]
    fn test_decode_beacon_pack() {
        let pack = message_pack(&[
            basic_id_message(1, 2, "1581F4XYZ"),
            location_message(37.77, -122.41, 60.0, 15.0, 4.0, 10.0),
            system_message(37.76, -122.40),
            operator_id_message("USA-OP-1"),
        ]);
        let beacon = beacon_frame(SOURCE, &[(0xDD, odid_vendor_body([0xFA, 0x0B, 0xBC], &pack))]);
        let frame = RawFrame::wifi(FrameKind::Management, -55, beacon);

        let obs = decode_frame(&frame, 1_000).unwrap().unwrap();
        assert_eq!(obs.mac, MacAddr(SOURCE));
        assert_eq!(obs.rssi, -55);
        assert_eq!(obs.family, Family::BeaconPack);
        assert_eq!(obs.messages.len(), 4);
    }

    #[test]
    fn test_decode_nan_frame() {
        let pack = message_pack(&[operator_id_message("NAN-OP")]);
        let frame = RawFrame::wifi(FrameKind::Management, -70, nan_action_frame(SOURCE, &pack));
        let obs = decode_frame(&frame, 5).unwrap().unwrap();
        assert_eq!(obs.family, Family::NanAction);
        assert_eq!(obs.mac, MacAddr(SOURCE));
        assert!(matches!(obs.messages[0], SubMessage::OperatorId(_)));
    }

    #[test]
    fn test_rejected_nan_frame_is_codec_error() {
        let pack = message_pack(&[operator_id_message("NAN-OP")]);
        let mut bytes = nan_action_frame(SOURCE, &pack);
        bytes[24] = 0x7F; // wrong action category
        let frame = RawFrame::wifi(FrameKind::Management, -70, bytes);
        let err = decode_frame(&frame, 5).unwrap_err();
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_decode_national_beacon() {
        let mut body = vec![0x6A, 0x5C, 0x35, 0x01];
        body.extend_from_slice(&[3, 6]);
        body.extend_from_slice(b"ABC123");
        let beacon = beacon_frame(SOURCE, &[(0xDD, body)]);
        let frame = RawFrame::wifi(FrameKind::Management, -40, beacon);

        let obs = decode_frame(&frame, 0).unwrap().unwrap();
        assert_eq!(obs.family, Family::BeaconNational);
        match &obs.messages[0] {
            SubMessage::National(fields) => {
                assert_eq!(fields.uav_id.as_deref(), Some(&b"ABC123"[..]))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_advertisement() {
        let adv = ble_advertisement(&basic_id_message(1, 2, "BLE-1"));
        let frame = RawFrame::advertisement(MacAddr(SOURCE), -80, adv);
        let obs = decode_frame(&frame, 0).unwrap().unwrap();
        assert_eq!(obs.family, Family::BleLegacy);
        assert_eq!(obs.mac, MacAddr(SOURCE));
    }

    #[test]
    fn test_zero_source_address_rejected() {
        let pack = message_pack(&[basic_id_message(1, 2, "ZERO-1")]);
        let beacon = beacon_frame([0; 6], &[(0xDD, odid_vendor_body([0xFA, 0x0B, 0xBC], &pack))]);
        let frame = RawFrame::wifi(FrameKind::Management, -55, beacon);
        let err = decode_frame(&frame, 0).unwrap_err();
        assert_eq!(err, FrameError::ZeroAddress);
        assert!(err.is_malformed());

        let adv = ble_advertisement(&basic_id_message(1, 2, "ZERO-2"));
        let frame = RawFrame::advertisement(MacAddr::ZERO, -80, adv);
        assert_eq!(decode_frame(&frame, 0), Err(FrameError::ZeroAddress));
    }

    #[test]
    fn test_unrelated_frame_is_none() {
        let beacon = beacon_frame(SOURCE, &[(0x00, b"HomeWifi".to_vec())]);
        let frame = RawFrame::wifi(FrameKind::Management, -40, beacon);
        assert_eq!(decode_frame(&frame, 0), Ok(None));
    }

    #[test]
    fn test_project_takes_first_basic_id_and_auth_page() {
        let mut uas = UasData::default();
        uas.insert(odid::Message::BasicId(odid::BasicId {
            id_type: 1,
            ..Default::default()
        }));
        uas.insert(odid::Message::BasicId(odid::BasicId {
            id_type: 2,
            ..Default::default()
        }));
        uas.insert(odid::Message::Auth(odid::Auth {
            data_page: 1,
            ..Default::default()
        }));
        let msgs = project(uas);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(&msgs[0], SubMessage::BasicId(b) if b.id_type == 1));
    }
}
