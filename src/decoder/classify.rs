//! Frame classification
//!
//! Decides which remote ID wire format a captured frame carries:
//! 1. Wi-Fi management frame addressed to the NAN multicast address → NAN action frame
//! 2. Wi-Fi beacon with a vendor element (tag 0xDD) from a known OUI
//!    → standard message pack, or the compact national format
//! 3. BLE advertisement with the remote ID service data signature → legacy advertisement
//!
//! Classification is a pure function of the frame bytes and kind.

use std::ops::Range;

use crate::odid::NAN_DEST_ADDR;

use super::{FrameError, FrameKind, RawFrame};

/// Shortest management frame we can take addresses from
pub const MGMT_HEADER_LEN: usize = 24;

/// Tagged parameters of a beacon start after header + fixed parameters
pub const BEACON_IE_OFFSET: usize = 36;

const BEACON_FRAME_CONTROL: u8 = 0x80;
const VENDOR_SPECIFIC_TAG: u8 = 0xDD;

/// Vendor element prefix before the message pack: tag, length, OUI, type, counter
const VENDOR_PACK_OFFSET: usize = 7;

/// OUIs carrying standard message packs in beacons
const ODID_OUIS: [[u8; 3]; 2] = [[0x90, 0x3A, 0xE6], [0xFA, 0x0B, 0xBC]];

/// OUI of the French national beacon format
const NATIONAL_OUI: [u8; 3] = [0x6A, 0x5C, 0x35];

/// BLE service data signature: AD type 0x16, UUID 0xFFFA (LE), app code 0x0D
const BLE_SIGNATURE: [u8; 4] = [0x16, 0xFA, 0xFF, 0x0D];

/// Remote ID wire format families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// NAN service discovery action frame
    NanAction,
    /// Message pack inside a beacon vendor element
    BeaconPack,
    /// Compact national format inside a beacon vendor element
    BeaconNational,
    /// BLE legacy advertisement with one message
    BleLegacy,
}

/// Classification result: the family and the byte range its decoder reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub family: Family,
    pub span: Range<usize>,
}

/// Classify a captured frame.
///
/// `Ok(None)` means the frame carries no remote ID payload (the common case).
/// An element that claims more bytes than the frame holds is `Err`.
pub fn classify(frame: &RawFrame) -> Result<Option<Classified>, FrameError> {
    let bytes = frame.payload.as_slice();

    match frame.kind {
        FrameKind::Advertisement => Ok(classify_advertisement(bytes)),
        FrameKind::Management => classify_management(bytes),
        FrameKind::Control | FrameKind::Data => Ok(None),
    }
}

fn classify_advertisement(bytes: &[u8]) -> Option<Classified> {
    if bytes.len() > 5 && bytes[1..5] == BLE_SIGNATURE {
        Some(Classified {
            family: Family::BleLegacy,
            span: 0..bytes.len(),
        })
    } else {
        None
    }
}

fn classify_management(bytes: &[u8]) -> Result<Option<Classified>, FrameError> {
    if bytes.len() < MGMT_HEADER_LEN {
        return Err(FrameError::TooShort(bytes.len()));
    }

    if bytes[4..10] == NAN_DEST_ADDR {
        return Ok(Some(Classified {
            family: Family::NanAction,
            span: 0..bytes.len(),
        }));
    }

    if bytes[0] != BEACON_FRAME_CONTROL {
        return Ok(None);
    }

    scan_vendor_elements(bytes)
}

/// Walk the beacon's tagged parameters looking for a remote ID vendor element
fn scan_vendor_elements(bytes: &[u8]) -> Result<Option<Classified>, FrameError> {
    let len = bytes.len();
    let mut offset = BEACON_IE_OFFSET;

    while offset < len {
        if offset + 2 > len {
            return Err(FrameError::ElementOverrun {
                offset,
                length: 0,
                frame_len: len,
            });
        }

        let tag = bytes[offset];
        let element_len = bytes[offset + 1] as usize;
        let end = offset + 2 + element_len;
        if end > len {
            return Err(FrameError::ElementOverrun {
                offset,
                length: element_len,
                frame_len: len,
            });
        }

        if tag == VENDOR_SPECIFIC_TAG && element_len >= 3 {
            let oui = &bytes[offset + 2..offset + 5];

            if ODID_OUIS.iter().any(|known| oui == known) && offset + VENDOR_PACK_OFFSET <= end {
                return Ok(Some(Classified {
                    family: Family::BeaconPack,
                    span: offset + VENDOR_PACK_OFFSET..end,
                }));
            }
            if oui == NATIONAL_OUI {
                return Ok(Some(Classified {
                    family: Family::BeaconNational,
                    span: offset..end,
                }));
            }
        }

        offset = end;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odid::testutil::*;

    const SOURCE: [u8; 6] = [0x60, 0x60, 0x1F, 0x00, 0x00, 0x01];

    fn mgmt(payload: Vec<u8>) -> RawFrame {
        RawFrame::wifi(FrameKind::Management, -60, payload)
    }

    fn ssid() -> (u8, Vec<u8>) {
        (0x00, b"DRONE".to_vec())
    }

    #[test]
    fn test_classify_beacon_pack() {
        let pack = message_pack(&[basic_id_message(1, 2, "X")]);
        let frame = beacon_frame(
            SOURCE,
            &[ssid(), (0xDD, odid_vendor_body([0xFA, 0x0B, 0xBC], &pack))],
        );
        let classified = classify(&mgmt(frame.clone())).unwrap().unwrap();
        assert_eq!(classified.family, Family::BeaconPack);
        assert_eq!(&frame[classified.span], pack.as_slice());
    }

    #[test]
    fn test_classify_beacon_national() {
        let body = vec![0x6A, 0x5C, 0x35, 0x01, 0x01, 0x01, 0x01];
        let frame = beacon_frame(SOURCE, &[ssid(), (0xDD, body)]);
        let classified = classify(&mgmt(frame)).unwrap().unwrap();
        assert_eq!(classified.family, Family::BeaconNational);
        // tag + length + 7 body bytes, after the 7-byte SSID element
        assert_eq!(classified.span, 43..52);
    }

    #[test]
    fn test_classify_nan() {
        let pack = message_pack(&[basic_id_message(1, 2, "X")]);
        let frame = nan_action_frame(SOURCE, &pack);
        let classified = classify(&mgmt(frame)).unwrap().unwrap();
        assert_eq!(classified.family, Family::NanAction);
    }

    #[test]
    fn test_unrelated_beacon_dropped() {
        let frame = beacon_frame(SOURCE, &[ssid(), (0xDD, vec![0x00, 0x50, 0xF2, 0x02])]);
        assert_eq!(classify(&mgmt(frame)).unwrap(), None);
    }

    #[test]
    fn test_non_management_rejected() {
        let pack = message_pack(&[basic_id_message(1, 2, "X")]);
        let frame = nan_action_frame(SOURCE, &pack);
        let data = RawFrame::wifi(FrameKind::Data, -60, frame);
        assert_eq!(classify(&data).unwrap(), None);
    }

    #[test]
    fn test_element_overrun_is_error() {
        let mut frame = beacon_frame(SOURCE, &[ssid()]);
        frame.extend_from_slice(&[0xDD, 40, 0xFA, 0x0B]);
        assert!(matches!(
            classify(&mgmt(frame)),
            Err(FrameError::ElementOverrun { offset: 43, length: 40, .. })
        ));
    }

    #[test]
    fn test_short_management_frame() {
        assert_eq!(
            classify(&mgmt(vec![0x80; 10])),
            Err(FrameError::TooShort(10))
        );
    }

    #[test]
    fn test_ble_signature() {
        let adv = ble_advertisement(&basic_id_message(1, 2, "BLE"));
        let frame = RawFrame::advertisement(crate::record::MacAddr(SOURCE), -70, adv);
        assert_eq!(classify(&frame).unwrap().unwrap().family, Family::BleLegacy);

        let other = RawFrame::advertisement(
            crate::record::MacAddr(SOURCE),
            -70,
            vec![0x02, 0x01, 0x06, 0x03, 0x03, 0x9F, 0xFE],
        );
        assert_eq!(classify(&other).unwrap(), None);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let pack = message_pack(&[location_message(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)]);
        let frame = mgmt(beacon_frame(
            SOURCE,
            &[ssid(), (0xDD, odid_vendor_body([0x90, 0x3A, 0xE6], &pack))],
        ));
        let first = classify(&frame);
        for _ in 0..10 {
            assert_eq!(classify(&frame), first);
        }
    }

    #[test]
    fn test_truncated_beacons_never_panic() {
        let pack = message_pack(&[basic_id_message(1, 2, "X")]);
        let frame = beacon_frame(
            SOURCE,
            &[ssid(), (0xDD, odid_vendor_body([0xFA, 0x0B, 0xBC], &pack))],
        );
        for len in 0..frame.len() {
            // Any result is fine as long as slicing stays in bounds
            let _ = classify(&mgmt(frame[..len].to_vec()));
        }
    }

    #[test]
    fn test_arbitrary_lengths_never_panic() {
        let mut frame = beacon_frame(SOURCE, &[]);
        frame.extend_from_slice(&[0; 20]);
        for claimed in 0..=255u8 {
            frame[37] = claimed;
            frame[36] = 0xDD;
            let _ = classify(&mgmt(frame.clone()));
        }
    }
}
