//! Per-aircraft telemetry record and the sub-messages merged into it

use std::fmt;
use std::str::FromStr;

use crate::odid::{self, AUTH_PAGE_NONZERO_DATA_SIZE, ID_SIZE, STR_SIZE};

/// 6-byte hardware (MAC / BLE) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    /// Copy an address out of a frame. `None` if the slice is too short.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(MacAddr(raw))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; 6];
        let mut parts = s.split(':');
        for byte in raw.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("short address: {s}"))?;
            if part.len() != 2 {
                return Err(format!("bad octet '{part}' in {s}"));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|e| format!("{s}: {e}"))?;
        }
        if parts.next().is_some() {
            return Err(format!("long address: {s}"));
        }
        Ok(MacAddr(raw))
    }
}

/// NUL-terminated string with a fixed byte capacity `N`.
///
/// At most `N - 1` bytes are stored so the last byte is always NUL,
/// whatever the source length or termination.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedStr<const N: usize>([u8; N]);

impl<const N: usize> FixedStr<N> {
    pub fn new() -> Self {
        FixedStr([0; N])
    }

    /// Replace the contents with `src` up to its first NUL, truncated at `N - 1` bytes
    pub fn set(&mut self, src: &[u8]) {
        let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
        let n = end.min(N.saturating_sub(1));
        self.0 = [0; N];
        self.0[..n].copy_from_slice(&src[..n]);
    }

    /// Stored bytes, without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// Raw storage including padding
    #[cfg(test)]
    pub fn raw(&self) -> &[u8; N] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Printable form; invalid UTF-8 is replaced
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// ID strings: 20 characters plus terminator
pub type IdString = FixedStr<{ ID_SIZE + 1 }>;

/// Self ID description and auth data
pub type TextString = FixedStr<{ STR_SIZE + 1 }>;
pub type AuthString = FixedStr<{ AUTH_PAGE_NONZERO_DATA_SIZE + 1 }>;

/// Fields carried by the compact national (French) beacon format.
///
/// Each TLV field is optional on the wire, so everything is `Option`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NationalFields {
    pub operator_id: Option<Vec<u8>>,
    pub uav_id: Option<Vec<u8>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_msl: Option<i32>,
    pub height_agl: Option<i32>,
    pub pilot_latitude: Option<f64>,
    pub pilot_longitude: Option<f64>,
    pub speed: Option<i32>,
    pub heading: Option<i32>,
}

/// One decoded unit of telemetry, merged into a record as a field-level union
#[derive(Debug, Clone, PartialEq)]
pub enum SubMessage {
    BasicId(odid::BasicId),
    Location(odid::Location),
    Auth(odid::Auth),
    SelfId(odid::SelfId),
    System(odid::System),
    OperatorId(odid::OperatorId),
    National(NationalFields),
}

impl From<odid::Message> for SubMessage {
    fn from(msg: odid::Message) -> Self {
        match msg {
            odid::Message::BasicId(m) => SubMessage::BasicId(m),
            odid::Message::Location(m) => SubMessage::Location(m),
            odid::Message::Auth(m) => SubMessage::Auth(m),
            odid::Message::SelfId(m) => SubMessage::SelfId(m),
            odid::Message::System(m) => SubMessage::System(m),
            odid::Message::OperatorId(m) => SubMessage::OperatorId(m),
        }
    }
}

/// Accumulated telemetry for one aircraft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    // Identity
    pub mac: MacAddr,
    pub rssi: i32,
    /// Milliseconds since the Unix epoch
    pub last_seen_ms: i64,
    pub uav_id: IdString,
    pub operator_id: IdString,
    pub id_type: u8,
    pub ua_type: u8,
    pub operator_id_type: u8,

    // Position / kinematics
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_msl: i32,
    pub height_agl: i32,
    pub speed: i32,
    pub heading: i32,
    pub speed_vertical: i32,
    pub altitude_pressure: i32,
    pub height_type: u8,
    pub horizontal_accuracy: u8,
    pub vertical_accuracy: u8,
    pub baro_accuracy: u8,
    pub speed_accuracy: u8,
    pub timestamp: i32,
    pub status: u8,

    // Operator / system
    pub pilot_latitude: f64,
    pub pilot_longitude: f64,
    pub operator_altitude_geo: i32,
    pub operator_location_type: u8,
    pub classification_type: u8,
    pub area_count: u16,
    pub area_radius: u16,
    pub area_ceiling: i32,
    pub area_floor: i32,
    pub system_timestamp: u32,

    // Self ID / auth
    pub desc_type: u8,
    pub description: TextString,
    pub auth_type: u8,
    pub auth_page: u8,
    pub auth_length: u8,
    pub auth_timestamp: u32,
    pub auth_data: AuthString,

    /// New data since the last emission
    pub fresh: bool,
}

impl TelemetryRecord {
    pub fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            ..Default::default()
        }
    }

    /// Aircraft position is known (both coordinates non-zero)
    pub fn has_position(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    /// Operator position is known (both coordinates non-zero)
    pub fn has_pilot_position(&self) -> bool {
        self.pilot_latitude != 0.0 && self.pilot_longitude != 0.0
    }

    /// Merge one sub-message. Fields it does not carry are left untouched.
    pub fn merge(&mut self, msg: &SubMessage) {
        match msg {
            SubMessage::BasicId(basic) => {
                self.uav_id.set(&basic.uas_id);
                self.id_type = basic.id_type;
                self.ua_type = basic.ua_type;
            }
            SubMessage::Location(loc) => {
                self.latitude = loc.latitude;
                self.longitude = loc.longitude;
                self.altitude_msl = loc.altitude_geo as i32;
                self.height_agl = loc.height as i32;
                self.speed = loc.speed_horizontal as i32;
                self.heading = loc.direction as i32;
                self.speed_vertical = loc.speed_vertical as i32;
                self.altitude_pressure = loc.altitude_baro as i32;
                self.height_type = loc.height_type;
                self.horizontal_accuracy = loc.horiz_accuracy;
                self.vertical_accuracy = loc.vert_accuracy;
                self.baro_accuracy = loc.baro_accuracy;
                self.speed_accuracy = loc.speed_accuracy;
                self.timestamp = loc.timestamp as i32;
                self.status = loc.status;
            }
            SubMessage::Auth(auth) => {
                self.auth_type = auth.auth_type;
                self.auth_page = auth.data_page;
                self.auth_length = auth.length;
                self.auth_timestamp = auth.timestamp;
                self.auth_data.set(&auth.auth_data);
            }
            SubMessage::SelfId(self_id) => {
                self.desc_type = self_id.desc_type;
                self.description.set(&self_id.desc);
            }
            SubMessage::System(sys) => {
                self.pilot_latitude = sys.operator_latitude;
                self.pilot_longitude = sys.operator_longitude;
                self.operator_location_type = sys.operator_location_type;
                self.classification_type = sys.classification_type;
                self.area_count = sys.area_count;
                self.area_radius = sys.area_radius;
                self.area_ceiling = sys.area_ceiling as i32;
                self.area_floor = sys.area_floor as i32;
                self.operator_altitude_geo = sys.operator_altitude_geo as i32;
                self.system_timestamp = sys.timestamp;
            }
            SubMessage::OperatorId(op) => {
                self.operator_id_type = op.operator_id_type;
                self.operator_id.set(&op.operator_id);
            }
            SubMessage::National(fields) => self.merge_national(fields),
        }
    }

    fn merge_national(&mut self, fields: &NationalFields) {
        if let Some(id) = &fields.operator_id {
            self.operator_id.set(id);
        }
        if let Some(id) = &fields.uav_id {
            self.uav_id.set(id);
        }
        if let Some(v) = fields.latitude {
            self.latitude = v;
        }
        if let Some(v) = fields.longitude {
            self.longitude = v;
        }
        if let Some(v) = fields.altitude_msl {
            self.altitude_msl = v;
        }
        if let Some(v) = fields.height_agl {
            self.height_agl = v;
        }
        if let Some(v) = fields.pilot_latitude {
            self.pilot_latitude = v;
        }
        if let Some(v) = fields.pilot_longitude {
            self.pilot_longitude = v;
        }
        if let Some(v) = fields.speed {
            self.speed = v;
        }
        if let Some(v) = fields.heading {
            self.heading = v;
        }
    }
}
