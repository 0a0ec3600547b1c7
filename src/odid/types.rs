//! Open Drone ID data types

/// Every standard message is exactly this long on the wire
pub const MESSAGE_SIZE: usize = 25;

/// UAS ID / operator ID length in bytes
pub const ID_SIZE: usize = 20;

/// Self ID description length in bytes
pub const STR_SIZE: usize = 23;

/// Auth data carried by page 0
pub const AUTH_PAGE_ZERO_DATA_SIZE: usize = 17;

/// Auth data carried by pages 1..
pub const AUTH_PAGE_NONZERO_DATA_SIZE: usize = 23;

pub const AUTH_MAX_PAGES: usize = 16;
pub const BASIC_ID_MAX_MESSAGES: usize = 2;
pub const PACK_MAX_MESSAGES: usize = 9;

/// Encoded timestamp value meaning "unknown"
pub const INVALID_TIMESTAMP: f32 = 0xFFFF as f32;

/// Message type identifiers (high nibble of the header byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    BasicId = 0x0,
    Location = 0x1,
    Auth = 0x2,
    SelfId = 0x3,
    System = 0x4,
    OperatorId = 0x5,
    MessagePack = 0xF,
    Invalid = 0xFF,
}

impl From<u8> for MessageType {
    fn from(nibble: u8) -> Self {
        match nibble {
            0x0 => Self::BasicId,
            0x1 => Self::Location,
            0x2 => Self::Auth,
            0x3 => Self::SelfId,
            0x4 => Self::System,
            0x5 => Self::OperatorId,
            0xF => Self::MessagePack,
            _ => Self::Invalid,
        }
    }
}

/// Basic ID message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicId {
    /// Serial number, CAA registration, UTM UUID or session ID
    pub id_type: u8,
    pub ua_type: u8,
    /// Raw ID bytes, NUL padded
    pub uas_id: [u8; ID_SIZE],
}

/// Location / vector message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub status: u8,
    /// Track direction in degrees (0-359)
    pub direction: f32,
    /// Ground speed in m/s
    pub speed_horizontal: f32,
    /// Climb rate in m/s (positive up)
    pub speed_vertical: f32,
    pub latitude: f64,
    pub longitude: f64,
    /// Pressure altitude in meters
    pub altitude_baro: f32,
    /// WGS-84 altitude in meters
    pub altitude_geo: f32,
    /// 0 = above takeoff, 1 = above ground
    pub height_type: u8,
    pub height: f32,
    pub horiz_accuracy: u8,
    pub vert_accuracy: u8,
    pub baro_accuracy: u8,
    pub speed_accuracy: u8,
    pub ts_accuracy: u8,
    /// Seconds after the full hour, or `INVALID_TIMESTAMP`
    pub timestamp: f32,
}

/// One page of an authentication message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Auth {
    pub auth_type: u8,
    pub data_page: u8,
    /// Only meaningful on page 0
    pub last_page_index: u8,
    /// Only meaningful on page 0
    pub length: u8,
    /// Only meaningful on page 0
    pub timestamp: u32,
    pub auth_data: [u8; AUTH_PAGE_NONZERO_DATA_SIZE],
}

/// Free-text self description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelfId {
    pub desc_type: u8,
    pub desc: [u8; STR_SIZE],
}

/// System message (operator position and operating area)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct System {
    pub operator_location_type: u8,
    pub classification_type: u8,
    pub operator_latitude: f64,
    pub operator_longitude: f64,
    pub area_count: u16,
    /// Meters
    pub area_radius: u16,
    pub area_ceiling: f32,
    pub area_floor: f32,
    pub category_eu: u8,
    pub class_eu: u8,
    pub operator_altitude_geo: f32,
    /// Seconds since 2019-01-01 00:00 UTC
    pub timestamp: u32,
}

/// Operator ID message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperatorId {
    pub operator_id_type: u8,
    pub operator_id: [u8; ID_SIZE],
}

/// A single decoded standard message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    BasicId(BasicId),
    Location(Location),
    Auth(Auth),
    SelfId(SelfId),
    System(System),
    OperatorId(OperatorId),
}

/// Everything a message pack can carry, with validity expressed as `Option`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UasData {
    pub basic_id: [Option<BasicId>; BASIC_ID_MAX_MESSAGES],
    pub location: Option<Location>,
    pub auth: [Option<Auth>; AUTH_MAX_PAGES],
    pub self_id: Option<SelfId>,
    pub system: Option<System>,
    pub operator_id: Option<OperatorId>,
}

impl UasData {
    /// Store a decoded message in its slot
    pub fn insert(&mut self, msg: Message) {
        match msg {
            Message::BasicId(basic) => {
                // Same ID type replaces, otherwise take the first free slot
                let slot = self
                    .basic_id
                    .iter()
                    .position(|b| matches!(b, Some(existing) if existing.id_type == basic.id_type))
                    .or_else(|| self.basic_id.iter().position(Option::is_none));
                if let Some(idx) = slot {
                    self.basic_id[idx] = Some(basic);
                }
            }
            Message::Location(loc) => self.location = Some(loc),
            Message::Auth(auth) => {
                let page = auth.data_page as usize;
                if page < AUTH_MAX_PAGES {
                    self.auth[page] = Some(auth);
                }
            }
            Message::SelfId(self_id) => self.self_id = Some(self_id),
            Message::System(system) => self.system = Some(system),
            Message::OperatorId(op) => self.operator_id = Some(op),
        }
    }

    /// True when no message was decoded
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.basic_id.iter().all(Option::is_none)
            && self.location.is_none()
            && self.auth.iter().all(Option::is_none)
            && self.self_id.is_none()
            && self.system.is_none()
            && self.operator_id.is_none()
    }
}
