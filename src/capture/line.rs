//! Capture helper output line parsing
//!
//! Wi-Fi sniffer lines: `<mgmt|ctrl|data> <rssi> <hex>`
//! BLE scanner lines:   `<xx:xx:xx:xx:xx:xx> <rssi> <hex>`
//!
//! Blank lines and lines starting with `#` are helper chatter and are ignored.

use thiserror::Error;

use crate::decoder::{FrameKind, RawFrame};
use crate::record::MacAddr;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("expected 3 fields, got {0}")]
    FieldCount(usize),
    #[error("unknown frame kind '{0}'")]
    Kind(String),
    #[error("bad rssi '{0}'")]
    Rssi(String),
    #[error("bad address: {0}")]
    Address(String),
    #[error("bad hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

fn fields(line: &str) -> Result<Option<[&str; 3]>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [a, b, c] => Ok(Some([*a, *b, *c])),
        other => Err(LineError::FieldCount(other.len())),
    }
}

fn rssi(field: &str) -> Result<i32, LineError> {
    field
        .parse()
        .map_err(|_| LineError::Rssi(field.to_string()))
}

/// Parse one Wi-Fi sniffer line. `Ok(None)` for ignorable lines.
pub fn parse_wifi_line(line: &str) -> Result<Option<RawFrame>, LineError> {
    let Some([kind, level, payload]) = fields(line)? else {
        return Ok(None);
    };

    let kind = match kind {
        "mgmt" => FrameKind::Management,
        "ctrl" => FrameKind::Control,
        "data" => FrameKind::Data,
        other => return Err(LineError::Kind(other.to_string())),
    };

    Ok(Some(RawFrame::wifi(kind, rssi(level)?, hex::decode(payload)?)))
}

/// Parse one BLE scanner line. `Ok(None)` for ignorable lines.
pub fn parse_ble_line(line: &str) -> Result<Option<RawFrame>, LineError> {
    let Some([address, level, payload]) = fields(line)? else {
        return Ok(None);
    };

    let address: MacAddr = address.parse().map_err(LineError::Address)?;
    Ok(Some(RawFrame::advertisement(
        address,
        rssi(level)?,
        hex::decode(payload)?,
    )))
}
