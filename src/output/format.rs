//! Line formats for the immediate and throttled channels

use std::str::FromStr;

use serde_json::Value;

use crate::record::TelemetryRecord;

/// Default size cap for one throttled-channel line
pub const DEFAULT_MESH_MAX_MESSAGE: usize = 230;

const MAP_LINK: &str = "https://maps.google.com/?q=";

/// Throttled channel line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshFormat {
    /// `Drone: <mac> RSSI:<n> <map link>` / `Pilot: <map link>`
    #[default]
    Text,
    /// `{"mac":..,"drone_lat":..,"drone_long":..}` / `{"remote_id":..,"pilot_lat":..,"pilot_long":..}`
    Json,
}

impl FromStr for MeshFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(MeshFormat::Text),
            "json" => Ok(MeshFormat::Json),
            other => Err(format!("unknown mesh format: {other}")),
        }
    }
}

fn json_string(s: String) -> String {
    Value::String(s).to_string()
}

/// One immediate-channel JSON line. Zero coordinates are emitted as-is.
pub fn immediate_json(rec: &TelemetryRecord) -> String {
    format!(
        "{{\"mac\":\"{}\",\"rssi\":{},\"drone_lat\":{:.6},\"drone_long\":{:.6},\"drone_altitude\":{},\"pilot_lat\":{:.6},\"pilot_long\":{:.6},\"basic_id\":{}}}",
        rec.mac,
        rec.rssi,
        rec.latitude,
        rec.longitude,
        rec.altitude_msl,
        rec.pilot_latitude,
        rec.pilot_longitude,
        json_string(rec.uav_id.to_string_lossy()),
    )
}

/// Aircraft line for the throttled channel
pub fn drone_line(rec: &TelemetryRecord, format: MeshFormat, max_len: usize) -> String {
    let line = match format {
        MeshFormat::Text => {
            let mut line = format!("Drone: {} RSSI:{}", rec.mac, rec.rssi);
            if rec.has_position() {
                line.push_str(&format!(
                    " {}{:.6},{:.6}",
                    MAP_LINK, rec.latitude, rec.longitude
                ));
            }
            line
        }
        MeshFormat::Json => format!(
            "{{\"mac\":\"{}\",\"drone_lat\":{:.6},\"drone_long\":{:.6}}}",
            rec.mac, rec.latitude, rec.longitude
        ),
    };
    truncate(line, max_len)
}

/// Operator line for the throttled channel.
///
/// The text form is only produced once the operator position is known; the
/// JSON form always carries the remote ID.
pub fn pilot_line(rec: &TelemetryRecord, format: MeshFormat, max_len: usize) -> Option<String> {
    let line = match format {
        MeshFormat::Text => {
            if !rec.has_pilot_position() {
                return None;
            }
            format!(
                "Pilot: {}{:.6},{:.6}",
                MAP_LINK, rec.pilot_latitude, rec.pilot_longitude
            )
        }
        MeshFormat::Json => format!(
            "{{\"remote_id\":{},\"pilot_lat\":{:.6},\"pilot_long\":{:.6}}}",
            json_string(rec.uav_id.to_string_lossy()),
            rec.pilot_latitude,
            rec.pilot_longitude
        ),
    };
    Some(truncate(line, max_len))
}

/// Cap a line so it plus its terminator fits in `max_len` bytes
fn truncate(mut line: String, max_len: usize) -> String {
    let limit = max_len.saturating_sub(1);
    if line.len() > limit {
        let mut cut = limit;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
    }
    line
}
