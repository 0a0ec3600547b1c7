//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::output::format::DEFAULT_MESH_MAX_MESSAGE;
use crate::output::{MeshFormat, ThrottleConfig, DEFAULT_BUFFER_BYTES};
use crate::uav_tracker::{EvictionPolicy, DEFAULT_CAPACITY};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of track table slots (also the handoff queue capacity)
    pub track_capacity: usize,

    /// Slot reuse policy when the table is full
    pub eviction: EvictionPolicy,

    /// Minimum spacing of throttled-channel sends
    pub throttle_interval: Duration,

    /// Delay between the aircraft line and the operator line
    pub pilot_delay: Duration,

    /// Size cap of one throttled-channel line in bytes
    pub mesh_max_message: usize,

    pub mesh_format: MeshFormat,

    /// Throttled channel destination (serial device or file); disabled when unset
    pub mesh_output: Option<PathBuf>,

    /// Output task queue polling period
    pub output_poll: Duration,

    /// Write buffer size of each output channel
    pub output_buffer_bytes: usize,

    pub heartbeat_interval: Duration,

    /// Wi-Fi sniffer helper command; frames are read from stdin when unset
    pub wifi_capture_cmd: Option<String>,

    /// BLE scanner helper command; BLE capture is disabled when unset
    pub ble_scan_cmd: Option<String>,

    pub ble_scan_window: Duration,
    pub ble_scan_pause: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track_capacity: DEFAULT_CAPACITY,
            eviction: EvictionPolicy::FirstSlot,
            throttle_interval: Duration::from_millis(5000),
            pilot_delay: Duration::from_millis(1000),
            mesh_max_message: DEFAULT_MESH_MAX_MESSAGE,
            mesh_format: MeshFormat::Text,
            mesh_output: None,
            output_poll: Duration::from_millis(10),
            output_buffer_bytes: DEFAULT_BUFFER_BYTES,
            heartbeat_interval: Duration::from_secs(60),
            wifi_capture_cmd: None,
            ble_scan_cmd: None,
            ble_scan_window: Duration::from_millis(1000),
            ble_scan_pause: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or invalid values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let parsed = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(key, parsed(key), default.as_millis() as u64))
        };

        Self {
            track_capacity: Some(parse_or(
                "TRACK_CAPACITY",
                parsed("TRACK_CAPACITY"),
                defaults.track_capacity,
            ))
            .filter(|&n| n > 0)
            .unwrap_or(defaults.track_capacity),

            eviction: parse_or("EVICTION", parsed("EVICTION"), defaults.eviction),

            throttle_interval: millis("THROTTLE_INTERVAL_MS", defaults.throttle_interval),

            pilot_delay: millis("PILOT_DELAY_MS", defaults.pilot_delay),

            mesh_max_message: parse_or(
                "MESH_MAX_MESSAGE",
                parsed("MESH_MAX_MESSAGE"),
                defaults.mesh_max_message,
            ),

            mesh_format: parse_or("MESH_FORMAT", parsed("MESH_FORMAT"), defaults.mesh_format),

            mesh_output: parsed("MESH_OUTPUT").map(PathBuf::from),

            output_poll: millis("OUTPUT_POLL_MS", defaults.output_poll),

            output_buffer_bytes: parse_or(
                "OUTPUT_BUFFER_BYTES",
                parsed("OUTPUT_BUFFER_BYTES"),
                defaults.output_buffer_bytes,
            ),

            heartbeat_interval: Duration::from_secs(parse_or(
                "HEARTBEAT_SECS",
                parsed("HEARTBEAT_SECS"),
                defaults.heartbeat_interval.as_secs(),
            )),

            wifi_capture_cmd: parsed("WIFI_CAPTURE_CMD"),

            ble_scan_cmd: parsed("BLE_SCAN_CMD"),

            ble_scan_window: millis("BLE_SCAN_WINDOW_MS", defaults.ble_scan_window),

            ble_scan_pause: millis("BLE_SCAN_PAUSE_MS", defaults.ble_scan_pause),
        }
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            interval: self.throttle_interval,
            pilot_delay: self.pilot_delay,
            format: self.mesh_format,
            max_message: self.mesh_max_message,
        }
    }
}

/// Parse a present value, warning and keeping the default on garbage
fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    let Some(raw) = value else {
        return default;
    };
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.track_capacity, 8);
        assert_eq!(cfg.throttle_interval, Duration::from_millis(5000));
        assert_eq!(cfg.pilot_delay, Duration::from_millis(1000));
        assert_eq!(cfg.mesh_max_message, 230);
        assert_eq!(cfg.mesh_format, MeshFormat::Text);
        assert_eq!(cfg.eviction, EvictionPolicy::FirstSlot);
        assert_eq!(cfg.output_poll, Duration::from_millis(10));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(60));
        assert!(cfg.mesh_output.is_none());
        assert!(cfg.wifi_capture_cmd.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("TRACK_CAPACITY", "16"),
            ("THROTTLE_INTERVAL_MS", "2500"),
            ("MESH_FORMAT", "json"),
            ("MESH_OUTPUT", "/dev/ttyUSB0"),
            ("EVICTION", "least-recent"),
            ("BLE_SCAN_CMD", "ble-scan --hci 0"),
        ]);
        assert_eq!(cfg.track_capacity, 16);
        assert_eq!(cfg.throttle_interval, Duration::from_millis(2500));
        assert_eq!(cfg.mesh_format, MeshFormat::Json);
        assert_eq!(cfg.mesh_output, Some(PathBuf::from("/dev/ttyUSB0")));
        assert_eq!(cfg.eviction, EvictionPolicy::LeastRecent);
        assert_eq!(cfg.ble_scan_cmd.as_deref(), Some("ble-scan --hci 0"));
        assert_eq!(cfg.throttle().interval, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            ("TRACK_CAPACITY", "0"),
            ("PILOT_DELAY_MS", "soon"),
            ("MESH_FORMAT", "xml"),
            ("WIFI_CAPTURE_CMD", "   "),
        ]);
        assert_eq!(cfg.track_capacity, 8);
        assert_eq!(cfg.pilot_delay, Duration::from_millis(1000));
        assert_eq!(cfg.mesh_format, MeshFormat::Text);
        assert!(cfg.wifi_capture_cmd.is_none());
    }
}
