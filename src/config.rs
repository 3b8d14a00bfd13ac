//! CLI and environment configuration.
//!
//! Every knob has an `ATOMTILE_*` environment fallback so the daemon
//! can be configured entirely from a systemd unit or shell profile
//! without touching the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::handshake::HandshakeConfig;
use crate::metrics::FanPreference;
use crate::scheduler::SchedulerConfig;
use crate::transport::SerialConfig;

/// Stable by-id path for the panel's USB CDC-ACM endpoint.
const DEFAULT_PORT: &str = "/dev/serial/by-id/usb-Synwit_USB_Virtual_COM-if00";

/// Keep an AtomMan USB status panel fed with live system telemetry.
#[derive(Debug, Parser)]
#[command(name = "atomtile", version, about)]
pub struct Config {
    /// Serial device path of the panel.
    #[arg(long, env = "ATOMTILE_PORT", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Serial baud rate.
    #[arg(long, env = "ATOMTILE_BAUD", default_value_t = 115_200)]
    pub baud: u32,

    /// Seconds to wait before opening the port, letting the panel
    /// finish enumerating after boot.
    #[arg(long, env = "ATOMTILE_START_DELAY", default_value_t = 3.0)]
    pub start_delay: f64,

    /// Unlock listening windows before degrading.
    #[arg(long, env = "ATOMTILE_UNLOCK_ATTEMPTS", default_value_t = 3)]
    pub unlock_attempts: u32,

    /// Length of one unlock listening window, seconds.
    #[arg(long, env = "ATOMTILE_UNLOCK_WINDOW", default_value_t = 5.0)]
    pub unlock_window: f64,

    /// Gap between tile sends, milliseconds.
    #[arg(long, env = "ATOMTILE_INTER_SEND_MS", default_value_t = 6)]
    pub inter_send_ms: u64,

    /// Target duration of one full tile cycle, seconds.
    #[arg(long, env = "ATOMTILE_REFRESH", default_value_t = 2.0)]
    pub refresh: f64,

    /// Fan reading source preference.
    #[arg(long, env = "ATOMTILE_FAN_PREFER", value_enum, default_value_t = FanPreference::Auto)]
    pub fan_prefer: FanPreference,

    /// Full-scale RPM used to convert an NVIDIA duty percentage.
    #[arg(long, env = "ATOMTILE_FAN_MAX_RPM", default_value_t = 5000)]
    pub fan_max_rpm: u32,

    /// Network interface to meter; picked automatically when unset.
    #[arg(long, env = "ATOMTILE_NET_IFACE")]
    pub net_iface: Option<String>,

    /// JSON weather file maintained by an external fetcher; weather
    /// fields stay blank when unset.
    #[arg(long, env = "ATOMTILE_WEATHER_FILE")]
    pub weather_file: Option<PathBuf>,

    /// Weather file re-read interval, seconds.
    #[arg(long, env = "ATOMTILE_WEATHER_REFRESH", default_value_t = 600)]
    pub weather_refresh: u64,

    /// Enable hardware RTS/CTS flow control.
    #[arg(long, env = "ATOMTILE_RTSCTS")]
    pub rtscts: bool,

    /// Do not assert DTR after opening the port.
    #[arg(long, env = "ATOMTILE_NO_DSRDTR")]
    pub no_dsrdtr: bool,
}

impl Config {
    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud: self.baud,
            rtscts: self.rtscts,
            dsrdtr: !self.no_dsrdtr,
        }
    }

    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            attempts: self.unlock_attempts,
            window: Duration::from_secs_f64(self.unlock_window),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            inter_send: Duration::from_millis(self.inter_send_ms),
            refresh_period: Duration::from_secs_f64(self.refresh),
        }
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_secs_f64(self.start_delay)
    }

    pub fn weather_refresh(&self) -> Duration {
        Duration::from_secs(self.weather_refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["atomtile"]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.handshake().attempts, 3);
        assert_eq!(config.handshake().window, Duration::from_secs(5));
        assert_eq!(config.scheduler().inter_send, Duration::from_millis(6));
        assert_eq!(config.scheduler().refresh_period, Duration::from_secs(2));
        assert_eq!(config.start_delay(), Duration::from_secs(3));
        assert!(config.serial().dsrdtr);
        assert!(!config.serial().rtscts);
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse_from([
            "atomtile",
            "--port",
            "/dev/ttyUSB7",
            "--unlock-attempts",
            "5",
            "--fan-prefer",
            "nvidia",
            "--no-dsrdtr",
        ]);
        assert_eq!(config.port, "/dev/ttyUSB7");
        assert_eq!(config.handshake().attempts, 5);
        assert_eq!(config.fan_prefer, FanPreference::Nvidia);
        assert!(!config.serial().dsrdtr);
    }
}
