//! Host telemetry snapshots and their Linux collectors.
//!
//! The protocol core consumes metrics through the [`MetricsSource`]
//! trait and the per-tile snapshot types; it never owns or caches a
//! reading beyond the current formatting call. [`SystemMetrics`] is
//! the production implementation reading procfs/sysfs and a couple of
//! external utilities; tests substitute a stub source.
//!
//! A missing source never fails a cycle: each collector degrades its
//! own field to a sentinel or blank value.

mod cpu;
mod disk;
pub mod fan;
mod gpu;
mod memory;
mod net;
mod power;

pub use fan::{resolve_fan_rpm, FanPreference, FanSource};
pub use net::NetMeter;

use crate::tiles::TileId;
use crate::weather::WeatherReport;

/// CPU tile readings.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSnapshot {
    /// CPU model string from /proc/cpuinfo.
    pub model: String,
    /// Package temperature in °C (0 when unknown).
    pub temp_c: i64,
    /// Usage percentage 0..=100.
    pub usage_pct: u8,
    /// Current frequency in kHz, the panel's documented unit.
    pub freq_khz: u64,
}

/// GPU tile readings.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuSnapshot {
    /// Cleaned-up GPU product name.
    pub name: String,
    /// Temperature in °C (0 when unknown).
    pub temp_c: i64,
    /// Utilization percentage 0..=100.
    pub usage_pct: u8,
}

/// Memory tile readings, capacities in gigabytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    /// RAM vendor from DMI, when available.
    pub vendor: Option<String>,
    pub used_gb: f64,
    pub available_gb: f64,
    pub total_gb: f64,
    pub usage_pct: u8,
}

/// Disk tile readings for the root filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskSnapshot {
    /// Disk model label, or "Disk" when unknown.
    pub label: String,
    pub used_gb: f64,
    pub total_gb: f64,
    pub usage_pct: u8,
}

/// Date tile readings: local wall-clock plus the cached weather.
#[derive(Debug, Clone, PartialEq)]
pub struct DateSnapshot {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Weekday 0..=6 with Sunday = 0, the panel's numbering.
    pub week_sunday0: u32,
    /// Most recently cached weather, if any.
    pub weather: Option<WeatherReport>,
}

/// Network tile readings.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSnapshot {
    /// Resolved fan speed in RPM, or -1 when no source is available.
    pub fan_rpm: i64,
    /// Receive rate in bytes per second; None before the meter has a
    /// baseline or when no interface is usable.
    pub rx_bytes_per_sec: Option<f64>,
    /// Transmit rate in bytes per second.
    pub tx_bytes_per_sec: Option<f64>,
}

/// Volume tile reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSnapshot {
    /// Default sink volume percentage; None when no mixer responds.
    pub percent: Option<u8>,
}

/// Battery tile reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatterySnapshot {
    /// Charge percentage; None when the host has no battery.
    pub percent: Option<u8>,
}

/// One tile's worth of telemetry, sampled fresh per send.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSnapshot {
    Cpu(CpuSnapshot),
    Gpu(GpuSnapshot),
    Memory(MemorySnapshot),
    Disk(DiskSnapshot),
    Date(DateSnapshot),
    Network(NetworkSnapshot),
    Volume(VolumeSnapshot),
    Battery(BatterySnapshot),
}

/// Source of per-tile metric snapshots.
///
/// `sample` must not block for longer than a subprocess probe (the
/// scheduler calls it inline between frame sends) and must not fail:
/// unavailable values degrade to their sentinel/blank representation
/// inside the snapshot.
pub trait MetricsSource: Send {
    /// Take a fresh snapshot for one tile.
    fn sample(&mut self, tile: TileId) -> TileSnapshot;
}

/// Production metrics source reading Linux procfs/sysfs and external
/// utilities (nvidia-smi, pactl, df).
pub struct SystemMetrics {
    cpu_usage: cpu::CpuUsageMeter,
    net: NetMeter,
    labels: LabelCache,
    fan_prefer: FanPreference,
    fan_max_rpm: u32,
}

impl SystemMetrics {
    /// Create a metrics source.
    ///
    /// `net_iface` overrides the automatic interface picker;
    /// `fan_prefer`/`fan_max_rpm` configure the fan fallback chain.
    pub fn new(net_iface: Option<String>, fan_prefer: FanPreference, fan_max_rpm: u32) -> Self {
        Self {
            cpu_usage: cpu::CpuUsageMeter::new(),
            net: NetMeter::new(net_iface),
            labels: LabelCache::default(),
            fan_prefer,
            fan_max_rpm,
        }
    }

    fn sample_date(&self) -> DateSnapshot {
        use chrono::{Datelike, Local, Timelike};

        let now = Local::now();
        DateSnapshot {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
            week_sunday0: crate::tiles::payload::week_from_monday0(
                now.weekday().num_days_from_monday(),
            ),
            // Filled in by the scheduler from the weather cache.
            weather: None,
        }
    }

    fn sample_network(&mut self) -> NetworkSnapshot {
        let (rx, tx) = self.net.rates();
        let (rpm, source) = resolve_fan_rpm(
            self.fan_prefer,
            fan::hwmon_fan_rpm(),
            fan::nvidia_fan_percent(),
            self.fan_max_rpm,
        );
        tracing::trace!(rpm, ?source, "fan reading resolved");
        NetworkSnapshot {
            fan_rpm: rpm,
            rx_bytes_per_sec: rx,
            tx_bytes_per_sec: tx,
        }
    }
}

impl MetricsSource for SystemMetrics {
    fn sample(&mut self, tile: TileId) -> TileSnapshot {
        match tile {
            TileId::Cpu => TileSnapshot::Cpu(cpu::sample(&mut self.cpu_usage)),
            TileId::Gpu => TileSnapshot::Gpu(gpu::sample()),
            TileId::Memory => TileSnapshot::Memory(memory::sample(self.labels.ram_vendor())),
            TileId::Disk => TileSnapshot::Disk(disk::sample(self.labels.disk_label())),
            TileId::Date => TileSnapshot::Date(self.sample_date()),
            TileId::Network => TileSnapshot::Network(self.sample_network()),
            TileId::Volume => TileSnapshot::Volume(power::sample_volume()),
            TileId::Battery => TileSnapshot::Battery(power::sample_battery()),
        }
    }
}

/// Hardware label lookups are expensive (dmidecode, lsblk); cache them
/// for an hour like any other static inventory fact.
#[derive(Default)]
struct LabelCache {
    ram_vendor: Option<(Option<String>, std::time::Instant)>,
    disk_label: Option<(String, std::time::Instant)>,
}

const LABEL_TTL: std::time::Duration = std::time::Duration::from_secs(3600);

impl LabelCache {
    fn ram_vendor(&mut self) -> Option<String> {
        let stale = match &self.ram_vendor {
            Some((_, at)) => at.elapsed() > LABEL_TTL,
            None => true,
        };
        if stale {
            self.ram_vendor = Some((memory::ram_vendor(), std::time::Instant::now()));
        }
        self.ram_vendor.as_ref().and_then(|(v, _)| v.clone())
    }

    fn disk_label(&mut self) -> String {
        let stale = match &self.disk_label {
            Some((_, at)) => at.elapsed() > LABEL_TTL,
            None => true,
        };
        if stale {
            self.disk_label = Some((disk::disk_label(), std::time::Instant::now()));
        }
        self.disk_label
            .as_ref()
            .map(|(v, _)| v.clone())
            .unwrap_or_else(|| "Disk".to_string())
    }
}

/// Read a whole file to a string, empty on any error.
pub(crate) fn read_to_string_lossy(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Run an external command, capturing stdout as a string.
///
/// Returns None if the binary is missing or exits unsuccessfully.
pub(crate) fn run_command(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
