//! Per-tile payload formatting.
//!
//! Pure functions converting a metrics snapshot into the exact ASCII
//! payload string the panel firmware parses. Field names, separators
//! and field order are fixed per tile; a payload is a single
//! semicolon/comma-delimited run with no trailing whitespace.
//!
//! Formatting rules:
//! - temperatures/percentages/RPM are integers, no decimal point
//! - fan speed uses `-1` as the "unknown" sentinel; every other
//!   unavailable numeric field renders as an empty string
//! - CPU frequency is kHz (the panel's documented unit)
//! - memory/disk capacities are gigabytes with one decimal place
//! - network rates auto-scale K/s / M/s / G/s on 1024-based thresholds,
//!   independently per direction
//! - weekday is 0..6 with Sunday = 0

use std::fmt::Display;

use crate::metrics::{
    BatterySnapshot, CpuSnapshot, DateSnapshot, DiskSnapshot, GpuSnapshot, MemorySnapshot,
    NetworkSnapshot, TileSnapshot, VolumeSnapshot,
};

/// Render the payload string for one tile snapshot.
pub fn render(snapshot: &TileSnapshot) -> String {
    match snapshot {
        TileSnapshot::Cpu(s) => render_cpu(s),
        TileSnapshot::Gpu(s) => render_gpu(s),
        TileSnapshot::Memory(s) => render_memory(s),
        TileSnapshot::Disk(s) => render_disk(s),
        TileSnapshot::Date(s) => render_date(s),
        TileSnapshot::Network(s) => render_network(s),
        TileSnapshot::Volume(s) => render_volume(s),
        TileSnapshot::Battery(s) => render_battery(s),
    }
}

// The trailing ';' before '}' is part of the firmware's CPU layout.
fn render_cpu(s: &CpuSnapshot) -> String {
    format!(
        "{{CPU:{};Tempr:{};Useage:{};Freq:{};Tempr1:{};}}",
        s.model, s.temp_c, s.usage_pct, s.freq_khz, s.temp_c
    )
}

// No trailing ';' on the GPU tile, unlike CPU.
fn render_gpu(s: &GpuSnapshot) -> String {
    format!("{{GPU:{};Tempr:{};Useage:{}}}", s.name, s.temp_c, s.usage_pct)
}

fn render_memory(s: &MemorySnapshot) -> String {
    let label = match &s.vendor {
        Some(vendor) => format!("Memory ({vendor})"),
        None => "Memory".to_string(),
    };
    format!(
        "{{Memory:{};Used:{:.1};Available:{:.1};Total:{:.1};Useage:{}}}",
        label, s.used_gb, s.available_gb, s.total_gb, s.usage_pct
    )
}

// The firmware renders a temperature slot for the disk tile; no NVMe
// temperature is plumbed, so a fixed nominal value fills it.
fn render_disk(s: &DiskSnapshot) -> String {
    format!(
        "{{DiskName:{};Tempr:33;UsageSpace:{:.1};AllSpace:{:.1};Usage:{}}}",
        s.label, s.used_gb, s.total_gb, s.usage_pct
    )
}

fn render_date(s: &DateSnapshot) -> String {
    let (code, lo, hi, zone, desc) = match &s.weather {
        Some(w) => (
            opt_str(w.code),
            opt_str(w.temp_lo),
            opt_str(w.temp_hi),
            w.zone.clone(),
            w.desc.clone(),
        ),
        None => (String::new(), String::new(), String::new(), String::new(), String::new()),
    };
    format!(
        "{{Date:{:04}/{:02}/{:02};Time:{:02}:{:02}:{:02};Week:{};Weather:{};TemprLo:{},TemprHi:{},Zone:{},Desc:{}}}",
        s.year, s.month, s.day, s.hour, s.minute, s.second, s.week_sunday0, code, lo, hi, zone,
        desc
    )
}

fn render_network(s: &NetworkSnapshot) -> String {
    format!(
        "{{SPEED:{};NETWORK:{},{}}}",
        s.fan_rpm,
        format_rate(s.rx_bytes_per_sec),
        format_rate(s.tx_bytes_per_sec)
    )
}

fn render_volume(s: &VolumeSnapshot) -> String {
    format!("{{VOLUME:{}}}", opt_str(s.percent))
}

fn render_battery(s: &BatterySnapshot) -> String {
    format!("{{Battery:{}}}", opt_str(s.percent))
}

/// Format a throughput value with auto unit scaling.
///
/// Thresholds are binary (1024-based) and the chosen unit is
/// independent per call, so RX and TX in the same frame may scale
/// differently. `None` renders as `N/A`.
pub fn format_rate(bytes_per_sec: Option<f64>) -> String {
    let Some(bytes) = bytes_per_sec else {
        return "N/A".to_string();
    };
    let kbs = bytes / 1024.0;
    if kbs < 1024.0 {
        return format!("{kbs:.1} K/s");
    }
    let mbs = kbs / 1024.0;
    if mbs < 1024.0 {
        return format!("{mbs:.1} M/s");
    }
    format!("{:.1} G/s", mbs / 1024.0)
}

/// Remap a Monday-origin weekday (0 = Monday .. 6 = Sunday) to the
/// panel's Sunday-origin numbering (0 = Sunday .. 6 = Saturday).
pub const fn week_from_monday0(days_from_monday: u32) -> u32 {
    (days_from_monday + 1) % 7
}

fn opt_str<T: Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
