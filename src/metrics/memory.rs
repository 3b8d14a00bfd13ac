//! Memory collectors: /proc/meminfo plus a DMI vendor label.

use super::{read_to_string_lossy, run_command, MemorySnapshot};

const KB_PER_GB: f64 = 1024.0 * 1024.0;

pub(super) fn sample(vendor: Option<String>) -> MemorySnapshot {
    let (total_kb, avail_kb) = meminfo_kb();
    let used_kb = total_kb.saturating_sub(avail_kb);
    let usage_pct = if total_kb == 0 {
        0
    } else {
        (100.0 * used_kb as f64 / total_kb as f64).round() as u8
    };
    MemorySnapshot {
        vendor,
        used_gb: used_kb as f64 / KB_PER_GB,
        available_gb: avail_kb as f64 / KB_PER_GB,
        total_gb: total_kb as f64 / KB_PER_GB,
        usage_pct,
    }
}

fn meminfo_kb() -> (u64, u64) {
    let mut total = 0;
    let mut avail = 0;
    for line in read_to_string_lossy("/proc/meminfo").lines() {
        if let Some(v) = meminfo_value(line, "MemTotal:") {
            total = v;
        } else if let Some(v) = meminfo_value(line, "MemAvailable:") {
            avail = v;
        }
    }
    (total, avail)
}

fn meminfo_value(line: &str, key: &str) -> Option<u64> {
    line.strip_prefix(key)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// RAM vendor, normalized; None when nothing useful is found.
///
/// dmidecode usually needs root; lshw answers unprivileged on many
/// systems, so it backs the DMI path up before the field goes blank.
pub(super) fn ram_vendor() -> Option<String> {
    let raw = dmidecode_vendor().or_else(lshw_vendor)?;
    Some(normalize_vendor(&raw))
}

fn dmidecode_vendor() -> Option<String> {
    let out = run_command("dmidecode", &["-t", "memory"])
        .or_else(|| run_command("sudo", &["-n", "dmidecode", "-t", "memory"]))?;
    manufacturer_field(&out, "Manufacturer:")
}

fn lshw_vendor() -> Option<String> {
    let out = run_command("lshw", &["-class", "memory"])?;
    manufacturer_field(&out, "manufacturer:")
}

/// First usable `<key> <value>` line, skipping DMI placeholder values.
fn manufacturer_field(out: &str, key: &str) -> Option<String> {
    for line in out.lines() {
        let Some(value) = line.trim().strip_prefix(key) else {
            continue;
        };
        let value = value.trim();
        if matches!(
            value,
            "" | "Undefined" | "Not Specified" | "Unknown" | "To Be Filled By O.E.M."
        ) {
            continue;
        }
        return Some(value.to_string());
    }
    None
}

fn normalize_vendor(raw: &str) -> String {
    raw.replace("Micron Technology", "Micron")
        .replace("Samsung Electronics", "Samsung")
        .replace("HYNIX", "SK hynix")
        .replace("Hynix", "SK hynix")
        .trim()
        .to_string()
}
