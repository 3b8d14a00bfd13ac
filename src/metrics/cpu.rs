//! CPU collectors: model, usage, frequency, temperature.

use super::{read_to_string_lossy, run_command, CpuSnapshot};

/// Take a CPU snapshot. Missing values degrade to 0 / "Linux CPU".
pub(super) fn sample(usage: &mut CpuUsageMeter) -> CpuSnapshot {
    CpuSnapshot {
        model: cpu_model(),
        temp_c: cpu_temp_c(),
        usage_pct: usage.sample(),
        freq_khz: cpu_freq_khz(),
    }
}

fn cpu_model() -> String {
    for line in read_to_string_lossy("/proc/cpuinfo").lines() {
        if let Some(rest) = line.strip_prefix("model name") {
            if let Some((_, value)) = rest.split_once(':') {
                return value.trim().to_string();
            }
        }
    }
    "Linux CPU".to_string()
}

/// Usage meter over /proc/stat deltas.
///
/// Keeps the previous idle/total counters so each sample measures the
/// interval since the last one, with no sleep inside the sample call.
/// The first sample has no baseline and reports 0.
pub(super) struct CpuUsageMeter {
    prev: Option<(u64, u64)>,
}

impl CpuUsageMeter {
    pub(super) fn new() -> Self {
        Self { prev: None }
    }

    pub(super) fn sample(&mut self) -> u8 {
        let Some((idle, total)) = read_proc_stat() else {
            return 0;
        };
        let pct = match self.prev {
            Some((prev_idle, prev_total)) => {
                usage_from_deltas(idle.saturating_sub(prev_idle), total.saturating_sub(prev_total))
            }
            None => 0,
        };
        self.prev = Some((idle, total));
        pct
    }
}

fn read_proc_stat() -> Option<(u64, u64)> {
    let stat = read_to_string_lossy("/proc/stat");
    let first = stat.lines().next()?;
    let fields: Vec<u64> = first
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    // idle + iowait count as idle time.
    let idle = fields[3] + fields[4];
    let total = fields.iter().sum();
    Some((idle, total))
}

fn usage_from_deltas(idle_delta: u64, total_delta: u64) -> u8 {
    if total_delta == 0 {
        return 0;
    }
    let busy = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    busy.round().clamp(0.0, 100.0) as u8
}

/// Current CPU frequency in kHz, the panel's documented unit.
///
/// cpufreq sysfs already reports kHz; the lscpu fallback reports MHz
/// and is converted with exact decimal-string math.
fn cpu_freq_khz() -> u64 {
    for path in [
        "/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq",
        "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_cur_freq",
    ] {
        if let Ok(khz) = read_to_string_lossy(path).trim().parse::<u64>() {
            return khz;
        }
    }

    if let Some(out) = run_command("lscpu", &[]) {
        for line in out.lines() {
            if let Some(rest) = line.strip_prefix("CPU MHz:") {
                if let Some(khz) = mhz_str_to_khz(rest.trim()) {
                    return khz;
                }
            }
        }
    }
    0
}

/// Convert a decimal MHz string (e.g. "3400.000") to kHz exactly.
///
/// MHz → kHz is ×1000; the fractional part is scaled digit-by-digit so
/// the result never drifts the way a float multiply could.
pub(crate) fn mhz_str_to_khz(s: &str) -> Option<u64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let whole: u64 = whole.parse().ok()?;

    // Up to three fractional digits are sub-kHz-exact; the rest is
    // below 1 kHz and dropped.
    let mut frac_khz = 0u64;
    let mut scale = 100;
    for c in frac.chars().take(3) {
        let digit = c.to_digit(10)? as u64;
        frac_khz += digit * scale;
        scale /= 10;
    }

    Some(whole.checked_mul(1000)? + frac_khz)
}

fn cpu_temp_c() -> i64 {
    for entry in hwmon_dirs() {
        for n in 0..8 {
            let path = format!("{entry}/temp{n}_input");
            if let Ok(v) = read_to_string_lossy(&path).trim().parse::<i64>() {
                // Millidegrees in most drivers, plain degrees in a few.
                return if v > 1000 { v / 1000 } else { v };
            }
        }
    }
    0
}

/// List /sys/class/hwmon/hwmon* directories.
pub(super) fn hwmon_dirs() -> Vec<String> {
    let mut dirs: Vec<String> = std::fs::read_dir("/sys/class/hwmon")
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.path().to_string_lossy().into_owned())
                .filter(|p| p.rsplit('/').next().is_some_and(|n| n.starts_with("hwmon")))
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}
