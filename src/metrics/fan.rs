//! Fan speed resolution with an explicit ordered fallback chain.
//!
//! Two raw sources exist: hwmon RPM readings and the NVIDIA utility's
//! fan duty percentage (converted to RPM via a configured maximum).
//! The chain is policy over already-collected readings, so
//! [`resolve_fan_rpm`] is a pure function that tests exercise without
//! any hardware.

use clap::ValueEnum;

use super::{cpu::hwmon_dirs, read_to_string_lossy, run_command};

/// RPM sentinel telling the panel the fan speed is unknown.
pub const FAN_UNKNOWN: i64 = -1;

/// Which raw source a resolved fan reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSource {
    /// Direct RPM from a hwmon fan input.
    Hwmon,
    /// Duty percentage from nvidia-smi, scaled to RPM.
    NvidiaUtility,
    /// No source produced a value.
    Unknown,
}

/// Preferred fan source order, from the CLI/env configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FanPreference {
    /// hwmon first, then the NVIDIA utility.
    Auto,
    /// hwmon first.
    Hwmon,
    /// NVIDIA utility first.
    Nvidia,
}

/// Resolve a fan RPM from the available raw readings.
///
/// A hwmon reading of zero counts as "no reading" (fans report 0 while
/// a driver is still settling); an NVIDIA duty of 0% is a valid 0 RPM.
/// When both sources are absent the result is [`FAN_UNKNOWN`].
pub fn resolve_fan_rpm(
    prefer: FanPreference,
    hwmon_rpm: Option<u32>,
    nvidia_percent: Option<f64>,
    max_rpm: u32,
) -> (i64, FanSource) {
    let hwmon = hwmon_rpm.filter(|&rpm| rpm > 0);
    let nvidia = nvidia_percent.map(|pct| percent_to_rpm(pct, max_rpm));

    let ordered: [(Option<i64>, FanSource); 2] = match prefer {
        FanPreference::Auto | FanPreference::Hwmon => [
            (hwmon.map(i64::from), FanSource::Hwmon),
            (nvidia, FanSource::NvidiaUtility),
        ],
        FanPreference::Nvidia => [
            (nvidia, FanSource::NvidiaUtility),
            (hwmon.map(i64::from), FanSource::Hwmon),
        ],
    };

    for (value, source) in ordered {
        if let Some(rpm) = value {
            return (rpm, source);
        }
    }
    (FAN_UNKNOWN, FanSource::Unknown)
}

fn percent_to_rpm(percent: f64, max_rpm: u32) -> i64 {
    (percent / 100.0 * f64::from(max_rpm.max(1))).round() as i64
}

/// Highest nonzero RPM across all hwmon fan inputs, if any exist.
pub(super) fn hwmon_fan_rpm() -> Option<u32> {
    let mut best = None;
    for dir in hwmon_dirs() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with("fan") && name.ends_with("_input")) {
                continue;
            }
            let path = entry.path();
            if let Ok(rpm) = read_to_string_lossy(&path.to_string_lossy()).trim().parse::<u32>() {
                if rpm > 0 {
                    best = Some(best.map_or(rpm, |b: u32| b.max(rpm)));
                }
            }
        }
    }
    best
}

/// First GPU's fan duty percentage from nvidia-smi, if present.
pub(super) fn nvidia_fan_percent() -> Option<f64> {
    let out = run_command(
        "nvidia-smi",
        &["--query-gpu=fan.speed", "--format=csv,noheader,nounits"],
    )?;
    out.lines().next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hwmon_zero_falls_back_to_nvidia() {
        // hwmon 0 is "no reading"; 40% of 5000 RPM resolves to 2000.
        let (rpm, source) = resolve_fan_rpm(FanPreference::Auto, Some(0), Some(40.0), 5000);
        assert_eq!(rpm, 2000);
        assert_eq!(source, FanSource::NvidiaUtility);
    }

    #[test]
    fn test_both_sources_absent_yields_sentinel() {
        let (rpm, source) = resolve_fan_rpm(FanPreference::Auto, None, None, 5000);
        assert_eq!(rpm, FAN_UNKNOWN);
        assert_eq!(source, FanSource::Unknown);

        let (rpm, _) = resolve_fan_rpm(FanPreference::Nvidia, Some(0), None, 5000);
        assert_eq!(rpm, FAN_UNKNOWN);
    }

    #[test]
    fn test_hwmon_wins_when_nonzero() {
        let (rpm, source) = resolve_fan_rpm(FanPreference::Auto, Some(1380), Some(40.0), 5000);
        assert_eq!(rpm, 1380);
        assert_eq!(source, FanSource::Hwmon);
    }

    #[test]
    fn test_nvidia_preference_reorders_chain() {
        let (rpm, source) = resolve_fan_rpm(FanPreference::Nvidia, Some(1380), Some(40.0), 5000);
        assert_eq!(rpm, 2000);
        assert_eq!(source, FanSource::NvidiaUtility);
    }

    #[test]
    fn test_nvidia_zero_percent_is_valid_zero_rpm() {
        let (rpm, source) = resolve_fan_rpm(FanPreference::Nvidia, None, Some(0.0), 5000);
        assert_eq!(rpm, 0);
        assert_eq!(source, FanSource::NvidiaUtility);
    }

    #[test]
    fn test_percent_scaling_rounds() {
        assert_eq!(percent_to_rpm(33.3, 5000), 1665);
        assert_eq!(percent_to_rpm(100.0, 5000), 5000);
        // A zero max scale never divides by zero.
        assert_eq!(percent_to_rpm(50.0, 0), 1);
    }
}
