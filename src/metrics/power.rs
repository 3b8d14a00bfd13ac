//! Volume and battery collectors.

use super::{read_to_string_lossy, run_command, BatterySnapshot, VolumeSnapshot};

/// Default sink volume via pactl; None when no mixer responds.
pub(super) fn sample_volume() -> VolumeSnapshot {
    VolumeSnapshot {
        percent: pactl_volume_percent(),
    }
}

fn pactl_volume_percent() -> Option<u8> {
    let out = run_command("pactl", &["get-sink-volume", "@DEFAULT_SINK@"])?;
    parse_volume_percent(&out)
}

/// First "<n>%" token in the pactl output.
fn parse_volume_percent(out: &str) -> Option<u8> {
    for token in out.split_whitespace() {
        if let Some(num) = token.strip_suffix('%') {
            if let Ok(pct) = num.parse::<u16>() {
                // Sinks can sit above 100%; the tile caps there.
                return Some(pct.min(100) as u8);
            }
        }
    }
    None
}

/// Battery charge from the first BAT* power supply; None on desktops.
pub(super) fn sample_battery() -> BatterySnapshot {
    BatterySnapshot {
        percent: battery_percent(),
    }
}

fn battery_percent() -> Option<u8> {
    let entries = std::fs::read_dir("/sys/class/power_supply").ok()?;
    let mut names: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("BAT"))
                .unwrap_or(false)
        })
        .collect();
    names.sort();

    for path in names {
        let capacity = read_to_string_lossy(&path.join("capacity").to_string_lossy());
        if let Ok(pct) = capacity.trim().parse::<u8>() {
            return Some(pct.min(100));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_percent() {
        let out = "Volume: front-left: 22938 /  35% / -27.37 dB,   front-right: 22938 /  35% / -27.37 dB";
        assert_eq!(parse_volume_percent(out), Some(35));
    }

    #[test]
    fn test_parse_volume_caps_at_100() {
        assert_eq!(parse_volume_percent("Volume: 153%"), Some(100));
    }

    #[test]
    fn test_parse_volume_absent() {
        assert_eq!(parse_volume_percent("No default sink"), None);
    }
}
