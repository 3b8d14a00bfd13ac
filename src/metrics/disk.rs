//! Disk collectors: root filesystem usage via df, NVMe model label.

use super::{read_to_string_lossy, run_command, DiskSnapshot};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub(super) fn sample(label: String) -> DiskSnapshot {
    let (used_b, total_b) = root_fs_bytes().unwrap_or((0, 0));
    let usage_pct = if total_b == 0 {
        0
    } else {
        (100.0 * used_b as f64 / total_b as f64).round() as u8
    };
    DiskSnapshot {
        label,
        used_gb: used_b as f64 / BYTES_PER_GB,
        total_gb: total_b as f64 / BYTES_PER_GB,
        usage_pct,
    }
}

/// (used, total) bytes for the root filesystem.
fn root_fs_bytes() -> Option<(u64, u64)> {
    let out = run_command("df", &["-B1", "--output=used,size", "/"])?;
    parse_df_output(&out)
}

fn parse_df_output(out: &str) -> Option<(u64, u64)> {
    // Header line, then one data line: "<used> <size>".
    let line = out.lines().nth(1)?;
    let mut fields = line.split_whitespace();
    let used = fields.next()?.parse().ok()?;
    let total = fields.next()?.parse().ok()?;
    Some((used, total))
}

/// Disk model label: first NVMe controller model, lsblk fallback,
/// "Disk" when nothing answers.
pub(super) fn disk_label() -> String {
    if let Ok(entries) = std::fs::read_dir("/sys/class/nvme") {
        let mut names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        names.sort();
        for path in names {
            let model = read_to_string_lossy(&path.join("model").to_string_lossy());
            let model = model.trim();
            if !model.is_empty() {
                return collapse_whitespace(model);
            }
        }
    }

    if let Some(out) = run_command("lsblk", &["-dno", "NAME,MODEL"]) {
        for line in out.lines() {
            if let Some((_, model)) = line.trim().split_once(char::is_whitespace) {
                let model = model.trim();
                if !model.is_empty() {
                    return collapse_whitespace(model);
                }
            }
        }
    }

    "Disk".to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
