//! GPU collectors: nvidia-smi first, then rocm-smi for AMD, then DRM
//! sysfs with an lspci name lookup as the last resort.

use super::{read_to_string_lossy, run_command, GpuSnapshot};

pub(super) fn sample() -> GpuSnapshot {
    nvidia_info()
        .or_else(rocm_info)
        .or_else(drm_info)
        .unwrap_or(GpuSnapshot {
            name: "GPU".to_string(),
            temp_c: 0,
            usage_pct: 0,
        })
}

fn nvidia_info() -> Option<GpuSnapshot> {
    let out = run_command(
        "nvidia-smi",
        &[
            "--query-gpu=name,temperature.gpu,utilization.gpu",
            "--format=csv,noheader,nounits",
        ],
    )?;
    let line = out.lines().next()?;
    let mut fields = line.split(',').map(str::trim);
    let name = fields.next()?;
    let temp_c: i64 = fields.next()?.parse().ok()?;
    let usage_pct: u8 = fields.next()?.parse().ok()?;
    Some(GpuSnapshot {
        name: clean_gpu_name(name),
        temp_c,
        usage_pct,
    })
}

fn rocm_info() -> Option<GpuSnapshot> {
    let out = run_command("rocm-smi", &["--showtemp", "--showuse"])?;
    Some(GpuSnapshot {
        name: clean_gpu_name(&parse_rocm_name(&out)),
        temp_c: parse_rocm_temp(&out).unwrap_or(0),
        usage_pct: parse_rocm_use(&out).unwrap_or(0),
    })
}

/// First number followed (after optional spaces) by a `c`/`C`, as
/// rocm-smi prints temperatures.
fn parse_rocm_temp(out: &str) -> Option<i64> {
    let bytes = out.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        let mut j = i;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        if j < bytes.len() && bytes[j].eq_ignore_ascii_case(&b'c') {
            if let Ok(v) = out[start..i].parse::<f64>() {
                return Some(v as i64);
            }
        }
    }
    None
}

/// First integer followed (after optional spaces) by a `%`.
fn parse_rocm_use(out: &str) -> Option<u8> {
    let bytes = out.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let mut j = i;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'%' {
            if let Ok(v) = out[start..i].parse::<u16>() {
                return Some(v.min(100) as u8);
            }
        }
    }
    None
}

/// Card name from a `GPU[n]` line: the text after the bracket and
/// field separator, ending at a run of two or more spaces.
fn parse_rocm_name(out: &str) -> String {
    for line in out.lines() {
        let Some(rest) = line.trim_start().strip_prefix("GPU[") else {
            continue;
        };
        let Some((_, after)) = rest.split_once(']') else {
            continue;
        };
        let after = after.trim_start_matches([':', ' ', '\t']);
        let name = match after.find("  ") {
            Some(pos) => after[..pos].trim(),
            None => after.trim(),
        };
        if !name.is_empty() {
            return name.to_string();
        }
    }
    "AMD Radeon".to_string()
}

fn drm_info() -> Option<GpuSnapshot> {
    let mut name = String::new();
    for path in [
        "/sys/class/drm/card0/device/product_name",
        "/sys/class/drm/card0/device/name",
    ] {
        let value = read_to_string_lossy(path);
        let value = value.trim();
        if !value.is_empty() {
            name = value.to_string();
            break;
        }
    }
    if name.is_empty() {
        if let Some(vga) = lspci_vga_name() {
            name = vga;
        }
    }
    if name.is_empty() {
        return None;
    }

    let mut temp_c = 0;
    if let Ok(entries) = std::fs::read_dir("/sys/class/drm/card0/device/hwmon") {
        'outer: for entry in entries.filter_map(|e| e.ok()) {
            for n in 1..4 {
                let path = entry.path().join(format!("temp{n}_input"));
                if let Ok(v) = read_to_string_lossy(&path.to_string_lossy()).trim().parse::<i64>()
                {
                    temp_c = v / 1000;
                    break 'outer;
                }
            }
        }
    }

    // DRM sysfs has no portable utilization counter.
    Some(GpuSnapshot {
        name: clean_gpu_name(&name),
        temp_c,
        usage_pct: 0,
    })
}

fn lspci_vga_name() -> Option<String> {
    let out = run_command("lspci", &["-mmnn"])?;
    parse_lspci_vga(&out)
}

/// First quoted field following the VGA class field in `lspci -mmnn`
/// output.
fn parse_lspci_vga(out: &str) -> Option<String> {
    const CLASS: &str = "VGA compatible controller [0300]";
    for line in out.lines() {
        let Some(idx) = line.find(CLASS) else {
            continue;
        };
        let rest = &line[idx + CLASS.len()..];
        // rest: `" "Vendor name [id]" "Device name [id]" ...`
        let mut fields = rest.split('"');
        fields.next();
        fields.next();
        if let Some(name) = fields.next() {
            let name = name.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Strip vendor boilerplate from a GPU product string.
fn clean_gpu_name(name: &str) -> String {
    let mut s = name.to_string();
    for noise in [
        "(R)",
        "(TM)",
        "NVIDIA Corporation",
        "Advanced Micro Devices, Inc.",
        "Advanced Micro Devices Inc.",
        "Intel(R)",
        "Intel",
    ] {
        s = s.replace(noise, " ");
    }
    let cleaned = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        "GPU".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_gpu_name() {
        assert_eq!(
            clean_gpu_name("NVIDIA Corporation GeForce RTX 4060"),
            "GeForce RTX 4060"
        );
        assert_eq!(clean_gpu_name("Intel(R) Iris(R) Xe Graphics"), "Iris Xe Graphics");
        assert_eq!(clean_gpu_name("  "), "GPU");
    }

    #[test]
    fn test_parse_rocm_temp() {
        assert_eq!(parse_rocm_temp("GPU[0] : Temperature: 64.0c"), Some(64));
        assert_eq!(parse_rocm_temp("Temperature (edge): 48 C"), Some(48));
        assert_eq!(parse_rocm_temp("GPU use: 12"), None);
        assert_eq!(parse_rocm_temp(""), None);
    }

    #[test]
    fn test_parse_rocm_use() {
        assert_eq!(parse_rocm_use("GPU[0] : GPU use (%): 37 %"), Some(37));
        assert_eq!(parse_rocm_use("GPU use: 7%"), Some(7));
        assert_eq!(parse_rocm_use("Temperature: 64.0c"), None);
    }

    #[test]
    fn test_parse_rocm_name() {
        let out = "========  ROCm SMI  ========\nGPU[0] : Radeon RX 7800 XT    64.0c  37%\n";
        assert_eq!(parse_rocm_name(out), "Radeon RX 7800 XT");
        assert_eq!(parse_rocm_name("no gpu lines here"), "AMD Radeon");
    }

    #[test]
    fn test_parse_lspci_vga() {
        let out = concat!(
            "00:1f.3 \"Audio device [0403]\" \"Intel Corporation [8086]\" \"Device [7a50]\"\n",
            "03:00.0 \"VGA compatible controller [0300]\" ",
            "\"Advanced Micro Devices, Inc. [AMD/ATI] [1002]\" \"Navi 32 [7800 XT] [747e]\"\n",
        );
        assert_eq!(
            parse_lspci_vga(out),
            Some("Advanced Micro Devices, Inc. [AMD/ATI] [1002]".to_string())
        );
        assert_eq!(
            parse_lspci_vga("02:00.0 \"Ethernet controller [0200]\" \"Realtek [10ec]\""),
            None
        );
    }
}
