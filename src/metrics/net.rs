//! Network throughput meter with a smart interface picker.
//!
//! Candidate interfaces are ranked: interfaces carrying the default
//! route first, then anything that is up, with wired preferred over
//! wireless. The picked interface is re-evaluated whenever it goes
//! down so a laptop hopping between Ethernet and Wi-Fi keeps
//! reporting. Rates come from deltas over the sysfs byte counters.

use std::time::Instant;

use super::read_to_string_lossy;

/// Byte-counter rate meter over one network interface.
pub struct NetMeter {
    /// Explicit interface override from configuration.
    override_iface: Option<String>,
    iface: Option<String>,
    baseline: Option<Baseline>,
}

struct Baseline {
    rx_bytes: u64,
    tx_bytes: u64,
    at: Instant,
}

impl NetMeter {
    /// Create a meter; `override_iface` skips the automatic picker.
    pub fn new(override_iface: Option<String>) -> Self {
        let mut meter = Self {
            override_iface,
            iface: None,
            baseline: None,
        };
        meter.repick();
        meter
    }

    /// Name of the interface currently being measured.
    pub fn iface(&self) -> Option<&str> {
        self.iface.as_deref()
    }

    /// (rx, tx) in bytes per second since the previous call.
    ///
    /// Returns (None, None) until a baseline exists or while no usable
    /// interface is present.
    pub fn rates(&mut self) -> (Option<f64>, Option<f64>) {
        self.maybe_repick();
        let Some(iface) = self.iface.clone() else {
            return (None, None);
        };
        let Some((rx, tx)) = read_counters(&iface) else {
            // Interface vanished; start over next call.
            self.iface = None;
            self.baseline = None;
            return (None, None);
        };

        let now = Instant::now();
        let rates = self.baseline.as_ref().map(|base| {
            let dt = now.duration_since(base.at).as_secs_f64().max(1e-3);
            (
                rx.saturating_sub(base.rx_bytes) as f64 / dt,
                tx.saturating_sub(base.tx_bytes) as f64 / dt,
            )
        });
        self.baseline = Some(Baseline {
            rx_bytes: rx,
            tx_bytes: tx,
            at: now,
        });

        match rates {
            Some((rx, tx)) => (Some(rx), Some(tx)),
            None => (None, None),
        }
    }

    fn maybe_repick(&mut self) {
        match &self.iface {
            None => self.repick(),
            Some(iface) => {
                let info = iface_info(iface);
                if !info.up || (info.wireless && !info.carrier) {
                    self.repick();
                }
            }
        }
    }

    fn repick(&mut self) {
        let picked = match &self.override_iface {
            Some(iface) => Some(iface.clone()),
            None => pick_iface(),
        };
        if picked != self.iface {
            tracing::debug!(iface = ?picked, "network interface selected");
            self.iface = picked;
            self.baseline = None;
        }
    }
}

#[derive(Debug)]
struct IfaceInfo {
    name: String,
    up: bool,
    carrier: bool,
    wireless: bool,
}

impl IfaceInfo {
    fn score(&self) -> u32 {
        let link = if self.up && self.carrier {
            2
        } else if self.up {
            1
        } else {
            0
        };
        link + u32::from(!self.wireless)
    }
}

fn iface_info(name: &str) -> IfaceInfo {
    IfaceInfo {
        name: name.to_string(),
        up: read_to_string_lossy(&format!("/sys/class/net/{name}/operstate")).trim() == "up",
        carrier: read_to_string_lossy(&format!("/sys/class/net/{name}/carrier")).trim() == "1",
        wireless: std::path::Path::new(&format!("/sys/class/net/{name}/wireless")).is_dir(),
    }
}

/// Interfaces carrying a default route, from /proc/net/route
/// (destination 00000000).
fn default_route_ifaces() -> Vec<String> {
    let mut devs = Vec::new();
    for line in read_to_string_lossy("/proc/net/route").lines().skip(1) {
        let mut fields = line.split_whitespace();
        let (Some(iface), Some(dest)) = (fields.next(), fields.next()) else {
            continue;
        };
        if dest == "00000000" && !devs.iter().any(|d| d == iface) {
            devs.push(iface.to_string());
        }
    }
    devs
}

fn candidate_ifaces() -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir("/sys/class/net")
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n != "lo")
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn pick_iface() -> Option<String> {
    for pool in [default_route_ifaces(), candidate_ifaces()] {
        let mut ranked: Vec<IfaceInfo> = pool.iter().map(|n| iface_info(n)).collect();
        ranked.sort_by(|a, b| b.score().cmp(&a.score()).then(a.name.cmp(&b.name)));
        if let Some(best) = ranked.into_iter().find(|i| i.score() > 0) {
            return Some(best.name);
        }
    }
    candidate_ifaces().into_iter().next()
}

fn read_counters(iface: &str) -> Option<(u64, u64)> {
    let rx = read_to_string_lossy(&format!("/sys/class/net/{iface}/statistics/rx_bytes"));
    let tx = read_to_string_lossy(&format!("/sys/class/net/{iface}/statistics/tx_bytes"));
    Some((rx.trim().parse().ok()?, tx.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_prefers_wired_carrier() {
        let wired_up = IfaceInfo {
            name: "enp3s0".into(),
            up: true,
            carrier: true,
            wireless: false,
        };
        let wifi_up = IfaceInfo {
            name: "wlan0".into(),
            up: true,
            carrier: true,
            wireless: true,
        };
        let wired_down = IfaceInfo {
            name: "enp4s0".into(),
            up: false,
            carrier: false,
            wireless: false,
        };
        assert!(wired_up.score() > wifi_up.score());
        assert!(wifi_up.score() > wired_down.score());
    }

    #[test]
    fn test_meter_without_interface_reports_none() {
        let mut meter = NetMeter::new(Some("definitely-not-a-nic-0".to_string()));
        let (rx, tx) = meter.rates();
        assert_eq!(rx, None);
        assert_eq!(tx, None);
    }
}
