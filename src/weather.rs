//! Weather cache feeding the date tile.
//!
//! Weather is the one reading that does not come from the host itself,
//! so it lives behind the [`WeatherProvider`] trait and a background
//! refresh task. The production provider reads a JSON file that an
//! external fetcher (cron job, shell script) keeps up to date; the
//! daemon never talks to a weather API directly.
//!
//! The refresh task publishes through a watch channel. The scheduler
//! clones the latest report into each date snapshot; a missing or
//! stale report renders as blank weather fields, never an error.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tokio::sync::watch;

use crate::error::Result;

/// Panel weather icon codes run 1..=40; anything else is dropped.
const MAX_WEATHER_CODE: u8 = 40;

/// How many refresh intervals a report may survive without a
/// successful re-read before it is withdrawn.
const STALE_INTERVALS: u32 = 3;

/// One weather report, sanitized for the panel payload.
///
/// All text fields are printable ASCII with the payload delimiters
/// stripped, so a report can be spliced into a date payload verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    /// Panel icon code, 1..=40.
    pub code: Option<u8>,
    /// Low temperature, °C.
    pub temp_lo: Option<i32>,
    /// High temperature, °C.
    pub temp_hi: Option<i32>,
    /// Location name.
    pub zone: String,
    /// Short condition text.
    pub desc: String,
}

/// On-disk shape of the weather file, before sanitization.
#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    temp_lo: Option<i32>,
    #[serde(default)]
    temp_hi: Option<i32>,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    desc: String,
}

impl From<RawReport> for WeatherReport {
    fn from(raw: RawReport) -> Self {
        let code = raw
            .code
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| (1..=MAX_WEATHER_CODE).contains(c));
        Self {
            code,
            temp_lo: raw.temp_lo,
            temp_hi: raw.temp_hi,
            zone: sanitize_text(&raw.zone),
            desc: sanitize_text(&raw.desc),
        }
    }
}

/// Keep printable ASCII only and strip the payload delimiters the
/// firmware splits on.
fn sanitize_text(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, ';' | '{' | '}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Source of weather reports for the refresh task.
pub trait WeatherProvider: Send + 'static {
    /// Fetch the current report. `Ok(None)` means "no data right now"
    /// (missing file, stale file); errors are malformed data.
    fn fetch(&self) -> Result<Option<WeatherReport>>;
}

/// Provider reading a JSON weather file maintained by an external
/// fetcher.
///
/// A file whose mtime is older than `max_age` is treated as absent,
/// so a dead fetcher degrades to blank weather instead of freezing
/// yesterday's forecast on the panel.
pub struct WeatherFile {
    path: PathBuf,
    max_age: Duration,
}

impl WeatherFile {
    pub fn new(path: PathBuf, max_age: Duration) -> Self {
        Self { path, max_age }
    }
}

impl WeatherProvider for WeatherFile {
    fn fetch(&self) -> Result<Option<WeatherReport>> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(_) => return Ok(None),
        };
        if let Ok(mtime) = meta.modified() {
            let age = SystemTime::now()
                .duration_since(mtime)
                .unwrap_or(Duration::ZERO);
            if age > self.max_age {
                tracing::debug!(path = %self.path.display(), age_secs = age.as_secs(), "weather file stale");
                return Ok(None);
            }
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let raw: RawReport = serde_json::from_str(&contents)?;
        Ok(Some(raw.into()))
    }
}

/// Spawn the background refresh task.
///
/// The returned receiver always holds the latest report, or `None`
/// before the first successful fetch and after [`STALE_INTERVALS`]
/// consecutive fetches without data.
pub fn spawn_weather_task<P: WeatherProvider>(
    provider: P,
    interval: Duration,
) -> watch::Receiver<Option<WeatherReport>> {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        let mut misses: u32 = 0;
        loop {
            match provider.fetch() {
                Ok(Some(report)) => {
                    misses = 0;
                    if tx.send(Some(report)).is_err() {
                        break;
                    }
                }
                other => {
                    if let Err(err) = other {
                        tracing::warn!(error = %err, "weather fetch failed");
                    }
                    misses = misses.saturating_add(1);
                    if misses >= STALE_INTERVALS && tx.send(None).is_err() {
                        break;
                    }
                }
            }
            tokio::time::sleep(interval).await;
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_delimiters_and_non_ascii() {
        assert_eq!(sanitize_text("Light snow"), "Light snow");
        assert_eq!(sanitize_text("Oslo; {fake}"), "Oslo fake");
        assert_eq!(sanitize_text("Tromsø"), "Troms");
        assert_eq!(sanitize_text("  padded  "), "padded");
    }

    #[test]
    fn test_code_clamped_to_icon_range() {
        let raw = |code| RawReport {
            code,
            temp_lo: None,
            temp_hi: None,
            zone: String::new(),
            desc: String::new(),
        };
        assert_eq!(WeatherReport::from(raw(Some(7))).code, Some(7));
        assert_eq!(WeatherReport::from(raw(Some(40))).code, Some(40));
        assert_eq!(WeatherReport::from(raw(Some(0))).code, None);
        assert_eq!(WeatherReport::from(raw(Some(41))).code, None);
        assert_eq!(WeatherReport::from(raw(Some(-3))).code, None);
        assert_eq!(WeatherReport::from(raw(None)).code, None);
    }

    #[test]
    fn test_raw_report_tolerates_missing_fields() {
        let raw: RawReport = serde_json::from_str(r#"{"code": 12}"#).unwrap();
        let report = WeatherReport::from(raw);
        assert_eq!(report.code, Some(12));
        assert_eq!(report.temp_lo, None);
        assert_eq!(report.zone, "");
    }

    #[test]
    fn test_file_provider_missing_file_is_none() {
        let provider = WeatherFile::new(
            PathBuf::from("/nonexistent/weather.json"),
            Duration::from_secs(600),
        );
        assert_eq!(provider.fetch().unwrap(), None);
    }

    #[test]
    fn test_file_provider_reads_and_sanitizes() {
        let dir = std::env::temp_dir().join("atomtile-weather-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("weather.json");
        std::fs::write(
            &path,
            r#"{"code": 3, "temp_lo": -2, "temp_hi": 5, "zone": "Oslo;", "desc": "Light snow"}"#,
        )
        .unwrap();

        let provider = WeatherFile::new(path.clone(), Duration::from_secs(3600));
        let report = provider.fetch().unwrap().unwrap();
        assert_eq!(report.code, Some(3));
        assert_eq!(report.temp_lo, Some(-2));
        assert_eq!(report.zone, "Oslo");
        assert_eq!(report.desc, "Light snow");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_file_provider_rejects_malformed_json() {
        let dir = std::env::temp_dir().join("atomtile-weather-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let provider = WeatherFile::new(path.clone(), Duration::from_secs(3600));
        assert!(provider.fetch().is_err());

        std::fs::remove_file(path).ok();
    }
}
