//! Daemon orchestration: wire configuration, transport, metrics,
//! weather, handshake and scheduler together.

use tokio::sync::watch;

use crate::config::Config;
use crate::error::Result;
use crate::handshake;
use crate::metrics::SystemMetrics;
use crate::scheduler;
use crate::transport;
use crate::weather::{self, WeatherFile};

/// How many refresh intervals a weather file may go unwritten before
/// it is considered stale.
const WEATHER_MAX_AGE_INTERVALS: u32 = 3;

/// Run the daemon until the transport fails or the task is cancelled.
///
/// A serial open failure is immediate and fatal; so is any mid-cycle
/// write failure or EOF. The supervisor (systemd or similar) owns the
/// restart policy.
pub async fn run(config: Config) -> Result<()> {
    // Give the panel time to enumerate after a cold boot.
    tokio::time::sleep(config.start_delay()).await;

    let mut transport = transport::open_serial(&config.serial())?;

    let mut weather_rx = match &config.weather_file {
        Some(path) => {
            let max_age = config.weather_refresh() * WEATHER_MAX_AGE_INTERVALS;
            let provider = WeatherFile::new(path.clone(), max_age);
            weather::spawn_weather_task(provider, config.weather_refresh())
        }
        // No file configured: a receiver that permanently holds None.
        None => watch::channel(None).1,
    };

    let mut metrics = SystemMetrics::new(
        config.net_iface.clone(),
        config.fan_prefer,
        config.fan_max_rpm,
    );

    let mode = handshake::run_handshake(&mut transport, &mut metrics, config.handshake()).await?;
    tracing::info!(?mode, "entering tile cycle");

    scheduler::run_cycle_loop(
        &mut transport,
        &mut metrics,
        &mut weather_rx,
        config.scheduler(),
        mode,
    )
    .await
}
