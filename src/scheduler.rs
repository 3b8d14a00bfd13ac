//! Steady-state tile scheduler.
//!
//! Once the handshake resolves, the daemon pushes the full tile cycle
//! on a fixed cadence: each tile gets a fresh snapshot, is formatted
//! and framed with its static sequence character, and the gap between
//! sends is spent draining whatever the panel writes back. The panel
//! keeps polling after unlock; those polls carry no request semantics
//! in steady state, so they are decoded and discarded, with the last
//! observed sequence byte kept for diagnostics.
//!
//! The cycle is paced against the refresh period from its start time,
//! so a slow collector eats into the end-of-cycle drain window rather
//! than stretching the period.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{AtomtileError, Result};
use crate::handshake::LinkMode;
use crate::metrics::{MetricsSource, TileSnapshot};
use crate::protocol::{encode_reply, PollBuffer};
use crate::tiles::{payload, TILE_CYCLE};
use crate::weather::WeatherReport;

/// Steady-state pacing knobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Gap between consecutive tile sends, spent draining.
    pub inter_send: Duration,
    /// Target duration of one full cycle.
    pub refresh_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inter_send: Duration::from_millis(6),
            refresh_period: Duration::from_secs(2),
        }
    }
}

/// Running state of the cycle loop, kept for diagnostics.
#[derive(Debug)]
pub struct CycleState {
    /// Mode the handshake resolved to.
    pub mode: LinkMode,
    /// Completed full cycles.
    pub cycles: u64,
    /// Sequence byte of the most recent poll seen in steady state.
    pub last_poll_seq: Option<u8>,
}

impl CycleState {
    pub fn new(mode: LinkMode) -> Self {
        Self {
            mode,
            cycles: 0,
            last_poll_seq: None,
        }
    }
}

/// Drive the tile cycle until the transport fails.
///
/// Returns only with an error: EOF maps to
/// [`AtomtileError::TransportClosed`], write failures propagate as-is.
pub async fn run_cycle_loop<T>(
    transport: &mut T,
    metrics: &mut dyn MetricsSource,
    weather: &mut watch::Receiver<Option<WeatherReport>>,
    config: SchedulerConfig,
    mode: LinkMode,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = CycleState::new(mode);
    let mut buffer = PollBuffer::new();

    loop {
        let cycle_start = Instant::now();
        for def in &TILE_CYCLE {
            let mut snapshot = metrics.sample(def.id);
            if let TileSnapshot::Date(date) = &mut snapshot {
                date.weather = weather.borrow().clone();
            }
            let frame = encode_reply(def.code, def.seq, payload::render(&snapshot).as_bytes())?;
            transport.write_all(&frame).await?;
            transport.flush().await?;
            drain_polls(
                transport,
                &mut buffer,
                &mut state,
                Instant::now() + config.inter_send,
            )
            .await?;
        }
        state.cycles += 1;
        tracing::trace!(
            mode = ?state.mode,
            cycles = state.cycles,
            last_poll_seq = ?state.last_poll_seq,
            "tile cycle complete"
        );
        drain_polls(
            transport,
            &mut buffer,
            &mut state,
            cycle_start + config.refresh_period,
        )
        .await?;
    }
}

/// Read and discard panel bytes until `deadline`.
///
/// Poll frames are decoded through the shared resync policy; anything
/// else falls on the floor. EOF is fatal.
async fn drain_polls<T>(
    transport: &mut T,
    buffer: &mut PollBuffer,
    state: &mut CycleState,
    deadline: Instant,
) -> Result<()>
where
    T: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 256];
    loop {
        match tokio::time::timeout_at(deadline, transport.read(&mut chunk)).await {
            Err(_) => return Ok(()),
            Ok(Ok(0)) => return Err(AtomtileError::TransportClosed),
            Ok(Ok(n)) => {
                for poll in buffer.push(&chunk[..n]) {
                    tracing::trace!(seq = poll.seq, "poll in steady state");
                    state.last_poll_seq = Some(poll.seq);
                }
            }
            Ok(Err(err)) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        BatterySnapshot, CpuSnapshot, DateSnapshot, DiskSnapshot, GpuSnapshot, MemorySnapshot,
        NetworkSnapshot, VolumeSnapshot,
    };
    use crate::tiles::TileId;

    struct StubMetrics;

    impl MetricsSource for StubMetrics {
        fn sample(&mut self, tile: TileId) -> TileSnapshot {
            match tile {
                TileId::Cpu => TileSnapshot::Cpu(CpuSnapshot {
                    model: "Stub CPU".to_string(),
                    temp_c: 50,
                    usage_pct: 10,
                    freq_khz: 2_000_000,
                }),
                TileId::Gpu => TileSnapshot::Gpu(GpuSnapshot {
                    name: "Stub GPU".to_string(),
                    temp_c: 40,
                    usage_pct: 5,
                }),
                TileId::Memory => TileSnapshot::Memory(MemorySnapshot {
                    vendor: None,
                    used_gb: 8.0,
                    available_gb: 24.0,
                    total_gb: 32.0,
                    usage_pct: 25,
                }),
                TileId::Disk => TileSnapshot::Disk(DiskSnapshot {
                    label: "Stub Disk".to_string(),
                    used_gb: 100.0,
                    total_gb: 500.0,
                    usage_pct: 20,
                }),
                TileId::Date => TileSnapshot::Date(DateSnapshot {
                    year: 2024,
                    month: 1,
                    day: 2,
                    hour: 3,
                    minute: 4,
                    second: 5,
                    week_sunday0: 2,
                    weather: None,
                }),
                TileId::Network => TileSnapshot::Network(NetworkSnapshot {
                    fan_rpm: 1200,
                    rx_bytes_per_sec: Some(1024.0),
                    tx_bytes_per_sec: Some(2048.0),
                }),
                TileId::Volume => TileSnapshot::Volume(VolumeSnapshot { percent: Some(40) }),
                TileId::Battery => TileSnapshot::Battery(BatterySnapshot { percent: None }),
            }
        }
    }

    /// Split a byte stream into reply frames on the trailer.
    fn split_frames(mut bytes: &[u8]) -> Vec<Vec<u8>> {
        let trailer = crate::protocol::FRAME_TRAILER;
        let mut frames = Vec::new();
        while let Some(pos) = bytes
            .windows(trailer.len())
            .position(|w| w == trailer)
        {
            frames.push(bytes[..pos + trailer.len()].to_vec());
            bytes = &bytes[pos + trailer.len()..];
        }
        frames
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_cycle_sends_all_tiles_with_static_seqs() {
        let (mut host, mut panel) = tokio::io::duplex(16 * 1024);
        let (_weather_tx, mut weather_rx) = watch::channel(None);

        let driver = tokio::spawn(async move {
            let mut metrics = StubMetrics;
            let _ = run_cycle_loop(
                &mut host,
                &mut metrics,
                &mut weather_rx,
                SchedulerConfig::default(),
                LinkMode::Unlocked,
            )
            .await;
        });

        // Let one full cycle (8 × 6 ms plus drain) elapse.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let mut received = vec![0u8; 16 * 1024];
        let n = panel.read(&mut received).await.unwrap();
        let frames = split_frames(&received[..n]);
        assert!(frames.len() >= 8, "expected a full cycle, got {}", frames.len());

        for (frame, def) in frames.iter().zip(TILE_CYCLE.iter()) {
            assert_eq!(frame[0], 0xAA);
            assert_eq!(frame[1], def.code);
            assert_eq!(frame[2], 0x00);
            assert_eq!(frame[3], def.seq);
        }

        driver.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_in_steady_state_are_drained_not_fatal() {
        let (mut host, mut panel) = tokio::io::duplex(16 * 1024);
        let (_weather_tx, mut weather_rx) = watch::channel(None);

        let driver = tokio::spawn(async move {
            let mut metrics = StubMetrics;
            run_cycle_loop(
                &mut host,
                &mut metrics,
                &mut weather_rx,
                SchedulerConfig::default(),
                LinkMode::Unlocked,
            )
            .await
        });

        panel
            .write_all(&crate::protocol::build_poll(b'5'))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!driver.is_finished());

        // Dropping the panel side ends the loop with TransportClosed.
        let mut sink = vec![0u8; 16 * 1024];
        let _ = panel.read(&mut sink).await;
        drop(panel);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let result = driver.await.unwrap();
        assert!(matches!(result, Err(AtomtileError::TransportClosed) | Err(AtomtileError::Io(_))));
    }
}
