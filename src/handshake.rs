//! Unlock handshake: the panel stays dark until it sees one reply.
//!
//! After power-up the panel firmware polls the host and ignores tile
//! data until a well-formed reply echoes one of its poll sequence
//! bytes. The handshake listens for a poll across a bounded number of
//! timed windows; the first poll is answered with a CPU tile reply
//! carrying the poll's own sequence byte, which unlocks the panel.
//!
//! When every window elapses without a poll the link degrades instead
//! of failing: some firmware revisions skip polling entirely after a
//! warm reboot, and pushing tile data blindly still drives them. The
//! daemon carries on in [`LinkMode::Degraded`] and keeps streaming.
//!
//! [`UnlockSession`] is the pure state machine (time comes in as
//! arguments, bytes come in as slices); [`run_handshake`] drives it
//! over an async transport.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::{AtomtileError, Result};
use crate::metrics::MetricsSource;
use crate::protocol::{encode_reply, PollBuffer, PollFrame};
use crate::tiles::{payload, KICK_TILE};

/// Handshake timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeConfig {
    /// Number of listening windows before degrading.
    pub attempts: u32,
    /// Length of one listening window.
    pub window: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            window: Duration::from_secs(5),
        }
    }
}

/// Outcome of the handshake; the scheduler runs in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// The panel polled and was answered; it will keep polling.
    Unlocked,
    /// No poll ever arrived; tile data is pushed optimistically.
    Degraded,
}

/// What the session wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// Keep reading until [`UnlockSession::deadline`].
    Pending,
    /// A poll arrived; answer it with a kick reply echoing its seq.
    Unlocked(PollFrame),
    /// All windows elapsed. Emitted exactly once.
    Degraded,
}

/// Pure unlock state machine.
pub struct UnlockSession {
    config: HandshakeConfig,
    attempt: u32,
    deadline: Instant,
    buffer: PollBuffer,
    finished: bool,
}

impl UnlockSession {
    /// Start listening; the first window opens at `now`.
    pub fn start(config: HandshakeConfig, now: Instant) -> Self {
        Self {
            config,
            attempt: 1,
            deadline: now + config.window,
            buffer: PollBuffer::new(),
            finished: false,
        }
    }

    /// 1-based index of the current listening window.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// When the current window closes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Feed bytes read from the transport.
    pub fn on_bytes(&mut self, data: &[u8]) -> SessionStep {
        if self.finished {
            return SessionStep::Pending;
        }
        match self.buffer.push(data).into_iter().next() {
            Some(poll) => {
                self.finished = true;
                SessionStep::Unlocked(poll)
            }
            None => SessionStep::Pending,
        }
    }

    /// The current window's deadline passed.
    pub fn on_deadline(&mut self, now: Instant) -> SessionStep {
        if self.finished {
            return SessionStep::Pending;
        }
        if self.attempt >= self.config.attempts {
            self.finished = true;
            return SessionStep::Degraded;
        }
        self.attempt += 1;
        self.deadline = now + self.config.window;
        SessionStep::Pending
    }
}

/// Run the handshake over an async transport.
///
/// On unlock the kick reply is a CPU tile frame echoing the poll's
/// sequence byte. EOF on the transport is fatal; a missing poll is
/// not.
pub async fn run_handshake<T>(
    transport: &mut T,
    metrics: &mut dyn MetricsSource,
    config: HandshakeConfig,
) -> Result<LinkMode>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = UnlockSession::start(config, Instant::now());
    let mut chunk = [0u8; 256];

    loop {
        let read = tokio::time::timeout_at(session.deadline(), transport.read(&mut chunk));
        let step = match read.await {
            Ok(Ok(0)) => return Err(AtomtileError::TransportClosed),
            Ok(Ok(n)) => session.on_bytes(&chunk[..n]),
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                tracing::debug!(attempt = session.attempt(), "unlock window elapsed");
                session.on_deadline(Instant::now())
            }
        };
        match step {
            SessionStep::Pending => {}
            SessionStep::Unlocked(poll) => {
                let snapshot = metrics.sample(KICK_TILE);
                let frame = encode_reply(KICK_TILE.code(), poll.seq, payload::render(&snapshot).as_bytes())?;
                transport.write_all(&frame).await?;
                transport.flush().await?;
                tracing::info!(seq = poll.seq, "panel unlocked");
                return Ok(LinkMode::Unlocked);
            }
            SessionStep::Degraded => {
                tracing::warn!(
                    attempts = config.attempts,
                    "no poll from panel, continuing in degraded mode"
                );
                return Ok(LinkMode::Degraded);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_poll;

    fn session(now: Instant) -> UnlockSession {
        UnlockSession::start(HandshakeConfig::default(), now)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_in_second_window_unlocks() {
        let t0 = Instant::now();
        let mut s = session(t0);

        // First window elapses in silence.
        assert_eq!(s.on_deadline(t0 + Duration::from_secs(5)), SessionStep::Pending);
        assert_eq!(s.attempt(), 2);

        // Poll at t=7s lands inside window 2.
        let step = s.on_bytes(&build_poll(b'1'));
        assert_eq!(step, SessionStep::Unlocked(PollFrame { seq: b'1' }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_degrades_exactly_once() {
        let t0 = Instant::now();
        let mut s = session(t0);

        assert_eq!(s.on_deadline(t0 + Duration::from_secs(5)), SessionStep::Pending);
        assert_eq!(s.on_deadline(t0 + Duration::from_secs(10)), SessionStep::Pending);
        assert_eq!(s.on_deadline(t0 + Duration::from_secs(15)), SessionStep::Degraded);
        // Further deadlines stay quiet.
        assert_eq!(s.on_deadline(t0 + Duration::from_secs(20)), SessionStep::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_garbage_then_poll_unlocks() {
        let mut s = session(Instant::now());
        assert_eq!(s.on_bytes(&[0x00, 0xFF, 0x13]), SessionStep::Pending);

        let mut bytes = vec![0x42];
        bytes.extend_from_slice(&build_poll(b'3'));
        assert_eq!(s.on_bytes(&bytes), SessionStep::Unlocked(PollFrame { seq: b'3' }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_poll_across_reads() {
        let mut s = session(Instant::now());
        let poll = build_poll(b'2');
        assert_eq!(s.on_bytes(&poll[..4]), SessionStep::Pending);
        assert_eq!(s.on_bytes(&poll[4..]), SessionStep::Unlocked(PollFrame { seq: b'2' }));
    }
}
