//! Scan buffer for accumulating partial serial reads.
//!
//! Uses `bytes::BytesMut` for buffer management. Serial reads deliver
//! arbitrary byte chunks: a poll frame may arrive split across reads,
//! preceded by line noise, or interleaved with garbage after a
//! desynchronization. `PollBuffer` hides all of that behind a single
//! `push` API that returns every complete poll frame found so far.
//!
//! Resynchronization policy: bytes before a start marker are dropped;
//! a start marker that turns out not to open a poll frame is dropped
//! as a single byte and the scan continues at the next marker, so a
//! real frame beginning inside the garbage is never skipped over.

use bytes::BytesMut;

use super::wire_format::{decode_poll, Decode, PollFrame, FRAME_START, POLL_FRAME_LEN};

/// Buffer for accumulating incoming bytes and extracting poll frames.
#[derive(Debug, Default)]
pub struct PollBuffer {
    /// Accumulated bytes from serial reads.
    buffer: BytesMut,
}

impl PollBuffer {
    /// Create a new, empty poll buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Push data into the buffer and extract all complete poll frames.
    ///
    /// Malformed byte runs are discarded with a trace log; they never
    /// affect frames decoded later. Returns the polls in arrival order
    /// (may be empty while waiting for more data).
    pub fn push(&mut self, data: &[u8]) -> Vec<PollFrame> {
        self.buffer.extend_from_slice(data);

        let mut polls = Vec::new();

        loop {
            // Drop everything before the next start marker.
            match self.buffer.iter().position(|&b| b == FRAME_START) {
                Some(0) => {}
                Some(pos) => {
                    tracing::trace!(discarded = pos, "skipped bytes before start marker");
                    let _ = self.buffer.split_to(pos);
                }
                None => {
                    if !self.buffer.is_empty() {
                        tracing::trace!(
                            discarded = self.buffer.len(),
                            "no start marker in buffered bytes"
                        );
                    }
                    self.buffer.clear();
                    break;
                }
            }

            match decode_poll(&self.buffer) {
                Decode::Poll(poll) => {
                    let _ = self.buffer.split_to(POLL_FRAME_LEN);
                    polls.push(poll);
                }
                Decode::NeedMoreData => break,
                Decode::Malformed => {
                    // False start marker; drop it and rescan so a real
                    // frame starting inside the run is still found.
                    tracing::trace!("malformed frame at start marker, resynchronizing");
                    let _ = self.buffer.split_to(1);
                }
            }
        }

        polls
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
