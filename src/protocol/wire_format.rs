//! Wire format encoding and decoding.
//!
//! Two frame shapes travel over the serial link:
//!
//! ```text
//! Poll  (device→host, 7 bytes):
//! ┌──────┬──────┬───────────┬─────────────┐
//! │ 0xAA │ 0x05 │ SEQ ASCII │ CC 33 C3 3C │
//! └──────┴──────┴───────────┴─────────────┘
//!
//! Reply (host→device):
//! ┌──────┬────────┬──────┬───────────┬───────────────┬─────────────┐
//! │ 0xAA │ TileID │ 0x00 │ SEQ ASCII │ ASCII payload │ CC 33 C3 3C │
//! └──────┴────────┴──────┴───────────┴───────────────┴─────────────┘
//! ```
//!
//! Polls carry no payload; reply length is fully determined by the
//! payload length.

use crate::error::{AtomtileError, Result};

/// Start marker for every frame in either direction.
pub const FRAME_START: u8 = 0xAA;

/// Role byte identifying a poll frame (second byte, device→host only).
pub const POLL_ROLE: u8 = 0x05;

/// Fixed 4-byte end marker shared by polls and replies.
pub const FRAME_TRAILER: [u8; 4] = [0xCC, 0x33, 0xC3, 0x3C];

/// Total poll frame length (fixed, exactly 7).
pub const POLL_FRAME_LEN: usize = 7;

/// Reply frame bytes besides the payload (start + tile + reserved + seq + trailer).
pub const REPLY_OVERHEAD: usize = 4 + FRAME_TRAILER.len();

/// Maximum reply payload length the transport is expected to carry.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// A decoded poll frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFrame {
    /// Sequence byte carried by the poll. Normally an ASCII digit, but
    /// the panel firmware occasionally places a tile identifier here
    /// after boot, so any value is accepted verbatim.
    pub seq: u8,
}

/// Outcome of attempting to decode a poll frame at a start marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// A complete, well-formed poll frame.
    Poll(PollFrame),
    /// The bytes so far are a valid poll prefix; read more and retry.
    NeedMoreData,
    /// The start marker is not followed by a poll frame; the caller
    /// must discard it and resynchronize at the next start marker.
    Malformed,
}

/// Encode a reply frame for one tile.
///
/// # Errors
///
/// Returns [`AtomtileError::InvalidPayload`] if the payload contains
/// non-printable-ASCII bytes or exceeds [`MAX_PAYLOAD_LEN`]. The
/// payload is never truncated.
///
/// # Example
///
/// ```
/// use atomtile::protocol::encode_reply;
///
/// let frame = encode_reply(0x53, b'2', b"{CPU:demo}").unwrap();
/// assert_eq!(&frame[..4], &[0xAA, 0x53, 0x00, b'2']);
/// assert_eq!(&frame[frame.len() - 4..], &[0xCC, 0x33, 0xC3, 0x3C]);
/// ```
pub fn encode_reply(tile_code: u8, seq: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(AtomtileError::InvalidPayload(format!(
            "payload length {} exceeds maximum {}",
            payload.len(),
            MAX_PAYLOAD_LEN
        )));
    }

    if let Some(pos) = payload.iter().position(|b| !(0x20..=0x7E).contains(b)) {
        return Err(AtomtileError::InvalidPayload(format!(
            "non-ASCII byte 0x{:02X} at payload offset {}",
            payload[pos], pos
        )));
    }

    let mut buf = Vec::with_capacity(REPLY_OVERHEAD + payload.len());
    buf.push(FRAME_START);
    buf.push(tile_code);
    buf.push(0x00);
    buf.push(seq);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&FRAME_TRAILER);
    Ok(buf)
}

/// Decode a poll frame from the front of `buf`.
///
/// `buf[0]` must already be positioned on a [`FRAME_START`] byte; the
/// scanning logic that finds start markers lives in
/// [`PollBuffer`](super::PollBuffer). The shape is checked
/// incrementally so a wrong role byte or trailer byte is reported as
/// [`Decode::Malformed`] without waiting for the full 7 bytes.
pub fn decode_poll(buf: &[u8]) -> Decode {
    debug_assert!(buf.first() == Some(&FRAME_START));

    if buf.len() >= 2 && buf[1] != POLL_ROLE {
        return Decode::Malformed;
    }

    // Trailer bytes start at offset 3; the sequence byte at offset 2
    // is accepted verbatim.
    let end = buf.len().min(POLL_FRAME_LEN);
    for i in 3..end {
        if buf[i] != FRAME_TRAILER[i - 3] {
            return Decode::Malformed;
        }
    }

    if buf.len() < POLL_FRAME_LEN {
        return Decode::NeedMoreData;
    }

    Decode::Poll(PollFrame { seq: buf[2] })
}

/// Build a well-formed poll frame (used by tests and simulators).
pub fn build_poll(seq: u8) -> [u8; POLL_FRAME_LEN] {
    [
        FRAME_START,
        POLL_ROLE,
        seq,
        FRAME_TRAILER[0],
        FRAME_TRAILER[1],
        FRAME_TRAILER[2],
        FRAME_TRAILER[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_reply_layout() {
        let frame = encode_reply(0x36, b'3', b"{GPU:x;Tempr:41;Useage:7}").unwrap();

        assert_eq!(frame[0], FRAME_START);
        assert_eq!(frame[1], 0x36);
        assert_eq!(frame[2], 0x00);
        assert_eq!(frame[3], b'3');
        assert_eq!(&frame[4..frame.len() - 4], b"{GPU:x;Tempr:41;Useage:7}");
        assert_eq!(&frame[frame.len() - 4..], &FRAME_TRAILER);
        assert_eq!(frame.len(), REPLY_OVERHEAD + 25);
    }

    #[test]
    fn test_encode_reply_empty_payload() {
        let frame = encode_reply(0x10, b'9', b"").unwrap();
        assert_eq!(frame.len(), REPLY_OVERHEAD);
    }

    #[test]
    fn test_encode_rejects_non_ascii() {
        let result = encode_reply(0x53, b'2', b"ok\x80bad");
        assert!(matches!(result, Err(AtomtileError::InvalidPayload(_))));

        // Control characters are not printable ASCII either.
        let result = encode_reply(0x53, b'2', b"line\nbreak");
        assert!(matches!(result, Err(AtomtileError::InvalidPayload(_))));
    }

    #[test]
    fn test_encode_rejects_oversize_without_truncating() {
        let payload = vec![b'a'; MAX_PAYLOAD_LEN + 1];
        let result = encode_reply(0x53, b'2', &payload);
        assert!(matches!(result, Err(AtomtileError::InvalidPayload(_))));

        let payload = vec![b'a'; MAX_PAYLOAD_LEN];
        let frame = encode_reply(0x53, b'2', &payload).unwrap();
        assert_eq!(frame.len(), REPLY_OVERHEAD + MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_decode_complete_poll() {
        let bytes = build_poll(b'7');
        assert_eq!(decode_poll(&bytes), Decode::Poll(PollFrame { seq: b'7' }));
    }

    #[test]
    fn test_decode_needs_more_data_on_valid_prefix() {
        let bytes = build_poll(b'2');
        for n in 1..POLL_FRAME_LEN {
            assert_eq!(
                decode_poll(&bytes[..n]),
                Decode::NeedMoreData,
                "prefix of {} bytes",
                n
            );
        }
    }

    #[test]
    fn test_decode_malformed_wrong_role() {
        // 0xAA followed by a non-poll role byte.
        assert_eq!(decode_poll(&[0xAA, 0x53]), Decode::Malformed);
    }

    #[test]
    fn test_decode_malformed_bad_trailer_detected_early() {
        // Wrong first trailer byte is enough; no need for all 7 bytes.
        assert_eq!(decode_poll(&[0xAA, 0x05, b'2', 0x00]), Decode::Malformed);
    }

    #[test]
    fn test_decode_accepts_non_digit_seq() {
        // After boot the panel may place a tile id in the seq slot.
        let mut bytes = build_poll(0x53);
        bytes[2] = 0x53;
        assert_eq!(decode_poll(&bytes), Decode::Poll(PollFrame { seq: 0x53 }));
    }
}
