//! Frame codec for the AtomMan panel protocol.
//!
//! The panel speaks a small framed request/reply protocol: it
//! periodically sends a fixed 7-byte poll frame and the host answers
//! with per-tile reply frames carrying ASCII payloads.

mod poll_buffer;
pub mod wire_format;

pub use poll_buffer::PollBuffer;
pub use wire_format::{
    build_poll, decode_poll, encode_reply, Decode, PollFrame, FRAME_START, FRAME_TRAILER,
    MAX_PAYLOAD_LEN, POLL_FRAME_LEN, POLL_ROLE, REPLY_OVERHEAD,
};
