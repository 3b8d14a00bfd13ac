//! Serial transport to the panel.
//!
//! Everything above this module is generic over `AsyncRead +
//! AsyncWrite`, so tests run the protocol over in-memory duplex pipes
//! and only the daemon entry point touches a real port.

mod serial;

pub use serial::{open_serial, SerialConfig};
