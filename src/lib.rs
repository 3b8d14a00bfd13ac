//! # atomtile
//!
//! Host-side daemon for the AtomMan USB status panel.
//!
//! The panel enumerates as a USB CDC-ACM serial device and renders a
//! grid of telemetry tiles (CPU, GPU, memory, disk, date/weather,
//! network, volume, battery). This crate keeps those tiles current:
//! it unlocks the panel with a framed handshake, then streams one
//! formatted reply frame per tile on a fixed cycle.
//!
//! ## Architecture
//!
//! - **Wire layer** ([`protocol`]): poll decoding with byte-level
//!   resync, reply framing, payload validation
//! - **Tile layer** ([`tiles`]): the fixed tile registry and the exact
//!   ASCII payload formats the firmware parses
//! - **Telemetry** ([`metrics`], [`weather`]): Linux collectors behind
//!   the [`metrics::MetricsSource`] trait, weather behind a watch
//!   channel
//! - **Link driver** ([`handshake`], [`scheduler`]): unlock state
//!   machine and the steady-state cycle loop, both generic over any
//!   `AsyncRead + AsyncWrite` transport
//!
//! ## Example
//!
//! ```ignore
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = atomtile::Config::parse();
//!     atomtile::daemon::run(config).await.unwrap();
//! }
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod handshake;
pub mod metrics;
pub mod protocol;
pub mod scheduler;
pub mod tiles;
pub mod transport;
pub mod weather;

pub use config::Config;
pub use error::{AtomtileError, Result};
pub use handshake::LinkMode;
