//! Byte channel abstraction for SLIP framing.
//!
//! The framing layer never opens devices or sockets itself. It reads and
//! writes raw bytes through the [`Channel`] trait defined here:
//! - [`IoChannel`] adapts any `Read + Write` stream (an opened serial device, a pipe)
//! - [`UdpChannel`] uses a datagram socket as a serial-line substitute
//!
//! A read returning zero bytes means "nothing available yet"; timeouts live
//! inside the channel and are never errors.

pub mod channel;
pub mod error;
pub mod udp;

pub use channel::{Channel, HexDump, IoChannel};
pub use error::{Result, TransportError};
pub use udp::{UdpChannel, UdpConfig, DEFAULT_READ_TIMEOUT};
