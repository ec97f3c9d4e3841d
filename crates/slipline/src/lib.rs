//! SLIP byte-stuffing framing for serial lines and datagram sockets.
//!
//! Frames travel as `FF C0 <escaped payload> C0` over any byte channel: an
//! RS-485 line, a UART, or a UDP socket standing in for one.
//!
//! # Crate Structure
//!
//! - [`transport`]: the byte channel abstraction and its stream and UDP implementations
//! - [`frame`]: encoding, stream reassembly, and incremental encoders and decoders

/// Re-export transport types.
pub mod transport {
    pub use slipline_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use slipline_frame::*;
}
