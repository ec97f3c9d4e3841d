//! SLIP byte-stuffing framing over an abstract byte channel.
//!
//! Every frame goes on the wire as:
//! - a FLUSH byte (`0xFF`) followed by END (`0xC0`) to flush line noise
//! - the payload, with END escaped as `DB DC` and ESC as `DB DD`
//! - a closing END
//!
//! There is no length prefix and no checksum; END is the only boundary.
//! [`FrameReader`] and [`FrameWriter`] run the framing over a
//! [`slipline_transport::Channel`], [`Decoder`] and [`Encoder`] work one byte
//! at a time through callbacks, and the `async` feature adds [`SlipCodec`]
//! for `tokio-util`.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod marker;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::SlipCodec;
pub use codec::{
    decode_frames, decode_frames_with_capacity, encode_frame, encoded_len, max_payload_for, Frame,
    FrameConfig, FRAMING_OVERHEAD,
};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{FrameError, Result};
pub use escape::{escape_byte, EscapeState, Step, Unescaper};
pub use marker::{
    is_filler, BUF_SIZE, END, ESC, ESC_END, ESC_ESC, FLUSH, MIN_FRAME_LEN, PREAMBLE,
};
pub use reader::{Decoded, FrameReader};
pub use writer::FrameWriter;
