use bytes::{BufMut, Bytes, BytesMut};

use crate::decoder::Decoder;
use crate::error::{FrameError, Result};
use crate::escape::{escape_byte, escaped_len};
use crate::marker::{BUF_SIZE, END, PREAMBLE};

/// Bytes a frame adds around its payload: preamble (2) + closing END (1).
pub const FRAMING_OVERHEAD: usize = PREAMBLE.len() + 1;

/// Largest payload guaranteed to fit a buffer of `capacity` bytes whatever
/// its contents (every byte escaped).
pub const fn max_payload_for(capacity: usize) -> usize {
    capacity.saturating_sub(FRAMING_OVERHEAD + 1) / 2
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame payload, unescaped.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame once encoded.
    pub fn wire_size(&self) -> usize {
        encoded_len(&self.payload)
    }
}

/// Wire size of `payload` once framed: preamble, escaped payload, closing END.
pub fn encoded_len(payload: &[u8]) -> usize {
    FRAMING_OVERHEAD + escaped_len(payload)
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬──────┬──────────────────────────┬──────┐
/// │ FLUSH │ END  │ escaped payload          │ END  │
/// │ 0xFF  │ 0xC0 │ C0 -> DB DC, DB -> DB DD │ 0xC0 │
/// └───────┴──────┴──────────────────────────┴──────┘
/// ```
///
/// Fails with [`FrameError::BufferOverflow`] if the encoded frame would be
/// longer than `capacity`; `dst` is left untouched in that case.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut, capacity: usize) -> Result<()> {
    let total = encoded_len(payload);
    if total > capacity {
        return Err(FrameError::BufferOverflow {
            size: total,
            max: capacity,
        });
    }

    dst.reserve(total);
    dst.put_slice(&PREAMBLE);
    for byte in payload {
        dst.put_slice(escape_byte(*byte).as_slice());
    }
    dst.put_u8(END);
    Ok(())
}

/// Split a complete wire buffer into the frames it contains.
///
/// Bytes after the last END are an unfinished frame and are ignored.
/// Stops at the first framing error.
pub fn decode_frames(wire: &[u8]) -> Result<Vec<Frame>> {
    decode_frames_with_capacity(wire, BUF_SIZE)
}

/// [`decode_frames`] with an explicit per-frame capacity.
pub fn decode_frames_with_capacity(wire: &[u8], capacity: usize) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    let mut decoder = Decoder::with_capacity(capacity, |frame: &[u8]| {
        frames.push(Frame::new(Bytes::copy_from_slice(frame)));
    });
    for byte in wire {
        decoder.feed(*byte)?;
    }
    drop(decoder);
    Ok(frames)
}

/// Configuration for framing buffers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Capacity of each frame buffer in bytes. Default: [`BUF_SIZE`].
    pub capacity: usize,
    /// Bytes requested from the channel per read. Default: [`BUF_SIZE`].
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            capacity: BUF_SIZE,
            read_chunk_size: BUF_SIZE,
        }
    }
}
