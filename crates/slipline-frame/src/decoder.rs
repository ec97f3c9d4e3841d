//! Push-style decoder fed one byte at a time.
//!
//! Suited to byte interrupts and stream adapters: the caller hands over each
//! received byte and completed frames come back through a callback invoked
//! from inside [`Decoder::feed`]. The decoder never touches a channel.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::escape::{EscapeState, Step, Unescaper};
use crate::marker::{BUF_SIZE, END, MIN_FRAME_LEN};

/// Incremental frame decoder.
///
/// `on_frame` receives each complete, unescaped frame of at least
/// [`MIN_FRAME_LEN`] bytes. A framing error discards the frame in progress
/// along with the rest of its bytes: nothing more is collected until the next
/// END, which starts a fresh frame without caller intervention.
pub struct Decoder<F> {
    buf: BytesMut,
    capacity: usize,
    unescaper: Unescaper,
    discarding: bool,
    on_frame: F,
}

impl<F: FnMut(&[u8])> Decoder<F> {
    /// Create a decoder with a [`BUF_SIZE`] frame buffer.
    pub fn new(on_frame: F) -> Self {
        Self::with_capacity(BUF_SIZE, on_frame)
    }

    /// Create a decoder using the capacity from `config`.
    pub fn with_config(config: &FrameConfig, on_frame: F) -> Self {
        Self::with_capacity(config.capacity, on_frame)
    }

    /// Create a decoder whose frames may hold up to `capacity` bytes.
    pub fn with_capacity(capacity: usize, on_frame: F) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            unescaper: Unescaper::new(),
            discarding: false,
            on_frame,
        }
    }

    /// Consume one received byte.
    pub fn feed(&mut self, byte: u8) -> Result<()> {
        if self.discarding {
            if byte == END {
                trace!("resynchronised at END");
                self.discarding = false;
            }
            return Ok(());
        }

        match self.unescaper.step(byte) {
            Step::Boundary => {
                if self.buf.len() >= MIN_FRAME_LEN {
                    (self.on_frame)(&self.buf);
                } else if !self.buf.is_empty() {
                    trace!(len = self.buf.len(), "dropping short segment");
                }
                self.reset();
                Ok(())
            }
            Step::Escape => Ok(()),
            Step::Data(value) => self.push(value),
            Step::Invalid(value) => {
                self.reset();
                // ESC followed by END still closes the broken frame.
                self.discarding = value != END;
                Err(FrameError::UnknownEscapedByte(value))
            }
        }
    }

    /// Feed every byte of `bytes`, continuing past framing errors.
    ///
    /// Returns the errors met along the way, in order.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<FrameError> {
        bytes
            .iter()
            .filter_map(|byte| self.feed(*byte).err())
            .collect()
    }

    /// Drop any partial frame and return to the normal state.
    pub fn reset(&mut self) {
        self.unescaper.reset();
        self.buf.clear();
        self.discarding = false;
    }

    /// Bytes accumulated for the frame in progress.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no frame is in progress.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum frame size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True between an ESC and the byte it escapes.
    pub fn is_escaped(&self) -> bool {
        self.unescaper.state() == EscapeState::Escaped
    }

    /// True while the rest of a broken frame is being skipped.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    fn push(&mut self, value: u8) -> Result<()> {
        if self.buf.len() >= self.capacity {
            let size = self.buf.len() + 1;
            self.reset();
            self.discarding = true;
            return Err(FrameError::BufferOverflow {
                size,
                max: self.capacity,
            });
        }
        self.buf.put_u8(value);
        Ok(())
    }
}

impl<F> std::fmt::Debug for Decoder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("len", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("state", &self.unescaper.state())
            .field("discarding", &self.discarding)
            .finish()
    }
}
