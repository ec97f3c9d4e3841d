use bytes::{BufMut, BytesMut};
use slipline_transport::Channel;
use tracing::{trace, warn};

use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::escape::{Step, Unescaper};
use crate::marker::{is_filler, END};

/// Outcome of a successful [`FrameReader::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Length of the frame written to the output buffer.
    pub len: usize,
    /// Wire bytes read past the frame and kept for the next call.
    pub cached: usize,
}

/// Reassembles frames from a [`Channel`] that delivers bytes in arbitrary
/// chunks.
///
/// Bytes read past the end of a frame are cached and consumed before the
/// channel is touched again. A frame in progress survives "no data" reads
/// and channel errors, so calling again continues the same frame.
///
/// Bytes before the first END of a session are discarded. After a framing
/// error the reader also discards bytes up to the next END, so the tail of a
/// broken frame is never delivered as a frame of its own. Empty segments
/// and the lone FLUSH of a preamble are skipped (see [`is_filler`]); every
/// other segment, one byte long or more, is a frame.
pub struct FrameReader<C> {
    inner: C,
    chunk: Vec<u8>,
    cache: BytesMut,
    partial: BytesMut,
    unescaper: Unescaper,
    synced: bool,
    config: FrameConfig,
}

impl<C: Channel> FrameReader<C> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    ///
    /// `read_chunk_size` is raised to at least `capacity`: datagram channels
    /// truncate anything larger than the read buffer.
    pub fn with_config(inner: C, mut config: FrameConfig) -> Self {
        config.read_chunk_size = config.read_chunk_size.max(config.capacity);
        Self {
            inner,
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            cache: BytesMut::new(),
            partial: BytesMut::with_capacity(config.capacity),
            unescaper: Unescaper::new(),
            synced: false,
            config,
        }
    }

    /// Decode the next frame into `out`.
    ///
    /// Returns `Ok(None)` when the channel has nothing available; the frame
    /// in progress is kept. Frames longer than `out` (or the configured
    /// capacity, whichever is smaller) fail with
    /// [`FrameError::BufferOverflow`]. `size_hint` is passed through to the
    /// channel.
    pub fn decode(&mut self, out: &mut [u8], size_hint: usize) -> Result<Option<Decoded>> {
        let limit = out.len().min(self.config.capacity);
        let Some(frame) = self.next_frame(limit, size_hint)? else {
            return Ok(None);
        };
        out[..frame.len()].copy_from_slice(&frame);
        Ok(Some(Decoded {
            len: frame.len(),
            cached: self.cache.len(),
        }))
    }

    /// Read the next frame as an owned [`Frame`].
    ///
    /// Returns `Ok(None)` when the channel has nothing available.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.next_frame(self.config.capacity, self.config.read_chunk_size)?;
        Ok(frame.map(|payload| Frame::new(payload.freeze())))
    }

    /// Drop the frame in progress and any cached bytes, and start a new
    /// session.
    pub fn reset(&mut self) {
        self.partial.clear();
        self.cache.clear();
        self.unescaper.reset();
        self.synced = false;
    }

    /// Decoded bytes of the frame in progress.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    /// Wire bytes cached from a previous read.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the reader and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn next_frame(&mut self, limit: usize, size_hint: usize) -> Result<Option<BytesMut>> {
        loop {
            let input = if self.cache.is_empty() {
                let read = match self.inner.read(&mut self.chunk, size_hint) {
                    Ok(0) => return Ok(None),
                    Ok(n) => n,
                    Err(source) => {
                        return Err(FrameError::Channel {
                            pending: self.partial.len(),
                            source,
                        })
                    }
                };
                BytesMut::from(&self.chunk[..read])
            } else {
                self.cache.split()
            };

            if let Some(result) = self.scan(&input, limit) {
                return result.map(Some);
            }
        }
    }

    /// Run `input` through the escape state machine until a frame completes
    /// or fails. Unscanned bytes go to the cache in both cases.
    fn scan(&mut self, input: &[u8], limit: usize) -> Option<Result<BytesMut>> {
        for (idx, byte) in input.iter().enumerate() {
            if !self.synced {
                if *byte == END {
                    self.synced = true;
                } else {
                    trace!(byte = *byte, "skipping byte before frame boundary");
                }
                continue;
            }

            match self.unescaper.step(*byte) {
                Step::Boundary => {
                    if self.partial.len() > limit {
                        let size = self.partial.len();
                        return Some(Err(self.fail(
                            &input[idx + 1..],
                            true,
                            FrameError::BufferOverflow { size, max: limit },
                        )));
                    }
                    if !is_filler(&self.partial) {
                        self.cache.extend_from_slice(&input[idx + 1..]);
                        return Some(Ok(self.partial.split()));
                    }
                    if !self.partial.is_empty() {
                        trace!("dropping preamble flush");
                        self.partial.clear();
                    }
                }
                Step::Escape => {}
                Step::Data(value) => {
                    if self.partial.len() >= limit {
                        let size = self.partial.len() + 1;
                        return Some(Err(self.fail(
                            &input[idx + 1..],
                            false,
                            FrameError::BufferOverflow { size, max: limit },
                        )));
                    }
                    self.partial.put_u8(value);
                }
                Step::Invalid(value) => {
                    // ESC followed by END still marks a boundary.
                    return Some(Err(self.fail(
                        &input[idx + 1..],
                        value == END,
                        FrameError::UnknownEscapedByte(value),
                    )));
                }
            }
        }
        None
    }

    fn fail(&mut self, rest: &[u8], at_boundary: bool, err: FrameError) -> FrameError {
        warn!(error = %err, discarded = self.partial.len(), "discarding frame");
        self.partial.clear();
        self.unescaper.reset();
        self.synced = at_boundary;
        self.cache.extend_from_slice(rest);
        err
    }
}

impl<C> std::fmt::Debug for FrameReader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("pending", &self.partial.len())
            .field("cached", &self.cache.len())
            .field("synced", &self.synced)
            .field("config", &self.config)
            .finish()
    }
}
