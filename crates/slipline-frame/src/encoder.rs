//! Push-style encoder fed one payload byte at a time.
//!
//! Mirrors [`crate::decoder::Decoder`] on the transmit side: payload bytes
//! are escaped into an internal buffer as they arrive, and the finished wire
//! frame is handed to a callback on [`Encoder::end_frame`].

use bytes::BytesMut;

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::escape::escape_byte;
use crate::marker::{BUF_SIZE, END, PREAMBLE};

/// Incremental frame encoder.
///
/// Produces exactly the bytes [`crate::codec::encode_frame`] produces for the
/// same payload. Every append is bounded by the capacity. On overflow the
/// frame in progress is dropped: later payload bytes are ignored until
/// [`Encoder::end_frame`], which reports the overflow instead of handing
/// anything to `on_frame_ready`.
pub struct Encoder<F> {
    buf: BytesMut,
    capacity: usize,
    /// Wire size the dropped frame would have needed so far.
    overflow: Option<usize>,
    on_frame_ready: F,
}

impl<F: FnMut(&[u8])> Encoder<F> {
    /// Create an encoder with a [`BUF_SIZE`] wire buffer.
    pub fn new(on_frame_ready: F) -> Self {
        Self::with_capacity(BUF_SIZE, on_frame_ready)
    }

    /// Create an encoder using the capacity from `config`.
    pub fn with_config(config: &FrameConfig, on_frame_ready: F) -> Self {
        Self::with_capacity(config.capacity, on_frame_ready)
    }

    /// Create an encoder whose wire frames may hold up to `capacity` bytes.
    pub fn with_capacity(capacity: usize, on_frame_ready: F) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            overflow: None,
            on_frame_ready,
        }
    }

    /// Escape and append one payload byte.
    ///
    /// Only the byte that overflows the buffer returns an error; the rest of
    /// that frame is dropped quietly.
    pub fn put_byte(&mut self, value: u8) -> Result<()> {
        let escaped = escape_byte(value);
        if let Some(size) = self.overflow.as_mut() {
            *size += escaped.len();
            return Ok(());
        }
        self.open_frame()?;
        self.append(escaped.as_slice())
    }

    /// Escape and append a run of payload bytes.
    pub fn put_slice(&mut self, payload: &[u8]) -> Result<()> {
        payload.iter().try_for_each(|byte| self.put_byte(*byte))
    }

    /// Close the frame, hand it to `on_frame_ready` and start over.
    ///
    /// Fails with [`FrameError::BufferOverflow`] if the frame was dropped;
    /// the next byte starts a fresh frame either way.
    pub fn end_frame(&mut self) -> Result<()> {
        if let Some(size) = self.overflow.take() {
            return Err(FrameError::BufferOverflow {
                size: size + 1,
                max: self.capacity,
            });
        }
        let closed = self.open_frame().and_then(|()| self.append(&[END]));
        if let Err(err) = closed {
            self.overflow = None;
            return Err(err);
        }
        (self.on_frame_ready)(&self.buf);
        self.buf.clear();
        Ok(())
    }

    /// Drop the frame in progress.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflow = None;
    }

    /// Wire bytes buffered for the frame in progress.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no frame is in progress.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum wire frame size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True after an overflow, until the dropped frame is ended or reset.
    pub fn is_overflowed(&self) -> bool {
        self.overflow.is_some()
    }

    fn open_frame(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            self.append(&PREAMBLE)?;
        }
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let size = self.buf.len() + bytes.len();
        if size > self.capacity {
            self.buf.clear();
            self.overflow = Some(size);
            return Err(FrameError::BufferOverflow {
                size,
                max: self.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

impl<F> std::fmt::Debug for Encoder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("len", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("overflow", &self.overflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::codec::encode_frame;
    use crate::marker::{ESC, FLUSH};

    #[test]
    fn matches_block_encoder() {
        let payload = [0x0A, 0x01, END, 0x00, 0xCE, ESC, 0xE4];
        let sent = RefCell::new(Vec::new());
        let mut encoder = Encoder::new(|frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));

        encoder.put_slice(&payload).unwrap();
        encoder.end_frame().unwrap();
        assert!(encoder.is_empty());
        drop(encoder);

        let mut expected = BytesMut::new();
        encode_frame(&payload, &mut expected, BUF_SIZE).unwrap();
        assert_eq!(sent.into_inner(), vec![expected.to_vec()]);
    }

    #[test]
    fn consecutive_frames_each_get_preamble() {
        let sent = RefCell::new(Vec::new());
        let mut encoder = Encoder::new(|frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));

        encoder.put_byte(0x01).unwrap();
        encoder.end_frame().unwrap();
        encoder.put_byte(0x02).unwrap();
        encoder.end_frame().unwrap();
        drop(encoder);

        assert_eq!(
            sent.into_inner(),
            vec![vec![FLUSH, END, 0x01, END], vec![FLUSH, END, 0x02, END]]
        );
    }

    #[test]
    fn empty_frame_is_markers_only() {
        let sent = RefCell::new(Vec::new());
        let mut encoder = Encoder::new(|frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));
        encoder.end_frame().unwrap();
        drop(encoder);
        assert_eq!(sent.into_inner(), vec![vec![FLUSH, END, END]]);
    }

    #[test]
    fn overflow_drops_frame_without_emitting() {
        let sent = RefCell::new(Vec::new());
        let mut encoder =
            Encoder::with_capacity(6, |frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));

        encoder.put_byte(0x01).unwrap();
        encoder.put_byte(0x02).unwrap();
        assert_eq!(encoder.len(), 4);
        // ESC pair would need two more bytes and leave no room for END.
        encoder.put_byte(0x03).unwrap();
        let err = encoder.put_byte(END).unwrap_err();
        assert!(matches!(err, FrameError::BufferOverflow { size: 7, max: 6 }));
        assert!(encoder.is_empty());
        assert!(encoder.is_overflowed());

        // The rest of the dropped frame goes nowhere.
        encoder.put_byte(0x04).unwrap();
        assert!(encoder.is_empty());
        assert!(matches!(
            encoder.end_frame(),
            Err(FrameError::BufferOverflow { size: 9, max: 6 })
        ));
        assert!(!encoder.is_overflowed());

        encoder.put_byte(0x05).unwrap();
        encoder.end_frame().unwrap();
        drop(encoder);
        assert_eq!(sent.into_inner(), vec![vec![FLUSH, END, 0x05, END]]);
    }

    #[test]
    fn oversize_payload_fed_bytewise_emits_nothing() {
        let sent = RefCell::new(Vec::new());
        let mut encoder =
            Encoder::with_capacity(8, |frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));

        let errors = (1..=10u8)
            .filter_map(|byte| encoder.put_byte(byte).err())
            .count();
        assert_eq!(errors, 1);
        assert!(matches!(
            encoder.end_frame(),
            Err(FrameError::BufferOverflow { size: 13, max: 8 })
        ));
        drop(encoder);
        assert!(sent.into_inner().is_empty());
    }

    #[test]
    fn closing_marker_respects_capacity() {
        let sent = RefCell::new(Vec::new());
        let mut encoder =
            Encoder::with_capacity(4, |frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));

        encoder.put_slice(&[0x01, 0x02]).unwrap();
        let err = encoder.end_frame().unwrap_err();
        assert!(matches!(err, FrameError::BufferOverflow { size: 5, max: 4 }));
        assert_eq!(encoder.capacity(), 4);
        drop(encoder);
        assert!(sent.into_inner().is_empty());
    }

    #[test]
    fn reset_discards_buffered_bytes() {
        let mut encoder = Encoder::new(|_: &[u8]| {});
        encoder.put_slice(b"abc").unwrap();
        assert_eq!(encoder.len(), 5);
        encoder.reset();
        assert!(encoder.is_empty());

        let mut encoder = Encoder::with_capacity(4, |_: &[u8]| {});
        assert!(encoder.put_slice(b"abc").is_err());
        assert!(encoder.is_overflowed());
        encoder.reset();
        assert!(!encoder.is_overflowed());
    }

    #[test]
    fn config_sets_capacity() {
        let config = FrameConfig {
            capacity: 5,
            ..FrameConfig::default()
        };
        let sent = RefCell::new(Vec::new());
        let mut encoder =
            Encoder::with_config(&config, |frame: &[u8]| sent.borrow_mut().push(frame.to_vec()));
        assert_eq!(encoder.capacity(), 5);
        encoder.put_slice(&[0x01, 0x02]).unwrap();
        encoder.end_frame().unwrap();
        drop(encoder);
        assert_eq!(sent.into_inner(), vec![vec![FLUSH, END, 0x01, 0x02, END]]);
    }
}
