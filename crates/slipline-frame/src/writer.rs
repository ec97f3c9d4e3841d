use bytes::BytesMut;
use slipline_transport::Channel;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::Result;

/// Writes complete frames to a [`Channel`].
///
/// Each frame is encoded into an internal buffer and handed to the channel
/// in a single `write` call. A payload that does not fit the configured
/// capacity is rejected before the channel is touched.
pub struct FrameWriter<C> {
    inner: C,
    buf: BytesMut,
    config: FrameConfig,
}

impl<C: Channel> FrameWriter<C> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: C, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.capacity),
            config,
        }
    }

    /// Write a complete frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.send(frame.payload.as_ref())
    }

    /// Encode and send a payload.
    ///
    /// Returns the number of wire bytes the channel accepted.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf, self.config.capacity)?;
        Ok(self.inner.write(&self.buf)?)
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the writer and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Update the frame capacity for subsequent writes.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.config.capacity = capacity;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<C> std::fmt::Debug for FrameWriter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use slipline_transport::{IoChannel, TransportError};

    use super::*;
    use crate::codec::decode_frames;
    use crate::error::FrameError;
    use crate::marker::{BUF_SIZE, END, ESC, FLUSH};
    use crate::reader::tests::ScriptedChannel;

    #[test]
    fn writes_reference_frames() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());

        let sent = writer.send(&[0x0A, 0x01, 0x00, 0xCE, 0xE4]).unwrap();
        assert_eq!(sent, 8);
        writer.send(&[0x0A, 0x01, END, 0x00, 0xCE, ESC, 0xE4]).unwrap();

        assert_eq!(
            writer.into_inner().written,
            vec![
                0xFF, 0xC0, 0x0A, 0x01, 0x00, 0xCE, 0xE4, 0xC0, //
                0xFF, 0xC0, 0x0A, 0x01, 0xDB, 0xDC, 0x00, 0xCE, 0xDB, 0xDD, 0xE4, 0xC0,
            ]
        );
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());
        writer.write_frame(&Frame::new("abc")).unwrap();

        let written = writer.into_inner().written;
        assert_eq!(decode_frames(&written).unwrap(), vec![Frame::new("abc")]);
    }

    #[test]
    fn empty_payload_writes_markers_only() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());
        assert_eq!(writer.send(&[]).unwrap(), 3);
        assert_eq!(writer.into_inner().written, vec![FLUSH, END, END]);
    }

    #[test]
    fn oversize_payload_never_reaches_channel() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());
        let err = writer.send(&[0u8; BUF_SIZE]).unwrap_err();
        assert!(matches!(err, FrameError::BufferOverflow { max: BUF_SIZE, .. }));
        assert!(writer.get_ref().written.is_empty());
    }

    #[test]
    fn escaping_can_push_payload_over_capacity() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());
        writer.set_capacity(8);
        assert_eq!(writer.config().capacity, 8);

        assert!(writer.send(&[1, 2, 3, 4, 5]).is_ok());
        assert!(writer.send(&[1, 2, 3, 4, END]).is_err());
        assert_eq!(writer.get_ref().written.len(), 8);
    }

    #[test]
    fn channel_errors_propagate() {
        let mut writer = FrameWriter::new(FailingChannel);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Channel {
                pending: 0,
                source: TransportError::Closed
            }
        ));
    }

    #[test]
    fn writes_through_io_channel() {
        let mut writer = FrameWriter::new(IoChannel::new(Cursor::new(Vec::<u8>::new())));
        writer.send(b"serial").unwrap();

        let wire = writer.into_inner().into_inner().into_inner();
        assert_eq!(decode_frames(&wire).unwrap(), vec![Frame::new("serial")]);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(ScriptedChannel::default());
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    struct FailingChannel;

    impl Channel for FailingChannel {
        fn read(
            &mut self,
            _buf: &mut [u8],
            _size_hint: usize,
        ) -> slipline_transport::Result<usize> {
            Err(TransportError::Io(io::Error::other("unused")))
        }

        fn write(&mut self, _buf: &[u8]) -> slipline_transport::Result<usize> {
            Err(TransportError::Closed)
        }
    }
}
