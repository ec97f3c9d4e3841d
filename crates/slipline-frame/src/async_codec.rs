//! `tokio-util` codec for running the framing over async byte streams.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::escape::{Step, Unescaper};
use crate::marker::{is_filler, END};

/// SLIP codec for [`tokio_util::codec::FramedRead`] and
/// [`tokio_util::codec::FramedWrite`].
///
/// Decoding follows the same rules as [`crate::reader::FrameReader`]: bytes
/// before the first END are skipped, filler segments are dropped (see
/// [`is_filler`]), and a framing error discards the rest of the broken frame
/// up to the next END before the codec resumes.
#[derive(Debug, Clone)]
pub struct SlipCodec {
    frame: BytesMut,
    unescaper: Unescaper,
    synced: bool,
    capacity: usize,
}

impl SlipCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a codec using the capacity from `config`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            frame: BytesMut::with_capacity(config.capacity),
            unescaper: Unescaper::new(),
            synced: false,
            capacity: config.capacity,
        }
    }

    /// Maximum frame size in either direction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn fail(&mut self, at_boundary: bool, err: FrameError) -> FrameError {
        self.frame.clear();
        self.unescaper.reset();
        self.synced = at_boundary;
        err
    }
}

impl Default for SlipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SlipCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let mut consumed = 0usize;
        while consumed < src.len() {
            let byte = src[consumed];
            consumed += 1;

            if !self.synced {
                self.synced = byte == END;
                continue;
            }

            match self.unescaper.step(byte) {
                Step::Boundary => {
                    if !is_filler(&self.frame) {
                        src.advance(consumed);
                        return Ok(Some(self.frame.split().freeze()));
                    }
                    if !self.frame.is_empty() {
                        trace!("dropping preamble flush");
                        self.frame.clear();
                    }
                }
                Step::Escape => {}
                Step::Data(value) => {
                    if self.frame.len() >= self.capacity {
                        let size = self.frame.len() + 1;
                        src.advance(consumed);
                        return Err(self.fail(
                            false,
                            FrameError::BufferOverflow {
                                size,
                                max: self.capacity,
                            },
                        ));
                    }
                    self.frame.put_u8(value);
                }
                Step::Invalid(value) => {
                    src.advance(consumed);
                    // ESC followed by END still closes the broken frame.
                    return Err(self.fail(value == END, FrameError::UnknownEscapedByte(value)));
                }
            }
        }

        src.advance(consumed);
        Ok(None)
    }
}

impl Encoder<&[u8]> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(item, dst, self.capacity)
    }
}

impl Encoder<Bytes> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, dst, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::marker::{END, ESC, FLUSH};

    #[test]
    fn decodes_reference_frame() {
        let mut src = BytesMut::from(
            &[
                0xC0, 0x0A, 0x01, 0x22, 0x07, 0x07, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x7F,
                0xFE, 0x0A, 0x01, 0xAE, 0xB0, 0xC0,
            ][..],
        );
        let mut codec = SlipCodec::new();
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.len(), 17);
        assert!(src.is_empty());
    }

    #[test]
    fn partial_frame_carries_over() {
        let mut codec = SlipCodec::new();
        let mut src = BytesMut::from(&[FLUSH, END, 0x01][..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(src.is_empty());

        src.extend_from_slice(&[0x02, END, 0x03]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.as_ref(), &[0x01, 0x02]);
        assert_eq!(src.as_ref(), &[0x03]);
    }

    #[test]
    fn framing_error_discards_rest_of_frame() {
        let mut codec = SlipCodec::new();
        let mut src = BytesMut::from(&[END, 0x01, ESC, 0x07, 0x08, 0x09, END][..]);

        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, FrameError::UnknownEscapedByte(0x07)));
        assert_eq!(src.as_ref(), &[0x08, 0x09, END]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(src.is_empty());

        src.extend_from_slice(&[FLUSH, END, 0x0A, END]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.as_ref(), &[0x0A]);
    }

    #[test]
    fn escape_followed_by_end_closes_broken_frame() {
        let mut codec = SlipCodec::new();
        let mut src = BytesMut::from(&[END, 0x01, ESC, END, 0x05, 0x06, END][..]);

        assert!(matches!(
            codec.decode(&mut src),
            Err(FrameError::UnknownEscapedByte(END))
        ));
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.as_ref(), &[0x05, 0x06]);
    }

    #[test]
    fn leading_noise_and_filler_are_skipped() {
        let mut codec = SlipCodec::new();
        let mut src = BytesMut::from(&[0x11, 0x22, END, END, FLUSH, END, 0x42, END][..]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.as_ref(), &[0x42]);
        assert!(src.is_empty());
    }

    #[test]
    fn overflow_reports_capacity() {
        let config = FrameConfig {
            capacity: 2,
            ..FrameConfig::default()
        };
        let mut codec = SlipCodec::with_config(&config);
        let mut src = BytesMut::from(&[END, 1, 2, 3, 4, END, 5, 6, END][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(FrameError::BufferOverflow { size: 3, max: 2 })
        ));
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.as_ref(), &[5, 6]);
        assert_eq!(codec.capacity(), 2);
    }

    #[test]
    fn encoder_matches_block_encoder() {
        let mut codec = SlipCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(&[0x0A, 0x01, 0xC0, 0x00, 0xCE, 0xDB, 0xE4][..], &mut dst)
            .unwrap();
        assert_eq!(
            dst.as_ref(),
            &[0xFF, 0xC0, 0x0A, 0x01, 0xDB, 0xDC, 0x00, 0xCE, 0xDB, 0xDD, 0xE4, 0xC0]
        );
    }

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(64);
        let mut sink = FramedWrite::new(client, SlipCodec::new());
        let mut stream = FramedRead::new(server, SlipCodec::new());

        let writer = tokio::spawn(async move {
            sink.send(Bytes::from_static(b"hello")).await.unwrap();
            sink.send(Bytes::from_static(&[0x42])).await.unwrap();
            sink.send(Bytes::from_static(&[END, ESC, 0x00])).await.unwrap();
            sink.send(Bytes::from(vec![0x5A; 300])).await.unwrap();
        });

        let first = stream.next().await.unwrap().unwrap();
        let single = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        let third = stream.next().await.unwrap().unwrap();
        writer.await.unwrap();

        assert_eq!(first.as_ref(), b"hello");
        assert_eq!(single.as_ref(), &[0x42]);
        assert_eq!(second.as_ref(), &[END, ESC, 0x00]);
        assert_eq!(third.len(), 300);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn framed_read_from_slice() {
        let wire: &[u8] = &[FLUSH, END, 0x01, 0x02, END, FLUSH, END, 0x03, 0x04, END];
        let frames: Vec<Bytes> = FramedRead::new(wire, SlipCodec::new())
            .map(|frame| frame.unwrap())
            .collect()
            .await;
        assert_eq!(
            frames,
            vec![Bytes::from_static(&[1, 2]), Bytes::from_static(&[3, 4])]
        );
    }
}
