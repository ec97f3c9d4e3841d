use slipline_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame would not fit in the buffer; it was dropped whole.
    #[error("frame buffer overflow ({size} bytes, capacity {max})")]
    BufferOverflow { size: usize, max: usize },

    /// A byte following ESC was neither ESC_END nor ESC_ESC.
    #[error("unknown escaped byte 0x{0:02x}")]
    UnknownEscapedByte(u8),

    /// The channel failed. `pending` decoded bytes of the current frame are
    /// kept, so retrying the read continues the same frame.
    #[error("channel error ({pending} bytes pending): {source}")]
    Channel {
        pending: usize,
        #[source]
        source: TransportError,
    },

    /// An I/O error occurred on an async stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Framing errors affect one frame only; the decoder has already reset.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::BufferOverflow { .. } | FrameError::UnknownEscapedByte(_)
        )
    }
}

impl From<TransportError> for FrameError {
    fn from(source: TransportError) -> Self {
        FrameError::Channel { pending: 0, source }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
