/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified local address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to resolve or connect to the specified remote address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying stream or socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel has been closed.
    #[error("channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
