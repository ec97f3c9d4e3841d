use std::fmt::Debug;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::channel::{is_timeout, Channel, HexDump};
use crate::error::{Result, TransportError};

/// Default bounded wait for a datagram before a read reports "no data".
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration for [`UdpChannel`].
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// How long a read waits for a datagram. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Trace every datagram sent and received as hex.
    pub log_data: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            log_data: false,
        }
    }
}

/// A UDP socket standing in for a serial line.
///
/// The channel listens on a local address and exchanges datagrams with a
/// single peer. Datagram boundaries carry no meaning: the framing layer sees
/// the received bytes as one continuous stream, exactly as it would on a
/// serial port.
pub struct UdpChannel {
    socket: UdpSocket,
    peer: SocketAddr,
    config: UdpConfig,
}

impl UdpChannel {
    /// Bind `local` and exchange datagrams with `peer`, using the default configuration.
    pub fn open(
        local: impl ToSocketAddrs + Debug,
        peer: impl ToSocketAddrs + Debug,
    ) -> Result<Self> {
        Self::open_with_config(local, peer, UdpConfig::default())
    }

    /// Bind `local` and exchange datagrams with `peer`.
    pub fn open_with_config(
        local: impl ToSocketAddrs + Debug,
        peer: impl ToSocketAddrs + Debug,
        config: UdpConfig,
    ) -> Result<Self> {
        let local_addr = resolve(&local).map_err(|source| TransportError::Bind {
            addr: format!("{local:?}"),
            source,
        })?;
        let peer_addr = resolve(&peer).map_err(|source| TransportError::Connect {
            addr: format!("{peer:?}"),
            source,
        })?;

        let socket = UdpSocket::bind(local_addr).map_err(|source| TransportError::Bind {
            addr: local_addr.to_string(),
            source,
        })?;
        socket
            .connect(peer_addr)
            .map_err(|source| TransportError::Connect {
                addr: peer_addr.to_string(),
                source,
            })?;
        socket.set_read_timeout(config.read_timeout)?;

        info!(local = %local_addr, peer = %peer_addr, "udp channel open");

        Ok(Self {
            socket,
            peer: peer_addr,
            config,
        })
    }

    /// The local address this channel is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// The peer this channel exchanges datagrams with.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Change the bounded wait applied to reads.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout)?;
        self.config.read_timeout = timeout;
        Ok(())
    }

    /// Current channel configuration.
    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "udp-datagram"
    }
}

impl Channel for UdpChannel {
    /// Receive one datagram into `buf`.
    ///
    /// A datagram longer than `buf` is truncated by the socket, so `buf`
    /// must hold the largest wire frame the peer sends.
    fn read(&mut self, buf: &mut [u8], _size_hint: usize) -> Result<usize> {
        loop {
            match self.socket.recv(buf) {
                Ok(n) => {
                    if self.config.log_data {
                        trace!(peer = %self.peer, data = %HexDump(&buf[..n]), "udp read");
                    }
                    return Ok(n);
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Ok(0),
                // A previous send hit a closed port; the peer may not be up yet.
                Err(err) if err.kind() == std::io::ErrorKind::ConnectionRefused => {
                    debug!(peer = %self.peer, "peer port unreachable");
                    return Ok(0);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.config.log_data {
            trace!(peer = %self.peer, data = %HexDump(buf), "udp write");
        }
        loop {
            match self.socket.send(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl Debug for UdpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpChannel")
            .field("peer", &self.peer)
            .field("config", &self.config)
            .finish()
    }
}

fn resolve(addr: &impl ToSocketAddrs) -> std::io::Result<SocketAddr> {
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to nothing",
        )
    })
}
