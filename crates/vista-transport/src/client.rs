//! Transport client implementation

use std::fmt;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Connection lifecycle states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket held
    #[default]
    NotConnected,
    /// Handshake in progress
    Connecting,
    /// Socket established; send/receive are valid
    Connected,
}

/// Remote endpoint of a connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One outbound socket to one remote endpoint.
///
/// Invariant: `send`/`receive` are only valid in `Connected`; leaving
/// `Connected` always releases the underlying socket.
#[derive(Default)]
pub struct Connection {
    state: ConnectionState,
    endpoint: Option<Endpoint>,
    stream: Option<TcpStream>,
}

impl Connection {
    pub fn new() -> Self {
        Connection::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once the handshake has completed
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Endpoint of the current (or last) connection
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Connect to the server.
    ///
    /// Valid only from `NotConnected`; a call while already connecting or
    /// connected is a no-op. Any handshake fault (name resolution included)
    /// resets the state and returns `false` - refused and unreachable are not
    /// distinguished.
    pub async fn connect(&mut self, host: &str, port: u16) -> bool {
        if self.state != ConnectionState::NotConnected {
            return self.is_connected();
        }

        self.state = ConnectionState::Connecting;

        let host = host.trim();
        if host.is_empty() {
            tracing::warn!("invalid host name");
            self.close();
            return false;
        }

        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                self.endpoint = Some(Endpoint {
                    host: host.to_string(),
                    port,
                });
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                tracing::debug!(endpoint = %self.endpoint.as_ref().map(ToString::to_string).unwrap_or_default(), "connected");
                true
            }
            Err(e) => {
                tracing::warn!(host, port, error = %e, "connect failed");
                self.close();
                false
            }
        }
    }

    /// Write the exact byte sequence and flush it.
    ///
    /// Valid only in `Connected`. Any I/O error closes the connection before
    /// returning `false`.
    pub async fn send(&mut self, bytes: &[u8]) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }

        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let result = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.close();
                false
            }
        }
    }

    /// Read until `buf` is full or the peer stops sending.
    ///
    /// Returns the number of bytes actually obtained, which may be less than
    /// `buf.len()` if the peer closes early. An I/O error returns 0 and
    /// implicitly closes the connection; a clean EOF only shortens the count,
    /// and later calls return 0 instead of blocking.
    pub async fn receive(&mut self, buf: &mut [u8]) -> usize {
        if self.state != ConnectionState::Connected {
            return 0;
        }

        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };

        let mut filled = 0;
        while filled < buf.len() {
            match stream.read(&mut buf[filled..]).await {
                Ok(0) => break, // EOF
                Ok(n) => filled += n,
                Err(e) => {
                    tracing::warn!(error = %e, "receive failed");
                    self.close();
                    return 0;
                }
            }
        }

        filled
    }

    /// Release the socket; idempotent, valid in any state.
    pub fn close(&mut self) {
        self.stream = None;
        self.state = ConnectionState::NotConnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn test_ops_require_connected_state() {
        let mut conn = Connection::new();
        assert_eq!(conn.state(), ConnectionState::NotConnected);

        assert!(!conn.send(b"hello").await);
        let mut buf = [0u8; 8];
        assert_eq!(conn.receive(&mut buf).await, 0);

        // close is idempotent from any state
        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_invalid_host() {
        let mut conn = Connection::new();
        assert!(!conn.connect("   ", 1234).await);
        assert_eq!(conn.state(), ConnectionState::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let (l, _, port) = listener().await;
            drop(l);
            port
        };

        let mut conn = Connection::new();
        assert!(!conn.connect("127.0.0.1", port).await);
        assert_eq!(conn.state(), ConnectionState::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_is_reentrant() {
        let (listener, host, port) = listener().await;
        tokio::spawn(async move {
            let _keep = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });

        let mut conn = Connection::new();
        assert!(conn.connect(&host, port).await);
        // Second call is a no-op that reports the existing connection.
        assert!(conn.connect(&host, port).await);
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_send_receive_roundtrip() {
        let (listener, host, port) = listener().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");
            sock.write_all(b"pong").await.unwrap();
        });

        let mut conn = Connection::new();
        assert!(conn.connect(&host, port).await);
        assert!(conn.send(b"ping").await);

        let mut buf = [0u8; 4];
        assert_eq!(conn.receive(&mut buf).await, 4);
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test]
    async fn test_short_read_then_eof_returns_zero() {
        let (listener, host, port) = listener().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            // Send fewer bytes than requested, then close.
            sock.write_all(&[0xAB; 90]).await.unwrap();
        });

        let mut conn = Connection::new();
        assert!(conn.connect(&host, port).await);

        let mut buf = [0u8; 100];
        assert_eq!(conn.receive(&mut buf).await, 90);

        // Peer is gone; further reads return 0 rather than hanging.
        let mut buf = [0u8; 100];
        assert_eq!(conn.receive(&mut buf).await, 0);
    }

    #[tokio::test]
    async fn test_close_releases_socket() {
        let (listener, host, port) = listener().await;
        tokio::spawn(async move {
            let _keep = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });

        let mut conn = Connection::new();
        assert!(conn.connect(&host, port).await);
        conn.close();
        assert_eq!(conn.state(), ConnectionState::NotConnected);
        assert!(!conn.send(b"late").await);
    }
}
