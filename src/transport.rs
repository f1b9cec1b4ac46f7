//! Line-oriented byte-stream transports

use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::{
    constants::{DEFAULT_TIMEOUT_MS, MAX_LINE_LENGTH},
    error::{StliError, StliResult},
};

/// Ordered, reliable stream of newline-terminated text lines.
///
/// The connection engine owns its transport exclusively and never issues two
/// operations at once. Deadlines, if any, belong to the implementation.
pub trait LineTransport: Send {
    /// Open the stream.
    fn connect(&mut self) -> impl Future<Output = StliResult<()>> + Send;

    /// Whether the stream is currently open.
    fn is_connected(&self) -> bool;

    /// Write one line. `line` already carries its record terminator.
    fn write_line(&mut self, line: &str) -> impl Future<Output = StliResult<()>> + Send;

    /// Wait for the next full line and return it without its terminator.
    fn read_line(&mut self) -> impl Future<Output = StliResult<String>> + Send;

    /// Close the stream.
    fn close(&mut self) -> impl Future<Output = StliResult<()>> + Send;
}

/// Options for [`TcpLineTransport`].
#[derive(Debug, Clone)]
pub struct TcpTransportOptions {
    /// TCP connect deadline. Default: 2 seconds.
    pub connect_timeout: Duration,
    /// Per-line read deadline. Default: none (block until a line arrives).
    pub read_timeout: Option<Duration>,
}

impl Default for TcpTransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            read_timeout: None,
        }
    }
}

struct TcpHalves {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// [`LineTransport`] over a tokio TCP stream.
pub struct TcpLineTransport {
    host: String,
    port: u16,
    options: TcpTransportOptions,
    stream: Option<TcpHalves>,
}

impl std::fmt::Debug for TcpLineTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLineTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Establish a TCP connection with a timeout.
async fn tcp_connect_with_timeout(host: &str, port: u16, limit: Duration) -> StliResult<TcpStream> {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(s)) => {
            debug!("[CONNECT] TCP connection established");
            Ok(s)
        }
        Ok(Err(e)) => {
            warn!("[CONNECT] TCP connect failed: {}", e);
            Err(StliError::Io(e))
        }
        Err(_) => {
            warn!("[CONNECT] TCP connect timed out after {}ms", limit.as_millis());
            Err(StliError::Timeout {
                timeout_ms: duration_ms(limit),
            })
        }
    }
}

impl TcpLineTransport {
    /// Transport that will connect to `host:port` on [`connect`](LineTransport::connect).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_options(host, port, TcpTransportOptions::default())
    }

    /// Like [`new`](Self::new) with custom timeouts.
    pub fn with_options(host: impl Into<String>, port: u16, options: TcpTransportOptions) -> Self {
        Self {
            host: host.into(),
            port,
            options,
            stream: None,
        }
    }

    /// Wrap an already connected stream. `connect()` is then a no-op.
    pub fn from_stream(stream: TcpStream, options: TcpTransportOptions) -> StliResult<Self> {
        let peer = stream.peer_addr()?;
        let mut transport = Self::with_options(peer.ip().to_string(), peer.port(), options);
        transport.attach(stream);
        Ok(transport)
    }

    fn attach(&mut self, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();
        self.stream = Some(TcpHalves {
            reader: BufReader::new(read_half),
            writer: write_half,
        });
    }

    fn halves(&mut self) -> StliResult<&mut TcpHalves> {
        self.stream
            .as_mut()
            .ok_or(StliError::NotConnected)
    }

    async fn read_raw(reader: &mut BufReader<OwnedReadHalf>) -> StliResult<String> {
        let mut buf = String::new();
        let n = reader
            .read_line(&mut buf)
            .await?;
        if n == 0 {
            return Err(StliError::ConnectionClosed);
        }
        if buf.len() > MAX_LINE_LENGTH {
            return Err(StliError::protocol_error(format!(
                "line of {} bytes exceeds limit {}",
                buf.len(),
                MAX_LINE_LENGTH
            )));
        }
        if !buf.ends_with('\n') {
            // EOF mid-line.
            return Err(StliError::ConnectionClosed);
        }
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
        Ok(buf)
    }
}

impl LineTransport for TcpLineTransport {
    async fn connect(&mut self) -> StliResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        info!("Connecting to STLI server at {}:{}", self.host, self.port);
        let stream =
            tcp_connect_with_timeout(&self.host, self.port, self.options.connect_timeout).await?;
        self.attach(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn write_line(&mut self, line: &str) -> StliResult<()> {
        let halves = self.halves()?;
        halves
            .writer
            .write_all(line.as_bytes())
            .await?;
        halves
            .writer
            .flush()
            .await?;
        trace!("[SEND] wrote {} bytes", line.len());
        Ok(())
    }

    async fn read_line(&mut self) -> StliResult<String> {
        let read_timeout = self.options.read_timeout;
        let halves = self.halves()?;
        match read_timeout {
            None => Self::read_raw(&mut halves.reader).await,
            Some(limit) => match timeout(limit, Self::read_raw(&mut halves.reader)).await {
                Ok(result) => result,
                Err(_) => Err(StliError::Timeout {
                    timeout_ms: duration_ms(limit),
                }),
            },
        }
    }

    async fn close(&mut self) -> StliResult<()> {
        let Some(mut halves) = self.stream.take() else {
            return Err(StliError::NotConnected);
        };
        debug!("Shutting down TCP stream");
        halves
            .writer
            .shutdown()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn pair(options: TcpTransportOptions) -> (TcpLineTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let port = listener
            .local_addr()
            .unwrap()
            .port();
        let mut transport = TcpLineTransport::with_options("127.0.0.1", port, options);
        let (connected, accepted) = tokio::join!(transport.connect(), listener.accept());
        connected.unwrap();
        (transport, accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport = TcpLineTransport::new("127.0.0.1", 1);
        assert!(!transport.is_connected());
        assert!(matches!(
            transport
                .write_line("BYE\n")
                .await,
            Err(StliError::NotConnected)
        ));
        assert!(matches!(
            transport
                .read_line()
                .await,
            Err(StliError::NotConnected)
        ));
        assert!(matches!(
            transport
                .close()
                .await,
            Err(StliError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_read_strips_terminators() {
        let (mut transport, mut server) = pair(TcpTransportOptions::default()).await;
        server
            .write_all(b"error_ind SUCCESS BYE\r\nsecond\n")
            .await
            .unwrap();
        assert_eq!(
            transport
                .read_line()
                .await
                .unwrap(),
            "error_ind SUCCESS BYE"
        );
        assert_eq!(
            transport
                .read_line()
                .await
                .unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn test_write_and_close() {
        let (mut transport, mut server) = pair(TcpTransportOptions::default()).await;
        transport
            .write_line("BYE\n")
            .await
            .unwrap();
        transport
            .close()
            .await
            .unwrap();
        assert!(!transport.is_connected());

        let mut received = String::new();
        server
            .read_to_string(&mut received)
            .await
            .unwrap();
        assert_eq!(received, "BYE\n");
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let (mut transport, server) = pair(TcpTransportOptions::default()).await;
        drop(server);
        assert!(matches!(
            transport
                .read_line()
                .await,
            Err(StliError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let options = TcpTransportOptions {
            read_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let (mut transport, _server) = pair(options).await;
        assert!(matches!(
            transport
                .read_line()
                .await,
            Err(StliError::Timeout { timeout_ms: 50 })
        ));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (mut transport, _server) = pair(TcpTransportOptions::default()).await;
        transport
            .connect()
            .await
            .unwrap();
        assert!(transport.is_connected());
    }
}
