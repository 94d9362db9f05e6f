//! TCP client: one connection, reused across requests while it stays healthy.
//!
//! [`Client`] connects lazily on the first [`Client::send`] and keeps the
//! connection for the next request when both sides allow it. A connection is
//! dropped after any error, after an exchange that asked for closure, and
//! after a close-delimited response body, since all of those leave the stream
//! unusable for another message.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use http1_wire::config::ParserConfig;
use http1_wire::encoding::DecoderRegistry;
use http1_wire::parser::{RequestWriter, ResponseParser};
use http1_wire::protocol::{FramingMode, HeaderTable, HttpError, ParseError, SendError, is_persistent};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::debug;

use crate::content::{decode_content, default_registry};
use crate::request::Request;
use crate::response::Response;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connect failed: {source}")]
    Connect { source: io::Error },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("http exchange failed: {source}")]
    Http {
        #[from]
        source: HttpError,
    },
}

impl From<ParseError> for ClientError {
    fn from(e: ParseError) -> Self {
        Self::Http { source: e.into() }
    }
}

impl From<SendError> for ClientError {
    fn from(e: SendError) -> Self {
        Self::Http { source: e.into() }
    }
}

/// Timeouts and parser settings for one [`Client`].
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub parser_config: ParserConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            parser_config: ParserConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_parser_config(mut self, config: ParserConfig) -> Self {
        self.parser_config = config;
        self
    }
}

#[derive(Debug)]
struct ClientConn {
    parser: ResponseParser<OwnedReadHalf>,
    writer: RequestWriter<OwnedWriteHalf>,
}

/// A client for one remote address.
///
/// `send` takes `&mut self`: requests on one client are sequential, which is
/// what HTTP/1.x gives a single connection anyway. Use one client per task
/// for concurrency.
#[derive(Debug)]
pub struct Client {
    address: SocketAddr,
    config: ClientConfig,
    registry: DecoderRegistry,
    connection: Option<ClientConn>,
}

impl Client {
    /// No connection is opened until the first [`Client::send`].
    pub fn new(address: SocketAddr) -> Self {
        Self { address, config: ClientConfig::default(), registry: default_registry(), connection: None }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Writes the request, reads the response eagerly and decodes its
    /// `Content-Encoding`. The connection is kept for the next call only
    /// when the exchange left it reusable.
    pub async fn send(&mut self, request: Request) -> Result<Response, ClientError> {
        let mut conn = match self.connection.take() {
            Some(conn) => conn,
            None => self.open().await?,
        };

        let request_close = wants_close(request.headers());
        let framing = request_framing(&request);
        let (head, body) = request.into_parts();
        let method = head.method().clone();
        conn.writer.write_request(head, framing, body).await?;

        let (head, body, response_framing) = timeout(self.config.read_timeout, async {
            let Some(message) = conn.parser.parse_response(method).await? else {
                return Err(ParseError::unexpected_eof("connection closed before a response arrived"));
            };
            let framing = message.framing();
            let (head, body) = message.eagerly().await?;
            Ok((head, body, framing))
        })
        .await
        .map_err(|_elapsed| ClientError::Timeout { operation: "read" })??;

        let persistent = response_framing != FramingMode::CloseDelimited
            && is_persistent(head.version(), head.headers())
            && !request_close
            && !conn.parser.is_poisoned();

        let (bytes, trailers) = body.into_parts();
        let bytes = decode_content(&self.registry, head.headers(), bytes)?;

        if persistent {
            self.connection = Some(conn);
            debug!(address = %self.address, "connection kept for reuse");
        }
        Ok(Response::from_parts(head, bytes, trailers))
    }

    async fn open(&self) -> Result<ClientConn, ClientError> {
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(self.address)).await
        {
            Err(_elapsed) => return Err(ClientError::Timeout { operation: "connect" }),
            Ok(Err(e)) => return Err(ClientError::Connect { source: e }),
            Ok(Ok(stream)) => stream,
        };
        debug!(address = %self.address, "connected");
        let (reader, writer) = stream.into_split();
        Ok(ClientConn {
            parser: ResponseParser::new(reader, self.config.parser_config),
            writer: RequestWriter::new(writer),
        })
    }
}

fn wants_close(headers: &HeaderTable) -> bool {
    headers
        .get_all("connection")
        .iter()
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

fn request_framing(request: &Request) -> FramingMode {
    if request.headers().contains("transfer-encoding") {
        FramingMode::Chunked
    } else if request.body().is_empty() {
        FramingMode::NoBody
    } else {
        FramingMode::ContentLength(request.body().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, handler_fn};
    use crate::server::ServerConnection;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use http1_wire::protocol::StatusCode;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_echo_server(close_responses: bool) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let handler: Arc<dyn Handler> = Arc::new(handler_fn(move |request: Request| async move {
                    let mut builder =
                        Response::builder(StatusCode::OK).body(format!("saw {}", request.target()));
                    if close_responses {
                        builder = builder.header("Connection", "close");
                    }
                    Ok(builder.build())
                }));
                let (reader, writer) = stream.into_split();
                tokio::spawn(ServerConnection::new(reader, writer).process(handler));
            }
        });
        (address, accepted)
    }

    #[tokio::test]
    async fn reuses_the_connection_across_requests() {
        let (address, accepted) = spawn_echo_server(false).await;
        let mut client = Client::new(address);

        let first = client.send(Request::get("/one").build()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.text(), "saw /one");
        assert!(client.is_connected());

        let second = client.send(Request::get("/two").build()).await.unwrap();
        assert_eq!(second.text(), "saw /two");
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconnects_after_a_close_response() {
        let (address, accepted) = spawn_echo_server(true).await;
        let mut client = Client::new(address);

        let first = client.send(Request::get("/one").build()).await.unwrap();
        assert_eq!(first.text(), "saw /one");
        assert!(!client.is_connected());

        let second = client.send(Request::get("/two").build()).await.unwrap();
        assert_eq!(second.text(), "saw /two");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn decodes_gzip_response_bodies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 1024];
            let _ = stream.read(&mut buffer).await.unwrap();

            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(b"pressed").unwrap();
            let compressed = encoder.finish().unwrap();
            let mut wire = format!(
                "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                compressed.len()
            )
            .into_bytes();
            wire.extend_from_slice(&compressed);
            stream.write_all(&wire).await.unwrap();
        });

        let mut client = Client::new(address);
        let response = client.send(Request::get("/gz").build()).await.unwrap();
        assert_eq!(response.text(), "pressed");
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn read_timeout_fires_on_a_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = ClientConfig::default().with_read_timeout(Duration::from_millis(50));
        let mut client = Client::new(address).with_config(config);
        let err = client.send(Request::get("/slow").build()).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { operation: "read" }));
    }

    #[tokio::test]
    async fn chunked_request_bodies_reach_the_server() {
        let (address, _accepted) = spawn_echo_server(false).await;
        let mut client = Client::new(address);

        let request = Request::post("/up")
            .header("Transfer-Encoding", "chunked")
            .body("streamed")
            .build();
        let response = client.send(request).await.unwrap();
        assert_eq!(response.text(), "saw /up");
    }
}
