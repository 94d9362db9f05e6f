//! TCP server: accept loop, per-connection task, keep-alive processing.
//!
//! [`Server`] owns the listener and spawns one tokio task per accepted
//! connection; [`ServerConnection`] owns one connection and runs the
//! parse → handle → respond loop on it until the peer closes, a framing
//! error poisons the stream, or the keep-alive timer fires. Parse failures
//! are answered with canned responses before the connection is dropped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http1_wire::config::ParserConfig;
use http1_wire::encoding::DecoderRegistry;
use http1_wire::parser::{RequestParser, ResponseWriter};
use http1_wire::protocol::{
    FramingMode, HeaderTable, HttpError, Method, ParseError, ResponseHead, SendError,
    is_persistent, status_has_body,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::content::{decode_content, default_registry};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(60);

const CONTINUE_INTERIM: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";
const RESPONSE_BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
const RESPONSE_REQUEST_TIMEOUT: &[u8] =
    b"HTTP/1.1 408 Request Timeout\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
const RESPONSE_HEADER_TOO_LARGE: &[u8] =
    b"HTTP/1.1 431 Request Header Fields Too Large\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
const RESPONSE_INTERNAL_ERROR: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
const RESPONSE_NOT_IMPLEMENTED: &[u8] =
    b"HTTP/1.1 501 Not Implemented\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";

/// One accepted connection, processed until it closes.
#[derive(Debug)]
pub struct ServerConnection<R, W> {
    parser: RequestParser<R>,
    writer: ResponseWriter<W>,
    registry: Arc<DecoderRegistry>,
    keep_alive_timeout: Duration,
}

impl<R, W> ServerConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            parser: RequestParser::new(reader, ParserConfig::default()),
            writer: ResponseWriter::new(writer),
            registry: Arc::new(default_registry()),
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
        }
    }

    pub fn with_parser_config(self, config: ParserConfig) -> Self {
        let Self { parser, writer, registry, keep_alive_timeout } = self;
        Self { parser: RequestParser::new(parser.into_inner(), config), writer, registry, keep_alive_timeout }
    }

    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub fn with_registry(mut self, registry: Arc<DecoderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Runs the request/response loop until the connection is done.
    ///
    /// Returns `Ok` when the peer closed cleanly, the exchange asked for
    /// closure, or the keep-alive timer fired; returns the parse error after
    /// a canned response was attempted for it.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            let message = match timeout(self.keep_alive_timeout, self.parser.parse_request()).await
            {
                Err(_elapsed) => {
                    debug!("keep-alive timer fired, closing the connection");
                    if let Err(e) = write_raw(self.writer.get_mut(), RESPONSE_REQUEST_TIMEOUT).await
                    {
                        debug!(cause = %e, "peer already gone before the timeout response");
                    }
                    return Ok(());
                }
                Ok(Ok(None)) => {
                    debug!("peer closed between requests");
                    return Ok(());
                }
                Ok(Ok(Some(message))) => message,
                Ok(Err(e)) => {
                    error!(cause = %e, "request parsing failed");
                    self.answer_failure(&e).await;
                    return Err(e.into());
                }
            };

            if wants_continue(message.head().headers()) && message.framing() != FramingMode::NoBody
            {
                write_raw(self.writer.get_mut(), CONTINUE_INTERIM).await.map_err(SendError::io)?;
                info!("expect header honored, interim continue sent");
            }

            let (head, body) = match message.eagerly().await {
                Ok(parts) => parts,
                Err(e) => {
                    error!(cause = %e, "request body could not be read");
                    self.answer_failure(&e).await;
                    return Err(e.into());
                }
            };

            let persistent = is_persistent(head.version(), head.headers());
            let request_method = head.method().clone();
            let body = match decode_content(&self.registry, head.headers(), body.into_bytes()) {
                Ok(decoded) => decoded,
                Err(e) => {
                    error!(cause = %e, "request body content decoding failed");
                    self.answer_failure(&e).await;
                    return Err(e.into());
                }
            };

            let response = match handler.handle(Request::from_parts(head, body)).await {
                Ok(response) => response,
                Err(e) => {
                    error!(cause = %e, "handler failed");
                    if let Err(we) = write_raw(self.writer.get_mut(), RESPONSE_INTERNAL_ERROR).await
                    {
                        debug!(cause = %we, "peer already gone before the error response");
                    }
                    return Ok(());
                }
            };

            let close_after = !persistent || wants_close(response.headers());
            let framing = response_framing(&request_method, &response);
            let (head, body) = finalize_response(response, close_after);
            let body = if framing == FramingMode::NoBody { Bytes::new() } else { body };
            self.writer.write_response(head, framing, body).await?;
            debug!(?framing, persistent = !close_after, "response written");

            if close_after {
                return Ok(());
            }
        }
    }

    async fn answer_failure(&mut self, error: &ParseError) {
        let Some(canned) = canned_response(error) else {
            return;
        };
        if let Err(e) = write_raw(self.writer.get_mut(), canned).await {
            debug!(cause = %e, "peer already gone before the failure response");
        }
    }
}

/// The canned response for a parse failure, if the peer is still worth
/// answering.
fn canned_response(error: &ParseError) -> Option<&'static [u8]> {
    match error {
        ParseError::MalformedHeader { reason } if reason.starts_with("message head exceeds") => {
            Some(RESPONSE_HEADER_TOO_LARGE)
        }
        ParseError::MalformedStartLine { .. }
        | ParseError::MalformedHeader { .. }
        | ParseError::InvalidMessageFrame { .. }
        | ParseError::MalformedChunkEncoding { .. } => Some(RESPONSE_BAD_REQUEST),
        ParseError::UnknownEncoding { .. } => Some(RESPONSE_NOT_IMPLEMENTED),
        // the peer is gone or the socket broke, nobody is listening
        ParseError::UnexpectedEndOfStream { .. } | ParseError::Io { .. } => None,
    }
}

fn wants_continue(headers: &HeaderTable) -> bool {
    headers.get("expect").is_some_and(|value| value.trim().eq_ignore_ascii_case("100-continue"))
}

fn wants_close(headers: &HeaderTable) -> bool {
    headers
        .get_all("connection")
        .iter()
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

fn response_framing(request_method: &Method, response: &Response) -> FramingMode {
    if *request_method == Method::Head || !status_has_body(response.status()) {
        FramingMode::NoBody
    } else if response.headers().contains("transfer-encoding") {
        FramingMode::Chunked
    } else {
        FramingMode::ContentLength(response.body().len() as u64)
    }
}

/// Splits the response, appending a `Connection: close` token when the
/// connection will not be reused and the handler did not set one.
fn finalize_response(response: Response, close: bool) -> (ResponseHead, Bytes) {
    let add_close = close && !wants_close(response.headers());
    let (head, body) = response.into_parts();
    if !add_close {
        return (head, body);
    }
    let mut builder = HeaderTable::builder();
    for entry in head.headers().entries() {
        builder = builder.insert(entry.name(), entry.value());
    }
    let headers = builder.insert("Connection", "close").build();
    (ResponseHead::new(head.status_line().clone(), headers), body)
}

async fn write_raw<W>(writer: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("server address must be set and resolvable")]
    MissingAddress,
    #[error("request handler must be set")]
    MissingHandler,
}

/// Builds a [`Server`] step by step.
pub struct ServerBuilder {
    address: Option<Vec<SocketAddr>>,
    handler: Option<Arc<dyn Handler>>,
    parser_config: ParserConfig,
    keep_alive_timeout: Duration,
    registry: Arc<DecoderRegistry>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("address", &self.address)
            .field("parser_config", &self.parser_config)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            address: None,
            handler: None,
            parser_config: ParserConfig::default(),
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            registry: Arc::new(default_registry()),
        }
    }

    pub fn address<A: std::net::ToSocketAddrs>(mut self, address: A) -> Self {
        match address.to_socket_addrs() {
            Ok(addrs) => self.address = Some(addrs.collect()),
            Err(e) => {
                warn!(cause = %e, "address resolution failed");
                self.address = None;
            }
        }
        self
    }

    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn parser_config(mut self, config: ParserConfig) -> Self {
        self.parser_config = config;
        self
    }

    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub fn registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        Ok(Server {
            address,
            handler,
            parser_config: self.parser_config,
            keep_alive_timeout: self.keep_alive_timeout,
            registry: self.registry,
        })
    }
}

/// The accept loop: binds, accepts, and spawns a task per connection.
pub struct Server {
    address: Vec<SocketAddr>,
    handler: Arc<dyn Handler>,
    parser_config: ParserConfig,
    keep_alive_timeout: Duration,
    registry: Arc<DecoderRegistry>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.address)
            .field("parser_config", &self.parser_config)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and serves until the process dies. Accept errors are logged
    /// and skipped; per-connection failures never take the loop down.
    pub async fn start(self) -> io::Result<()> {
        info!(address = ?self.address, "start listening");
        let listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e);
            }
        };

        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let registry = Arc::clone(&self.registry);
            let parser_config = self.parser_config;
            let keep_alive_timeout = self.keep_alive_timeout;

            tokio::spawn(async move {
                debug!(%remote_addr, "connection accepted");
                let (reader, writer) = stream.into_split();
                let connection = ServerConnection::new(reader, writer)
                    .with_parser_config(parser_config)
                    .with_keep_alive_timeout(keep_alive_timeout)
                    .with_registry(registry);
                match connection.process(handler).await {
                    Ok(()) => info!(%remote_addr, "connection closed"),
                    Err(e) => error!(%remote_addr, cause = %e, "connection failed"),
                }
            });
        }
    }
}
