//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Corre dentro de un thread del pool:
//!
//! ```text
//! leer head (≤ 16 KiB) → leer body (Content-Length ≤ max) → route → escribir
//! ```
//!
//! Una conexión = un request = una respuesta (`Connection: close`).

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::http::request::{content_length, find_header_end, HEADER_TERMINATOR};
use crate::http::{ErrorCategory, Method, ParseError, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::{self, Router};

/// Límite para request line + headers
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Clave de métricas para paths sin ruta; evita que URLs basura
/// ocupen los contadores por path
pub const UNMATCHED_PATH: &str = "(unmatched)";

/// Un cliente que no manda nada no retiene un thread para siempre
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Estado compartido por todas las conexiones
pub(crate) struct ConnectionContext {
    pub router: Arc<Router>,
    pub metrics: MetricsCollector,
    pub max_body_bytes: usize,
}

/// Fallos al leer un request del socket
#[derive(Debug, thiserror::Error)]
pub(crate) enum ReadError {
    /// El peer cerró sin mandar nada
    #[error("Connection closed by peer")]
    Closed,

    #[error("Request head exceeds {} bytes", MAX_HEADER_BYTES)]
    HeadersTooLarge,

    #[error("Request body of {length} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("Connection closed before the full body arrived")]
    IncompleteBody,

    #[error("Malformed request: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// Respuesta para el cliente; `None` si no tiene sentido contestar
    fn to_response(&self) -> Option<Response> {
        let status = match self {
            ReadError::Closed | ReadError::Io(_) => return None,
            ReadError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
            ReadError::HeadersTooLarge | ReadError::IncompleteBody | ReadError::Parse(_) => {
                StatusCode::BadRequest
            }
        };
        Some(Response::error(status, ErrorCategory::Client, &self.to_string()))
    }
}

/// Atiende una conexión completa
pub(crate) fn handle_connection(mut stream: TcpStream, ctx: &ConnectionContext) {
    let request_id = Uuid::now_v7().to_string();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let span = tracing::info_span!("connection", request_id = %request_id, peer = %peer);
    let _enter = span.enter();

    ctx.metrics.increment_active_threads();
    if let Err(e) = serve(&mut stream, ctx, &request_id) {
        tracing::debug!(error = %e, "Failed to write response");
    }
    ctx.metrics.decrement_active_threads();
}

fn serve(stream: &mut TcpStream, ctx: &ConnectionContext, request_id: &str) -> io::Result<()> {
    let start = Instant::now();
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

    let (mut response, method, path) = match read_request(stream, ctx.max_body_bytes) {
        Ok(request) => {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                "Request received"
            );
            let response = ctx.router.route(&request);
            let path = if ctx.router.has_path(request.path()) {
                request.path().to_string()
            } else {
                UNMATCHED_PATH.to_string()
            };
            (response, Some(request.method()), path)
        }
        Err(e) => match e.to_response() {
            Some(response) => {
                tracing::warn!(error = %e, "Rejected malformed request");
                (response, None, "(invalid)".to_string())
            }
            None => {
                tracing::debug!(error = %e, "Connection dropped before a request arrived");
                return Ok(());
            }
        },
    };

    router::add_common_headers(&mut response);
    add_worker_headers(&mut response, request_id);

    let bytes = if method == Some(Method::HEAD) {
        response.head_bytes()
    } else {
        response.to_bytes()
    };
    let written = stream.write_all(&bytes).and_then(|_| stream.flush());

    let latency = start.elapsed();
    let status = response.status();
    ctx.metrics.record_request(&path, status.as_u16(), latency);

    tracing::info!(
        method = method.map(|m| m.as_str()).unwrap_or("-"),
        path = %path,
        status = status.as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        "Request completed"
    );

    written
}

/// Headers de observabilidad: quién atendió el request
pub(crate) fn add_worker_headers(response: &mut Response, request_id: &str) {
    let thread = thread::current();
    let thread_name = thread
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", thread.id()));

    response.add_header("X-Request-Id", request_id);
    response.add_header("X-Worker-Thread", &thread_name);
    response.add_header("X-Worker-Pid", &std::process::id().to_string());
}

/// Lee head y body respetando los límites
fn read_request(stream: &mut impl Read, max_body_bytes: usize) -> Result<Request, ReadError> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(end) = find_header_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(ReadError::HeadersTooLarge);
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            if buffer.is_empty() {
                return Err(ReadError::Closed);
            }
            // Sin línea vacía final: se intenta igual con lo que llegó
            return Ok(Request::parse(&buffer)?);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let body_start = header_end + HEADER_TERMINATOR.len();
    if header_end > MAX_HEADER_BYTES {
        return Err(ReadError::HeadersTooLarge);
    }

    let request = Request::parse(&buffer[..body_start])?;

    // Sin Content-Length no hay body: el cliente espera la respuesta
    let length = content_length(request.headers())?.unwrap_or(0);
    if length > max_body_bytes {
        return Err(ReadError::BodyTooLarge {
            length,
            limit: max_body_bytes,
        });
    }

    let mut body = buffer.split_off(body_start);
    while body.len() < length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(ReadError::IncompleteBody);
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);

    Ok(request.with_body(body))
}
