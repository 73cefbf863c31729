//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El thread principal solo acepta conexiones y las encola en el pool; los
//! N threads del pool parsean, ejecutan el job y responden.
//!
//! ```text
//! accept() ──► pool.execute(conexión) ──► worker: read → route → write
//!    │
//!    └── cola llena → 503 + Retry-After, sin pasar por el pool
//! ```

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use super::connection::{self, ConnectionContext};
use super::routes;
use super::supervisor::StartupError;
use crate::config::Config;
use crate::http::{ErrorCategory, Response, StatusCode};
use crate::jobs::JobProcessor;
use crate::metrics::MetricsCollector;
use crate::pool::{Executor, WorkerPool};
use crate::router;

/// Pausa tras un error de `accept` (ej. sin file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Límite para escribir un 503 desde el thread de accept
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const REJECT_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Servidor HTTP/1.0 con pool fijo de threads
pub struct Server {
    config: Arc<Config>,
    listener: TcpListener,
    local_addr: SocketAddr,
    pool: Arc<WorkerPool>,
    ctx: Arc<ConnectionContext>,
    metrics: MetricsCollector,
    shutdown: Arc<AtomicBool>,
}

/// Detiene el accept loop desde otro thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Pide el apagado y despierta al `accept` bloqueado
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        // Una conexión propia hace que accept() retorne y vea el flag
        let wake = TcpStream::connect_timeout(&wake_addr(self.addr), Duration::from_secs(1));
        if let Err(e) = wake {
            tracing::debug!(error = %e, "Wake-up connection failed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Server {
    /// Hace bind del puerto y arranca el pool
    pub fn bind(config: Arc<Config>, processor: JobProcessor) -> Result<Self, StartupError> {
        let address = config.address();
        let listener = TcpListener::bind(&address).map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { address, source })?;

        let pool = Arc::new(WorkerPool::new(config.threads, config.queue_limit())?);
        let metrics = MetricsCollector::new();

        let executor: Arc<dyn Executor> = pool.clone();
        let router = routes::build_router(processor, metrics.clone(), executor);

        let ctx = Arc::new(ConnectionContext {
            router: Arc::new(router),
            metrics: metrics.clone(),
            max_body_bytes: config.max_body_bytes,
        });

        Ok(Self {
            config,
            listener,
            local_addr,
            pool,
            ctx,
            metrics,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Dirección real (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr,
        }
    }

    /// Accept loop; retorna cuando se pide shutdown y el pool terminó
    pub fn run(self) {
        tracing::info!(
            address = %self.local_addr,
            threads = self.pool.size(),
            "Server listening"
        );

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => self.dispatch(stream),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }

        let stats = self.pool.stats();
        tracing::info!(
            in_flight = stats.busy,
            queued = stats.queued,
            "Shutting down, draining worker pool"
        );
        self.pool.shutdown();
        tracing::info!("Server stopped");
    }

    /// Encola la conexión o la rechaza si la cola está llena
    fn dispatch(&self, stream: TcpStream) {
        // Solo este thread encola, así que la cola no puede llenarse entre
        // este chequeo y el execute()
        let stats = self.pool.stats();
        if let Some(capacity) = stats.capacity {
            if stats.queued >= capacity {
                self.reject_busy(stream, capacity);
                return;
            }
        }

        let ctx = Arc::clone(&self.ctx);
        let task = Box::new(move || connection::handle_connection(stream, &ctx));
        if let Err(e) = self.pool.execute(task) {
            tracing::error!(error = %e, "Failed to dispatch connection");
        }
    }

    fn reject_busy(&self, mut stream: TcpStream, capacity: usize) {
        self.metrics.record_rejected();
        tracing::warn!(capacity, "Worker queue full, rejecting connection");

        let mut response = busy_response(self.config.retry_after_secs);
        router::add_common_headers(&mut response);
        connection::add_worker_headers(&mut response, &Uuid::now_v7().to_string());

        let written = stream
            .set_write_timeout(Some(REJECT_WRITE_TIMEOUT))
            .and_then(|_| stream.write_all(&response.to_bytes()))
            .and_then(|_| stream.shutdown(Shutdown::Write));
        if let Err(e) = written {
            tracing::debug!(error = %e, "Failed to write 503 response");
            return;
        }

        // Cerrar con el request sin leer manda RST y el cliente puede perder
        // el 503; se descarta lo que haya llegado hasta que cierre el peer
        if stream.set_read_timeout(Some(REJECT_DRAIN_TIMEOUT)).is_ok() {
            let mut sink = [0u8; 1024];
            while matches!(stream.read(&mut sink), Ok(n) if n > 0) {}
        }
    }
}

/// Respuesta cuando no hay lugar en la cola
pub(crate) fn busy_response(retry_after_secs: u64) -> Response {
    Response::error(
        StatusCode::ServiceUnavailable,
        ErrorCategory::Processing,
        "Server is busy, retry later",
    )
    .with_header("Retry-After", &retry_after_secs.to_string())
}

/// `0.0.0.0` no es conectable; se usa loopback con el mismo puerto
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}
