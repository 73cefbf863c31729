//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración inmutable, leída una sola vez al arrancar desde argumentos
//! CLI o variables de entorno. Después se comparte como `Arc<Config>`.
//!
//! ## Ejemplos de uso
//!
//! ### Variables de entorno (contenedor)
//! ```bash
//! PORT=8080 OUTPUT_DIR=/app/output THREADS=8 ./job_server
//! ```
//!
//! ### CLI
//! ```bash
//! ./job_server --port 9000 --output-dir ./output --threads 4 --timeout-ms 30000
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Formato de los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Texto legible, una línea por evento
    Text,
    /// Un objeto JSON por línea
    Json,
}

/// Política de timeout por request
///
/// `Unbounded` es explícito: un job largo puede ocupar su thread todo el
/// tiempo que necesite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTimeout {
    Unbounded,
    After(Duration),
}

impl RequestTimeout {
    /// `0` significa sin límite
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            RequestTimeout::Unbounded
        } else {
            RequestTimeout::After(Duration::from_millis(ms))
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            RequestTimeout::Unbounded => None,
            RequestTimeout::After(d) => Some(*d),
        }
    }
}

impl std::fmt::Display for RequestTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestTimeout::Unbounded => write!(f, "unbounded"),
            RequestTimeout::After(d) => write!(f, "{} ms", d.as_millis()),
        }
    }
}

/// Configuración del servidor de jobs
#[derive(Debug, Clone, Parser)]
#[command(name = "job_server")]
#[command(about = "Servidor HTTP/1.0 que ejecuta jobs y guarda sus artifacts en disco")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Directorio de artifacts; debe existir antes de arrancar
    #[arg(long = "output-dir", default_value = "/app/output", env = "OUTPUT_DIR")]
    pub output_dir: String,

    // === Supervisor ===

    /// Procesos worker (solo se soporta 1)
    #[arg(long, default_value = "1", env = "WORKERS")]
    pub workers: usize,

    /// Threads por worker atendiendo requests
    #[arg(long, default_value = "8", env = "THREADS")]
    pub threads: usize,

    /// Timeout por request en milisegundos (0 = sin límite)
    #[arg(long = "timeout-ms", default_value = "0", env = "REQUEST_TIMEOUT_MS")]
    pub timeout_ms: u64,

    // === Backpressure ===

    /// Conexiones en espera antes de responder 503 (0 = sin límite)
    #[arg(long = "queue-capacity", default_value = "0", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Segundos sugeridos en `Retry-After` cuando la cola está llena
    #[arg(long = "retry-after-secs", default_value = "5", env = "RETRY_AFTER_SECS")]
    pub retry_after_secs: u64,

    // === Límites ===

    /// Tamaño máximo del body de un request
    #[arg(long = "max-body-bytes", default_value = "1048576", env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // === Logging ===

    /// Formato de logs
    #[arg(long = "log-format", value_enum, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn from_env() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// ```
    /// use job_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> RequestTimeout {
        RequestTimeout::from_millis(self.timeout_ms)
    }

    /// `None` = cola sin límite
    pub fn queue_limit(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.workers != 1 {
            return Err(format!(
                "Only one worker process is supported (got {})",
                self.workers
            ));
        }
        if self.threads == 0 {
            return Err("Threads must be >= 1".to_string());
        }
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.output_dir.trim().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("Max body bytes must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    /// Mismos valores que los defaults de clap
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            output_dir: "/app/output".to_string(),
            workers: 1,
            threads: 8,
            timeout_ms: 0,
            queue_capacity: 0,
            retry_after_secs: 5,
            max_body_bytes: 1024 * 1024,
            log_format: LogFormat::Text,
        }
    }
}
