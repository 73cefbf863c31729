//! # Supervisor del Proceso
//! src/server/supervisor.rs
//!
//! Orden de arranque:
//!
//! 1. Validar configuración
//! 2. Abrir el Output Store (el directorio debe existir)
//! 3. Bind del puerto y arranque del pool
//! 4. Accept loop hasta shutdown
//!
//! Cualquier fallo antes del paso 4 es fatal: no hay reintentos.

use std::sync::Arc;

use super::tcp::Server;
use crate::config::Config;
use crate::jobs::{JobProcessor, JobRegistry};
use crate::pool::PoolError;
use crate::storage::{OutputStore, StoreError};

/// Errores fatales de arranque
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Output directory unavailable: {0}")]
    OutputDir(#[source] StoreError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] PoolError),
}

/// Deja el servidor listo para `run`, sin aceptar conexiones todavía
pub fn start(config: Arc<Config>) -> Result<Server, StartupError> {
    config.validate().map_err(StartupError::InvalidConfig)?;

    let store = OutputStore::open(&config.output_dir).map_err(StartupError::OutputDir)?;
    let registry = JobRegistry::with_builtin();
    let processor = JobProcessor::new(registry, store, config.request_timeout());

    let server = Server::bind(Arc::clone(&config), processor)?;

    tracing::info!(
        address = %server.local_addr(),
        output_dir = %config.output_dir,
        workers = config.workers,
        threads = config.threads,
        timeout = %config.request_timeout(),
        queue_capacity = ?config.queue_limit(),
        max_body_bytes = config.max_body_bytes,
        "Server configured"
    );

    Ok(server)
}

/// Arranca y bloquea hasta el shutdown
pub fn run(config: Config) -> Result<(), StartupError> {
    let server = start(Arc::new(config))?;
    server.run();
    Ok(())
}
