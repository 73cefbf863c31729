//! # Logging
//! src/logging.rs
//!
//! `tracing` + `tracing-subscriber`. El nivel sale de `RUST_LOG`
//! (default `job_server=info`); el formato de `--log-format`.
//!
//! Cada evento se escribe completo al momento, sin buffer intermedio.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

/// Filtro cuando `RUST_LOG` no está definida
pub const DEFAULT_FILTER: &str = "job_server=info";

/// Instala el subscriber global
///
/// Falla si ya había uno instalado (ej. dos llamadas en el mismo proceso).
pub fn init(format: LogFormat) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (text, json) = match format {
        LogFormat::Text => (Some(fmt::layer().with_thread_names(true)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_thread_names(true).with_current_span(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
}
