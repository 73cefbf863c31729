//! # Job Server - Entry Point
//! src/main.rs
//!
//! Lee la configuración (CLI o entorno), inicializa logs y corre el
//! servidor hasta que termine.
//!
//! Códigos de salida: 0 apagado limpio, 1 fallo de arranque, 2 argumentos
//! inválidos (lo resuelve clap).

use std::process::ExitCode;

use job_server::config::Config;
use job_server::{logging, server};

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = logging::init(config.log_format) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting job_server");

    match server::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}
