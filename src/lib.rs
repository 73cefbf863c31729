//! # Job Server
//! src/lib.rs
//!
//! Servicio HTTP/1.0 que recibe Job Requests, ejecuta el trabajo en un pool
//! fijo de threads y guarda cada resultado como artifact JSON en un
//! directorio de salida.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y serialización del protocolo HTTP/1.0
//! - `server`: supervisor, accept loop y manejo de conexiones
//! - `router`: enrutamiento (método, path) → handler
//! - `pool`: pool de threads con cola FIFO
//! - `jobs`: tipos de job, processor y handlers HTTP
//! - `storage`: Output Store de artifacts
//! - `metrics`: métricas en memoria para `/metrics`
//! - `config` / `logging`: configuración (clap) y `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use job_server::config::Config;
//!
//! let config = Config::default();
//! if let Err(e) = job_server::server::run(config) {
//!     eprintln!("{}", e);
//! }
//! ```

pub mod config;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod router;
pub mod server;
pub mod storage;
