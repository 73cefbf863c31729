//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes y las encola en el pool
//! 3. Lee y parsea requests HTTP (en un thread del pool)
//! 4. Genera y envía responses HTTP

pub mod connection;
pub mod routes;
pub mod supervisor;
pub mod tcp;

pub use connection::MAX_HEADER_BYTES;
pub use supervisor::{run, start, StartupError};
pub use tcp::{Server, ShutdownHandle};
