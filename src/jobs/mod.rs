//! # Sistema de Jobs
//! src/jobs/mod.rs
//!
//! Un Job Request llega por `POST /jobs`, se ejecuta en el thread que atiende
//! la conexión y su resultado queda como artifact en el Output Store.
//!
//! ## Endpoints
//!
//! - `POST /jobs` - Ejecutar un job
//! - `GET /artifacts?id=ID` - Leer un artifact
//! - `GET /jobs/kinds` - Tipos de job disponibles

pub mod handlers;
pub mod kinds;
pub mod processor;
pub mod registry;
pub mod types;

pub use kinds::{JobContext, JobHandler};
pub use processor::JobProcessor;
pub use registry::JobRegistry;
pub use types::{Artifact, JobError, JobRequest, JobResult};
