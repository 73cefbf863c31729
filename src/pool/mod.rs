//! # Pool de Threads
//! src/pool/mod.rs
//!
//! Cada conexión aceptada se atiende en uno de los N threads del pool.

pub mod worker_pool;

pub use worker_pool::{Executor, PoolError, PoolStats, Task, TaskHandle, WorkerPool};
