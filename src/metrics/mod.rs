//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección y agregación de métricas del servidor:
//! - Contadores de requests por status y por path
//! - Latencias (p50, p95, p99)
//! - Threads ocupados y conexiones rechazadas

pub mod collector;

pub use collector::{LatencySummary, MetricsCollector, MetricsSnapshot};
