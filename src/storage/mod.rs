//! # Storage de Artifacts
//! src/storage/mod.rs
//!
//! Directorio de salida donde cada job exitoso deja exactamente un artifact.

pub mod output_store;

pub use output_store::{validate_id, OutputStore, StoreError, StoredEntry, MAX_ID_LEN};
