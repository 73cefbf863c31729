//! # Job Processor
//! src/jobs/processor.rs
//!
//! Ejecuta un Job Request y deja exactamente un artifact en el store si
//! termina bien. Si algo falla no se escribe nada.
//!
//! ```text
//! JobRequest → registry.get(kind) → handler.run() → Artifact → store.put()
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::kinds::JobContext;
use super::registry::JobRegistry;
use super::types::{Artifact, JobError, JobRequest, JobResult};
use crate::config::RequestTimeout;
use crate::pool::worker_pool::panic_message;
use crate::storage::{OutputStore, StoreError};

/// Procesador compartido por todos los threads del pool
#[derive(Clone)]
pub struct JobProcessor {
    registry: Arc<JobRegistry>,
    store: Arc<OutputStore>,
    timeout: RequestTimeout,
}

impl JobProcessor {
    pub fn new(registry: JobRegistry, store: OutputStore, timeout: RequestTimeout) -> Self {
        Self {
            registry: Arc::new(registry),
            store: Arc::new(store),
            timeout,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn timeout(&self) -> RequestTimeout {
        self.timeout
    }

    /// Ejecuta el job y persiste su artifact
    pub fn process(&self, request: JobRequest) -> Result<JobResult, JobError> {
        let handler = self
            .registry
            .get(&request.kind)
            .ok_or_else(|| JobError::UnknownKind(request.kind.clone()))?;

        let id = match &request.id {
            Some(id) => {
                // No vale la pena correr un job cuyo id ya está ocupado
                if self.store.contains(id)? {
                    return Err(StoreError::AlreadyExists(id.clone()).into());
                }
                id.clone()
            }
            None => Uuid::now_v7().to_string(),
        };

        tracing::debug!(job = %request.kind, artifact_id = %id, "Running job");

        let ctx = JobContext::new(self.timeout);
        let output = panic::catch_unwind(AssertUnwindSafe(|| handler.run(&request, &ctx)))
            .map_err(|payload| {
                JobError::Failed(format!("job panicked: {}", panic_message(payload.as_ref())))
            })??;

        // Un job que terminó tarde no deja artifact
        ctx.check()?;

        let artifact = Artifact {
            id,
            job: request.kind,
            created_at: Utc::now(),
            received_at: request.received_at,
            duration_ms: u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX),
            input: Value::Object(request.params),
            output,
        };

        let content = serde_json::to_vec_pretty(&artifact)
            .map_err(|e| JobError::Failed(format!("Failed to serialize artifact: {}", e)))?;

        let entry = self.store.put(&artifact.id, &content)?;

        tracing::info!(
            job = %artifact.job,
            artifact_id = %artifact.id,
            duration_ms = artifact.duration_ms,
            size_bytes = entry.size,
            "Artifact stored"
        );

        Ok(JobResult {
            artifact,
            size: entry.size,
        })
    }

    /// Lee un artifact guardado
    pub fn artifact(&self, id: &str) -> Result<Artifact, JobError> {
        let bytes = self.store.get(id)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| JobError::Failed(format!("Stored artifact {} is corrupt: {}", id, e)))
    }
}
