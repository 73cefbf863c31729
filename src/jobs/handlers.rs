//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Endpoints del sistema de jobs:
//! - `POST /jobs`
//! - `GET /artifacts?id=ID`
//! - `GET /jobs/kinds`

use serde_json::json;

use crate::http::{ErrorCategory, Request, Response, StatusCode};
use crate::jobs::processor::JobProcessor;
use crate::jobs::types::{JobError, JobRequest};
use crate::storage::StoreError;

/// Handler para `POST /jobs`
///
/// Ejecuta el job en el thread actual y responde cuando el artifact ya está
/// en disco.
///
/// # Ejemplo de request
/// ```json
/// {"job": "echo", "data": "hello"}
/// ```
///
/// # Ejemplo de response
/// ```json
/// {"status": "success", "artifact_id": "0192...", "location": "/artifacts?id=0192..."}
/// ```
pub fn submit_handler(req: &Request, processor: &JobProcessor) -> Response {
    let result = JobRequest::from_body(req.body()).and_then(|job| processor.process(job));

    match result {
        Ok(result) => result.to_response(),
        Err(error) => {
            log_job_error(&error);
            error.to_response()
        }
    }
}

/// Handler para `GET /artifacts?id=ID`
///
/// Devuelve el documento guardado tal cual está en disco.
pub fn artifact_handler(req: &Request, processor: &JobProcessor) -> Response {
    let Some(id) = req.query_param("id") else {
        return Response::error(
            StatusCode::BadRequest,
            ErrorCategory::Client,
            "Missing required parameter: id",
        );
    };

    match processor.store().get(id) {
        Ok(content) => Response::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body_bytes(content),
        Err(error @ StoreError::InvalidId(_)) => {
            Response::error(StatusCode::BadRequest, ErrorCategory::Client, &error.to_string())
        }
        Err(error @ StoreError::NotFound(_)) => {
            Response::error(StatusCode::NotFound, ErrorCategory::Client, &error.to_string())
        }
        Err(error) => {
            tracing::error!(artifact_id = %id, error = %error, "Failed to read artifact");
            Response::error(
                StatusCode::InternalServerError,
                ErrorCategory::Storage,
                &error.to_string(),
            )
        }
    }
}

/// Handler para `GET /jobs/kinds`
pub fn kinds_handler(_req: &Request, processor: &JobProcessor) -> Response {
    let kinds = processor.registry().kinds();
    Response::json(
        StatusCode::Ok,
        &json!({
            "count": kinds.len(),
            "kinds": kinds,
        }),
    )
}

/// Errores del cliente son `warn`; el resto `error`
fn log_job_error(error: &JobError) {
    match error.category() {
        ErrorCategory::Client => {
            tracing::warn!(error = %error, "Rejected job request");
        }
        ErrorCategory::Processing | ErrorCategory::Storage => {
            tracing::error!(
                category = ?error.category(),
                error = %error,
                "Job failed"
            );
        }
    }
}
