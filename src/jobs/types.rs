//! # Tipos del Sistema de Jobs
//! src/jobs/types.rs
//!
//! Job Request (lo que llega por HTTP), Artifact (lo que se guarda) y la
//! taxonomía de errores que se traduce a status codes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::{ErrorCategory, Response, StatusCode};
use crate::storage::{self, StoreError};

/// Unidad de trabajo recibida por HTTP
///
/// El payload es un objeto JSON:
///
/// ```json
/// {"job": "echo", "data": "hello", "id": "opcional"}
/// ```
///
/// `job` elige el handler; todo lo demás (salvo `id`) son parámetros.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Tipo de job (`echo`, `sha256`, ...)
    pub kind: String,

    /// Id pedido por el cliente; si falta se genera uno
    pub id: Option<String>,

    /// Parámetros del job
    pub params: Map<String, Value>,

    pub received_at: DateTime<Utc>,
}

impl JobRequest {
    /// Valida y construye un request desde el body HTTP
    pub fn from_body(body: &[u8]) -> Result<Self, JobError> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(JobError::InvalidRequest("Request body is empty".to_string()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| JobError::InvalidRequest(format!("Malformed JSON: {}", e)))?;

        let Value::Object(mut params) = value else {
            return Err(JobError::InvalidRequest(
                "Request body must be a JSON object".to_string(),
            ));
        };

        let kind = match params.remove("job") {
            Some(Value::String(kind)) if !kind.trim().is_empty() => kind,
            Some(_) => {
                return Err(JobError::InvalidRequest(
                    "Field 'job' must be a non-empty string".to_string(),
                ))
            }
            None => {
                return Err(JobError::InvalidRequest(
                    "Missing required field: job".to_string(),
                ))
            }
        };

        let id = match params.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => {
                storage::validate_id(&id).map_err(|_| {
                    JobError::InvalidRequest(format!(
                        "Field 'id' must match [A-Za-z0-9_-]{{1,{}}}",
                        storage::MAX_ID_LEN
                    ))
                })?;
                Some(id)
            }
            Some(_) => {
                return Err(JobError::InvalidRequest(
                    "Field 'id' must be a string".to_string(),
                ))
            }
        };

        Ok(Self {
            kind,
            id,
            params,
            received_at: Utc::now(),
        })
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Parámetro requerido de tipo string
    pub fn param_str(&self, name: &str) -> Result<&str, JobError> {
        match self.params.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(JobError::InvalidRequest(format!(
                "Parameter '{}' must be a string",
                name
            ))),
            None => Err(JobError::InvalidRequest(format!(
                "Missing required parameter: {}",
                name
            ))),
        }
    }

    /// Parámetro requerido entero dentro de `[min, max]`
    pub fn param_u64_in(&self, name: &str, min: u64, max: u64) -> Result<u64, JobError> {
        let value = self.params.get(name).ok_or_else(|| {
            JobError::InvalidRequest(format!("Missing required parameter: {}", name))
        })?;

        match value.as_u64() {
            Some(n) if (min..=max).contains(&n) => Ok(n),
            _ => Err(JobError::InvalidRequest(format!(
                "Parameter '{}' must be an integer between {} and {}",
                name, min, max
            ))),
        }
    }
}

/// Documento que se guarda en el Output Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub job: String,
    pub created_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub input: Value,
    pub output: Value,
}

/// Resultado de un job exitoso
#[derive(Debug, Clone)]
pub struct JobResult {
    pub artifact: Artifact,

    /// Bytes escritos en el store
    pub size: u64,
}

impl JobResult {
    /// Body de la respuesta HTTP de `/jobs`
    pub fn to_response(&self) -> Response {
        let body = serde_json::json!({
            "status": "success",
            "message": format!("Job '{}' completed", self.artifact.job),
            "artifact_id": self.artifact.id,
            "job": self.artifact.job,
            "created_at": self.artifact.created_at,
            "duration_ms": self.artifact.duration_ms,
            "size_bytes": self.size,
            "location": format!("/artifacts?id={}", self.artifact.id),
            "output": self.artifact.output,
        });
        Response::json(StatusCode::Ok, &body)
    }
}

/// Errores de un job
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    #[error("Unknown job kind: {0}")]
    UnknownKind(String),

    #[error("Job failed: {0}")]
    Failed(String),

    #[error("Job exceeded its deadline of {} ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JobError::InvalidRequest(_) | JobError::UnknownKind(_) => ErrorCategory::Client,
            JobError::Failed(_) | JobError::TimedOut(_) => ErrorCategory::Processing,
            JobError::Store(_) => ErrorCategory::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            JobError::InvalidRequest(_) | JobError::UnknownKind(_) => StatusCode::BadRequest,
            JobError::TimedOut(_) => StatusCode::GatewayTimeout,
            JobError::Failed(_) | JobError::Store(_) => StatusCode::InternalServerError,
        }
    }

    pub fn to_response(&self) -> Response {
        Response::error(self.status(), self.category(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_echo() {
        let request = JobRequest::from_body(br#"{"job":"echo","data":"hello"}"#).unwrap();

        assert_eq!(request.kind, "echo");
        assert_eq!(request.id, None);
        assert_eq!(request.param_str("data").unwrap(), "hello");
        // `job` no queda entre los parámetros
        assert!(request.param("job").is_none());
    }

    #[test]
    fn test_from_body_with_id() {
        let request = JobRequest::from_body(br#"{"job":"echo","data":1,"id":"run_42"}"#).unwrap();
        assert_eq!(request.id.as_deref(), Some("run_42"));
        assert!(request.param("id").is_none());
    }

    #[test]
    fn test_from_body_rejections() {
        let cases: [&[u8]; 8] = [
            b"",
            b"   \n",
            b"not json",
            b"[1,2,3]",
            br#"{"data":"no kind"}"#,
            br#"{"job":42}"#,
            br#"{"job":"  "}"#,
            br#"{"job":"echo","id":"../etc/passwd"}"#,
        ];

        for body in cases {
            let result = JobRequest::from_body(body);
            assert!(
                matches!(result, Err(JobError::InvalidRequest(_))),
                "body {:?} should be rejected",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_param_u64_in() {
        let request = JobRequest::from_body(br#"{"job":"sleep","ms":250,"neg":-1}"#).unwrap();

        assert_eq!(request.param_u64_in("ms", 1, 1000).unwrap(), 250);
        assert!(request.param_u64_in("ms", 1, 100).is_err());
        assert!(request.param_u64_in("neg", 0, 10).is_err());
        assert!(request.param_u64_in("missing", 0, 10).is_err());
    }

    #[test]
    fn test_error_taxonomy() {
        let client = JobError::InvalidRequest("x".into());
        assert_eq!(client.status(), StatusCode::BadRequest);
        assert_eq!(client.category(), ErrorCategory::Client);

        let unknown = JobError::UnknownKind("nope".into());
        assert_eq!(unknown.status(), StatusCode::BadRequest);

        let failed = JobError::Failed("x".into());
        assert_eq!(failed.status(), StatusCode::InternalServerError);
        assert_eq!(failed.category(), ErrorCategory::Processing);

        let timeout = JobError::TimedOut(Duration::from_millis(10));
        assert_eq!(timeout.status(), StatusCode::GatewayTimeout);
        assert_eq!(timeout.category(), ErrorCategory::Processing);

        let store = JobError::from(StoreError::AlreadyExists("a".into()));
        assert_eq!(store.status(), StatusCode::InternalServerError);
        assert_eq!(store.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_error_response_body() {
        let response = JobError::UnknownKind("nope".into()).to_response();
        let body: Value = serde_json::from_slice(response.body()).unwrap();

        assert_eq!(body["category"], "client");
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }
}
