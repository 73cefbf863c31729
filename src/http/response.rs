//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API tipo builder para armar respuestas HTTP/1.0 y serializarlas a bytes.
//!
//! ```
//! use job_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"status": "healthy"}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// BTreeMap para que el orden de los headers sea estable en el wire
    headers: BTreeMap<String, String>,

    body: Vec<u8>,
}

/// Familia de un error de la API, viaja en el body como `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Input inválido del cliente (4xx)
    Client,
    /// Fallo ejecutando el job (5xx)
    Processing,
    /// Colisión de id o fallo de escritura (5xx)
    Storage,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega (o sobrescribe) un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Body de texto; calcula `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Body binario; calcula `Content-Length`
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        let len = self.body.len().to_string();
        self.headers.insert("Content-Length".to_string(), len);
        self
    }

    /// Respuesta JSON con el status indicado
    ///
    /// ```
    /// use job_server::http::{Response, StatusCode};
    /// use serde_json::json;
    ///
    /// let response = Response::json(StatusCode::Ok, &json!({"status": "healthy"}));
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        // Serializar un Value o un struct derivado no falla en la práctica;
        // si fallara devolvemos un 500 en vez de entrar en pánico.
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body_bytes(body),
            Err(e) => Self::error(
                StatusCode::InternalServerError,
                ErrorCategory::Processing,
                &format!("Failed to serialize response: {}", e),
            ),
        }
    }

    /// Respuesta de error
    ///
    /// Formato: `{"status": "error", "category": "client", "error": "mensaje"}`
    pub fn error(status: StatusCode, category: ErrorCategory, message: &str) -> Self {
        let body = serde_json::json!({
            "status": "error",
            "category": category,
            "error": message,
        });
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body.to_string())
    }

    /// Serializa: status line, headers, línea vacía, body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    /// Igual que `to_bytes` pero sin body (para HEAD)
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes.truncate(bytes.len() - self.body.len());
        bytes
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
