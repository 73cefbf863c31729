//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que el servidor de jobs puede devolver. Cada error de la API cae
//! en una de estas familias:
//!
//! - **2xx**: job ejecutado y artifact guardado
//! - **4xx**: payload inválido, ruta o artifact inexistente, método incorrecto
//! - **5xx**: fallo del job, del storage, cola llena o deadline vencido

/// Códigos de estado soportados por el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 400 Bad Request - payload malformado o parámetros inválidos
    BadRequest = 400,

    /// 404 Not Found - ruta o artifact inexistente
    NotFound = 404,

    /// 405 Method Not Allowed - la ruta existe pero no con ese método
    MethodNotAllowed = 405,

    /// 413 Payload Too Large - body mayor que `max_body_bytes`
    PayloadTooLarge = 413,

    /// 500 Internal Server Error - fallo del job o del storage
    InternalServerError = 500,

    /// 503 Service Unavailable - cola del pool llena
    ServiceUnavailable = 503,

    /// 504 Gateway Timeout - el job terminó después de su deadline
    GatewayTimeout = 504,
}

impl StatusCode {
    /// Valor numérico del código
    ///
    /// # Ejemplo
    /// ```
    /// use job_server::http::StatusCode;
    /// assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Reason phrase estándar (RFC 1945 / RFC 7231)
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::GatewayTimeout => "Gateway Timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato de la status line: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
