//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 implementado sobre `std::net`, sin frameworks:
//!
//! - Parsing de requests (request line, headers, body con `Content-Length`)
//! - Construcción de responses con body JSON
//! - Status codes que usa la API de jobs
//!
//! Se aceptan request lines `HTTP/1.1` para que clientes modernos (curl,
//! load balancers) puedan hablar con el servidor, pero la respuesta siempre
//! es `HTTP/1.0` con `Connection: close`.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::{ErrorCategory, Response};
pub use status::StatusCode;
