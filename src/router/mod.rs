//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea (método, path) a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! - Path desconocido: 404 Not Found
//! - Path conocido con otro método: 405 Method Not Allowed (con `Allow`)
//! - `HEAD` usa el handler de `GET`; el body se descarta al escribir

use std::sync::Arc;

use crate::http::{ErrorCategory, Method, Request, Response, StatusCode};

/// Tipo de función handler
///
/// Un handler recibe un Request y retorna una Response. Puede capturar estado
/// compartido (processor, métricas), por eso es un closure y no un `fn`.
pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Router que mapea (método, path) a handlers
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<(Method, String, Handler)>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use job_server::router::Router;
    /// use job_server::http::{Method, Request, Response, StatusCode};
    /// use serde_json::json;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req: &Request| {
    ///     Response::json(StatusCode::Ok, &json!({"message": "Hello"}))
    /// });
    ///
    /// let request = Request::parse(b"GET /hello HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request).status(), StatusCode::Ok);
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push((method, path.to_string(), Arc::new(handler)));
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        // HEAD se atiende como GET
        let method = match request.method() {
            Method::HEAD => Method::GET,
            other => other,
        };

        let mut allowed = Vec::new();
        for (route_method, route_path, handler) in &self.routes {
            if route_path != path {
                continue;
            }
            if *route_method == method {
                let mut response = handler(request);
                add_common_headers(&mut response);
                return response;
            }
            allowed.push(route_method.as_str());
        }

        let mut response = if allowed.is_empty() {
            Response::error(
                StatusCode::NotFound,
                ErrorCategory::Client,
                &format!("Route not found: {}", path),
            )
        } else {
            if allowed.contains(&"GET") {
                allowed.push("HEAD");
            }
            Response::error(
                StatusCode::MethodNotAllowed,
                ErrorCategory::Client,
                &format!("Method {} not allowed on {}", request.method(), path),
            )
            .with_header("Allow", &allowed.join(", "))
        };
        add_common_headers(&mut response);
        response
    }

    /// `true` si algún método tiene registrado este path
    pub fn has_path(&self, path: &str) -> bool {
        self.routes.iter().any(|(_, route_path, _)| route_path == path)
    }

    /// Paths registrados (para el índice)
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .routes
            .iter()
            .map(|(method, path, _)| format!("{} {}", method, path))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Agrega headers comunes a todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", "JobServer/1.0");
    response.add_header("Connection", "close");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_handler(_req: &Request) -> Response {
        Response::json(StatusCode::Ok, &json!({"test": "ok"}))
    }

    fn parse(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.routes.is_empty());
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", ok_handler);

        let response = router.route(&parse("GET /test HTTP/1.0\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Server"), Some("JobServer/1.0"));
        assert_eq!(response.header("Connection"), Some("close"));
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();
        let response = router.route(&parse("GET /nonexistent HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", ok_handler);

        let response = router.route(&parse("POST /test HTTP/1.0\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
        assert_eq!(response.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_head_uses_get_handler() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", ok_handler);

        let response = router.route(&parse("HEAD /test HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[test]
    fn test_same_path_different_methods() {
        let mut router = Router::new();
        router.register(Method::GET, "/jobs", ok_handler);
        router.register(Method::POST, "/jobs", |_req: &Request| {
            Response::json(StatusCode::Ok, &json!({"posted": true}))
        });

        let response = router.route(&parse("POST /jobs HTTP/1.0\r\n\r\n"));
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["posted"], true);
    }

    #[test]
    fn test_has_path_ignores_method() {
        let mut router = Router::new();
        router.register(Method::POST, "/jobs", ok_handler);

        assert!(router.has_path("/jobs"));
        assert!(!router.has_path("/jobs/unknown"));
    }

    #[test]
    fn test_paths() {
        let mut router = Router::new();
        router.register(Method::POST, "/jobs", ok_handler);
        router.register(Method::GET, "/health", ok_handler);

        assert_eq!(router.paths(), ["GET /health", "POST /jobs"]);
    }
}
