//! # Tabla de Rutas
//! src/server/routes.rs
//!
//! | Método | Path            | Handler                      |
//! |--------|-----------------|------------------------------|
//! | GET    | `/`             | índice del servicio          |
//! | GET    | `/health`       | liveness                     |
//! | POST   | `/jobs`         | ejecutar un job              |
//! | GET    | `/jobs/kinds`   | tipos de job                 |
//! | GET    | `/artifacts`    | leer un artifact (`?id=`)    |
//! | GET    | `/metrics`      | métricas del servidor        |

use std::sync::Arc;

use serde_json::json;

use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::{handlers, JobProcessor};
use crate::metrics::MetricsCollector;
use crate::pool::Executor;
use crate::router::Router;

pub const SERVICE_NAME: &str = "job_server";

/// Arma el router con todos los endpoints
pub(crate) fn build_router(
    processor: JobProcessor,
    metrics: MetricsCollector,
    executor: Arc<dyn Executor>,
) -> Router {
    let mut router = Router::new();

    router.register(Method::GET, "/health", health_handler);

    {
        let processor = processor.clone();
        router.register(Method::POST, "/jobs", move |req: &Request| {
            handlers::submit_handler(req, &processor)
        });
    }
    {
        let processor = processor.clone();
        router.register(Method::GET, "/jobs/kinds", move |req: &Request| {
            handlers::kinds_handler(req, &processor)
        });
    }
    {
        let processor = processor.clone();
        router.register(Method::GET, "/artifacts", move |req: &Request| {
            handlers::artifact_handler(req, &processor)
        });
    }
    {
        let processor = processor.clone();
        router.register(Method::GET, "/metrics", move |_req: &Request| {
            let artifacts = match processor.store().len() {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not count artifacts for metrics");
                    None
                }
            };
            Response::json(
                StatusCode::Ok,
                &metrics.to_json(Some(executor.stats()), artifacts),
            )
        });
    }

    // El índice lista las rutas, así que se registra al final
    let endpoints = {
        let mut paths = router.paths();
        paths.push("GET /".to_string());
        paths.sort();
        paths
    };
    let kinds: Vec<&'static str> = processor.registry().kinds().iter().map(|k| k.kind).collect();
    router.register(Method::GET, "/", move |_req: &Request| {
        Response::json(
            StatusCode::Ok,
            &json!({
                "service": SERVICE_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "endpoints": endpoints,
                "job_kinds": kinds,
            }),
        )
    });

    router
}

/// Handler para `/health`
pub fn health_handler(_req: &Request) -> Response {
    Response::json(
        StatusCode::Ok,
        &json!({
            "status": "healthy",
            "service": SERVICE_NAME,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestTimeout;
    use crate::jobs::JobRegistry;
    use crate::pool::WorkerPool;
    use crate::storage::OutputStore;
    use serde_json::Value;
    use tempfile::tempdir;

    fn router(root: &std::path::Path) -> Router {
        let processor = JobProcessor::new(
            JobRegistry::with_builtin(),
            OutputStore::open(root).unwrap(),
            RequestTimeout::Unbounded,
        );
        let pool: Arc<dyn Executor> = Arc::new(WorkerPool::new(1, None).unwrap());
        build_router(processor, MetricsCollector::new(), pool)
    }

    fn get(router: &Router, target: &str) -> (StatusCode, Value) {
        let raw = format!("GET {} HTTP/1.0\r\n\r\n", target);
        let request = Request::parse(raw.as_bytes()).unwrap();
        let response = router.route(&request);
        (response.status(), serde_json::from_slice(response.body()).unwrap())
    }

    #[test]
    fn test_health() {
        let dir = tempdir().unwrap();
        let (status, body) = get(&router(dir.path()), "/health");

        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({"status": "healthy", "service": "job_server"}));
    }

    #[test]
    fn test_index_lists_endpoints() {
        let dir = tempdir().unwrap();
        let (status, body) = get(&router(dir.path()), "/");

        assert_eq!(status, StatusCode::Ok);
        let endpoints: Vec<&str> = body["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(endpoints.contains(&"POST /jobs"));
        assert!(endpoints.contains(&"GET /"));
        assert!(body["job_kinds"].as_array().unwrap().contains(&json!("echo")));
    }

    #[test]
    fn test_metrics_include_pool_and_store() {
        let dir = tempdir().unwrap();
        let (status, body) = get(&router(dir.path()), "/metrics");

        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body["pool"]["size"], 1);
        assert_eq!(body["store"]["artifacts"], 0);
    }

    #[test]
    fn test_jobs_requires_post() {
        let dir = tempdir().unwrap();
        let (status, body) = get(&router(dir.path()), "/jobs");

        assert_eq!(status, StatusCode::MethodNotAllowed);
        assert_eq!(body["category"], "client");
    }
}
