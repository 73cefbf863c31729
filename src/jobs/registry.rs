//! # Registro de Tipos de Job
//! src/jobs/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::kinds::{self, JobHandler};

/// Mapa `kind → handler`
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn JobHandler>>,
}

/// Entrada de `/jobs/kinds`
#[derive(Debug, Clone, Serialize)]
pub struct KindInfo {
    pub kind: &'static str,
    pub description: &'static str,
}

impl JobRegistry {
    /// Registro vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro con todos los tipos incluidos
    ///
    /// ```
    /// use job_server::jobs::JobRegistry;
    ///
    /// let registry = JobRegistry::with_builtin();
    /// assert!(registry.get("echo").is_some());
    /// assert!(registry.get("scrape").is_none());
    /// ```
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for handler in kinds::builtin() {
            registry.register(Arc::from(handler));
        }
        registry
    }

    /// Registra un handler; reemplaza otro con el mismo `kind`
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            tracing::warn!(kind, "Job kind registered twice; keeping the latest handler");
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(kind).cloned()
    }

    /// Tipos registrados, en orden alfabético
    pub fn kinds(&self) -> Vec<KindInfo> {
        self.handlers
            .values()
            .map(|h| KindInfo {
                kind: h.kind(),
                description: h.description(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::kinds::JobContext;
    use crate::jobs::types::{JobError, JobRequest};
    use serde_json::Value;

    struct Constant;

    impl JobHandler for Constant {
        fn kind(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "always 42"
        }

        fn run(&self, _request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
            Ok(Value::from(42))
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = JobRegistry::with_builtin();
        assert_eq!(registry.len(), 7);

        let names: Vec<_> = registry.kinds().iter().map(|k| k.kind).collect();
        assert_eq!(
            names,
            ["echo", "grep", "reverse", "sha256", "sleep", "toupper", "wordcount"]
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("echo").is_none());
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = JobRegistry::with_builtin();
        registry.register(Arc::new(Constant));

        assert_eq!(registry.len(), 7);
        assert_eq!(registry.get("echo").unwrap().description(), "always 42");
    }
}
