//! # Tipos de Job
//! src/jobs/kinds.rs
//!
//! Cada tipo de job implementa [`JobHandler`]. Los incluidos:
//! - `echo`: devuelve `data` tal cual
//! - `reverse`: invierte el texto
//! - `toupper`: convierte a mayúsculas
//! - `sha256`: hash SHA-256 en hex
//! - `grep`: líneas que coinciden con un regex
//! - `wordcount`: líneas, palabras y bytes
//! - `sleep`: duerme N milisegundos (jobs largos)

use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::types::{JobError, JobRequest};
use crate::config::RequestTimeout;

/// Máximo de `ms` para `sleep` (10 minutos)
pub const MAX_SLEEP_MS: u64 = 600_000;

/// Granularidad con la que `sleep` revisa el deadline
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Contexto de ejecución de un job
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    started: Instant,
    timeout: RequestTimeout,
}

impl JobContext {
    pub fn new(timeout: RequestTimeout) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Tiempo restante hasta el deadline; `None` si no hay límite
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .duration()
            .map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Error si el deadline ya pasó
    pub fn check(&self) -> Result<(), JobError> {
        match self.timeout {
            RequestTimeout::After(limit) if self.expired() => Err(JobError::TimedOut(limit)),
            _ => Ok(()),
        }
    }
}

/// Capacidad de ejecutar un tipo de job
///
/// Los handlers corren dentro de un thread del pool; pueden bloquear.
pub trait JobHandler: Send + Sync {
    /// Nombre usado en el campo `job` del request
    fn kind(&self) -> &'static str;

    /// Descripción corta para `/jobs/kinds`
    fn description(&self) -> &'static str;

    /// Ejecuta el job y devuelve el `output` del artifact
    fn run(&self, request: &JobRequest, ctx: &JobContext) -> Result<Value, JobError>;
}

/// Todos los tipos incluidos
pub fn builtin() -> Vec<Box<dyn JobHandler>> {
    vec![
        Box::new(Echo),
        Box::new(Reverse),
        Box::new(ToUpper),
        Box::new(Sha256Hash),
        Box::new(Grep),
        Box::new(WordCount),
        Box::new(Sleep),
    ]
}

pub struct Echo;

impl JobHandler for Echo {
    fn kind(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Returns 'data' unchanged"
    }

    fn run(&self, request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
        request
            .param("data")
            .cloned()
            .ok_or_else(|| JobError::InvalidRequest("Missing required parameter: data".to_string()))
    }
}

pub struct Reverse;

impl JobHandler for Reverse {
    fn kind(&self) -> &'static str {
        "reverse"
    }

    fn description(&self) -> &'static str {
        "Reverses the text in 'data'"
    }

    fn run(&self, request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
        let text = request.param_str("data")?;
        let reversed: String = text.chars().rev().collect();
        Ok(Value::String(reversed))
    }
}

pub struct ToUpper;

impl JobHandler for ToUpper {
    fn kind(&self) -> &'static str {
        "toupper"
    }

    fn description(&self) -> &'static str {
        "Converts the text in 'data' to uppercase"
    }

    fn run(&self, request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
        Ok(Value::String(request.param_str("data")?.to_uppercase()))
    }
}

pub struct Sha256Hash;

impl JobHandler for Sha256Hash {
    fn kind(&self) -> &'static str {
        "sha256"
    }

    fn description(&self) -> &'static str {
        "Hex SHA-256 digest of the text in 'data'"
    }

    fn run(&self, request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
        let text = request.param_str("data")?;

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        Ok(json!({
            "algorithm": "sha256",
            "hash": hash,
        }))
    }
}

pub struct Grep;

impl JobHandler for Grep {
    fn kind(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Lines of 'data' matching the regex 'pattern'"
    }

    fn run(&self, request: &JobRequest, ctx: &JobContext) -> Result<Value, JobError> {
        let text = request.param_str("data")?;
        let pattern = request.param_str("pattern")?;

        let regex = Regex::new(pattern)
            .map_err(|e| JobError::InvalidRequest(format!("Invalid regex pattern: {}", e)))?;

        let mut matches = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if regex.is_match(line) {
                matches.push(json!({ "line": index + 1, "text": line }));
            }
        }
        ctx.check()?;

        Ok(json!({
            "pattern": pattern,
            "match_count": matches.len(),
            "matches": matches,
        }))
    }
}

pub struct WordCount;

impl JobHandler for WordCount {
    fn kind(&self) -> &'static str {
        "wordcount"
    }

    fn description(&self) -> &'static str {
        "Counts lines, words and bytes of 'data'"
    }

    fn run(&self, request: &JobRequest, _ctx: &JobContext) -> Result<Value, JobError> {
        let text = request.param_str("data")?;

        Ok(json!({
            "lines": text.lines().count(),
            "words": text.split_whitespace().count(),
            "bytes": text.len(),
        }))
    }
}

/// Job largo: duerme `ms` milisegundos
///
/// Duerme en tramos para poder cortar apenas pasa el deadline.
pub struct Sleep;

impl JobHandler for Sleep {
    fn kind(&self) -> &'static str {
        "sleep"
    }

    fn description(&self) -> &'static str {
        "Sleeps for 'ms' milliseconds (1..=600000)"
    }

    fn run(&self, request: &JobRequest, ctx: &JobContext) -> Result<Value, JobError> {
        let ms = request.param_u64_in("ms", 1, MAX_SLEEP_MS)?;
        let target = Duration::from_millis(ms);
        let start = Instant::now();

        loop {
            let slept = start.elapsed();
            if slept >= target {
                break;
            }
            ctx.check()?;

            let mut slice = (target - slept).min(SLEEP_SLICE);
            if let Some(left) = ctx.remaining() {
                slice = slice.min(left.max(Duration::from_millis(1)));
            }
            thread::sleep(slice);
        }

        Ok(json!({
            "slept_ms": ms,
            "thread": thread::current().name().unwrap_or("unnamed"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> JobRequest {
        JobRequest::from_body(body.as_bytes()).unwrap()
    }

    fn unbounded() -> JobContext {
        JobContext::new(RequestTimeout::Unbounded)
    }

    #[test]
    fn test_echo_keeps_any_json() {
        let output = Echo
            .run(&request(r#"{"job":"echo","data":{"a":[1,2]}}"#), &unbounded())
            .unwrap();
        assert_eq!(output, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_echo_requires_data() {
        let result = Echo.run(&request(r#"{"job":"echo"}"#), &unbounded());
        assert!(matches!(result, Err(JobError::InvalidRequest(_))));
    }

    #[test]
    fn test_reverse_unicode() {
        let output = Reverse
            .run(&request(r#"{"job":"reverse","data":"añb"}"#), &unbounded())
            .unwrap();
        assert_eq!(output, json!("bña"));
    }

    #[test]
    fn test_reverse_rejects_non_string() {
        let result = Reverse.run(&request(r#"{"job":"reverse","data":5}"#), &unbounded());
        assert!(matches!(result, Err(JobError::InvalidRequest(_))));
    }

    #[test]
    fn test_toupper() {
        let output = ToUpper
            .run(&request(r#"{"job":"toupper","data":"hola"}"#), &unbounded())
            .unwrap();
        assert_eq!(output, json!("HOLA"));
    }

    #[test]
    fn test_sha256_known_digest() {
        let output = Sha256Hash
            .run(&request(r#"{"job":"sha256","data":"hello"}"#), &unbounded())
            .unwrap();
        assert_eq!(
            output["hash"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_grep_matches_lines() {
        let output = Grep
            .run(
                &request(r#"{"job":"grep","data":"error: a\nok\nerror: b","pattern":"^error"}"#),
                &unbounded(),
            )
            .unwrap();

        assert_eq!(output["match_count"], 2);
        assert_eq!(output["matches"][1]["line"], 3);
        assert_eq!(output["matches"][1]["text"], "error: b");
    }

    #[test]
    fn test_grep_invalid_regex_is_client_error() {
        let result = Grep.run(
            &request(r#"{"job":"grep","data":"x","pattern":"("}"#),
            &unbounded(),
        );
        assert!(matches!(result, Err(JobError::InvalidRequest(_))));
    }

    #[test]
    fn test_wordcount() {
        let output = WordCount
            .run(
                &request(r#"{"job":"wordcount","data":"uno dos\ntres"}"#),
                &unbounded(),
            )
            .unwrap();
        assert_eq!(output, json!({"lines": 2, "words": 3, "bytes": 12}));
    }

    #[test]
    fn test_sleep_completes() {
        let output = Sleep
            .run(&request(r#"{"job":"sleep","ms":20}"#), &unbounded())
            .unwrap();
        assert_eq!(output["slept_ms"], 20);
    }

    #[test]
    fn test_sleep_rejects_out_of_range() {
        for body in [r#"{"job":"sleep","ms":0}"#, r#"{"job":"sleep","ms":600001}"#] {
            let result = Sleep.run(&request(body), &unbounded());
            assert!(matches!(result, Err(JobError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_sleep_observes_deadline() {
        let ctx = JobContext::new(RequestTimeout::from_millis(30));
        let start = Instant::now();

        let result = Sleep.run(&request(r#"{"job":"sleep","ms":5000}"#), &ctx);

        assert!(matches!(result, Err(JobError::TimedOut(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_context_unbounded_never_expires() {
        let ctx = unbounded();
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.expired());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_builtin_kinds_are_unique() {
        let mut kinds: Vec<_> = builtin().iter().map(|h| h.kind()).collect();
        let total = kinds.len();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), total);
    }
}
