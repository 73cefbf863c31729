//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser escrito a mano sobre bytes crudos del socket.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /jobs HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 31\r\n
//! \r\n
//! {"job":"echo","data":"hello"}
//! ```
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.x`
//! 2. **Headers**: `Name: Value`, uno por línea. Los nombres se guardan en
//!    minúsculas para que la búsqueda no distinga mayúsculas.
//! 3. **Línea vacía**: `\r\n`
//! 4. **Body**: bytes crudos, el largo lo decide `Content-Length`

use std::collections::HashMap;

/// Separador entre headers y body
pub(crate) const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path sin query string (ej: "/artifacts")
    path: String,

    /// Query parameters ya decodificados (ej: {"id": "abc"})
    query_params: HashMap<String, String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// "HTTP/1.0" o "HTTP/1.1"
    version: String,

    body: Vec<u8>,
}

/// Errores de parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),
}

impl Request {
    /// Parsea un request completo (head + body) desde bytes
    ///
    /// Si `Content-Length` está presente el body se recorta a ese largo;
    /// si no, el body es todo lo que sigue a la línea vacía.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use job_server::http::Request;
    ///
    /// let raw = b"GET /artifacts?id=abc HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/artifacts");
    /// assert_eq!(request.query_param("id"), Some("abc"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyRequest);
        }

        let (head_bytes, body_bytes) = match find_header_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + HEADER_TERMINATOR.len()..]),
            None => (buffer, &[][..]),
        };

        let head = std::str::from_utf8(head_bytes).map_err(|_| ParseError::InvalidEncoding)?;
        let mut lines = head.split("\r\n");

        let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
        let (method, path, query_params, version) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(lines)?;

        let body = match content_length(&headers)? {
            Some(len) => body_bytes[..len.min(body_bytes.len())].to_vec(),
            None => body_bytes.to_vec(),
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0])?;
        if !parts[1].starts_with('/') {
            return Err(ParseError::InvalidRequestLine);
        }
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, query_params, version))
    }

    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (target.to_string(), HashMap::new()),
        }
    }

    /// "id=abc&debug" → {"id": "abc", "debug": ""}
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| match param.split_once('=') {
                Some((key, value)) => (percent_decode(key), percent_decode(value)),
                None => (percent_decode(param), String::new()),
            })
            .collect()
    }

    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(headers)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// ```
    /// use job_server::http::Request;
    ///
    /// let request = Request::parse(b"GET /test?num=42 HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Reemplaza el body una vez leído completo del socket
    pub(crate) fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

/// Posición donde empieza `\r\n\r\n`, si ya llegó
pub(crate) fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Extrae `Content-Length` de headers ya normalizados
pub(crate) fn content_length(
    headers: &HashMap<String, String>,
) -> Result<Option<usize>, ParseError> {
    match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ParseError::InvalidContentLength(value.clone())),
        None => Ok(None),
    }
}

/// Decodifica `%XX` y `+`. Secuencias inválidas se dejan tal cual.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let request = Request::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert!(request.query_params().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_post_with_body() {
        let raw = b"POST /jobs HTTP/1.1\r\n\
            Content-Type: application/json\r\n\
            Content-Length: 29\r\n\r\n\
            {\"job\":\"echo\",\"data\":\"hello\"}";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.path(), "/jobs");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.body(), br#"{"job":"echo","data":"hello"}"#);
    }

    #[test]
    fn test_body_is_cut_at_content_length() {
        let raw = b"POST /jobs HTTP/1.0\r\nContent-Length: 2\r\n\r\n{}trailing";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.body(), b"{}");
    }

    #[test]
    fn test_body_keeps_crlf() {
        let raw = b"POST /jobs HTTP/1.0\r\n\r\nline1\r\nline2";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.body(), b"line1\r\nline2");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let raw = b"GET / HTTP/1.0\r\nHost: localhost:8080\r\nX-Custom: yes\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.header("HOST"), Some("localhost:8080"));
        assert_eq!(request.header("x-custom"), Some("yes"));
    }

    #[test]
    fn test_query_params_are_decoded() {
        let raw = b"GET /artifacts?id=a%2Db&text=hello+world&flag HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.query_param("id"), Some("a-b"));
        assert_eq!(request.query_param("text"), Some("hello world"));
        assert_eq!(request.query_param("flag"), Some(""));
    }

    #[test]
    fn test_percent_decode_invalid_sequence() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%20"), " ");
    }

    #[test]
    fn test_unsupported_method() {
        let result = Request::parse(b"DELETE / HTTP/1.0\r\n\r\n");
        assert!(matches!(result, Err(ParseError::UnsupportedMethod(_))));
    }

    #[test]
    fn test_invalid_version() {
        let result = Request::parse(b"GET / HTTP/2.0\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHttpVersion(_))));
    }

    #[test]
    fn test_empty_request() {
        assert!(matches!(Request::parse(b""), Err(ParseError::EmptyRequest)));
        assert!(matches!(Request::parse(b"\r\n"), Err(ParseError::EmptyRequest)));
    }

    #[test]
    fn test_invalid_request_line() {
        let result = Request::parse(b"GET\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidRequestLine)));
    }

    #[test]
    fn test_invalid_header() {
        let result = Request::parse(b"GET / HTTP/1.0\r\nno-colon-here\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_content_length() {
        let result = Request::parse(b"POST /jobs HTTP/1.0\r\nContent-Length: abc\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidContentLength(_))));
    }

    #[test]
    fn test_find_header_end() {
        assert_eq!(find_header_end(b"GET / HTTP/1.0\r\n\r\nbody"), Some(14));
        assert_eq!(find_header_end(b"GET / HTTP/1.0\r\n"), None);
    }
}
