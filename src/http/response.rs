/// Upper bound on a synthesized status-and-header block.
///
/// The current 200 header tops out well below this (fixed MIME strings, at
/// most 20 length digits); the check in the responder guards any header that
/// is added later.
pub const MAX_HEADER_SIZE: usize = 1024;

const HTTP_VERSION: &str = "HTTP/1.1";

/// A status line, ordered headers and an optional in-memory body.
///
/// File bodies are never stored here; for those only the header block is
/// rendered and the contents are streamed separately.
#[derive(Debug)]
pub struct HttpResponse {
    pub version: String,
    pub code: String,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new() -> Self {
        HttpResponse {
            version: String::new(),
            code: String::new(),
            reason: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn gen_resp_bytes(&self) -> Vec<u8> {
        let mut response = format!("{} {} {}\r\n", self.version, self.code, self.reason);
        for (key, val) in &self.headers {
            response.push_str(&format!("{}: {}\r\n", key, val));
        }
        response.push_str("\r\n");
        let mut response = response.into_bytes();
        response.extend(&self.body);
        response
    }

    pub fn header(mut self, key: &str, val: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), val.into()));
        self
    }

    fn new_with_status(code: &str, reason: &str) -> Self {
        let mut resp = Self::new();
        resp.version = HTTP_VERSION.to_string();
        resp.code = code.to_string();
        resp.reason = reason.to_string();
        resp
    }

    /// Error page carrying only `Content-Type`, no length or connection header.
    fn html_error(code: &str, reason: &str) -> Self {
        let mut resp = Self::new_with_status(code, reason).header("Content-Type", "text/html");
        resp.body = format!("<h1>{} {}</h1>", code, reason).into_bytes();
        resp
    }
}

impl HttpResponse {
    /// Header block announcing a file body of `content_length` bytes.
    pub fn file_header(content_type: &str, content_length: u64) -> Self {
        Self::new_with_status("200", "OK")
            .header("Content-Type", content_type)
            .header("Content-Length", content_length.to_string())
            .header("Connection", "close")
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::html_error("404", "Not Found")
    }

    /// 500 Internal Server Error
    pub fn internal_server_error() -> Self {
        Self::html_error("500", "Internal Server Error")
    }
}
