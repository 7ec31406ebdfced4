use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::http::mime;
use crate::http::response::MAX_HEADER_SIZE;
use crate::http::{HttpResponse, RawRequest, RequestPath};
use crate::transfer::{self, TransferError};

/// Canonical directory that every served file must live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoot(PathBuf);

impl StaticRoot {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let root = std::fs::canonicalize(dir)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(StaticRoot(root))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Joins the request path onto the root with no normalization.
    pub fn join(&self, request_path: &RequestPath) -> PathBuf {
        self.0.join(request_path.as_str())
    }

    /// Opens `resolved` read-only if it exists and stays inside the root.
    async fn open_contained(&self, resolved: &Path) -> Result<File, ServeError> {
        let canonical = tokio::fs::canonicalize(resolved)
            .await
            .map_err(ServeError::Open)?;
        if !canonical.starts_with(&self.0) {
            return Err(ServeError::OutsideRoot(canonical));
        }
        File::open(&canonical).await.map_err(ServeError::Open)
    }
}

#[derive(Debug)]
pub enum ServeError {
    Open(io::Error),
    OutsideRoot(PathBuf),
    NotAFile,
    Metadata(io::Error),
    HeaderTooLarge(usize),
    Write(io::Error),
    Transfer(TransferError),
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeError::Open(e) => write!(f, "open: {}", e),
            ServeError::OutsideRoot(p) => write!(f, "{} escapes the served root", p.display()),
            ServeError::NotAFile => write!(f, "not a regular file"),
            ServeError::Metadata(e) => write!(f, "fstat: {}", e),
            ServeError::HeaderTooLarge(len) => {
                write!(f, "header of {} bytes exceeds {}", len, MAX_HEADER_SIZE)
            }
            ServeError::Write(e) => write!(f, "send: {}", e),
            ServeError::Transfer(e) => write!(f, "sendfile: {}", e),
        }
    }
}

impl std::error::Error for ServeError {}

/// What a connection ended up receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Malformed or empty request; nothing was written.
    Dropped,
    NotFound,
    InternalError,
    /// Full 200 response with a body of this many bytes.
    Served(u64),
    /// 200 header went out but the body stopped after this many bytes.
    Truncated(u64),
}

/// Reads one request from `socket`, answers it and closes the connection.
pub async fn serve_connection(mut socket: TcpStream, root: &StaticRoot) -> Outcome {
    let raw = match RawRequest::read_from(&mut socket).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Outcome::Dropped;
        }
    };
    if raw.is_empty() {
        info!("Client closed without sending a request");
        return Outcome::Dropped;
    }
    debug!(
        "Raw request ({} bytes): {:?}",
        raw.len(),
        String::from_utf8_lossy(raw.as_bytes())
    );

    let request_path = match raw.parse_path() {
        Ok(path) => path,
        Err(e) => {
            error!("Malformed request: {}", e);
            return Outcome::Dropped;
        }
    };
    info!("Request received: GET {}", request_path);

    let outcome = respond(&mut socket, root, &request_path).await;
    info!("Response outcome: {:?}", outcome);

    if let Err(e) = socket.shutdown().await {
        match e.kind() {
            io::ErrorKind::NotConnected => {}
            _ => error!("Failed to shutdown connection: {}", e),
        }
    }
    outcome
}

/// Writes exactly one response for `request_path` to `stream`.
pub async fn respond(stream: &mut TcpStream, root: &StaticRoot, request_path: &RequestPath) -> Outcome {
    let resolved = root.join(request_path);
    let result = match root.open_contained(&resolved).await {
        Ok(file) => {
            let metadata = file.metadata().await;
            send_opened_file(stream, file, metadata, &resolved).await
        }
        Err(e) => Err(e),
    };
    finish_response(stream, request_path, &resolved, result).await
}

/// Sends the 200 header and body for an already opened file.
///
/// `file` is consumed, so its descriptor is closed on every return path,
/// including a failed metadata query.
async fn send_opened_file(
    stream: &mut TcpStream,
    mut file: File,
    metadata: io::Result<Metadata>,
    resolved: &Path,
) -> Result<u64, ServeError> {
    let metadata = metadata.map_err(ServeError::Metadata)?;
    if !metadata.is_file() {
        return Err(ServeError::NotAFile);
    }
    let size = metadata.len();

    let header = HttpResponse::file_header(mime::classify(resolved), size).gen_resp_bytes();
    if header.len() > MAX_HEADER_SIZE {
        return Err(ServeError::HeaderTooLarge(header.len()));
    }
    stream.write_all(&header).await.map_err(ServeError::Write)?;

    transfer::send_file(stream, &mut file, size)
        .await
        .map_err(ServeError::Transfer)
}

/// Logs the result and writes an error page when nothing has been sent yet.
async fn finish_response(
    stream: &mut TcpStream,
    request_path: &RequestPath,
    resolved: &Path,
    result: Result<u64, ServeError>,
) -> Outcome {
    match result {
        Ok(sent) => Outcome::Served(sent),
        Err(e @ (ServeError::Open(_) | ServeError::NotAFile)) => {
            warn!("{}: {}", resolved.display(), e);
            write_error_page(stream, HttpResponse::not_found()).await;
            Outcome::NotFound
        }
        Err(e @ ServeError::OutsideRoot(_)) => {
            warn!("Rejected {}: {}", request_path, e);
            write_error_page(stream, HttpResponse::not_found()).await;
            Outcome::NotFound
        }
        Err(e @ (ServeError::Metadata(_) | ServeError::HeaderTooLarge(_))) => {
            error!("{}: {}", resolved.display(), e);
            write_error_page(stream, HttpResponse::internal_server_error()).await;
            Outcome::InternalError
        }
        Err(ServeError::Write(e)) => {
            error!("{}: failed to send header: {}", resolved.display(), e);
            Outcome::Truncated(0)
        }
        Err(ServeError::Transfer(e)) => {
            error!("{}: {}", resolved.display(), e);
            Outcome::Truncated(e.bytes_sent())
        }
    }
}

async fn write_error_page(stream: &mut TcpStream, response: HttpResponse) {
    if let Err(e) = stream.write_all(&response.gen_resp_bytes()).await {
        match e.kind() {
            io::ErrorKind::NotConnected => {}
            _ => error!("Failed to write response: {}", e),
        }
    }
}
