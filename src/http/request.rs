use std::fmt;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

/// Upper bound on the bytes read from a client before parsing.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Longest path token accepted after `GET /`.
pub const MAX_PATH_LEN: usize = MAX_REQUEST_SIZE - 1;

const REQUEST_PREFIX: &[u8] = b"GET /";

/// C `isspace`: ASCII whitespace plus vertical tab.
fn is_token_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

/// The bytes received from a connection, capped at [`MAX_REQUEST_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    buf: Vec<u8>,
}

impl RawRequest {
    /// Reads until the end of the request line, a full buffer, or EOF.
    ///
    /// Only the request line is ever inspected, so anything after the first
    /// newline is left unread unless it arrived in the same chunk.
    pub async fn read_from<T>(reader: &mut T) -> tokio::io::Result<Self>
    where
        T: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; MAX_REQUEST_SIZE];
        let mut len = 0;
        while len < MAX_REQUEST_SIZE {
            let n = reader.read(&mut buf[len..]).await?;
            if n == 0 {
                break;
            }
            let chunk_has_newline = buf[len..len + n].contains(&b'\n');
            len += n;
            if chunk_has_newline {
                break;
            }
        }
        buf.truncate(len);
        Ok(RawRequest { buf })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn parse_path(&self) -> Result<RequestPath, MalformedRequest> {
        parse_request_path(&self.buf)
    }
}

/// The path token of a request line, without the leading `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath(String);

impl RequestPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedRequest {
    Empty,
    MissingPrefix,
    EmptyPath,
    PathTooLong(usize),
    InvalidEncoding,
}

impl fmt::Display for MalformedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRequest::Empty => write!(f, "client sent no data"),
            MalformedRequest::MissingPrefix => write!(f, "request does not start with `GET /`"),
            MalformedRequest::EmptyPath => write!(f, "no path after `GET /`"),
            MalformedRequest::PathTooLong(len) => {
                write!(f, "path of {} bytes exceeds limit of {}", len, MAX_PATH_LEN)
            }
            MalformedRequest::InvalidEncoding => write!(f, "path is not valid UTF-8"),
        }
    }
}

impl std::error::Error for MalformedRequest {}

/// Extracts the token between `GET /` and the next whitespace.
///
/// The trailing ` HTTP/1.1` marker is not checked; it only ends the token.
/// Whitespace right after the prefix means there is no token at all.
pub fn parse_request_path(raw: &[u8]) -> Result<RequestPath, MalformedRequest> {
    if raw.is_empty() {
        return Err(MalformedRequest::Empty);
    }
    let rest = raw
        .strip_prefix(REQUEST_PREFIX)
        .ok_or(MalformedRequest::MissingPrefix)?;
    let token_len = rest
        .iter()
        .position(|&b| is_token_delimiter(b))
        .unwrap_or(rest.len());
    if token_len == 0 {
        return Err(MalformedRequest::EmptyPath);
    }
    if token_len > MAX_PATH_LEN {
        return Err(MalformedRequest::PathTooLong(token_len));
    }
    let token =
        std::str::from_utf8(&rest[..token_len]).map_err(|_| MalformedRequest::InvalidEncoding)?;
    Ok(RequestPath(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_path_from_request_line() {
        let path = parse_request_path(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(path.as_str(), "index.html");
        assert_eq!(path.to_string(), "/index.html");
    }

    #[test]
    fn keeps_nested_and_dotted_segments_verbatim() {
        let path = parse_request_path(b"GET /assets/../img/a.b.png HTTP/1.1\r\n").unwrap();
        assert_eq!(path.as_str(), "assets/../img/a.b.png");
    }

    #[test]
    fn trailing_marker_is_not_validated() {
        let path = parse_request_path(b"GET /style.css HTTP/1.0\r\n").unwrap();
        assert_eq!(path.as_str(), "style.css");

        let path = parse_request_path(b"GET /truncated").unwrap();
        assert_eq!(path.as_str(), "truncated");
    }

    #[test]
    fn any_c_whitespace_ends_the_token() {
        for line in [
            &b"GET /a\x0bb HTTP/1.1\r\n"[..],
            &b"GET /a\x0cb HTTP/1.1\r\n"[..],
            &b"GET /a\tb HTTP/1.1\r\n"[..],
            &b"GET /a\r\n"[..],
        ] {
            assert_eq!(parse_request_path(line).unwrap().as_str(), "a");
        }
        assert_eq!(
            parse_request_path(b"GET /\x0bindex.html HTTP/1.1\r\n"),
            Err(MalformedRequest::EmptyPath)
        );
    }

    #[test]
    fn rejects_other_methods_and_missing_slash() {
        assert_eq!(
            parse_request_path(b"POST /index.html HTTP/1.1\r\n"),
            Err(MalformedRequest::MissingPrefix)
        );
        assert_eq!(
            parse_request_path(b"GET index.html HTTP/1.1\r\n"),
            Err(MalformedRequest::MissingPrefix)
        );
        assert_eq!(
            parse_request_path(b"get /index.html HTTP/1.1\r\n"),
            Err(MalformedRequest::MissingPrefix)
        );
    }

    #[test]
    fn rejects_empty_path() {
        assert_eq!(
            parse_request_path(b"GET / HTTP/1.1\r\n"),
            Err(MalformedRequest::EmptyPath)
        );
        assert_eq!(parse_request_path(b"GET /"), Err(MalformedRequest::EmptyPath));
        assert_eq!(parse_request_path(b""), Err(MalformedRequest::Empty));
    }

    #[test]
    fn rejects_oversized_path() {
        let mut line = b"GET /".to_vec();
        line.extend(std::iter::repeat(b'a').take(MAX_PATH_LEN + 1));
        line.extend_from_slice(b" HTTP/1.1\r\n");
        assert_eq!(
            parse_request_path(&line),
            Err(MalformedRequest::PathTooLong(MAX_PATH_LEN + 1))
        );
    }

    #[test]
    fn rejects_non_utf8_path() {
        assert_eq!(
            parse_request_path(b"GET /\xff\xfe HTTP/1.1\r\n"),
            Err(MalformedRequest::InvalidEncoding)
        );
    }

    #[tokio::test]
    async fn read_stops_after_request_line_chunk() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, b"GET /a.gif HTTP/1.1\r\n")
            .await
            .unwrap();

        let raw = RawRequest::read_from(&mut server).await.unwrap();
        assert_eq!(raw.as_bytes(), b"GET /a.gif HTTP/1.1\r\n");
        assert_eq!(raw.parse_path().unwrap().as_str(), "a.gif");
    }

    #[tokio::test]
    async fn read_is_bounded_when_no_newline_arrives() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let flood = vec![b'A'; MAX_REQUEST_SIZE + 500];
        tokio::io::AsyncWriteExt::write_all(&mut client, &flood)
            .await
            .unwrap();

        let raw = RawRequest::read_from(&mut server).await.unwrap();
        assert_eq!(raw.len(), MAX_REQUEST_SIZE);
    }

    #[tokio::test]
    async fn read_returns_empty_when_peer_closes() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let raw = RawRequest::read_from(&mut server).await.unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.parse_path(), Err(MalformedRequest::Empty));
    }
}
