use std::fmt;
use std::io;

use tokio::fs::File;
use tokio::net::TcpStream;

#[derive(Debug)]
pub enum TransferError {
    Io { sent: u64, source: io::Error },
    /// The file ended before the announced length was reached.
    ShortFile { sent: u64, expected: u64 },
}

impl TransferError {
    pub fn bytes_sent(&self) -> u64 {
        match self {
            TransferError::Io { sent, .. } | TransferError::ShortFile { sent, .. } => *sent,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Io { sent, source } => {
                write!(f, "transfer failed after {} bytes: {}", sent, source)
            }
            TransferError::ShortFile { sent, expected } => {
                write!(f, "file ended after {} of {} bytes", sent, expected)
            }
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Io { source, .. } => Some(source),
            TransferError::ShortFile { .. } => None,
        }
    }
}

// Linux caps a single sendfile(2) at this many bytes.
#[cfg(target_os = "linux")]
const MAX_SENDFILE_CHUNK: u64 = 0x7fff_f000;

/// Moves `len` bytes of `file` into `stream` without copying through user space.
///
/// `EINTR` retries the same call; `EAGAIN` parks on socket write readiness.
/// Returns the number of bytes sent, which equals `len` on success.
#[cfg(target_os = "linux")]
pub async fn send_file(stream: &mut TcpStream, file: &mut File, len: u64) -> Result<u64, TransferError> {
    use std::os::fd::AsRawFd;
    use tokio::io::Interest;

    let out_fd = stream.as_raw_fd();
    let in_fd = file.as_raw_fd();
    let mut offset: libc::off_t = 0;
    let mut sent: u64 = 0;

    while sent < len {
        let count = (len - sent).min(MAX_SENDFILE_CHUNK) as usize;
        let result = stream
            .async_io(Interest::WRITABLE, || {
                // SAFETY: both descriptors stay open for the whole loop and
                // `offset` is a live off_t owned by this frame.
                let n = unsafe { libc::sendfile(out_fd, in_fd, &mut offset, count) };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as u64)
                }
            })
            .await;
        match result {
            Ok(0) => {
                return Err(TransferError::ShortFile {
                    sent,
                    expected: len,
                })
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(TransferError::Io { sent, source }),
        }
    }
    Ok(sent)
}

/// Buffered fallback for targets without Linux `sendfile(2)` semantics.
#[cfg(not(target_os = "linux"))]
pub async fn send_file(stream: &mut TcpStream, file: &mut File, len: u64) -> Result<u64, TransferError> {
    use tokio::io::AsyncReadExt;

    let mut limited = file.take(len);
    let sent = tokio::io::copy(&mut limited, stream)
        .await
        .map_err(|source| TransferError::Io { sent: 0, source })?;
    if sent < len {
        return Err(TransferError::ShortFile {
            sent,
            expected: len,
        });
    }
    Ok(sent)
}
