use std::env;
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::net::TcpSocket;
use tracing::{error, info};

mod http;

mod responder;
use responder::{Outcome, StaticRoot};

mod config;
use config::ServeMode;

mod shutdown;

mod logger;

mod transfer;

// Single-shot mode only ever takes one client.
const ONCE_BACKLOG: u32 = 3;
const FOREVER_BACKLOG: u32 = 1024;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let config = match config::load(&args).await {
        Ok(c) => c,
        Err(e) if e.is_usage() => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logger::init_logger(config.log_dir.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let root = match StaticRoot::new(&config.root) {
        Ok(root) => root,
        Err(e) => {
            error!("Cannot serve from {}: {}", config.root.display(), e);
            return ExitCode::FAILURE;
        }
    };
    info!("Serving files from {}", root.path().display());

    let backlog = match config.mode {
        ServeMode::Once => ONCE_BACKLOG,
        ServeMode::Forever => FOREVER_BACKLOG,
    };
    let listener = match bind_listener(&config.host, config.port, backlog) {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind to address {}:{}: {}", config.host, config.port, e);
            return ExitCode::FAILURE;
        }
    };
    match listener.local_addr() {
        Ok(addr) => info!("Listening on {}", addr),
        Err(_) => info!("Listening on {}:{}", config.host, config.port),
    }

    match config.mode {
        ServeMode::Once => match serve_once(&listener, &root).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Accept fail: {}", e);
                ExitCode::FAILURE
            }
        },
        ServeMode::Forever => {
            serve_forever(listener, Arc::new(root)).await;
            ExitCode::SUCCESS
        }
    }
}

fn bind_listener(host: &str, port: u16, backlog: u32) -> io::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    #[cfg(unix)]
    socket.set_reuseport(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Accepts a single client and answers it. Only accept failures are errors.
async fn serve_once(listener: &TcpListener, root: &StaticRoot) -> io::Result<Outcome> {
    let (socket, peer) = listener.accept().await?;
    info!("New connection from {}", peer);
    Ok(responder::serve_connection(socket, root).await)
}

/// Accepts until Ctrl-C, one task per connection.
async fn serve_forever(listener: TcpListener, root: Arc<StaticRoot>) {
    let notify_shutdown = shutdown::start_shutdown_listener();
    loop {
        tokio::select! {
            _ = notify_shutdown.notified() => {
                info!("Shutting down...");
                break;
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((socket, addr)) => {
                        info!("New connection from {}", addr);
                        let root = root.clone();
                        tokio::spawn(async move {
                            responder::serve_connection(socket, &root).await;
                        });
                    }
                    Err(e) => {
                        error!("Accept fail: {}", e);
                    }
                }
            }
        }
    }
}
