//! Listeners and the serve loop
//!
//! TCP goes through `axum::serve`. Unix sockets are driven by hyper-util's
//! auto connection builder, one task per connection, so the same router
//! answers on both.

use axum::Router;
use axum::extract::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::watch;
use tower::Service;
use tracing::{debug, info, warn};

/// Where the API listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl FromStr for BindAddr {
    type Err = String;

    /// `IP:PORT` binds TCP; anything containing a `/` is a socket path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(BindAddr::Tcp(addr));
        }
        if s.contains('/') {
            return Ok(BindAddr::Unix(PathBuf::from(s)));
        }
        Err(format!(
            "'{}' is neither an IP:PORT address nor a socket path",
            s
        ))
    }
}

impl fmt::Display for BindAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindAddr::Tcp(addr) => write!(f, "{}", addr),
            BindAddr::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// A bound listener
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl Listener {
    /// Bind `addr`
    ///
    /// A leftover socket file at a unix path is removed first.
    pub async fn bind(addr: &BindAddr) -> io::Result<Self> {
        match addr {
            BindAddr::Tcp(addr) => Ok(Listener::Tcp(TcpListener::bind(addr).await?)),
            BindAddr::Unix(path) => {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => debug!("Removed stale socket {}", path.display()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                let listener = UnixListener::bind(path)?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
        }
    }

    /// Socket path when listening on a unix socket
    pub fn unix_path(&self) -> Option<&Path> {
        match self {
            Listener::Tcp(_) => None,
            Listener::Unix { path, .. } => Some(path),
        }
    }

    /// Local TCP address when listening on TCP
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Listener::Tcp(listener) => listener.local_addr().ok(),
            Listener::Unix { .. } => None,
        }
    }
}

/// Serve `router` on `listener` until `shutdown` resolves
///
/// In-flight requests are allowed to finish. A unix socket file is removed
/// once serving stops.
pub async fn serve<F>(listener: Listener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listener {
        Listener::Tcp(listener) => {
            info!("Listening on http://{}", listener.local_addr()?);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
        }
        Listener::Unix { listener, path } => {
            info!("Listening on unix:{}", path.display());
            let result = serve_unix(listener, router, shutdown).await;
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove socket {}: {}", path.display(), e);
            }
            result
        }
    }
}

async fn serve_unix<F>(listener: UnixListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    // Every connection holds a receiver; the sender closes once all are gone
    let (stop_tx, stop_rx) = watch::channel(());
    tokio::pin!(shutdown);

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let router = router.clone();
        let mut stop_rx = stop_rx.clone();
        tokio::spawn(async move {
            let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                router.clone().call(request)
            });
            let builder = auto::Builder::new(TokioExecutor::new());
            let connection = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);

            loop {
                tokio::select! {
                    result = connection.as_mut() => {
                        if let Err(e) = result {
                            debug!("Connection closed with error: {}", e);
                        }
                        break;
                    }
                    _ = stop_rx.changed() => {
                        connection.as_mut().graceful_shutdown();
                    }
                }
            }
        });
    }

    debug!("Waiting for open connections to finish");
    drop(stop_rx);
    stop_tx.send_replace(());
    stop_tx.closed().await;
    Ok(())
}
