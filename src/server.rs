//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C (or when the future given to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Tells every open connection to shut down. Idle keep-alive connections
//!    close at once; busy ones finish their current request first.
//! 3. Waits up to the drain timeout for connection tasks to end, then
//!    aborts the rest.
//! 4. Returns from `serve`, which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::table::Routes;

/// How long shutdown waits for open connections by default.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP server.
pub struct Server {
    bind: Bind,
    drain_timeout: Duration,
}

enum Bind {
    Addr(String),
    Listener(TcpListener),
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`, host names are
    /// resolved) when it starts serving.
    ///
    /// ```rust,no_run
    /// use chainmux::Server;
    /// let server = Server::bind("localhost:7100");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { bind: Bind::Addr(addr.into()), drain_timeout: DRAIN_TIMEOUT }
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener), drain_timeout: DRAIN_TIMEOUT }
    }

    /// Caps how long shutdown waits for open connections before aborting
    /// them. Defaults to [`DRAIN_TIMEOUT`].
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Starts accepting connections and dispatching them through `routes`.
    ///
    /// Returns only after a graceful shutdown: SIGTERM or Ctrl-C, followed
    /// by open connections draining or the drain timeout expiring.
    pub async fn serve(self, routes: Routes) -> Result<(), Error> {
        self.serve_with_shutdown(routes, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        routes: Routes,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "server is running");

        let mut tasks = JoinSet::new();
        let (stop_tx, stop_rx) = watch::channel(());
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown is checked first so a signal stops accepting even
                // when more connections are queued.
                biased;

                () = &mut signal => {
                    info!(open = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };
                    tasks.spawn(serve_connection(
                        routes.clone(),
                        TokioIo::new(stream),
                        remote_addr,
                        stop_rx.clone(),
                    ));
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        // Closing the channel wakes every connection's `changed()`.
        drop(stop_tx);
        drain(&mut tasks, self.drain_timeout).await;

        info!("server stopped");
        Ok(())
    }
}

/// Runs one connection until the peer closes it or shutdown is requested.
async fn serve_connection(
    routes: Routes,
    io: TokioIo<tokio::net::TcpStream>,
    remote_addr: SocketAddr,
    mut stop: watch::Receiver<()>,
) {
    // Called once per request on the connection.
    let svc = service_fn(move |req| {
        let routes = routes.clone();
        async move { dispatch(routes, req, remote_addr).await }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(io, svc);
    tokio::pin!(conn);

    let res = tokio::select! {
        res = conn.as_mut() => res,
        _ = stop.changed() => {
            debug!(peer = %remote_addr, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = res {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

/// Waits for connection tasks to finish, aborting whatever is left after
/// `timeout`.
async fn drain(tasks: &mut JoinSet<()>, timeout: Duration) {
    let finished = tokio::time::timeout(timeout, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(open = tasks.len(), ?timeout, "drain timeout expired, aborting connections");
        tasks.shutdown().await;
    }
}

/// Collects the body and hands the request to the dispatch table. Every
/// failure becomes a response, so hyper never sees an error.
async fn dispatch(
    routes: Routes,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::error(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let req = Request::new(parts.method, parts.uri, parts.headers, body);
    Ok(routes.dispatch(req).await.into_inner())
}

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM and SIGINT (Ctrl-C); elsewhere only
/// Ctrl-C. A signal whose handler cannot be installed is logged and ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
