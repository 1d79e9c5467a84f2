//! Server supervisor: accept loop with restart-on-error and graceful drain
//!
//! ```text
//! Starting -> Running -> (ListenError -> Starting)* -> ShuttingDown -> Stopped
//! ```
//!
//! Cancelling the token passed to [`Supervisor::run`] is the only way to stop
//! the server. `run` returns once the accept loop task has exited and every
//! connection task has finished or been aborted.
//!
//! There is no backoff between restarts: a listener that keeps failing to bind
//! is retried in a tight loop until shutdown is requested. Accept errors never
//! restart the listener; they are logged and the loop keeps accepting, after a
//! short pause unless the error only concerned the incoming connection.

use crate::error::{Error, Result};
use crate::http::ResizeService;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Lifecycle state published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    /// Accepting connections on the bound address
    Running(SocketAddr),
    /// The listener failed; the message is the error
    ListenError(String),
    ShuttingDown,
    Stopped,
}

/// Wait after an accept error that is not tied to one connection (EMFILE and the like)
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Accept failures that only concern the connection being accepted
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// `host:port` to bind
    pub addr: String,
    /// Limit for reading request headers
    pub read_timeout: Duration,
    /// Drain budget for in-flight requests once shutdown starts
    pub shutdown_timeout: Duration,
    pub restart_on_error: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9000".to_string(),
            read_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(60),
            restart_on_error: true,
        }
    }
}

struct Shared {
    options: SupervisorOptions,
    service: Arc<ResizeService>,
    state: watch::Sender<ServerState>,
    in_shutdown: AtomicBool,
    stop: CancellationToken,
}

impl Shared {
    fn publish(&self, state: ServerState) {
        self.state.send_replace(state);
    }
}

pub struct Supervisor {
    options: SupervisorOptions,
    service: Arc<ResizeService>,
    state: watch::Sender<ServerState>,
}

impl Supervisor {
    pub fn new(options: SupervisorOptions, service: Arc<ResizeService>) -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        Self { options, service, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ServerState {
        self.state.borrow().clone()
    }

    /// Serve until `token` is cancelled.
    ///
    /// Returns early with [`Error::Listen`] if the listener cannot bind while
    /// restarts are disabled.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        let shared = Arc::new(Shared {
            options: self.options.clone(),
            service: Arc::clone(&self.service),
            state: self.state.clone(),
            in_shutdown: AtomicBool::new(false),
            stop: CancellationToken::new(),
        });

        let mut accept_loop = tokio::spawn(Self::supervise(Arc::clone(&shared)));

        let finished_early = tokio::select! {
            _ = token.cancelled() => None,
            joined = &mut accept_loop => Some(joined),
        };

        let joined = match finished_early {
            Some(joined) => joined,
            None => {
                log::info!("shutdown requested");
                shared.in_shutdown.store(true, Ordering::SeqCst);
                shared.publish(ServerState::ShuttingDown);
                shared.stop.cancel();
                accept_loop.await
            }
        };

        shared.publish(ServerState::Stopped);
        log::info!("server stopped");

        joined.map_err(|e| Error::Listen(format!("accept loop aborted: {}", e)))?
    }

    async fn supervise(shared: Arc<Shared>) -> Result<()> {
        loop {
            if shared.in_shutdown.load(Ordering::SeqCst) {
                log::debug!("in shutdown, not starting the listener again");
                return Ok(());
            }

            shared.publish(ServerState::Starting);

            match Self::listen_and_serve(&shared).await {
                Ok(()) => return Ok(()),
                Err(_) if shared.in_shutdown.load(Ordering::SeqCst) => return Ok(()),
                Err(e) => {
                    shared.publish(ServerState::ListenError(e.to_string()));
                    if !shared.options.restart_on_error {
                        log::error!("{}, restart on error is disabled", e);
                        return Err(e);
                    }
                    log::error!("{}, will restart", e);
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    async fn listen_and_serve(shared: &Arc<Shared>) -> Result<()> {
        let addr = &shared.options.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Listen(format!("cannot bind {}: {}", addr, e)))?;
        let local = listener.local_addr()?;

        shared.publish(ServerState::Running(local));
        log::info!("✅ server listening on http://{}", local);

        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new()).header_read_timeout(shared.options.read_timeout);

        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shared.stop.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let service = Arc::clone(&shared.service);
                        let handler = service_fn(move |req| {
                            let service = Arc::clone(&service);
                            async move { Ok::<_, Infallible>(service.handle(req).await) }
                        });

                        let conn = builder.serve_connection(TokioIo::new(stream), handler);
                        let conn = graceful.watch(conn);
                        connections.spawn(async move {
                            if let Err(e) = conn.await {
                                log::debug!("connection from {} ended: {}", remote, e);
                            }
                        });
                    }
                    Err(e) if is_connection_error(&e) => {
                        log::debug!("accept on {} dropped a connection: {}", local, e);
                    }
                    Err(e) => {
                        log::warn!(
                            "accept on {} failed: {}, pausing {:?}",
                            local,
                            e,
                            ACCEPT_ERROR_PAUSE
                        );
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        Self::drain(graceful, connections, shared.options.shutdown_timeout).await;
        Ok(())
    }

    /// Let in-flight requests finish within `timeout`, then abort what is left
    async fn drain(graceful: GracefulShutdown, mut connections: JoinSet<()>, timeout: Duration) {
        log::info!("draining {} connection(s)", connections.len());

        if tokio::time::timeout(timeout, graceful.shutdown()).await.is_err() {
            log::warn!(
                "graceful shutdown timed out after {:?}, closing {} connection(s)",
                timeout,
                connections.len()
            );
            connections.abort_all();
        }
        while connections.join_next().await.is_some() {}
    }
}
