//! `GallowsServer` builder and accept loop.
//!
//! This is the entry point for running a hangman server. It ties
//! together all the layers: transport → protocol → session → lobby → game.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gallows_lobby::LobbyManager;
use gallows_protocol::LobbyId;
use gallows_transport::{Connection, TcpConnection, TcpTransport, Transport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admission::admit;
use crate::config::millis;
use crate::shutdown::{self, ShutdownHandle};
use crate::supervisor::run_supervisor;
use crate::{GallowsError, ServerConfig};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared server state passed to every task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. All
/// lobby and game bookkeeping sits behind the single `registry` lock.
pub(crate) struct ServerState<C: Connection> {
    pub(crate) registry: Mutex<Registry<C>>,
    pub(crate) config: ServerConfig,
    pub(crate) shutdown: ShutdownHandle,
}

impl<C: Connection> ServerState<C> {
    pub(crate) fn new(config: ServerConfig, shutdown: ShutdownHandle) -> Self {
        Self {
            registry: Mutex::new(Registry {
                lobbies: LobbyManager::new(),
                games: HashMap::new(),
            }),
            config,
            shutdown,
        }
    }
}

/// Every lobby and every running game.
pub(crate) struct Registry<C: Connection> {
    pub(crate) lobbies: LobbyManager<C>,
    pub(crate) games: HashMap<LobbyId, GameHandle>,
}

/// The supervisor's view of a running game session.
pub(crate) struct GameHandle {
    pub(crate) finished: Arc<AtomicBool>,
    pub(crate) task: JoinHandle<()>,
}

impl GameHandle {
    /// Whether the session is done, including by panic.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire) || self.task.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Gallows server.
///
/// # Example
///
/// ```rust,no_run
/// use gallows::prelude::*;
///
/// # async fn start() -> Result<(), GallowsError> {
/// let server = GallowsServer::builder()
///     .bind("127.0.0.1:5050")
///     .pacing_delay(std::time::Duration::from_millis(250))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GallowsServerBuilder {
    config: ServerConfig,
}

impl GallowsServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn supervisor_interval(mut self, interval: Duration) -> Self {
        self.config.supervisor_interval_ms = millis(interval);
        self
    }

    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.config.frame_delay_ms = millis(delay);
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config.pacing_delay_ms = millis(delay);
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = millis(timeout);
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_ms = millis(timeout);
        self
    }

    /// Validates the settings and binds the listener.
    pub async fn build(self) -> Result<GallowsServer, GallowsError> {
        self.config.validate()?;

        let transport = TcpTransport::bind(&self.config.bind_addr, self.config.backlog)
            .await?
            .with_frame_delay(self.config.frame_delay());

        let state = Arc::new(ServerState::new(self.config, ShutdownHandle::new()));
        Ok(GallowsServer { transport, state })
    }
}

impl Default for GallowsServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Gallows server.
///
/// Call [`run()`](Self::run) to start accepting players.
pub struct GallowsServer {
    transport: TcpTransport,
    state: Arc<ServerState<TcpConnection>>,
}

impl GallowsServer {
    /// Creates a new builder.
    pub fn builder() -> GallowsServerBuilder {
        GallowsServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle that stops [`run()`](Self::run) when triggered.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.state.shutdown.clone()
    }

    /// Runs the accept loop and the lobby supervisor until shutdown.
    ///
    /// Each accepted connection gets its own admission task. On shutdown
    /// the listener is dropped, players still waiting in lobbies are
    /// revoked, and games already under way are allowed to finish before
    /// this returns.
    pub async fn run(mut self) -> Result<(), GallowsError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Gallows server running");

        let supervisor = tokio::spawn(run_supervisor(Arc::clone(&self.state)));
        let mut stop = self.state.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown::wait(&mut stop) => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = admit(conn, state).await {
                                tracing::debug!(error = %e, "admission ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        drop(self.transport);

        if let Err(e) = supervisor.await {
            tracing::error!(error = %e, "supervisor task failed");
        }

        drain(&self.state).await;
        tracing::info!("Gallows server stopped");
        Ok(())
    }
}

/// Revokes everyone still waiting, then waits out the running games.
async fn drain<C: Connection>(state: &ServerState<C>) {
    let (waiting, games) = {
        let mut registry = state.registry.lock().await;
        let mut waiting = Vec::new();
        for lobby_id in registry.lobbies.waiting_ids() {
            if let Ok(lobby) = registry.lobbies.remove(lobby_id) {
                waiting.extend(lobby.players());
            }
        }
        let games: Vec<_> = registry.games.drain().collect();
        (waiting, games)
    };

    for player in waiting {
        player.revoke().await;
    }

    for (lobby_id, handle) in games {
        tracing::info!(%lobby_id, "waiting for game to finish");
        if let Err(e) = handle.task.await {
            tracing::error!(%lobby_id, error = %e, "game task failed");
        }
    }
}
