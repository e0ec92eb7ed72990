//! `RotationServer` builder and engine loop.
//!
//! This is the entry point for running Mapcycle against one game server.
//! It ties together all the layers: remote client → engine → handles.

use std::time::Duration;

use mapcycle_protocol::ServerCallback;
use mapcycle_rotation::{MapEngine, RotationConfig};
use mapcycle_rpc::{RemoteClient, Timeout};
use mapcycle_session::{Authorizer, SessionConfig};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::handle::{Command, EngineHandle};
use crate::handler::{authorize_players, handle_callback, handle_command, refresh};
use crate::MapcycleError;

/// Builder for configuring a rotation server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use mapcycle::prelude::*;
///
/// # async fn demo(remote: InMemoryServer) -> Result<(), MapcycleError> {
/// let feed = remote.callbacks();
/// let server = RotationServerBuilder::new()
///     .rpc_timeout(Duration::from_secs(5))
///     .refresh_interval(Duration::from_secs(300))
///     .build(remote, StaticAuthorizer::new(), feed);
/// let handle = server.handle();
/// tokio::spawn(server.run());
/// handle.skip_map().await?;
/// # Ok(())
/// # }
/// ```
pub struct RotationServerBuilder {
    config: RotationConfig,
    session_config: SessionConfig,
    rpc_timeout: Duration,
    refresh_interval: Option<Duration>,
    channel_size: usize,
}

impl RotationServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RotationConfig::default(),
            session_config: SessionConfig::default(),
            rpc_timeout: Duration::from_secs(10),
            refresh_interval: None,
            channel_size: 64,
        }
    }

    /// Sets the rotation and jukebox configuration.
    pub fn config(mut self, config: RotationConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the roster configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the deadline for every remote call.
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Enables a periodic resync and roster cleanup.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Sets the command channel capacity. Handles wait when it is full.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Builds the server around `remote`, consulting `authorizer` for
    /// connecting players and reading callbacks from `feed`.
    pub fn build<R, A>(
        self,
        remote: R,
        authorizer: A,
        feed: mpsc::UnboundedReceiver<ServerCallback>,
    ) -> RotationServer<R, A>
    where
        R: RemoteClient,
        A: Authorizer,
    {
        let remote = Timeout::new(remote, self.rpc_timeout);
        let engine = MapEngine::new(remote, self.config, self.session_config);
        let (sender, commands) = mpsc::channel(self.channel_size);

        RotationServer {
            engine,
            authorizer,
            feed,
            commands,
            sender,
            refresh_interval: self.refresh_interval,
        }
    }
}

impl Default for RotationServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A map engine bound to one game server, ready to run.
///
/// Take as many [`handle`](Self::handle)s as needed, then call
/// [`run`](Self::run) (usually inside `tokio::spawn`).
pub struct RotationServer<R: RemoteClient, A: Authorizer> {
    engine: MapEngine<Timeout<R>>,
    authorizer: A,
    feed: mpsc::UnboundedReceiver<ServerCallback>,
    commands: mpsc::Receiver<Command>,
    sender: mpsc::Sender<Command>,
    refresh_interval: Option<Duration>,
}

impl<R, A> RotationServer<R, A>
where
    R: RemoteClient,
    A: Authorizer,
{
    /// Returns a handle to the engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.sender.clone())
    }

    /// Runs the engine loop.
    ///
    /// Attaches to the server first; if that fails the engine starts
    /// empty and fills in on the next map begin or list change. Then
    /// processes, one at a time, server callbacks, handle commands and
    /// refresh ticks. Pending callbacks always go first so commands see
    /// the latest server state.
    ///
    /// Returns after [`EngineHandle::shutdown`] or once every handle has
    /// been dropped.
    pub async fn run(self) -> Result<(), MapcycleError> {
        let Self {
            mut engine,
            authorizer,
            mut feed,
            mut commands,
            sender,
            refresh_interval,
        } = self;
        drop(sender);

        tracing::info!("map engine running");
        if let Err(e) = engine.start().await {
            tracing::warn!(error = %e, "initial attach failed, waiting for server events");
        }
        let present = engine.roster().connected_players();
        authorize_players(&mut engine, &authorizer, present).await;

        let mut ticker = refresh_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let mut feed_open = true;

        loop {
            tokio::select! {
                biased;

                callback = feed.recv(), if feed_open => match callback {
                    Some(callback) => handle_callback(&mut engine, &authorizer, callback).await,
                    None => {
                        tracing::warn!("server callback feed closed");
                        feed_open = false;
                    }
                },

                command = commands.recv() => match command {
                    Some(command) => {
                        if handle_command(&mut engine, command).await {
                            break;
                        }
                    }
                    None => {
                        tracing::info!("all engine handles dropped");
                        break;
                    }
                },

                _ = next_tick(&mut ticker) => refresh(&mut engine, &authorizer).await,
            }
        }

        tracing::info!("map engine stopped");
        Ok(())
    }
}

/// Waits for the next refresh tick, or forever when refresh is off.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
