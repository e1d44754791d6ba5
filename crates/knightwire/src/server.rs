//! `KnightwireServer` builder and server loop.
//!
//! This is the entry point for running a Knightwire relay. It ties the
//! layers together: transport → protocol → session → room.

use std::sync::Arc;

use knightwire_protocol::{Codec, CreateGameRequest, CreateGameResponse, JsonCodec};
use knightwire_room::{PositionValidator, RoomConfig, RoomError, RoomStore};
use knightwire_session::Coordinator;
use knightwire_transport::{Transport, WebSocketTransport};
use tokio::sync::Notify;

use crate::KnightwireError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a Knightwire server.
///
/// # Example
///
/// ```rust,ignore
/// use knightwire::prelude::*;
///
/// let server = KnightwireServerBuilder::new()
///     .bind("0.0.0.0:3001")
///     .room_config(RoomConfig::default())
///     .build::<MyRules>()
///     .await?;
/// server.run().await
/// ```
pub struct KnightwireServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl KnightwireServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address the WebSocket listener binds to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration (grace window, code attempts).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and builds a server speaking JSON.
    pub async fn build<V: PositionValidator>(
        self,
    ) -> Result<KnightwireServer<V, JsonCodec>, KnightwireError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener and builds a server with a custom codec.
    pub async fn build_with_codec<V: PositionValidator, C: Codec>(
        self,
        codec: C,
    ) -> Result<KnightwireServer<V, C>, KnightwireError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let rooms = RoomStore::new(self.room_config);
        let coordinator = Arc::new(Coordinator::with_codec(rooms, codec));

        Ok(KnightwireServer {
            transport,
            coordinator,
            stop: Arc::new(Notify::new()),
        })
    }
}

impl Default for KnightwireServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Knightwire server.
///
/// Take a [`ServerHandle`] before calling [`run()`](Self::run); the handle
/// is how rooms get created and how the server is stopped.
pub struct KnightwireServer<V: PositionValidator, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    coordinator: Arc<Coordinator<V, C>>,
    stop: Arc<Notify>,
}

impl<V: PositionValidator, C: Codec> KnightwireServer<V, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, KnightwireError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns a cloneable handle to the running server.
    pub fn handle(&self) -> ServerHandle<V, C> {
        ServerHandle {
            coordinator: Arc::clone(&self.coordinator),
            stop: Arc::clone(&self.stop),
        }
    }

    /// Runs the accept loop until [`ServerHandle::shutdown`] is called.
    ///
    /// Each accepted connection gets its own task. Connections already
    /// open when the loop stops keep running until their sockets close.
    pub async fn run(mut self) -> Result<(), KnightwireError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Knightwire server running");

        loop {
            tokio::select! {
                _ = self.stop.notified() => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let coordinator = Arc::clone(&self.coordinator);
                        tokio::spawn(handle_connection(conn, coordinator));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        tracing::info!("Knightwire server stopped");
        Ok(())
    }
}

/// Cloneable handle for talking to a server from outside the accept
/// loop, e.g. from an HTTP route.
pub struct ServerHandle<V: PositionValidator, C: Codec = JsonCodec> {
    coordinator: Arc<Coordinator<V, C>>,
    stop: Arc<Notify>,
}

impl<V: PositionValidator, C: Codec> Clone for ServerHandle<V, C> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            stop: Arc::clone(&self.stop),
        }
    }
}

impl<V: PositionValidator, C: Codec> ServerHandle<V, C> {
    /// Creates a room. See [`Coordinator::create_game`].
    pub async fn create_game(
        &self,
        request: CreateGameRequest,
    ) -> Result<CreateGameResponse, RoomError> {
        let created = self.coordinator.create_game(request).await?;
        tracing::info!(game_code = %created.game_code, requested_color = ?created.requested_color, "game created");
        Ok(created)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.coordinator.rooms().room_count().await
    }

    pub fn coordinator(&self) -> &Arc<Coordinator<V, C>> {
        &self.coordinator
    }

    /// Stops the accept loop and deletes every room, cancelling their
    /// deletion timers.
    pub async fn shutdown(&self) {
        self.stop.notify_one();
        self.coordinator.rooms().shutdown().await;
    }
}
