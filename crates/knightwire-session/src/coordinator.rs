//! The coordinator: dispatches client messages against the room store.
//!
//! Every inbound frame goes through [`Coordinator::handle_frame`]. Frames
//! that don't decode, or that decode to something meaningless (blank
//! code, `null` move), are dropped with a debug log and no reply. Domain
//! failures get a typed `error` frame sent to the offending connection
//! only.
//!
//! The coordinator never awaits a socket. All output goes through
//! [`Peer`] queues, so fan-out happens while the room lock is held and
//! every member sees broadcasts in the order moves were accepted.

use std::sync::Arc;

use knightwire_protocol::{
    ClientMessage, Codec, Color, CreateGameRequest, CreateGameResponse, GameCode, JsonCodec,
    MoveDescriptor, PlayerToken, ServerMessage,
};
use knightwire_room::{JoinOutcome, Peer, PositionValidator, RoomError, RoomStore};

use crate::Session;

/// Drives join, move, leave, and disconnect handling for every
/// connection.
///
/// One coordinator serves the whole server; wrap it in an `Arc` and hand
/// a clone to each connection task.
pub struct Coordinator<V: PositionValidator, C: Codec = JsonCodec> {
    rooms: RoomStore<V>,
    codec: C,
}

impl<V: PositionValidator> Coordinator<V> {
    /// Creates a coordinator speaking JSON.
    pub fn new(rooms: RoomStore<V>) -> Self {
        Self::with_codec(rooms, JsonCodec)
    }
}

impl<V: PositionValidator, C: Codec> Coordinator<V, C> {
    pub fn with_codec(rooms: RoomStore<V>, codec: C) -> Self {
        Self { rooms, codec }
    }

    pub fn rooms(&self) -> &RoomStore<V> {
        &self.rooms
    }

    /// Creates a room and echoes the requested color back for the
    /// client's first join.
    ///
    /// # Errors
    /// Fails only if no free game code could be generated.
    pub async fn create_game(
        &self,
        request: CreateGameRequest,
    ) -> Result<CreateGameResponse, RoomError> {
        let game_code = self.rooms.create().await?;
        Ok(CreateGameResponse {
            game_code,
            requested_color: request.requested_color,
        })
    }

    /// Decodes one inbound frame and dispatches it.
    pub async fn handle_frame(&self, session: &mut Session, data: &[u8]) {
        let msg = self
            .codec
            .decode::<ClientMessage>(data)
            .and_then(ClientMessage::validated);
        match msg {
            Ok(msg) => self.dispatch(session, msg).await,
            Err(e) => {
                tracing::debug!(conn_id = %session.id(), error = %e, "ignoring inbound frame");
            }
        }
    }

    /// Routes an already validated message to its handler.
    pub async fn dispatch(&self, session: &mut Session, msg: ClientMessage) {
        match msg {
            ClientMessage::Join {
                game_code,
                player_id,
                requested_color,
            } => {
                self.join(session, game_code, &player_id, requested_color)
                    .await
            }
            ClientMessage::Move { mv } => self.submit_move(session, mv).await,
            ClientMessage::Leave { game_code } => self.leave(session, &game_code).await,
        }
    }

    /// Seats the connection, or gives a returning player their seat back.
    ///
    /// If the connection was attached to another room it leaves that room
    /// first. A missing room or a full room gets an error reply and the
    /// connection is closed.
    pub async fn join(
        &self,
        session: &mut Session,
        game_code: GameCode,
        player: &PlayerToken,
        requested: Option<Color>,
    ) {
        if let Some(previous) = session.game().filter(|g| **g != game_code).cloned() {
            self.detach(session.peer(), &previous).await;
            session.take_game();
        }

        let Some(shared) = self.rooms.get(&game_code).await else {
            tracing::info!(%game_code, conn_id = %session.id(), "join for unknown room");
            session.take_game();
            self.reject(session.peer(), &RoomError::NotFound(game_code));
            return;
        };

        let mut room = shared.lock().await;
        match room.join(session.peer().clone(), player, requested) {
            Ok(JoinOutcome::AlreadySeated(color)) => {
                tracing::debug!(%game_code, conn_id = %session.id(), %color, "duplicate join ignored");
            }
            Ok(outcome) => {
                let color = outcome.color();
                match &outcome {
                    JoinOutcome::Reconnected { evicted, .. } => {
                        if let Some(old) = evicted {
                            tracing::warn!(
                                %game_code,
                                conn_id = %old.id(),
                                replaced_by = %session.id(),
                                %color,
                                "seat taken over by reconnecting player"
                            );
                            old.close();
                        }
                        tracing::info!(%game_code, conn_id = %session.id(), %color, "player reconnected");
                    }
                    _ => {
                        tracing::info!(%game_code, conn_id = %session.id(), %color, "player joined");
                    }
                }
                let reply = ServerMessage::Joined {
                    color,
                    moves: room.moves().to_vec(),
                };
                self.send(session.peer(), &reply);
                session.attach(game_code);
            }
            Err(err) => {
                drop(room);
                tracing::info!(%game_code, conn_id = %session.id(), error = %err, "join rejected");
                session.take_game();
                self.reject(session.peer(), &err);
            }
        }
    }

    /// Plays a move in the connection's room and broadcasts the new
    /// history to everyone attached.
    pub async fn submit_move(&self, session: &mut Session, mv: MoveDescriptor) {
        let Some(code) = session.game().cloned() else {
            tracing::debug!(conn_id = %session.id(), "move outside a room ignored");
            return;
        };
        let Some(shared) = self.rooms.get(&code).await else {
            tracing::debug!(game_code = %code, conn_id = %session.id(), "move for deleted room ignored");
            return;
        };

        let mut room = shared.lock().await;
        let accepted = room
            .submit_move(session.id(), mv)
            .map(|history| history.to_vec());
        match accepted {
            Ok(moves) => {
                let ply = moves.len();
                let Some(text) = self.encode(&ServerMessage::Sync { moves }) else {
                    return;
                };
                for peer in room.peers() {
                    peer.send_text(Arc::clone(&text));
                }
                tracing::debug!(game_code = %code, conn_id = %session.id(), ply, "move accepted");
            }
            Err(RoomError::NotFound(_)) => {
                tracing::debug!(game_code = %code, conn_id = %session.id(), "move for retired room ignored");
            }
            Err(err) => {
                drop(room);
                self.reject(session.peer(), &err);
            }
        }
    }

    /// Detaches the connection from `game_code` without closing it.
    ///
    /// The session keeps pointing at the room, so a later move is told
    /// `NOT_A_PLAYER`. A leave for a room the connection isn't in does
    /// nothing.
    pub async fn leave(&self, session: &mut Session, game_code: &GameCode) {
        if !self.detach(session.peer(), game_code).await {
            tracing::debug!(%game_code, conn_id = %session.id(), "leave for room not joined ignored");
        }
    }

    /// Cleans up after a closed socket.
    pub async fn disconnect(&self, session: &mut Session) {
        session.peer().mark_closed();
        if let Some(code) = session.take_game() {
            self.detach(session.peer(), &code).await;
        }
    }

    /// Shared leave/close cleanup. Returns `false` if `peer` wasn't
    /// attached to the room.
    async fn detach(&self, peer: &Peer, code: &GameCode) -> bool {
        let Some(shared) = self.rooms.get(code).await else {
            return false;
        };
        let mut room = shared.lock().await;
        let Some(detached) = room.detach(peer.id()) else {
            return false;
        };
        tracing::info!(
            game_code = %code,
            conn_id = %peer.id(),
            vacated = ?detached.vacated,
            remaining = room.connection_count(),
            "connection left room"
        );
        if detached.now_empty && !room.is_retired() {
            self.rooms.schedule_deletion(&mut room);
        }
        true
    }

    fn reject(&self, peer: &Peer, err: &RoomError) {
        if let Some(code) = err.code() {
            let reply = ServerMessage::Error {
                code,
                message: err.to_string(),
            };
            self.send(peer, &reply);
        }
        if err.closes_connection() {
            peer.close();
        }
    }

    fn send(&self, peer: &Peer, msg: &ServerMessage) {
        if let Some(text) = self.encode(msg) {
            peer.send_text(text);
        }
    }

    fn encode(&self, msg: &ServerMessage) -> Option<Arc<str>> {
        match self.codec.encode(msg) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound message");
                None
            }
        }
    }
}
