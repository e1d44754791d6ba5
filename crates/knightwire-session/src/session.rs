//! Per-connection session state.
//!
//! A session is the coordinator's record of one socket: the [`Peer`]
//! used to reach it and the room it last joined. Rooms never store this;
//! the gateway owns the session for as long as the socket is open.

use knightwire_protocol::GameCode;
use knightwire_room::Peer;
use knightwire_transport::ConnectionId;

/// One connection's view of where it belongs.
#[derive(Debug)]
pub struct Session {
    peer: Peer,
    /// Set by a successful join. A `leave` keeps it, so a later move is
    /// answered with `NOT_A_PLAYER` instead of being dropped.
    game: Option<GameCode>,
}

impl Session {
    pub fn new(peer: Peer) -> Self {
        Self { peer, game: None }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn id(&self) -> ConnectionId {
        self.peer.id()
    }

    /// The room this connection is attached to, if any.
    pub fn game(&self) -> Option<&GameCode> {
        self.game.as_ref()
    }

    pub(crate) fn attach(&mut self, code: GameCode) {
        self.game = Some(code);
    }

    pub(crate) fn take_game(&mut self) -> Option<GameCode> {
        self.game.take()
    }
}
