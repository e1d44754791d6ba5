//! Per-game state: seats, move history, attached connections.
//!
//! A `Room` is plain data. It never sends anything itself; callers hold
//! the room's lock, mutate it, and fan out whatever the outcome says while
//! still holding the lock so every member sees frames in the same order.

use std::collections::HashMap;

use knightwire_protocol::{Color, GameCode, MoveDescriptor, PlayerToken};
use knightwire_transport::ConnectionId;
use tokio::task::AbortHandle;

use crate::{Peer, PositionValidator, RoomError};

/// A scheduled deletion. The token tells a firing timer whether it is
/// still the current one.
#[derive(Debug)]
pub(crate) struct PendingDeletion {
    pub(crate) token: u64,
    pub(crate) abort: AbortHandle,
}

/// What a successful [`Room::join`] did.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection already had this seat. Nothing changed.
    AlreadySeated(Color),
    /// The identity was bound to `color` and got it back. `evicted` is the
    /// connection that held the seat until now, if any.
    Reconnected { color: Color, evicted: Option<Peer> },
    /// A new identity took a free seat.
    Seated { color: Color },
}

impl JoinOutcome {
    pub fn color(&self) -> Color {
        match self {
            Self::AlreadySeated(color)
            | Self::Reconnected { color, .. }
            | Self::Seated { color } => *color,
        }
    }
}

/// What [`Room::detach`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detached {
    /// The seat the connection gave up, if it had one.
    pub vacated: Option<Color>,
    /// No connections remain.
    pub now_empty: bool,
}

/// One game.
pub struct Room<V: PositionValidator> {
    code: GameCode,
    position: V::Position,
    moves: Vec<MoveDescriptor>,
    /// Indexed by [`Color::index`].
    seats: [Option<Peer>; 2],
    /// Everyone who receives broadcasts. Seated peers are always here too.
    connections: HashMap<ConnectionId, Peer>,
    /// Last seat handed to each identity. Survives disconnects.
    identities: HashMap<PlayerToken, Color>,
    pending: Option<PendingDeletion>,
    retired: bool,
}

impl<V: PositionValidator> Room<V> {
    pub(crate) fn new(code: GameCode) -> Self {
        Self {
            code,
            position: V::initial(),
            moves: Vec::new(),
            seats: [None, None],
            connections: HashMap::new(),
            identities: HashMap::new(),
            pending: None,
            retired: false,
        }
    }

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    pub fn position(&self) -> &V::Position {
        &self.position
    }

    /// Accepted moves in play order.
    pub fn moves(&self) -> &[MoveDescriptor] {
        &self.moves
    }

    pub fn seat(&self, color: Color) -> Option<&Peer> {
        self.seats[color.index()].as_ref()
    }

    /// The seat `conn` occupies, if any.
    pub fn color_of(&self, conn: ConnectionId) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|color| self.seat(*color).is_some_and(|p| p.id() == conn))
    }

    /// The seat last bound to `player`.
    pub fn bound_color(&self, player: &PlayerToken) -> Option<Color> {
        self.identities.get(player).copied()
    }

    pub fn is_member(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Every attached connection, in no particular order.
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.connections.values()
    }

    /// `true` once the store has deleted this room. A retired room accepts
    /// nothing.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn has_pending_deletion(&self) -> bool {
        self.pending.is_some()
    }

    /// Seats `peer`, or gives `player` its previous seat back.
    ///
    /// Any pending deletion is cancelled first, even if the join then
    /// fails.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room was retired.
    /// - [`RoomError::RoomFull`] if `player` is new and both seats are taken.
    pub fn join(
        &mut self,
        peer: Peer,
        player: &PlayerToken,
        requested: Option<Color>,
    ) -> Result<JoinOutcome, RoomError> {
        if self.retired {
            return Err(RoomError::NotFound(self.code.clone()));
        }
        self.cancel_deletion();

        if let Some(color) = self.color_of(peer.id()) {
            return Ok(JoinOutcome::AlreadySeated(color));
        }

        if let Some(color) = self.bound_color(player) {
            let evicted = self.seats[color.index()].take();
            if let Some(old) = &evicted {
                self.connections.remove(&old.id());
            }
            self.occupy(color, peer);
            return Ok(JoinOutcome::Reconnected { color, evicted });
        }

        let color = self
            .resolve_color(requested)
            .ok_or_else(|| RoomError::RoomFull(self.code.clone()))?;
        self.identities.retain(|_, bound| *bound != color);
        self.identities.insert(player.clone(), color);
        self.occupy(color, peer);
        Ok(JoinOutcome::Seated { color })
    }

    /// Plays `mv` for the seated connection `conn` and returns the new
    /// history.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room was retired.
    /// - [`RoomError::NotAPlayer`] if `conn` holds no seat.
    /// - [`RoomError::IllegalMove`] if the validator rejects the move.
    ///   Nothing changes in that case.
    pub fn submit_move(
        &mut self,
        conn: ConnectionId,
        mv: MoveDescriptor,
    ) -> Result<&[MoveDescriptor], RoomError> {
        if self.retired {
            return Err(RoomError::NotFound(self.code.clone()));
        }
        if self.color_of(conn).is_none() {
            return Err(RoomError::NotAPlayer);
        }
        match V::apply(&self.position, &mv) {
            Ok(next) => {
                self.position = next;
                self.moves.push(mv);
                Ok(&self.moves)
            }
            Err(reason) => {
                tracing::debug!(game_code = %self.code, conn_id = %conn, %mv, %reason, "move rejected");
                Err(RoomError::IllegalMove(mv.to_string()))
            }
        }
    }

    /// Removes `conn` from the room and frees its seat. Identity bindings
    /// are kept so the player can come back.
    ///
    /// Returns `None` if `conn` wasn't attached.
    pub fn detach(&mut self, conn: ConnectionId) -> Option<Detached> {
        self.connections.remove(&conn)?;
        let vacated = self.color_of(conn);
        if let Some(color) = vacated {
            self.seats[color.index()] = None;
        }
        let now_empty = self.connections.is_empty();
        if !now_empty {
            self.cancel_deletion();
        }
        Some(Detached { vacated, now_empty })
    }

    fn resolve_color(&self, requested: Option<Color>) -> Option<Color> {
        let free = |color: Color| self.seat(color).is_none();
        match requested {
            Some(color) if free(color) => Some(color),
            Some(color) => Some(color.other()).filter(|other| free(*other)),
            None => Color::ALL.into_iter().find(|color| free(*color)),
        }
    }

    fn occupy(&mut self, color: Color, peer: Peer) {
        self.connections.insert(peer.id(), peer.clone());
        self.seats[color.index()] = Some(peer);
    }

    // -- Deletion bookkeeping, driven by the store ------------------------

    /// Installs a new pending deletion, cancelling any earlier one.
    pub(crate) fn set_pending_deletion(&mut self, pending: PendingDeletion) {
        self.cancel_deletion();
        self.pending = Some(pending);
    }

    /// Aborts the pending deletion timer. Returns `true` if one was set.
    pub(crate) fn cancel_deletion(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.abort.abort();
                tracing::debug!(game_code = %self.code, token = pending.token, "room deletion cancelled");
                true
            }
            None => false,
        }
    }

    /// Called by a firing timer. If the timer with `token` is still the
    /// current one and the room is still empty, clears it and returns
    /// `true`.
    pub(crate) fn take_due_deletion(&mut self, token: u64) -> bool {
        let due = !self.retired
            && self.connections.is_empty()
            && self.pending.as_ref().is_some_and(|p| p.token == token);
        if due {
            self.pending = None;
        }
        due
    }

    /// Marks the room deleted and stops its timer.
    pub(crate) fn retire(&mut self) {
        self.cancel_deletion();
        self.retired = true;
    }
}
