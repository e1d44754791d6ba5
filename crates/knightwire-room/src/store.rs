//! The room store: owns every room and its deletion timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use knightwire_protocol::GameCode;
use rand::Rng;
use tokio::sync::Mutex;

use crate::room::PendingDeletion;
use crate::{PositionValidator, Room, RoomConfig, RoomError};

/// A room behind its own lock, as handed out by [`RoomStore::get`].
pub type SharedRoom<V> = Arc<Mutex<Room<V>>>;

/// Process-wide registry of rooms, keyed by game code.
///
/// Cheap to clone; clones share the same rooms. Deletion timers only hold
/// a weak reference, so dropping the last clone lets them fizzle out.
pub struct RoomStore<V: PositionValidator> {
    inner: Arc<Inner<V>>,
}

struct Inner<V: PositionValidator> {
    rooms: Mutex<HashMap<GameCode, SharedRoom<V>>>,
    config: RoomConfig,
    next_token: AtomicU64,
}

impl<V: PositionValidator> Clone for RoomStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: PositionValidator> RoomStore<V> {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: Mutex::new(HashMap::new()),
                config,
                next_token: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.inner.config
    }

    /// Creates an empty room under a fresh code.
    ///
    /// The room starts with its deletion timer running, so a room nobody
    /// joins disappears after the grace window.
    ///
    /// # Errors
    /// Returns [`RoomError::CodeSpaceExhausted`] if every attempt collided.
    pub async fn create(&self) -> Result<GameCode, RoomError> {
        let attempts = self.inner.config.max_code_attempts;
        let mut rooms = self.inner.rooms.lock().await;

        let code = std::iter::repeat_with(generate_code)
            .take(attempts)
            .find(|code| !rooms.contains_key(code))
            .ok_or(RoomError::CodeSpaceExhausted(attempts))?;

        let mut room = Room::new(code.clone());
        self.schedule_deletion(&mut room);
        rooms.insert(code.clone(), Arc::new(Mutex::new(room)));

        tracing::info!(game_code = %code, rooms = rooms.len(), "room created");
        Ok(code)
    }

    /// Looks up a room. The returned handle may point at a room that is
    /// retired by the time its lock is acquired; check
    /// [`Room::is_retired`].
    pub async fn get(&self, code: &GameCode) -> Option<SharedRoom<V>> {
        self.inner.rooms.lock().await.get(code).cloned()
    }

    /// Deletes a room right away, but only if nobody is attached to it.
    /// Returns `true` if the room was deleted.
    pub async fn remove(&self, code: &GameCode) -> bool {
        let mut rooms = self.inner.rooms.lock().await;
        let Some(shared) = rooms.get(code).cloned() else {
            return false;
        };
        let mut room = shared.lock().await;
        if room.connection_count() > 0 {
            return false;
        }
        room.retire();
        drop(room);
        rooms.remove(code);
        tracing::info!(game_code = %code, "room removed");
        true
    }

    /// Starts the grace-window timer for `room`, replacing any timer it
    /// already had.
    ///
    /// Call with the room's lock held. The timer re-checks emptiness when
    /// it fires, so a join that lands first wins.
    pub fn schedule_deletion(&self, room: &mut Room<V>) {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let grace = self.inner.config.deletion_grace;
        let code = room.code().clone();
        let store = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(inner) = Weak::upgrade(&store) {
                inner.expire(&code, token).await;
            }
        });

        room.set_pending_deletion(PendingDeletion {
            token,
            abort: task.abort_handle(),
        });
        tracing::debug!(game_code = %room.code(), token, ?grace, "room deletion scheduled");
    }

    pub async fn room_count(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }

    pub async fn contains(&self, code: &GameCode) -> bool {
        self.inner.rooms.lock().await.contains_key(code)
    }

    /// Retires every room and cancels every pending deletion.
    pub async fn shutdown(&self) {
        let mut rooms = self.inner.rooms.lock().await;
        for shared in rooms.values() {
            shared.lock().await.retire();
        }
        let count = rooms.len();
        rooms.clear();
        tracing::info!(rooms = count, "room store shut down");
    }
}

impl<V: PositionValidator> Inner<V> {
    /// Timer body. Lock order is map, then room.
    async fn expire(&self, code: &GameCode, token: u64) {
        let mut rooms = self.rooms.lock().await;
        let Some(shared) = rooms.get(code).cloned() else {
            return;
        };
        let mut room = shared.lock().await;
        if !room.take_due_deletion(token) {
            tracing::debug!(game_code = %code, token, "stale deletion timer ignored");
            return;
        }
        room.retire();
        drop(room);
        rooms.remove(code);
        tracing::info!(game_code = %code, "room removed after grace window");
    }
}

/// Generates a 12-character uppercase hex code (48 bits of entropy).
fn generate_code() -> GameCode {
    let bytes: [u8; 6] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
    GameCode::new(hex)
}
