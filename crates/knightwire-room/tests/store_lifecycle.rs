//! Room store lifecycle tests: creation, deferred deletion, and the races
//! between a firing timer and a join. Time is paused so the grace window
//! elapses instantly.

use std::time::Duration;

use knightwire_protocol::{Color, MoveDescriptor, PlayerToken};
use knightwire_room::{Peer, PositionValidator, RoomConfig, RoomError, RoomStore};
use knightwire_transport::ConnectionId;

// =========================================================================
// Test validator: every move is legal.
// =========================================================================

struct AnythingGoes;

impl PositionValidator for AnythingGoes {
    type Position = ();

    fn initial() {}

    fn apply(_position: &(), _mv: &MoveDescriptor) -> Result<(), String> {
        Ok(())
    }
}

const GRACE: Duration = Duration::from_secs(300);

fn store() -> RoomStore<AnythingGoes> {
    RoomStore::new(RoomConfig::default())
}

fn peer(id: u64) -> Peer {
    Peer::channel(ConnectionId::new(id)).0
}

/// Lets spawned timer tasks run to completion.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

// =========================================================================
// Creation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_returns_unique_codes() {
    let store = store();
    let a = store.create().await.unwrap();
    let b = store.create().await.unwrap();
    assert_ne!(a, b);
    assert_eq!(store.room_count().await, 2);
    assert!(store.get(&a).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_create_with_no_attempts_reports_exhaustion() {
    let store: RoomStore<AnythingGoes> = RoomStore::new(RoomConfig {
        max_code_attempts: 0,
        ..RoomConfig::default()
    });
    let err = store.create().await.unwrap_err();
    assert!(matches!(err, RoomError::CodeSpaceExhausted(0)));
    assert_eq!(store.room_count().await, 0);
}

// =========================================================================
// Deferred deletion
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_unjoined_room_is_removed_after_grace() {
    let store = store();
    let code = store.create().await.unwrap();

    tokio::time::sleep(GRACE - Duration::from_secs(1)).await;
    settle().await;
    assert!(store.contains(&code).await, "still inside the window");

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert!(!store.contains(&code).await);
}

#[tokio::test(start_paused = true)]
async fn test_join_just_before_grace_cancels_deletion() {
    let store = store();
    let code = store.create().await.unwrap();

    tokio::time::sleep(GRACE - Duration::from_secs(1)).await;
    {
        let shared = store.get(&code).await.unwrap();
        let mut room = shared.lock().await;
        room.join(peer(1), &PlayerToken::new("a"), None).unwrap();
        assert!(!room.has_pending_deletion());
    }

    tokio::time::sleep(GRACE * 2).await;
    settle().await;
    assert!(store.contains(&code).await);
}

#[tokio::test(start_paused = true)]
async fn test_room_emptied_by_detach_is_removed_after_grace() {
    let store = store();
    let code = store.create().await.unwrap();
    let shared = store.get(&code).await.unwrap();

    {
        let mut room = shared.lock().await;
        room.join(peer(1), &PlayerToken::new("a"), None).unwrap();
    }
    tokio::time::sleep(GRACE * 2).await;
    settle().await;
    assert!(store.contains(&code).await, "occupied rooms never expire");

    {
        let mut room = shared.lock().await;
        let detached = room.detach(ConnectionId::new(1)).unwrap();
        assert!(detached.now_empty);
        store.schedule_deletion(&mut room);
    }
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    settle().await;
    assert!(!store.contains(&code).await);
    assert!(shared.lock().await.is_retired());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_keeps_room_and_history() {
    let store = store();
    let code = store.create().await.unwrap();
    let shared = store.get(&code).await.unwrap();

    {
        let mut room = shared.lock().await;
        room.join(peer(1), &PlayerToken::new("a"), None).unwrap();
        room.submit_move(ConnectionId::new(1), "e4".into()).unwrap();
        room.detach(ConnectionId::new(1)).unwrap();
        store.schedule_deletion(&mut room);
    }

    tokio::time::sleep(Duration::from_secs(120)).await;
    {
        let mut room = shared.lock().await;
        let outcome = room.join(peer(2), &PlayerToken::new("a"), None).unwrap();
        assert_eq!(outcome.color(), Color::White);
        assert_eq!(room.moves(), &[MoveDescriptor::from("e4")]);
    }

    tokio::time::sleep(GRACE * 2).await;
    settle().await;
    assert!(store.contains(&code).await);
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_replaces_previous_timer() {
    let store = store();
    let code = store.create().await.unwrap();
    let shared = store.get(&code).await.unwrap();

    // Re-arm halfway through: the room must survive the first deadline.
    tokio::time::sleep(GRACE / 2).await;
    store.schedule_deletion(&mut *shared.lock().await);

    tokio::time::sleep(GRACE / 2 + Duration::from_secs(1)).await;
    settle().await;
    assert!(store.contains(&code).await);

    tokio::time::sleep(GRACE / 2).await;
    settle().await;
    assert!(!store.contains(&code).await);
}

#[tokio::test(start_paused = true)]
async fn test_join_on_handle_to_expired_room_is_not_found() {
    let store = store();
    let code = store.create().await.unwrap();
    // Grab the handle first, as a join racing the timer would.
    let shared = store.get(&code).await.unwrap();

    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    settle().await;

    let mut room = shared.lock().await;
    let err = room
        .join(peer(1), &PlayerToken::new("a"), None)
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

// =========================================================================
// Explicit removal and shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_remove_refuses_occupied_room() {
    let store = store();
    let code = store.create().await.unwrap();
    {
        let shared = store.get(&code).await.unwrap();
        shared
            .lock()
            .await
            .join(peer(1), &PlayerToken::new("a"), None)
            .unwrap();
    }
    assert!(!store.remove(&code).await);
    assert!(store.contains(&code).await);
}

#[tokio::test(start_paused = true)]
async fn test_remove_empty_room_retires_it() {
    let store = store();
    let code = store.create().await.unwrap();
    let shared = store.get(&code).await.unwrap();

    assert!(store.remove(&code).await);
    assert!(!store.contains(&code).await);
    let room = shared.lock().await;
    assert!(room.is_retired());
    assert!(!room.has_pending_deletion());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_clears_rooms_and_timers() {
    let store = store();
    let a = store.create().await.unwrap();
    store.create().await.unwrap();
    let shared = store.get(&a).await.unwrap();

    store.shutdown().await;
    assert_eq!(store.room_count().await, 0);
    let room = shared.lock().await;
    assert!(room.is_retired());
    assert!(!room.has_pending_deletion());
}
