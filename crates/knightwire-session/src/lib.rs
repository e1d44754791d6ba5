//! Session coordination for Knightwire.
//!
//! This crate turns inbound client messages into room mutations and
//! outbound frames:
//!
//! 1. **Sessions**: which room each connection is attached to ([`Session`])
//! 2. **Coordination**: join, move, leave, and disconnect handling
//!    ([`Coordinator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)  ← owns one Session per socket, feeds it frames
//!     ↕
//! Session Layer (this crate)  ← decodes, dispatches, replies, broadcasts
//!     ↕
//! Room Layer (below)  ← seats, history, deletion timers
//! ```

mod coordinator;
mod session;

pub use coordinator::Coordinator;
pub use session::Session;
