//! The `PositionValidator` trait: where chess rules plug in.

use knightwire_protocol::MoveDescriptor;

/// Applies moves to a position.
///
/// Rooms hold one `Position` each and never look inside it. All rule
/// knowledge, turn order included, lives in the implementation.
///
/// Like the rest of the room API this uses associated functions instead
/// of `&self`: a validator carries no state of its own.
pub trait PositionValidator: Send + Sync + 'static {
    /// The rules engine's position type.
    type Position: Send + Sync + Clone + 'static;

    /// The position every new room starts from.
    fn initial() -> Self::Position;

    /// Plays `mv` on `position`.
    ///
    /// Returns the resulting position, or a human-readable reason when the
    /// move is illegal or can't be understood. The reason is only logged;
    /// the client gets the move echoed back.
    fn apply(position: &Self::Position, mv: &MoveDescriptor) -> Result<Self::Position, String>;
}
