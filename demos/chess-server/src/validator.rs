//! Chess rules via `shakmaty`.

use knightwire::prelude::{MoveDescriptor, PositionValidator};
use shakmaty::san::SanPlus;
use shakmaty::uci::Uci;
use shakmaty::{Chess, Move, Position};

/// Standard chess, starting from the initial position.
///
/// Accepts moves in three shapes:
/// - SAN strings: `"e4"`, `"Nf3"`, `"O-O"`, `"exd8=Q+"`
/// - UCI strings: `"e2e4"`, `"e7e8q"`
/// - coordinate objects: `{"from": "e2", "to": "e4", "promotion": "q"}`
pub struct ShakmatyValidator;

impl PositionValidator for ShakmatyValidator {
    type Position = Chess;

    fn initial() -> Chess {
        Chess::default()
    }

    fn apply(position: &Chess, mv: &MoveDescriptor) -> Result<Chess, String> {
        let m = to_legal_move(position, mv)?;
        let mut next = position.clone();
        next.play_unchecked(&m);
        Ok(next)
    }
}

fn to_legal_move(position: &Chess, mv: &MoveDescriptor) -> Result<Move, String> {
    if let Some(text) = mv.as_str() {
        return from_san(position, text).or_else(|san_err| {
            from_uci(position, text).map_err(|_| san_err)
        });
    }

    let value = mv.as_value();
    let field = |name: &str| value.get(name).and_then(|v| v.as_str());
    match (field("from"), field("to")) {
        (Some(from), Some(to)) => {
            let promotion = field("promotion").unwrap_or("").to_ascii_lowercase();
            from_uci(position, &format!("{from}{to}{promotion}"))
        }
        _ => Err(format!("unsupported move shape: {value}")),
    }
}

fn from_san(position: &Chess, text: &str) -> Result<Move, String> {
    let san: SanPlus = text.trim().parse().map_err(|e| format!("{e}"))?;
    san.san.to_move(position).map_err(|e| format!("{e}"))
}

fn from_uci(position: &Chess, text: &str) -> Result<Move, String> {
    let uci: Uci = text.trim().parse().map_err(|e| format!("{e}"))?;
    uci.to_move(position).map_err(|e| format!("{e}"))
}
