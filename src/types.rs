//! Core data model for the replay engine
//!
//! Defines the immutable move records produced by the parser, the derived
//! positions cached by the timeline, and the notification/display types handed
//! to UI consumers.
//!
//! # Indexing conventions
//!
//! - A ply index is 0-based: index 0 is white's first move.
//! - Timeline indices are `isize` with `-1` meaning the initial position,
//!   before any move has been played.
//! - A display move number is 1-based and covers one ply per side:
//!   plies 0 and 1 are both move number 1.

use shakmaty::fen::Fen;
use shakmaty::{Chess, Color, EnPassantMode, Position, Role, Square};

use crate::error::{ReplayError, ReplayResult};

/// Index value for the position before any move has been played.
pub const INITIAL_INDEX: isize = -1;

/// Convert a 0-based ply index to its 1-based display move number.
///
/// The initial index (`-1`) maps to 0, meaning "no move yet".
#[inline]
pub fn display_move_number(index: isize) -> u32 {
    if index < 0 {
        0
    } else {
        (index / 2) as u32 + 1
    }
}

/// Side that plays the ply at a given 0-based index.
#[inline]
pub fn side_for_index(index: usize) -> Color {
    if index % 2 == 0 {
        Color::White
    } else {
        Color::Black
    }
}

/// A single recorded half-move, immutable once produced by the parser
///
/// The SAN text is always present; the board-level fields (`from`, `to`,
/// `promotion`, capture/check flags) are filled by replaying the notation
/// through the rules engine. Moves recorded past a replay failure keep only
/// what the notation itself reveals, which is why `from`/`to` are optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMove {
    /// 0-based ply index within its move list
    pub index: usize,
    /// Side that played this ply
    pub side: Color,
    /// Short algebraic notation as recorded
    pub san: String,
    /// Source square, when the rules engine resolved it
    pub from: Option<Square>,
    /// Destination square (for castling, the king's landing square)
    pub to: Option<Square>,
    /// Promotion piece, if any
    pub promotion: Option<Role>,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
}

impl RecordedMove {
    /// 1-based display move number of this ply.
    #[inline]
    pub fn display_number(&self) -> u32 {
        display_move_number(self.index as isize)
    }
}

/// A board position derived from an initial position plus a move prefix
///
/// Never hand-authored: instances come from [`crate::deriver`] replaying
/// recorded moves through the rules engine, or from a FEN supplied for a
/// custom starting position. Carries both the rendered FEN (for UI consumers)
/// and the playable rules-engine position it was rendered from.
#[derive(Debug, Clone)]
pub struct DerivedPosition {
    fen: String,
    side_to_move: Color,
    produced_at_index: isize,
    chess: Chess,
}

impl DerivedPosition {
    /// Build from a playable position and the ply index that produced it.
    pub fn from_chess(chess: Chess, produced_at_index: isize) -> Self {
        let fen = Fen::from_position(chess.clone(), EnPassantMode::Legal).to_string();
        let side_to_move = chess.turn();
        Self {
            fen,
            side_to_move,
            produced_at_index,
            chess,
        }
    }

    /// Build from a FEN string, e.g. a custom starting position.
    pub fn from_fen(fen: &str, produced_at_index: isize) -> ReplayResult<Self> {
        let parsed: Fen = fen.parse().map_err(|_| ReplayError::InvalidFen {
            message: fen.to_string(),
        })?;
        let chess = parsed
            .into_position::<Chess>(shakmaty::CastlingMode::Standard)
            .map_err(|e| ReplayError::InvalidSetup {
                message: e.to_string(),
            })?;
        Ok(Self::from_chess(chess, produced_at_index))
    }

    /// The standard starting position, at index `-1`.
    pub fn standard_start() -> Self {
        Self::from_chess(Chess::default(), INITIAL_INDEX)
    }

    /// Rendered FEN string.
    #[inline]
    pub fn fen(&self) -> &str {
        &self.fen
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Ply index this position was derived at (`-1` for the initial position).
    #[inline]
    pub fn produced_at_index(&self) -> isize {
        self.produced_at_index
    }

    /// The playable rules-engine position.
    #[inline]
    pub fn chess(&self) -> &Chess {
        &self.chess
    }
}

impl PartialEq for DerivedPosition {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen && self.produced_at_index == other.produced_at_index
    }
}

impl Eq for DerivedPosition {}

/// Notification fired on every index change from seek, step, or autoplay tick
///
/// Side panels (move list, commentary, captured-piece trays) stay in sync by
/// consuming these instead of polling the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveChanged {
    /// New timeline index (`-1` for the initial position)
    pub index: isize,
    /// 1-based display move number (0 when at the initial position)
    pub display_move_number: u32,
    /// The move now showing, `None` at the initial position
    pub mv: Option<RecordedMove>,
}

impl MoveChanged {
    pub fn at(index: isize, mv: Option<RecordedMove>) -> Self {
        Self {
            index,
            display_move_number: display_move_number(index),
            mv,
        }
    }
}

/// One display row of the move list: a move number with both sides' SAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePair {
    pub number: u32,
    pub white: Option<String>,
    pub black: Option<String>,
}
