//! Practice/plan mode: detached speculative play from a timeline position
//!
//! A [`BranchSession`] is a consequence-free sandbox copied from a historical
//! position. Moves applied here never touch the timeline; finishing returns
//! the flat local move list for downstream summary and discarding drops
//! everything.
//!
//! # Plan mode
//!
//! With plan mode enabled the session accepts moves for either color: when a
//! move matches no legal move for the side currently to move, the session
//! flips side-to-move (a null-move style setup rebuild) and retries once.
//! This lets a user demonstrate a continuation spanning both colors without
//! strict alternation. It is an intentional product feature scoped strictly
//! to practice sessions; the timeline itself never permits non-alternating
//! play.

use shakmaty::san::SanPlus;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, FromSetup, Move, Position, Role, Square,
};
use tracing::debug;

use crate::error::{ReplayError, ReplayResult};
use crate::parser::{castle_king_target, move_endpoints};
use crate::types::{DerivedPosition, RecordedMove};

/// Detached practice session over a copy of one timeline position
#[derive(Debug, Clone)]
pub struct BranchSession {
    origin: DerivedPosition,
    position: Chess,
    local_moves: Vec<RecordedMove>,
    plan_mode: bool,
}

impl BranchSession {
    /// Open a session from a timeline position, with no local moves yet.
    pub fn start(origin: &DerivedPosition, plan_mode: bool) -> Self {
        debug!(
            origin_index = origin.produced_at_index(),
            plan_mode, "practice session started"
        );
        Self {
            origin: origin.clone(),
            position: origin.chess().clone(),
            local_moves: Vec::new(),
            plan_mode,
        }
    }

    /// Attempt a move for the side to move.
    ///
    /// In plan mode a move that matches no legal move for the current side is
    /// retried with side-to-move flipped. Success appends to the local move
    /// list and advances the session position; failure rejects with the
    /// position unchanged.
    pub fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> ReplayResult<RecordedMove> {
        if let Some(m) = find_matching(&self.position, from, to, promotion) {
            return Ok(self.commit(m));
        }

        if self.plan_mode {
            if let Ok(flipped) = flipped_turn(&self.position) {
                if let Some(m) = find_matching(&flipped, from, to, promotion) {
                    debug!(%from, %to, "plan mode flipped side to move");
                    self.position = flipped;
                    return Ok(self.commit(m));
                }
            }
        }

        Err(ReplayError::IllegalBranchMove { from, to })
    }

    fn commit(&mut self, m: Move) -> RecordedMove {
        let side = self.position.turn();
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &m).to_string();
        let (from, to) = move_endpoints(&m);
        let record = RecordedMove {
            index: self.local_moves.len(),
            side,
            san,
            from,
            to: Some(to),
            promotion: m.promotion(),
            is_capture: m.is_capture(),
            is_check: self.position.is_check(),
            is_checkmate: self.position.is_checkmate(),
        };
        self.local_moves.push(record.clone());
        record
    }

    /// Close the session, returning the flat local move list.
    pub fn finish(self) -> Vec<RecordedMove> {
        debug!(moves = self.local_moves.len(), "practice session finished");
        self.local_moves
    }

    /// Position the session was opened from.
    pub fn origin(&self) -> &DerivedPosition {
        &self.origin
    }

    /// FEN of the current session position.
    pub fn fen(&self) -> String {
        DerivedPosition::from_chess(self.position.clone(), self.origin.produced_at_index())
            .fen()
            .to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.turn()
    }

    pub fn local_moves(&self) -> &[RecordedMove] {
        &self.local_moves
    }

    pub fn plan_mode(&self) -> bool {
        self.plan_mode
    }
}

/// Single-session holder enforcing the no-nesting rule
///
/// `Inactive → Active (begin) → Inactive (finish/discard)`. Beginning a new
/// session while one is active discards the previous one first.
#[derive(Debug, Default)]
pub struct BranchSlot {
    active: Option<BranchSession>,
}

impl BranchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session, discarding any active one first.
    pub fn begin(&mut self, origin: &DerivedPosition, plan_mode: bool) -> &mut BranchSession {
        if self.active.is_some() {
            debug!("discarding active practice session before starting a new one");
        }
        self.active.insert(BranchSession::start(origin, plan_mode))
    }

    pub fn session(&self) -> Option<&BranchSession> {
        self.active.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut BranchSession> {
        self.active.as_mut()
    }

    /// Finish the active session, returning its local moves.
    pub fn finish(&mut self) -> Option<Vec<RecordedMove>> {
        self.active.take().map(BranchSession::finish)
    }

    /// Tear down the active session with no effect on the timeline.
    pub fn discard(&mut self) {
        if self.active.take().is_some() {
            debug!("practice session discarded");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

/// Matching legal move for a `(from, to, promotion)` request.
///
/// Castling accepts both the king's landing square (e1→g1 style input) and
/// the rules engine's king-takes-rook encoding.
fn find_matching(
    position: &Chess,
    from: Square,
    to: Square,
    promotion: Option<Role>,
) -> Option<Move> {
    let legals = position.legal_moves();
    legals
        .iter()
        .find(|m| {
            if m.promotion() != promotion {
                return false;
            }
            match **m {
                Move::Castle { king, rook } => {
                    from == king && (to == rook || to == castle_king_target(king, rook))
                }
                _ => m.from() == Some(from) && m.to() == to,
            }
        })
        .cloned()
}

/// Rebuild the position with side-to-move flipped, null-move style.
///
/// The en passant square cannot survive the flip. A flip that leaves the
/// moving side able to capture the king is rejected by the rules engine
/// unless it is only the "impossible check" condition, which is exactly what
/// a deliberate null move creates.
fn flipped_turn(position: &Chess) -> ReplayResult<Chess> {
    let mut setup = position.clone().into_setup(EnPassantMode::Legal);
    setup.turn = !setup.turn;
    setup.ep_square = None;
    Chess::from_setup(setup, CastlingMode::Standard)
        .or_else(|e| e.ignore_impossible_check())
        .map_err(|e| ReplayError::InvalidSetup {
            message: e.to_string(),
        })
}
