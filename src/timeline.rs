//! Canonical move sequence and index navigation
//!
//! [`Timeline`] owns the recorded move list for the current game, a memoized
//! cache of derived positions, and the current index. Every board-viewer
//! surface navigates through it; rendering layers stay thin adapters on top.
//!
//! # Invariants
//!
//! - `current ∈ [-1, usable_len - 1]`, with `-1` meaning the initial position.
//! - Every cached position equals `derive_up_to(initial, moves, i)`.
//! - Alternation is enforced implicitly: recorded moves replay through the
//!   rules engine, so the timeline can never hold non-alternating play.
//!
//! # Corruption
//!
//! A recorded move that fails the rules engine during replay does not crash
//! the viewer. The timeline truncates its usable length to the last good
//! index, records a [`CorruptTimeline`] marker for diagnostics, and keeps
//! serving seeks over the surviving prefix.

use tracing::{debug, warn};

use crate::deriver::Deriver;
use crate::error::ReplayError;
use crate::parser::{parse_game, ParsedGame};
use crate::types::{DerivedPosition, MoveChanged, MovePair, RecordedMove, INITIAL_INDEX};

/// Diagnostic marker for a timeline truncated by an unreplayable move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptTimeline {
    /// Ply index of the first move that failed reconstruction
    pub first_bad_index: usize,
    /// SAN text of the failing move, as recorded
    pub san: String,
}

/// Replay timeline for one recorded game
#[derive(Debug)]
pub struct Timeline {
    initial: DerivedPosition,
    moves: Vec<RecordedMove>,
    headers: Vec<(String, String)>,
    deriver: Deriver,
    current: isize,
    at: DerivedPosition,
    corruption: Option<CorruptTimeline>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DerivedPosition::standard_start(), Vec::new())
    }
}

impl Timeline {
    /// Timeline over an explicit initial position and move list.
    pub fn new(initial: DerivedPosition, moves: Vec<RecordedMove>) -> Self {
        let at = initial.clone();
        Self {
            initial,
            moves,
            headers: Vec::new(),
            deriver: Deriver::new(),
            current: INITIAL_INDEX,
            at,
            corruption: None,
        }
    }

    /// Timeline from raw recorded game text, via the resilient parser.
    ///
    /// Unusable text degrades to an empty timeline showing the initial
    /// position.
    pub fn from_recorded_text(raw: &str) -> Self {
        let ParsedGame { headers, moves } = parse_game(raw);
        let mut timeline = Self::new(DerivedPosition::standard_start(), moves);
        timeline.headers = headers;
        timeline
    }

    /// Replace the loaded game, resetting all state.
    ///
    /// Purges the position cache, clears any corruption marker, and rewinds
    /// the current index to the initial position.
    pub fn load(&mut self, initial: DerivedPosition, moves: Vec<RecordedMove>) {
        debug!(moves = moves.len(), "loading new game into timeline");
        self.at = initial.clone();
        self.initial = initial;
        self.moves = moves;
        self.headers.clear();
        self.deriver.clear();
        self.current = INITIAL_INDEX;
        self.corruption = None;
    }

    /// Replace the loaded game from raw recorded text.
    pub fn load_recorded_text(&mut self, raw: &str) {
        let ParsedGame { headers, moves } = parse_game(raw);
        self.load(DerivedPosition::standard_start(), moves);
        self.headers = headers;
    }

    /// Seek to a target index, clamped to `[-1, usable_len - 1]`.
    ///
    /// Recomputes from the nearest cached ancestor when uncached. A move that
    /// fails the rules engine mid-replay truncates the usable length to the
    /// last good index, records the corruption, and the seek retries over the
    /// surviving prefix. The caller always gets a position back.
    pub fn seek(&mut self, target: isize) -> (DerivedPosition, MoveChanged) {
        loop {
            let clamped = self.clamp(target);
            match self.deriver.position_at(&self.initial, &self.moves, clamped) {
                Ok(position) => {
                    self.current = clamped;
                    self.at = position.clone();
                    let change = MoveChanged::at(clamped, self.move_at(clamped));
                    return (position, change);
                }
                Err(ReplayError::IllegalReplayMove { index, san }) => {
                    warn!(index, san = %san, "recorded move failed replay, truncating timeline");
                    self.truncate_at(index, san);
                }
                Err(other) => {
                    // Derivation only fails on illegal replay moves; treat
                    // anything else as corruption at the front.
                    warn!(error = %other, "unexpected derivation failure, truncating timeline");
                    self.truncate_at(0, String::new());
                }
            }
        }
    }

    /// Step relative to the current index; `step(1)` and `step(-1)` delegate
    /// to [`Timeline::seek`].
    pub fn step(&mut self, delta: isize) -> (DerivedPosition, MoveChanged) {
        self.seek(self.current + delta)
    }

    fn truncate_at(&mut self, index: usize, san: String) {
        self.moves.truncate(index);
        self.deriver.invalidate_from(index as isize);
        if self.corruption.is_none() {
            self.corruption = Some(CorruptTimeline {
                first_bad_index: index,
                san,
            });
        }
        if self.current >= index as isize {
            self.current = index as isize - 1;
        }
    }

    fn clamp(&self, target: isize) -> isize {
        let last = self.moves.len() as isize - 1;
        target.clamp(INITIAL_INDEX, last.max(INITIAL_INDEX))
    }

    fn move_at(&self, index: isize) -> Option<RecordedMove> {
        if index < 0 {
            None
        } else {
            self.moves.get(index as usize).cloned()
        }
    }

    /// Current index; `-1` is the initial position.
    #[inline]
    pub fn current_index(&self) -> isize {
        self.current
    }

    /// Position at the current index.
    #[inline]
    pub fn current_position(&self) -> &DerivedPosition {
        &self.at
    }

    /// FEN of the current position, for UI consumers.
    #[inline]
    pub fn current_fen(&self) -> &str {
        self.at.fen()
    }

    /// Number of plies that survive replay (truncation shrinks this).
    #[inline]
    pub fn usable_len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Whether the current index is the last usable ply.
    pub fn at_end(&self) -> bool {
        self.current >= self.moves.len() as isize - 1
    }

    /// The loaded moves.
    pub fn moves(&self) -> &[RecordedMove] {
        &self.moves
    }

    /// Tag-pair headers of the loaded game, in document order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Corruption marker, if replay truncated the move list.
    pub fn corruption(&self) -> Option<&CorruptTimeline> {
        self.corruption.as_ref()
    }

    /// Display rows pairing white's and black's plies per move number.
    pub fn move_pairs(&self) -> Vec<MovePair> {
        self.moves
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| MovePair {
                number: i as u32 + 1,
                white: pair.first().map(|m| m.san.clone()),
                black: pair.get(1).map(|m| m.san.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deriver::derive_up_to;

    const ITALIAN: &str = "e4 e5 Nf3 Nc6 Bc4";

    #[test]
    fn test_seek_matches_pure_derivation() {
        //! seek(i) equals derive_up_to(initial, moves, i) for every valid i
        let mut timeline = Timeline::from_recorded_text(ITALIAN);
        let initial = DerivedPosition::standard_start();
        let moves = timeline.moves().to_vec();
        for i in -1..moves.len() as isize {
            let (position, _) = timeline.seek(i);
            let pure = derive_up_to(&initial, &moves, i).expect("derivable");
            assert_eq!(position.fen(), pure.fen(), "divergence at index {i}");
        }
    }

    #[test]
    fn test_seek_scenario_from_recorded_game() {
        //! seek(2) shows 1.e4 e5 2.Nf3; seek(-1) the start; seek(99) clamps
        let mut timeline = Timeline::from_recorded_text(ITALIAN);

        let (after_nf3, change) = timeline.seek(2);
        assert_eq!(
            after_nf3.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
        assert_eq!(change.display_move_number, 2);
        assert_eq!(change.mv.as_ref().map(|m| m.san.as_str()), Some("Nf3"));

        let (start, change) = timeline.seek(-1);
        assert_eq!(
            start.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert!(change.mv.is_none());

        let (_, change) = timeline.seek(99);
        assert_eq!(change.index, 4);
        assert_eq!(timeline.current_index(), 4);
    }

    #[test]
    fn test_reseek_is_stable() {
        //! Re-seeking the same index twice yields identical FEN
        let mut timeline = Timeline::from_recorded_text(ITALIAN);
        let (first, _) = timeline.seek(3);
        let (second, _) = timeline.seek(3);
        assert_eq!(first.fen(), second.fen());
    }

    #[test]
    fn test_step_delegates_to_seek() {
        //! step(+1)/step(-1) move one ply and clamp at the edges
        let mut timeline = Timeline::from_recorded_text(ITALIAN);
        timeline.step(1);
        assert_eq!(timeline.current_index(), 0);
        timeline.step(1);
        assert_eq!(timeline.current_index(), 1);
        timeline.step(-1);
        assert_eq!(timeline.current_index(), 0);
        timeline.step(-5);
        assert_eq!(timeline.current_index(), -1);
        timeline.step(-1);
        assert_eq!(timeline.current_index(), -1);
    }

    #[test]
    fn test_illegal_replay_move_truncates() {
        //! An illegal move at ply 3 of 10 truncates to [-1..2]; seek(5)
        //! clamps to 2 instead of erroring
        let raw = "e4 e5 Nf3 Nf3 Bc4 Nf6 d3 d6 a3 a6";
        let mut timeline = Timeline::from_recorded_text(raw);
        assert_eq!(timeline.usable_len(), 10);

        let (position, change) = timeline.seek(5);
        assert_eq!(change.index, 2);
        assert_eq!(timeline.current_index(), 2);
        assert_eq!(timeline.usable_len(), 3);
        assert_eq!(
            position.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );

        let corruption = timeline.corruption().expect("marked corrupt");
        assert_eq!(corruption.first_bad_index, 3);
        assert_eq!(corruption.san, "Nf3");
    }

    #[test]
    fn test_corrupt_prefix_still_seekable() {
        //! The surviving prefix keeps serving seeks after truncation
        let mut timeline = Timeline::from_recorded_text("e4 e5 Nf3 Nf3");
        timeline.seek(99);
        let (position, _) = timeline.seek(0);
        assert_eq!(
            position.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_unusable_text_degrades_to_empty_timeline() {
        //! Garbage input loads no moves and shows the initial position
        let mut timeline = Timeline::from_recorded_text("total nonsense");
        assert!(timeline.is_empty());
        let (position, change) = timeline.seek(10);
        assert_eq!(change.index, -1);
        assert_eq!(
            position.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_load_resets_state() {
        //! Loading a new game purges cache, corruption, and current index
        let mut timeline = Timeline::from_recorded_text("e4 e5 Nf3 Nf3");
        timeline.seek(99);
        assert!(timeline.corruption().is_some());

        timeline.load_recorded_text("d4 d5 c4");
        assert_eq!(timeline.current_index(), -1);
        assert!(timeline.corruption().is_none());
        assert_eq!(timeline.usable_len(), 3);
        assert_eq!(timeline.current_fen(), DerivedPosition::standard_start().fen());
    }

    #[test]
    fn test_move_pairs_for_display() {
        //! Plies pair up per display move number, odd tail included
        let timeline = Timeline::from_recorded_text(ITALIAN);
        let pairs = timeline.move_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].number, 1);
        assert_eq!(pairs[0].white.as_deref(), Some("e4"));
        assert_eq!(pairs[0].black.as_deref(), Some("e5"));
        assert_eq!(pairs[2].white.as_deref(), Some("Bc4"));
        assert_eq!(pairs[2].black, None);
    }

    #[test]
    fn test_headers_exposed() {
        //! Tag pairs from the recorded text are available for display
        let timeline =
            Timeline::from_recorded_text("[Event \"Club Match\"]\n\n1. e4 e5 *");
        assert_eq!(timeline.headers().len(), 1);
        assert_eq!(timeline.headers()[0].1, "Club Match");
    }
}
