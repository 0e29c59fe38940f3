//! Position derivation from an initial position plus a move prefix
//!
//! [`derive_up_to`] is the pure reference function: replaying the same prefix
//! always renders a bit-identical FEN. [`Deriver`] memoizes derived positions
//! per timeline, resuming from the nearest cached ancestor instead of
//! replaying from the start on every seek.
//!
//! Legality is delegated entirely to the rules engine: a recorded move that
//! does not resolve to a legal move in its position is reported as
//! [`ReplayError::IllegalReplayMove`] with the offending ply index, which the
//! timeline turns into truncation.

use std::collections::BTreeMap;

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Position};

use crate::error::{ReplayError, ReplayResult};
use crate::types::{DerivedPosition, RecordedMove, INITIAL_INDEX};

/// Pure derivation: replay `moves[0..=upto]` from the initial position.
///
/// `upto = -1` returns the initial position unchanged. Side-effect-free; the
/// FEN of the result is bit-identical to sequential application through the
/// rules engine.
pub fn derive_up_to(
    initial: &DerivedPosition,
    moves: &[RecordedMove],
    upto: isize,
) -> ReplayResult<DerivedPosition> {
    if upto < 0 {
        return Ok(initial.clone());
    }
    let upto = upto as usize;
    let mut chess = initial.chess().clone();
    for (index, mv) in moves.iter().enumerate().take(upto + 1) {
        apply_recorded(&mut chess, mv, index)?;
    }
    Ok(DerivedPosition::from_chess(chess, upto as isize))
}

/// Resolve one recorded move against the rules engine and play it.
fn apply_recorded(chess: &mut Chess, mv: &RecordedMove, index: usize) -> ReplayResult<()> {
    let san: SanPlus = mv.san.parse().map_err(|_| ReplayError::IllegalReplayMove {
        index,
        san: mv.san.clone(),
    })?;
    let resolved = san
        .san
        .to_move(chess)
        .map_err(|_| ReplayError::IllegalReplayMove {
            index,
            san: mv.san.clone(),
        })?;
    chess.play_unchecked(&resolved);
    Ok(())
}

/// Memoized deriver, one per timeline instance
///
/// Cache invariant: an entry at index `i` always equals
/// `derive_up_to(initial, moves, i)` for the move list it was filled from.
/// The owner clears it whenever the move list changes.
#[derive(Debug, Default)]
pub struct Deriver {
    cache: BTreeMap<isize, DerivedPosition>,
}

impl Deriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position at `upto`, recomputed from the nearest cached ancestor.
    ///
    /// Every position replayed along the way is cached too, so scrubbing
    /// forward move by move derives each ply exactly once.
    pub fn position_at(
        &mut self,
        initial: &DerivedPosition,
        moves: &[RecordedMove],
        upto: isize,
    ) -> ReplayResult<DerivedPosition> {
        if upto < 0 {
            return Ok(initial.clone());
        }
        if let Some(hit) = self.cache.get(&upto) {
            return Ok(hit.clone());
        }

        let (ancestor_index, mut chess) = self
            .cache
            .range(..upto)
            .next_back()
            .map(|(i, p)| (*i, p.chess().clone()))
            .unwrap_or_else(|| (INITIAL_INDEX, initial.chess().clone()));

        let mut derived = None;
        for index in (ancestor_index + 1)..=upto {
            let mv = &moves[index as usize];
            apply_recorded(&mut chess, mv, index as usize)?;
            let position = DerivedPosition::from_chess(chess.clone(), index);
            self.cache.insert(index, position.clone());
            derived = Some(position);
        }

        derived.ok_or(ReplayError::IllegalReplayMove {
            index: upto as usize,
            san: String::new(),
        })
    }

    /// Drop every cached entry at or past `index`.
    ///
    /// Used when the timeline truncates after a corrupt move.
    pub fn invalidate_from(&mut self, index: isize) {
        self.cache.retain(|&i, _| i < index);
    }

    /// Drop the whole cache (new game loaded).
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
