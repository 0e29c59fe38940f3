//! Commentary and evaluation overlay for timeline indices
//!
//! Annotations come from an external analysis service as a flat collection
//! keyed by 1-based move number. The overlay builds a lookup map once per
//! data load so that every index change resolves its commentary in O(1).
//!
//! # Known ambiguity
//!
//! The external collection is keyed by move number alone, and a move number
//! covers one ply for each side: plies 0 and 1 both resolve to move number 1.
//! Commentary can therefore be attributed to the wrong side. This is
//! preserved as-is pending product guidance; [`index_to_move_number`] exposes
//! both halves of the key so call sites can see the ambiguity rather than
//! have it silently resolved here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use tracing::debug;

use crate::error::ReplayResult;
use crate::types::{display_move_number, side_for_index};

/// Arrow drawn on the board, endpoints in algebraic square names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrow {
    pub from: String,
    pub to: String,
}

/// Externally supplied commentary for one move number
///
/// Not owned by the engine: the analysis service produces these and the
/// overlay only indexes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// 1-based move number this annotation attaches to
    pub move_number: u32,
    /// Evaluation tag, e.g. "blunder", "brilliant", "+0.8"
    #[serde(default)]
    pub evaluation: Option<String>,
    /// Free-form commentary text
    #[serde(default)]
    pub comment: Option<String>,
    /// Squares to highlight, in algebraic names ("e4")
    #[serde(default)]
    pub highlight_squares: Vec<String>,
    /// Arrows to draw
    #[serde(default)]
    pub arrows: Vec<Arrow>,
}

/// Convert a 0-based ply index to its `{move_number, side}` pair.
///
/// Returns `None` for the initial index, which has no move to annotate.
pub fn index_to_move_number(index: isize) -> Option<(u32, Color)> {
    if index < 0 {
        return None;
    }
    Some((
        display_move_number(index),
        side_for_index(index as usize),
    ))
}

/// Precomputed move-number → annotation lookup
#[derive(Debug, Default)]
pub struct AnnotationOverlay {
    by_number: HashMap<u32, Annotation>,
}

impl AnnotationOverlay {
    /// Build the lookup map from the external collection.
    ///
    /// A duplicate move number keeps the later record, matching the source
    /// collection's document order.
    pub fn from_records(records: Vec<Annotation>) -> Self {
        debug!(count = records.len(), "indexing annotation collection");
        let by_number = records
            .into_iter()
            .map(|a| (a.move_number, a))
            .collect();
        Self { by_number }
    }

    /// Build from the analysis service's JSON payload.
    pub fn from_json(json: &str) -> ReplayResult<Self> {
        let records: Vec<Annotation> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Annotation for a timeline index, if any.
    pub fn annotation_for_index(&self, index: isize) -> Option<&Annotation> {
        let (number, _side) = index_to_move_number(index)?;
        self.by_number.get(&number)
    }

    /// Annotation for a 1-based move number, if any.
    pub fn annotation_for_move(&self, move_number: u32) -> Option<&Annotation> {
        self.by_number.get(&move_number)
    }

    /// Highlight squares for the current index, empty when unannotated.
    pub fn highlights_for_index(&self, index: isize) -> &[String] {
        self.annotation_for_index(index)
            .map(|a| a.highlight_squares.as_slice())
            .unwrap_or(&[])
    }

    /// Arrows for the current index, empty when unannotated.
    pub fn arrows_for_index(&self, index: isize) -> &[Arrow] {
        self.annotation_for_index(index)
            .map(|a| a.arrows.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(move_number: u32, comment: &str) -> Annotation {
        Annotation {
            move_number,
            evaluation: None,
            comment: Some(comment.to_string()),
            highlight_squares: Vec::new(),
            arrows: Vec::new(),
        }
    }

    #[test]
    fn test_index_to_move_number_pairs() {
        //! Both plies of a move number resolve to it, with their sides
        assert_eq!(index_to_move_number(-1), None);
        assert_eq!(index_to_move_number(0), Some((1, Color::White)));
        assert_eq!(index_to_move_number(1), Some((1, Color::Black)));
        assert_eq!(index_to_move_number(4), Some((3, Color::White)));
    }

    #[test]
    fn test_lookup_by_index() {
        //! Indices map through move numbers to their annotation
        let overlay = AnnotationOverlay::from_records(vec![note(1, "book"), note(3, "novelty")]);
        assert_eq!(
            overlay
                .annotation_for_index(0)
                .and_then(|a| a.comment.as_deref()),
            Some("book")
        );
        assert_eq!(
            overlay
                .annotation_for_index(4)
                .and_then(|a| a.comment.as_deref()),
            Some("novelty")
        );
        assert!(overlay.annotation_for_index(2).is_none());
        assert!(overlay.annotation_for_index(-1).is_none());
    }

    #[test]
    fn test_shared_move_number_ambiguity_preserved() {
        //! White's and black's plies of one move number share an annotation
        let overlay = AnnotationOverlay::from_records(vec![note(1, "both plies see this")]);
        let white = overlay.annotation_for_index(0);
        let black = overlay.annotation_for_index(1);
        assert!(white.is_some());
        assert_eq!(white, black);
    }

    #[test]
    fn test_from_json_payload() {
        //! The analysis service payload deserializes with optional fields
        let json = r#"[
            {"move_number": 2, "evaluation": "inaccuracy", "comment": "too slow",
             "highlight_squares": ["d4"], "arrows": [{"from": "d2", "to": "d4"}]},
            {"move_number": 5}
        ]"#;
        let overlay = AnnotationOverlay::from_json(json).expect("valid payload");
        assert_eq!(overlay.len(), 2);
        let second = overlay.annotation_for_move(2).expect("annotated");
        assert_eq!(second.evaluation.as_deref(), Some("inaccuracy"));
        assert_eq!(overlay.highlights_for_index(2), ["d4".to_string()]);
        assert_eq!(overlay.arrows_for_index(3).len(), 1);
        assert!(overlay.annotation_for_move(5).is_some());
    }

    #[test]
    fn test_bad_json_is_an_error_not_a_panic() {
        assert!(AnnotationOverlay::from_json("{broken").is_err());
    }

    #[test]
    fn test_empty_overlay() {
        let overlay = AnnotationOverlay::default();
        assert!(overlay.is_empty());
        assert!(overlay.annotation_for_index(0).is_none());
        assert!(overlay.highlights_for_index(0).is_empty());
    }
}
