//! Error types for the replay engine
//!
//! Provides custom error types covering move-record parsing, position
//! reconstruction, and practice-session move validation. Every failure here is
//! local: public engine operations degrade to the smallest valid state (an
//! empty move list, a truncated timeline, an unchanged practice position)
//! instead of surfacing a panic to the UI.

use shakmaty::Square;
use thiserror::Error;

/// Errors that can occur in the replay engine
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Recorded game text unusable even after cleanup
    #[error("unparseable game record: {reason}")]
    ParseFailed { reason: String },

    /// A recorded move fails reconstruction against the rules engine
    #[error("recorded move '{san}' at ply {index} is illegal in its position")]
    IllegalReplayMove { index: usize, san: String },

    /// A practice move matches no legal move in the session position
    #[error("no legal move from {from} to {to} in practice position")]
    IllegalBranchMove { from: Square, to: Square },

    /// FEN string rejected while building a position
    #[error("invalid FEN: {message}")]
    InvalidFen { message: String },

    /// Board setup rejected by the rules engine
    #[error("invalid position setup: {message}")]
    InvalidSetup { message: String },

    /// Annotation collection deserialization error
    #[error("annotation data error: {0}")]
    AnnotationData(#[from] serde_json::Error),
}

/// Result type alias for replay engine operations
pub type ReplayResult<T> = Result<T, ReplayError>;
