//! # replay-core: Timeline & Branching Engine for board viewers
//!
//! Every surface that replays a recorded chess game shares the same hard
//! core: a consistent mapping between move index and board position,
//! resilient parsing of semi-structured recorded move text, bidirectional
//! navigation, cancellation-safe autoplay timing, and detached branch/return
//! semantics for practice positions. This crate is that core, consolidated so
//! each viewer becomes a thin rendering adapter.
//!
//! # Architecture
//!
//! - [`parser`]: recorded game text to an ordered move list, degrading to
//!   empty on unusable input
//! - [`timeline`]: canonical move sequence, position cache, current-index
//!   navigation, corruption-tolerant truncation
//! - [`deriver`]: pure position derivation plus the per-timeline memo
//! - [`playback`]: Idle/Playing/Paused/Finished autoplay state machine with
//!   a race-free cancellation contract
//! - [`annotations`]: externally supplied commentary mapped to timeline
//!   indices
//! - [`branch`]: practice/plan sessions for dual-side speculative play
//!
//! Rule legality is delegated entirely to [`shakmaty`]; the engine never
//! reimplements it. There is no rendering, no network, and no persistence
//! here. It is a pure in-memory engine.
//!
//! # Example
//!
//! ```
//! use replay_core::{BranchSession, Timeline};
//!
//! let mut timeline = Timeline::from_recorded_text("1. e4 e5 2. Nf3 Nc6 3. Bc4");
//! let (position, change) = timeline.seek(2);
//! assert_eq!(change.display_move_number, 2);
//! assert!(position.fen().starts_with("rnbqkbnr/pppp1ppp"));
//!
//! // Practice from here without disturbing the replay.
//! let session = BranchSession::start(&position, true);
//! assert_eq!(session.local_moves().len(), 0);
//! assert_eq!(timeline.current_index(), 2);
//! ```

pub mod annotations;
pub mod branch;
pub mod deriver;
pub mod error;
pub mod parser;
pub mod playback;
pub mod timeline;
pub mod types;

pub use annotations::{index_to_move_number, Annotation, AnnotationOverlay, Arrow};
pub use branch::{BranchSession, BranchSlot};
pub use deriver::{derive_up_to, Deriver};
pub use error::{ReplayError, ReplayResult};
pub use parser::{parse_game, ParsedGame};
pub use playback::{PlaybackController, PlaybackState, DEFAULT_TICK_INTERVAL};
pub use timeline::{CorruptTimeline, Timeline};
pub use types::{
    display_move_number, side_for_index, DerivedPosition, MoveChanged, MovePair, RecordedMove,
    INITIAL_INDEX,
};
