//! Autoplay state machine over timeline navigation
//!
//! Converts [`Timeline`] stepping into timed playback with start, pause, and
//! toggle, independent of any UI framework's effect lifecycle. The host event
//! loop drives it by calling [`PlaybackController::poll`] with the current
//! time; there is no background thread and no external callback.
//!
//! # Cancellation contract
//!
//! The only record of a pending tick is the `{generation, due}` deadline
//! stored inside the controller. Every competing transition (manual seek via
//! [`PlaybackController::seek_to`], [`PlaybackController::pause`],
//! [`PlaybackController::stop`], a fresh [`PlaybackController::start`])
//! synchronously bumps the generation counter and clears that deadline before
//! performing its own state change. A stale tick therefore cannot fire at
//! all: there is nothing left to fire, which is stronger than ignoring one
//! that does.

use std::time::Duration;

use tracing::debug;
use web_time::Instant;

use crate::timeline::Timeline;
use crate::types::{DerivedPosition, MoveChanged};

/// Default delay between autoplay ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(800);

/// Playback lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No playback requested yet
    #[default]
    Idle,
    /// Ticking through the timeline
    Playing,
    /// Stopped by the user mid-game
    Paused,
    /// Reached the last usable index
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    generation: u64,
    due: Instant,
}

/// Timed autoplay over a [`Timeline`]
#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    interval: Duration,
    generation: u64,
    deadline: Option<Deadline>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl PlaybackController {
    /// Controller ticking at the given fixed interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            state: PlaybackState::Idle,
            interval,
            generation: 0,
            deadline: None,
        }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the tick interval; takes effect at the next scheduled tick.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Begin playing from Idle, Paused, or Finished.
    ///
    /// From Finished the timeline is rewound to the initial position first;
    /// the rewind's [`MoveChanged`] is returned so side panels resync. A call
    /// while already Playing reschedules nothing and returns `None`.
    pub fn start(&mut self, timeline: &mut Timeline, now: Instant) -> Option<MoveChanged> {
        match self.state {
            PlaybackState::Playing => None,
            PlaybackState::Finished => {
                self.invalidate();
                let (_, change) = timeline.seek(-1);
                self.state = PlaybackState::Playing;
                self.schedule(now);
                debug!("playback restarted from the beginning");
                Some(change)
            }
            PlaybackState::Idle | PlaybackState::Paused => {
                self.invalidate();
                self.state = PlaybackState::Playing;
                self.schedule(now);
                debug!("playback started");
                None
            }
        }
    }

    /// Stop ticking, keeping the current index.
    pub fn pause(&mut self) {
        self.invalidate();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            debug!("playback paused");
        }
    }

    /// Compute the correct transition from the current state: Playing
    /// pauses; Idle and Paused play; Finished rewinds, then plays.
    pub fn toggle(&mut self, timeline: &mut Timeline, now: Instant) -> Option<MoveChanged> {
        match self.state {
            PlaybackState::Playing => {
                self.pause();
                None
            }
            PlaybackState::Idle | PlaybackState::Paused | PlaybackState::Finished => {
                self.start(timeline, now)
            }
        }
    }

    /// Tear down playback entirely (e.g. before loading a new game).
    pub fn stop(&mut self) {
        self.invalidate();
        self.state = PlaybackState::Idle;
    }

    /// Manual seek: invalidates any pending tick first, then navigates.
    ///
    /// Scrubbing while Playing pauses playback.
    pub fn seek_to(
        &mut self,
        timeline: &mut Timeline,
        target: isize,
    ) -> (DerivedPosition, MoveChanged) {
        self.invalidate();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
        timeline.seek(target)
    }

    /// Drive playback from the host event loop.
    ///
    /// Returns the [`MoveChanged`] of an autoplay step when the deadline has
    /// passed, `None` otherwise. Reaching the last usable index transitions
    /// to Finished.
    pub fn poll(&mut self, timeline: &mut Timeline, now: Instant) -> Option<MoveChanged> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let deadline = self.deadline?;
        if deadline.generation != self.generation || now < deadline.due {
            return None;
        }
        self.invalidate();

        if timeline.at_end() {
            self.state = PlaybackState::Finished;
            debug!("playback finished");
            return None;
        }

        let (_, change) = timeline.step(1);
        if timeline.at_end() {
            self.state = PlaybackState::Finished;
            debug!(index = change.index, "playback reached the last move");
        } else {
            self.schedule(now);
        }
        Some(change)
    }

    /// Time until the pending tick fires, for hosts that sleep between polls.
    pub fn time_to_next_tick(&self, now: Instant) -> Option<Duration> {
        let deadline = self.deadline?;
        Some(deadline.due.saturating_duration_since(now))
    }

    fn schedule(&mut self, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(Deadline {
            generation: self.generation,
            due: now + self.interval,
        });
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
    }
}
