//! Cooldown timer state machine for the racer backend.
//!
//! A player timer is a row pairing a player with a catalog timer (a name and
//! a duration). Its state only ever moves forward:
//!
//! ```text
//! Planned ──(now ≥ start)──→ Working ──(remaining hits 0)──→ Expired
//! ```
//!
//! Nothing polls timers in the background. A timer is advanced when it is
//! touched, by calling [`advance`] with the current time. This crate only
//! computes the transition; deleting an Expired row is the store's job.
//!
//! # Clocks
//!
//! [`Clock`] abstracts "now" in epoch milliseconds. Production code uses
//! [`SystemClock`]; tests use [`ManualClock`].

mod clock;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};

// ---------------------------------------------------------------------------
// TimerState
// ---------------------------------------------------------------------------

/// Lifecycle state of a player timer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
pub enum TimerState {
    /// Scheduled to start in the future. Never reported to clients.
    #[default]
    Planned,
    /// Counting down.
    Working,
    /// Ran out. Terminal; the row is removed once observed.
    Expired,
}

impl TimerState {
    /// Returns `true` if moving to `target` never goes backwards.
    ///
    /// Skipping Working is allowed: a timer whose start and end both lie in
    /// the past goes straight from Planned to Expired on first touch.
    pub fn can_transition_to(self, target: Self) -> bool {
        self == target || self.rank() < target.rank()
    }

    /// Returns `true` for states a client may see.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Planned)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Planned => 0,
            Self::Working => 1,
            Self::Expired => 2,
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "Planned"),
            Self::Working => write!(f, "Working"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

// ---------------------------------------------------------------------------
// TimerRun
// ---------------------------------------------------------------------------

/// The mutable part of a player timer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRun {
    pub state: TimerState,
    /// When the countdown starts, in epoch milliseconds.
    pub start_ms: i64,
    /// Cached remaining milliseconds as of the last [`advance`].
    pub remaining_ms: u64,
}

impl TimerRun {
    /// A fresh Planned run starting at `start_ms`.
    pub fn planned(start_ms: i64) -> Self {
        Self {
            state: TimerState::Planned,
            start_ms,
            remaining_ms: 0,
        }
    }

    /// Returns this run advanced to `now_ms`. See [`advance`].
    ///
    /// A run never moves backwards: if the clock steps back far enough that
    /// an Expired run would count down again, it stays Expired.
    pub fn advanced(self, duration_ms: u64, now_ms: i64) -> Self {
        let (state, remaining_ms) = advance(&self, duration_ms, now_ms);
        if !self.state.can_transition_to(state) {
            return self;
        }
        Self {
            state,
            remaining_ms,
            ..self
        }
    }
}

/// Computes the state of `run` at `now_ms` for a timer of `duration_ms`.
///
/// Before `start_ms` the run is left as it is (Planned, cached remaining).
/// From `start_ms` on, `remaining = duration - elapsed`; a positive remainder
/// is Working, anything else is Expired with 0 remaining.
pub fn advance(run: &TimerRun, duration_ms: u64, now_ms: i64) -> (TimerState, u64) {
    if now_ms < run.start_ms {
        return (run.state, run.remaining_ms);
    }

    let elapsed_ms = now_ms.saturating_sub(run.start_ms);
    let remaining = i128::from(duration_ms) - i128::from(elapsed_ms);

    if remaining > 0 {
        // `remaining` ≤ duration_ms here, so it fits back into u64.
        (TimerState::Working, remaining as u64)
    } else {
        (TimerState::Expired, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_timer_state_never_moves_backwards() {
        assert!(TimerState::Planned.can_transition_to(TimerState::Expired));
        assert!(TimerState::Working.can_transition_to(TimerState::Working));
        assert!(!TimerState::Expired.can_transition_to(TimerState::Working));
        assert!(!TimerState::Working.can_transition_to(TimerState::Planned));
    }

    #[test]
    fn test_timer_state_visibility() {
        assert!(!TimerState::Planned.is_visible());
        assert!(TimerState::Working.is_visible());
        assert!(TimerState::Expired.is_visible());
    }

    #[test]
    fn test_advance_elapsed_past_duration_expires() {
        let run = TimerRun::planned(NOW - 1_500);

        assert_eq!(advance(&run, 1_000, NOW), (TimerState::Expired, 0));
    }

    #[test]
    fn test_advance_within_duration_is_working() {
        let run = TimerRun::planned(NOW - 400);

        assert_eq!(advance(&run, 1_000, NOW), (TimerState::Working, 600));
    }

    #[test]
    fn test_advance_exactly_at_end_expires() {
        let run = TimerRun::planned(NOW - 1_000);

        assert_eq!(advance(&run, 1_000, NOW), (TimerState::Expired, 0));
    }

    #[test]
    fn test_advance_future_start_stays_planned() {
        let run = TimerRun::planned(NOW + 5_000);

        assert_eq!(advance(&run, 1_000, NOW), (TimerState::Planned, 0));
    }

    #[test]
    fn test_advance_at_start_reports_full_duration() {
        let run = TimerRun::planned(NOW);

        assert_eq!(advance(&run, 1_000, NOW), (TimerState::Working, 1_000));
    }

    #[test]
    fn test_advanced_keeps_start() {
        let run = TimerRun::planned(NOW - 250).advanced(1_000, NOW);

        assert_eq!(run.start_ms, NOW - 250);
        assert_eq!(run.state, TimerState::Working);
        assert_eq!(run.remaining_ms, 750);
    }

    #[test]
    fn test_advanced_expired_stays_expired_when_clock_steps_back() {
        let expired = TimerRun::planned(NOW - 500).advanced(1_000, NOW + 1_000);
        assert_eq!(expired.state, TimerState::Expired);

        let run = expired.advanced(1_000, NOW);

        assert_eq!(run.state, TimerState::Expired);
        assert_eq!(run.remaining_ms, 0);
    }
}
