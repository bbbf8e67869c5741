//! Timer session state machine.
//!
//! Pure state: no clock, no storage, no threads. The caller drives `tick()`
//! once per second and decides what to do when a phase runs out.
//!
//! ## State Transitions
//!
//! ```text
//! WORK --switch_phase--> BREAK | LONG_BREAK --switch_phase--> WORK
//! RUNNING <--start/resume/restart/pause--> PAUSED
//! ```
//!
//! A phase that reaches zero is never advanced by `tick()`: the tick after
//! the last second pauses the session and reports `Tick::Finished`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = TimerSession::default();
//! session.start(&config);
//! if session.tick().is_finished() {
//!     session.switch_phase(&config, false);
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::phase::{break_after, Phase};
use super::remaining::Remaining;
use crate::storage::TimerConfiguration;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Session was paused; nothing changed.
    Idle,
    /// One second was counted down.
    Counted { remaining: Remaining },
    /// Remaining was already zero: the session paused and `phase` ended.
    Finished { phase: Phase },
}

impl Tick {
    pub fn is_finished(&self) -> bool {
        matches!(self, Tick::Finished { .. })
    }
}

/// Why a running session was paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseReason {
    User,
    Inactivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub remaining: Remaining,
    pub phase: Phase,
    pub running: bool,
    /// Completed work phases since the last reset.
    pub cycle_count: u32,
}

impl Default for TimerSession {
    fn default() -> Self {
        Self {
            remaining: Remaining::ZERO,
            phase: Phase::Work,
            running: false,
            cycle_count: 0,
        }
    }
}

impl TimerSession {
    // ── Commands ─────────────────────────────────────────────────────

    /// Resume counting, or reload the phase first when nothing is left.
    pub fn start(&mut self, config: &TimerConfiguration) {
        if self.remaining.is_zero() {
            self.restart(config);
        } else {
            self.running = true;
        }
    }

    /// Returns `false` if the session was already paused.
    pub fn pause(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        was_running
    }

    /// Like `start` but never reloads the duration.
    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn restart(&mut self, config: &TimerConfiguration) {
        self.remaining = Remaining::from_minutes(config.duration_minutes(self.phase));
        self.running = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        if self.remaining.decrement() {
            Tick::Counted {
                remaining: self.remaining,
            }
        } else {
            self.running = false;
            Tick::Finished { phase: self.phase }
        }
    }

    /// Move to the next phase and load its full duration.
    ///
    /// Leaving WORK counts a cycle; the new count decides between a short
    /// and a long break. Returns the new phase.
    pub fn switch_phase(&mut self, config: &TimerConfiguration, auto_start: bool) -> Phase {
        self.phase = match self.phase {
            Phase::Work => {
                self.cycle_count = self.cycle_count.saturating_add(1);
                break_after(self.cycle_count, config.cycles_before_long_break())
            }
            Phase::Break | Phase::LongBreak => Phase::Work,
        };
        self.remaining = Remaining::from_minutes(config.duration_minutes(self.phase));
        self.running = auto_start;
        self.phase
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Configured length of the current phase in seconds.
    pub fn phase_total_secs(&self, config: &TimerConfiguration) -> u64 {
        self.phase.duration_secs(config)
    }
}
