//! Persisted layout of the timer session and statistics.
//!
//! Every field has its own key holding a JSON value, so a corrupt or missing
//! field falls back to its default without losing the others.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::KvStore;
use crate::error::PersistenceError;
use crate::stats::{DailyStatistics, WeeklyHistory};
use crate::timer::{Phase, Remaining, TimerSession};

/// Storage keys.
pub mod keys {
    pub const CURRENT_HOURS: &str = "currentHours";
    pub const CURRENT_MINUTES: &str = "currentMinutes";
    pub const CURRENT_SECONDS: &str = "currentSeconds";
    pub const IS_PAUSED: &str = "isPaused";
    pub const PHASE: &str = "phase";
    pub const CURRENT_CYCLE: &str = "currentCycle";
    pub const DAILY_STATS: &str = "dailyStats";
    pub const WEEKLY_STATS: &str = "weeklyStats";

    pub const SESSION: [&str; 6] = [
        CURRENT_HOURS,
        CURRENT_MINUTES,
        CURRENT_SECONDS,
        IS_PAUSED,
        PHASE,
        CURRENT_CYCLE,
    ];
}

pub struct SessionStore {
    store: Box<dyn KvStore>,
}

impl SessionStore {
    pub fn new<S: KvStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Typed read. A missing key, an unreadable store or an undecodable value
    /// all yield `default`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read(key).unwrap_or(default)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "stored value unreadable, using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "stored value undecodable, using default");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value).map_err(|e| PersistenceError::write(key, e))?;
        self.store.set(key, &raw)
    }

    pub fn load_session(&self) -> TimerSession {
        let defaults = TimerSession::default();
        let remaining = Remaining::new(
            self.get_or(keys::CURRENT_HOURS, defaults.remaining.hours),
            self.get_or(keys::CURRENT_MINUTES, defaults.remaining.minutes),
            self.get_or(keys::CURRENT_SECONDS, defaults.remaining.seconds),
        );
        TimerSession {
            remaining,
            phase: self.get_or::<Phase>(keys::PHASE, defaults.phase),
            running: !self.get_or(keys::IS_PAUSED, !defaults.running),
            cycle_count: self.get_or(keys::CURRENT_CYCLE, defaults.cycle_count),
        }
    }

    /// Write every session field. All fields are attempted; the first
    /// failure is returned.
    pub fn save_session(&self, session: &TimerSession) -> Result<(), PersistenceError> {
        let results = [
            self.write(keys::CURRENT_HOURS, &session.remaining.hours),
            self.write(keys::CURRENT_MINUTES, &session.remaining.minutes),
            self.write(keys::CURRENT_SECONDS, &session.remaining.seconds),
            self.write(keys::IS_PAUSED, &!session.running),
            self.write(keys::PHASE, &session.phase),
            self.write(keys::CURRENT_CYCLE, &session.cycle_count),
        ];
        results.into_iter().collect()
    }

    pub fn load_daily(&self) -> Option<DailyStatistics> {
        self.read(keys::DAILY_STATS)
    }

    pub fn load_weekly(&self) -> WeeklyHistory {
        self.get_or(keys::WEEKLY_STATS, WeeklyHistory::new())
    }

    pub fn save_stats(
        &self,
        today: &DailyStatistics,
        history: &WeeklyHistory,
    ) -> Result<(), PersistenceError> {
        let daily = self.write(keys::DAILY_STATS, today);
        let weekly = self.write(keys::WEEKLY_STATS, history);
        daily.and(weekly)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
