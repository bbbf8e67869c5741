use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::daily::DailyStatistics;

/// Number of calendar days kept, today included.
pub const HISTORY_DAYS: i64 = 7;

/// Rolling per-day history, at most one entry per date, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyHistory {
    entries: Vec<DailyStatistics>,
}

/// Totals over the history window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub days_tracked: usize,
    pub completed_work_cycles: u32,
    pub total_work_minutes: u64,
    pub total_break_minutes: u64,
    pub average_cycles_per_day: f64,
}

impl WeeklyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored entries; duplicates keep the last occurrence.
    pub fn from_entries(entries: Vec<DailyStatistics>) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.upsert(entry);
        }
        history
    }

    pub fn entries(&self) -> &[DailyStatistics] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyStatistics> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Insert `day`, replacing any entry for the same date.
    pub fn upsert(&mut self, day: DailyStatistics) {
        match self.entries.binary_search_by_key(&day.date, |e| e.date) {
            Ok(idx) => self.entries[idx] = day,
            Err(idx) => self.entries.insert(idx, day),
        }
    }

    /// Drop everything outside the trailing window ending at `today`.
    pub fn prune(&mut self, today: NaiveDate) {
        let oldest = today - Duration::days(HISTORY_DAYS - 1);
        self.entries.retain(|e| e.date >= oldest && e.date <= today);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn summary(&self) -> WeeklySummary {
        let days_tracked = self.entries.len();
        let completed_work_cycles = self.entries.iter().map(|e| e.completed_work_cycles).sum();
        WeeklySummary {
            days_tracked,
            completed_work_cycles,
            total_work_minutes: self.entries.iter().map(|e| e.total_work_minutes).sum(),
            total_break_minutes: self.entries.iter().map(|e| e.total_break_minutes).sum(),
            average_cycles_per_day: if days_tracked == 0 {
                0.0
            } else {
                f64::from(completed_work_cycles) / days_tracked as f64
            },
        }
    }
}
