use chrono::NaiveDate;

use super::daily::DailyStatistics;
use super::history::{WeeklyHistory, WeeklySummary};
use crate::storage::TimerConfiguration;
use crate::timer::Phase;

/// Today's counters plus the rolling weekly history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsAggregator {
    today: DailyStatistics,
    history: WeeklyHistory,
}

impl StatisticsAggregator {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: DailyStatistics::new(today),
            history: WeeklyHistory::new(),
        }
    }

    /// Rebuild from stored state. A stored day other than `today` is folded
    /// into the history and a fresh day is started.
    pub fn restore(
        stored_day: Option<DailyStatistics>,
        history: WeeklyHistory,
        today: NaiveDate,
    ) -> Self {
        let mut aggregator = Self {
            today: stored_day.unwrap_or_else(|| DailyStatistics::new(today)),
            history,
        };
        aggregator.roll_over(today);
        aggregator.history.prune(today);
        aggregator
    }

    /// Start a new day if the calendar moved on. Returns `true` if it did.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.today.date == today {
            return false;
        }
        tracing::info!(from = %self.today.date, to = %today, "daily statistics rolled over");
        let finished = std::mem::replace(&mut self.today, DailyStatistics::new(today));
        if !finished.is_empty() {
            self.history.upsert(finished);
        }
        self.history.prune(today);
        true
    }

    pub fn record_completion(&mut self, phase: Phase, config: &TimerConfiguration, today: NaiveDate) {
        self.roll_over(today);
        self.today.record_completion(phase, config);
    }

    /// Write today's counters into the history, replacing today's entry.
    pub fn fold_today(&mut self) {
        self.history.upsert(self.today.clone());
    }

    pub fn today(&self) -> &DailyStatistics {
        &self.today
    }

    pub fn history(&self) -> &WeeklyHistory {
        &self.history
    }

    /// Trailing seven days including today's live counters.
    pub fn weekly(&mut self, today: NaiveDate) -> &WeeklyHistory {
        self.roll_over(today);
        self.fold_today();
        self.history.prune(today);
        &self.history
    }

    pub fn weekly_summary(&mut self, today: NaiveDate) -> WeeklySummary {
        self.weekly(today).summary()
    }

    pub fn reset(&mut self, today: NaiveDate) {
        self.today = DailyStatistics::new(today);
        self.history.clear();
    }
}
