use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::TimerConfiguration;
use crate::timer::Phase;

/// Counters for a single calendar day.
///
/// Field names follow the persisted `dailyStats` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub completed_work_cycles: u32,
    #[serde(rename = "totalWorkTime")]
    pub total_work_minutes: u64,
    #[serde(rename = "totalBreakTime")]
    pub total_break_minutes: u64,
}

impl DailyStatistics {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            completed_work_cycles: 0,
            total_work_minutes: 0,
            total_break_minutes: 0,
        }
    }

    /// Credit a finished phase with its configured duration.
    pub fn record_completion(&mut self, phase: Phase, config: &TimerConfiguration) {
        let minutes = config.duration_minutes(phase);
        match phase {
            Phase::Work => {
                self.completed_work_cycles = self.completed_work_cycles.saturating_add(1);
                self.total_work_minutes = self.total_work_minutes.saturating_add(minutes);
            }
            Phase::Break | Phase::LongBreak => {
                self.total_break_minutes = self.total_break_minutes.saturating_add(minutes);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed_work_cycles == 0 && self.total_work_minutes == 0 && self.total_break_minutes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn work_completion_counts_cycle_and_minutes() {
        let mut stats = DailyStatistics::new(day());
        stats.record_completion(Phase::Work, &TimerConfiguration::default());
        assert_eq!(stats.completed_work_cycles, 1);
        assert_eq!(stats.total_work_minutes, 25);
        assert_eq!(stats.total_break_minutes, 0);
    }

    #[test]
    fn breaks_only_add_break_minutes() {
        let cfg = TimerConfiguration::default();
        let mut stats = DailyStatistics::new(day());
        stats.record_completion(Phase::Break, &cfg);
        stats.record_completion(Phase::LongBreak, &cfg);
        assert_eq!(stats.completed_work_cycles, 0);
        assert_eq!(stats.total_work_minutes, 0);
        assert_eq!(stats.total_break_minutes, 5 + 15);
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let mut stats = DailyStatistics::new(day());
        stats.record_completion(Phase::Work, &TimerConfiguration::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2024-03-04",
                "completedWorkCycles": 1,
                "totalWorkTime": 25,
                "totalBreakTime": 0,
            })
        );
    }
}
