//! Work/break statistics.
//!
//! Today's counters live in [`DailyStatistics`]; finished days are kept in a
//! rolling seven-day [`WeeklyHistory`]. [`StatisticsAggregator`] owns both and
//! handles the day boundary.

mod aggregator;
mod daily;
mod history;

pub use aggregator::StatisticsAggregator;
pub use daily::DailyStatistics;
pub use history::{WeeklyHistory, WeeklySummary, HISTORY_DAYS};
