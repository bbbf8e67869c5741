use serde::{Deserialize, Serialize};
use std::fmt;

/// Countdown value split into hours, minutes and seconds.
///
/// Values loaded from storage may be unnormalized (e.g. 90 minutes, 0 hours);
/// every operation here works on such values without normalizing them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Remaining {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Remaining {
    pub const ZERO: Remaining = Remaining {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::from_total_seconds(minutes.saturating_mul(60))
    }

    pub fn from_total_seconds(total: u64) -> Self {
        let hours = (total / 3600).min(u64::from(u32::MAX)) as u32;
        Self {
            hours,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Take one second off, borrowing from minutes then hours.
    ///
    /// Returns `false` (and leaves the value alone) when already zero.
    pub fn decrement(&mut self) -> bool {
        if self.seconds > 0 {
            self.seconds -= 1;
        } else if self.minutes > 0 {
            self.minutes -= 1;
            self.seconds = 59;
        } else if self.hours > 0 {
            self.hours -= 1;
            self.minutes = 59;
            self.seconds = 59;
        } else {
            return false;
        }
        true
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decrement_borrows_from_minutes() {
        let mut r = Remaining::new(0, 5, 0);
        assert!(r.decrement());
        assert_eq!(r, Remaining::new(0, 4, 59));
    }

    #[test]
    fn decrement_borrows_from_hours() {
        let mut r = Remaining::new(1, 0, 0);
        assert!(r.decrement());
        assert_eq!(r, Remaining::new(0, 59, 59));
    }

    #[test]
    fn decrement_stops_at_zero() {
        let mut r = Remaining::new(0, 0, 1);
        assert!(r.decrement());
        assert!(r.is_zero());
        assert!(!r.decrement());
        assert_eq!(r, Remaining::ZERO);
    }

    #[test]
    fn unnormalized_minutes_still_count_down() {
        let mut r = Remaining::new(0, 90, 0);
        r.decrement();
        assert_eq!(r, Remaining::new(0, 89, 59));
        assert_eq!(r.total_seconds(), 90 * 60 - 1);
    }

    #[test]
    fn from_minutes_normalizes_hours() {
        assert_eq!(Remaining::from_minutes(25), Remaining::new(0, 25, 0));
        assert_eq!(Remaining::from_minutes(90), Remaining::new(1, 30, 0));
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(Remaining::new(0, 5, 7).to_string(), "00:05:07");
        assert_eq!(Remaining::new(12, 0, 0).to_string(), "12:00:00");
    }

    proptest! {
        #[test]
        fn seconds_round_trip(total in 0u64..1_000_000) {
            prop_assert_eq!(Remaining::from_total_seconds(total).total_seconds(), total);
        }

        #[test]
        fn decrement_removes_exactly_one_second(h in 0u32..5, m in 0u32..120, s in 0u32..60) {
            let mut r = Remaining::new(h, m, s);
            let before = r.total_seconds();
            let moved = r.decrement();
            prop_assert_eq!(moved, before > 0);
            prop_assert_eq!(r.total_seconds(), before.saturating_sub(1));
        }
    }
}
