use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::storage::TimerConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "WORK",
            Phase::Break => "BREAK",
            Phase::LongBreak => "LONG_BREAK",
        }
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Phase::Break | Phase::LongBreak)
    }

    /// Configured length of this phase in seconds.
    pub fn duration_secs(&self, config: &TimerConfiguration) -> u64 {
        config.duration_minutes(*self).saturating_mul(60)
    }
}

/// Break that follows a finished work phase.
///
/// `completed_cycles` is the cycle count *after* counting the work phase that
/// just ended; a long break is due when it is a positive multiple of
/// `cycles_before_long_break`.
pub fn break_after(completed_cycles: u32, cycles_before_long_break: u32) -> Phase {
    let cadence = cycles_before_long_break.max(1);
    if completed_cycles > 0 && completed_cycles % cadence == 0 {
        Phase::LongBreak
    } else {
        Phase::Break
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WORK" => Ok(Phase::Work),
            "BREAK" | "SHORT_BREAK" => Ok(Phase::Break),
            "LONG_BREAK" => Ok(Phase::LongBreak),
            other => Err(format!("unknown phase '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fourth_cycle_earns_long_break() {
        assert_eq!(break_after(1, 4), Phase::Break);
        assert_eq!(break_after(3, 4), Phase::Break);
        assert_eq!(break_after(4, 4), Phase::LongBreak);
        assert_eq!(break_after(8, 4), Phase::LongBreak);
    }

    #[test]
    fn zero_cycles_never_earn_long_break() {
        assert_eq!(break_after(0, 4), Phase::Break);
        assert_eq!(break_after(0, 1), Phase::Break);
    }

    #[test]
    fn zero_cadence_is_treated_as_one() {
        assert_eq!(break_after(1, 0), Phase::LongBreak);
        assert_eq!(break_after(7, 0), Phase::LongBreak);
    }

    #[test]
    fn parse_accepts_wire_and_cli_spellings() {
        assert_eq!("WORK".parse::<Phase>().unwrap(), Phase::Work);
        assert_eq!("long-break".parse::<Phase>().unwrap(), Phase::LongBreak);
        assert_eq!("short_break".parse::<Phase>().unwrap(), Phase::Break);
        assert!("nap".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_uses_screaming_case() {
        assert_eq!(
            serde_json::to_string(&Phase::LongBreak).unwrap(),
            "\"LONG_BREAK\""
        );
        let parsed: Phase = serde_json::from_str("\"BREAK\"").unwrap();
        assert_eq!(parsed, Phase::Break);
    }

    proptest! {
        #[test]
        fn long_break_exactly_on_multiples(n in 1u32..=12, cycle in 1u32..=200) {
            let expected = if cycle % n == 0 { Phase::LongBreak } else { Phase::Break };
            prop_assert_eq!(break_after(cycle, n), expected);
        }
    }
}
