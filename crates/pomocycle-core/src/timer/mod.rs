mod phase;
mod remaining;
mod session;

pub use phase::{break_after, Phase};
pub use remaining::Remaining;
pub use session::{PauseReason, Tick, TimerSession};
