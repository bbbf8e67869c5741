//! # Pomocycle Core Library
//!
//! Work/break countdown timer with persisted progress and daily statistics.
//! Every operation is available through the `pomocycle` CLI; other hosts
//! embed the same controller and render the events it publishes.
//!
//! ## Architecture
//!
//! - **Timer**: pure state machine cycling WORK → BREAK / LONG_BREAK → WORK.
//!   The caller drives `tick()` once per second; a finished phase pauses and
//!   waits for a phase switch unless auto-advance is configured
//! - **Controller**: owns the session, statistics, store and event bus; every
//!   state change is written before it is published
//! - **Driver**: tokio drive loops (one-second ticks, 30-second inactivity
//!   watchdog) around a shared controller
//! - **Storage**: SQLite key/value store, TOML configuration
//! - **Stats**: per-day counters rolled into a seven-day history
//!
//! ## Key Components
//!
//! - [`TimerSession`]: Core timer state machine
//! - [`TimerController`]: Command surface and event source
//! - [`TimerService`]: Controller plus drive loops
//! - [`Database`]: Durable key/value persistence
//! - [`TimerConfiguration`]: Timer preferences

pub mod clock;
pub mod controller;
pub mod driver;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{TimerController, TimerSnapshot};
pub use driver::{DriveLoopHandle, TimerService};
pub use error::{ConfigError, CoreError, PersistenceError};
pub use events::{Event, EventBus, SubscriptionId};
pub use stats::{DailyStatistics, StatisticsAggregator, WeeklyHistory, WeeklySummary};
pub use storage::{
    Database, KvStore, MemoryStore, SessionStore, TimerConfiguration, WriteBehindStore,
};
pub use timer::{PauseReason, Phase, Remaining, Tick, TimerSession};
