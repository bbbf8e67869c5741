//! Timer controller: the single owner of timer state.
//!
//! Wraps [`TimerSession`] with configuration, statistics, persistence and
//! the event bus. Every state-changing operation writes the new state to the
//! store before any event is published, so a crash between the two loses at
//! most the last second.
//!
//! The controller is synchronous and has no notion of time passing on its
//! own; see [`crate::driver::TimerService`] for the drive loops.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::PersistenceError;
use crate::events::{Event, EventBus, SubscriptionId};
use crate::stats::{DailyStatistics, StatisticsAggregator, WeeklyHistory, WeeklySummary};
use crate::storage::{SessionStore, TimerConfiguration};
use crate::timer::{PauseReason, Phase, Remaining, Tick, TimerSession};

/// Everything a presentation layer needs to render the timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub remaining: Remaining,
    pub phase: Phase,
    pub running: bool,
    pub cycle_count: u32,
    /// Configured length of `phase`.
    pub phase_total_secs: u64,
    pub cycles_before_long_break: u32,
    pub today: DailyStatistics,
}

impl TimerSnapshot {
    /// True when nothing is left and the timer is stopped: the next `start`
    /// reloads the phase.
    pub fn is_phase_exhausted(&self) -> bool {
        !self.running && self.remaining.is_zero()
    }
}

pub struct TimerController {
    config: TimerConfiguration,
    session: TimerSession,
    stats: StatisticsAggregator,
    store: SessionStore,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    last_activity: DateTime<Local>,
}

impl TimerController {
    /// Build a controller on the system clock and restore persisted state.
    pub fn new(config: TimerConfiguration, store: SessionStore) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: TimerConfiguration,
        store: SessionStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let today = clock.today();
        let session = store.load_session();
        let stored_day = store.load_daily();
        let stale_day = stored_day.as_ref().is_some_and(|day| day.date != today);
        let stats = StatisticsAggregator::restore(stored_day, store.load_weekly(), today);

        let mut controller = Self {
            config: config.sanitized(),
            session,
            stats,
            store,
            bus: EventBus::new(),
            last_activity: clock.now(),
            clock,
        };
        if stale_day {
            controller.commit_stats();
        }

        tracing::info!(
            phase = %controller.session.phase,
            remaining = %controller.session.remaining,
            cycle = controller.session.cycle_count,
            running = controller.session.running,
            "timer state restored"
        );
        controller
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribers run on the thread that drives the controller and must not
    /// call back into it.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &TimerConfiguration {
        &self.config
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.session.running
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining: self.session.remaining,
            phase: self.session.phase,
            running: self.session.running,
            cycle_count: self.session.cycle_count,
            phase_total_secs: self.session.phase_total_secs(&self.config),
            cycles_before_long_break: self.config.cycles_before_long_break(),
            today: self.stats.today().clone(),
        }
    }

    pub fn today_statistics(&mut self) -> DailyStatistics {
        self.roll_over();
        self.stats.today().clone()
    }

    /// Trailing seven days, today's live counters included.
    pub fn weekly_statistics(&mut self) -> WeeklyHistory {
        let today = self.today();
        self.stats.weekly(today).clone()
    }

    pub fn weekly_summary(&mut self) -> WeeklySummary {
        let today = self.today();
        self.stats.weekly_summary(today)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) {
        self.update_activity();
        self.session.start(&self.config);
        tracing::debug!(phase = %self.session.phase, remaining = %self.session.remaining, "timer started");
        self.commit_session();
        self.emit_state();
    }

    /// Pause a running session. Returns `false`, and publishes nothing, if
    /// the session was already paused.
    pub fn pause(&mut self, reason: PauseReason) -> bool {
        if !self.session.pause() {
            return false;
        }
        tracing::debug!(?reason, remaining = %self.session.remaining, "timer paused");
        self.commit_session();
        self.bus.publish(&Event::TimerPaused { reason });
        self.emit_state();
        true
    }

    /// Continue counting without reloading the duration. An exhausted phase
    /// is restarted instead, so it cannot complete twice.
    pub fn resume(&mut self) {
        if self.session.remaining.is_zero() {
            self.start();
            return;
        }
        self.update_activity();
        self.session.resume();
        tracing::debug!(remaining = %self.session.remaining, "timer resumed");
        self.commit_session();
        self.emit_state();
    }

    /// Pause when running, resume otherwise.
    pub fn toggle_pause(&mut self) {
        if self.session.running {
            self.pause(PauseReason::User);
        } else {
            self.resume();
        }
    }

    pub fn restart(&mut self) {
        self.update_activity();
        self.session.restart(&self.config);
        tracing::debug!(phase = %self.session.phase, "timer restarted");
        self.commit_session();
        self.emit_state();
    }

    pub fn reset(&mut self) {
        self.session.reset();
        tracing::debug!("timer reset");
        self.commit_session();
        self.emit_state();
    }

    /// Advance to the next phase. Returns the new phase.
    pub fn switch_phase(&mut self, auto_start: bool) -> Phase {
        if auto_start {
            self.update_activity();
        }
        let previous = self.session.phase;
        let phase = self.session.switch_phase(&self.config, auto_start);
        tracing::info!(
            from = %previous,
            to = %phase,
            cycle = self.session.cycle_count,
            auto_start,
            "phase switched"
        );
        self.commit_session();
        self.bus.publish(&Event::PhaseChanged {
            phase,
            cycle_count: self.session.cycle_count,
        });
        self.emit_state();
        phase
    }

    pub fn reset_cycles(&mut self) {
        self.session.cycle_count = 0;
        self.commit_session();
        self.emit_state();
    }

    pub fn reset_statistics(&mut self) {
        let today = self.today();
        self.stats.reset(today);
        tracing::info!("statistics reset");
        self.commit_stats();
        self.emit_state();
    }

    /// Publish and return the current state.
    pub fn request_current_state(&mut self) -> TimerSnapshot {
        self.emit_state()
    }

    /// Count one second down.
    ///
    /// When the phase was already exhausted the session pauses, the
    /// completion is recorded in today's statistics and, only with
    /// `auto_start_next_phase`, the next phase starts right away.
    pub fn tick(&mut self) -> Tick {
        let tick = self.session.tick();
        match tick {
            Tick::Idle => {}
            Tick::Counted { remaining } => {
                tracing::trace!(%remaining, "tick");
                self.commit_session();
                self.bus.publish(&Event::Tick { remaining });
                self.emit_state();
            }
            Tick::Finished { phase } => {
                let auto_advance = self.config.auto_start_next_phase;
                tracing::info!(%phase, cycle = self.session.cycle_count, auto_advance, "phase completed");
                self.commit_session();
                self.bus.publish(&Event::PhaseCompleted {
                    phase,
                    cycle_count: self.session.cycle_count,
                    awaiting_confirmation: !auto_advance,
                });

                let today = self.today();
                self.stats.record_completion(phase, &self.config, today);
                self.commit_stats();
                self.emit_state();

                if auto_advance {
                    self.switch_phase(true);
                }
            }
        }
        tick
    }

    pub fn update_activity(&mut self) {
        self.last_activity = self.clock.now();
    }

    /// Pause with [`PauseReason::Inactivity`] when inactivity pausing is on,
    /// the session is running and nothing happened for longer than the
    /// threshold. Returns `true` if it paused.
    pub fn check_inactivity(&mut self) -> bool {
        if !self.config.pause_on_inactivity || !self.session.running {
            return false;
        }
        let idle = self.clock.now() - self.last_activity;
        if idle <= self.config.inactivity_threshold() {
            return false;
        }
        tracing::info!(idle_secs = idle.num_seconds(), "pausing after inactivity");
        self.pause(PauseReason::Inactivity)
    }

    /// Install a new configuration. The running countdown is left alone; new
    /// durations apply from the next restart or phase switch.
    pub fn set_configuration(&mut self, config: TimerConfiguration) {
        self.config = config.sanitized();
        tracing::debug!("configuration updated");
        self.emit_state();
    }

    /// Fold today into the weekly history and write everything out.
    pub fn dispose(&mut self) {
        self.roll_over();
        self.stats.fold_today();
        self.commit_session();
        self.commit_stats();
        tracing::info!("timer disposed");
    }

    // ── Internals ────────────────────────────────────────────────────

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn roll_over(&mut self) {
        let today = self.today();
        if self.stats.roll_over(today) {
            self.commit_stats();
        }
    }

    fn emit_state(&mut self) -> TimerSnapshot {
        self.roll_over();
        let snapshot = self.snapshot();
        self.bus.publish(&Event::StateChanged {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    fn commit_session(&mut self) {
        if let Err(err) = self.store.save_session(&self.session) {
            self.report_write_failure(err);
        }
    }

    fn commit_stats(&mut self) {
        if let Err(err) = self.store.save_stats(self.stats.today(), self.stats.history()) {
            self.report_write_failure(err);
        }
    }

    fn report_write_failure(&mut self, err: PersistenceError) {
        tracing::warn!(error = %err, "failed to persist timer state");
        self.bus.publish(&Event::PersistenceWarning {
            message: err.to_string(),
        });
    }
}

impl std::fmt::Debug for TimerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerController")
            .field("session", &self.session)
            .field("today", self.stats.today())
            .field("subscribers", &self.bus.len())
            .finish_non_exhaustive()
    }
}
