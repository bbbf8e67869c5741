//! Drive loops around a [`TimerController`].
//!
//! `TimerService` owns the controller behind a mutex together with the two
//! periodic loops: the one-second tick loop and the inactivity watchdog.
//! Every command locks, runs the controller operation and then re-arms the
//! loops, so at most one tick loop exists and none survives a pause.
//!
//! A loop that wakes up after it was replaced finds a different id in the
//! installed handle and exits without ticking.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::controller::{TimerController, TimerSnapshot};
use crate::events::{Event, SubscriptionId};
use crate::stats::{DailyStatistics, WeeklyHistory, WeeklySummary};
use crate::storage::TimerConfiguration;
use crate::timer::{PauseReason, Phase, Tick};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
pub const INACTIVITY_CHECK_PERIOD: Duration = Duration::from_secs(30);

/// Installed periodic loop.
#[derive(Debug)]
pub struct DriveLoopHandle {
    id: u64,
    task: JoinHandle<()>,
}

impl DriveLoopHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn cancel(self) {
        self.task.abort();
    }
}

struct Inner {
    controller: TimerController,
    drive: Option<DriveLoopHandle>,
    watchdog: Option<DriveLoopHandle>,
    next_loop_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_loop_id += 1;
        self.next_loop_id
    }

    fn cancel_drive(&mut self) {
        if let Some(handle) = self.drive.take() {
            tracing::trace!(id = handle.id, "drive loop cancelled");
            handle.cancel();
        }
    }

    fn cancel_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            tracing::trace!(id = handle.id, "watchdog cancelled");
            handle.cancel();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_drive();
        self.cancel_watchdog();
    }
}

struct Shared {
    state: Mutex<Inner>,
    runtime: Handle,
    tick_period: Duration,
    watchdog_period: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Thread-safe handle to the running timer. Clones share the same timer.
///
/// Event subscribers are called with the service lock held and must not
/// call back into the service.
#[derive(Clone)]
pub struct TimerService {
    shared: Arc<Shared>,
}

impl TimerService {
    /// Take ownership of `controller` and spawn its loops on `runtime`.
    /// A session restored as running starts ticking right away.
    pub fn new(controller: TimerController, runtime: Handle) -> Self {
        Self::with_periods(controller, runtime, TICK_PERIOD, INACTIVITY_CHECK_PERIOD)
    }

    pub fn with_periods(
        controller: TimerController,
        runtime: Handle,
        tick_period: Duration,
        watchdog_period: Duration,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(Inner {
                controller,
                drive: None,
                watchdog: None,
                next_loop_id: 0,
            }),
            runtime,
            tick_period,
            watchdog_period,
        });
        {
            let mut inner = shared.lock();
            rearm(&shared, &mut inner);
        }
        Self { shared }
    }

    fn command<R>(&self, op: impl FnOnce(&mut TimerController) -> R) -> R {
        let mut inner = self.shared.lock();
        let result = op(&mut inner.controller);
        rearm(&self.shared, &mut inner);
        result
    }

    fn query<R>(&self, op: impl FnOnce(&mut TimerController) -> R) -> R {
        op(&mut self.shared.lock().controller)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&self) {
        self.command(TimerController::start);
    }

    pub fn pause(&self, reason: PauseReason) -> bool {
        self.command(|c| c.pause(reason))
    }

    pub fn resume(&self) {
        self.command(TimerController::resume);
    }

    pub fn toggle_pause(&self) {
        self.command(TimerController::toggle_pause);
    }

    pub fn restart(&self) {
        self.command(TimerController::restart);
    }

    pub fn reset(&self) {
        self.command(TimerController::reset);
    }

    pub fn switch_phase(&self, auto_start: bool) -> Phase {
        self.command(|c| c.switch_phase(auto_start))
    }

    pub fn reset_cycles(&self) {
        self.command(TimerController::reset_cycles);
    }

    pub fn reset_statistics(&self) {
        self.command(TimerController::reset_statistics);
    }

    pub fn set_configuration(&self, config: TimerConfiguration) {
        self.command(|c| c.set_configuration(config));
    }

    pub fn update_activity(&self) {
        self.query(TimerController::update_activity);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn request_current_state(&self) -> TimerSnapshot {
        self.query(TimerController::request_current_state)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.query(|c| c.snapshot())
    }

    pub fn config(&self) -> TimerConfiguration {
        self.query(|c| c.config().clone())
    }

    pub fn today_statistics(&self) -> DailyStatistics {
        self.query(TimerController::today_statistics)
    }

    pub fn weekly_statistics(&self) -> WeeklyHistory {
        self.query(TimerController::weekly_statistics)
    }

    pub fn weekly_summary(&self) -> WeeklySummary {
        self.query(TimerController::weekly_summary)
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.query(|c| c.subscribe(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.query(|c| c.unsubscribe(id))
    }

    pub fn is_drive_loop_active(&self) -> bool {
        self.shared.lock().drive.is_some()
    }

    pub fn is_watchdog_active(&self) -> bool {
        self.shared.lock().watchdog.is_some()
    }

    /// Stop both loops and dispose the controller.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        inner.cancel_drive();
        inner.cancel_watchdog();
        inner.controller.dispose();
        tracing::info!("timer service shut down");
    }
}

impl std::fmt::Debug for TimerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("TimerService")
            .field("controller", &inner.controller)
            .field("drive", &inner.drive.as_ref().map(DriveLoopHandle::id))
            .field("watchdog", &inner.watchdog.as_ref().map(DriveLoopHandle::id))
            .finish()
    }
}

/// Replace the tick loop (if running) and bring the watchdog in line with
/// the configuration.
fn rearm(shared: &Arc<Shared>, inner: &mut Inner) {
    inner.cancel_drive();
    if inner.controller.is_running() {
        let handle = spawn_drive(shared, inner);
        inner.drive = Some(handle);
    }

    let wanted = inner.controller.config().pause_on_inactivity;
    match (wanted, inner.watchdog.is_some()) {
        (true, false) => {
            let handle = spawn_watchdog(shared, inner);
            inner.watchdog = Some(handle);
        }
        (false, true) => inner.cancel_watchdog(),
        _ => {}
    }
}

fn spawn_drive(shared: &Arc<Shared>, inner: &mut Inner) -> DriveLoopHandle {
    let id = inner.next_id();
    let period = shared.tick_period;
    let weak = Arc::downgrade(shared);
    tracing::trace!(id, "drive loop installed");
    let task = shared.runtime.spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if !drive_tick(&weak, id) {
                break;
            }
        }
    });
    DriveLoopHandle { id, task }
}

/// Returns `false` once the loop should exit.
fn drive_tick(weak: &Weak<Shared>, id: u64) -> bool {
    let Some(shared) = weak.upgrade() else {
        return false;
    };
    let mut inner = shared.lock();
    if inner.drive.as_ref().map(DriveLoopHandle::id) != Some(id) {
        return false;
    }

    match inner.controller.tick() {
        Tick::Counted { .. } => true,
        Tick::Idle => {
            inner.drive = None;
            false
        }
        Tick::Finished { .. } => {
            // Dropping our own handle detaches this task; it exits below.
            inner.drive = None;
            if inner.controller.is_running() {
                let handle = spawn_drive(&shared, &mut inner);
                inner.drive = Some(handle);
            }
            false
        }
    }
}

fn spawn_watchdog(shared: &Arc<Shared>, inner: &mut Inner) -> DriveLoopHandle {
    let id = inner.next_id();
    let period = shared.watchdog_period;
    let weak = Arc::downgrade(shared);
    tracing::trace!(id, "watchdog installed");
    let task = shared.runtime.spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if !watchdog_tick(&weak, id) {
                break;
            }
        }
    });
    DriveLoopHandle { id, task }
}

fn watchdog_tick(weak: &Weak<Shared>, id: u64) -> bool {
    let Some(shared) = weak.upgrade() else {
        return false;
    };
    let mut inner = shared.lock();
    if inner.watchdog.as_ref().map(DriveLoopHandle::id) != Some(id) {
        return false;
    }
    if inner.controller.check_inactivity() {
        inner.cancel_drive();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::storage::{keys, KvStore, MemoryStore, SessionStore};
    use crate::timer::Remaining;
    use chrono::{DateTime, Local};

    /// Wall clock that follows tokio's (paused) clock.
    struct TokioClock {
        wall: DateTime<Local>,
        origin: Instant,
    }

    impl TokioClock {
        fn new() -> Self {
            Self {
                wall: Local::now(),
                origin: Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Local> {
            let elapsed = Instant::now() - self.origin;
            self.wall + chrono::Duration::from_std(elapsed).unwrap()
        }
    }

    fn service(memory: &MemoryStore, config: TimerConfiguration) -> TimerService {
        let controller = TimerController::with_clock(
            config,
            SessionStore::new(memory.clone()),
            Arc::new(TokioClock::new()),
        );
        TimerService::new(controller, Handle::current())
    }

    fn quick_config() -> TimerConfiguration {
        TimerConfiguration {
            work_duration_minutes: 1,
            break_duration_minutes: 1,
            ..TimerConfiguration::default()
        }
    }

    async fn sleep_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn drive_loop_counts_down_once_per_second() {
        let memory = MemoryStore::new();
        let service = service(&memory, TimerConfiguration::default());
        service.start();
        assert!(service.is_drive_loop_active());

        sleep_ms(3_500).await;
        assert_eq!(service.snapshot().remaining, Remaining::new(0, 24, 57));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticking() {
        let memory = MemoryStore::new();
        let service = service(&memory, TimerConfiguration::default());
        service.start();
        sleep_ms(2_500).await;

        assert!(service.pause(PauseReason::User));
        assert!(!service.is_drive_loop_active());
        let paused_at = service.snapshot().remaining;
        assert_eq!(paused_at, Remaining::new(0, 24, 58));

        sleep_ms(5_000).await;
        assert_eq!(service.snapshot().remaining, paused_at);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_start_keeps_a_single_loop() {
        let memory = MemoryStore::new();
        let service = service(&memory, TimerConfiguration::default());
        service.start();
        sleep_ms(500).await;
        service.start();
        service.resume();

        sleep_ms(3_200).await;
        assert_eq!(service.snapshot().remaining, Remaining::new(0, 24, 57));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_ticking() {
        let memory = MemoryStore::new();
        let service = service(&memory, TimerConfiguration::default());
        service.start();
        sleep_ms(1_500).await;
        service.reset();

        sleep_ms(3_000).await;
        assert_eq!(service.snapshot().remaining, Remaining::ZERO);
        assert!(!service.is_drive_loop_active());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_phase_uninstalls_loop() {
        let memory = MemoryStore::new();
        let service = service(&memory, quick_config());
        let completed = Arc::new(Mutex::new(Vec::new()));
        let sink = completed.clone();
        service.subscribe(move |event| {
            if let Event::PhaseCompleted { phase, .. } = event {
                sink.lock().unwrap().push(*phase);
            }
        });

        service.start();
        sleep_ms(65_000).await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.phase, Phase::Work);
        assert!(!snapshot.running);
        assert!(!service.is_drive_loop_active());
        assert_eq!(snapshot.today.completed_work_cycles, 1);
        assert_eq!(*completed.lock().unwrap(), vec![Phase::Work]);

        assert_eq!(service.switch_phase(true), Phase::Break);
        assert!(service.is_drive_loop_active());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advance_rearms_loop() {
        let memory = MemoryStore::new();
        let service = service(
            &memory,
            TimerConfiguration {
                auto_start_next_phase: true,
                ..quick_config()
            },
        );
        service.start();
        sleep_ms(65_500).await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.phase, Phase::Break);
        assert!(snapshot.running);
        assert_eq!(snapshot.remaining, Remaining::new(0, 0, 56));
        assert!(service.is_drive_loop_active());
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_pauses_idle_session() {
        let memory = MemoryStore::new();
        let service = service(
            &memory,
            TimerConfiguration {
                pause_on_inactivity: true,
                inactivity_threshold_minutes: 1,
                ..TimerConfiguration::default()
            },
        );
        let paused = Arc::new(Mutex::new(Vec::new()));
        let sink = paused.clone();
        service.subscribe(move |event| {
            if let Event::TimerPaused { reason } = event {
                sink.lock().unwrap().push(*reason);
            }
        });
        assert!(service.is_watchdog_active());

        service.start();
        sleep_ms(61_000).await;
        assert!(service.snapshot().running);

        sleep_ms(30_000).await;
        assert!(!service.snapshot().running);
        assert!(!service.is_drive_loop_active());
        assert_eq!(*paused.lock().unwrap(), vec![PauseReason::Inactivity]);

        let frozen = service.snapshot().remaining;
        sleep_ms(5_000).await;
        assert_eq!(service.snapshot().remaining, frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_keeps_session_running() {
        let memory = MemoryStore::new();
        let service = service(
            &memory,
            TimerConfiguration {
                pause_on_inactivity: true,
                inactivity_threshold_minutes: 1,
                ..TimerConfiguration::default()
            },
        );
        service.start();
        for _ in 0..6 {
            sleep_ms(25_000).await;
            service.update_activity();
        }
        assert!(service.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_follows_configuration() {
        let memory = MemoryStore::new();
        let service = service(&memory, TimerConfiguration::default());
        assert!(!service.is_watchdog_active());

        service.set_configuration(TimerConfiguration {
            pause_on_inactivity: true,
            ..TimerConfiguration::default()
        });
        assert!(service.is_watchdog_active());

        service.set_configuration(TimerConfiguration::default());
        assert!(!service.is_watchdog_active());
    }

    #[tokio::test(start_paused = true)]
    async fn restored_running_session_resumes_ticking() {
        let memory = MemoryStore::new();
        memory.set(keys::CURRENT_MINUTES, "10").unwrap();
        memory.set(keys::IS_PAUSED, "false").unwrap();

        let service = service(&memory, TimerConfiguration::default());
        assert!(service.is_drive_loop_active());
        sleep_ms(1_500).await;
        assert_eq!(service.snapshot().remaining, Remaining::new(0, 9, 59));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_loops_and_folds_statistics() {
        let memory = MemoryStore::new();
        let service = service(
            &memory,
            TimerConfiguration {
                pause_on_inactivity: true,
                ..TimerConfiguration::default()
            },
        );
        service.start();
        sleep_ms(1_500).await;
        service.shutdown();

        assert!(!service.is_drive_loop_active());
        assert!(!service.is_watchdog_active());
        assert!(memory.get(keys::WEEKLY_STATS).unwrap().is_some());

        let remaining = service.snapshot().remaining;
        sleep_ms(3_000).await;
        assert_eq!(service.snapshot().remaining, remaining);
    }
}
