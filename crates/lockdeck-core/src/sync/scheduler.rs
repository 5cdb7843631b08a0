// ── Polling scheduler ──
//
// `PollLoop` drives one `PollJob` on a fixed interval with at most one
// fetch outstanding. Fetches run in their own task so that stopping the
// loop never cancels a request mid-flight; a result that lands after a
// stop, restart, or session teardown is discarded instead of applied.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lockdeck_api::SessionContext;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// What happened to one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The fetch succeeded and its result was applied.
    Applied,
    /// A fetch from this scheduler was already outstanding.
    Skipped,
    /// The fetch succeeded after a stop, restart, or session teardown.
    Discarded,
    /// The fetch failed. The scheduler keeps ticking.
    Failed(CoreError),
}

/// Something that can be started, stopped, and ticked.
///
/// Polling is the only implementation today; a push transport can stand
/// behind the same interface without touching the store.
pub trait Scheduler: Send + Sync {
    fn start(&self) -> impl Future<Output = Result<(), CoreError>> + Send;
    fn stop(&self) -> impl Future<Output = ()> + Send;
    fn tick(&self) -> impl Future<Output = TickOutcome> + Send;
    fn state(&self) -> SchedulerState;
}

/// One unit of recurring work: fetch remotely, then apply locally.
pub trait PollJob: Send + Sync + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    fn fetch(&self) -> impl Future<Output = Result<Self::Output, CoreError>> + Send;

    /// Apply a fetched result. Only called while the result is still current.
    fn apply(&self, output: Self::Output);
}

/// Clears the in-flight flag when dropped, on every path.
pub(crate) struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    pub(crate) fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Timing knobs for a [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Stop the loop after this many consecutive failed ticks.
    pub max_consecutive_failures: Option<u32>,
}

impl PollOptions {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_consecutive_failures: None,
        }
    }

    pub fn stop_after_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = Some(limit);
        self
    }
}

// ── PollLoop ─────────────────────────────────────────────────────────

/// Interval-driven scheduler for a single [`PollJob`].
///
/// Cheaply cloneable via `Arc<PollInner>`.
pub struct PollLoop<J: PollJob> {
    inner: Arc<PollInner<J>>,
}

impl<J: PollJob> Clone for PollLoop<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PollInner<J: PollJob> {
    job: J,
    session: Arc<SessionContext>,
    options: PollOptions,
    state: watch::Sender<SchedulerState>,
    in_flight: Arc<AtomicBool>,
    /// Bumped on every start and stop; results from an older epoch are stale.
    epoch: AtomicU64,
    /// Held while checking staleness and applying, and while bumping `epoch`
    /// on stop, so a stop never interleaves with an apply.
    apply_gate: std::sync::Mutex<()>,
    consecutive_failures: AtomicU32,
    last_success: watch::Sender<Option<DateTime<Utc>>>,
    timer: Mutex<Option<CancellationToken>>,
}

impl<J: PollJob> PollLoop<J> {
    pub fn new(job: J, session: Arc<SessionContext>, options: PollOptions) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        let (last_success, _) = watch::channel(None);
        Self {
            inner: Arc::new(PollInner {
                job,
                session,
                options,
                state,
                in_flight: Arc::new(AtomicBool::new(false)),
                epoch: AtomicU64::new(0),
                apply_gate: std::sync::Mutex::new(()),
                consecutive_failures: AtomicU32::new(0),
                last_success,
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn job(&self) -> &J {
        &self.inner.job
    }

    pub fn options(&self) -> PollOptions {
        self.inner.options
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Completion time of the last applied fetch.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_success.borrow()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start ticking. No-op if already running.
    ///
    /// Launches one fetch immediately, then one per interval. A zero
    /// interval is rejected.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut timer = self.inner.timer.lock().await;
        if timer.is_some() {
            debug!(job = self.inner.job.name(), "already running");
            return Ok(());
        }
        if self.inner.options.interval.is_zero() {
            return Err(CoreError::Config {
                message: format!("{} interval must be greater than zero", self.inner.job.name()),
            });
        }
        if !self.inner.session.is_authenticated() {
            return Err(CoreError::NotAuthenticated);
        }

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.consecutive_failures.store(0, Ordering::SeqCst);
        self.inner.state.send_replace(SchedulerState::Running);

        match self.try_begin() {
            // Detached: the result is applied (or discarded) by the task itself.
            Some(guard) => drop(self.launch(guard, epoch)),
            None => debug!(
                job = self.inner.job.name(),
                "previous fetch still outstanding, skipping immediate tick"
            ),
        }

        let cancel = CancellationToken::new();
        tokio::spawn(timer_task(self.clone(), cancel.clone()));
        *timer = Some(cancel);

        info!(
            job = self.inner.job.name(),
            interval = ?self.inner.options.interval,
            "scheduler started"
        );
        Ok(())
    }

    /// Stop ticking. Idempotent. An outstanding fetch keeps running but its
    /// result will be discarded.
    pub async fn stop(&self) {
        if self.halt(None).await {
            info!(job = self.inner.job.name(), "scheduler stopped");
        }
    }

    /// Run one fetch now, unless one is already outstanding.
    ///
    /// Works while stopped too; the result is applied if no start, stop,
    /// or session teardown happened in the meantime.
    pub async fn tick(&self) -> TickOutcome {
        let Some(guard) = self.try_begin() else {
            debug!(job = self.inner.job.name(), "fetch outstanding, tick dropped");
            return TickOutcome::Skipped;
        };
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        match self.launch(guard, epoch).await {
            Ok(outcome) => outcome,
            Err(e) => TickOutcome::Failed(CoreError::Internal(format!("poll task failed: {e}"))),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    pub(crate) fn try_begin(&self) -> Option<InFlightGuard> {
        InFlightGuard::try_acquire(&self.inner.in_flight)
    }

    fn launch(&self, guard: InFlightGuard, epoch: u64) -> JoinHandle<TickOutcome> {
        let this = self.clone();
        let generation = self.inner.session.generation();
        tokio::spawn(async move {
            let _guard = guard;
            let result = this.inner.job.fetch().await;
            this.complete(result, epoch, generation).await
        })
    }

    async fn complete(
        &self,
        result: Result<J::Output, CoreError>,
        epoch: u64,
        generation: u64,
    ) -> TickOutcome {
        let name = self.inner.job.name();

        let error = {
            let _gate = self
                .inner
                .apply_gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.epoch.load(Ordering::SeqCst) != epoch
                || self.inner.session.generation() != generation
            {
                debug!(job = name, "scheduler or session changed, discarding result");
                // Stale errors are still reported but never count toward the limit.
                return match result {
                    Ok(_) => TickOutcome::Discarded,
                    Err(e) => TickOutcome::Failed(e),
                };
            }
            match result {
                Ok(output) => {
                    self.inner.job.apply(output);
                    self.inner.consecutive_failures.store(0, Ordering::SeqCst);
                    self.inner.last_success.send_replace(Some(Utc::now()));
                    return TickOutcome::Applied;
                }
                Err(e) => e,
            }
        };

        let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(job = name, failures, error = %error, "poll failed");

        let limit_reached = self
            .inner
            .options
            .max_consecutive_failures
            .is_some_and(|limit| failures >= limit);
        if limit_reached && self.halt(Some(epoch)).await {
            warn!(job = name, failures, "too many consecutive failures, scheduler stopped");
        }
        TickOutcome::Failed(error)
    }

    /// Cancel the timer and move to `Stopped`. With `expected_epoch`, only
    /// halts if no start/stop happened since that epoch. Returns whether
    /// the loop was running.
    async fn halt(&self, expected_epoch: Option<u64>) -> bool {
        let mut timer = self.inner.timer.lock().await;
        if expected_epoch.is_some_and(|e| e != self.inner.epoch.load(Ordering::SeqCst)) {
            return false;
        }
        let Some(cancel) = timer.take() else {
            return false;
        };
        cancel.cancel();
        {
            let _gate = self
                .inner
                .apply_gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.state.send_replace(SchedulerState::Stopped);
        true
    }
}

impl<J: PollJob> Scheduler for PollLoop<J> {
    fn start(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        PollLoop::start(self)
    }

    fn stop(&self) -> impl Future<Output = ()> + Send {
        PollLoop::stop(self)
    }

    fn tick(&self) -> impl Future<Output = TickOutcome> + Send {
        PollLoop::tick(self)
    }

    fn state(&self) -> SchedulerState {
        PollLoop::state(self)
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Tick at the configured interval until cancelled. The immediate first
/// tick is launched by `start` itself.
async fn timer_task<J: PollJob>(poll: PollLoop<J>, cancel: CancellationToken) {
    let period = poll.inner.options.interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = poll.tick() => {}
        }
    }
    debug!(job = poll.inner.job.name(), "timer exited");
}
