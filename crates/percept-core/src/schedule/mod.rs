//! Debounced scheduling for expensive corpus scans.
//!
//! One logical job slot moves through Idle -> Scheduled -> Running -> Idle.
//! Non-force triggers debounce (every trigger resets the timer); force
//! triggers fire as soon as the minimum inter-run window allows. Triggers
//! arriving while a scan runs coalesce into a single owed rerun, so bursts
//! cause at most one extra scan and a rerun request is never dropped.
//!
//! The state lives in a single actor task driven by a command channel, which
//! also makes the one-instance assumption explicit: clone the handle freely,
//! but spawn exactly one scheduler per job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SchedulerConfig;
use crate::error::EngineResult;

/// The work a scheduler drives, typically a full hub scan.
#[async_trait]
pub trait ScanJob: Send + Sync + 'static {
    async fn run(&self) -> EngineResult<()>;
}

enum Command {
    Trigger { force: bool },
    Shutdown,
}

/// Handle to a spawned scheduler actor.
#[derive(Clone)]
pub struct ScanScheduler {
    tx: mpsc::Sender<Command>,
}

impl ScanScheduler {
    /// Spawn the actor. Returns the trigger handle and the actor task.
    pub fn spawn(job: Arc<dyn ScanJob>, config: &SchedulerConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let actor = Actor {
            job,
            debounce: Duration::from_millis(config.debounce_ms),
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_completed: None,
        };
        let handle = tokio::spawn(actor.run(rx));
        (Self { tx }, handle)
    }

    /// Request a scan after the debounce window. Repeated triggers reset
    /// the window; a trigger during a running scan owes one rerun.
    pub async fn trigger(&self) {
        self.send(Command::Trigger { force: false }).await;
    }

    /// Request a scan as soon as the inter-run window allows, skipping the
    /// debounce.
    pub async fn trigger_force(&self) {
        self.send(Command::Trigger { force: true }).await;
    }

    /// Stop the actor. A running scan finishes first; scheduled and owed
    /// work is dropped.
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            tracing::warn!("Scan scheduler is stopped; request dropped");
        }
    }
}

/// Job slot state. `Running` is implicit: the actor is inside
/// [`Actor::run_job`] while a scan runs.
#[derive(Clone, Copy)]
enum Slot {
    Idle,
    Scheduled { fire_at: Instant },
}

enum RunExit {
    Idle,
    Rescheduled { fire_at: Instant },
    Shutdown,
}

struct Actor {
    job: Arc<dyn ScanJob>,
    debounce: Duration,
    min_interval: Duration,
    last_completed: Option<Instant>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut slot = Slot::Idle;
        loop {
            match slot {
                Slot::Idle => match rx.recv().await {
                    Some(Command::Trigger { force }) => {
                        slot = Slot::Scheduled {
                            fire_at: self.first_fire_at(force),
                        };
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Slot::Scheduled { fire_at } => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(fire_at) => {
                            match self.run_job(&mut rx).await {
                                RunExit::Idle => slot = Slot::Idle,
                                RunExit::Rescheduled { fire_at } => {
                                    slot = Slot::Scheduled { fire_at };
                                }
                                RunExit::Shutdown => break,
                            }
                        }
                        cmd = rx.recv() => match cmd {
                            Some(Command::Trigger { force }) => {
                                slot = Slot::Scheduled {
                                    fire_at: self.next_fire_at(fire_at, force),
                                };
                            }
                            Some(Command::Shutdown) | None => break,
                        }
                    }
                }
            }
        }
        tracing::debug!("Scan scheduler stopped");
    }

    /// Run the scan while continuing to drain commands, so triggers during
    /// the run coalesce into one owed rerun instead of piling up.
    async fn run_job(&mut self, rx: &mut mpsc::Receiver<Command>) -> RunExit {
        tracing::info!("Scheduled scan starting");
        let job = self.job.clone();
        let mut handle = tokio::spawn(async move { job.run().await });
        let mut pending = false;
        let mut shutdown = false;

        let result = loop {
            tokio::select! {
                result = &mut handle => break result,
                cmd = rx.recv() => match cmd {
                    Some(Command::Trigger { .. }) => {
                        if !pending {
                            tracing::debug!("Trigger during running scan; rerun owed");
                        }
                        pending = true;
                    }
                    Some(Command::Shutdown) => shutdown = true,
                    None => {
                        shutdown = true;
                        break (&mut handle).await;
                    }
                }
            }
        };
        // The job boundary: failures and panics are logged, never re-thrown,
        // so the slot always returns to a schedulable state.
        match result {
            Ok(Ok(())) => tracing::info!("Scheduled scan completed"),
            Ok(Err(e)) => tracing::error!("Scheduled scan failed: {e}"),
            Err(e) => tracing::error!("Scheduled scan panicked: {e}"),
        }
        self.last_completed = Some(Instant::now());

        if shutdown {
            RunExit::Shutdown
        } else if pending {
            // The owed rerun fires as soon as the inter-run window reopens.
            RunExit::Rescheduled {
                fire_at: self.window_reopens_at(),
            }
        } else {
            RunExit::Idle
        }
    }

    fn first_fire_at(&self, force: bool) -> Instant {
        if force {
            self.window_reopens_at()
        } else {
            Instant::now() + self.debounce
        }
    }

    /// Fire time after a trigger lands on an already-scheduled slot.
    /// Non-force resets the debounce; force never postpones an earlier fire.
    fn next_fire_at(&self, current: Instant, force: bool) -> Instant {
        if force {
            current.min(self.window_reopens_at())
        } else {
            Instant::now() + self.debounce
        }
    }

    /// Earliest instant a forced or owed scan may start: `min_interval`
    /// after the last completion, or now if that has already passed.
    fn window_reopens_at(&self) -> Instant {
        let now = Instant::now();
        match self.last_completed {
            Some(done) => now.max(done + self.min_interval),
            None => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;
    use tokio::task::yield_now;
    use tokio::time::{advance, Duration};

    /// Job whose runs block until released, so tests can hold the slot in
    /// Running while sending triggers.
    struct GatedJob {
        runs_started: AtomicUsize,
        runs_finished: AtomicUsize,
        gate: Semaphore,
        fail: bool,
    }

    impl GatedJob {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                runs_started: AtomicUsize::new(0),
                runs_finished: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                runs_started: AtomicUsize::new(0),
                runs_finished: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                fail: true,
            })
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }

        fn started(&self) -> usize {
            self.runs_started.load(Ordering::SeqCst)
        }

        fn finished(&self) -> usize {
            self.runs_finished.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScanJob for GatedJob {
        async fn run(&self) -> EngineResult<()> {
            self.runs_started.fetch_add(1, Ordering::SeqCst);
            // forget() consumes the permit so each release() admits one run.
            self.gate.acquire().await.unwrap().forget();
            self.runs_finished.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(crate::error::EngineError::Provider {
                    message: "injected scan failure".to_string(),
                    status_code: None,
                })
            } else {
                Ok(())
            }
        }
    }

    fn config(debounce_ms: u64, min_interval_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            debounce_ms,
            min_interval_ms,
        }
    }

    /// Let the actor process queued commands without advancing time.
    async fn settle() {
        for _ in 0..16 {
            yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_debounces_and_resets() {
        let job = GatedJob::new();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(30_000, 0));

        scheduler.trigger().await;
        settle().await;
        advance(Duration::from_millis(20_000)).await;
        settle().await;
        assert_eq!(job.started(), 0);

        // A second trigger resets the window: 40s total elapsed is not
        // 30s past the reset.
        scheduler.trigger().await;
        settle().await;
        advance(Duration::from_millis(20_000)).await;
        settle().await;
        assert_eq!(job.started(), 0);

        advance(Duration::from_millis(10_001)).await;
        settle().await;
        assert_eq!(job.started(), 1);

        job.release();
        settle().await;
        assert_eq!(job.finished(), 1);

        scheduler.shutdown().await;
        let _ = actor.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_trigger_skips_debounce() {
        let job = GatedJob::new();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(30_000, 0));

        scheduler.trigger_force().await;
        settle().await;
        assert_eq!(job.started(), 1);

        job.release();
        settle().await;
        scheduler.shutdown().await;
        let _ = actor.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_during_run_coalesce_into_one_rerun() {
        let job = GatedJob::new();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(1_000, 0));

        scheduler.trigger_force().await;
        settle().await;
        assert_eq!(job.started(), 1);

        // A burst of triggers while the scan runs is owed exactly one rerun.
        scheduler.trigger().await;
        scheduler.trigger_force().await;
        scheduler.trigger().await;
        settle().await;
        assert_eq!(job.started(), 1);

        job.release();
        settle().await;
        assert_eq!(job.finished(), 1);
        assert_eq!(job.started(), 2);

        job.release();
        settle().await;
        assert_eq!(job.finished(), 2);
        // No third run materializes.
        advance(Duration::from_millis(5_000)).await;
        settle().await;
        assert_eq!(job.started(), 2);

        scheduler.shutdown().await;
        let _ = actor.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_respects_min_interval_window() {
        let job = GatedJob::new();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(1_000, 300_000));

        scheduler.trigger_force().await;
        settle().await;
        job.release();
        settle().await;
        assert_eq!(job.finished(), 1);

        // Forced again right after completion: rescheduled, not dropped,
        // and not started inside the window.
        scheduler.trigger_force().await;
        settle().await;
        advance(Duration::from_millis(299_000)).await;
        settle().await;
        assert_eq!(job.started(), 1);

        // Fires exactly when the window reopens.
        advance(Duration::from_millis(1_001)).await;
        settle().await;
        assert_eq!(job.started(), 2);

        job.release();
        settle().await;
        scheduler.shutdown().await;
        let _ = actor.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_still_honors_owed_rerun() {
        let job = GatedJob::failing();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(1_000, 0));

        scheduler.trigger_force().await;
        settle().await;
        scheduler.trigger().await;
        settle().await;

        // First run fails; the owed rerun must still happen.
        job.release();
        settle().await;
        assert_eq!(job.finished(), 1);
        assert_eq!(job.started(), 2);

        job.release();
        settle().await;
        scheduler.shutdown().await;
        let _ = actor.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_running_scan() {
        let job = GatedJob::new();
        let (scheduler, actor) = ScanScheduler::spawn(job.clone(), &config(1_000, 0));

        scheduler.trigger_force().await;
        settle().await;
        assert_eq!(job.started(), 1);

        scheduler.shutdown().await;
        settle().await;
        job.release();
        let _ = actor.await;
        assert_eq!(job.finished(), 1);

        // Triggers after shutdown are dropped, not queued.
        scheduler.trigger().await;
        settle().await;
        assert_eq!(job.started(), 1);
    }
}
