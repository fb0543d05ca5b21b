//! Periodic refresh loops, one per live contest.
//!
//! Going live spawns a loop that recomputes standings on a fixed cadence,
//! reacts to manual triggers without disturbing that cadence, and runs
//! cheap growth pulses in between. Triggers landing while a refresh is
//! already queued coalesce into the pending one. Stopping a contest tears
//! its loop down and waits for it, so no timer outlives the contest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::contests::leaderboard::pipeline::{RecomputePipeline, RefreshError};
use crate::contests::leaderboard::repository::SubmissionStore;
use crate::contests::leaderboard::sources::{ContestDirectory, DirectoryError, MetricsSource};
use crate::contests::ContestId;

/// Cadence and capacity settings for the refresh machinery.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Gap between full recompute cycles while a contest is live.
    pub refresh_interval: Duration,
    /// How long one metrics fetch may take before the cycle fails.
    pub metrics_deadline: Duration,
    /// Gap between growth pulses, or `None` to disable them.
    pub pulse_interval: Option<Duration>,
    /// Buffered events per subscriber before older ones are dropped.
    pub event_capacity: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            metrics_deadline: Duration::from_secs(10),
            pulse_interval: Some(Duration::from_secs(5)),
            event_capacity: 256,
        }
    }
}

/// Error enumeration for scheduler failures.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("contest not found")]
    UnknownContest,
    #[error("contest is not live")]
    NotLive,
    #[error("refresh loop already running")]
    AlreadyLive,
    #[error("no refresh loop running")]
    NotRunning,
    #[error("contest directory unavailable: {0}")]
    Directory(String),
}

struct ContestLoop {
    trigger: mpsc::Sender<()>,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the per-contest refresh loops.
pub struct RefreshScheduler<S, M, D> {
    pipeline: Arc<RecomputePipeline<S, M, D>>,
    directory: Arc<D>,
    config: RefreshConfig,
    contests: Mutex<HashMap<ContestId, ContestLoop>>,
}

impl<S, M, D> RefreshScheduler<S, M, D>
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    pub fn new(
        pipeline: Arc<RecomputePipeline<S, M, D>>,
        directory: Arc<D>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            pipeline,
            directory,
            config,
            contests: Mutex::new(HashMap::new()),
        }
    }

    /// Starts the refresh loop for a live contest.
    ///
    /// The first cycle runs immediately so standings exist as soon as the
    /// contest opens. Starting an already-running contest is an error; a
    /// loop that ended on its own can be started again.
    pub async fn go_live(&self, contest_id: &ContestId) -> Result<(), SchedulerError> {
        let contest = self
            .directory
            .contest(contest_id)
            .await
            .map_err(directory_error)?;
        if !contest.is_live() {
            return Err(SchedulerError::NotLive);
        }

        let mut contests = self.contests.lock().expect("scheduler registry poisoned");
        if let Some(existing) = contests.get(contest_id) {
            if !existing.handle.is_finished() {
                return Err(SchedulerError::AlreadyLive);
            }
        }

        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.directory),
            contest_id.clone(),
            self.config.clone(),
            trigger_rx,
            shutdown_rx,
        ));
        contests.insert(
            contest_id.clone(),
            ContestLoop {
                trigger: trigger_tx,
                shutdown: shutdown_tx,
                handle,
            },
        );
        info!(
            contest = %contest_id,
            interval_secs = self.config.refresh_interval.as_secs(),
            "refresh loop started"
        );
        Ok(())
    }

    /// Queues an off-cadence refresh without resetting the periodic timer.
    /// If one is already queued, the new request folds into it.
    pub fn trigger(&self, contest_id: &ContestId) -> Result<(), SchedulerError> {
        let contests = self.contests.lock().expect("scheduler registry poisoned");
        let Some(entry) = contests.get(contest_id) else {
            return Err(SchedulerError::NotRunning);
        };
        match entry.trigger.try_send(()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(())) => {
                debug!(contest = %contest_id, "refresh already queued; coalescing");
                Ok(())
            }
            Err(TrySendError::Closed(())) => Err(SchedulerError::NotRunning),
        }
    }

    /// Stops the contest's refresh loop and waits for it to wind down.
    pub async fn stop(&self, contest_id: &ContestId) -> Result<(), SchedulerError> {
        let removed = {
            let mut contests = self.contests.lock().expect("scheduler registry poisoned");
            contests.remove(contest_id)
        };
        let Some(entry) = removed else {
            return Err(SchedulerError::NotRunning);
        };

        let _ = entry.shutdown.send(()).await;
        if let Err(err) = entry.handle.await {
            warn!(contest = %contest_id, error = %err, "refresh loop ended abnormally");
        }
        Ok(())
    }

    pub fn is_running(&self, contest_id: &ContestId) -> bool {
        let contests = self.contests.lock().expect("scheduler registry poisoned");
        contests
            .get(contest_id)
            .map(|entry| !entry.handle.is_finished())
            .unwrap_or(false)
    }

    /// Tears down every refresh loop. Called on engine shutdown.
    pub async fn shutdown_all(&self) {
        let drained: Vec<(ContestId, ContestLoop)> = {
            let mut contests = self.contests.lock().expect("scheduler registry poisoned");
            contests.drain().collect()
        };
        for (contest_id, entry) in drained {
            let _ = entry.shutdown.send(()).await;
            if let Err(err) = entry.handle.await {
                warn!(contest = %contest_id, error = %err, "refresh loop ended abnormally");
            }
        }
    }
}

fn directory_error(err: DirectoryError) -> SchedulerError {
    match err {
        DirectoryError::UnknownContest => SchedulerError::UnknownContest,
        DirectoryError::Unavailable(reason) => SchedulerError::Directory(reason),
    }
}

async fn run_refresh_loop<S, M, D>(
    pipeline: Arc<RecomputePipeline<S, M, D>>,
    directory: Arc<D>,
    contest_id: ContestId,
    config: RefreshConfig,
    mut trigger: mpsc::Receiver<()>,
    mut shutdown: mpsc::Receiver<()>,
) where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let mut interval = tokio::time::interval(config.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut pulse = config.pulse_interval.map(|period| {
        let mut pulse = tokio::time::interval(period);
        pulse.set_missed_tick_behavior(MissedTickBehavior::Skip);
        pulse
    });

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!(contest = %contest_id, "refresh loop stopping");
                break;
            }
            _ = interval.tick() => {
                if !run_cycle_once(&pipeline, &contest_id).await {
                    break;
                }
                if !still_live(directory.as_ref(), &contest_id).await {
                    info!(contest = %contest_id, "contest left the live window; refresh loop ending");
                    break;
                }
            }
            Some(()) = trigger.recv() => {
                if !run_cycle_once(&pipeline, &contest_id).await {
                    break;
                }
            }
            Some(_) = tick_pulse(&mut pulse) => {
                if let Err(err) = pipeline.growth_pulse(&contest_id).await {
                    debug!(contest = %contest_id, error = %err, "growth pulse skipped");
                }
            }
        }
    }
}

/// One full cycle; `false` means the loop should end.
async fn run_cycle_once<S, M, D>(
    pipeline: &RecomputePipeline<S, M, D>,
    contest_id: &ContestId,
) -> bool
where
    S: SubmissionStore,
    M: MetricsSource,
    D: ContestDirectory,
{
    match pipeline.run_cycle(contest_id).await {
        Ok(_) => true,
        Err(RefreshError::UnknownContest) => {
            warn!(contest = %contest_id, "contest vanished; stopping refresh loop");
            false
        }
        // Recorded and broadcast by the pipeline; the cadence continues.
        Err(_) => true,
    }
}

async fn still_live<D: ContestDirectory>(directory: &D, contest_id: &ContestId) -> bool {
    match directory.contest(contest_id).await {
        Ok(contest) => contest.is_live(),
        Err(DirectoryError::UnknownContest) => false,
        // Transient lookup trouble never kills a running loop.
        Err(DirectoryError::Unavailable(_)) => true,
    }
}

async fn tick_pulse(pulse: &mut Option<Interval>) -> Option<tokio::time::Instant> {
    match pulse {
        Some(interval) => Some(interval.tick().await),
        None => std::future::pending().await,
    }
}
