//! Timer schedules.
//!
//! Only two literal six-field cron expressions are recognised; anything
//! else is reported at registration and never scheduled. A job first
//! fires one period after it is added and is rescheduled one period after
//! each run starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::function::Function;
use crate::invoke::{TimerRequest, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// `0 */5 * * * *`
    EveryFiveMinutes,
    /// `*/5 * * * * *`
    EveryFiveSeconds,
}

impl Schedule {
    pub fn parse(expression: &str) -> Option<Self> {
        match expression.trim() {
            "0 */5 * * * *" => Some(Self::EveryFiveMinutes),
            "*/5 * * * * *" => Some(Self::EveryFiveSeconds),
            _ => None,
        }
    }

    pub fn period(self) -> Duration {
        match self {
            Self::EveryFiveMinutes => Duration::from_secs(5 * 60),
            Self::EveryFiveSeconds => Duration::from_secs(5),
        }
    }
}

struct TimerJob {
    function: Arc<Function>,
    schedule: Schedule,
    next_due: Instant,
}

#[derive(Default)]
pub struct TimerScheduler {
    jobs: Vec<TimerJob>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: Arc<Function>, schedule: Schedule) {
        self.add_at(function, schedule, Instant::now());
    }

    /// Add a job whose first run is one period after `now`.
    pub fn add_at(&mut self, function: Arc<Function>, schedule: Schedule, now: Instant) {
        self.jobs.push(TimerJob {
            function,
            schedule,
            next_due: now + schedule.period(),
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Earliest pending run, if any job is scheduled.
    pub fn next_due(&self) -> Option<Instant> {
        self.jobs.iter().map(|job| job.next_due).min()
    }

    pub async fn run_pending(&mut self) -> usize {
        self.run_pending_at(Instant::now()).await
    }

    /// Run every job due at `now`, one after another, and return how many
    /// ran. Each run is its own task, so a failing or panicking handler is
    /// logged and the schedule carries on.
    pub async fn run_pending_at(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for job in self.jobs.iter_mut().filter(|job| job.next_due <= now) {
            let period = job.schedule.period();
            let past_due = now.duration_since(job.next_due) >= period;
            job.next_due = now + period;
            ran += 1;

            let function = job.function.clone();
            debug!(function = function.name(), past_due, "timer fired");
            let invocation = tokio::spawn({
                let function = function.clone();
                async move { function.invoke(Trigger::Timer(TimerRequest::new(past_due))).await }
            });
            match invocation.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(function = function.name(), error = %e, "timer function failed"),
                Err(e) => error!(function = function.name(), error = %e, "timer function panicked"),
            }
        }
        ran
    }

    /// Check for due jobs every `tick` until shutdown. A tick never starts
    /// before the previous one's jobs have finished.
    pub async fn run(mut self, tick: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(jobs = self.jobs.len(), tick_ms = tick.as_millis() as u64, "timer loop started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(tick) => {
                    self.run_pending().await;
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("timer loop stopped");
    }
}
