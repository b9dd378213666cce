//! Periodic background jobs: invitation expiry and debtor reminders.
//!
//! Each job runs in its own loop, the first time one full period after
//! start. Ticks missed while a run is still going are skipped, not queued.
//! The expiry run is bounded by a timeout; the reminder batch bounds itself
//! and logs how many sends it abandoned. [`Scheduler::shutdown`] cancels both
//! loops and waits up to a grace period; a reminder batch still fanning out
//! after that is aborted without a report and some of its messages may not
//! go out.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    task::JoinSet,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::Engine;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub expire_every: Duration,
    pub expire_timeout: Duration,
    pub remind_every: Duration,
    pub remind_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expire_every: Duration::from_secs(6 * 60 * 60),
            expire_timeout: Duration::from_secs(10),
            remind_every: Duration::from_secs(24 * 60 * 60),
            remind_timeout: Duration::from_secs(45),
        }
    }
}

impl SchedulerConfig {
    pub fn with_expire_every(mut self, every: Duration) -> Self {
        self.expire_every = every;
        self
    }

    pub fn with_remind_every(mut self, every: Duration) -> Self {
        self.remind_every = every;
        self
    }
}

/// Handle to the running job loops.
#[derive(Debug)]
pub struct Scheduler {
    token: CancellationToken,
    loops: JoinSet<()>,
}

impl Scheduler {
    /// Spawn both loops on the current runtime.
    pub fn start(engine: Arc<Engine>, config: SchedulerConfig) -> Self {
        let token = CancellationToken::new();
        let mut loops = JoinSet::new();

        let expiry_engine = Arc::clone(&engine);
        loops.spawn(run_every(
            "invitation-expiry",
            config.expire_every,
            Some(config.expire_timeout),
            token.clone(),
            move || {
                let engine = Arc::clone(&expiry_engine);
                async move {
                    match engine.expire_invitations(engine.now()).await {
                        Ok(0) => tracing::debug!("no invitations to expire"),
                        Ok(count) => tracing::info!(count, "invitations expired"),
                        Err(err) => tracing::error!("invitation expiry failed: {err}"),
                    }
                }
            },
        ));

        let reminder_engine = engine;
        let remind_timeout = config.remind_timeout;
        loops.spawn(run_every(
            "debtor-reminders",
            config.remind_every,
            None,
            token.clone(),
            move || {
                let engine = Arc::clone(&reminder_engine);
                async move {
                    if let Err(err) = engine.send_debtor_reminders_within(remind_timeout).await {
                        tracing::error!("debtor reminders failed: {err}");
                    }
                }
            },
        ));

        tracing::info!(
            expire_every_secs = config.expire_every.as_secs(),
            remind_every_secs = config.remind_every.as_secs(),
            "scheduler started"
        );
        Self { token, loops }
    }

    /// A token that stops the loops when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the loops and wait up to `grace` for them to finish.
    pub async fn shutdown(mut self, grace: Duration) {
        self.token.cancel();
        let drained = tokio::time::timeout(grace, async {
            while self.loops.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!("scheduler jobs still running after grace period, aborting");
            self.loops.shutdown().await;
        }
        tracing::info!("scheduler stopped");
    }
}

async fn run_every<F, Fut>(
    name: &'static str,
    period: Duration,
    timeout: Option<Duration>,
    token: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(job = name, "received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                tracing::debug!(job = name, "running");
                match timeout {
                    Some(timeout) => {
                        if tokio::time::timeout(timeout, job()).await.is_err() {
                            tracing::warn!(job = name, timeout_secs = timeout.as_secs(), "job timed out");
                        }
                    }
                    None => job().await,
                }
            }
        }
    }
}
