use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(10);

/// A tick emitted by the queue refresh timer, stamped with the generation of
/// the timer that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTimerTick {
    pub generation: u64,
}

/// Owns the single periodic queue refresh timer.
///
/// `start` always cancels the running timer before arming a new one, and
/// `stop` bumps the generation so ticks already queued by a cancelled timer
/// fail [`RefreshScheduler::is_current`].
#[derive(Debug)]
pub struct RefreshScheduler {
    period: Duration,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            generation: 0,
            ticker: None,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Arms a timer whose first tick fires one full period from now.
    pub fn start<M>(&mut self, sink: mpsc::UnboundedSender<M>)
    where
        M: From<QueueTimerTick> + Send + 'static,
    {
        self.stop();
        let generation = self.generation;
        let period = self.period;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sink.send(M::from(QueueTimerTick { generation })).is_err() {
                    break;
                }
            }
        }));
        debug!(
            generation,
            period_ms = period.as_millis() as u64,
            "queue refresh timer armed"
        );
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            debug!(generation = self.generation, "queue refresh timer cancelled");
        }
        self.generation = self.generation.wrapping_add(1);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }

    #[must_use]
    pub fn is_current(&self, tick: QueueTimerTick) -> bool {
        self.is_running() && tick.generation == self.generation
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
