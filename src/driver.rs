use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::MonitoringManager;

/// Periodic refresh of every unit of a manager.
///
/// Units are `!Send`, so [`run`](Self::run) is meant to be awaited on a
/// current-thread runtime or inside a `LocalSet`. Missed ticks are skipped
/// rather than replayed.
#[derive(Debug, Clone)]
pub struct RefreshDriver {
    period: Duration,
    cancel_token: Arc<CancellationToken>,
}

impl RefreshDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            cancel_token: Arc::new(CancellationToken::new()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancel_token(&self) -> Arc<CancellationToken> {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Refresh on every tick until cancelled. The first tick fires
    /// immediately. Returns the number of ticks run.
    pub async fn run(&self, manager: &MonitoringManager) -> u64 {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let token = self.cancel_token.clone();
        let mut ticks = 0;
        loop {
            select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let refreshed = manager.refresh_all();
                    ticks += 1;
                    tracing::trace!(ticks, refreshed, "refresh tick");
                }
            }
        }
        tracing::debug!(ticks, "refresh driver stopped");
        ticks
    }
}
