// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::RefreshCfg;
use crate::ops::{Operation, TaskRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    timers: Vec<(Operation, Duration)>,
}

impl RefreshPlan {
    pub fn new(timers: Vec<(Operation, Duration)>) -> Self {
        Self { timers }
    }

    /// Market snapshot, trending topics, alerts and the keep-alive ping.
    pub fn standard(cfg: &RefreshCfg) -> Self {
        Self::new(vec![
            (Operation::MarketData, Duration::from_secs(cfg.market_secs)),
            (Operation::TrendingTopics, Duration::from_secs(cfg.topics_secs)),
            (Operation::MarketAlerts, Duration::from_secs(cfg.alerts_secs)),
            (Operation::KeepAlive, Duration::from_secs(cfg.keep_alive_secs)),
        ])
    }

    pub fn timers(&self) -> &[(Operation, Duration)] {
        &self.timers
    }
}

/// Spawn one recurring timer per plan entry. The first tick of each timer is
/// one full period after start. Each tick spawns its own invocation and does
/// not wait for earlier ones, so overlapping requests for the same task are
/// possible and the last response wins.
pub fn spawn_refresh(runner: Arc<dyn TaskRunner>, plan: &RefreshPlan) -> RefreshHandle {
    let start = Instant::now();
    let timers = plan
        .timers()
        .iter()
        .filter(|(_, period)| !period.is_zero())
        .map(|&(op, period)| {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                let mut ticker = interval_at(start + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    counter!("refresh_ticks_total", "task" => op.name()).increment(1);
                    debug!(target: "scheduler", op = op.name(), "refresh tick");
                    let runner = Arc::clone(&runner);
                    tokio::spawn(async move { runner.run(op).await });
                }
            })
        })
        .collect::<Vec<_>>();

    info!(target: "scheduler", timers = timers.len(), "refresh timers started");
    RefreshHandle { timers }
}

/// Owns every timer of one scheduler. Shutting down (or dropping) stops all
/// of them together; invocations already in flight run to completion.
pub struct RefreshHandle {
    timers: Vec<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn active(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }

    pub fn shutdown(&mut self) {
        if self.timers.is_empty() {
            return;
        }
        for t in self.timers.drain(..) {
            t.abort();
        }
        info!(target: "scheduler", "refresh timers stopped");
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_periods() {
        let plan = RefreshPlan::standard(&RefreshCfg::default());
        let secs: Vec<_> = plan.timers().iter().map(|(op, d)| (*op, d.as_secs())).collect();
        assert_eq!(
            secs,
            vec![
                (Operation::MarketData, 60),
                (Operation::TrendingTopics, 600),
                (Operation::MarketAlerts, 120),
                (Operation::KeepAlive, 300),
            ]
        );
    }
}
