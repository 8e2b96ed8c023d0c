// src/orchestrator.rs
//! Staggered startup loader.
//!
//! The plan is an explicit task list: critical tasks run in declaration order
//! and are awaited one after another; secondary tasks each sleep until
//! `origin + delay` on their own task, so a slow or failing one never holds
//! up its neighbours or the critical tier.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::StartupCfg;
use crate::ops::{Operation, TaskRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Critical,
    Secondary { delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTask {
    pub op: Operation,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPlan {
    tasks: Vec<PlannedTask>,
}

impl StartupPlan {
    pub fn new(tasks: Vec<PlannedTask>) -> Self {
        Self { tasks }
    }

    /// Market snapshot then articles; then the auxiliary feeds and live
    /// streams at increasing delays.
    pub fn standard(cfg: &StartupCfg) -> Self {
        let critical = |op| PlannedTask {
            op,
            tier: Tier::Critical,
        };
        let after = |op, ms| PlannedTask {
            op,
            tier: Tier::Secondary {
                delay: Duration::from_millis(ms),
            },
        };
        Self::new(vec![
            critical(Operation::MarketData),
            critical(Operation::Articles),
            after(Operation::TrendingTopics, cfg.trending_ms),
            after(Operation::MarketAlerts, cfg.alerts_ms),
            after(Operation::ReadingList, cfg.reading_list_ms),
            after(Operation::InstitutionalHoldings, cfg.institutional_ms),
            after(Operation::PolicyUpdates, cfg.policy_ms),
            after(Operation::LiveStreams, cfg.live_streams_ms),
        ])
    }

    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn critical(&self) -> impl Iterator<Item = Operation> + '_ {
        self.tasks
            .iter()
            .filter(|t| t.tier == Tier::Critical)
            .map(|t| t.op)
    }

    pub fn secondary(&self) -> impl Iterator<Item = (Operation, Duration)> + '_ {
        self.tasks.iter().filter_map(|t| match t.tier {
            Tier::Secondary { delay } => Some((t.op, delay)),
            Tier::Critical => None,
        })
    }
}

pub struct Orchestrator {
    runner: Arc<dyn TaskRunner>,
    plan: StartupPlan,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn TaskRunner>, plan: StartupPlan) -> Self {
        Self { runner, plan }
    }

    /// Schedules the secondary tier, then runs the critical tier to
    /// completion. Returns once the critical tier is done; secondary tasks
    /// keep running behind the returned handle.
    pub async fn start(&self) -> StartupHandle {
        let origin = Instant::now();
        let mut pending = JoinSet::new();

        for (op, delay) in self.plan.secondary() {
            let runner = Arc::clone(&self.runner);
            pending.spawn(async move {
                sleep_until(origin + delay).await;
                debug!(target: "startup", op = op.name(), delay_ms = delay.as_millis() as u64, "secondary task due");
                runner.run(op).await;
                op
            });
        }

        for op in self.plan.critical() {
            debug!(target: "startup", op = op.name(), "critical task");
            self.runner.run(op).await;
        }
        info!(
            target: "startup",
            elapsed_ms = origin.elapsed().as_millis() as u64,
            secondary = pending.len(),
            "critical tier loaded"
        );

        StartupHandle { pending }
    }
}

/// Outstanding secondary tasks. Dropping the handle detaches them; they are
/// never aborted.
pub struct StartupHandle {
    pending: JoinSet<Operation>,
}

impl StartupHandle {
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Waits for every secondary task; returns them in completion order.
    pub async fn join(mut self) -> Vec<Operation> {
        let mut done = Vec::with_capacity(self.pending.len());
        while let Some(res) = self.pending.join_next().await {
            match res {
                Ok(op) => done.push(op),
                Err(e) => warn!(target: "startup", error = %e, "secondary task did not finish"),
            }
        }
        done
    }
}

impl Drop for StartupHandle {
    fn drop(&mut self) {
        self.pending.detach_all();
    }
}
