// tests/scheduler_periods.rs
mod common;

use std::time::Duration;

use common::Recorder;
use digest_dashboard::config::RefreshCfg;
use digest_dashboard::scheduler::{spawn_refresh, RefreshPlan};
use digest_dashboard::Operation;
use tokio::time::sleep;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn timers_fire_on_their_own_periods_until_shutdown() {
    let rec = Recorder::new();
    let mut handle = spawn_refresh(rec.clone(), &RefreshPlan::standard(&RefreshCfg::default()));
    assert_eq!(handle.active(), 4);

    // Nothing fires at mount; the first tick is one period in.
    sleep(secs(59)).await;
    assert!(rec.started().is_empty());

    sleep(secs(242)).await; // t = 301s
    assert_eq!(rec.starts_of(Operation::MarketData), 5);
    assert_eq!(rec.starts_of(Operation::MarketAlerts), 2);
    assert_eq!(rec.starts_of(Operation::KeepAlive), 1);
    assert_eq!(rec.starts_of(Operation::TrendingTopics), 0);

    sleep(secs(300)).await; // t = 601s
    assert_eq!(rec.starts_of(Operation::MarketData), 10);
    assert_eq!(rec.starts_of(Operation::TrendingTopics), 1);

    handle.shutdown();
    let before = rec.started().len();
    sleep(secs(3600)).await;
    assert_eq!(rec.started().len(), before);
    assert_eq!(handle.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_invocations_overlap_instead_of_delaying_the_timer() {
    // Each market fetch takes 150s, far longer than its 60s period.
    let rec = Recorder::with_latency(&[(Operation::MarketData, secs(150))]);
    let plan = RefreshPlan::new(vec![(Operation::MarketData, secs(60))]);
    let _handle = spawn_refresh(rec.clone(), &plan);

    sleep(secs(181)).await;
    let starts: Vec<Duration> = rec.started().iter().map(|(_, at)| *at).collect();
    assert_eq!(starts.len(), 3);
    assert!(starts[2] < secs(181) && starts[2] >= secs(180));
    // The first run (started at 60s) ends at 210s.
    assert!(rec.finished().is_empty());
    sleep(secs(30)).await;
    assert_eq!(rec.finished().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_does_not_abort_in_flight_runs() {
    let rec = Recorder::with_latency(&[(Operation::KeepAlive, secs(30))]);
    let plan = RefreshPlan::new(vec![(Operation::KeepAlive, secs(300))]);
    let handle = spawn_refresh(rec.clone(), &plan);

    sleep(secs(301)).await;
    assert_eq!(rec.starts_of(Operation::KeepAlive), 1);
    drop(handle);

    sleep(secs(600)).await;
    assert_eq!(rec.finished(), vec![Operation::KeepAlive]);
    assert_eq!(rec.starts_of(Operation::KeepAlive), 1);
}
