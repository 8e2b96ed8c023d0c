// src/bin/admin_probe.rs
// Logs in with DIGEST_ADMIN_USER / DIGEST_ADMIN_PASSWORD against the configured
// backend and prints the admin statistics and news sources. The session lives
// in memory only; nothing is written to the client storage file.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use digest_dashboard::config;
use digest_dashboard::logging::init_tracing;
use digest_dashboard::storage::MemoryStore;
use digest_dashboard::{Credentials, Dashboard};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cfg = config::load_default()?;
    init_tracing(cfg.log_json);

    let user = std::env::var("DIGEST_ADMIN_USER").context("DIGEST_ADMIN_USER not set")?;
    let password =
        std::env::var("DIGEST_ADMIN_PASSWORD").context("DIGEST_ADMIN_PASSWORD not set")?;

    let dashboard = Dashboard::with_storage(&cfg, Arc::new(MemoryStore::new()))?;
    dashboard
        .login(&Credentials::new(user, password))
        .await
        .context("admin login failed")?;
    info!(backend = %dashboard.client().base(), "logged in");

    if let Err(e) = dashboard.fetch_admin_stats().await {
        warn!(error = %e, "admin stats unavailable");
    }
    if let Err(e) = dashboard.fetch_news_sources().await {
        warn!(error = %e, "news sources unavailable");
    }

    let snap = dashboard.state().snapshot();
    println!(
        "total_articles={} total_sources={} active_sources={} recent={}",
        snap.admin_stats.total_articles,
        snap.admin_stats.total_sources,
        snap.admin_stats.active_sources,
        snap.admin_stats.recent_articles.len()
    );
    for s in &snap.news_sources {
        println!(
            "{}\t{}\t{}\t{}",
            if s.is_active { "active" } else { "paused" },
            s.category,
            s.name,
            s.url
        );
    }

    dashboard.logout();
    Ok(())
}
