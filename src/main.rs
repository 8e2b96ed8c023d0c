//! CryptoAI Digest dashboard client: headless runtime entrypoint.
//! Wires config, logging, session, the staggered loader and the refresh
//! timers, then logs a one-line state summary on every state change.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use digest_dashboard::config;
use digest_dashboard::i18n::LanguagePreference;
use digest_dashboard::logging::init_tracing;
use digest_dashboard::metrics::Metrics;
use digest_dashboard::models::is_market_open;
use digest_dashboard::orchestrator::{Orchestrator, StartupPlan};
use digest_dashboard::scheduler::{spawn_refresh, RefreshPlan};
use digest_dashboard::storage::{FileStore, KeyValueStore};
use digest_dashboard::trigger::ViewTrigger;
use digest_dashboard::{Dashboard, SessionState, Snapshot, TaskRunner};

fn summary(s: &Snapshot, market_open: bool) -> String {
    format!(
        "articles={} stocks={} cryptos={} streams={} topics={} alerts={} holdings={} policies={} seo_total={} market={}",
        s.articles.len(),
        s.market.stocks.len(),
        s.market.cryptos.len(),
        s.live_streams.len(),
        s.trending_topics.len(),
        s.market_alerts.len(),
        s.institutional_holdings.len(),
        s.policy_updates.len(),
        s.seo_stats.total_articles,
        if market_open { "open" } else { "closed" },
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = config::load_default()?;
    init_tracing(cfg.log_json);
    info!(backend = %cfg.backend_url, storage = %cfg.storage_path.display(), "starting dashboard client");

    let metrics = match cfg.metrics_addr.as_deref() {
        Some(addr) => {
            let m = Metrics::init()?;
            m.serve(addr).await?;
            Some(m)
        }
        None => None,
    };

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&cfg.storage_path));
    let language = LanguagePreference::load(storage.clone());
    let dashboard = Arc::new(Dashboard::with_storage(&cfg, storage)?);
    let session_state = dashboard.session().restore();
    info!(session = ?session_state, lang = language.current().code(), "client state restored");

    let runner: Arc<dyn TaskRunner> = dashboard.clone();
    let mut refresh = spawn_refresh(runner.clone(), &RefreshPlan::standard(&cfg.refresh));
    let startup = Orchestrator::new(runner, StartupPlan::standard(&cfg.startup))
        .start()
        .await;
    info!(pending = startup.pending(), "secondary loads scheduled");
    drop(startup);

    let mut view = ViewTrigger::new(dashboard.clone());
    view.mount().await;

    let mut revisions = dashboard.state().subscribe();
    let mut sessions = dashboard.session().subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = dashboard.state().snapshot();
                info!(
                    target: "render",
                    view = %view.view(),
                    title = language.t("title"),
                    "{}",
                    summary(&snap, is_market_open(chrono::Utc::now()))
                );
            }
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
                if *sessions.borrow_and_update() == SessionState::Anonymous {
                    view.sync_session().await;
                }
            }
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!(error = %e, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    refresh.shutdown();
    drop(metrics);
    info!("dashboard client stopped");
    Ok(())
}
