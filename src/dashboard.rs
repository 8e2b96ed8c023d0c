// src/dashboard.rs
//! The dashboard runtime: resilient client + feeds + state container. Every
//! fetch writes its collection wholesale; on exhaustion it writes the empty
//! default instead, so the renderer never waits on a failed call.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, FeedMode};
use crate::feeds::{CuratedFeeds, FeedProvider, RemoteFeeds};
use crate::fetch::{
    ApiClient, FetchError, FetchParams, ADMIN_STATS, ARTICLES, GENERATE_NOW, KEEP_ALIVE,
    LIVE_STREAMS, MARKET_DATA, NEWS_SOURCES, SEO_STATS,
};
use crate::models::{AdminStats, Article, GenerateAck, LiveStream, MarketSnapshot, NewsSource, SeoStats};
use crate::ops::{Operation, TaskRunner};
use crate::session::{AuthError, Credentials, SessionStore};
use crate::state::{Loading, StateStore};
use crate::storage::KeyValueStore;

/// Delay between `generate-now` and the admin-stats refresh that follows it.
pub const GENERATION_REFRESH_DELAY: Duration = Duration::from_secs(2);

pub struct Dashboard {
    client: Arc<ApiClient>,
    feeds: Arc<dyn FeedProvider>,
    state: Arc<StateStore>,
    articles_page: u32,
}

impl Dashboard {
    pub fn new(client: Arc<ApiClient>, feeds: Arc<dyn FeedProvider>, articles_page: u32) -> Self {
        Self {
            client,
            feeds,
            state: Arc::new(StateStore::new()),
            articles_page,
        }
    }

    /// Production wiring: reqwest transports over the given client storage.
    pub fn with_storage(cfg: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = Arc::new(SessionStore::new(storage));
        let client = Arc::new(ApiClient::from_backend(
            &cfg.backend_url,
            session,
            cfg.request_timeout(),
        )?);
        let feeds: Arc<dyn FeedProvider> = match cfg.feeds {
            FeedMode::Curated => Arc::new(CuratedFeeds),
            FeedMode::Remote => Arc::new(RemoteFeeds::new(client.clone())),
        };
        info!(backend = %client.base(), feeds = feeds.name(), "dashboard wired");
        Ok(Self::new(client, feeds, cfg.pages.articles))
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.client.session()
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    // --- core collections ---

    pub async fn fetch_market_data(&self) -> Result<(), FetchError> {
        self.state.begin_loading(Loading::Market);
        let res = self
            .client
            .fetch::<MarketSnapshot>(&MARKET_DATA, &FetchParams::none())
            .await;
        let out = self.settle(res, Operation::MarketData, |st, v| st.replace_market(v));
        self.state.end_loading(Loading::Market);
        out
    }

    pub async fn fetch_articles(&self, category: &str) -> Result<(), FetchError> {
        self.state.begin_loading(Loading::Articles);
        let params = FetchParams::none()
            .category(category)
            .limit(self.articles_page);
        let res = self.client.fetch::<Vec<Article>>(&ARTICLES, &params).await;
        let out = self.settle(res, Operation::Articles, |st, v| st.replace_articles(v));
        self.state.end_loading(Loading::Articles);
        out
    }

    pub async fn fetch_live_streams(&self, category: &str) -> Result<(), FetchError> {
        self.state.begin_loading(Loading::LiveStreams);
        let params = FetchParams::none().category(category);
        let res = self
            .client
            .fetch::<Vec<LiveStream>>(&LIVE_STREAMS, &params)
            .await;
        let out = self.settle(res, Operation::LiveStreams, |st, v| {
            st.replace_live_streams(v)
        });
        self.state.end_loading(Loading::LiveStreams);
        out
    }

    pub async fn fetch_seo_stats(&self) -> Result<(), FetchError> {
        let res = self
            .client
            .fetch::<SeoStats>(&SEO_STATS, &FetchParams::none())
            .await;
        self.settle(res, Operation::SeoStats, |st, v| st.replace_seo_stats(v))
    }

    pub async fn fetch_admin_stats(&self) -> Result<(), FetchError> {
        let res = self
            .client
            .fetch::<AdminStats>(&ADMIN_STATS, &FetchParams::none())
            .await;
        self.settle(res, Operation::AdminStats, |st, v| st.replace_admin_stats(v))
    }

    pub async fn fetch_news_sources(&self) -> Result<(), FetchError> {
        let res = self
            .client
            .fetch::<Vec<NewsSource>>(&NEWS_SOURCES, &FetchParams::none())
            .await;
        self.settle(res, Operation::NewsSources, |st, v| {
            st.replace_news_sources(v)
        })
    }

    /// Keep-alive: the response body is ignored and nothing is written.
    pub async fn keep_alive(&self) -> Result<(), FetchError> {
        match self.client.ping(&KEEP_ALIVE).await {
            Ok(()) => {
                debug!(target: "fetch", "keep-alive ping sent");
                Ok(())
            }
            Err(e) => {
                debug!(target: "fetch", error = %e, "keep-alive ping failed");
                Err(e)
            }
        }
    }

    // --- auxiliary feeds ---

    async fn refresh_feed(&self, op: Operation) -> Result<(), FetchError> {
        let f = &self.feeds;
        match op {
            Operation::TrendingTopics => {
                let res = f.trending_topics().await;
                self.settle(res, op, |st, v| st.replace_trending_topics(v))
            }
            Operation::MarketAlerts => {
                let res = f.market_alerts().await;
                self.settle(res, op, |st, v| st.replace_market_alerts(v))
            }
            Operation::ReadingList => {
                let res = f.reading_list().await;
                self.settle(res, op, |st, v| st.replace_reading_list(v))
            }
            Operation::InstitutionalHoldings => {
                let res = f.institutional_holdings().await;
                self.settle(res, op, |st, v| st.replace_institutional_holdings(v))
            }
            Operation::PolicyUpdates => {
                let res = f.policy_updates().await;
                self.settle(res, op, |st, v| st.replace_policy_updates(v))
            }
            other => {
                warn!(op = other.name(), "not an auxiliary feed");
                Ok(())
            }
        }
    }

    // --- session & admin actions ---

    pub async fn login(&self, creds: &Credentials) -> Result<(), AuthError> {
        self.client.login(creds).await
    }

    pub fn logout(&self) {
        self.session().logout();
        self.state.clear_admin();
    }

    /// Kicks off article generation, then refreshes admin stats after
    /// [`GENERATION_REFRESH_DELAY`] on a detached task.
    pub async fn trigger_generation(self: &Arc<Self>) -> Result<GenerateAck, FetchError> {
        let ack: GenerateAck = match self
            .client
            .send_json(&GENERATE_NOW, serde_json::json!({}))
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                if e.is_auth_denied() {
                    self.state.clear_admin();
                }
                warn!(error = %e, "article generation failed");
                return Err(e);
            }
        };
        info!(message = %ack.message, "article generation triggered");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(GENERATION_REFRESH_DELAY).await;
            let _ = this.fetch_admin_stats().await;
        });
        Ok(ack)
    }

    /// Writes the fetched value, or the empty default when every attempt
    /// failed. Authorization denials keep their payload untouched but drop
    /// admin-only state.
    fn settle<T: Default>(
        &self,
        res: Result<T, FetchError>,
        op: Operation,
        apply: impl FnOnce(&StateStore, T),
    ) -> Result<(), FetchError> {
        match res {
            Ok(v) => {
                apply(&self.state, v);
                Ok(())
            }
            Err(e) if e.is_auth_denied() => {
                warn!(op = op.name(), "authorization denied");
                self.state.clear_admin();
                Err(e)
            }
            Err(e) => {
                warn!(op = op.name(), error = %e, "fetch failed, showing empty state");
                apply(&self.state, T::default());
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TaskRunner for Dashboard {
    async fn run(&self, op: Operation) {
        let _ = match op {
            Operation::MarketData => self.fetch_market_data().await,
            Operation::Articles => self.fetch_articles(crate::fetch::ALL_CATEGORIES).await,
            Operation::LiveStreams => {
                self.fetch_live_streams(crate::fetch::ALL_CATEGORIES).await
            }
            Operation::SeoStats => self.fetch_seo_stats().await,
            Operation::AdminStats => self.fetch_admin_stats().await,
            Operation::NewsSources => self.fetch_news_sources().await,
            Operation::KeepAlive => self.keep_alive().await,
            feed => self.refresh_feed(feed).await,
        };
    }
}
