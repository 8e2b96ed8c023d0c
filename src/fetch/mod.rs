// src/fetch/mod.rs
pub mod client;
pub mod transport;

use reqwest::Method;
use thiserror::Error;

pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, FallbackTransport, PrimaryTransport, Transport, TransportError};

/// One unit of remote data acquisition. Defined once, never mutated.
///
/// Scheduling is declared beside the task rather than on it: the startup
/// tier and delay of each task live in
/// [`StartupPlan::standard`](crate::orchestrator::StartupPlan::standard), and
/// refresh periods in
/// [`RefreshPlan::standard`](crate::scheduler::RefreshPlan::standard), both
/// keyed by [`Operation`](crate::ops::Operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTask {
    pub name: &'static str,
    /// Path relative to the API base (`<backend>/api/`); empty for the root.
    pub endpoint: &'static str,
    pub method: MethodKind,
    pub requires_auth: bool,
    /// Whether a failed primary attempt may be replayed on the fallback transport.
    pub fallback: bool,
    /// Page size the fallback attempt uses instead of the caller's `limit`.
    pub fallback_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Get,
    Post,
}

impl MethodKind {
    pub fn as_method(self) -> Method {
        match self {
            MethodKind::Get => Method::GET,
            MethodKind::Post => Method::POST,
        }
    }
}

const fn get(name: &'static str, endpoint: &'static str) -> FetchTask {
    FetchTask {
        name,
        endpoint,
        method: MethodKind::Get,
        requires_auth: false,
        fallback: true,
        fallback_limit: None,
    }
}

const fn authed(task: FetchTask) -> FetchTask {
    FetchTask {
        requires_auth: true,
        ..task
    }
}

pub const ARTICLES: FetchTask = FetchTask {
    fallback_limit: Some(10),
    ..get("articles", "articles")
};
pub const MARKET_DATA: FetchTask = get("market_data", "market-data");
pub const LIVE_STREAMS: FetchTask = get("live_streams", "live-streams");
pub const SEO_STATS: FetchTask = get("seo_stats", "seo-stats");
pub const KEEP_ALIVE: FetchTask = get("keep_alive", "");
pub const ADMIN_STATS: FetchTask = authed(get("admin_stats", "admin/stats"));
pub const NEWS_SOURCES: FetchTask = authed(get("news_sources", "news-sources"));
pub const GENERATE_NOW: FetchTask = FetchTask {
    method: MethodKind::Post,
    fallback: false,
    ..authed(get("generate_now", "admin/generate-now"))
};
pub const TRENDING_TOPICS: FetchTask = get("trending_topics", "trending-topics");
pub const MARKET_ALERTS: FetchTask = get("market_alerts", "market-alerts");
pub const READING_LIST: FetchTask = get("reading_list", "reading-list");
pub const INSTITUTIONAL_HOLDINGS: FetchTask =
    get("institutional_holdings", "institutional-holdings");
pub const POLICY_UPDATES: FetchTask = get("policy_updates", "policy-updates");

/// Login is not a fetch task: it is posted once on the primary transport.
pub const LOGIN_ENDPOINT: &str = "admin/login";

/// The category value that means "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Query parameters of a single fetch. `all` categories are never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl FetchParams {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        let c = category.trim();
        self.category = if c.is_empty() || c.eq_ignore_ascii_case(ALL_CATEGORIES) {
            None
        } else {
            Some(c.to_string())
        };
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reduced parameter set for the fallback attempt: same filter, and the
    /// task's smaller page size when it declares one.
    pub fn for_fallback(&self, task: &FetchTask) -> Self {
        let mut out = self.clone();
        if let Some(l) = task.fallback_limit {
            out.limit = Some(l);
        }
        out
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(c) = &self.category {
            q.push(("category", c.clone()));
        }
        if let Some(l) = self.limit {
            q.push(("limit", l.to_string()));
        }
        q
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("authorization denied (status {status})")]
    Unauthorized { status: u16 },
    #[error("request rejected with status {status}")]
    Validation { status: u16, body: String },
    #[error("server error (status {status})")]
    Server { status: u16 },
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Failures that justify one attempt on the fallback transport.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Server { .. } | FetchError::Decode(_)
        )
    }

    pub fn is_auth_denied(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }
}
