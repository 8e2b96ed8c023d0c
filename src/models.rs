// src/models.rs
//! Wire types returned by the digest backend. Every collection is replaced
//! wholesale on a successful fetch, so nothing here carries merge logic.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_attribution: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

fn default_language() -> String {
    "en".to_string()
}
fn default_region() -> String {
    "global".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveStream {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub embed_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub viewers_count: Option<u64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub is_live: bool,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub change_24h: f64,
    pub change_percentage_24h: f64,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

impl Ticker {
    pub fn is_up(&self) -> bool {
        self.change_percentage_24h >= 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub stocks: Vec<Ticker>,
    #[serde(default)]
    pub cryptos: Vec<Ticker>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty() && self.cryptos.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeoStats {
    pub total_articles: u64,
    pub articles_today: u64,
    #[serde(default)]
    pub finance_articles: u64,
    #[serde(default)]
    pub crypto_articles: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminStats {
    #[serde(default)]
    pub total_articles: u64,
    #[serde(default)]
    pub total_sources: u64,
    #[serde(default)]
    pub active_sources: u64,
    #[serde(default)]
    pub recent_articles: Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_scraped: Option<DateTime<Utc>>,
}

/// Acknowledgement for `POST /api/admin/generate-now`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateAck {
    #[serde(default)]
    pub message: String,
}

// --- auxiliary feeds ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendingTopic {
    pub topic: String,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketAlert {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingList {
    #[serde(default)]
    pub finance: Vec<String>,
    #[serde(default)]
    pub crypto: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstitutionalHolding {
    pub institution: String,
    pub asset: String,
    pub amount: f64,
    pub change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyUpdate {
    pub id: String,
    pub title: String,
    pub country: String,
    pub impact: String,
    pub date: NaiveDate,
    pub status: String,
}

/// US equities session in UTC, simplified to whole hours (14:00..21:00).
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    (14..21).contains(&now.hour())
}
