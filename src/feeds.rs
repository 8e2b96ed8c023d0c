// src/feeds.rs
//! Auxiliary feeds: trending topics, alerts, reading list, institutional
//! holdings, policy updates. No cross-entity relationships; each one is
//! fetched and replaced independently.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use crate::fetch::{
    ApiClient, FetchError, FetchParams, INSTITUTIONAL_HOLDINGS, MARKET_ALERTS, POLICY_UPDATES,
    READING_LIST, TRENDING_TOPICS,
};
use crate::models::{
    AlertSeverity, InstitutionalHolding, MarketAlert, PolicyUpdate, ReadingList, TrendingTopic,
};

#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, FetchError>;
    async fn market_alerts(&self) -> Result<Vec<MarketAlert>, FetchError>;
    async fn reading_list(&self) -> Result<ReadingList, FetchError>;
    async fn institutional_holdings(&self) -> Result<Vec<InstitutionalHolding>, FetchError>;
    async fn policy_updates(&self) -> Result<Vec<PolicyUpdate>, FetchError>;
    fn name(&self) -> &'static str;
}

/// Built-in editorial data; the stock backend has no endpoints for these.
#[derive(Debug, Clone, Default)]
pub struct CuratedFeeds;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[async_trait]
impl FeedProvider for CuratedFeeds {
    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, FetchError> {
        Ok([
            ("Bitcoin ETF", 12_500),
            ("Federal Reserve", 8_900),
            ("Ethereum Upgrade", 7_200),
            ("Market Volatility", 6_800),
            ("Crypto Regulation", 5_400),
        ]
        .into_iter()
        .map(|(topic, volume)| TrendingTopic {
            topic: topic.to_string(),
            volume,
        })
        .collect())
    }

    async fn market_alerts(&self) -> Result<Vec<MarketAlert>, FetchError> {
        // Timestamps are relative to the moment of the fetch.
        let now = Utc::now();
        Ok(vec![
            MarketAlert {
                id: 1,
                kind: "price".into(),
                title: "Bitcoin reaches $45,000".into(),
                message: "BTC hits resistance level".into(),
                timestamp: now - ChronoDuration::minutes(5),
                severity: AlertSeverity::Medium,
            },
            MarketAlert {
                id: 2,
                kind: "volume".into(),
                title: "High trading volume on ETH".into(),
                message: "Ethereum sees 200% volume increase".into(),
                timestamp: now - ChronoDuration::minutes(10),
                severity: AlertSeverity::High,
            },
        ])
    }

    async fn reading_list(&self) -> Result<ReadingList, FetchError> {
        fn owned(xs: &[&str]) -> Vec<String> {
            xs.iter().map(|s| s.to_string()).collect()
        }
        Ok(ReadingList {
            finance: owned(&[
                "Understanding Market Cycles",
                "Federal Reserve Policy Impact",
                "Investment Strategy Guide",
            ]),
            crypto: owned(&[
                "DeFi Protocols Explained",
                "Blockchain Technology Basics",
                "Crypto Market Analysis",
            ]),
        })
    }

    async fn institutional_holdings(&self) -> Result<Vec<InstitutionalHolding>, FetchError> {
        Ok([
            ("BlackRock", "BTC", 28_450.0, 2.3),
            ("Grayscale", "ETH", 15_670.0, -0.8),
            ("MicroStrategy", "BTC", 132_500.0, 0.0),
            ("Tesla", "BTC", 42_902.0, 1.2),
        ]
        .into_iter()
        .map(|(institution, asset, amount, change)| InstitutionalHolding {
            institution: institution.into(),
            asset: asset.into(),
            amount,
            change,
        })
        .collect())
    }

    async fn policy_updates(&self) -> Result<Vec<PolicyUpdate>, FetchError> {
        Ok(vec![
            PolicyUpdate {
                id: "1".into(),
                title: "EU Digital Asset Regulation".into(),
                country: "European Union".into(),
                impact: "High".into(),
                date: date(2024, 1, 15),
                status: "Proposed".into(),
            },
            PolicyUpdate {
                id: "2".into(),
                title: "US Bitcoin ETF Approval".into(),
                country: "United States".into(),
                impact: "Very High".into(),
                date: date(2024, 1, 10),
                status: "Approved".into(),
            },
        ])
    }

    fn name(&self) -> &'static str {
        "curated"
    }
}

/// Fetches every feed through the resilient client.
pub struct RemoteFeeds {
    client: Arc<ApiClient>,
}

impl RemoteFeeds {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedProvider for RemoteFeeds {
    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, FetchError> {
        self.client.fetch(&TRENDING_TOPICS, &FetchParams::none()).await
    }

    async fn market_alerts(&self) -> Result<Vec<MarketAlert>, FetchError> {
        self.client.fetch(&MARKET_ALERTS, &FetchParams::none()).await
    }

    async fn reading_list(&self) -> Result<ReadingList, FetchError> {
        self.client.fetch(&READING_LIST, &FetchParams::none()).await
    }

    async fn institutional_holdings(&self) -> Result<Vec<InstitutionalHolding>, FetchError> {
        self.client
            .fetch(&INSTITUTIONAL_HOLDINGS, &FetchParams::none())
            .await
    }

    async fn policy_updates(&self) -> Result<Vec<PolicyUpdate>, FetchError> {
        self.client.fetch(&POLICY_UPDATES, &FetchParams::none()).await
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
