// src/ops.rs
use async_trait::async_trait;

/// Every data operation the orchestrator, the scheduler, or the view trigger
/// can ask for. Each one writes exactly one collection (or none, for the ping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MarketData,
    Articles,
    TrendingTopics,
    MarketAlerts,
    ReadingList,
    InstitutionalHoldings,
    PolicyUpdates,
    LiveStreams,
    SeoStats,
    AdminStats,
    NewsSources,
    KeepAlive,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::MarketData => "market_data",
            Operation::Articles => "articles",
            Operation::TrendingTopics => "trending_topics",
            Operation::MarketAlerts => "market_alerts",
            Operation::ReadingList => "reading_list",
            Operation::InstitutionalHoldings => "institutional_holdings",
            Operation::PolicyUpdates => "policy_updates",
            Operation::LiveStreams => "live_streams",
            Operation::SeoStats => "seo_stats",
            Operation::AdminStats => "admin_stats",
            Operation::NewsSources => "news_sources",
            Operation::KeepAlive => "keep_alive",
        }
    }
}

/// Executes one operation to completion. Failures are absorbed by the
/// implementation (logged, empty state written); nothing propagates to the
/// caller, so one task can never block or cancel another.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, op: Operation);
}
