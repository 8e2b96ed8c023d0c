// src/state.rs
//! Application-state container consumed by the renderer.
//!
//! Each collection has exactly one update function and is replaced wholesale;
//! the last write wins regardless of when the request was issued. Every write
//! bumps a revision counter so a renderer can redraw.

use std::sync::{Mutex, RwLock};

use tokio::sync::watch;

use crate::models::{
    AdminStats, Article, InstitutionalHolding, LiveStream, MarketAlert, MarketSnapshot,
    NewsSource, PolicyUpdate, ReadingList, SeoStats, TrendingTopic,
};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub articles: Vec<Article>,
    pub market: MarketSnapshot,
    pub live_streams: Vec<LiveStream>,
    pub seo_stats: SeoStats,
    pub admin_stats: AdminStats,
    pub news_sources: Vec<NewsSource>,
    pub trending_topics: Vec<TrendingTopic>,
    pub market_alerts: Vec<MarketAlert>,
    pub reading_list: ReadingList,
    pub institutional_holdings: Vec<InstitutionalHolding>,
    pub policy_updates: Vec<PolicyUpdate>,
    pub loading: LoadingFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub articles: bool,
    pub market: bool,
    pub live_streams: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loading {
    Articles,
    Market,
    LiveStreams,
}

impl Loading {
    fn slot(self) -> usize {
        match self {
            Loading::Articles => 0,
            Loading::Market => 1,
            Loading::LiveStreams => 2,
        }
    }
}

pub struct StateStore {
    inner: RwLock<Snapshot>,
    // Fetches in flight per loading collection; the flag is `count > 0`.
    in_flight: Mutex<[u32; 3]>,
    revision: watch::Sender<u64>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Snapshot::default()),
            in_flight: Mutex::new([0; 3]),
            revision,
        }
    }

    fn write(&self, f: impl FnOnce(&mut Snapshot)) {
        {
            let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
            f(&mut g);
        }
        self.revision.send_modify(|r| *r += 1);
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        f(&g)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read(Snapshot::clone)
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn replace_articles(&self, v: Vec<Article>) {
        self.write(|s| s.articles = v);
    }

    pub fn replace_market(&self, v: MarketSnapshot) {
        self.write(|s| s.market = v);
    }

    pub fn replace_live_streams(&self, v: Vec<LiveStream>) {
        self.write(|s| s.live_streams = v);
    }

    pub fn replace_seo_stats(&self, v: SeoStats) {
        self.write(|s| s.seo_stats = v);
    }

    pub fn replace_admin_stats(&self, v: AdminStats) {
        self.write(|s| s.admin_stats = v);
    }

    pub fn replace_news_sources(&self, v: Vec<NewsSource>) {
        self.write(|s| s.news_sources = v);
    }

    pub fn replace_trending_topics(&self, v: Vec<TrendingTopic>) {
        self.write(|s| s.trending_topics = v);
    }

    pub fn replace_market_alerts(&self, v: Vec<MarketAlert>) {
        self.write(|s| s.market_alerts = v);
    }

    pub fn replace_reading_list(&self, v: ReadingList) {
        self.write(|s| s.reading_list = v);
    }

    pub fn replace_institutional_holdings(&self, v: Vec<InstitutionalHolding>) {
        self.write(|s| s.institutional_holdings = v);
    }

    pub fn replace_policy_updates(&self, v: Vec<PolicyUpdate>) {
        self.write(|s| s.policy_updates = v);
    }

    /// Marks one more fetch of `which` in flight and raises its flag.
    pub fn begin_loading(&self, which: Loading) {
        self.track_loading(which, true);
    }

    /// Marks one fetch of `which` finished. The flag drops only once no
    /// other fetch of the same collection is still running.
    pub fn end_loading(&self, which: Loading) {
        self.track_loading(which, false);
    }

    fn track_loading(&self, which: Loading, start: bool) {
        self.write(|s| {
            let mut counts = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
            let n = &mut counts[which.slot()];
            *n = if start { *n + 1 } else { n.saturating_sub(1) };
            let on = *n > 0;
            match which {
                Loading::Articles => s.loading.articles = on,
                Loading::Market => s.loading.market = on,
                Loading::LiveStreams => s.loading.live_streams = on,
            }
        });
    }

    /// Admin-only collections are dropped when the session ends.
    pub fn clear_admin(&self) {
        self.write(|s| {
            s.admin_stats = AdminStats::default();
            s.news_sources.clear();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ticker;

    fn ticker(sym: &str) -> Ticker {
        Ticker {
            symbol: sym.into(),
            name: sym.into(),
            price: 1.0,
            change_24h: 0.0,
            change_percentage_24h: 0.0,
            market_cap: None,
        }
    }

    #[test]
    fn replace_is_wholesale_and_bumps_revision() {
        let st = StateStore::new();
        let mut rx = st.subscribe();
        st.replace_market(MarketSnapshot {
            stocks: vec![ticker("AAPL"), ticker("MSFT")],
            ..Default::default()
        });
        st.replace_market(MarketSnapshot {
            cryptos: vec![ticker("BTC")],
            ..Default::default()
        });
        let snap = st.snapshot();
        assert!(snap.market.stocks.is_empty());
        assert_eq!(snap.market.cryptos.len(), 1);
        assert_eq!(st.revision(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn loading_flags_toggle_independently() {
        let st = StateStore::new();
        st.begin_loading(Loading::Articles);
        st.begin_loading(Loading::LiveStreams);
        st.end_loading(Loading::Articles);
        let l = st.snapshot().loading;
        assert!(!l.articles && !l.market && l.live_streams);
    }

    #[test]
    fn loading_flag_holds_until_last_fetch_ends() {
        let st = StateStore::new();
        st.begin_loading(Loading::Market);
        st.begin_loading(Loading::Market);
        st.end_loading(Loading::Market);
        assert!(st.snapshot().loading.market);
        st.end_loading(Loading::Market);
        assert!(!st.snapshot().loading.market);
        // A stray end never underflows.
        st.end_loading(Loading::Market);
        st.begin_loading(Loading::Market);
        assert!(st.snapshot().loading.market);
    }
}
