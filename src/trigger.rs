// src/trigger.rs
//! View-driven fetches: whatever view and category are active decide which
//! collections get re-fetched.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dashboard::Dashboard;
use crate::fetch::ALL_CATEGORIES;
use crate::session::{AuthError, Credentials};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Dashboard,
    LiveNow,
    SmartMoney,
    Policies,
    About,
    Admin,
    Privacy,
}

impl View {
    pub fn id(self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::LiveNow => "live-now",
            View::SmartMoney => "smart-money",
            View::Policies => "policies",
            View::About => "about",
            View::Admin => "admin",
            View::Privacy => "privacy",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "dashboard" => View::Dashboard,
            "live-now" => View::LiveNow,
            "smart-money" => View::SmartMoney,
            "policies" => View::Policies,
            "about" => View::About,
            "admin" => View::Admin,
            "privacy" => View::Privacy,
            _ => return None,
        })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// Same view and filter as before; nothing fetched.
    Unchanged,
    Applied,
    /// Admin requested without a session; view kept, nothing fetched.
    LoginRequired,
    /// An admin call was denied; the session is gone and the view is back on
    /// the dashboard.
    SessionExpired,
}

fn normalize_category(category: &str) -> String {
    let c = category.trim().to_ascii_lowercase();
    if c.is_empty() {
        ALL_CATEGORIES.to_string()
    } else {
        c
    }
}

pub struct ViewTrigger {
    dashboard: Arc<Dashboard>,
    view: View,
    category: String,
    stream_category: String,
    /// SEO statistics are fetched on the first dashboard arrival only.
    seo_fetched: bool,
}

impl ViewTrigger {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        Self {
            dashboard,
            view: View::Dashboard,
            category: ALL_CATEGORIES.to_string(),
            stream_category: ALL_CATEGORIES.to_string(),
            seo_fetched: false,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn stream_category(&self) -> &str {
        &self.stream_category
    }

    pub fn seo_fetched(&self) -> bool {
        self.seo_fetched
    }

    /// Applies the initial view and filter.
    pub async fn mount(&mut self) -> ViewOutcome {
        self.apply().await
    }

    pub async fn set_view(&mut self, view: View) -> ViewOutcome {
        if view == self.view {
            return ViewOutcome::Unchanged;
        }
        if view == View::Admin && !self.dashboard.session().is_authenticated() {
            info!(target: "session", "admin view needs a login");
            return ViewOutcome::LoginRequired;
        }
        debug!(from = %self.view, to = %view, "view change");
        self.view = view;
        self.apply().await
    }

    pub async fn set_category(&mut self, category: &str) -> ViewOutcome {
        let next = normalize_category(category);
        if next == self.category {
            return ViewOutcome::Unchanged;
        }
        debug!(from = %self.category, to = %next, "category change");
        self.category = next;
        self.apply().await
    }

    /// The live-stream filter is separate from the article filter.
    pub async fn set_stream_category(&mut self, category: &str) -> ViewOutcome {
        let next = normalize_category(category);
        if next == self.stream_category {
            return ViewOutcome::Unchanged;
        }
        self.stream_category = next;
        let _ = self.dashboard.fetch_live_streams(&self.stream_category).await;
        ViewOutcome::Applied
    }

    /// Manual refresh of the live streams under the current filter.
    pub async fn refresh_streams(&self) {
        let _ = self.dashboard.fetch_live_streams(&self.stream_category).await;
    }

    /// Successful login switches to the admin view.
    pub async fn login(&mut self, creds: &Credentials) -> Result<ViewOutcome, AuthError> {
        self.dashboard.login(creds).await?;
        self.view = View::Admin;
        Ok(self.apply().await)
    }

    /// Logout always lands on the dashboard.
    pub async fn logout(&mut self) -> ViewOutcome {
        self.dashboard.logout();
        if self.view == View::Dashboard {
            return ViewOutcome::Unchanged;
        }
        self.view = View::Dashboard;
        self.apply().await
    }

    /// Leaves the admin view if the session was dropped elsewhere (a denied
    /// scheduled call, say).
    pub async fn sync_session(&mut self) -> ViewOutcome {
        if self.view != View::Admin || self.dashboard.session().is_authenticated() {
            return ViewOutcome::Unchanged;
        }
        self.leave_admin().await
    }

    async fn apply(&mut self) -> ViewOutcome {
        let dash = Arc::clone(&self.dashboard);
        match self.view {
            View::Admin => {
                let (_, stats, sources) = tokio::join!(
                    dash.fetch_articles(&self.category),
                    dash.fetch_admin_stats(),
                    dash.fetch_news_sources(),
                );
                let denied = [&stats, &sources]
                    .iter()
                    .any(|r| matches!(r, Err(e) if e.is_auth_denied()));
                if denied {
                    warn!(target: "session", "admin data denied, returning to dashboard");
                    return self.leave_admin().await;
                }
                ViewOutcome::Applied
            }
            View::Dashboard => {
                let _ = dash.fetch_articles(&self.category).await;
                self.fetch_seo_once().await;
                ViewOutcome::Applied
            }
            _ => {
                let _ = dash.fetch_articles(&self.category).await;
                ViewOutcome::Applied
            }
        }
    }

    async fn leave_admin(&mut self) -> ViewOutcome {
        // A sibling admin call may have landed after the denial.
        self.dashboard.state().clear_admin();
        self.view = View::Dashboard;
        self.fetch_seo_once().await;
        ViewOutcome::SessionExpired
    }

    async fn fetch_seo_once(&mut self) {
        if self.seo_fetched {
            return;
        }
        // Flag goes up when the fetch is issued, so a failure is not retried.
        self.seo_fetched = true;
        let _ = self.dashboard.fetch_seo_stats().await;
    }
}
