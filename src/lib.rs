// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod storage;

// Session + resilient fetch client
pub mod fetch;
pub mod session;

// Data model, feeds and the state container the renderer reads
pub mod feeds;
pub mod models;
pub mod state;

// Orchestration: startup tiers, periodic refresh, view-driven fetches
pub mod dashboard;
pub mod ops;
pub mod orchestrator;
pub mod scheduler;
pub mod trigger;

pub mod i18n;

// ---- Re-exports for stable public API ----
pub use crate::dashboard::Dashboard;
pub use crate::fetch::{ApiClient, FetchError};
pub use crate::ops::{Operation, TaskRunner};
pub use crate::session::{AuthError, Credentials, SessionState, SessionStore};
pub use crate::state::{Snapshot, StateStore};
