// src/config/mod.rs
pub mod client;

pub use client::{
    load_default, load_from, ClientConfig, FeedMode, PagesCfg, RefreshCfg, StartupCfg,
};
