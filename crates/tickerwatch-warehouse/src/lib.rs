pub mod api;
pub mod cache;
pub mod config;
pub mod demo;
pub mod error;
pub mod fetcher;
pub mod schema;
pub mod theme;
pub mod view;
pub mod watchlist;

pub use crate::api::{AlphaVantage, MarketApi, Request};
pub use crate::cache::{CacheKey, TimedCache, CACHE_TTL};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::fetcher::MarketDataFetcher;
pub use crate::theme::{Theme, ThemeStore};
pub use crate::view::{Shown, ViewState};
pub use crate::watchlist::{WatchlistStore, Watchlists};
