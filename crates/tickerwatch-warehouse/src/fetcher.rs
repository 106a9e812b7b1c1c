use crate::api::{error_message, rate_limit_message, MarketApi, Request, DEMO_SYMBOL};
use crate::cache::{CacheKey, TimedCache};
use crate::demo;
use crate::error::{Error, Result};
use crate::schema::{DataSource, Overview, StockDetail, SymbolMatch, TimeSeriesPoint, TopMovers};
use crate::view::ViewState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Overview as cached, stamped with the fetch cycle that produced it.
#[derive(Deserialize, Serialize)]
struct CachedOverview {
    cycle: i64,
    overview: Overview,
}

/// Series as cached, stamped with the fetch cycle that produced it.
#[derive(Deserialize, Serialize)]
struct CachedSeries {
    cycle: i64,
    points: Vec<TimeSeriesPoint>,
}

/// Market data with caching and fallbacks.
///
/// Gainers/losers: demo mode → cache → live, with no fallback past live.
///
/// Detail: cache (overview and series from the same fetch) → live overview then
/// live series → demo overview + demo series, the last step only when the
/// provider reported a rate-limit/availability condition.
pub struct MarketDataFetcher {
    api: Arc<dyn MarketApi>,
    cache: TimedCache,
    demo_movers: bool,
}

impl MarketDataFetcher {
    pub fn new(api: Arc<dyn MarketApi>, cache: TimedCache) -> Self {
        Self {
            api,
            cache,
            demo_movers: false,
        }
    }

    /// Serve gainers/losers from the bundled dataset only.
    pub fn with_demo_movers(mut self, enabled: bool) -> Self {
        self.demo_movers = enabled;
        self
    }

    // ---------------------------------------------------------------------------------------------
    // gainers & losers

    pub async fn top_movers(&self) -> Result<TopMovers> {
        if self.demo_movers {
            debug!("serving demo gainers/losers");
            return Ok(demo::top_movers());
        }

        if let Some(hit) = self.cache.get::<TopMovers>(CacheKey::TOP_GAINERS_LOSERS).await {
            return Ok(hit);
        }

        let json = self.api.fetch(&Request::TopGainersLosers).await?;
        if let Some(msg) = rate_limit_message(&json) {
            warn!("gainers/losers rate limited: {msg}");
            return Err(Error::UpstreamUnavailable(msg));
        }
        if json.get("top_gainers").is_none() || json.get("top_losers").is_none() {
            let msg = error_message(&json)
                .unwrap_or_else(|| "response has no top_gainers/top_losers".to_string());
            return Err(Error::UpstreamMalformed(msg));
        }
        let movers: TopMovers = serde_json::from_value(json.clone())
            .map_err(|e| Error::UpstreamMalformed(format!("gainers/losers: {e}")))?;

        self.cache.set(CacheKey::TOP_GAINERS_LOSERS, &json).await;
        info!(
            "fetched {} gainers and {} losers",
            movers.top_gainers.len(),
            movers.top_losers.len()
        );
        Ok(movers)
    }

    /// Gainers/losers without touching the network: the cached copy, or the
    /// demo dataset in demo mode.
    pub async fn cached_top_movers(&self) -> Result<TopMovers> {
        if self.demo_movers {
            return Ok(demo::top_movers());
        }
        self.cache
            .get::<TopMovers>(CacheKey::TOP_GAINERS_LOSERS)
            .await
            .ok_or(Error::NotCached)
    }

    // ---------------------------------------------------------------------------------------------
    // per-symbol detail

    /// Overview and daily closes for `symbol`. `name` is used for the demo
    /// overview when the live one is unavailable.
    pub async fn stock_detail(&self, symbol: &str, name: Option<&str>) -> Result<StockDetail> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(detail) = self.cached_detail(&symbol).await {
            return Ok(detail);
        }

        match self.live_detail(&symbol).await {
            Ok(detail) => Ok(detail),
            Err(e) if e.is_unavailable() => {
                warn!("{symbol}: {e}; falling back to demo data");
                self.demo_detail(&symbol, name).await
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the detail for `symbol` into `view`, unless a newer request was
    /// started on `view` (or it was cancelled) in the meantime. A failure is
    /// recorded on `view` as well and then returned. Returns whether the
    /// result was committed.
    pub async fn load_detail_into(
        &self,
        view: &ViewState<StockDetail>,
        symbol: &str,
        name: Option<&str>,
    ) -> Result<bool> {
        let ticket = view.begin();
        let outcome = self.stock_detail(symbol, name).await;
        if !view.is_current(&ticket) {
            debug!("discarding stale detail for {symbol}");
            return Ok(false);
        }
        match outcome {
            Ok(detail) => Ok(view.commit(&ticket, detail)),
            Err(e) => {
                view.fail(&ticket, e.to_string());
                Err(e)
            }
        }
    }

    async fn cached_detail(&self, symbol: &str) -> Option<StockDetail> {
        let overview = self
            .cache
            .get::<CachedOverview>(&CacheKey::overview(symbol))
            .await?;
        let series = self
            .cache
            .get::<CachedSeries>(&CacheKey::time_series(symbol))
            .await?;
        if overview.cycle != series.cycle {
            debug!("{symbol}: cached overview and series are from different fetches");
            return None;
        }
        Some(StockDetail {
            overview: overview.overview,
            series: series.points,
            source: DataSource::Cache,
        })
    }

    async fn live_detail(&self, symbol: &str) -> Result<StockDetail> {
        let json = self
            .api
            .fetch(&Request::Overview {
                symbol: symbol.to_string(),
            })
            .await?;
        if let Some(msg) = rate_limit_message(&json) {
            return Err(Error::UpstreamUnavailable(msg));
        }
        if json.get("Symbol").and_then(Value::as_str).is_none() {
            return Err(Error::UpstreamUnavailable(format!(
                "no overview available for {symbol}"
            )));
        }
        let overview: Overview = serde_json::from_value(json)
            .map_err(|e| Error::UpstreamMalformed(format!("overview: {e}")))?;

        let json = self
            .api
            .fetch(&Request::DailySeries {
                symbol: symbol.to_string(),
            })
            .await?;
        let points = reshape_series(&json)?;

        let cycle = self.cache.now_millis();
        let cached_overview = CachedOverview { cycle, overview };
        let cached_series = CachedSeries { cycle, points };
        self.cache
            .set(&CacheKey::overview(symbol), &cached_overview)
            .await;
        self.cache
            .set(&CacheKey::time_series(symbol), &cached_series)
            .await;

        info!("{symbol}: fetched overview and {} daily closes", cached_series.points.len());
        Ok(StockDetail {
            overview: cached_overview.overview,
            series: cached_series.points,
            source: DataSource::Live,
        })
    }

    async fn demo_detail(&self, symbol: &str, name: Option<&str>) -> Result<StockDetail> {
        let series = self.demo_series().await.map_err(|e| {
            Error::TerminalFetchFailure(format!(
                "Could not fetch fallback demo time series data: {e}"
            ))
        })?;
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => format!("{symbol} Company"),
        };
        Ok(StockDetail {
            overview: demo::overview_template().with_identity(symbol, &name),
            series,
            source: DataSource::Demo,
        })
    }

    async fn demo_series(&self) -> Result<Vec<TimeSeriesPoint>> {
        let key = CacheKey::demo_time_series(DEMO_SYMBOL);
        if let Some(points) = self.cache.get::<Vec<TimeSeriesPoint>>(&key).await {
            return Ok(points);
        }
        let json = self.api.fetch(&Request::DemoDailySeries).await?;
        let points = reshape_series(&json)?;
        self.cache.set(&key, &points).await;
        Ok(points)
    }

    // ---------------------------------------------------------------------------------------------
    // search

    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>> {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Err(Error::InvalidArgument(
                "Search keywords cannot be empty.".to_string(),
            ));
        }
        let key = CacheKey::search(keywords);
        if let Some(hit) = self.cache.get::<Vec<SymbolMatch>>(&key).await {
            return Ok(hit);
        }

        let json = self
            .api
            .fetch(&Request::SymbolSearch {
                keywords: keywords.to_string(),
            })
            .await?;
        if let Some(msg) = rate_limit_message(&json) {
            return Err(Error::UpstreamUnavailable(msg));
        }
        let matches: Vec<SymbolMatch> = json
            .get("bestMatches")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::UpstreamMalformed(
                    error_message(&json).unwrap_or_else(|| "missing bestMatches".to_string()),
                )
            })?
            .iter()
            .filter_map(|v| serde_json::from_value::<SymbolMatch>(v.clone()).ok())
            .collect();

        self.cache.set(&key, &matches).await;
        Ok(matches)
    }
}

/// Sentinel check, then reshape. A sentinel means "unavailable" and may fall
/// back; any other shape problem is terminal.
fn reshape_series(json: &Value) -> Result<Vec<TimeSeriesPoint>> {
    if let Some(msg) = rate_limit_message(json) {
        return Err(Error::UpstreamUnavailable(msg));
    }
    TimeSeriesPoint::from_daily_response(json).map_err(|e| match error_message(json) {
        Some(msg) => Error::UpstreamMalformed(msg),
        None => e,
    })
}

fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(Error::InvalidArgument("Ticker cannot be empty.".to_string()));
    }
    Ok(symbol.to_uppercase())
}
