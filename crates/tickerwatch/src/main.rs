use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use cli::{Cli, Commands::*, Side, ThemeAction, TraceLevel, WatchlistAction};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use dotenv::dotenv;
use serde_json::Value;
use std::sync::Arc;
use tickerwatch_util::{FileStorage, Storage};
use tickerwatch_warehouse::{
    self as warehouse,
    schema::{paginate, DataSource, MoverKind, Stock, StockDetail, TimeSeriesPoint},
    AlphaVantage, Config, Error, MarketApi, MarketDataFetcher, Request, ThemeStore, TimedCache,
    WatchlistStore,
};
use tracing::{debug, subscriber, trace, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;

/// Rows shown per side on the movers overview.
const PREVIEW_ROWS: usize = 5;

/// Days of closing prices summarised on the detail view.
const CHART_DAYS: usize = 90;

fn preprocess(trace_level: Level) -> Result<()> {
    dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber)?;
    Ok(())
}

/// Stand-in provider when no API key is configured; every call fails terminally.
struct NoApiKey;

#[async_trait]
impl MarketApi for NoApiKey {
    async fn fetch(&self, _request: &Request) -> warehouse::Result<Value> {
        Err(Error::MissingApiKey)
    }
}

fn market_api(config: &Config) -> Result<Arc<dyn MarketApi>> {
    match AlphaVantage::new(config) {
        Ok(api) => Ok(Arc::new(api)),
        Err(Error::MissingApiKey) => {
            warn!("ALPHA_VANTAGE_API_KEY is not set; live market data is unavailable");
            Ok(Arc::new(NoApiKey))
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::TRACE => Level::TRACE,
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level)?;
    trace!("Command line input recorded: {cli:#?}");

    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if cli.demo {
        config.use_demo_movers = true;
    }
    debug!("data directory: {}", config.data_dir.display());

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(config.data_dir.clone()).await?);

    ////////////////////////////////////////////////////////////////////////////////////////////////

    // "> tickerwatch <COMMAND>"
    match cli.command {
        // "> tickerwatch movers [gainers|losers] [--page N]"
        Movers { kind, page } => {
            let fetcher = MarketDataFetcher::new(market_api(&config)?, TimedCache::new(storage))
                .with_demo_movers(config.use_demo_movers);

            match kind {
                None => {
                    let movers = fetcher.top_movers().await?;
                    if let Some(updated) = &movers.last_updated {
                        println!("{}", format!("Last updated {updated}").dimmed());
                    }
                    for kind in [MoverKind::Gainers, MoverKind::Losers] {
                        println!("\n{}", kind.title().bold());
                        for mover in movers.side(kind).iter().take(PREVIEW_ROWS) {
                            print_stock(&Stock::from(mover));
                        }
                    }
                }

                // the full list is only ever read from the cache
                Some(side) => {
                    let kind = match side {
                        Side::Gainers => MoverKind::Gainers,
                        Side::Losers => MoverKind::Losers,
                    };
                    let movers = fetcher.cached_top_movers().await?;
                    let rows = movers.side(kind);
                    let Some(page) = paginate(rows, page) else {
                        anyhow::bail!("page {page} is out of range");
                    };
                    println!(
                        "{} (page {} of {})",
                        kind.title().bold(),
                        page.number,
                        page.total_pages.max(1)
                    );
                    for mover in page.items {
                        print_stock(&Stock::from(mover));
                    }
                }
            }
        }

        // "> tickerwatch detail <TICKER> [--name NAME]"
        Detail { ticker, name } => {
            let fetcher = MarketDataFetcher::new(market_api(&config)?, TimedCache::new(storage));
            let detail = fetcher.stock_detail(&ticker, name.as_deref()).await?;
            print_detail(&detail);
        }

        // "> tickerwatch search <KEYWORDS>"
        Search { keywords } => {
            let fetcher = MarketDataFetcher::new(market_api(&config)?, TimedCache::new(storage));
            let matches = fetcher.search_symbols(&keywords).await?;
            if matches.is_empty() {
                println!("No matches for \"{keywords}\".");
            }
            for m in matches {
                println!(
                    "{:>12}  {}  {}",
                    m.symbol.bold(),
                    m.name.as_deref().unwrap_or("-"),
                    m.region.as_deref().unwrap_or("").dimmed()
                );
            }
        }

        // "> tickerwatch watchlist <ACTION>"
        Watchlist { action } => {
            let store = WatchlistStore::new(storage.clone());
            run_watchlist(&store, action, &config, storage).await?;
        }

        // "> tickerwatch theme [show|toggle]"
        Theme { action } => {
            let store = ThemeStore::load(storage, warehouse::Theme::Light).await;
            let theme = match action {
                Some(ThemeAction::Toggle) => store.toggle().await,
                Some(ThemeAction::Show) | None => store.theme().await,
            };
            println!("{theme}");
        }
    }

    Ok(())
}

async fn run_watchlist(
    store: &WatchlistStore,
    action: WatchlistAction,
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<()> {
    use WatchlistAction::*;

    match action {
        List => {
            let lists = store.watchlists().await;
            if lists.is_empty() {
                println!("No watchlists yet.");
            }
            for (name, stocks) in lists {
                println!("{name} ({} stocks)", stocks.len());
            }
        }

        Show { name } => match store.watchlist(&name).await {
            Some(stocks) if stocks.is_empty() => println!("\"{name}\" is empty."),
            Some(stocks) => stocks.iter().for_each(print_stock),
            None => anyhow::bail!("no watchlist named \"{}\"", name.trim()),
        },

        Create { name } => {
            let name = store.create_watchlist(&name).await?;
            println!("Created \"{name}\".");
        }

        Delete { name, yes } => {
            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!(
                        "Delete \"{}\" and every stock on it?",
                        name.trim()
                    ))
                    .default(false)
                    .interact()?;
            if !confirmed {
                return Ok(());
            }
            if store.delete_watchlist(&name).await? {
                println!("Deleted \"{}\".", name.trim());
            } else {
                println!("No watchlist named \"{}\".", name.trim());
            }
        }

        Add {
            name,
            ticker,
            price,
            change,
        } => {
            let stock = match (price, change) {
                (Some(price), Some(change)) => Stock::new(ticker.trim(), price, change),
                (price, change) => {
                    let known = quote_from_movers(config, storage, &ticker).await;
                    let price = price
                        .or_else(|| known.as_ref().map(|s| s.price.clone()))
                        .unwrap_or_default();
                    let change = change
                        .or_else(|| known.as_ref().map(|s| s.change_percentage.clone()))
                        .unwrap_or_default();
                    Stock::new(ticker.trim(), price, change)
                }
            };
            match store.add_stock_to_watchlist(&name, stock).await {
                Ok(()) => println!("Added {} to \"{}\".", ticker.trim(), name.trim()),
                Err(e @ Error::DuplicateEntry { .. }) => println!("{e}"),
                Err(e) => return Err(e.into()),
            }
        }

        Remove { name, ticker } => {
            if store
                .remove_stock_from_specific_watchlist(&name, &ticker)
                .await?
            {
                println!("Removed {} from \"{}\".", ticker.trim(), name.trim());
            } else {
                println!("{} is not on \"{}\".", ticker.trim(), name.trim());
            }
        }

        RemoveEverywhere { ticker } => {
            let removed = store.remove_stock_from_watchlist(&ticker).await?;
            println!("Removed {} from {removed} watchlist(s).", ticker.trim());
        }

        Contains { ticker } => {
            let found = store.is_stock_in_any_watchlist(&ticker).await;
            println!("{}", if found { "yes" } else { "no" });
        }
    }

    Ok(())
}

/// Price and change for `ticker` from the cached movers, if it is on them.
async fn quote_from_movers(
    config: &Config,
    storage: Arc<dyn Storage>,
    ticker: &str,
) -> Option<Stock> {
    let api = market_api(config).ok()?;
    let fetcher = MarketDataFetcher::new(api, TimedCache::new(storage))
        .with_demo_movers(config.use_demo_movers);
    let movers = fetcher.cached_top_movers().await.ok()?;
    let ticker = ticker.trim();
    movers
        .top_gainers
        .iter()
        .chain(movers.top_losers.iter())
        .find(|m| m.ticker.eq_ignore_ascii_case(ticker))
        .map(Stock::from)
}

fn print_stock(stock: &Stock) {
    let change = if stock.is_gain() {
        stock.change_percentage.green()
    } else {
        stock.change_percentage.red()
    };
    println!("{:>8}  {:>12}  {change}", stock.ticker.bold(), stock.price);
}

fn print_detail(detail: &StockDetail) {
    let overview = &detail.overview;
    println!(
        "{} {}",
        overview.symbol().unwrap_or("?").bold(),
        overview.name().unwrap_or_default()
    );
    if detail.source == DataSource::Demo {
        println!(
            "{}",
            "Live data unavailable (rate limited); showing demo data.".yellow()
        );
    }
    for key in [
        "Exchange",
        "Sector",
        "Industry",
        "MarketCapitalization",
        "PERatio",
        "52WeekHigh",
        "52WeekLow",
    ] {
        if let Some(value) = overview.attr(key) {
            println!("{key:>22}: {value}");
        }
    }
    if let Some(description) = overview.attr("Description") {
        println!("\n{description}");
    }

    let recent = &detail.series[detail.series.len().saturating_sub(CHART_DAYS)..];
    print_series(recent);
}

fn print_series(points: &[TimeSeriesPoint]) {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        println!("\nNo price history.");
        return;
    };
    let low = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let high = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
    let change = last.value - first.value;
    let line = format!(
        "{} → {}: {:.2} → {:.2} ({change:+.2})",
        first.date, last.date, first.value, last.value
    );

    println!();
    if change < 0.0 {
        println!("{}", line.red());
    } else {
        println!("{}", line.green());
    }
    println!("low {low:.2}, high {high:.2} over {} days", points.len());
}
