use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing
    #[arg(long, global = true, value_enum, default_value_t = TraceLevel::INFO)]
    pub trace: TraceLevel,

    /// Where cached responses, watchlists and the theme are kept
    /// (overrides TICKERWATCH_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Serve gainers/losers from the bundled demo dataset (same as USE_MOCK_DATA=true).
    #[arg(long, global = true)]
    pub demo: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Today's top gainers and losers.
    Movers {
        /// Show every row of one side, paged, from the cached copy.
        kind: Option<Side>,

        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Company overview and daily closing prices for a ticker.
    Detail {
        ticker: String,

        /// Company name to show if only demo data is available.
        #[arg(long)]
        name: Option<String>,
    },

    /// Look up tickers by company name or symbol.
    Search {
        keywords: String,
    },

    /// Manage watchlists.
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },

    /// Show or switch the light/dark theme.
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WatchlistAction {
    /// List watchlists and how many stocks each holds.
    List,

    /// Show the stocks on one watchlist.
    Show { name: String },

    /// Create an empty watchlist.
    Create { name: String },

    /// Delete a watchlist and everything on it.
    Delete {
        name: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Add a ticker to a watchlist, creating the list if needed. Price and
    /// change are taken from today's movers when the ticker is on them.
    Add {
        name: String,
        ticker: String,

        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        change: Option<String>,
    },

    /// Remove a ticker from one watchlist.
    Remove { name: String, ticker: String },

    /// Remove a ticker from every watchlist.
    RemoveEverywhere { ticker: String },

    /// Whether a ticker is on any watchlist.
    Contains { ticker: String },
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    Show,
    Toggle,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Gainers,
    Losers,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}
