use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// User-actionable validation failure, e.g. a blank watchlist name.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Watchlist \"{0}\" already exists.")]
    AlreadyExists(String),

    /// Informational: the ticker is already on the list and nothing changed.
    #[error("{ticker} is already in watchlist \"{watchlist}\".")]
    DuplicateEntry { ticker: String, watchlist: String },

    /// The provider answered with a rate-limit/information sentinel (or HTTP 429).
    #[error("market data unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("unexpected market data response: {0}")]
    UpstreamMalformed(String),

    /// Every fallback avenue is exhausted.
    #[error("{0}")]
    TerminalFetchFailure(String),

    #[error("Data not found. Please refresh on the Explore page.")]
    NotCached,

    #[error("missing Alpha Vantage API key")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether this error is a rate-limit/availability condition, the only kind
    /// that sends a detail fetch down the demo fallback.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_))
    }
}
