use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error, trace};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Reference symbol whose history backs the demo fallback.
pub const DEMO_SYMBOL: &str = "RELIANCE.BSE";
const DEMO_API_KEY: &str = "demo";

/// Response fields that mean "quota exhausted" rather than data.
pub const RATE_LIMIT_SENTINELS: [&str; 2] = ["Note", "Information"];
const ERROR_MESSAGE_KEY: &str = "Error Message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Compact,
    Full,
}

impl OutputSize {
    fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// The provider requests this crate knows how to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    TopGainersLosers,
    Overview { symbol: String },
    DailySeries { symbol: String },
    /// Full daily history of [`DEMO_SYMBOL`], served under the public demo key.
    DemoDailySeries,
    SymbolSearch { keywords: String },
}

impl Request {
    /// Query parameters, minus the API key.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Request::TopGainersLosers => vec![("function", "TOP_GAINERS_LOSERS".to_string())],
            Request::Overview { symbol } => vec![
                ("function", "OVERVIEW".to_string()),
                ("symbol", symbol.clone()),
            ],
            Request::DailySeries { symbol } => vec![
                ("function", "TIME_SERIES_DAILY".to_string()),
                ("symbol", symbol.clone()),
                ("outputsize", OutputSize::Compact.as_str().to_string()),
            ],
            Request::DemoDailySeries => vec![
                ("function", "TIME_SERIES_DAILY".to_string()),
                ("symbol", DEMO_SYMBOL.to_string()),
                ("outputsize", OutputSize::Full.as_str().to_string()),
            ],
            Request::SymbolSearch { keywords } => vec![
                ("function", "SYMBOL_SEARCH".to_string()),
                ("keywords", keywords.clone()),
            ],
        }
    }

    fn fixed_api_key(&self) -> Option<&'static str> {
        match self {
            Request::DemoDailySeries => Some(DEMO_API_KEY),
            _ => None,
        }
    }
}

/// The remote market-data provider.
///
/// Implementations only move JSON; deciding whether a body is data, a
/// rate-limit notice or garbage is left to the caller (see
/// [`rate_limit_message`] and [`error_message`]).
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Value>;
}

/// The message carried by a `Note`/`Information` sentinel, if any.
pub fn rate_limit_message(json: &Value) -> Option<String> {
    RATE_LIMIT_SENTINELS
        .iter()
        .find_map(|key| json.get(*key))
        .map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
}

/// The provider's `Error Message` field, if any.
pub fn error_message(json: &Value) -> Option<String> {
    json.get(ERROR_MESSAGE_KEY)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

// -------------------------------------------------------------------------------------------------

/// [`MarketApi`] over HTTP against Alpha Vantage.
#[derive(Clone)]
pub struct AlphaVantage {
    http: HttpClient,
    endpoint: Url,
    api_key: String,
}

impl AlphaVantage {
    pub fn new(config: &Config) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        let mut endpoint = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidConfig(format!("base url {}: {e}", config.base_url)))?;
        endpoint.set_path("query");

        let http = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    pub fn request_url(&self, request: &Request) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in request.params() {
                query.append_pair(k, &v);
            }
            query.append_pair("apikey", request.fixed_api_key().unwrap_or(self.api_key.as_str()));
        }
        url
    }
}

#[async_trait]
impl MarketApi for AlphaVantage {
    async fn fetch(&self, request: &Request) -> Result<Value> {
        let url = self.request_url(request);
        trace!("GET {}", url.path());

        // the url carries the api key; keep it out of errors and logs
        let response = self.http.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            error!("failed fetching response for {request:?}: {e}");
            e
        })?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::UpstreamUnavailable(
                "rate limited by Alpha Vantage (HTTP 429)".to_string(),
            ));
        }

        let json: Value = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("failed deserializing response for {request:?}: {e}");
            e
        })?;
        debug!("fetched {request:?}");
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> AlphaVantage {
        let config = Config {
            api_key: "KEY123".to_string(),
            ..Config::default()
        };
        AlphaVantage::new(&config).unwrap()
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = AlphaVantage::new(&Config::default()).err().unwrap();
        assert!(matches!(err, Error::MissingApiKey));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let config = Config {
            api_key: "KEY".to_string(),
            base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            AlphaVantage::new(&config).err().unwrap(),
            Error::InvalidConfig(_)
        ));
    }

    #[test]
    fn urls_carry_function_symbol_and_key() {
        let url = client().request_url(&Request::Overview {
            symbol: "IBM".to_string(),
        });
        assert_eq!(
            url.as_str(),
            "https://www.alphavantage.co/query?function=OVERVIEW&symbol=IBM&apikey=KEY123"
        );

        let url = client().request_url(&Request::DailySeries {
            symbol: "IBM".to_string(),
        });
        assert_eq!(
            url.query(),
            Some("function=TIME_SERIES_DAILY&symbol=IBM&outputsize=compact&apikey=KEY123")
        );
    }

    #[test]
    fn demo_series_uses_the_public_demo_key() {
        let url = client().request_url(&Request::DemoDailySeries);
        assert_eq!(
            url.query(),
            Some("function=TIME_SERIES_DAILY&symbol=RELIANCE.BSE&outputsize=full&apikey=demo")
        );
    }

    #[test]
    fn search_keywords_are_escaped() {
        let url = client().request_url(&Request::SymbolSearch {
            keywords: "tesla & co".to_string(),
        });
        assert_eq!(
            url.query(),
            Some("function=SYMBOL_SEARCH&keywords=tesla+%26+co&apikey=KEY123")
        );
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_key() {
        let config = Config {
            api_key: "SECRETKEY".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let api = AlphaVantage::new(&config).unwrap();

        let err = api.fetch(&Request::TopGainersLosers).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(!err.to_string().contains("SECRETKEY"));
        assert!(!format!("{err:?}").contains("SECRETKEY"));
    }

    #[test]
    fn sentinels_are_recognised() {
        assert_eq!(
            rate_limit_message(&json!({ "Note": "Thank you for using Alpha Vantage!" })),
            Some("Thank you for using Alpha Vantage!".to_string())
        );
        assert!(rate_limit_message(&json!({ "Information": "limit" })).is_some());
        assert!(rate_limit_message(&json!({ "Symbol": "IBM" })).is_none());
        assert_eq!(
            error_message(&json!({ "Error Message": "Invalid API call." })),
            Some("Invalid API call.".to_string())
        );
    }
}
