use crate::api::DEFAULT_BASE_URL;
use dotenv::var;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./.tickerwatch";

/// Runtime settings, read from the environment (and `.env`, once
/// `dotenv::dotenv()` has run).
///
/// | variable                 | default                        |
/// |--------------------------|--------------------------------|
/// | `ALPHA_VANTAGE_API_KEY`  | empty, live calls then fail    |
/// | `ALPHA_VANTAGE_BASE_URL` | `https://www.alphavantage.co`  |
/// | `USER_AGENT`             | `tickerwatch/<version>`        |
/// | `TICKERWATCH_DATA_DIR`   | `./.tickerwatch`               |
/// | `USE_MOCK_DATA`          | `false`                        |
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub user_agent: String,
    pub data_dir: PathBuf,
    /// Serve gainers/losers from the bundled demo dataset and never call out.
    pub use_demo_movers: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: var("ALPHA_VANTAGE_API_KEY").unwrap_or_default(),
            base_url: var("ALPHA_VANTAGE_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: var("USER_AGENT").unwrap_or(defaults.user_agent),
            data_dir: var("TICKERWATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            use_demo_movers: var("USE_MOCK_DATA")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("tickerwatch/{}", env!("CARGO_PKG_VERSION")),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            use_demo_movers: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
