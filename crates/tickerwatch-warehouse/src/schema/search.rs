use serde::{Deserialize, Serialize};

/// One entry of a `SYMBOL_SEARCH` response's `bestMatches`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    pub symbol: String,
    #[serde(rename = "2. name", default)]
    pub name: Option<String>,
    #[serde(rename = "3. type", default)]
    pub instrument_type: Option<String>,
    #[serde(rename = "4. region", default)]
    pub region: Option<String>,
    #[serde(rename = "8. currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "9. matchScore", default)]
    pub match_score: Option<String>,
}
