use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DAILY_SERIES_KEY: &str = "Time Series (Daily)";
const CLOSE_KEY: &str = "4. close";

/// Company overview as the provider sends it: a flat attribute bag. Only
/// `Symbol` (and usually `Name`) are relied upon.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Overview(pub Map<String, Value>);

impl Overview {
    pub fn symbol(&self) -> Option<&str> {
        self.attr("Symbol")
    }

    pub fn name(&self) -> Option<&str> {
        self.attr("Name")
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Overwrite `Symbol` and `Name`, leaving every other attribute alone.
    pub fn with_identity(mut self, symbol: &str, name: &str) -> Self {
        self.0
            .insert("Symbol".to_string(), Value::String(symbol.to_string()));
        self.0.insert("Name".to_string(), Value::String(name.to_string()));
        self
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: f64,
}

impl TimeSeriesPoint {
    /// Reshape a `TIME_SERIES_DAILY` response into closing prices, oldest first.
    ///
    /// The provider lists dates newest first; the output is sorted ascending no
    /// matter what order the response used.
    pub fn from_daily_response(json: &Value) -> Result<Vec<TimeSeriesPoint>> {
        let daily = json
            .get(DAILY_SERIES_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::UpstreamMalformed(format!("missing \"{DAILY_SERIES_KEY}\" in response"))
            })?;

        let mut points = Vec::with_capacity(daily.len());
        for (date, bar) in daily {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| Error::UpstreamMalformed(format!("invalid date {date}")))?;
            let close = bar
                .get(CLOSE_KEY)
                .and_then(|v| match v {
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    other => other.as_f64(),
                })
                .filter(|close| close.is_finite())
                .ok_or_else(|| {
                    Error::UpstreamMalformed(format!("missing or invalid closing price for {date}"))
                })?;
            points.push((day, date.clone(), close));
        }
        points.sort_by_key(|(day, _, _)| *day);

        Ok(points
            .into_iter()
            .map(|(_, date, value)| TimeSeriesPoint { date, value })
            .collect())
    }
}

/// Where a [`StockDetail`] came from.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Live,
    Demo,
}

/// Everything the detail screen shows for one symbol: overview + daily closes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StockDetail {
    pub overview: Overview,
    pub series: Vec<TimeSeriesPoint>,
    pub source: DataSource,
}
