//! Canned data for demo mode and for the rate-limit fallback.

use crate::schema::{Mover, Overview, TopMovers};
use serde_json::{json, Map, Value};

// (ticker, price, change_amount, change_percentage, volume)
const GAINERS: [(&str, &str, &str, &str, &str); 6] = [
    ("SMX", "0.3389", "0.2165", "176.8791%", "118953713"),
    ("NVDA", "121.79", "8.93", "7.9133%", "426211500"),
    ("AAPL", "214.29", "8.96", "4.3637%", "198134293"),
    ("TSLA", "183.01", "5.7", "3.2147%", "95428473"),
    ("AMD", "160.35", "3.95", "2.5256%", "43217598"),
    ("MSFT", "442.57", "6.21", "1.4232%", "20842356"),
];

const LOSERS: [(&str, &str, &str, &str, &str); 6] = [
    ("BNZIW", "0.0101", "-0.0199", "-66.3333%", "93610"),
    ("INTC", "30.46", "-1.48", "-4.6337%", "58317264"),
    ("NKE", "94.04", "-3.86", "-3.9428%", "17893412"),
    ("BA", "176.42", "-4.35", "-2.4063%", "9421345"),
    ("DIS", "99.81", "-1.76", "-1.7328%", "11304861"),
    ("PFE", "27.94", "-0.31", "-1.0973%", "37729410"),
];

fn movers(rows: &[(&str, &str, &str, &str, &str)]) -> Vec<Mover> {
    rows.iter()
        .map(|(ticker, price, amount, pct, volume)| Mover {
            ticker: ticker.to_string(),
            price: price.to_string(),
            change_amount: amount.to_string(),
            change_percentage: pct.to_string(),
            volume: volume.to_string(),
            extra: Map::new(),
        })
        .collect()
}

/// Fixed gainers/losers dataset served when demo mode is on.
pub fn top_movers() -> TopMovers {
    TopMovers {
        metadata: Some("Top gainers, losers, and most actively traded US tickers (demo)".to_string()),
        last_updated: Some("2024-06-12 16:15:59 US/Eastern".to_string()),
        top_gainers: movers(&GAINERS),
        top_losers: movers(&LOSERS),
        most_actively_traded: Vec::new(),
        extra: Map::new(),
    }
}

/// Overview used when the live one is unavailable. Callers splice the real
/// symbol and name in with [`Overview::with_identity`].
pub fn overview_template() -> Overview {
    let value = json!({
        "Symbol": "RELIANCE.BSE",
        "AssetType": "Common Stock",
        "Name": "Reliance Industries Limited",
        "Description": "Reliance Industries Limited engages in hydrocarbon exploration and production, oil and chemicals, textiles, retail, digital, material and composites, renewables, and financial services businesses worldwide.",
        "Exchange": "BSE",
        "Currency": "INR",
        "Country": "India",
        "Sector": "ENERGY",
        "Industry": "OIL & GAS REFINING & MARKETING",
        "MarketCapitalization": "19842000000000",
        "PERatio": "28.41",
        "DividendYield": "0.0034",
        "EPS": "102.9",
        "52WeekHigh": "3217.9",
        "52WeekLow": "2220.3",
        "50DayMovingAverage": "2915.4",
        "200DayMovingAverage": "2781.6"
    });
    match value {
        Value::Object(map) => Overview(map),
        _ => Overview::default(),
    }
}
