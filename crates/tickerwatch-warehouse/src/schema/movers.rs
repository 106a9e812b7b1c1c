use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rows per page on the "view all" movers list.
pub const PAGE_SIZE: usize = 10;

/// A watchlist entry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    pub ticker: String,
    pub price: String,
    pub change_percentage: String,
}

impl Stock {
    pub fn new(
        ticker: impl Into<String>,
        price: impl Into<String>,
        change_percentage: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            price: price.into(),
            change_percentage: change_percentage.into(),
        }
    }

    /// Anything not starting with a minus sign counts as a gain.
    pub fn is_gain(&self) -> bool {
        is_gain(&self.change_percentage)
    }
}

// -------------------------------------------------------------------------------------------------

/// One row of the provider's `TOP_GAINERS_LOSERS` lists. Unmodelled fields
/// are kept in `extra`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Mover {
    pub ticker: String,
    pub price: String,
    #[serde(default)]
    pub change_amount: String,
    pub change_percentage: String,
    #[serde(default)]
    pub volume: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mover {
    pub fn is_gain(&self) -> bool {
        is_gain(&self.change_percentage)
    }
}

impl From<&Mover> for Stock {
    fn from(mover: &Mover) -> Self {
        Stock::new(&mover.ticker, &mover.price, &mover.change_percentage)
    }
}

fn is_gain(change_percentage: &str) -> bool {
    !change_percentage.starts_with('-')
}

/// `TOP_GAINERS_LOSERS` response. Fields we do not model are kept in `extra`
/// so the payload round-trips as received.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TopMovers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub top_gainers: Vec<Mover>,
    pub top_losers: Vec<Mover>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub most_actively_traded: Vec<Mover>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TopMovers {
    pub fn side(&self, kind: MoverKind) -> &[Mover] {
        match kind {
            MoverKind::Gainers => &self.top_gainers,
            MoverKind::Losers => &self.top_losers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverKind {
    Gainers,
    Losers,
}

impl MoverKind {
    pub fn title(&self) -> &'static str {
        match self {
            MoverKind::Gainers => "Top Gainers",
            MoverKind::Losers => "Top Losers",
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A 1-based page of a longer list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub number: usize,
    pub total_pages: usize,
}

/// Slice page `number` (1-based, [`PAGE_SIZE`] rows) out of `items`.
///
/// Out-of-range pages give `None`; page 1 always exists, even for an empty list.
pub fn paginate<T>(items: &[T], number: usize) -> Option<Page<'_, T>> {
    let total_pages = items.len().div_ceil(PAGE_SIZE);
    if number == 0 || (number > total_pages && number != 1) {
        return None;
    }
    let start = (number - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    Some(Page {
        items: &items[start.min(items.len())..end],
        number,
        total_pages,
    })
}
