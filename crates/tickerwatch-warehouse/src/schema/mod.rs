pub mod detail;
pub mod movers;
pub mod search;

pub use detail::{DataSource, Overview, StockDetail, TimeSeriesPoint};
pub use movers::{paginate, Mover, MoverKind, Page, Stock, TopMovers, PAGE_SIZE};
pub use search::SymbolMatch;
