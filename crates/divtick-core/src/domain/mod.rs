pub mod models;
pub mod symbol;
pub mod timestamp;

pub use models::{DividendQuery, DividendRecord, FetchMode, Ticker};
pub use symbol::Symbol;
pub use timestamp::{format_date, parse_date, UtcDateTime};
