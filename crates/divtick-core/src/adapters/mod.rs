pub mod polygon;

use std::future::Future;
use std::pin::Pin;

use crate::date_range::FetchWindow;
use crate::normalize::RawDividend;
use crate::{IngestError, Symbol};

pub use polygon::PolygonDividendSource;

/// Market-data provider of raw dividend entries.
///
/// Implementations must consult the shared rate budget before each network
/// call and fail fast when it is exhausted.
pub trait DividendSource: Send + Sync {
    /// Tag stored as each record's `data_source`.
    fn source_tag(&self) -> &'static str;

    fn fetch<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: &'a FetchWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawDividend>, IngestError>> + Send + 'a>>;
}
