//! Series loading: fetch, canonicalize, validate.

use super::canonicalize::canonicalize;
use super::provider::{DataError, DataProvider, FetchRequest};
use crate::domain::Series;
use log::{debug, info};

/// Fetch one series from `provider` and build a validated `Series`.
///
/// An empty fetch result, or one where every bar is void, is `MissingData`.
/// There is no fallback source and no retry.
pub fn load_series(
    provider: &dyn DataProvider,
    request: &FetchRequest,
) -> Result<Series, DataError> {
    debug!(
        "loading {} via {} ({} to {}, {})",
        request.symbol,
        provider.name(),
        request.start,
        request.end,
        request.interval
    );
    let fetched = provider.fetch(request)?;
    let received = fetched.bars.len();
    let bars = canonicalize(&fetched.bars)?;

    if bars.is_empty() {
        return Err(request.missing_data());
    }
    info!(
        "{}: {} bars from {:?} ({} received)",
        request.symbol,
        bars.len(),
        fetched.source,
        received
    );

    Series::new(request.symbol.clone(), request.interval, bars)
        .map_err(|e| DataError::ValidationError(e.to_string()))
}
