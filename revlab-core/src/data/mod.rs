//! Data acquisition: providers and series loading

pub mod canonicalize;
pub mod csv_import;
pub mod loader;
pub mod provider;
pub mod yahoo;

pub use csv_import::CsvProvider;
pub use canonicalize::{canonicalize, Canonicalizer};
pub use loader::load_series;
pub use provider::{DataError, DataProvider, DataSource, FetchRequest, FetchResult, RawBar};
pub use yahoo::YahooProvider;
