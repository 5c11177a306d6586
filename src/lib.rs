//! # fx-ingest
//!
//! Daily FX rate snapshot ingestion: fetch historical snapshots from Open
//! Exchange Rates for a window of past dates and a set of base currencies,
//! write one newline-delimited JSON blob per (date, base) into object
//! storage, and trigger a single BigQuery load covering every written path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fx_ingest::prelude::*;
//!
//! # async fn ingest() -> fx_ingest::error::Result<()> {
//! let config = IngestConfig::load(None)?;
//! let provider = OpenExchangeRatesClient::new(config.app_id.clone())?;
//! let store = GcsBlobStore::new(config.bucket.clone(), config.token.clone())?;
//! let loader = BigQueryLoader::new(config.project.clone(), config.token.clone())?;
//!
//! Pipeline::new(provider, store, loader, config).run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod rates;
pub mod scheduler;
pub mod storage;
pub mod warehouse;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::IngestConfig;
    pub use crate::error::{IngestError, Result};
    pub use crate::provider::{OpenExchangeRatesClient, RateProvider};
    pub use crate::rates::{ExchangeRate, RawSnapshot};
    pub use crate::scheduler::{blob_path, fetch_and_serialize, window, Pipeline};
    pub use crate::storage::{BlobStore, FsBlobStore, GcsBlobStore, MemoryBlobStore};
    pub use crate::warehouse::{exchange_rate_schema, BigQueryLoader, TableSchema, WarehouseLoader};
}
