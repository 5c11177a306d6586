//! Fan-out scheduler
//!
//! Drives the whole run. For each date in the window, most recent first, it
//! spawns one task per base currency; each task fetches, transforms, and
//! writes one blob. All tasks of a date are joined before the next date
//! starts, so at most `|bases|` requests are in flight at any instant.
//! After the final date, exactly one warehouse load covers every written
//! path via the wildcard.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::provider::RateProvider;
use crate::rates::to_ndjson;
use crate::storage::BlobStore;
use crate::warehouse::{exchange_rate_schema, WarehouseLoader};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

/// Dates covered by one run: `from` walking backward one day per step
pub fn window(from: NaiveDate, delta: u32) -> Vec<NaiveDate> {
    (0..delta)
        .filter_map(|i| from.checked_sub_days(Days::new(u64::from(i))))
        .collect()
}

/// Deterministic destination path for one (date, base) unit
///
/// The `.gz` suffix is historical: the payload is uncompressed NDJSON, and
/// the name is preserved so the warehouse wildcard keeps matching.
pub fn blob_path(date: NaiveDate, base: &str) -> String {
    format!("rates/{}/{}/export.json.gz", date.format("%Y/%m/%d"), base)
}

/// Fetch one (date, base) snapshot and serialize it as NDJSON
pub async fn fetch_and_serialize<P: RateProvider>(
    provider: &P,
    date: NaiveDate,
    base: &str,
) -> Result<Vec<u8>> {
    let snapshot = provider.fetch_historical(date, base).await?;
    let records = snapshot.exchange_rates(date)?;
    to_ndjson(&records)
}

/// The ingestion pipeline
///
/// Owns the collaborators and the run configuration; `run` is the only
/// entry point.
pub struct Pipeline<P, S, W> {
    provider: Arc<P>,
    store: Arc<S>,
    loader: W,
    config: IngestConfig,
}

impl<P, S, W> Pipeline<P, S, W>
where
    P: RateProvider + 'static,
    S: BlobStore + 'static,
    W: WarehouseLoader,
{
    pub fn new(provider: P, store: S, loader: W, config: IngestConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            store: Arc::new(store),
            loader,
            config,
        }
    }

    /// Run the full window, then trigger exactly one warehouse load
    ///
    /// The first error aborts the run; blobs already written are left in
    /// place and are not rolled back. A `delta` of zero performs no fetches
    /// and still issues the load.
    pub async fn run(&self) -> Result<()> {
        for date in window(self.config.from, self.config.delta) {
            let mut workers = Vec::with_capacity(self.config.bases.len());
            for base in &self.config.bases {
                let provider = Arc::clone(&self.provider);
                let store = Arc::clone(&self.store);
                let base = base.clone();
                workers.push(tokio::spawn(async move {
                    let payload = fetch_and_serialize(provider.as_ref(), date, &base).await?;
                    let path = blob_path(date, &base);
                    log::info!("{}", path);
                    store.put(&path, payload).await
                }));
            }
            for worker in workers {
                worker
                    .await
                    .map_err(|e| IngestError::Task(format!("ingest worker failed: {}", e)))??;
            }
        }

        let wildcard = format!("gs://{}/rates/*", self.config.bucket);
        self.loader
            .load(
                &wildcard,
                &self.config.dataset,
                &self.config.table,
                &exchange_rate_schema(),
            )
            .await
    }
}
