// src/sync/upload.rs

use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::fetch::TableStore;
use crate::process::NormalizedRecord;

/// Per-run upload counters. `inserted + failed` always equals the number of
/// records handed to [`upload_batches`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadTally {
    pub inserted: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Insert `records` in contiguous batches of at most `batch_size`, pausing
/// between batches. A failed batch is counted in full and never retried;
/// it does not stop the remaining batches.
#[instrument(level = "info", skip(store, records), fields(count = records.len()))]
pub async fn upload_batches<S: TableStore>(
    store: &S,
    records: &[NormalizedRecord],
    batch_size: usize,
    pause: Duration,
) -> UploadTally {
    let mut tally = UploadTally::default();
    if records.is_empty() {
        info!("no new records to upload");
        return tally;
    }

    let batches: Vec<&[NormalizedRecord]> = records.chunks(batch_size.max(1)).collect();
    let total = batches.len();
    info!(batches = total, batch_size, "uploading");

    for (i, batch) in batches.into_iter().enumerate() {
        let n = i + 1;
        match store.batch_create(batch).await {
            Ok(accepted) => {
                let inserted = accepted.min(batch.len());
                let rejected = batch.len() - inserted;
                if rejected > 0 {
                    warn!(batch = n, inserted, rejected, "batch partially accepted");
                } else {
                    info!(batch = n, of = total, inserted, "batch inserted");
                }
                tally.inserted += inserted;
                tally.failed += rejected;
            }
            Err(e) => {
                error!(batch = n, of = total, size = batch.len(), error = %format!("{:#}", e), "batch failed");
                tally.failed += batch.len();
            }
        }
        tally.batches += 1;

        if n < total && !pause.is_zero() {
            sleep(pause).await;
        }
    }

    info!(
        inserted = tally.inserted,
        failed = tally.failed,
        "upload finished"
    );
    tally
}
