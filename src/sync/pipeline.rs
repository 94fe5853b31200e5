// src/sync/pipeline.rs

use anyhow::{Context, Result};
use std::path::Path;
use tokio::task;
use tracing::{info, instrument, warn};

use super::upload::upload_batches;
use crate::config::SyncOptions;
use crate::fetch::{fetch_existing_ids, TableStore};
use crate::process::{classify_rows, open_source};
use crate::report::RunStats;

/// One run: decode the export, snapshot the stored ids, filter, upload.
///
/// Only an unreadable source or a failed first id page abort the run; batch
/// failures end up in the returned counters.
#[instrument(level = "info", skip(store, source, opts), fields(export = %source.display()))]
pub async fn run_sync<S: TableStore>(
    store: &S,
    source: &Path,
    opts: &SyncOptions,
) -> Result<RunStats> {
    // decode first so a bad export never reaches the remote store
    let path = source.to_path_buf();
    let rows = task::spawn_blocking(move || open_source(&path))
        .await
        .context("source reader task failed")??;
    info!(encoding = %rows.encoding(), "source ready");

    let existing = fetch_existing_ids(store, opts.page_size).await?;
    if !existing.complete {
        warn!(
            known = existing.ids.len(),
            "existing-id snapshot is partial, some duplicates may be re-inserted"
        );
    }

    let mut stats = RunStats::default();
    let records = classify_rows(rows, &existing.ids, &mut stats)?;

    let tally = upload_batches(store, &records, opts.batch_size, opts.batch_pause).await;
    stats.inserted_count = tally.inserted;
    stats.failed_count = tally.failed;

    info!(
        total = stats.total_in_source,
        duplicates = stats.duplicate_count,
        new = stats.new_count,
        inserted = stats.inserted_count,
        failed = stats.failed_count,
        range = %stats.date_range,
        "sync finished"
    );
    Ok(stats)
}
