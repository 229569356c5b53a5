//! The batch synchronization engine.
//!
//! One run walks four states: bootstrap the destination table check,
//! establish the window and the set of already-replicated ids, drain the
//! source page by page, then summarize and advance the watermark.
//!
//! Failure policy per collaborator:
//! - source fetch failure halts pagination for the run; earlier pages
//!   stay committed
//! - a hard sink failure abandons the current page only
//! - per-row sink failures are reconciled by index: only the complement
//!   is marked synced (and deleted, when deletion is enabled)
//! - checkpoint and deletion failures are logged, never fatal

use crate::sanitize::sanitize_record;
use crate::window::{effective_window, run_watermark};
use crate::{
    Checkpoint, CheckpointStore, CreateTableSql, Record, RecordId, RecordSink, RecordSource,
    Result, RunStats, SanitizedRecord, TableId,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{info, warn};

/// Hard cap on fetch calls per run. Beyond it the operator reruns to
/// continue, which keeps a single run from monopolizing the source.
pub const MAX_PAGES_PER_RUN: u32 = 100;

/// How many per-row failure reasons to log before eliding the rest.
const LOGGED_FAILURES_PER_PAGE: usize = 10;

/// Tunables for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Source model identifier; also the idempotency-key prefix.
    pub model: String,
    /// Destination table.
    pub table: TableId,
    /// Page size for source fetches.
    pub batch_limit: u64,
    /// Trailing safety margin subtracted from `now`.
    pub buffer_minutes: i64,
    /// Window lookback; `None` means full-table resync.
    pub lookback_days: Option<i64>,
    /// Delete confirmed-synced records from the source.
    pub delete_after_sync: bool,
    /// Fetch-call cap for this run.
    pub max_pages: u32,
}

impl SyncOptions {
    pub fn new(model: impl Into<String>, table: TableId) -> Self {
        Self {
            model: model.into(),
            table,
            batch_limit: 1000,
            buffer_minutes: 2,
            lookback_days: None,
            delete_after_sync: false,
            max_pages: MAX_PAGES_PER_RUN,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Draining finished; counters describe what happened.
    Completed(RunStats),
    /// The destination table is missing; here is the DDL to create it.
    /// Nothing was synced.
    SchemaRequired(CreateTableSql),
    /// The destination table is missing and the source has no record to
    /// infer a schema from.
    SchemaUnavailable,
}

/// The engine: owns the three collaborators for the duration of a run.
pub struct SyncEngine<S, D, C> {
    source: S,
    sink: D,
    checkpoint: C,
    options: SyncOptions,
}

impl<S, D, C> SyncEngine<S, D, C>
where
    S: RecordSource,
    D: RecordSink,
    C: CheckpointStore,
{
    pub fn new(source: S, sink: D, checkpoint: C, options: SyncOptions) -> Self {
        Self {
            source,
            sink,
            checkpoint,
            options,
        }
    }

    /// Give the collaborators back, e.g. to inspect them after a run.
    pub fn into_parts(self) -> (S, D, C) {
        (self.source, self.sink, self.checkpoint)
    }

    /// Execute one full run at the given instant.
    ///
    /// Only setup failures (table check, id scan, sample fetch) propagate;
    /// everything after the first page fetch degrades to counters and logs.
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<SyncOutcome> {
        info!(
            model = %self.options.model,
            table = %self.options.table,
            batch_limit = self.options.batch_limit,
            lookback_days = ?self.options.lookback_days,
            delete_after_sync = self.options.delete_after_sync,
            "starting sync run"
        );

        if !self.sink.table_exists().await? {
            return self.bootstrap_schema().await;
        }

        let window = self.prepare_window(now).await;
        let mut existing = self.load_existing_ids().await?;
        info!(existing = existing.len(), "loaded destination id set");

        if window.is_none() && !self.check_model_fields().await {
            // Full-resync mode with no readable field list: the legacy
            // unbounded path refuses to guess at the model shape.
            return Ok(SyncOutcome::Completed(RunStats::default()));
        }

        match self.source.count_all().await {
            Ok(total) => info!(total, "source record count"),
            Err(err) => warn!(%err, "source count unavailable"),
        }

        let mut stats = RunStats::default();
        self.drain(window.as_ref(), &mut existing, &mut stats).await;

        let watermark = run_watermark(now, window.as_ref(), self.options.buffer_minutes);
        if let Err(err) = self.checkpoint.write(watermark).await {
            warn!(%err, "failed to persist checkpoint; next run reuses the old watermark");
        } else {
            info!(%watermark, "checkpoint advanced");
        }

        info!("{}", stats.status_line());
        Ok(SyncOutcome::Completed(stats))
    }

    /// The destination table does not exist: infer DDL from one sample
    /// record and stop without writing anything.
    async fn bootstrap_schema(&mut self) -> Result<SyncOutcome> {
        warn!(table = %self.options.table, "destination table not found");
        let sample = self.source.fetch_page(0, 1, None).await?;
        let Some(record) = sample.first() else {
            warn!("source has no records to infer a schema from");
            return Ok(SyncOutcome::SchemaUnavailable);
        };
        let ddl = CreateTableSql::from_sample(self.options.table.clone(), record);
        info!(
            columns = ddl.columns.len(),
            "generated CREATE TABLE statement; create the table and rerun"
        );
        Ok(SyncOutcome::SchemaRequired(ddl))
    }

    /// Read the watermark (for the record) and compute the run window.
    async fn prepare_window(&mut self, now: DateTime<Utc>) -> Option<crate::DateWindow> {
        let last_synced = match self.checkpoint.read().await {
            Ok(Some(watermark)) => watermark,
            Ok(None) => Checkpoint::default_watermark(now),
            Err(err) => {
                warn!(%err, "checkpoint unreadable; assuming the default watermark");
                Checkpoint::default_watermark(now)
            }
        };
        info!(%last_synced, "last confirmed watermark");

        let window = effective_window(now, self.options.lookback_days, self.options.buffer_minutes);
        match &window {
            Some(window) => info!(from = %window.from, to = %window.to, "sync window"),
            None => info!("no lookback configured; syncing all records"),
        }
        window
    }

    async fn load_existing_ids(&mut self) -> Result<HashSet<RecordId>> {
        match self.sink.list_all_ids().await {
            Ok(ids) => Ok(ids),
            Err(err) => {
                // The scan fails on an empty table in some warehouses;
                // idempotency keys still protect the run.
                warn!(%err, "could not scan destination ids; deduplicating by insert id only");
                Ok(HashSet::new())
            }
        }
    }

    /// Legacy full-resync diagnostic: confirm the model exposes fields.
    async fn check_model_fields(&mut self) -> bool {
        match self.source.field_names().await {
            Ok(fields) if fields.is_empty() => {
                warn!(model = %self.options.model, "model exposes no fields, aborting");
                false
            }
            Ok(fields) => {
                info!(fields = fields.len(), "model field list fetched");
                true
            }
            Err(err) => {
                warn!(%err, "field list unavailable, continuing");
                true
            }
        }
    }

    /// Fetch, deduplicate, sanitize, insert and reconcile page after page.
    async fn drain(
        &mut self,
        window: Option<&crate::DateWindow>,
        existing: &mut HashSet<RecordId>,
        stats: &mut RunStats,
    ) {
        let mut offset = 0u64;
        for page_no in 0..self.options.max_pages {
            let page = match self
                .source
                .fetch_page(offset, self.options.batch_limit, window)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(%err, offset, "page fetch failed; halting pagination for this run");
                    break;
                }
            };
            if page.is_empty() {
                info!("no more records to fetch");
                break;
            }

            stats.fetched += page.len() as u64;
            info!(
                page = page_no,
                offset,
                fetched = page.len(),
                total_fetched = stats.fetched,
                "fetched page"
            );

            let new_records = self.partition_new(page, existing, stats);
            if !new_records.is_empty() {
                self.insert_page(&new_records, existing, stats).await;
            }

            offset += self.options.batch_limit;
            if page_no + 1 == self.options.max_pages {
                warn!(
                    max_pages = self.options.max_pages,
                    "reached the per-run page safety cap; rerun to continue"
                );
            }
        }
    }

    /// Split a page into already-synced duplicates (counted, discarded)
    /// and new records paired with their ids.
    fn partition_new(
        &self,
        page: Vec<Record>,
        existing: &HashSet<RecordId>,
        stats: &mut RunStats,
    ) -> Vec<(RecordId, Record)> {
        let mut new_records = Vec::with_capacity(page.len());
        for record in page {
            match record.id() {
                Some(id) if existing.contains(&id) => stats.skipped_duplicates += 1,
                Some(id) => new_records.push((id, record)),
                None => {
                    warn!("record without an integer id field; counting as failed");
                    stats.failed += 1;
                }
            }
        }
        if stats.skipped_duplicates > 0 {
            info!(skipped = stats.skipped_duplicates, "duplicates skipped so far");
        }
        new_records
    }

    /// Bulk-insert one page of new records and reconcile the outcome.
    async fn insert_page(
        &mut self,
        new_records: &[(RecordId, Record)],
        existing: &mut HashSet<RecordId>,
        stats: &mut RunStats,
    ) {
        let rows: Vec<SanitizedRecord> = new_records
            .iter()
            .map(|(_, record)| sanitize_record(record))
            .collect();
        let insert_ids: Vec<String> = new_records
            .iter()
            .map(|(id, _)| format!("{}_{}", self.options.model, id))
            .collect();

        info!(rows = rows.len(), "inserting records");
        let failures = match self.sink.bulk_insert(&rows, &insert_ids).await {
            Ok(failures) => failures,
            Err(err) => {
                // The whole call failed: nothing is confirmed, so nothing
                // is marked synced or deleted. Move on to the next page.
                warn!(%err, "bulk insert failed; abandoning this page");
                return;
            }
        };

        let failed_indices: HashSet<usize> = failures.iter().map(|f| f.index).collect();
        for failure in failures.iter().take(LOGGED_FAILURES_PER_PAGE) {
            let record_id = new_records.get(failure.index).map(|(id, _)| *id);
            warn!(index = failure.index, record_id, reason = %failure.reason, "row rejected");
        }
        if failures.len() > LOGGED_FAILURES_PER_PAGE {
            warn!(elided = failures.len() - LOGGED_FAILURES_PER_PAGE, "more rows rejected");
        }

        let succeeded: Vec<RecordId> = new_records
            .iter()
            .enumerate()
            .filter(|(index, _)| !failed_indices.contains(index))
            .map(|(_, (id, _))| *id)
            .collect();

        stats.inserted += succeeded.len() as u64;
        stats.failed += failed_indices.len() as u64;
        existing.extend(succeeded.iter().copied());

        if failed_indices.is_empty() {
            info!(inserted = succeeded.len(), "page fully inserted");
        } else {
            warn!(
                inserted = succeeded.len(),
                failed = failed_indices.len(),
                "page partially inserted"
            );
        }

        if self.options.delete_after_sync && !succeeded.is_empty() {
            match self.source.delete_by_ids(&succeeded).await {
                Ok(()) => {
                    stats.deleted += succeeded.len() as u64;
                    info!(deleted = succeeded.len(), "synced records deleted from source");
                }
                Err(err) => {
                    // Destination state is already consistent; the rows
                    // simply remain at the source.
                    warn!(%err, "failed to delete synced records from source");
                }
            }
        }
    }
}
