//! Collaborator traits at the engine's IO seam.
//!
//! The engine owns all control flow and failure policy; these traits are
//! the narrow interfaces behind which the RPC client, the warehouse
//! client and the checkpoint file live. Implementations perform real IO
//! in the binary crate; tests substitute in-memory fakes.

use crate::{
    CheckpointError, DateWindow, Record, RecordId, SanitizedRecord, SinkError, SourceError,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// One rejected row of a bulk insert, addressed by its index in the
/// submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFailure {
    pub index: usize,
    pub reason: String,
}

/// Paged, time-filtered read access to the remote record service, plus
/// best-effort deletion.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    /// Total records at the source. Diagnostic only.
    async fn count_all(&self) -> Result<u64, SourceError>;

    /// Field names of the replicated model. Only consulted on the
    /// unbounded (full-resync) path.
    async fn field_names(&self) -> Result<Vec<String>, SourceError>;

    /// One page of records ordered by creation time ascending, filtered
    /// to the window when one is given. An empty page signals exhaustion.
    async fn fetch_page(
        &self,
        offset: u64,
        limit: u64,
        window: Option<&DateWindow>,
    ) -> Result<Vec<Record>, SourceError>;

    /// Delete records at the source. Best-effort; the destination is
    /// already consistent when this is called.
    async fn delete_by_ids(&self, ids: &[RecordId]) -> Result<(), SourceError>;
}

/// Bulk-insert access to the warehouse table.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    /// Whether the destination table exists.
    async fn table_exists(&self) -> Result<bool, SinkError>;

    /// Every id currently in the destination table. Full scan; the
    /// destination is expected to stay small enough for this.
    async fn list_all_ids(&self) -> Result<HashSet<RecordId>, SinkError>;

    /// Insert rows with per-row idempotency keys. The destination must
    /// deduplicate repeated keys server-side, so replays of a page whose
    /// response was lost are safe. Returns the rejected rows; an empty
    /// vec means full success.
    async fn bulk_insert(
        &self,
        rows: &[SanitizedRecord],
        insert_ids: &[String],
    ) -> Result<Vec<InsertFailure>, SinkError>;
}

/// Durable storage for the single watermark instant.
#[allow(async_fn_in_trait)]
pub trait CheckpointStore {
    /// The last written watermark, or `None` if never written.
    async fn read(&self) -> Result<Option<DateTime<Utc>>, CheckpointError>;

    /// Persist a new watermark.
    async fn write(&self, watermark: DateTime<Utc>) -> Result<(), CheckpointError>;
}
