//! # Convey Engine
//!
//! The batch replication engine behind Convey.
//!
//! This crate holds the core logic for incrementally replicating records
//! from a paged remote source into an analytical warehouse table:
//! pagination, duplicate suppression, sanitization, partial-failure
//! reconciliation, optional source deletion, and watermark checkpointing.
//!
//! ## Design Principles
//!
//! - **No IO**: all network and file access happens behind the adapter
//!   traits in [`adapter`]; the engine only decides what to do next
//! - **Sequential**: one page is fully fetched, deduplicated, inserted
//!   and reconciled before the next fetch begins
//! - **Forward progress over strict consistency**: a failing page or a
//!   failing delete never blocks later pages; idempotency keys make
//!   replays safe
//!
//! ## Core Concepts
//!
//! ### Records and Scalars
//!
//! Source records are dynamically typed ([`Record`], backed by
//! `serde_json::Value` fields). The destination only accepts the scalar
//! subset ([`Scalar`]: null, integer, float, string). The sanitizer in
//! [`sanitize`] is the single total conversion between the two.
//!
//! ### The ExistingIdSet
//!
//! Ids already present at the destination are scanned once per run and
//! grown as inserts succeed. The set is never persisted; it is rebuilt
//! from the destination at every run start, which is what makes replays
//! and lost checkpoints safe.
//!
//! ### Windows and the Checkpoint
//!
//! A run is bounded by an optional [`DateWindow`] whose upper bound
//! always trails `now` by a buffer, so in-flight source writes are never
//! raced. When draining completes the [`Checkpoint`] watermark advances
//! to the window's upper bound.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use convey_engine::{SyncEngine, SyncOptions, SyncOutcome, TableId};
//!
//! let table = TableId::parse("proj.sales.orders")?;
//! let options = SyncOptions::new("sale.order", table);
//! let mut engine = SyncEngine::new(source, sink, checkpoint, options);
//!
//! match engine.run(chrono::Utc::now()).await? {
//!     SyncOutcome::Completed(stats) => println!("{stats}"),
//!     SyncOutcome::SchemaRequired(ddl) => println!("{}", ddl.formatted()),
//!     SyncOutcome::SchemaUnavailable => eprintln!("no sample record"),
//! }
//! ```

pub mod adapter;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod sanitize;
pub mod schema;
pub mod stats;
pub mod value;
pub mod window;

// Re-export main types at crate root
pub use adapter::{CheckpointStore, InsertFailure, RecordSink, RecordSource};
pub use checkpoint::Checkpoint;
pub use engine::{SyncEngine, SyncOptions, SyncOutcome, MAX_PAGES_PER_RUN};
pub use error::{CheckpointError, Error, Result, SinkError, SourceError};
pub use sanitize::{sanitize_record, sanitize_value};
pub use schema::{infer_field_type, CreateTableSql, FieldType, InvalidTableId, TableId};
pub use stats::RunStats;
pub use value::{Record, SanitizedRecord, Scalar};
pub use window::{effective_window, run_watermark, DateWindow};

/// Type aliases for clarity
pub type RecordId = i64;
pub type FieldName = String;
