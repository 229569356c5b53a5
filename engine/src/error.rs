//! Error types for the Convey engine.
//!
//! Each external collaborator gets its own error enum so the engine can
//! apply a different recovery policy per failure kind: a source failure
//! halts pagination, a sink failure abandons one page, a checkpoint
//! failure is logged and ignored.

use thiserror::Error;

/// Failures raised by the record source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connection, authentication or RPC-level failure.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered, but with a payload the adapter cannot use.
    #[error("malformed source response: {0}")]
    Malformed(String),
}

/// Failures raised by the destination sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Connection, authentication or API-level failure.
    #[error("destination unavailable: {0}")]
    Unavailable(String),

    /// The destination answered, but with a payload the adapter cannot use.
    #[error("malformed destination response: {0}")]
    Malformed(String),
}

/// Failures reading or writing the checkpoint.
///
/// Never fatal: a stale or missing watermark only causes redundant source
/// fetches on the next run, which the ExistingIdSet re-skips.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("checkpoint read failed: {0}")]
    Read(String),

    #[error("checkpoint write failed: {0}")]
    Write(String),
}

/// Errors that abort a sync run during setup.
///
/// Only raised before the first page is drained; once pagination starts,
/// failures degrade to skips and counters instead of propagating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
