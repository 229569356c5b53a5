//! Checkpoint stores: a local JSON file or a GCS object.
//!
//! Both persist the same single-object document
//! (`{"last_synced": "<ISO-8601>"}`); the execution mode picks which
//! one backs the run.

use convey_engine::{Checkpoint, CheckpointError, CheckpointStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::PathBuf;

const GCS_BASE: &str = "https://storage.googleapis.com/storage/v1";
const GCS_UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Checkpoint in a local JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CheckpointStore for FileStore {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, CheckpointError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CheckpointError::Read(err.to_string())),
        };
        let checkpoint: Checkpoint =
            serde_json::from_str(&raw).map_err(|err| CheckpointError::Read(err.to_string()))?;
        Ok(Some(checkpoint.last_synced))
    }

    async fn write(&self, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        let body = serde_json::to_string(&Checkpoint::new(watermark))
            .map_err(|err| CheckpointError::Write(err.to_string()))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|err| CheckpointError::Write(err.to_string()))
    }
}

/// Checkpoint in a GCS object, for cloud runs with no durable disk.
pub struct GcsStore {
    http: reqwest::Client,
    bucket: String,
    object: String,
    token: String,
}

impl GcsStore {
    pub fn new(bucket: String, object: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bucket,
            object,
            token,
        }
    }
}

impl CheckpointStore for GcsStore {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, CheckpointError> {
        let url = format!(
            "{GCS_BASE}/b/{}/o/{}?alt=media",
            self.bucket, self.object
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| CheckpointError::Read(err.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|err| CheckpointError::Read(err.to_string()))?;
        let checkpoint: Checkpoint = response
            .json()
            .await
            .map_err(|err| CheckpointError::Read(err.to_string()))?;
        Ok(Some(checkpoint.last_synced))
    }

    async fn write(&self, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        let url = format!(
            "{GCS_UPLOAD_BASE}/b/{}/o?uploadType=media&name={}",
            self.bucket, self.object
        );
        let body: Value = serde_json::to_value(Checkpoint::new(watermark))
            .map_err(|err| CheckpointError::Write(err.to_string()))?;
        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|err| CheckpointError::Write(err.to_string()))?
            .error_for_status()
            .map_err(|err| CheckpointError::Write(err.to_string()))?;
        Ok(())
    }
}

/// The store chosen by execution mode.
pub enum CheckpointBackend {
    File(FileStore),
    Gcs(GcsStore),
}

impl CheckpointStore for CheckpointBackend {
    async fn read(&self) -> Result<Option<DateTime<Utc>>, CheckpointError> {
        match self {
            CheckpointBackend::File(store) => store.read().await,
            CheckpointBackend::Gcs(store) => store.read().await,
        }
    }

    async fn write(&self, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        match self {
            CheckpointBackend::File(store) => store.write(watermark).await,
            CheckpointBackend::Gcs(store) => store.write(watermark).await,
        }
    }
}
