//! Configuration management for the sync job.

use convey_engine::{InvalidTableId, TableId};
use std::env;

/// Execution mode: decides where the checkpoint lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Checkpoint in a local JSON file.
    Local,
    /// Checkpoint in a GCS object; credentials come from the platform.
    Cloud,
}

/// Job configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Odoo instance
    pub odoo_url: String,
    /// Odoo database name
    pub odoo_db: String,
    /// Odoo login
    pub odoo_username: String,
    /// Odoo password or API key
    pub odoo_password: String,
    /// Model to replicate (also the idempotency-key prefix)
    pub model: String,
    /// Destination table, dotted project.dataset.table
    pub table: TableId,
    /// Checkpoint file name (local path or GCS object name)
    pub state_file: String,
    /// Source page size
    pub batch_limit: u64,
    /// Trailing buffer in minutes
    pub buffer_minutes: i64,
    /// Lookback in days; None = full-table resync
    pub lookback_days: Option<i64>,
    /// Delete records from Odoo after confirmed replication
    pub delete_synced: bool,
    /// Local or cloud execution mode
    pub environment: Environment,
    /// GCS bucket holding the checkpoint in cloud mode
    pub gcs_bucket: Option<String>,
    /// OAuth bearer token for the BigQuery and GCS REST APIs
    pub oauth_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let odoo_url = required("ODOO_URL")?;
        let odoo_db = required("ODOO_DB")?;
        let odoo_username = required("ODOO_USERNAME")?;
        let odoo_password = required("ODOO_PASSWORD")?;
        let model = env::var("ODOO_MODEL").unwrap_or_else(|_| "sale.order".to_string());
        let table = TableId::parse(&required("BQ_TABLE_ID")?)?;
        let state_file = env::var("STATE_FILE").unwrap_or_else(|_| default_state_file(&model));

        let batch_limit = parse_var("BATCH_LIMIT", 1000)?;
        let buffer_minutes = parse_var("BUFFER_MINUTES", 2)?;
        let lookback_days = parse_lookback(env::var("LOOKBACK_DAYS").ok().as_deref())?;
        let delete_synced = env::var("DELETE_SYNCED_RECORDS")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let environment = match env::var("ENVIRONMENT").as_deref() {
            Ok("cloud") => Environment::Cloud,
            _ => Environment::Local,
        };
        let gcs_bucket = env::var("GCS_BUCKET").ok();
        if environment == Environment::Cloud && gcs_bucket.is_none() {
            return Err(ConfigError::Missing("GCS_BUCKET"));
        }
        let oauth_token = required("GOOGLE_OAUTH_TOKEN")?;

        Ok(Self {
            odoo_url,
            odoo_db,
            odoo_username,
            odoo_password,
            model,
            table,
            state_file,
            batch_limit,
            buffer_minutes,
            lookback_days,
            delete_synced,
            environment,
            gcs_bucket,
            oauth_token,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// `-1` is the documented sentinel for "no lookback, resync everything".
fn parse_lookback(raw: Option<&str>) -> Result<Option<i64>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(-1) => Ok(None),
            Ok(days) if days >= 0 => Ok(Some(days)),
            _ => Err(ConfigError::Invalid {
                name: "LOOKBACK_DAYS",
                value: raw.to_string(),
            }),
        },
    }
}

/// Default checkpoint file name, derived from the model.
fn default_state_file(model: &str) -> String {
    format!("sync_state_{}.json", model.replace('.', "_"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Table(#[from] InvalidTableId),
}
