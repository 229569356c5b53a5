//! Convey - incremental Odoo to BigQuery replication.
//!
//! One invocation is one sync run: authenticate against the source,
//! drive the engine's page loop, print the summary, and exit non-zero
//! when any record failed to replicate.

mod checkpoint;
mod config;
mod sink;
mod source;

use crate::checkpoint::{CheckpointBackend, FileStore, GcsStore};
use crate::config::{Config, ConfigError, Environment};
use crate::sink::BigQuerySink;
use crate::source::OdooClient;
use convey_engine::{Error, SyncEngine, SyncOptions, SyncOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] Error),

    #[error(transparent)]
    Source(#[from] convey_engine::SourceError),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convey=info,convey_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // In cloud mode the platform sets environment variables directly;
    // .env is only for local runs.
    if std::env::var("ENVIRONMENT").is_err() {
        if dotenvy::dotenv().is_ok() {
            tracing::info!("loaded configuration from .env file");
        }
    } else {
        tracing::info!("using platform environment variables");
    }

    let exit_code = match run().await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<i32, AppError> {
    let config = Config::from_env()?;
    tracing::info!(
        model = %config.model,
        table = %config.table,
        lookback = ?config.lookback_days,
        delete_after_sync = config.delete_synced,
        batch_limit = config.batch_limit,
        "starting Odoo to BigQuery sync"
    );

    let source = OdooClient::connect(
        &config.odoo_url,
        &config.odoo_db,
        &config.odoo_username,
        &config.odoo_password,
        &config.model,
    )
    .await?;
    let sink = BigQuerySink::new(config.table.clone(), config.oauth_token.clone());
    let checkpoint = build_checkpoint_store(&config);

    let mut options = SyncOptions::new(config.model.clone(), config.table.clone());
    options.batch_limit = config.batch_limit;
    options.buffer_minutes = config.buffer_minutes;
    options.lookback_days = config.lookback_days;
    options.delete_after_sync = config.delete_synced;

    let mut engine = SyncEngine::new(source, sink, checkpoint, options);
    let outcome = engine.run(chrono::Utc::now()).await?;

    match outcome {
        SyncOutcome::Completed(stats) => {
            println!("{:=<70}", "");
            println!("SYNC SUMMARY");
            println!("{:=<70}", "");
            println!("{}", stats.summary(config.delete_synced));
            println!("{:=<70}", "");
            println!("{}", stats.status_line());
            Ok(if stats.is_clean() { 0 } else { 1 })
        }
        SyncOutcome::SchemaRequired(ddl) => {
            println!("{:=<70}", "");
            println!("GENERATED CREATE TABLE SQL");
            println!("{:=<70}", "");
            println!("{}", ddl.formatted());
            println!("{:=<70}", "");
            println!("ONE-LINE VERSION (copy from logs)");
            println!("{:=<70}", "");
            println!("{}", ddl.one_line());
            println!("{:=<70}", "");
            println!("run the statement above, then rerun this job to sync");
            Ok(0)
        }
        SyncOutcome::SchemaUnavailable => {
            eprintln!("destination table is missing and the source has no record to infer a schema from");
            Ok(1)
        }
    }
}

fn build_checkpoint_store(config: &Config) -> CheckpointBackend {
    match (config.environment, &config.gcs_bucket) {
        (Environment::Cloud, Some(bucket)) => CheckpointBackend::Gcs(GcsStore::new(
            bucket.clone(),
            config.state_file.clone(),
            config.oauth_token.clone(),
        )),
        _ => CheckpointBackend::File(FileStore::new(config.state_file.clone())),
    }
}
