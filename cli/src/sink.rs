//! BigQuery REST client implementing the engine's record sink.
//!
//! Three API surfaces, nothing more: `tables.get` for the existence
//! check, `jobs.query` for the full id scan, and `tabledata.insertAll`
//! for bulk writes. `insertAll` deduplicates server-side by `insertId`,
//! which is what makes page replays safe.

use convey_engine::{InsertFailure, RecordId, RecordSink, SanitizedRecord, SinkError, TableId};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashSet;

const BIGQUERY_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// How long one `jobs.query` call may run before it counts as a failure.
const QUERY_TIMEOUT_MS: u64 = 30_000;

pub struct BigQuerySink {
    http: reqwest::Client,
    table: TableId,
    token: String,
}

impl BigQuerySink {
    pub fn new(table: TableId, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            table,
            token,
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{BIGQUERY_BASE}/projects/{}/datasets/{}/tables/{}",
            self.table.project, self.table.dataset, self.table.table
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value, SinkError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| SinkError::Unavailable(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| SinkError::Malformed(err.to_string()))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, SinkError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| SinkError::Unavailable(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| SinkError::Malformed(err.to_string()))
    }
}

/// Extract ids from one page of query results.
fn parse_query_ids(page: &Value, ids: &mut HashSet<RecordId>) -> Result<(), SinkError> {
    let Some(rows) = page.get("rows").and_then(Value::as_array) else {
        // A table with zero rows answers without a rows field.
        return Ok(());
    };
    for row in rows {
        let cell = row
            .pointer("/f/0/v")
            .and_then(Value::as_str)
            .ok_or_else(|| SinkError::Malformed("query row without an id cell".to_string()))?;
        let id = cell
            .parse()
            .map_err(|_| SinkError::Malformed(format!("non-integer id in destination: {cell}")))?;
        ids.insert(id);
    }
    Ok(())
}

/// Map an `insertAll` response to per-row failures.
fn parse_insert_errors(response: &Value) -> Result<Vec<InsertFailure>, SinkError> {
    let Some(errors) = response.get("insertErrors").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    errors
        .iter()
        .map(|entry| {
            let index = entry
                .get("index")
                .and_then(Value::as_u64)
                .ok_or_else(|| SinkError::Malformed("insert error without index".to_string()))?;
            let reason = entry
                .get("errors")
                .and_then(Value::as_array)
                .map(|details| {
                    details
                        .iter()
                        .filter_map(|detail| {
                            let reason = detail.get("reason").and_then(Value::as_str)?;
                            let message =
                                detail.get("message").and_then(Value::as_str).unwrap_or("");
                            Some(format!("{reason}: {message}"))
                        })
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            Ok(InsertFailure {
                index: index as usize,
                reason,
            })
        })
        .collect()
}

impl RecordSink for BigQuerySink {
    async fn table_exists(&self) -> Result<bool, SinkError> {
        let response = self
            .http
            .get(self.table_url())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(SinkError::Unavailable(format!(
                "table lookup returned {status}"
            ))),
        }
    }

    async fn list_all_ids(&self) -> Result<HashSet<RecordId>, SinkError> {
        let url = format!("{BIGQUERY_BASE}/projects/{}/queries", self.table.project);
        let body = json!({
            "query": format!("SELECT id FROM `{}`", self.table),
            "useLegacySql": false,
            "timeoutMs": QUERY_TIMEOUT_MS,
        });
        let mut page = self.post_json(&url, &body).await?;
        if page.get("jobComplete").and_then(Value::as_bool) == Some(false) {
            return Err(SinkError::Unavailable("id scan query timed out".to_string()));
        }

        let mut ids = HashSet::new();
        parse_query_ids(&page, &mut ids)?;
        let job_id = page
            .pointer("/jobReference/jobId")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Large results arrive in pages; follow the token chain.
        while let Some(token) = page.get("pageToken").and_then(Value::as_str) {
            let job_id = job_id
                .as_deref()
                .ok_or_else(|| SinkError::Malformed("paged result without jobId".to_string()))?;
            let next = format!(
                "{BIGQUERY_BASE}/projects/{}/queries/{job_id}?pageToken={token}",
                self.table.project
            );
            page = self.get_json(&next).await?;
            parse_query_ids(&page, &mut ids)?;
        }
        Ok(ids)
    }

    async fn bulk_insert(
        &self,
        rows: &[SanitizedRecord],
        insert_ids: &[String],
    ) -> Result<Vec<InsertFailure>, SinkError> {
        let payload_rows: Vec<Value> = rows
            .iter()
            .zip(insert_ids)
            .map(|(row, insert_id)| json!({"insertId": insert_id, "json": row}))
            .collect();
        let body = json!({
            "kind": "bigquery#tableDataInsertAllRequest",
            "rows": payload_rows,
        });
        let url = format!("{}/insertAll", self.table_url());
        let response = self.post_json(&url, &body).await?;
        parse_insert_errors(&response)
    }
}
