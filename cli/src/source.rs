//! Odoo JSON-RPC client implementing the engine's record source.
//!
//! Speaks the `call_kw` protocol at the instance's `/jsonrpc` endpoint:
//! `authenticate` once at startup, then `execute_kw` for `search_count`,
//! `fields_get`, `search_read` and `unlink`. Any transport or RPC-level
//! failure surfaces as `SourceError::Unavailable`, which the engine
//! treats as "no data this page".

use convey_engine::{DateWindow, Record, RecordId, RecordSource, SourceError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Odoo expects naive UTC timestamps in its domain filters.
const ODOO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct OdooClient {
    http: reqwest::Client,
    endpoint: String,
    db: String,
    uid: i64,
    password: String,
    model: String,
    next_rpc_id: AtomicU64,
}

impl OdooClient {
    /// Connect and authenticate. Auth failure here is fatal for the run.
    pub async fn connect(
        url: &str,
        db: &str,
        username: &str,
        password: &str,
        model: &str,
    ) -> Result<Self, SourceError> {
        let client = Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/jsonrpc", url.trim_end_matches('/')),
            db: db.to_string(),
            uid: 0,
            password: password.to_string(),
            model: model.to_string(),
            next_rpc_id: AtomicU64::new(1),
        };

        let uid = client
            .call("common", "authenticate", json!([db, username, password, {}]))
            .await?;
        let uid = uid
            .as_i64()
            .filter(|uid| *uid > 0)
            .ok_or_else(|| SourceError::Unavailable("authentication rejected".to_string()))?;

        tracing::info!(uid, db, "authenticated against Odoo");
        Ok(Self { uid, ..client })
    }

    /// One JSON-RPC 2.0 call against the `/jsonrpc` endpoint.
    async fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, SourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {
                "service": service,
                "method": method,
                "args": args,
            },
            "id": self.next_rpc_id.fetch_add(1, Ordering::Relaxed),
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;

        let envelope: Value = response
            .json()
            .await
            .map_err(|err| SourceError::Malformed(err.to_string()))?;
        unwrap_rpc_result(envelope)
    }

    /// `execute_kw` on the configured model.
    async fn execute_kw(
        &self,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, SourceError> {
        self.call(
            "object",
            "execute_kw",
            json!([self.db, self.uid, self.password, self.model, method, args, kwargs]),
        )
        .await
    }
}

/// Pull the `result` out of a JSON-RPC envelope, mapping RPC errors.
fn unwrap_rpc_result(envelope: Value) -> Result<Value, SourceError> {
    if let Some(error) = envelope.get("error") {
        let message = error
            .get("data")
            .and_then(|data| data.get("message"))
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown RPC error");
        return Err(SourceError::Unavailable(message.to_string()));
    }
    match envelope.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(SourceError::Malformed(
            "response carries neither result nor error".to_string(),
        )),
    }
}

/// Translate a date window into an Odoo domain filter on `create_date`.
fn window_domain(window: Option<&DateWindow>) -> Value {
    match window {
        Some(window) => json!([
            ["create_date", ">", window.from.format(ODOO_DATETIME_FORMAT).to_string()],
            ["create_date", "<=", window.to.format(ODOO_DATETIME_FORMAT).to_string()],
        ]),
        None => json!([]),
    }
}

/// Parse a `search_read` result into engine records.
fn parse_records(result: Value) -> Result<Vec<Record>, SourceError> {
    let rows = result
        .as_array()
        .ok_or_else(|| SourceError::Malformed("search_read did not return a list".to_string()))?;
    rows.iter()
        .map(|row| match row {
            Value::Object(fields) => Ok(Record::new(
                fields.iter().map(|(k, v)| (k.clone(), v.clone())),
            )),
            _ => Err(SourceError::Malformed(
                "search_read row is not an object".to_string(),
            )),
        })
        .collect()
}

impl RecordSource for OdooClient {
    async fn count_all(&self) -> Result<u64, SourceError> {
        let result = self
            .execute_kw("search_count", json!([[]]), json!({}))
            .await?;
        result
            .as_u64()
            .ok_or_else(|| SourceError::Malformed("search_count is not a count".to_string()))
    }

    async fn field_names(&self) -> Result<Vec<String>, SourceError> {
        let result = self
            .execute_kw(
                "fields_get",
                json!([]),
                json!({"attributes": ["string", "type"]}),
            )
            .await?;
        let fields = result
            .as_object()
            .ok_or_else(|| SourceError::Malformed("fields_get is not a mapping".to_string()))?;
        Ok(fields.keys().cloned().collect())
    }

    async fn fetch_page(
        &self,
        offset: u64,
        limit: u64,
        window: Option<&DateWindow>,
    ) -> Result<Vec<Record>, SourceError> {
        let result = self
            .execute_kw(
                "search_read",
                json!([window_domain(window)]),
                json!({
                    "limit": limit,
                    "offset": offset,
                    // Oldest first, so a crash mid-run never skips
                    // earlier unsynced data on the next run.
                    "order": "create_date asc",
                }),
            )
            .await?;
        parse_records(result)
    }

    async fn delete_by_ids(&self, ids: &[RecordId]) -> Result<(), SourceError> {
        self.execute_kw("unlink", json!([ids]), json!({})).await?;
        Ok(())
    }
}
