//! Read-only access to the BigQuery dataset backing the property analyzer.
//!
//! Queries go through the REST `jobs.query` endpoint. Requests carry
//! Application Default Credentials unless a static bearer token overrides them.
//! Writes are blocked: only a single `SELECT` / `WITH` statement is accepted.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use google_cloud_auth::credentials::{self, CacheableResource, Credentials};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::WarehouseSettings;
use crate::error::LookupError;

const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

#[derive(Debug, Clone, Deserialize)]
struct TableFieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Value,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    schema: TableSchema,
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(default)]
    job_complete: bool,
    total_rows: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    table_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableListEntry {
    table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    tables: Vec<TableListEntry>,
}

/// Tabular query result with rows keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub total_rows: u64,
}

/// Reject anything other than one read-only statement.
///
/// Semicolons inside quoted literals or identifiers do not count as
/// statement separators.
pub fn ensure_read_only(sql: &str) -> Result<(), LookupError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(LookupError::config("Empty SQL query"));
    }
    if has_unquoted_semicolon(trimmed) {
        return Err(LookupError::config(
            "Write operations are blocked: multiple statements are not allowed",
        ));
    }
    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('(')
        .to_ascii_uppercase();
    match first.as_str() {
        "SELECT" | "WITH" => Ok(()),
        other => Err(LookupError::config(format!(
            "Write operations are blocked: {} statements are not allowed",
            other
        ))),
    }
}

fn has_unquoted_semicolon(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in sql.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None if c == ';' => return true,
            None => {}
        }
    }
    false
}

/// How outgoing warehouse requests are authorized.
#[derive(Clone)]
enum Auth {
    /// `BIGQUERY_ACCESS_TOKEN` override.
    Token(String),
    Adc {
        credentials: Credentials,
        cached: Arc<RwLock<Option<HeaderMap>>>,
    },
    /// Credential discovery failed when the client was built.
    Unavailable(String),
}

impl Auth {
    fn adc(credentials: Credentials) -> Self {
        Auth::Adc {
            credentials,
            cached: Arc::new(RwLock::new(None)),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Token(_) => f.write_str("Token(<redacted>)"),
            Auth::Adc { .. } => f.write_str("Adc"),
            Auth::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: Client,
    settings: WarehouseSettings,
    auth: Auth,
}

impl BigQueryClient {
    /// Uses the token override when configured, otherwise Application
    /// Default Credentials scoped to BigQuery.
    pub fn new(settings: WarehouseSettings, timeout: u64) -> Result<Self, LookupError> {
        let auth = match settings.access_token.clone() {
            Some(token) => Auth::Token(token),
            None => match credentials::Builder::default()
                .with_scopes([BIGQUERY_SCOPE])
                .build()
            {
                Ok(credentials) => Auth::adc(credentials),
                Err(e) => {
                    warn!("BigQuery credentials unavailable: {}", e);
                    Auth::Unavailable(format!("Error: BigQuery credentials unavailable: {}", e))
                }
            },
        };
        Self::with_auth(settings, timeout, auth)
    }

    /// Authorize with the given credentials, ignoring any token override.
    pub fn with_credentials(
        settings: WarehouseSettings,
        timeout: u64,
        credentials: Credentials,
    ) -> Result<Self, LookupError> {
        Self::with_auth(settings, timeout, Auth::adc(credentials))
    }

    fn with_auth(settings: WarehouseSettings, timeout: u64, auth: Auth) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent("property_analyzer/0.1.0")
            .build()
            .map_err(|e| LookupError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            settings,
            auth,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.settings.project_id
    }

    pub fn dataset_id(&self) -> &str {
        &self.settings.dataset_id
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, LookupError> {
        match &self.auth {
            Auth::Token(token) => Ok(request.bearer_auth(token)),
            Auth::Adc {
                credentials,
                cached,
            } => {
                let resource = credentials.headers(Default::default()).await.map_err(|e| {
                    LookupError::config(format!("Error: BigQuery credentials unavailable: {}", e))
                })?;
                let headers = match resource {
                    CacheableResource::New { data, .. } => {
                        *cached.write().unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
                        data
                    }
                    CacheableResource::NotModified => cached
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone()
                        .ok_or_else(|| {
                            LookupError::config(
                                "Error: BigQuery credentials returned no cached auth headers",
                            )
                        })?,
                };
                Ok(request.headers(headers))
            }
            Auth::Unavailable(message) => Err(LookupError::config(message.clone())),
        }
    }

    fn base(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.project_id
        )
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, LookupError> {
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(LookupError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LookupError::transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                extract_error_message(&text)
            )));
        }
        response.json().await.map_err(LookupError::from_reqwest)
    }

    /// Run a read-only Standard SQL query against the configured dataset.
    pub async fn execute_sql(&self, sql: &str) -> Result<QueryResult, LookupError> {
        ensure_read_only(sql)?;

        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "maxResults": self.settings.max_rows,
            "requestId": Uuid::new_v4().to_string(),
            "defaultDataset": {
                "projectId": self.settings.project_id,
                "datasetId": self.settings.dataset_id,
            },
        });
        info!("Running BigQuery query against {}.{}", self.settings.project_id, self.settings.dataset_id);

        let response: QueryResponse = self
            .send_json(self.client.post(format!("{}/queries", self.base())).json(&body))
            .await?;
        if !response.job_complete {
            return Err(LookupError::transport(
                "query did not complete within the request timeout",
            ));
        }
        Ok(to_result(response))
    }

    pub async fn list_table_ids(&self) -> Result<Vec<String>, LookupError> {
        let url = format!("{}/datasets/{}/tables", self.base(), self.settings.dataset_id);
        let list: TableList = self.send_json(self.client.get(url)).await?;
        Ok(list
            .tables
            .into_iter()
            .map(|t| t.table_reference.table_id)
            .collect())
    }

    /// Table metadata as returned by the API (schema, row count, description).
    pub async fn get_table_info(&self, table_id: &str) -> Result<Value, LookupError> {
        if table_id.is_empty()
            || !table_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LookupError::parse(format!("invalid table id: {:?}", table_id)));
        }
        let url = format!(
            "{}/datasets/{}/tables/{}",
            self.base(),
            self.settings.dataset_id,
            table_id
        );
        let info: Value = self.send_json(self.client.get(url)).await?;
        Ok(json!({
            "table_id": table_id,
            "schema": info.get("schema").cloned().unwrap_or(Value::Null),
            "num_rows": info.get("numRows").cloned().unwrap_or(Value::Null),
            "description": info.get("description").cloned().unwrap_or(Value::Null),
        }))
    }
}

fn to_result(response: QueryResponse) -> QueryResult {
    let columns: Vec<String> = response.schema.fields.iter().map(|f| f.name.clone()).collect();
    let rows = response
        .rows
        .into_iter()
        .map(|row| {
            response
                .schema
                .fields
                .iter()
                .zip(row.f)
                .map(|(field, cell)| (field.name.clone(), typed_cell(&field.field_type, cell.v)))
                .collect()
        })
        .collect::<Vec<Map<String, Value>>>();
    let total_rows = response
        .total_rows
        .and_then(|t| t.parse().ok())
        .unwrap_or(rows.len() as u64);
    QueryResult {
        columns,
        rows,
        total_rows,
    }
}

/// BigQuery sends every scalar as a string; restore numbers and booleans.
fn typed_cell(field_type: &str, value: Value) -> Value {
    let raw = match value {
        Value::String(raw) => raw,
        other => return other,
    };
    match field_type {
        "INTEGER" | "INT64" => match raw.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(raw),
        },
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => match raw.parse::<f64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(raw),
        },
        "BOOLEAN" | "BOOL" if raw == "true" => Value::Bool(true),
        "BOOLEAN" | "BOOL" if raw == "false" => Value::Bool(false),
        _ => Value::String(raw),
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_guard_accepts_queries() {
        assert!(ensure_read_only("SELECT * FROM safmr_2025 LIMIT 5").is_ok());
        assert!(ensure_read_only("  with t as (select 1) select * from t;").is_ok());
        assert!(ensure_read_only("(SELECT 1)").is_ok());
    }

    #[test]
    fn read_only_guard_blocks_writes() {
        for sql in [
            "DELETE FROM realtor_daat WHERE true",
            "insert into x values (1)",
            "DROP TABLE safmr_2025",
            "SELECT 1; DROP TABLE x",
            "SELECT 'a;b'; DELETE FROM x WHERE true",
            "   ",
        ] {
            let err = ensure_read_only(sql).unwrap_err();
            assert_eq!(err.kind(), "config", "{sql}");
        }
    }

    #[test]
    fn semicolons_inside_literals_are_not_separators() {
        assert!(ensure_read_only("SELECT 'a;b'").is_ok());
        assert!(ensure_read_only(r#"SELECT "x;y" AS v;"#).is_ok());
        assert!(ensure_read_only("SELECT * FROM `proj.ds.t;x`").is_ok());
        assert!(ensure_read_only(r"SELECT 'it\'s; fine'").is_ok());
    }

    #[test]
    fn debug_output_hides_the_token_override() {
        let settings = WarehouseSettings {
            access_token: Some("secret-token".into()),
            ..crate::config::Config::default().warehouse
        };
        let client = BigQueryClient::new(settings, 5).unwrap();
        assert!(!format!("{:?}", client).contains("secret-token"));
    }

    #[test]
    fn rows_are_keyed_and_typed() {
        let response: QueryResponse = serde_json::from_value(json!({
            "jobComplete": true,
            "totalRows": "2",
            "schema": {"fields": [
                {"name": "zip_code", "type": "STRING"},
                {"name": "rent", "type": "INTEGER"},
                {"name": "ratio", "type": "FLOAT"}
            ]},
            "rows": [
                {"f": [{"v": "33101"}, {"v": "2150"}, {"v": "0.5"}]},
                {"f": [{"v": "33139"}, {"v": null}, {"v": "x"}]}
            ]
        }))
        .unwrap();
        let result = to_result(response);
        assert_eq!(result.columns, vec!["zip_code", "rent", "ratio"]);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.rows[0]["rent"], json!(2150));
        assert_eq!(result.rows[0]["ratio"], json!(0.5));
        assert_eq!(result.rows[1]["rent"], Value::Null);
        assert_eq!(result.rows[1]["ratio"], json!("x"));
    }

    #[test]
    fn error_message_is_extracted_from_google_error_body() {
        let body = r#"{"error": {"code": 403, "message": "Access Denied"}}"#;
        assert_eq!(extract_error_message(body), "Access Denied");
        assert_eq!(extract_error_message("plain"), "plain");
    }
}
