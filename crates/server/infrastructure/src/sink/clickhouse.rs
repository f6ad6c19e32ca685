//! ClickHouse event log sink.
//!
//! Talks to the ClickHouse HTTP interface with `INSERT … FORMAT
//! JSONEachRow`, one request per batch. Transport failures map to
//! `SinkError::Unavailable`, any non-success HTTP status to
//! `SinkError::Rejected` (the server parsed the request and refused it).
//! Connection handling is the HTTP client's pool; release happens on every
//! exit path.

use async_trait::async_trait;
use eventline_domain::sink::{EventLogRow, EventLogSink, SinkError};
use std::time::Duration;
use tracing::debug;

/// Configuration for the ClickHouse sink client.
#[derive(Debug, Clone)]
pub struct ClickHouseSinkConfig {
    /// HTTP endpoint, e.g. `http://localhost:8123`
    pub url: String,
    /// Target database
    pub database: String,
    /// Target table
    pub table: String,
    /// Optional credentials
    pub user: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClickHouseSinkConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "default".to_string(),
            table: "event_log".to_string(),
            user: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the ClickHouse event log table.
///
/// No internal retry: the relay retries at whole-cycle granularity.
pub struct ClickHouseEventLogSink {
    config: ClickHouseSinkConfig,
    client: reqwest::Client,
}

impl ClickHouseEventLogSink {
    pub fn new(config: ClickHouseSinkConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn insert_query(&self) -> String {
        format!(
            "INSERT INTO {}.{} (event_type, event_date_time, environment, event_context, metadata_version) FORMAT JSONEachRow",
            self.config.database, self.config.table
        )
    }

    /// Encode a batch as newline-separated JSON rows.
    fn encode_rows(rows: &[EventLogRow]) -> String {
        rows.iter()
            .map(encode_row)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn encode_row(row: &EventLogRow) -> String {
    serde_json::json!({
        "event_type": row.event_type,
        "event_date_time": row.event_date_time.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        "environment": row.environment,
        "event_context": row.event_context,
        "metadata_version": row.metadata_version,
    })
    .to_string()
}

#[async_trait]
impl EventLogSink for ClickHouseEventLogSink {
    async fn insert(&self, rows: &[EventLogRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let body = Self::encode_rows(rows);
        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("query", self.insert_query())])
            .body(body);

        if let Some(user) = &self.config.user {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.config.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected(format!(
                "{}: {}",
                status,
                detail.trim()
            )));
        }

        debug!(row_count = rows.len(), "Inserted batch into ClickHouse");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> EventLogRow {
        EventLogRow {
            event_type: "user_created".to_string(),
            event_date_time: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap(),
            environment: "test".to_string(),
            event_context: r#"{"email":"test@email.com"}"#.to_string(),
            metadata_version: 1,
        }
    }

    #[test]
    fn insert_query_targets_configured_table() {
        let sink = ClickHouseEventLogSink::new(ClickHouseSinkConfig {
            database: "analytics".to_string(),
            table: "events".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            sink.insert_query(),
            "INSERT INTO analytics.events (event_type, event_date_time, environment, event_context, metadata_version) FORMAT JSONEachRow"
        );
    }

    #[test]
    fn encode_rows_is_one_json_object_per_line() {
        let encoded = ClickHouseEventLogSink::encode_rows(&[row(), row()]);
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event_type"], "user_created");
        assert_eq!(parsed["event_date_time"], "2024-05-01 12:30:45.000000");
        assert_eq!(parsed["metadata_version"], 1);
        // The context rides along as an encoded string, not a nested object.
        assert_eq!(parsed["event_context"], r#"{"email":"test@email.com"}"#);
    }
}
