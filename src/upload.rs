//! Batched upload to the import endpoint
//!
//! Records are split into contiguous batches and POSTed one at a time as
//! `{"data": [...]}`. A failed batch is reported and skipped; there is no
//! retry. Every batch is followed by a fixed pause to stay under the
//! endpoint's rate limit.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ImportConfig, DEFAULT_BATCH_SIZE, DEFAULT_DELAY_MS};
use crate::error::{Error, Result};
use crate::extract::MediaRecord;

/// Request body of the import endpoint.
#[derive(Debug, Serialize)]
pub struct ImportPayload<'a> {
    pub data: &'a [MediaRecord],
}

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// HTTP 200.
    Accepted,
    /// Any other HTTP status; `body` is the response text.
    Rejected { status: u16, body: String },
    /// The request never produced a response (connect error, timeout, ...).
    Transport { message: String },
}

impl BatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BatchOutcome::Accepted)
    }
}

/// Delivers one batch. Implemented over HTTP by [`ImportClient`].
#[allow(async_fn_in_trait)]
pub trait BatchTransport {
    async fn send_batch(&self, batch: &[MediaRecord]) -> BatchOutcome;
}

/// HTTP client for the worker's `/api/import` endpoint.
pub struct ImportClient {
    http: Client,
    endpoint: String,
}

impl ImportClient {
    pub fn new(endpoint: impl Into<String>, admin_secret: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(admin_secret).map_err(|_| {
            Error::InvalidArgument("admin secret contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(concat!("tg_history_import/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConnectionError(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), &config.admin_secret, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BatchTransport for ImportClient {
    async fn send_batch(&self, batch: &[MediaRecord]) -> BatchOutcome {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ImportPayload { data: batch })
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == StatusCode::OK => BatchOutcome::Accepted,
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = describe_body(resp.text().await);
                BatchOutcome::Rejected { status, body }
            }
            Err(e) if e.is_timeout() => BatchOutcome::Transport {
                message: format!("request timed out: {}", e),
            },
            Err(e) => BatchOutcome::Transport {
                message: e.to_string(),
            },
        }
    }
}

/// Response body for a rejected batch, or a marker when it could not be read.
fn describe_body<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    pub batch_size: usize,
    /// Pause after every batch, successful or not.
    pub delay: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Zero-based batch number.
    pub index: usize,
    pub size: usize,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub total_records: usize,
    pub uploaded_records: usize,
    pub batches_attempted: usize,
    pub failed_batches: Vec<BatchFailure>,
}

impl UploadReport {
    pub fn failed_records(&self) -> usize {
        self.failed_batches.iter().map(|f| f.size).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.uploaded_records == self.total_records
    }
}

/// Sends records batch by batch through a [`BatchTransport`].
pub struct Uploader<T> {
    transport: T,
    settings: UploadSettings,
}

impl<T: BatchTransport> Uploader<T> {
    pub fn new(transport: T, settings: UploadSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attempt every batch once, in order.
    pub async fn run(&self, records: &[MediaRecord]) -> UploadReport {
        let total = records.len();
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let mut report = UploadReport {
            total_records: total,
            ..UploadReport::default()
        };

        info!(total, batch_size, batches = batch_count, "Uploading records");

        for (index, batch) in records.chunks(batch_size).enumerate() {
            let outcome = self.transport.send_batch(batch).await;
            report.batches_attempted += 1;

            match &outcome {
                BatchOutcome::Accepted => {
                    report.uploaded_records += batch.len();
                    info!(
                        batch = index + 1,
                        of = batch_count,
                        "🚀 Progress: {}/{} uploaded",
                        report.uploaded_records,
                        total
                    );
                }
                BatchOutcome::Rejected { status, body } => {
                    warn!(batch = index + 1, status, body = %body, "❌ Batch rejected");
                }
                BatchOutcome::Transport { message } => {
                    warn!(batch = index + 1, error = %message, "🔌 Batch request failed");
                }
            }

            if !outcome.is_accepted() {
                report.failed_batches.push(BatchFailure {
                    index,
                    size: batch.len(),
                    outcome,
                });
            }

            if !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        report
    }
}
