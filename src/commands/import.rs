//! Import command: export file -> media records -> import endpoint.

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::error::Result;
use crate::export::load_export;
use crate::extract::{extract_media, ExtractStats, MediaRecord};
use crate::upload::{BatchTransport, ImportClient, UploadReport, Uploader};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Extract only; never contact the endpoint.
    pub dry_run: bool,
    /// Write the extracted records here as pretty JSON.
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub extraction: ExtractStats,
    /// `None` when nothing was uploaded (no media, or dry run).
    pub upload: Option<UploadReport>,
}

/// Load, extract and (unless dry run) upload using the HTTP client.
///
/// Endpoint and secret are only checked once there is something to send,
/// so an export without media finishes cleanly without them.
pub async fn run(config: &ImportConfig, options: RunOptions) -> Result<RunSummary> {
    config.validate(false)?;

    let (extraction, records) = prepare(config, &options)?;
    if records.is_empty() || options.dry_run {
        return Ok(RunSummary {
            extraction,
            upload: None,
        });
    }

    config.validate(true)?;
    let client = ImportClient::from_config(config)?;
    info!(endpoint = %client.endpoint(), "Pushing records");
    let report = upload(client, config, &records).await;

    Ok(RunSummary {
        extraction,
        upload: Some(report),
    })
}

/// Same as [`run`] with a caller-supplied transport.
pub async fn run_with<T: BatchTransport>(
    config: &ImportConfig,
    options: RunOptions,
    transport: T,
) -> Result<RunSummary> {
    config.validate(false)?;

    let (extraction, records) = prepare(config, &options)?;
    if records.is_empty() || options.dry_run {
        return Ok(RunSummary {
            extraction,
            upload: None,
        });
    }

    let report = upload(transport, config, &records).await;
    Ok(RunSummary {
        extraction,
        upload: Some(report),
    })
}

fn prepare(
    config: &ImportConfig,
    options: &RunOptions,
) -> Result<(ExtractStats, Vec<MediaRecord>)> {
    info!(path = %config.input.display(), "📦 Reading export");
    let export = load_export(&config.input)?;

    info!(messages = export.messages.len(), "🔍 Scanning messages for media");
    let extraction = extract_media(&export.messages, &config.target());
    let stats = extraction.stats;

    info!(
        scanned = stats.scanned,
        media = stats.emitted,
        non_message = stats.skipped_non_message,
        no_media = stats.skipped_no_media,
        "✅ Extraction finished"
    );
    if stats.skipped_malformed > 0 {
        warn!(
            count = stats.skipped_malformed,
            "⚠️ Skipped messages with an unrecognized shape; the export format may have changed"
        );
    }

    if let Some(path) = &options.dump {
        let content = serde_json::to_string_pretty(&extraction.records)?;
        fs::write(path, content)?;
        info!(path = %path.display(), count = extraction.records.len(), "Saved records");
    }

    if extraction.records.is_empty() {
        warn!("⚠️ No media found in the export; nothing to upload");
    } else if options.dry_run {
        info!(count = extraction.records.len(), "Dry run, skipping upload");
    }

    Ok((stats, extraction.records))
}

async fn upload<T: BatchTransport>(
    transport: T,
    config: &ImportConfig,
    records: &[MediaRecord],
) -> UploadReport {
    let uploader = Uploader::new(transport, config.upload_settings());
    let report = uploader.run(records).await;

    if report.failed_batches.is_empty() {
        info!(uploaded = report.uploaded_records, "🎉 All records pushed");
    } else {
        warn!(
            uploaded = report.uploaded_records,
            total = report.total_records,
            failed_batches = report.failed_batches.len(),
            "Import finished with failed batches"
        );
    }
    report
}
