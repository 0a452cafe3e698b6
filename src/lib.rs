//! Telegram Chat History Importer Library
//!
//! This library provides tools to:
//! - Read a Telegram Desktop chat export (`result.json`)
//! - Extract media-bearing messages into flat records for a media library
//! - Push those records in throttled batches to a remote `/api/import` endpoint

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod upload;

// Re-export common types
pub use config::{ConfigOverrides, ImportConfig};
pub use error::{Error, Result};
pub use export::{load_export, ChatExport, MessageText, RawMessage, TextFragment};
pub use extract::{extract_media, ExtractStats, Extraction, ImportTarget, MediaKind, MediaRecord};
pub use upload::{
    BatchOutcome, BatchTransport, ImportClient, UploadReport, UploadSettings, Uploader,
};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
