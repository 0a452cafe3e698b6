//! Media extraction
//!
//! Turns exported messages into flat [`MediaRecord`]s for the import API.
//! Messages without media are dropped; nothing here fails on a single
//! malformed message, it is counted instead.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::export::RawMessage;

/// Captions longer than this are hard-cut (counted in chars, not bytes).
pub const MAX_CAPTION_CHARS: usize = 100;

/// Prefix of synthesized `file_unique_id` values.
pub const UNIQUE_ID_PREFIX: &str = "import";

const MESSAGE_KIND: &str = "message";

/// Destination chat and category shared by every record of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub chat_id: i64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Document,
}

impl MediaKind {
    /// Classify a message by its media keys; `None` means no media.
    pub fn detect(msg: &RawMessage) -> Option<Self> {
        if msg.photo.is_some() {
            return Some(MediaKind::Photo);
        }
        msg.media_type.as_ref().map(|v| match v.as_str() {
            Some("video_file") => MediaKind::Video,
            Some("animation") => MediaKind::Animation,
            _ => MediaKind::Document,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Animation => "animation",
            MediaKind::Document => "document",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row for the remote media library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRecord {
    pub message_id: i64,
    pub chat_id: i64,
    pub topic_id: Option<i64>,
    pub category_name: String,
    pub file_unique_id: String,
    pub file_id: String,
    pub media_type: MediaKind,
    pub caption: String,
}

impl MediaRecord {
    pub fn new(
        message_id: i64,
        target: &ImportTarget,
        media_type: MediaKind,
        caption: &str,
    ) -> Self {
        Self {
            message_id,
            chat_id: target.chat_id,
            topic_id: None,
            category_name: target.category.clone(),
            file_unique_id: synth_unique_id(target.chat_id, message_id),
            file_id: String::new(),
            media_type,
            caption: truncate_chars(caption, MAX_CAPTION_CHARS),
        }
    }
}

/// Exports carry no real file ids; this one is stable across re-runs so the
/// receiving store can de-duplicate on it.
pub fn synth_unique_id(chat_id: i64, message_id: i64) -> String {
    format!("{}_{}_{}", UNIQUE_ID_PREFIX, chat_id, message_id)
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Counters for one extraction pass.
///
/// `scanned == emitted + skipped_non_message + skipped_no_media + skipped_malformed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub scanned: usize,
    pub emitted: usize,
    pub skipped_non_message: usize,
    pub skipped_no_media: usize,
    pub skipped_malformed: usize,
}

impl ExtractStats {
    pub fn skipped(&self) -> usize {
        self.skipped_non_message + self.skipped_no_media + self.skipped_malformed
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<MediaRecord>,
    pub stats: ExtractStats,
}

enum Verdict {
    Emit(MediaRecord),
    NotMessage,
    NoMedia,
    Malformed,
}

fn classify(msg: &RawMessage, target: &ImportTarget) -> Verdict {
    if msg.kind.as_deref() != Some(MESSAGE_KIND) {
        return Verdict::NotMessage;
    }
    let Some(kind) = MediaKind::detect(msg) else {
        return Verdict::NoMedia;
    };
    let Some(id) = msg.id else {
        return Verdict::Malformed;
    };
    Verdict::Emit(MediaRecord::new(id, target, kind, &msg.caption()))
}

fn tally(verdict: Verdict, out: &mut Extraction) {
    match verdict {
        Verdict::Emit(record) => {
            out.stats.emitted += 1;
            out.records.push(record);
        }
        Verdict::NotMessage => out.stats.skipped_non_message += 1,
        Verdict::NoMedia => out.stats.skipped_no_media += 1,
        Verdict::Malformed => out.stats.skipped_malformed += 1,
    }
}

/// Extract media records from raw JSON message elements, preserving order.
pub fn extract_media(messages: &[Value], target: &ImportTarget) -> Extraction {
    let mut out = Extraction::default();
    for value in messages {
        out.stats.scanned += 1;
        let verdict = match RawMessage::from_value(value) {
            Ok(msg) => classify(&msg, target),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable message");
                Verdict::Malformed
            }
        };
        tally(verdict, &mut out);
    }
    out
}

/// Same as [`extract_media`] for messages that are already parsed.
pub fn extract_from_raw(messages: &[RawMessage], target: &ImportTarget) -> Extraction {
    let mut out = Extraction::default();
    for msg in messages {
        out.stats.scanned += 1;
        tally(classify(msg, target), &mut out);
    }
    out
}
