use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use tg_history_import::export::parse_export;
use tg_history_import::extract::{extract_media, ImportTarget};

fn sample_messages(count: i64) -> Vec<Value> {
    (1..=count)
        .map(|id| match id % 4 {
            0 => json!({
                "id": id,
                "type": "message",
                "photo": "photos/p.jpg",
                "text": "short caption"
            }),
            1 => json!({
                "id": id,
                "type": "message",
                "media_type": "video_file",
                "text": [
                    "Rust async Telegram export ".repeat(4),
                    {"type": "link", "text": "https://example.com/some/long/path"},
                    {"type": "bold", "text": "bold part"}
                ]
            }),
            2 => json!({"id": id, "type": "message", "text": "plain chatter without media"}),
            _ => json!({"id": id, "type": "service", "action": "pin_message"}),
        })
        .collect()
}

fn extract_benchmark(c: &mut Criterion) {
    let messages = sample_messages(10_000);
    let target = ImportTarget {
        chat_id: -1001234567890,
        category: "History".to_string(),
    };

    c.bench_function("extract_media_10k_messages", |b| {
        b.iter(|| {
            let out = extract_media(black_box(&messages), &target);
            black_box(out.records.len());
        });
    });
}

fn parse_benchmark(c: &mut Criterion) {
    let content = json!({ "messages": sample_messages(10_000) }).to_string();

    c.bench_function("parse_export_10k_messages", |b| {
        b.iter(|| {
            let export = parse_export(black_box(content.as_str())).expect("valid export");
            black_box(export.messages.len());
        });
    });
}

criterion_group!(extraction, extract_benchmark, parse_benchmark);
criterion_main!(extraction);
