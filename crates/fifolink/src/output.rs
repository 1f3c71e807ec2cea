use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fifolink_frame::{Frame, FrameKind};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema_id: &'a str,
    kind: &'a str,
    sender_id: String,
    expires_at: u64,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                schema_id: "https://schemas.3leaps.dev/fifolink/cli/v1/frame-received.schema.json",
                kind: kind_name(frame),
                sender_id: frame.sender_id().to_string(),
                expires_at: frame.expires_at(),
                payload_size: frame.payload().len(),
                payload: payload_preview(frame.payload()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SENDER", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    kind_name(frame).to_string(),
                    frame.sender_id().to_string(),
                    frame.payload().len().to_string(),
                    payload_preview(frame.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} sender={} size={} expires_at={} payload={}",
                kind_name(frame),
                frame.sender_id(),
                frame.payload().len(),
                frame.expires_at(),
                payload_preview(frame.payload())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn kind_name(frame: &Frame) -> &'static str {
    match frame.kind() {
        Some(FrameKind::Normal) => "NORMAL",
        Some(FrameKind::Response) => "RESPONSE",
        Some(FrameKind::Retransmit) => "RETRANSMIT",
        None => "UNKNOWN",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
