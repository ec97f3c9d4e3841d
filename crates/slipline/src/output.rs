use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use slipline_frame::marker::{is_reserved, marker_name, ESC};
use slipline_transport::HexDump;

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
    index: usize,
    source: &'a str,
    size: usize,
    hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    timestamp: String,
}

#[derive(Serialize)]
struct EncodedOutput {
    payload_size: usize,
    wire_size: usize,
    escaped: usize,
    wire: String,
}

#[derive(Serialize)]
struct SentOutput<'a> {
    dest: &'a str,
    payload_size: usize,
    wire_size: usize,
    sent: usize,
}

/// Print one decoded frame.
pub fn print_frame(index: usize, payload: &[u8], source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                index,
                source,
                size: payload.len(),
                hex: HexDump(payload).to_string(),
                text: printable_text(payload),
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
                .set_header(vec!["#", "SIZE", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    payload.len().to_string(),
                    source.to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} size={} source={} payload={}",
                index,
                payload.len(),
                source,
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

/// Print an encoded wire frame.
pub fn print_encoded(payload_size: usize, wire: &[u8], format: OutputFormat) {
    let escaped = wire
        .iter()
        .skip(2)
        .take(wire.len().saturating_sub(3))
        .filter(|byte| is_reserved(**byte))
        .count();

    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                payload_size,
                wire_size: wire.len(),
                escaped,
                wire: HexDump(wire).to_string(),
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
                .set_header(vec!["OFFSET", "BYTE", "ROLE"]);
            for (offset, byte) in wire.iter().enumerate() {
                table.add_row(vec![
                    offset.to_string(),
                    format!("{byte:02x}"),
                    byte_role(wire, offset).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "payload={} wire={} escaped={} bytes={}",
                payload_size,
                wire.len(),
                escaped,
                HexDump(wire)
            );
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

/// Print the outcome of a send.
pub fn print_sent(
    dest: &str,
    payload_size: usize,
    wire_size: usize,
    sent: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                dest,
                payload_size,
                wire_size,
                sent,
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
                .set_header(vec!["DEST", "PAYLOAD", "WIRE", "SENT"])
                .add_row(vec![
                    dest.to_string(),
                    payload_size.to_string(),
                    wire_size.to_string(),
                    sent.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("dest={dest} payload={payload_size} wire={wire_size} sent={sent}");
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// What a byte of an encoded frame is doing there.
fn byte_role(wire: &[u8], offset: usize) -> &'static str {
    let last = wire.len().saturating_sub(1);
    if offset < 2 || offset == last {
        return marker_name(wire[offset]);
    }
    if offset >= 3 && wire[offset - 1] == ESC {
        return marker_name(wire[offset]);
    }
    if wire[offset] == ESC {
        return "ESC";
    }
    "DATA"
}

fn printable_text(payload: &[u8]) -> Option<&str> {
    std::str::from_utf8(payload)
        .ok()
        .filter(|text| !text.chars().any(|c| c.is_control() && c != '\n' && c != '\t'))
}

fn payload_preview(payload: &[u8]) -> String {
    match printable_text(payload) {
        Some(text) => text.to_string(),
        None => HexDump(payload).to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
