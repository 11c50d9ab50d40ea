use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use picolink::dispatch::Response;
use serde::Serialize;
use serde_json::Value;

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
struct ResponseOutput<'a> {
    seq: usize,
    kind: &'a str,
    payload_size: usize,
    elapsed_ms: u128,
    response: Value,
}

/// Print one response frame received by `send`.
pub fn print_response(seq: usize, payload: &[u8], elapsed: Duration, format: OutputFormat) {
    let parsed = serde_json::from_slice::<Value>(payload).ok();
    let kind = response_kind(payload);

    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                seq,
                kind,
                payload_size: payload.len(),
                elapsed_ms: elapsed.as_millis(),
                response: parsed.unwrap_or_else(|| Value::String(payload_preview(payload))),
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
                .set_header(vec!["SEQ", "TYPE", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    kind.to_string(),
                    payload.len().to_string(),
                    format!("{}ms", elapsed.as_millis()),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let body = parsed
                .and_then(|value| serde_json::to_string_pretty(&value).ok())
                .unwrap_or_else(|| payload_preview(payload));
            println!(
                "#{seq} type={kind} size={} elapsed={}ms\n{body}",
                payload.len(),
                elapsed.as_millis()
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// The response `type`, or `invalid` when the payload is not a known response.
pub fn response_kind(payload: &[u8]) -> &'static str {
    serde_json::from_slice::<Response>(payload)
        .map(|response| response.kind())
        .unwrap_or("invalid")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
