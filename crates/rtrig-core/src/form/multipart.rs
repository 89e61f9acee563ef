//! `multipart/form-data` bodies.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{PostParams, PostValue};
use crate::error::TriggerError;

const CRLF: &str = "\r\n";

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Boundary unique per call: wall-clock millis plus a process-wide counter.
pub fn new_boundary() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("==={millis}.{seq}===")
}

/// Guess a part's content type from its file extension.
pub fn content_type_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "json" => "application/json",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Value safe inside a quoted header parameter: `"` becomes `%22`, CR and LF are dropped.
fn quoted_param(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect::<String>()
        .replace('"', "%22")
}

/// Build a multipart body for `params` delimited by `boundary`.
///
/// Text values become `text/plain; charset=utf-8` parts; file values are
/// streamed in binary with a `filename=` attribute.
pub fn build_multipart(params: &PostParams, boundary: &str) -> Result<Vec<u8>, TriggerError> {
    let mut out: Vec<u8> = Vec::new();

    for (key, value) in params {
        write!(out, "--{boundary}{CRLF}").map_err(|e| io_err(key, e))?;
        write!(out, "Content-Disposition: form-data; name=\"{}\"", quoted_param(key))
            .map_err(|e| io_err(key, e))?;
        match value {
            PostValue::Text(text) => {
                write!(out, "{CRLF}Content-Type: text/plain; charset=utf-8{CRLF}{CRLF}")
                    .map_err(|e| io_err(key, e))?;
                out.extend_from_slice(text.as_bytes());
            }
            PostValue::File(file) => {
                let filename = file.name();
                write!(
                    out,
                    "; filename=\"{}\"{CRLF}Content-Type: {}{CRLF}Content-Transfer-Encoding: binary{CRLF}{CRLF}",
                    quoted_param(&filename),
                    content_type_for_name(&filename)
                )
                .map_err(|e| io_err(key, e))?;
                let mut reader = file.open().map_err(|e| io_err(&filename, e))?;
                reader
                    .read_to_end(&mut out)
                    .map_err(|e| io_err(&filename, e))?;
            }
        }
        out.extend_from_slice(CRLF.as_bytes());
    }

    write!(out, "--{boundary}--{CRLF}").map_err(|e| io_err("", e))?;
    Ok(out)
}

fn io_err(name: &str, source: io::Error) -> TriggerError {
    TriggerError::Io {
        name: name.to_string(),
        source,
    }
}
