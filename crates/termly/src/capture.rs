//! Loading of capture files.
//!
//! The browser extension writes one JSON file per capture into the captures
//! directory. The newest file wins: a capture fully replaces the previous
//! session, there is no merging.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use termgrid::{CalendarSession, RawEvent, RawTerm};

/// One capture file as the extension saves it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureFile {
    pub calendar: Option<EventCapture>,
    pub terms: Option<TermCapture>,
    /// Layer labels scraped from the source application, keyed by color
    pub layer_names: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventCapture {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermCapture {
    #[serde(default)]
    pub terms: Vec<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A normalized session plus when its capture was taken
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub session: CalendarSession,
    pub captured_at: Option<String>,
}

/// Whether a file name looks like a capture file
pub fn is_capture_name(name: &str) -> bool {
    name.starts_with("capture_") && name.ends_with(".json")
}

/// Find capture files in the given directory, oldest first.
/// File names embed their capture time, so lexicographic order is age order.
pub fn find_captures(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read captures directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .map(is_capture_name)
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();

    files.sort();
    Ok(files)
}

/// Parse a single capture file
pub fn parse_capture(path: &Path) -> Result<CaptureFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse capture file {}", path.display()))
}

/// Load the newest usable capture from `dir`.
///
/// Unreadable captures are skipped in favor of the next-newest; a directory
/// with no usable captures yields an empty snapshot, for which the views
/// render their no-data placeholder.
pub fn load_latest(dir: &Path) -> Result<Snapshot> {
    let files = find_captures(dir)?;

    for path in files.iter().rev() {
        match parse_capture(path) {
            Ok(capture) => {
                debug!(file = %path.display(), "Loaded capture");
                return Ok(build_snapshot(capture));
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable capture");
            }
        }
    }

    debug!(dir = %dir.display(), "No usable capture files found");
    Ok(Snapshot::default())
}

/// Turn a parsed capture into a session snapshot.
/// Rows that don't match the expected shape are dropped one by one.
pub fn build_snapshot(capture: CaptureFile) -> Snapshot {
    let mut captured_at = None;
    let mut raw_events: Vec<RawEvent> = Vec::new();
    if let Some(calendar) = capture.calendar {
        captured_at = calendar.timestamp;
        raw_events = decode_rows(calendar.events, "event");
    }

    let mut raw_terms: Vec<RawTerm> = Vec::new();
    if let Some(terms) = capture.terms {
        captured_at = captured_at.or(terms.timestamp);
        raw_terms = decode_rows(terms.terms, "term");
    }

    let session =
        CalendarSession::from_raw(&raw_events, &raw_terms).with_layer_names(&capture.layer_names);
    debug!(
        events = session.events().len(),
        terms = session.terms().len(),
        layers = session.layers().len(),
        "Session built"
    );

    Snapshot {
        session,
        captured_at,
    }
}

/// Deserialize each row on its own so one malformed record doesn't sink the
/// rest of the capture
fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<serde_json::Value>, kind: &str) -> Vec<T> {
    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value(row) {
            Ok(value) => decoded.push(value),
            Err(e) => warn!(kind = kind, error = %e, "Skipping malformed capture row"),
        }
    }
    decoded
}
