//! Parser for yt-dlp progress and metadata output
//!
//! The tool prints one JSON object per stdout line: progress dictionaries
//! (via `--progress-template`) while downloading and the info dictionary
//! (via `--print-json`) once the media is known. Each line is decoded into
//! zero or more [`StreamEvent`]s which are then applied to a [`Job`].

use crate::types::{Job, UNTITLED};
use crate::utils::output_filename;
use serde_json::{Map, Value};

/// One decoded stdout line
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    /// The line carried at least one recognized field
    Events(Vec<StreamEvent>),
    /// A JSON object with none of the recognized fields (or a blank line)
    Unrecognized,
    /// Not a JSON object; carries the decode error
    Malformed(String),
}

/// A recognized field of a progress-stream line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Explicit percentage, truncated and clamped to 0..=100
    Percent(u8),
    /// Byte counters; only decoded when no percentage is present
    Bytes {
        /// Bytes downloaded so far
        downloaded: u64,
        /// Total size (exact or estimated)
        total: u64,
    },
    /// Media title (`Untitled` when the tool reports an empty one)
    Title(String),
    /// Format note, used as the quality label
    Quality(String),
    /// Duration in whole seconds
    Duration {
        /// Seconds, fraction discarded
        seconds: u64,
    },
}

impl StreamEvent {
    /// Whether the event only concerns progress
    pub fn is_progress(&self) -> bool {
        matches!(self, StreamEvent::Percent(_) | StreamEvent::Bytes { .. })
    }
}

/// Decode one line of tool output
pub fn parse_line(line: &str) -> StreamLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return StreamLine::Unrecognized;
    }

    let map = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return StreamLine::Malformed(format!("expected a JSON object, got {}", kind(&other)));
        }
        Err(e) => return StreamLine::Malformed(e.to_string()),
    };

    let events = decode_events(&map);
    if events.is_empty() {
        StreamLine::Unrecognized
    } else {
        StreamLine::Events(events)
    }
}

/// Decode the recognized fields of one JSON object, in application order
pub fn decode_events(map: &Map<String, Value>) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(percent) = map.get("progress").and_then(number) {
        events.push(StreamEvent::Percent(percent.trunc().clamp(0.0, 100.0) as u8));
    } else if let Some(downloaded) = map.get("downloaded_bytes").and_then(unsigned) {
        let total = map
            .get("total_bytes")
            .and_then(unsigned)
            .or_else(|| map.get("total_bytes_estimate").and_then(unsigned));
        if let Some(total) = total {
            events.push(StreamEvent::Bytes { downloaded, total });
        }
    }

    if let Some(title) = map.get("title") {
        let title = match title {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => UNTITLED.to_string(),
        };
        events.push(StreamEvent::Title(title));
    }

    if let Some(Value::String(note)) = map.get("format_note")
        && !note.trim().is_empty()
    {
        events.push(StreamEvent::Quality(note.clone()));
    }

    if let Some(seconds) = map.get("duration").and_then(unsigned) {
        events.push(StreamEvent::Duration { seconds });
    }

    events
}

/// Apply one event to a job record; returns whether the record changed
pub fn apply(job: &mut Job, event: &StreamEvent) -> bool {
    match event {
        StreamEvent::Percent(percent) => replace(&mut job.progress, *percent),
        StreamEvent::Bytes { downloaded, total } => {
            if *total == 0 {
                return false;
            }
            let percent = (u128::from(*downloaded) * 100 / u128::from(*total)).min(100) as u8;
            replace(&mut job.progress, percent)
        }
        StreamEvent::Title(title) => {
            job.naming.target =
                output_filename(&job.naming.timestamp, title, &job.naming.quality_label);
            replace(&mut job.title, title.clone())
        }
        StreamEvent::Quality(quality) => {
            job.naming.quality_label = quality.clone();
            replace(&mut job.quality, quality.clone())
        }
        StreamEvent::Duration { seconds } => {
            replace(&mut job.duration_minutes, (seconds / 60).to_string())
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Numeric value from a JSON number or a numeric string (`"42.5"`, `"42.5%"`)
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn unsigned(value: &Value) -> Option<u64> {
    number(value).filter(|n| *n >= 0.0).map(|n| n as u64)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
