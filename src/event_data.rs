//! Event-data file reader
//!
//! Collectors save event data as text: a JSON header on the first line,
//! then one event per line with `#`-separated fields.
//!
//! ```text
//! {"start time": "0", "end time": "10", "interface": "sched", "datatype": "event", "data options": {}}
//! 11112221#sched_switch#bash (pid: 1234)#cpu 2
//! 11112222#sched_switch#vim (pid: 99)#cpu 1
//! ```
//!
//! The last two fields become `specific_datum`, ordered `(name/pid, cpu)`.

use crate::error::{CpelError, Result};
use crate::event::EventRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Separator between fields of an event line
pub const FIELD_SEPARATOR: char = '#';

/// Datatype name for event data
pub const EVENT_DATATYPE: &str = "event";

/// JSON header line of an event-data file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDataHeader {
    #[serde(rename = "start time", default)]
    pub start_time: Option<String>,

    #[serde(rename = "end time", default)]
    pub end_time: Option<String>,

    /// Collector that produced the data (e.g., "sched")
    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default)]
    pub datatype: Option<String>,

    #[serde(rename = "data options", default)]
    pub data_options: serde_json::Value,
}

/// Parsed event-data file
#[derive(Debug, Clone, PartialEq)]
pub struct EventDataFile {
    pub header: EventDataHeader,
    pub events: Vec<EventRecord>,
}

impl EventDataFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().enumerate();

        let header = match lines.find(|(_, line)| !line.trim().is_empty()) {
            Some((index, line)) => parse_header(line, index + 1)?,
            None => EventDataHeader::default(),
        };

        let mut events = Vec::new();
        for (index, line) in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            events.push(parse_event_line(line, index + 1)?);
        }

        Ok(Self { header, events })
    }
}

fn parse_header(line: &str, line_no: usize) -> Result<EventDataHeader> {
    let header: EventDataHeader =
        serde_json::from_str(line.trim()).map_err(|e| CpelError::EventData {
            line: line_no,
            reason: format!("invalid JSON header: {}", e),
        })?;

    match header.datatype.as_deref() {
        None | Some(EVENT_DATATYPE) => Ok(header),
        Some(other) => Err(CpelError::EventData {
            line: line_no,
            reason: format!("expected datatype \"{}\", found \"{}\"", EVENT_DATATYPE, other),
        }),
    }
}

/// Parse `<time>#<type>#<datum0>#<datum1>`
pub fn parse_event_line(line: &str, line_no: usize) -> Result<EventRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() != 4 {
        return Err(CpelError::EventData {
            line: line_no,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
    }

    let time = fields[0].parse::<u64>().map_err(|e| CpelError::EventData {
        line: line_no,
        reason: format!("invalid time {:?}: {}", fields[0], e),
    })?;

    Ok(EventRecord::new(time, fields[1], fields[2], fields[3]))
}
