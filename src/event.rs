//! Event records and track/label resolution
//!
//! Scheduling events carry a pair of strings in `specific_datum`, ordered
//! `(name/pid, cpu)`. Which of the two becomes the viewer track and which the
//! per-event label is decided once per encoding run by a [`TrackMode`].

use crate::error::CpelError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single timestamped, labeled event handed over by a collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Timestamp in ticks; no ordering is assumed across records
    pub time: u64,

    /// Event kind name (e.g., "sched_switch")
    #[serde(rename = "type")]
    pub event_type: String,

    /// `(name/pid, cpu)` for scheduling events
    pub specific_datum: (String, String),
}

impl EventRecord {
    pub fn new(
        time: u64,
        event_type: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self {
            time,
            event_type: event_type.into(),
            specific_datum: (first.into(), second.into()),
        }
    }
}

/// Which element of `specific_datum` is drawn as the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TrackMode {
    /// One track per process: track = datum\[0\], label = datum\[1\]
    #[default]
    Pid,
    /// One track per CPU: track = datum\[1\], label = datum\[0\]
    Cpu,
}

impl TrackMode {
    /// Resolve the `(track, label)` pair for one event
    pub fn resolve<'a>(&self, event: &'a EventRecord) -> (&'a str, &'a str) {
        let first = event.specific_datum.0.as_str();
        let second = event.specific_datum.1.as_str();
        match self {
            TrackMode::Pid => (first, second),
            TrackMode::Cpu => (second, first),
        }
    }
}

impl FromStr for TrackMode {
    type Err = CpelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pid" => Ok(TrackMode::Pid),
            "cpu" => Ok(TrackMode::Cpu),
            other => Err(CpelError::InvalidTrackMode(other.to_string())),
        }
    }
}

impl fmt::Display for TrackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackMode::Pid => f.write_str("pid"),
            TrackMode::Cpu => f.write_str("cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sched_event() -> EventRecord {
        EventRecord::new(10, "sched_switch", "bash (pid: 42)", "cpu 3")
    }

    #[test]
    fn test_pid_mode_tracks_first_datum() {
        let event = sched_event();
        assert_eq!(
            TrackMode::Pid.resolve(&event),
            ("bash (pid: 42)", "cpu 3")
        );
    }

    #[test]
    fn test_cpu_mode_tracks_second_datum() {
        let event = sched_event();
        assert_eq!(
            TrackMode::Cpu.resolve(&event),
            ("cpu 3", "bash (pid: 42)")
        );
    }

    #[test]
    fn test_resolve_is_pure() {
        let event = sched_event();
        assert_eq!(TrackMode::Cpu.resolve(&event), TrackMode::Cpu.resolve(&event));
    }

    #[test]
    fn test_parse_track_mode() {
        assert_eq!("pid".parse::<TrackMode>().unwrap(), TrackMode::Pid);
        assert_eq!("cpu".parse::<TrackMode>().unwrap(), TrackMode::Cpu);
    }

    #[test]
    fn test_parse_unknown_track_mode_rejected() {
        let err = "thread".parse::<TrackMode>().unwrap_err();
        assert!(matches!(err, CpelError::InvalidTrackMode(ref mode) if mode == "thread"));
        assert!("CPU".parse::<TrackMode>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mode in [TrackMode::Pid, TrackMode::Cpu] {
            assert_eq!(mode.to_string().parse::<TrackMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_event_record_json_uses_type_key() {
        let json = serde_json::to_value(sched_event()).unwrap();
        assert_eq!(json["type"], "sched_switch");
        assert_eq!(json["specific_datum"][1], "cpu 3");
    }
}
