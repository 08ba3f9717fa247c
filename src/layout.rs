//! Collection pass: event entries and section lengths
//!
//! Section tags carry their length before the section body, so the whole
//! event sequence is drained up front. A [`CpelLayout`] is the finished
//! result of that pass; [`crate::writer::CpelWriter`] only serializes it.
//!
//! # Example
//!
//! ```
//! use cpel::event::{EventRecord, TrackMode};
//! use cpel::format::SectionType;
//! use cpel::layout::CpelLayout;
//!
//! # fn main() -> cpel::error::Result<()> {
//! let events = vec![
//!     EventRecord::new(1, "sched_switch", "bash (pid: 7)", "cpu 0"),
//!     EventRecord::new(2, "sched_switch", "sshd (pid: 9)", "cpu 1"),
//! ];
//! let layout = CpelLayout::collect(&events, TrackMode::Cpu)?;
//!
//! assert_eq!(layout.entries().len(), 2);
//! assert_eq!(layout.track_definitions().len(), 2);
//! assert_eq!(layout.section_length(SectionType::Event), 2 * 20 + 72);
//! # Ok(())
//! # }
//! ```

use crate::error::{CpelError, Result};
use crate::event::{EventRecord, TrackMode};
use crate::format::{SectionType, EVENT_ENTRY_LEN};
use crate::indexer::DefinitionIndexer;
use crate::string_pool::StringPool;
use std::borrow::Borrow;
use tracing::debug;

/// One event as written to the Event section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventEntry {
    pub time_hi: u32,
    pub time_lo: u32,
    pub track_index: u32,
    pub event_code: u32,
    /// String table offset of the event label
    pub datum_offset: u32,
}

impl EventEntry {
    /// Reassemble the 64-bit timestamp
    pub fn time(&self) -> u64 {
        (u64::from(self.time_hi) << 32) | u64::from(self.time_lo)
    }
}

/// Split a 64-bit time into (high, low) 32-bit words
pub fn split_time(time: u64) -> (u32, u32) {
    ((time >> 32) as u32, (time & u64::from(u32::MAX)) as u32)
}

/// Fully populated encoding state for one run
#[derive(Debug, Clone)]
pub struct CpelLayout {
    mode: TrackMode,
    strings: StringPool,
    event_definitions: DefinitionIndexer,
    track_definitions: DefinitionIndexer,
    entries: Vec<EventEntry>,
}

impl CpelLayout {
    /// Create an empty layout; the string pool starts with its fixed strings
    pub fn new(mode: TrackMode) -> Self {
        Self {
            mode,
            strings: StringPool::new(),
            event_definitions: DefinitionIndexer::event_definitions(),
            track_definitions: DefinitionIndexer::track_definitions(),
            entries: Vec::new(),
        }
    }

    /// Run the collection pass over every event, in input order
    pub fn collect<I>(events: I, mode: TrackMode) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Borrow<EventRecord>,
    {
        let mut layout = Self::new(mode);
        for event in events {
            layout.push(event.borrow())?;
        }

        debug!(
            mode = %mode,
            events = layout.entries.len(),
            event_types = layout.event_definitions.len(),
            tracks = layout.track_definitions.len(),
            string_bytes = layout.strings.padded_len(),
            "collected CPEL layout"
        );
        layout.check_lengths()?;
        Ok(layout)
    }

    /// Add one event: intern its strings, index its type and track, record the entry
    pub fn push(&mut self, event: &EventRecord) -> Result<()> {
        let (track, label) = self.mode.resolve(event);

        let datum_offset = self.strings.intern(label)?;
        self.strings.intern(track)?;
        self.strings.intern(&event.event_type)?;

        let event_code = self.event_definitions.index_of(&event.event_type);
        let track_index = self.track_definitions.index_of(track);

        let (time_hi, time_lo) = split_time(event.time);
        self.entries.push(EventEntry {
            time_hi,
            time_lo,
            track_index,
            event_code,
            datum_offset,
        });
        Ok(())
    }

    /// Symbol table entries are defined by the format but not supported
    pub fn push_symbol(&mut self, _value: u32, _name: &str) -> Result<()> {
        Err(CpelError::NotImplemented("Symbol table section"))
    }

    pub fn mode(&self) -> TrackMode {
        self.mode
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn event_definitions(&self) -> &DefinitionIndexer {
        &self.event_definitions
    }

    pub fn track_definitions(&self) -> &DefinitionIndexer {
        &self.track_definitions
    }

    pub fn entries(&self) -> &[EventEntry] {
        &self.entries
    }

    /// Body length of a section, excluding its generic header
    pub fn body_length(&self, section: SectionType) -> usize {
        match section {
            SectionType::StringTable => self.strings.padded_len(),
            SectionType::SymbolTable => 0,
            SectionType::EventDefinition => self.event_definitions.byte_len(),
            SectionType::TrackDefinition => self.track_definitions.byte_len(),
            SectionType::Event => self.entries.len() * EVENT_ENTRY_LEN,
        }
    }

    /// Length written in the section tag: generic header plus body
    pub fn section_length(&self, section: SectionType) -> usize {
        self.body_length(section) + section.header_overhead()
    }

    /// Number of entries announced in a section's generic header
    pub fn entry_count(&self, section: SectionType) -> usize {
        match section {
            SectionType::StringTable => self.strings.len(),
            SectionType::SymbolTable => 0,
            SectionType::EventDefinition => self.event_definitions.len(),
            SectionType::TrackDefinition => self.track_definitions.len(),
            SectionType::Event => self.entries.len(),
        }
    }

    fn check_lengths(&self) -> Result<()> {
        for section in SectionType::ALL {
            let length = self.section_length(section);
            if i32::try_from(length).is_err() {
                return Err(CpelError::SectionTooLarge { section, length });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn golden_events() -> Vec<EventRecord> {
        vec![
            EventRecord::new(11112221, "event_type", "test_name (pid: 1234)", "cpu 2"),
            EventRecord::new(11112222, "event_type", "test_name2 (pid: 1234)", "cpu 1"),
        ]
    }

    #[test]
    fn test_split_time() {
        assert_eq!(split_time(0x0000_0001_0000_0002), (1, 2));
        assert_eq!(split_time(u64::MAX), (u32::MAX, u32::MAX));
        assert_eq!(split_time(11112221), (0, 11112221));
    }

    #[test]
    fn test_entry_time_round_trip() {
        let (time_hi, time_lo) = split_time(0xDEAD_BEEF_0000_0042);
        let entry = EventEntry {
            time_hi,
            time_lo,
            track_index: 0,
            event_code: 0,
            datum_offset: 0,
        };
        assert_eq!(entry.time(), 0xDEAD_BEEF_0000_0042);
    }

    #[test]
    fn test_collect_golden_layout() {
        let layout = CpelLayout::collect(golden_events(), TrackMode::Cpu).unwrap();

        assert_eq!(layout.strings().offset_of("test_name (pid: 1234)"), Some(14));
        assert_eq!(layout.strings().offset_of("cpu 2"), Some(36));
        assert_eq!(layout.strings().offset_of("event_type"), Some(42));
        assert_eq!(layout.strings().offset_of("test_name2 (pid: 1234)"), Some(53));
        assert_eq!(layout.strings().offset_of("cpu 1"), Some(76));

        assert_eq!(
            layout.entries(),
            &[
                EventEntry {
                    time_hi: 0,
                    time_lo: 11112221,
                    track_index: 0,
                    event_code: 0,
                    datum_offset: 14,
                },
                EventEntry {
                    time_hi: 0,
                    time_lo: 11112222,
                    track_index: 1,
                    event_code: 0,
                    datum_offset: 53,
                },
            ]
        );
    }

    #[test]
    fn test_section_lengths() {
        let layout = CpelLayout::collect(golden_events(), TrackMode::Cpu).unwrap();
        assert_eq!(layout.section_length(SectionType::StringTable), 84);
        assert_eq!(layout.section_length(SectionType::EventDefinition), 80);
        assert_eq!(layout.section_length(SectionType::TrackDefinition), 84);
        assert_eq!(layout.section_length(SectionType::Event), 112);
    }

    #[test]
    fn test_pid_mode_swaps_track_and_label() {
        let layout = CpelLayout::collect(golden_events(), TrackMode::Pid).unwrap();
        let tracks: Vec<_> = layout.track_definitions().iter().map(|(_, k)| k).collect();
        assert_eq!(tracks, vec!["test_name (pid: 1234)", "test_name2 (pid: 1234)"]);
        assert_eq!(
            layout.entries()[0].datum_offset,
            layout.strings().offset_of("cpu 2").unwrap()
        );
    }

    #[test]
    fn test_empty_input() {
        let layout = CpelLayout::collect(Vec::<EventRecord>::new(), TrackMode::Pid).unwrap();
        assert_eq!(layout.strings().len(), 2);
        assert!(layout.entries().is_empty());
        assert_eq!(layout.section_length(SectionType::StringTable), 16);
        assert_eq!(layout.section_length(SectionType::EventDefinition), 68);
        assert_eq!(layout.section_length(SectionType::TrackDefinition), 68);
        assert_eq!(layout.section_length(SectionType::Event), 72);
    }

    #[test]
    fn test_duplicate_events_are_kept() {
        let event = EventRecord::new(1, "e", "d", "1");
        let layout = CpelLayout::collect([&event, &event], TrackMode::Cpu).unwrap();
        assert_eq!(layout.entries().len(), 2);
        assert_eq!(layout.entries()[0], layout.entries()[1]);
        assert_eq!(layout.strings().len(), 5);
        assert_eq!(layout.event_definitions().len(), 1);
        assert_eq!(layout.track_definitions().len(), 1);
    }

    #[test]
    fn test_symbols_not_implemented() {
        let mut layout = CpelLayout::new(TrackMode::Pid);
        let err = layout.push_symbol(0x1000, "main").unwrap_err();
        assert!(matches!(err, CpelError::NotImplemented(_)));
    }

    #[test]
    fn test_unencodable_label_aborts_collection() {
        let events = vec![EventRecord::new(1, "e", "\u{1F600}", "cpu 0")];
        let err = CpelLayout::collect(events, TrackMode::Cpu).unwrap_err();
        assert!(matches!(err, CpelError::UnencodableString(_)));
    }
}
