//! CPEL binary writer
//!
//! Serializes a finished [`CpelLayout`] in the fixed section order:
//! file header, string table, event definitions, track definitions, events.
//! The writer never mutates the layout and never reorders event entries.
//!
//! # Example
//!
//! ```no_run
//! use cpel::event::{EventRecord, TrackMode};
//! use cpel::layout::CpelLayout;
//! use cpel::writer::CpelWriter;
//!
//! # fn main() -> cpel::error::Result<()> {
//! let events = vec![EventRecord::new(1, "sched_switch", "bash (pid: 7)", "cpu 0")];
//! let layout = CpelLayout::collect(&events, TrackMode::Cpu)?;
//! CpelWriter::new(&layout).write("trace.cpel")?;
//! # Ok(())
//! # }
//! ```

use crate::error::{CpelError, Result};
use crate::format::{
    table_name_field, FileHeader, SectionType, FILE_HEADER_LEN, TICKS_PER_MICROSECOND, TLD_LEN,
};
use crate::layout::CpelLayout;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::Builder;
use tracing::{debug, info};

/// Sections emitted by this writer, in file order
pub const EMITTED_SECTIONS: [SectionType; 4] = [
    SectionType::StringTable,
    SectionType::EventDefinition,
    SectionType::TrackDefinition,
    SectionType::Event,
];

/// Renders a [`CpelLayout`] into the CPEL byte format
#[derive(Debug, Clone)]
pub struct CpelWriter<'a> {
    layout: &'a CpelLayout,
    timestamp: Option<u32>,
    atomic: bool,
}

impl<'a> CpelWriter<'a> {
    pub fn new(layout: &'a CpelLayout) -> Self {
        Self {
            layout,
            timestamp: None,
            atomic: true,
        }
    }

    /// Use a fixed file date instead of the current time
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Write through a temporary file renamed into place (default: true)
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// File header as it will be written
    pub fn header(&self) -> FileHeader {
        let date = self.timestamp.unwrap_or_else(posix_now);
        FileHeader::new(EMITTED_SECTIONS.len() as u16, date)
    }

    /// Write the complete file to `path`
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if self.atomic {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let tmp = temp_file_builder().tempfile_in(dir)?;
            {
                let mut out = BufWriter::new(tmp.as_file());
                self.write_to(&mut out)?;
                out.flush()?;
            }
            tmp.persist(path).map_err(|e| CpelError::Io(e.error))?;
        } else {
            let mut out = BufWriter::new(File::create(path)?);
            self.write_to(&mut out)?;
            out.flush()?;
        }

        info!(path = %path.display(), events = self.layout.entries().len(), "wrote CPEL file");
        Ok(())
    }

    /// Render the complete file into memory
    pub fn render(&self) -> Result<Vec<u8>> {
        let total = FILE_HEADER_LEN
            + EMITTED_SECTIONS
                .iter()
                .map(|&s| TLD_LEN + self.layout.section_length(s))
                .sum::<usize>();
        let mut bytes = Vec::with_capacity(total);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Stream the complete file into `out`
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.header().to_bytes())?;
        for section in EMITTED_SECTIONS {
            self.write_section(section, out)?;
        }
        Ok(())
    }

    /// Write one section: tag, generic header where applicable, body
    pub fn write_section<W: Write>(&self, section: SectionType, out: &mut W) -> Result<()> {
        match section {
            SectionType::StringTable => self.write_strings(out),
            SectionType::SymbolTable => Err(CpelError::NotImplemented("Symbol table section")),
            SectionType::EventDefinition => self.write_event_definitions(out),
            SectionType::TrackDefinition => self.write_track_definitions(out),
            SectionType::Event => self.write_events(out),
        }
    }

    fn write_tld<W: Write>(&self, section: SectionType, out: &mut W) -> Result<()> {
        let length = self.layout.section_length(section);
        let length_field =
            i32::try_from(length).map_err(|_| CpelError::SectionTooLarge { section, length })?;

        debug!(section = %section, length, "writing section");
        out.write_all(&section.code().to_be_bytes())?;
        out.write_all(&length_field.to_be_bytes())?;
        Ok(())
    }

    fn write_section_header<W: Write>(&self, section: SectionType, out: &mut W) -> Result<()> {
        let count = self.layout.entry_count(section);
        let count = u32::try_from(count).map_err(|_| CpelError::SectionTooLarge {
            section,
            length: self.layout.section_length(section),
        })?;

        out.write_all(&table_name_field())?;
        out.write_all(&count.to_be_bytes())?;
        if section == SectionType::Event {
            out.write_all(&TICKS_PER_MICROSECOND.to_be_bytes())?;
        }
        Ok(())
    }

    fn write_strings<W: Write>(&self, out: &mut W) -> Result<()> {
        let strings = self.layout.strings();
        self.write_tld(SectionType::StringTable, out)?;
        out.write_all(strings.as_bytes())?;
        out.write_all(&[0u8; 4][..strings.padding()])?;
        Ok(())
    }

    fn write_event_definitions<W: Write>(&self, out: &mut W) -> Result<()> {
        let strings = self.layout.strings();
        let datum_format = strings.datum_format_offset();

        self.write_tld(SectionType::EventDefinition, out)?;
        self.write_section_header(SectionType::EventDefinition, out)?;
        for (event_code, type_name) in self.layout.event_definitions().iter() {
            let type_offset = interned(strings.offset_of(type_name), type_name)?;
            out.write_all(&event_code.to_be_bytes())?;
            out.write_all(&type_offset.to_be_bytes())?;
            out.write_all(&datum_format.to_be_bytes())?;
        }
        Ok(())
    }

    fn write_track_definitions<W: Write>(&self, out: &mut W) -> Result<()> {
        let strings = self.layout.strings();

        self.write_tld(SectionType::TrackDefinition, out)?;
        self.write_section_header(SectionType::TrackDefinition, out)?;
        for (track_id, track_name) in self.layout.track_definitions().iter() {
            let name_offset = interned(strings.offset_of(track_name), track_name)?;
            out.write_all(&track_id.to_be_bytes())?;
            out.write_all(&name_offset.to_be_bytes())?;
        }
        Ok(())
    }

    fn write_events<W: Write>(&self, out: &mut W) -> Result<()> {
        self.write_tld(SectionType::Event, out)?;
        self.write_section_header(SectionType::Event, out)?;
        for entry in self.layout.entries() {
            out.write_all(&entry.time_hi.to_be_bytes())?;
            out.write_all(&entry.time_lo.to_be_bytes())?;
            out.write_all(&entry.track_index.to_be_bytes())?;
            out.write_all(&entry.event_code.to_be_bytes())?;
            out.write_all(&entry.datum_offset.to_be_bytes())?;
        }
        Ok(())
    }
}

/// Every definition key is interned during collection
fn interned(offset: Option<u32>, key: &str) -> Result<u32> {
    offset.ok_or_else(|| CpelError::MissingString(key.to_string()))
}

/// Temp file builder matching the mode `File::create` would give
#[cfg(unix)]
fn temp_file_builder() -> Builder<'static, 'static> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    // 0o666 before the process umask, not tempfile's owner-only 0o600
    let mut builder = Builder::new();
    builder.permissions(Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_file_builder() -> Builder<'static, 'static> {
    Builder::new()
}

/// Current POSIX time in seconds, truncated to the 32-bit header field
fn posix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}
