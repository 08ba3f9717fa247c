//! Diagnostic CPEL decoder
//!
//! Walks a CPEL byte stream section by section, independent of the writer's
//! in-memory state, and resolves string offsets against the string table it
//! reads. Used for inspection (`cpel dump`) and round-trip verification; it
//! does not rebuild [`crate::event::EventRecord`]s.

use crate::error::{CpelError, DecodeError, Result};
use crate::format::{FileHeader, SectionType, FILE_HEADER_LEN, TABLE_NAME_FIELD_LEN};
use crate::layout::EventEntry;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::trace;

/// Bytes of the string table shown in the text dump
pub const SAMPLE_SIZE: usize = 256;

/// Decoded string table section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    /// First string of the table, which doubles as its name
    pub name: String,
    /// Raw section body including padding
    pub bytes: Vec<u8>,
}

impl StringTable {
    fn new(bytes: Vec<u8>) -> Self {
        let name = latin1(bytes.split(|&b| b == 0).next().unwrap_or_default());
        Self { name, bytes }
    }

    /// NUL-terminated string starting at `offset`
    pub fn get(&self, offset: u32) -> Option<String> {
        let rest = self.bytes.get(offset as usize..)?;
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        Some(latin1(&rest[..end]))
    }

    /// All strings in storage order, padding stripped
    pub fn strings(&self) -> Vec<String> {
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        if end == 0 {
            return Vec::new();
        }
        self.bytes[..end].split(|&b| b == 0).map(latin1).collect()
    }
}

/// Table name and entry count shared by sections 2-5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_name: String,
    pub entry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolEntry {
    pub value: u32,
    pub name_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDefinition {
    pub event_code: u32,
    pub type_name_offset: u32,
    pub datum_format_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackDefinition {
    pub track_id: u32,
    pub name_offset: u32,
}

/// One decoded section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    StringTable(StringTable),
    SymbolTable {
        header: SectionHeader,
        entries: Vec<SymbolEntry>,
    },
    EventDefinition {
        header: SectionHeader,
        entries: Vec<EventDefinition>,
    },
    TrackDefinition {
        header: SectionHeader,
        entries: Vec<TrackDefinition>,
    },
    Event {
        header: SectionHeader,
        ticks_per_microsecond: u32,
        entries: Vec<EventEntry>,
    },
    /// Section type outside 1-5, skipped by its length
    Unknown { code: i32, length: usize },
}

impl Section {
    pub fn section_type(&self) -> Option<SectionType> {
        match self {
            Section::StringTable(_) => Some(SectionType::StringTable),
            Section::SymbolTable { .. } => Some(SectionType::SymbolTable),
            Section::EventDefinition { .. } => Some(SectionType::EventDefinition),
            Section::TrackDefinition { .. } => Some(SectionType::TrackDefinition),
            Section::Event { .. } => Some(SectionType::Event),
            Section::Unknown { .. } => None,
        }
    }

    pub fn header(&self) -> Option<&SectionHeader> {
        match self {
            Section::SymbolTable { header, .. }
            | Section::EventDefinition { header, .. }
            | Section::TrackDefinition { header, .. }
            | Section::Event { header, .. } => Some(header),
            Section::StringTable(_) | Section::Unknown { .. } => None,
        }
    }

    /// Number of entries: strings for the string table, records otherwise
    pub fn entry_count(&self) -> usize {
        match self {
            Section::StringTable(table) => table.strings().len(),
            Section::SymbolTable { entries, .. } => entries.len(),
            Section::EventDefinition { entries, .. } => entries.len(),
            Section::TrackDefinition { entries, .. } => entries.len(),
            Section::Event { entries, .. } => entries.len(),
            Section::Unknown { .. } => 0,
        }
    }
}

/// A decoded CPEL file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpelFile {
    pub header: FileHeader,
    /// Section lengths as read from each tag, parallel to `sections`
    pub lengths: Vec<usize>,
    pub sections: Vec<Section>,
}

impl CpelFile {
    /// Decode a complete CPEL byte stream
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let mut reader = ByteReader::new(bytes);
        let mut header = [0u8; FILE_HEADER_LEN];
        header.copy_from_slice(reader.take(FILE_HEADER_LEN)?);
        let header = FileHeader::from_bytes(header);

        let mut lengths = Vec::new();
        let mut sections = Vec::new();
        while !reader.is_empty() {
            let code = reader.i32()?;
            let length = reader.i32()?;
            let length = usize::try_from(length).map_err(|_| DecodeError::NegativeLength {
                section_type: code,
                length,
            })?;
            let body = reader.take(length)?;
            let offset = reader.pos - length;

            trace!(code, length, offset, "decoding section");
            let section = match SectionType::from_code(code) {
                Some(section_type) => decode_section(section_type, body, offset)?,
                None => Section::Unknown { code, length },
            };
            lengths.push(length);
            sections.push(section);
        }

        Ok(Self {
            header,
            lengths,
            sections,
        })
    }

    /// Read and decode everything from `reader`
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::parse(&bytes)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(CpelError::Io)?;
        Ok(Self::parse(&bytes)?)
    }

    /// First section of the given type
    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.section_type() == Some(section_type))
    }

    /// Entry count of the first section of the given type, 0 if absent
    pub fn entry_count(&self, section_type: SectionType) -> usize {
        self.section(section_type).map_or(0, Section::entry_count)
    }

    /// String table with the given name
    pub fn string_table(&self, name: &str) -> Option<&StringTable> {
        self.sections.iter().find_map(|s| match s {
            Section::StringTable(table) if table.name == name => Some(table),
            _ => None,
        })
    }

    /// Resolve an offset against the named string table
    pub fn resolve(&self, table_name: &str, offset: u32) -> Option<String> {
        self.string_table(table_name)?.get(offset)
    }

    pub fn event_definitions(&self) -> &[EventDefinition] {
        match self.section(SectionType::EventDefinition) {
            Some(Section::EventDefinition { entries, .. }) => entries,
            _ => &[],
        }
    }

    pub fn track_definitions(&self) -> &[TrackDefinition] {
        match self.section(SectionType::TrackDefinition) {
            Some(Section::TrackDefinition { entries, .. }) => entries,
            _ => &[],
        }
    }

    pub fn events(&self) -> &[EventEntry] {
        match self.section(SectionType::Event) {
            Some(Section::Event { entries, .. }) => entries,
            _ => &[],
        }
    }

    fn lookup(&self, header: &SectionHeader, offset: u32) -> String {
        self.resolve(&header.table_name, offset)
            .unwrap_or_else(|| "<unresolved>".to_string())
    }
}

fn decode_section(
    section_type: SectionType,
    body: &[u8],
    offset: usize,
) -> std::result::Result<Section, DecodeError> {
    if section_type == SectionType::StringTable {
        return Ok(Section::StringTable(StringTable::new(body.to_vec())));
    }

    let overhead = section_type.header_overhead();
    if body.len() < overhead {
        return Err(DecodeError::ShortSection {
            section: section_type,
            length: body.len(),
            overhead,
        });
    }

    let mut reader = ByteReader::with_base(body, offset);
    let table_name = latin1(
        reader
            .take(TABLE_NAME_FIELD_LEN)?
            .split(|&b| b == 0)
            .next()
            .unwrap_or_default(),
    );
    let entry_count = reader.u32()?;
    let ticks_per_microsecond = if section_type == SectionType::Event {
        reader.u32()?
    } else {
        0
    };

    let entry_len = section_type.entry_len().unwrap_or(1);
    let remaining = reader.remaining();
    if entry_count as usize * entry_len != remaining {
        return Err(DecodeError::EntryCountMismatch {
            section: section_type,
            entries: entry_count,
            entry_size: entry_len,
            body: remaining,
        });
    }

    let header = SectionHeader {
        table_name,
        entry_count,
    };
    let count = entry_count as usize;
    let section = match section_type {
        SectionType::SymbolTable => {
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                entries.push(SymbolEntry {
                    value: reader.u32()?,
                    name_offset: reader.u32()?,
                });
            }
            Section::SymbolTable { header, entries }
        }
        SectionType::EventDefinition => {
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                entries.push(EventDefinition {
                    event_code: reader.u32()?,
                    type_name_offset: reader.u32()?,
                    datum_format_offset: reader.u32()?,
                });
            }
            Section::EventDefinition { header, entries }
        }
        SectionType::TrackDefinition => {
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                entries.push(TrackDefinition {
                    track_id: reader.u32()?,
                    name_offset: reader.u32()?,
                });
            }
            Section::TrackDefinition { header, entries }
        }
        SectionType::Event => {
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                entries.push(EventEntry {
                    time_hi: reader.u32()?,
                    time_lo: reader.u32()?,
                    track_index: reader.u32()?,
                    event_code: reader.u32()?,
                    datum_offset: reader.u32()?,
                });
            }
            Section::Event {
                header,
                ticks_per_microsecond,
                entries,
            }
        }
        SectionType::StringTable => Section::StringTable(StringTable::new(body.to_vec())),
    };
    Ok(section)
}

/// Big-endian cursor over a byte slice
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self::with_base(bytes, 0)
    }

    /// `base` is the slice's position in the file, for error reporting
    fn with_base(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                offset: self.base + self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn word(&mut self) -> std::result::Result<[u8; 4], DecodeError> {
        let slice = self.take(4)?;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn u32(&mut self) -> std::result::Result<u32, DecodeError> {
        self.word().map(u32::from_be_bytes)
    }

    fn i32(&mut self) -> std::result::Result<i32, DecodeError> {
        self.word().map(i32::from_be_bytes)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

impl fmt::Display for CpelFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endian = if self.header.little_endian { "little" } else { "big" };
        writeln!(
            f,
            "Endian-bit: {} ({}-endian)",
            u8::from(self.header.little_endian),
            endian
        )?;
        writeln!(f, "File version: {}", self.header.version)?;
        writeln!(f, "Number of sections: {}", self.header.section_count)?;
        writeln!(f, "File date: {}", self.header.date)?;

        for (section, length) in self.sections.iter().zip(&self.lengths) {
            writeln!(f)?;
            match section.section_type() {
                Some(section_type) => writeln!(f, "Section type: {}", section_type)?,
                None => writeln!(f, "Section type: (unknown)")?,
            }
            writeln!(f, "Section length: {}", length)?;
            if let Some(header) = section.header() {
                writeln!(f, "Table name: {}", header.table_name)?;
                writeln!(f, "Number of entries: {}", header.entry_count)?;
            }

            match section {
                Section::StringTable(table) => {
                    writeln!(f, "Table name: {}", table.name)?;
                    let sample = &table.bytes[..table.bytes.len().min(SAMPLE_SIZE)];
                    writeln!(f, "{}...", latin1(sample).replace('\0', ", "))?;
                }
                Section::SymbolTable { header, entries } => {
                    writeln!(f, "value name:")?;
                    for entry in entries {
                        writeln!(f, "{}\t{}", entry.value, self.lookup(header, entry.name_offset))?;
                    }
                }
                Section::EventDefinition { header, entries } => {
                    writeln!(f, "event_code [event_offset] [datum_offset]:")?;
                    for entry in entries {
                        writeln!(
                            f,
                            "{}\t{}[{}] (\"{}\")\t{}[{}] (\"{}\")",
                            entry.event_code,
                            header.table_name,
                            entry.type_name_offset,
                            self.lookup(header, entry.type_name_offset),
                            header.table_name,
                            entry.datum_format_offset,
                            self.lookup(header, entry.datum_format_offset),
                        )?;
                    }
                }
                Section::TrackDefinition { header, entries } => {
                    writeln!(f, "track_id [track_offset]:")?;
                    for entry in entries {
                        writeln!(
                            f,
                            "{}\t{}[{}] (\"{}\")",
                            entry.track_id,
                            header.table_name,
                            entry.name_offset,
                            self.lookup(header, entry.name_offset),
                        )?;
                    }
                }
                Section::Event {
                    header,
                    ticks_per_microsecond,
                    entries,
                } => {
                    writeln!(f, "Ticks per microsecond: {}", ticks_per_microsecond)?;
                    writeln!(f, "time\ttrack\tevent_code\tevent_datum:")?;
                    for entry in entries {
                        writeln!(
                            f,
                            "time: {}\ttrack: {:5}\tevent: {:5}\t{}",
                            entry.time(),
                            entry.track_index,
                            entry.event_code,
                            self.lookup(header, entry.datum_offset),
                        )?;
                    }
                }
                Section::Unknown { code, .. } => {
                    writeln!(f, "Invalid section number {}", code)?;
                }
            }
        }
        Ok(())
    }
}
