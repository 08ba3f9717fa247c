//! CPEL wire format constants
//!
//! Layout of a file (all integers big-endian):
//!
//! ```text
//! 0x0      endian bit (0x80) | file version (0x01..0x7F)
//! 0x1      unused
//! 0x2-0x3  number of sections
//! 0x4-0x7  file date (POSIX epoch seconds)
//!
//! repeated per section:
//!   i32 section type
//!   i32 section length (excludes this 8-byte tag)
//!   [64-byte table name, u32 entry count]   sections 2-5
//!   [u32 ticks per microsecond]             section 5 only
//!   body
//! ```

use std::fmt;

/// Endianness flag stored in the top bit of the first header byte (0 = big)
pub const ENDIAN_BIT: u8 = 0;

/// CPEL file version stored in the low 7 bits of the first header byte
pub const FILE_VERSION: u8 = 1;

/// Size of the file header in bytes
pub const FILE_HEADER_LEN: usize = 8;

/// Size of the type/length tag preceding every section
pub const TLD_LEN: usize = 8;

/// Name of the (only) string table, referenced by every other section
pub const STRING_TABLE_NAME: &str = "FileStrtab";

/// Width of the NUL-padded table name field in generic section headers
pub const TABLE_NAME_FIELD_LEN: usize = 64;

/// Datum format string shared by every event definition
pub const DATUM_FORMAT: &str = "%s";

/// Clock resolution recorded in the event section header
pub const TICKS_PER_MICROSECOND: u32 = 1_000_000;

/// Event definition entry: event code, type name offset, datum format offset
pub const EVENT_DEFINITION_ENTRY_LEN: usize = 12;

/// Track definition entry: track id, track name offset
pub const TRACK_DEFINITION_ENTRY_LEN: usize = 8;

/// Event entry: time high, time low, track, event code, datum offset
pub const EVENT_ENTRY_LEN: usize = 20;

/// Symbol table entry: value, name offset
pub const SYMBOL_ENTRY_LEN: usize = 8;

/// Section kinds defined by the CPEL format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    StringTable,
    /// Defined by the format but never populated by this encoder
    SymbolTable,
    EventDefinition,
    TrackDefinition,
    Event,
}

impl SectionType {
    /// All section kinds in type-code order
    pub const ALL: [SectionType; 5] = [
        SectionType::StringTable,
        SectionType::SymbolTable,
        SectionType::EventDefinition,
        SectionType::TrackDefinition,
        SectionType::Event,
    ];

    /// Numeric type code written in the section tag
    pub fn code(self) -> i32 {
        match self {
            SectionType::StringTable => 1,
            SectionType::SymbolTable => 2,
            SectionType::EventDefinition => 3,
            SectionType::TrackDefinition => 4,
            SectionType::Event => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.code() == code)
    }

    /// Bytes of generic header counted in the section length before the body
    ///
    /// 64 for the table name plus 4 for the entry count; the event section
    /// adds 4 more for ticks per microsecond. The string table has none.
    pub fn header_overhead(self) -> usize {
        match self {
            SectionType::StringTable => 0,
            SectionType::SymbolTable
            | SectionType::EventDefinition
            | SectionType::TrackDefinition => TABLE_NAME_FIELD_LEN + 4,
            SectionType::Event => TABLE_NAME_FIELD_LEN + 8,
        }
    }

    /// Size of one body entry, `None` for the variable-length string table
    pub fn entry_len(self) -> Option<usize> {
        match self {
            SectionType::StringTable => None,
            SectionType::SymbolTable => Some(SYMBOL_ENTRY_LEN),
            SectionType::EventDefinition => Some(EVENT_DEFINITION_ENTRY_LEN),
            SectionType::TrackDefinition => Some(TRACK_DEFINITION_ENTRY_LEN),
            SectionType::Event => Some(EVENT_ENTRY_LEN),
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionType::StringTable => "String Table Section",
            SectionType::SymbolTable => "Symbol Table Section",
            SectionType::EventDefinition => "Event Definition Section",
            SectionType::TrackDefinition => "Track Definition Section",
            SectionType::Event => "Event Section",
        };
        f.write_str(name)
    }
}

/// The 8-byte file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// true when the file claims little-endian encoding
    pub little_endian: bool,
    pub version: u8,
    pub section_count: u16,
    /// POSIX epoch seconds
    pub date: u32,
}

impl FileHeader {
    /// Header for a big-endian, version 1 file
    pub fn new(section_count: u16, date: u32) -> Self {
        Self {
            little_endian: ENDIAN_BIT == 1,
            version: FILE_VERSION,
            section_count,
            date,
        }
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_LEN] {
        let mut bytes = [0u8; FILE_HEADER_LEN];
        bytes[0] = (u8::from(self.little_endian) << 7) | (self.version & 0x7F);
        bytes[2..4].copy_from_slice(&self.section_count.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.date.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; FILE_HEADER_LEN]) -> Self {
        Self {
            little_endian: bytes[0] >> 7 == 1,
            version: bytes[0] & 0x7F,
            section_count: u16::from_be_bytes([bytes[2], bytes[3]]),
            date: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// The string table name NUL-padded to the 64-byte header field
pub fn table_name_field() -> [u8; TABLE_NAME_FIELD_LEN] {
    let mut field = [0u8; TABLE_NAME_FIELD_LEN];
    field[..STRING_TABLE_NAME.len()].copy_from_slice(STRING_TABLE_NAME.as_bytes());
    field
}
