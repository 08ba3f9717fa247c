//! Error types for CPEL encoding and decoding

use crate::format::SectionType;
use thiserror::Error;

/// Errors that can occur while building, writing or reading a CPEL file
#[derive(Error, Debug)]
pub enum CpelError {
    #[error("Unknown option for the track: {0}. Expected cpu or pid.")]
    InvalidTrackMode(String),

    #[error("{0} not implemented")]
    NotImplemented(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("String cannot be encoded as NUL-free Latin-1 bytes: {0:?}")]
    UnencodableString(String),

    #[error("String {0:?} missing from string table")]
    MissingString(String),

    #[error("{section} too large: {length} bytes does not fit a 32-bit field")]
    SectionTooLarge { section: SectionType, length: usize },

    #[error("Malformed CPEL data: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid event data at line {line}: {reason}")]
    EventData { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failures found by the diagnostic decoder while walking a byte stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("negative length {length} for section type {section_type}")]
    NegativeLength { section_type: i32, length: i32 },

    #[error("{section}: {entries} entries of {entry_size} bytes do not fit body of {body} bytes")]
    EntryCountMismatch {
        section: SectionType,
        entries: u32,
        entry_size: usize,
        body: usize,
    },

    #[error("{section}: length {length} smaller than its {overhead}-byte header")]
    ShortSection {
        section: SectionType,
        length: usize,
        overhead: usize,
    },
}

/// Result type for CPEL operations
pub type Result<T> = std::result::Result<T, CpelError>;
