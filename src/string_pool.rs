//! Deduplicating string table backing the CPEL String Table section
//!
//! Strings are stored as raw Latin-1 bytes joined by NUL separators. The
//! table name sits at offset 0 with no leading NUL; every later string is
//! appended as `"\0" + s` and is referenced by the offset of its first byte.

use crate::error::{CpelError, Result};
use crate::format::{SectionType, DATUM_FORMAT, STRING_TABLE_NAME};
use fnv::FnvHashMap;

/// Insertion-ordered string pool with stable byte offsets
#[derive(Debug, Clone)]
pub struct StringPool {
    offsets: FnvHashMap<String, u32>,
    blob: Vec<u8>,
}

impl StringPool {
    /// Create a pool pre-seeded with the table name and the `"%s"` format
    pub fn new() -> Self {
        let mut blob = Vec::with_capacity(64);
        blob.extend_from_slice(STRING_TABLE_NAME.as_bytes());

        let mut offsets = FnvHashMap::default();
        offsets.insert(STRING_TABLE_NAME.to_string(), 0);

        let mut pool = Self { offsets, blob };
        // Both fixed strings are ASCII and tiny
        let _ = pool.intern(DATUM_FORMAT);
        pool
    }

    /// Return the offset of `s`, appending it on first occurrence
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        if let Some(&offset) = self.offsets.get(s) {
            return Ok(offset);
        }

        let bytes = encode_latin1(s)?;
        let offset = self.blob.len() + 1;
        let end = offset + bytes.len();
        // Section length is an i32 on disk, which also bounds every offset
        if i32::try_from(end + 4).is_err() {
            return Err(CpelError::SectionTooLarge {
                section: SectionType::StringTable,
                length: end,
            });
        }

        self.blob.push(0);
        self.blob.extend_from_slice(&bytes);
        let offset = offset as u32;
        self.offsets.insert(s.to_string(), offset);
        Ok(offset)
    }

    /// Offset of an already interned string
    pub fn offset_of(&self, s: &str) -> Option<u32> {
        self.offsets.get(s).copied()
    }

    /// Number of distinct strings, including the two fixed ones
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false: the fixed strings are present from construction
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Unpadded blob length in bytes
    pub fn byte_len(&self) -> usize {
        self.blob.len()
    }

    /// NUL bytes appended when written: 1 to 4, so the last string is
    /// terminated even when the blob is already aligned
    pub fn padding(&self) -> usize {
        4 - (self.blob.len() % 4)
    }

    /// Length of the String Table section body as written
    pub fn padded_len(&self) -> usize {
        self.blob.len() + self.padding()
    }

    /// Unpadded blob contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    /// Offset of the `"%s"` datum format string
    pub fn datum_format_offset(&self) -> u32 {
        self.offset_of(DATUM_FORMAT).unwrap_or(STRING_TABLE_NAME.len() as u32 + 1)
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

/// NUL separates strings in the blob, so it cannot appear inside one
fn encode_latin1(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| match c {
            '\0' => None,
            c => u8::try_from(c).ok(),
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| CpelError::UnencodableString(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_contains_fixed_strings() {
        let pool = StringPool::new();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.offset_of("FileStrtab"), Some(0));
        assert_eq!(pool.offset_of("%s"), Some(11));
        assert_eq!(pool.datum_format_offset(), 11);
        assert_eq!(pool.as_bytes(), b"FileStrtab\0%s");
    }

    #[test]
    fn test_intern_appends_with_nul_separator() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("cpu 2").unwrap(), 14);
        assert_eq!(pool.intern("event_type").unwrap(), 20);
        assert_eq!(pool.as_bytes(), b"FileStrtab\0%s\0cpu 2\0event_type");
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut pool = StringPool::new();
        let first = pool.intern("label").unwrap();
        let len = pool.byte_len();
        let second = pool.intern("label").unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.byte_len(), len);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_fixed_strings_are_not_duplicated() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("%s").unwrap(), 11);
        assert_eq!(pool.intern("FileStrtab").unwrap(), 0);
        assert_eq!(pool.byte_len(), 13);
    }

    #[test]
    fn test_empty_string_gets_own_offset() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("").unwrap(), 14);
        assert_eq!(pool.byte_len(), 14);
    }

    #[test]
    fn test_padding_always_terminates() {
        let mut pool = StringPool::new();
        // 13 bytes -> 3 bytes of padding
        assert_eq!(pool.padding(), 3);
        assert_eq!(pool.padded_len(), 16);

        // 13 + 1 + 2 = 16 bytes, already aligned -> full word of padding
        pool.intern("ab").unwrap();
        assert_eq!(pool.byte_len(), 16);
        assert_eq!(pool.padding(), 4);
        assert_eq!(pool.padded_len(), 20);
    }

    #[test]
    fn test_latin1_accepted() {
        let mut pool = StringPool::new();
        let offset = pool.intern("caf\u{e9}").unwrap();
        assert_eq!(&pool.as_bytes()[offset as usize..], &[b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_non_latin1_rejected() {
        let mut pool = StringPool::new();
        let err = pool.intern("\u{4e2d}\u{6587}").unwrap_err();
        assert!(matches!(err, CpelError::UnencodableString(_)));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.byte_len(), 13);
    }

    #[test]
    fn test_embedded_nul_rejected() {
        let mut pool = StringPool::new();
        let err = pool.intern("a\0b").unwrap_err();
        assert!(matches!(err, CpelError::UnencodableString(ref s) if s == "a\0b"));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.offset_of("a"), None);
        assert_eq!(pool.as_bytes(), b"FileStrtab\0%s");
    }
}
