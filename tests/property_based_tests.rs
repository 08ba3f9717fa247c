//! Property-based tests for the CPEL encoder
//!
//! Core properties:
//! 1. Interning is idempotent
//! 2. Definition indices are dense and in first-seen order
//! 3. Event order survives encoding
//! 4. Decoded section counts match the distinct inputs

use cpel::decoder::CpelFile;
use cpel::event::{EventRecord, TrackMode};
use cpel::format::SectionType;
use cpel::indexer::DefinitionIndexer;
use cpel::layout::CpelLayout;
use cpel::string_pool::StringPool;
use cpel::writer::CpelWriter;
use proptest::prelude::*;
use std::collections::HashSet;

fn event_strategy() -> impl Strategy<Value = EventRecord> {
    (
        any::<u64>(),
        "[a-z_]{1,6}",
        "[a-z]{1,4} \\(pid: [0-9]{1,3}\\)",
        "cpu [0-3]",
    )
        .prop_map(|(time, event_type, name, cpu)| EventRecord::new(time, event_type, name, cpu))
}

fn track_mode_strategy() -> impl Strategy<Value = TrackMode> {
    prop_oneof![Just(TrackMode::Pid), Just(TrackMode::Cpu)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_intern_idempotent(strings in prop::collection::vec("[ -~]{0,12}", 1..20)) {
        let mut pool = StringPool::new();
        for s in &strings {
            let first = pool.intern(s).unwrap();
            let len = pool.byte_len();
            let second = pool.intern(s).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(pool.byte_len(), len);
        }

        let distinct: HashSet<&String> = strings.iter().collect();
        let fixed: usize = ["FileStrtab", "%s"]
            .iter()
            .filter(|f| !distinct.iter().any(|s| s.as_str() == **f))
            .count();
        prop_assert_eq!(pool.len(), distinct.len() + fixed);
        prop_assert_eq!(pool.padded_len() % 4, 0);
    }

    #[test]
    fn prop_indices_dense_first_seen(keys in prop::collection::vec("[a-c]{1,2}", 0..30)) {
        let mut indexer = DefinitionIndexer::event_definitions();
        let mut first_seen: Vec<&str> = Vec::new();
        for key in &keys {
            let index = indexer.index_of(key) as usize;
            if !first_seen.contains(&key.as_str()) {
                prop_assert_eq!(index, first_seen.len());
                first_seen.push(key);
            } else {
                prop_assert_eq!(first_seen[index], key.as_str());
            }
        }

        let assigned: Vec<(u32, &str)> = indexer.iter().collect();
        let expected: Vec<(u32, &str)> = first_seen
            .iter()
            .enumerate()
            .map(|(i, k)| (i as u32, *k))
            .collect();
        prop_assert_eq!(assigned, expected);
        prop_assert_eq!(indexer.byte_len(), first_seen.len() * 12);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_encode_decode_preserves_order_and_counts(
        events in prop::collection::vec(event_strategy(), 0..40),
        mode in track_mode_strategy(),
    ) {
        let layout = CpelLayout::collect(&events, mode).unwrap();
        let bytes = CpelWriter::new(&layout).with_timestamp(0).render().unwrap();
        let file = CpelFile::parse(&bytes).unwrap();

        let types: HashSet<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        let tracks: HashSet<&str> = events.iter().map(|e| mode.resolve(e).0).collect();

        prop_assert_eq!(file.entry_count(SectionType::EventDefinition), types.len());
        prop_assert_eq!(file.entry_count(SectionType::TrackDefinition), tracks.len());
        prop_assert_eq!(file.entry_count(SectionType::Event), events.len());

        for (entry, event) in file.events().iter().zip(&events) {
            let (track, label) = mode.resolve(event);
            prop_assert_eq!(entry.time(), event.time);
            prop_assert_eq!(file.resolve("FileStrtab", entry.datum_offset).unwrap(), label);

            let track_def = file.track_definitions()[entry.track_index as usize];
            prop_assert_eq!(file.resolve("FileStrtab", track_def.name_offset).unwrap(), track);

            let event_def = file.event_definitions()[entry.event_code as usize];
            prop_assert_eq!(
                file.resolve("FileStrtab", event_def.type_name_offset).unwrap(),
                event.event_type.as_str()
            );
        }
    }

    #[test]
    fn prop_section_lengths_cover_file(
        events in prop::collection::vec(event_strategy(), 0..20),
    ) {
        let layout = CpelLayout::collect(&events, TrackMode::Cpu).unwrap();
        let bytes = CpelWriter::new(&layout).with_timestamp(0).render().unwrap();
        let file = CpelFile::parse(&bytes).unwrap();

        let total: usize = 8 + file.lengths.iter().map(|l| l + 8).sum::<usize>();
        prop_assert_eq!(total, bytes.len());
        prop_assert_eq!(file.lengths[0] % 4, 0);
    }
}
