//! Property-based tests for level filtering, queue ordering and file names
//!
//! Uses proptest to check invariants over generated masks, message
//! sequences and name parts.

use chrono::NaiveDate;
use gslog_core::{Level, LogFileName, LogService, MemorySink};
use proptest::prelude::*;

// ============================================================================
// Strategy Generators
// ============================================================================

const LEVELS: [Level; 6] = [
    Level::VERBOSE,
    Level::DEBUG,
    Level::INFO,
    Level::WARN,
    Level::ERROR,
    Level::ASSERT,
];

fn mask_strategy() -> impl Strategy<Value = Level> {
    (0u32..64).prop_map(Level::from_bits_truncate)
}

fn level_strategy() -> impl Strategy<Value = Level> {
    (0..LEVELS.len()).prop_map(|i| LEVELS[i])
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1970i32..2200, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Exactly the messages whose level is in the mask reach the sink, in
    /// the order they were issued.
    #[test]
    fn only_enabled_levels_are_delivered(
        mask in mask_strategy(),
        levels in prop::collection::vec(level_strategy(), 0..60),
    ) {
        let mem = MemorySink::new("mem");
        let service = LogService::with_sinks(4, mask, vec![mem.clone()]).unwrap();
        let log = service.get_logger("prop");

        for (i, level) in levels.iter().enumerate() {
            let _ = log.log(*level, format_args!("{}", i));
        }
        service.shutdown();

        let expected: Vec<String> = levels
            .iter()
            .enumerate()
            .filter(|(_, level)| mask.contains(**level))
            .map(|(i, _)| i.to_string())
            .collect();
        prop_assert_eq!(mem.contents(), expected);
    }

    /// Queue capacity never changes what is delivered or its order.
    #[test]
    fn capacity_does_not_affect_order(capacity in 1usize..16, count in 0usize..200) {
        let mem = MemorySink::new("mem");
        let service = LogService::with_sinks(capacity, Level::ALL, vec![mem.clone()]).unwrap();
        let log = service.get_logger("fifo");

        for i in 0..count {
            log.i(format_args!("{}", i));
        }
        service.shutdown();

        let got: Vec<usize> = mem.contents().iter().map(|c| c.parse().unwrap()).collect();
        prop_assert_eq!(got, (0..count).collect::<Vec<_>>());
        prop_assert_eq!(service.stats().delivered, count as u64);
    }

    /// Generated file names parse back into their parts, whatever
    /// underscores the description holds.
    #[test]
    fn file_names_parse_back(
        name in "[a-z][a-z0-9]{0,8}",
        description in "[a-z0-9_]{0,12}",
        date in date_strategy(),
        seq in 0u32..100_000,
    ) {
        let file = LogFileName::new(name.as_str(), description.as_str(), date, seq);
        let parsed = LogFileName::parse(&file.to_file_name());
        prop_assert_eq!(parsed, Some(file));
    }

    /// The textual form of any mask parses back to the same mask.
    #[test]
    fn level_text_is_stable(mask in mask_strategy()) {
        let parsed: Level = mask.to_string().parse().unwrap();
        prop_assert_eq!(parsed, mask);
    }
}
