//! Property-based tests for the interval algebra and the availability pipeline.
//!
//! These check invariants that must hold for *any* input, not just the
//! hand-picked cases in `interval_tests.rs` and `availability_tests.rs`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tutor_availability::availability::compute_available_blocks;
use tutor_availability::config::AvailabilityConfig;
use tutor_availability::interval::{merge_blocks, subtract_blocks, TimeBlock};
use tutor_availability::store::{AvailabilityRecord, UnavailabilityRecord};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

/// A block starting within ~3 days of the origin, 1 minute to 10 hours long,
/// on a 5-minute grid so touching boundaries actually occur.
fn arb_block() -> impl Strategy<Value = TimeBlock> {
    (0i64..900, 1i64..120).prop_map(|(start, len)| {
        let start = origin() + Duration::minutes(start * 5);
        TimeBlock::new(start, start + Duration::minutes(len * 5)).unwrap()
    })
}

fn arb_blocks(max: usize) -> impl Strategy<Value = Vec<TimeBlock>> {
    prop::collection::vec(arb_block(), 0..max)
}

fn arb_rule() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("FREQ=DAILY".to_string())),
        Just(Some("FREQ=DAILY;INTERVAL=2".to_string())),
        Just(Some("FREQ=WEEKLY;BYDAY=MO,WE,FR,SU".to_string())),
        Just(Some("FREQ=MONTHLY;BYMONTHDAY=1,2,3,4".to_string())),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn total(blocks: &[TimeBlock]) -> Duration {
    blocks.iter().fold(Duration::zero(), |acc, b| acc + b.duration())
}

fn overlap(a: &TimeBlock, b: &TimeBlock) -> Duration {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    if start < end {
        end - start
    } else {
        Duration::zero()
    }
}

fn record(block: &TimeBlock, rule: Option<String>) -> AvailabilityRecord {
    AvailabilityRecord {
        tutor_id: "t".to_string(),
        start_time: block.start.to_rfc3339(),
        end_time: block.end.to_rfc3339(),
        recurrence_rule: rule,
    }
}

fn blackout(block: &TimeBlock) -> UnavailabilityRecord {
    UnavailabilityRecord {
        tutor_id: "t".to_string(),
        start_time: block.start.to_rfc3339(),
        end_time: block.end.to_rfc3339(),
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn merge_is_idempotent(blocks in arb_blocks(20)) {
        let once = merge_blocks(&blocks);
        prop_assert_eq!(merge_blocks(&once), once);
    }

    #[test]
    fn merge_output_is_sorted_and_separated(blocks in arb_blocks(20)) {
        let merged = merge_blocks(&blocks);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn merge_covers_exactly_the_input(blocks in arb_blocks(20)) {
        let merged = merge_blocks(&blocks);
        for block in &blocks {
            prop_assert!(merged.iter().any(|m| m.start <= block.start && block.end <= m.end));
        }
        for m in &merged {
            prop_assert!(blocks.iter().any(|b| b.start == m.start));
            prop_assert!(blocks.iter().any(|b| b.end == m.end));
        }
    }

    #[test]
    fn single_subtraction_is_exact(base in arb_block(), cut in arb_block()) {
        let result = subtract_blocks(&[base], &[cut]);

        prop_assert!(result.len() <= 2);
        prop_assert_eq!(total(&result), base.duration() - overlap(&base, &cut));
        for fragment in &result {
            prop_assert!(fragment.start >= base.start && fragment.end <= base.end);
            prop_assert!(!fragment.overlaps(&cut));
        }
        if result.len() == 2 {
            prop_assert!(result[0].end <= result[1].start);
        }
    }

    #[test]
    fn subtraction_ignores_cut_order(base in arb_blocks(6), cuts in arb_blocks(8)) {
        let mut reversed = cuts.clone();
        reversed.reverse();
        prop_assert_eq!(
            merge_blocks(&subtract_blocks(&base, &cuts)),
            merge_blocks(&subtract_blocks(&base, &reversed))
        );
    }

    #[test]
    fn subtraction_never_keeps_cut_time(base in arb_blocks(6), cuts in arb_blocks(8)) {
        for fragment in subtract_blocks(&base, &cuts) {
            prop_assert!(cuts.iter().all(|c| !fragment.overlaps(c)));
            prop_assert!(base.iter().any(|b| b.start <= fragment.start && fragment.end <= b.end));
        }
    }

    #[test]
    fn pipeline_output_invariants(
        availability in prop::collection::vec((arb_block(), arb_rule()), 0..6),
        blackouts in arb_blocks(6),
        window_offset in 0i64..2000,
        window_len in 0i64..6000,
    ) {
        let window_start = origin() + Duration::minutes(window_offset);
        let window_end = window_start + Duration::minutes(window_len);
        let records: Vec<AvailabilityRecord> =
            availability.iter().map(|(b, r)| record(b, r.clone())).collect();
        let blackouts: Vec<UnavailabilityRecord> = blackouts.iter().map(blackout).collect();

        let result = compute_available_blocks(
            &records,
            &blackouts,
            &[],
            window_start,
            window_end,
            &AvailabilityConfig::default(),
        );

        for block in &result {
            prop_assert!(block.duration() >= Duration::minutes(45));
            prop_assert!(block.start >= window_start && block.end <= window_end);
        }
        for pair in result.windows(2) {
            // Sorted, disjoint and not touching.
            prop_assert!(pair[0].end < pair[1].start);
        }
    }
}
