//! Property tests for parsing and ranking invariants.
//!
//! Uses proptest to verify:
//! 1. Ranking output is sorted, bounded by N, and ranked 1..=len
//! 2. Ranking is stable for equal percentages
//! 3. `parse_number` never panics and falls back to the default on garbage
//! 4. Thousands separators do not change the parsed value

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::Value;
use indexpulse_core::{parse_number, rank, CanonicalRecord, RunContext, RunId, TOP_N};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_pct() -> impl Strategy<Value = f64> {
    (-15.0..15.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_records() -> impl Strategy<Value = Vec<CanonicalRecord>> {
    prop::collection::vec(arb_pct(), 1..25).prop_map(|pcts| {
        pcts.into_iter()
            .enumerate()
            .map(|(i, p)| CanonicalRecord::with_change_pct(format!("IDX{i:02}"), p))
            .collect()
    })
}

fn ctx() -> RunContext {
    RunContext::with(
        RunId("run_000000000001".into()),
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    )
}

/// Insert `,` every three digits of the integer part.
fn with_thousands(int_part: u64, frac: u32) -> String {
    let digits = int_part.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped}.{frac:02}")
}

// ── 1. Ranking shape ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn ranked_output_is_sorted_and_bounded(records in arb_records()) {
        let n = records.len();
        let out = rank(records, TOP_N, &ctx()).unwrap();

        prop_assert_eq!(out.len(), n.min(TOP_N));
        for (i, row) in out.iter().enumerate() {
            prop_assert_eq!(row.rank, i + 1);
        }
        for pair in out.windows(2) {
            prop_assert!(pair[0].record.change_pct >= pair[1].record.change_pct);
        }
    }

    #[test]
    fn top_row_is_the_maximum(records in arb_records()) {
        let max = records.iter().map(|r| r.change_pct).fold(f64::MIN, f64::max);
        let out = rank(records, TOP_N, &ctx()).unwrap();
        prop_assert_eq!(out[0].record.change_pct, max);
    }
}

// ── 2. Stability ─────────────────────────────────────────────────────

proptest! {
    /// Among equal percentages the earlier input wins.
    #[test]
    fn equal_percentages_keep_input_order(pct in arb_pct(), count in 2usize..8) {
        let records: Vec<_> = (0..count)
            .map(|i| CanonicalRecord::with_change_pct(format!("IDX{i:02}"), pct))
            .collect();
        let out = rank(records, TOP_N, &ctx()).unwrap();
        for (i, row) in out.iter().enumerate() {
            prop_assert_eq!(&row.record.symbol, &format!("IDX{i:02}"));
        }
    }
}

// ── 3/4. Parsing ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn parse_number_never_panics(s in "\\PC*", default in -1e6..1e6_f64) {
        let v = parse_number(Some(&Value::String(s)), default);
        prop_assert!(v.is_finite());
    }

    #[test]
    fn letters_fall_back_to_default(s in "[a-zA-Z]{1,12}", default in -1e6..1e6_f64) {
        // "inf"/"nan" spellings parse but are rejected as non-finite.
        let v = parse_number(Some(&Value::String(s)), default);
        prop_assert_eq!(v, default);
    }

    #[test]
    fn thousands_separators_are_ignored(int_part in 0u64..10_000_000_000, frac in 0u32..100) {
        let plain = format!("{int_part}.{frac:02}");
        let grouped = with_thousands(int_part, frac);
        prop_assert_eq!(
            parse_number(Some(&Value::String(grouped)), -1.0),
            parse_number(Some(&Value::String(plain)), -2.0)
        );
    }
}
