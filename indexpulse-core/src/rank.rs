//! Top-N selection by percent change.

use crate::domain::{CanonicalRecord, RankedRecord, RunContext};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no records to rank")]
pub struct EmptyInputError;

/// Sort by change percent descending and keep the first `n`.
///
/// The sort is stable: equal percentages keep their input order. Every row
/// carries the same run id and timestamp from `ctx`; ranks start at 1.
pub fn rank(
    mut records: Vec<CanonicalRecord>,
    n: usize,
    ctx: &RunContext,
) -> Result<Vec<RankedRecord>, EmptyInputError> {
    if records.is_empty() {
        return Err(EmptyInputError);
    }

    records.sort_by(|a, b| {
        b.change_pct
            .partial_cmp(&a.change_pct)
            .unwrap_or(Ordering::Equal)
    });

    let date_time_utc = ctx.timestamp();
    Ok(records
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, record)| RankedRecord {
            run_id: ctx.run_id.clone(),
            date_time_utc: date_time_utc.clone(),
            rank: i + 1,
            record,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunId, TOP_N};
    use chrono::{TimeZone, Utc};

    fn ctx() -> RunContext {
        RunContext::with(
            RunId("run_0123456789ab".into()),
            Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap(),
        )
    }

    fn records(pcts: &[f64]) -> Vec<CanonicalRecord> {
        pcts.iter()
            .enumerate()
            .map(|(i, p)| CanonicalRecord::with_change_pct(format!("IDX{i}"), *p))
            .collect()
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(rank(vec![], TOP_N, &ctx()), Err(EmptyInputError));
    }

    #[test]
    fn fewer_records_than_n() {
        let out = rank(records(&[-1.0, 2.0]), TOP_N, &ctx()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].record.symbol, "IDX1");
        assert_eq!(out[1].rank, 2);
    }

    #[test]
    fn ties_keep_input_order() {
        let out = rank(records(&[1.0, 3.0, 3.0, 3.0]), TOP_N, &ctx()).unwrap();
        let symbols: Vec<_> = out.iter().map(|r| r.record.symbol.as_str()).collect();
        assert_eq!(symbols, ["IDX1", "IDX2", "IDX3"]);
    }

    #[test]
    fn negative_changes_rank_below_zero() {
        let out = rank(records(&[-0.5, 0.0, -2.0, -0.1]), TOP_N, &ctx()).unwrap();
        let pcts: Vec<_> = out.iter().map(|r| r.record.change_pct).collect();
        assert_eq!(pcts, [0.0, -0.1, -0.5]);
    }

    #[test]
    fn rows_share_run_metadata() {
        let out = rank(records(&[1.0, 2.0, 3.0, 4.0]), TOP_N, &ctx()).unwrap();
        assert!(out.iter().all(|r| r.run_id.as_str() == "run_0123456789ab"));
        assert!(out.iter().all(|r| r.date_time_utc == "2024-05-01T14:30:00Z"));
        assert_eq!(out.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }
}
