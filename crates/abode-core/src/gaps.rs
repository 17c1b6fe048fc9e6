//! Coverage-gap engine.
//!
//! Given a set of residence intervals and an inclusive query range, find the
//! maximal runs of days inside the range that no interval covers. Pure
//! functions only: no I/O, no clock, no shared state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  address::Address,
  date::{DateRange, next_day, prev_day},
};

// ─── Interval ────────────────────────────────────────────────────────────────

/// A closed interval of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl Interval {
  /// `None` when `end` precedes `start`.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
    (start <= end).then_some(Self { start, end })
  }

  /// The part of this interval inside `range`, if any.
  pub fn clamp_to(self, range: DateRange) -> Option<Self> {
    Self::new(self.start.max(range.start()), self.end.min(range.end()))
  }
}

// ─── Gap ─────────────────────────────────────────────────────────────────────

/// An uncovered run of days within a query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
  pub start:       NaiveDate,
  pub end:         NaiveDate,
  /// The gap begins on the first day of the range.
  pub is_leading:  bool,
  /// The gap ends on the last day of the range.
  pub is_trailing: bool,
}

impl Gap {
  /// Length in days, counting both ends.
  pub fn days(&self) -> i64 { (self.end - self.start).num_days() + 1 }
}

pub fn total_gap_days(gaps: &[Gap]) -> i64 { gaps.iter().map(Gap::days).sum() }

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Uncovered sub-ranges of `range` given where the person lived.
///
/// Ongoing addresses count as covering through `range.end()`. Addresses with
/// unparseable or inverted dates contribute nothing and are skipped without
/// error.
pub fn coverage_gaps(addresses: &[Address], range: DateRange) -> Vec<Gap> {
  let intervals = addresses
    .iter()
    .filter_map(|address| address.interval(range.end()));
  gaps_in(intervals, range)
}

/// Uncovered sub-ranges of `range` given already-parsed intervals.
pub fn gaps_in(
  intervals: impl IntoIterator<Item = Interval>,
  range: DateRange,
) -> Vec<Gap> {
  let runs = merge_intervals(intervals, range);

  let (Some(first), Some(last)) = (runs.first(), runs.last()) else {
    return vec![Gap {
      start:       range.start(),
      end:         range.end(),
      is_leading:  true,
      is_trailing: true,
    }];
  };

  let mut gaps = Vec::new();

  if first.start > range.start() {
    gaps.push(Gap {
      start:       range.start(),
      end:         prev_day(first.start),
      is_leading:  true,
      is_trailing: false,
    });
  }

  for pair in runs.windows(2) {
    let start = next_day(pair[0].end);
    let end = prev_day(pair[1].start);
    if start <= end {
      gaps.push(Gap { start, end, is_leading: false, is_trailing: false });
    }
  }

  if last.end < range.end() {
    gaps.push(Gap {
      start:       next_day(last.end),
      end:         range.end(),
      is_leading:  false,
      is_trailing: true,
    });
  }

  gaps
}

/// Clamp `intervals` to `range` and merge them into maximal covered runs,
/// sorted by start.
///
/// Intervals that overlap or touch (one ends the day before the next starts)
/// merge into a single run, so consecutive runs always have at least one
/// uncovered day between them.
pub fn merge_intervals(
  intervals: impl IntoIterator<Item = Interval>,
  range: DateRange,
) -> Vec<Interval> {
  let mut clamped: Vec<Interval> = intervals
    .into_iter()
    .filter_map(|interval| interval.clamp_to(range))
    .collect();
  clamped.sort_by_key(|interval| interval.start);

  let mut runs: Vec<Interval> = Vec::with_capacity(clamped.len());
  for next in clamped {
    match runs.last_mut() {
      Some(run) if next.start <= next_day(run.end) => {
        run.end = run.end.max(next.end);
      }
      _ => runs.push(next),
    }
  }
  runs
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{address::test_helpers::make_address, date::parse_date};

  fn d(s: &str) -> NaiveDate { parse_date(s).unwrap() }

  fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
  }

  fn gap(start: &str, end: &str, leading: bool, trailing: bool) -> Gap {
    Gap {
      start:       d(start),
      end:         d(end),
      is_leading:  leading,
      is_trailing: trailing,
    }
  }

  #[test]
  fn no_addresses_is_one_full_gap() {
    let gaps = coverage_gaps(&[], range("2022-01-01", "2025-01-01"));
    assert_eq!(gaps, vec![gap("2022-01-01", "2025-01-01", true, true)]);
  }

  #[test]
  fn contiguous_cover_has_no_gaps() {
    let addresses = [
      make_address("2020-01-01", Some("2020-06-30")),
      make_address("2020-07-01", Some("2021-03-15")),
      make_address("2021-03-16", Some("2021-12-31")),
    ];
    assert!(coverage_gaps(&addresses, range("2020-01-01", "2021-12-31")).is_empty());
  }

  #[test]
  fn internal_hole_between_two_addresses() {
    let addresses = [
      make_address("2021-01-01", Some("2021-06-30")),
      make_address("2021-09-01", None),
    ];
    let gaps = coverage_gaps(&addresses, range("2021-01-01", "2022-01-01"));
    assert_eq!(gaps, vec![gap("2021-07-01", "2021-08-31", false, false)]);
  }

  #[test]
  fn one_day_hole_is_a_gap() {
    let addresses = [
      make_address("2021-01-01", Some("2021-01-10")),
      make_address("2021-01-12", Some("2021-01-31")),
    ];
    let gaps = coverage_gaps(&addresses, range("2021-01-01", "2021-01-31"));
    assert_eq!(gaps, vec![gap("2021-01-11", "2021-01-11", false, false)]);
    assert_eq!(gaps[0].days(), 1);
  }

  #[test]
  fn splitting_an_interval_at_adjacent_days_changes_nothing() {
    let r = range("2019-06-01", "2022-06-01");
    let whole = [make_address("2020-01-01", Some("2021-12-31"))];
    let split = [
      make_address("2021-03-01", Some("2021-12-31")),
      make_address("2020-01-01", Some("2021-02-28")),
    ];
    assert_eq!(coverage_gaps(&whole, r), coverage_gaps(&split, r));
  }

  #[test]
  fn leading_and_trailing_gaps_are_flagged() {
    let addresses = [make_address("2021-03-01", Some("2021-09-30"))];
    let gaps = coverage_gaps(&addresses, range("2021-01-01", "2021-12-31"));
    assert_eq!(gaps, vec![
      gap("2021-01-01", "2021-02-28", true, false),
      gap("2021-10-01", "2021-12-31", false, true),
    ]);
  }

  #[test]
  fn overlapping_intervals_merge() {
    let addresses = [
      make_address("2021-01-01", Some("2021-08-31")),
      make_address("2021-03-01", Some("2021-04-30")),
      make_address("2021-06-01", Some("2021-12-31")),
    ];
    assert!(coverage_gaps(&addresses, range("2021-01-01", "2021-12-31")).is_empty());
  }

  #[test]
  fn ongoing_address_covers_to_range_end() {
    let addresses = [make_address("2010-01-01", None)];
    assert!(coverage_gaps(&addresses, range("2022-01-01", "2025-01-01")).is_empty());
  }

  #[test]
  fn intervals_outside_range_contribute_nothing() {
    let addresses = [
      make_address("2010-01-01", Some("2011-01-01")),
      make_address("2030-01-01", None),
    ];
    let gaps = coverage_gaps(&addresses, range("2022-01-01", "2022-12-31"));
    assert_eq!(gaps, vec![gap("2022-01-01", "2022-12-31", true, true)]);
  }

  #[test]
  fn malformed_addresses_are_ignored() {
    let addresses = [
      make_address("yesterday", None),
      make_address("2021-06-01", Some("2021-01-01")),
      make_address("2021-01-01", Some("2021-06-30")),
    ];
    let gaps = coverage_gaps(&addresses, range("2021-01-01", "2021-12-31"));
    assert_eq!(gaps, vec![gap("2021-07-01", "2021-12-31", false, true)]);
  }

  #[test]
  fn interval_clamped_at_range_start() {
    let addresses = [make_address("2019-01-01", Some("2021-02-14"))];
    let gaps = coverage_gaps(&addresses, range("2021-01-01", "2021-03-01"));
    assert_eq!(gaps, vec![gap("2021-02-15", "2021-03-01", false, true)]);
  }

  #[test]
  fn single_day_range() {
    let r = range("2021-05-05", "2021-05-05");
    assert!(coverage_gaps(&[make_address("2021-05-05", Some("2021-05-05"))], r).is_empty());
    assert_eq!(coverage_gaps(&[make_address("2021-05-06", None)], r), vec![gap(
      "2021-05-05",
      "2021-05-05",
      true,
      true
    )]);
  }

  #[test]
  fn merge_reports_covered_runs() {
    let runs = merge_intervals(
      [
        Interval::new(d("2021-05-01"), d("2021-05-10")).unwrap(),
        Interval::new(d("2021-01-01"), d("2021-01-31")).unwrap(),
        Interval::new(d("2021-02-01"), d("2021-02-10")).unwrap(),
      ],
      range("2021-01-01", "2021-12-31"),
    );
    assert_eq!(runs, vec![
      Interval::new(d("2021-01-01"), d("2021-02-10")).unwrap(),
      Interval::new(d("2021-05-01"), d("2021-05-10")).unwrap(),
    ]);
  }

  #[test]
  fn total_days_sums_gaps() {
    let gaps = [
      gap("2021-01-01", "2021-01-10", true, false),
      gap("2021-02-01", "2021-02-01", false, false),
    ];
    assert_eq!(total_gap_days(&gaps), 11);
  }

  #[test]
  fn gap_serialises_flags_in_camel_case() {
    let json = serde_json::to_value(gap("2021-01-01", "2021-01-02", true, false)).unwrap();
    assert_eq!(json["start"], "2021-01-01");
    assert_eq!(json["isLeading"], true);
    assert_eq!(json["isTrailing"], false);
  }
}
