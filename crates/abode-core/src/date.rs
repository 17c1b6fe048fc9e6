//! Calendar dates and inclusive date ranges.
//!
//! Every date in Abode is a [`NaiveDate`] written as `YYYY-MM-DD` and read as
//! a UTC calendar day. Interval arithmetic never passes through timestamps,
//! so a boundary cannot shift by a day depending on the local timezone.

use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;

use crate::{Error, Result, address::Address};

/// The textual form of a calendar date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date. Surrounding whitespace is ignored.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
    .map_err(|_| Error::InvalidDate(s.to_owned()))
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// Today's date in UTC. The only place the wall clock enters date logic;
/// everything else takes "today" as a parameter.
pub fn today_utc() -> NaiveDate { Utc::now().date_naive() }

/// The same month and day `years` calendar years earlier, clamped to the last
/// day of the target month (29 Feb 2024 minus one year is 28 Feb 2023).
pub fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
  date
    .checked_sub_months(Months::new(years.saturating_mul(12)))
    .unwrap_or(NaiveDate::MIN)
}

/// The day after `date`, saturating at the end of the representable range.
pub(crate) fn next_day(date: NaiveDate) -> NaiveDate {
  date.succ_opt().unwrap_or(date)
}

/// The day before `date`, saturating at the start of the representable range.
pub(crate) fn prev_day(date: NaiveDate) -> NaiveDate {
  date.pred_opt().unwrap_or(date)
}

// ─── DateRange ───────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` range of calendar days with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
  start: NaiveDate,
  end:   NaiveDate,
}

impl DateRange {
  /// Build a range, rejecting one whose start falls after its end.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start > end {
      return Err(Error::InvertedRange { start, end });
    }
    Ok(Self { start, end })
  }

  /// Parse both bounds from `YYYY-MM-DD` text.
  pub fn parse(start: &str, end: &str) -> Result<Self> {
    Self::new(parse_date(start)?, parse_date(end)?)
  }

  /// `[today − 3 years, today]`, the default window for gap reports.
  pub fn last_three_years(today: NaiveDate) -> Self {
    Self { start: years_before(today, 3), end: today }
  }

  /// [`DateRange::last_three_years`] ending on today's UTC date.
  pub fn recent() -> Self { Self::last_three_years(today_utc()) }

  pub fn start(&self) -> NaiveDate { self.start }

  pub fn end(&self) -> NaiveDate { self.end }

  /// Number of days in the range, counting both ends.
  pub fn days(&self) -> i64 { (self.end - self.start).num_days() + 1 }

  /// Whether `address` was lived at on any day of this range.
  ///
  /// An ongoing address extends indefinitely. Addresses whose dates do not
  /// parse, or whose end precedes their start, never overlap.
  pub fn overlaps(&self, address: &Address) -> bool {
    let Ok(start) = address.start() else {
      return false;
    };
    let end = match address.end() {
      Some(Ok(end)) => Some(end),
      Some(Err(_)) => return false,
      None => None,
    };
    if end.is_some_and(|end| end < start) {
      return false;
    }
    start <= self.end && end.is_none_or(|end| end >= self.start)
  }
}
