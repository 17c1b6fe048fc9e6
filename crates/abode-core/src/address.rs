//! Addresses — periods of residence.
//!
//! Dates are kept exactly as they were supplied. The store never validates
//! them; consumers parse on read through [`Address::start`],
//! [`Address::end`] and [`Address::interval`], and decide for themselves what
//! to do with a record whose dates are malformed.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  date::{DateRange, parse_date},
  gaps::Interval,
};

// ─── Address ─────────────────────────────────────────────────────────────────

/// A place the person lived, from `start_date` until `end_date` (inclusive),
/// or until now when `end_date` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id:         Uuid,
  pub line1:      String,
  #[serde(default)]
  pub line2:      Option<String>,
  pub town:       String,
  #[serde(default)]
  pub county:     Option<String>,
  pub postcode:   String,
  pub country:    String,
  /// `YYYY-MM-DD`, inclusive.
  pub start_date: String,
  /// `YYYY-MM-DD`, inclusive. Absent or blank means ongoing.
  #[serde(default)]
  pub end_date:   Option<String>,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Address {
  /// The parsed start date.
  pub fn start(&self) -> Result<NaiveDate> { parse_date(&self.start_date) }

  /// The parsed end date, or `None` for an ongoing residence.
  pub fn end(&self) -> Option<Result<NaiveDate>> {
    self.end_date_text().map(parse_date)
  }

  /// The raw end date, with blank text treated as absent.
  pub fn end_date_text(&self) -> Option<&str> {
    self
      .end_date
      .as_deref()
      .filter(|s| !s.trim().is_empty())
  }

  pub fn is_ongoing(&self) -> bool { self.end_date_text().is_none() }

  /// The residence as a closed interval, with an ongoing residence running
  /// until `open_end`.
  ///
  /// Returns `None` when a date fails to parse or the interval ends before it
  /// starts; such an address covers no days at all.
  pub fn interval(&self, open_end: NaiveDate) -> Option<Interval> {
    let start = self.start().ok()?;
    let end = match self.end() {
      Some(end) => end.ok()?,
      None => open_end,
    };
    Interval::new(start, end)
  }

  /// One-line human-readable form, e.g. for listings and export headers.
  pub fn summary(&self) -> String {
    let mut parts: Vec<&str> = vec![self.line1.as_str()];
    parts.extend(self.line2.as_deref().filter(|s| !s.is_empty()));
    parts.push(self.town.as_str());
    parts.extend(self.county.as_deref().filter(|s| !s.is_empty()));
    parts.push(self.postcode.as_str());
    parts.push(self.country.as_str());
    parts.join(", ")
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The canonical address order: start date ascending, then creation time.
///
/// Listings and exports must both sort with this so they agree. Addresses
/// with an unparseable start date sort first.
pub fn canonical_order(a: &Address, b: &Address) -> Ordering {
  a.start()
    .ok()
    .cmp(&b.start().ok())
    .then_with(|| a.created_at.cmp(&b.created_at))
}

pub fn sort_canonical(addresses: &mut [Address]) {
  addresses.sort_by(canonical_order);
}

/// The addresses lived at on any day of `range`, in canonical order.
pub fn filter_for_range(addresses: &[Address], range: DateRange) -> Vec<Address> {
  let mut hits: Vec<Address> = addresses
    .iter()
    .filter(|a| range.overlaps(a))
    .cloned()
    .collect();
  sort_canonical(&mut hits);
  hits
}

// ─── NewAddress ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::RecordStore::create_address`].
/// `id`, `created_at` and `updated_at` are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
  pub line1:      String,
  #[serde(default)]
  pub line2:      Option<String>,
  pub town:       String,
  #[serde(default)]
  pub county:     Option<String>,
  pub postcode:   String,
  pub country:    String,
  pub start_date: String,
  #[serde(default)]
  pub end_date:   Option<String>,
}

impl NewAddress {
  /// Stamp the input into a full record.
  pub fn into_address(self, id: Uuid, now: DateTime<Utc>) -> Address {
    Address {
      id,
      line1: self.line1,
      line2: self.line2,
      town: self.town,
      county: self.county,
      postcode: self.postcode,
      country: self.country,
      start_date: self.start_date,
      end_date: self.end_date,
      created_at: now,
      updated_at: now,
    }
  }
}

// ─── AddressPatch ────────────────────────────────────────────────────────────

/// A partial update. `None` leaves a field unchanged; for the nullable fields
/// `Some(None)` clears the value (e.g. marks the residence as ongoing again).
///
/// `id` and `created_at` cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressPatch {
  pub line1:      Option<String>,
  #[serde(deserialize_with = "present")]
  pub line2:      Option<Option<String>>,
  pub town:       Option<String>,
  #[serde(deserialize_with = "present")]
  pub county:     Option<Option<String>>,
  pub postcode:   Option<String>,
  pub country:    Option<String>,
  pub start_date: Option<String>,
  #[serde(deserialize_with = "present")]
  pub end_date:   Option<Option<String>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from a missing key (`None`,
/// via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

impl AddressPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Overwrite the supplied fields of `address` and stamp `updated_at`.
  pub fn apply(self, address: &mut Address, now: DateTime<Utc>) {
    if let Some(v) = self.line1 {
      address.line1 = v;
    }
    if let Some(v) = self.line2 {
      address.line2 = v;
    }
    if let Some(v) = self.town {
      address.town = v;
    }
    if let Some(v) = self.county {
      address.county = v;
    }
    if let Some(v) = self.postcode {
      address.postcode = v;
    }
    if let Some(v) = self.country {
      address.country = v;
    }
    if let Some(v) = self.start_date {
      address.start_date = v;
    }
    if let Some(v) = self.end_date {
      address.end_date = v;
    }
    address.updated_at = now;
  }
}


#[cfg(test)]
mod tests {
  use super::{test_helpers::*, *};

  fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
  }

  #[test]
  fn blank_end_date_is_ongoing() {
    let a = make_address("2020-01-01", Some("  "));
    assert!(a.is_ongoing());
    assert!(a.end().is_none());
  }

  #[test]
  fn interval_uses_open_end_for_ongoing() {
    let a = make_address("2020-01-01", None);
    let end = parse_date("2020-06-01").unwrap();
    let i = a.interval(end).unwrap();
    assert_eq!(i.start, parse_date("2020-01-01").unwrap());
    assert_eq!(i.end, end);
  }

  #[test]
  fn interval_rejects_malformed_and_inverted() {
    let open_end = parse_date("2030-01-01").unwrap();
    assert!(make_address("not a date", None).interval(open_end).is_none());
    assert!(
      make_address("2020-01-01", Some("2020-13-01"))
        .interval(open_end)
        .is_none()
    );
    assert!(
      make_address("2020-02-01", Some("2020-01-31"))
        .interval(open_end)
        .is_none()
    );
  }

  #[test]
  fn same_start_sorts_by_created_at() {
    let later = make_address_at("2020-01-01", None, 200);
    let earlier = make_address_at("2020-01-01", None, 100);
    let mut list = vec![later.clone(), earlier.clone()];
    sort_canonical(&mut list);
    assert_eq!(list[0].id, earlier.id);
    assert_eq!(list[1].id, later.id);
  }

  #[test]
  fn start_date_wins_over_created_at() {
    let old_but_recent = make_address_at("2022-01-01", None, 1);
    let new_but_early = make_address_at("2019-01-01", None, 999);
    let mut list = vec![old_but_recent.clone(), new_but_early.clone()];
    sort_canonical(&mut list);
    assert_eq!(list[0].id, new_but_early.id);
    assert_eq!(list[1].id, old_but_recent.id);
  }

  #[test]
  fn overlap_includes_boundary_days() {
    let r = range("2021-01-01", "2021-12-31");
    assert!(r.overlaps(&make_address("2020-01-01", Some("2021-01-01"))));
    assert!(r.overlaps(&make_address("2021-12-31", None)));
    assert!(!r.overlaps(&make_address("2020-01-01", Some("2020-12-31"))));
    assert!(!r.overlaps(&make_address("2022-01-01", None)));
  }

  #[test]
  fn overlap_excludes_malformed() {
    let r = range("2021-01-01", "2021-12-31");
    assert!(!r.overlaps(&make_address("garbage", None)));
    assert!(!r.overlaps(&make_address("2021-05-01", Some("2021-04-01"))));
  }

  #[test]
  fn filter_for_range_is_canonically_ordered() {
    let b = make_address_at("2021-06-01", None, 1);
    let a = make_address_at("2021-02-01", Some("2021-05-31"), 2);
    let outside = make_address_at("2018-01-01", Some("2019-01-01"), 3);
    let hits = filter_for_range(
      &[b.clone(), outside, a.clone()],
      range("2021-01-01", "2021-12-31"),
    );
    let ids: Vec<Uuid> = hits.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
  }

  #[test]
  fn patch_leaves_unsupplied_fields() {
    let mut a = make_address("2020-01-01", Some("2020-12-31"));
    let before = a.clone();
    let patch = AddressPatch { town: Some("Bristol".into()), ..Default::default() };
    patch.apply(&mut a, at(500));

    assert_eq!(a.town, "Bristol");
    assert_eq!(a.line1, before.line1);
    assert_eq!(a.end_date, before.end_date);
    assert_eq!(a.id, before.id);
    assert_eq!(a.created_at, before.created_at);
    assert_eq!(a.updated_at, at(500));
  }

  #[test]
  fn patch_json_null_clears_end_date() {
    let mut a = make_address("2020-01-01", Some("2020-12-31"));
    let patch: AddressPatch =
      serde_json::from_str(r#"{"endDate": null, "postcode": "BS1 1AA"}"#).unwrap();
    assert_eq!(patch.end_date, Some(None));
    assert_eq!(patch.county, None);
    patch.apply(&mut a, at(1));
    assert!(a.is_ongoing());
    assert_eq!(a.postcode, "BS1 1AA");
    assert_eq!(a.county.as_deref(), Some("Devon"));
  }

  #[test]
  fn empty_patch_is_detected() {
    assert!(AddressPatch::default().is_empty());
    let patch: AddressPatch = serde_json::from_str("{}").unwrap();
    assert!(patch.is_empty());
  }

  #[test]
  fn summary_skips_empty_optional_lines() {
    let mut a = make_address("2020-01-01", None);
    a.line2 = Some(String::new());
    assert_eq!(a.summary(), "1 High Street, Exeter, Devon, EX1 1AA, United Kingdom");
  }

  #[test]
  fn serialises_with_camel_case_keys() {
    let a = make_address("2020-01-01", None);
    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["startDate"], "2020-01-01");
    assert!(json.get("createdAt").is_some());
  }
}
