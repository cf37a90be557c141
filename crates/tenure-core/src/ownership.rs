//! Ownership records: time-sliced claims of a percentage of a unit.
//!
//! History is append-only: a record is never deleted. When an owner's stake
//! changes, the current record is closed (end date set, current flag cleared)
//! and a new current record is opened.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{owner::Owner, unit::Unit};

/// Tolerance used for every percentage comparison.
pub const PERCENTAGE_EPSILON: f64 = 1e-6;

/// Total stake of a fully-owned unit.
pub const FULL_OWNERSHIP: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRecord {
  pub record_id:   Uuid,
  pub unit_id:     Uuid,
  pub owner_id:    Uuid,
  /// The transfer that opened this record.
  pub transfer_id: Option<Uuid>,
  pub start_date:  NaiveDate,
  /// Exclusive end of the interval; `None` while current.
  pub end_date:    Option<NaiveDate>,
  pub percentage:  f64,
  pub is_current:  bool,
  pub created_at:  DateTime<Utc>,
}

impl OwnershipRecord {
  pub fn slice(&self) -> OwnershipSlice {
    OwnershipSlice {
      record_id:  Some(self.record_id),
      owner_id:   self.owner_id,
      start_date: self.start_date,
      end_date:   self.end_date,
      percentage: self.percentage,
      is_current: self.is_current,
    }
  }

  /// Whether `[start, end)` intersects the inclusive window `[from, to]`.
  pub fn overlaps(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    let starts_before_window_ends = to.is_none_or(|to| self.start_date <= to);
    let ends_after_window_starts = match (self.end_date, from) {
      (Some(end), Some(from)) => end > from,
      _ => true,
    };
    starts_before_window_ends && ends_after_window_starts
  }
}

/// The interval-and-stake view of a record that the validator reasons about.
/// `record_id` is `None` for records a proposal would newly open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipSlice {
  pub record_id:  Option<Uuid>,
  pub owner_id:   Uuid,
  pub start_date: NaiveDate,
  pub end_date:   Option<NaiveDate>,
  pub percentage: f64,
  pub is_current: bool,
}

/// One owner's target stake after a transfer. A percentage of `0` removes
/// the owner from the unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnershipChange {
  pub owner_id:   Uuid,
  pub percentage: f64,
}

/// A unit together with its full ownership history and the version number
/// that guards concurrent writers.
#[derive(Debug, Clone)]
pub struct UnitState {
  pub unit:    Unit,
  /// Incremented by every committed transfer.
  pub version: u64,
  pub records: Vec<OwnershipRecord>,
}

impl UnitState {
  pub fn current_records(&self) -> impl Iterator<Item = &OwnershipRecord> {
    self.records.iter().filter(|r| r.is_current)
  }
}

/// An owner's present-day stake in a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStake {
  pub owner:      Owner,
  pub percentage: f64,
  pub since:      NaiveDate,
  pub record_id:  Uuid,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(start: (i32, u32, u32), end: Option<(i32, u32, u32)>) -> OwnershipRecord {
    let date = |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    OwnershipRecord {
      record_id:   Uuid::new_v4(),
      unit_id:     Uuid::new_v4(),
      owner_id:    Uuid::new_v4(),
      transfer_id: None,
      start_date:  date(start),
      end_date:    end.map(date),
      percentage:  100.0,
      is_current:  end.is_none(),
      created_at:  Utc::now(),
    }
  }

  fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, day)
  }

  #[test]
  fn open_record_overlaps_any_window_after_start() {
    let r = record((2020, 1, 1), None);
    assert!(r.overlaps(d(2023, 1, 1), d(2023, 12, 31)));
    assert!(r.overlaps(None, None));
    assert!(!r.overlaps(None, d(2019, 12, 31)));
  }

  #[test]
  fn closed_record_window_is_half_open() {
    let r = record((2020, 1, 1), Some((2021, 1, 1)));
    assert!(r.overlaps(d(2020, 6, 1), d(2020, 7, 1)));
    assert!(!r.overlaps(d(2021, 1, 1), d(2022, 1, 1)));
    assert!(r.overlaps(d(2019, 1, 1), d(2025, 1, 1)));
  }
}
