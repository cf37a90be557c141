//! The invariant validator.
//!
//! Pure checks over a unit's ownership history and the state a transfer
//! would leave behind. Checks run in a fixed order and stop at the first
//! failure:
//!
//! 1. every proposed percentage is in `(0, 100]`;
//! 2. current percentages sum to 100 within [`PERCENTAGE_EPSILON`];
//! 3. no owner holds two current records;
//! 4. per-owner intervals are well-formed and never overlap, and recorded
//!    history is only ever extended;
//! 5. the transfer is not dated after the processing day.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ownership::{FULL_OWNERSHIP, OwnershipSlice, PERCENTAGE_EPSILON};

/// A specific invariant a proposed write-set breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
  #[error("owner {owner_id} would hold {percentage}%, outside (0, 100]")]
  PercentageOutOfRange { owner_id: Uuid, percentage: f64 },

  #[error("current stakes sum to {total}%, expected 100%")]
  PercentageSumMismatch { total: f64 },

  #[error("owner {owner_id} would hold more than one current record")]
  DuplicateCurrentOwner { owner_id: Uuid },

  #[error("ownership intervals for owner {owner_id} overlap")]
  IntervalOverlap { owner_id: Uuid },

  #[error("recorded history for record {record_id} would be rewritten")]
  HistoryRewritten { record_id: Uuid },

  #[error("transfer dated {transfer_date} is after {today}")]
  FutureDatedTransfer {
    transfer_date: NaiveDate,
    today:         NaiveDate,
  },
}

/// Validate the post-transfer state `proposed` against the unit's recorded
/// history `current`.
pub fn validate(
  current: &[OwnershipSlice],
  proposed: &[OwnershipSlice],
  transfer_date: NaiveDate,
  today: NaiveDate,
) -> Result<(), Violation> {
  check_percentage_ranges(proposed)?;
  check_percentage_sum(proposed)?;
  check_single_current(proposed)?;
  check_intervals(current, proposed)?;
  check_transfer_date(transfer_date, today)
}

fn check_percentage_ranges(proposed: &[OwnershipSlice]) -> Result<(), Violation> {
  match proposed
    .iter()
    .find(|s| !(s.percentage > 0.0 && s.percentage <= FULL_OWNERSHIP))
  {
    Some(s) => Err(Violation::PercentageOutOfRange {
      owner_id:   s.owner_id,
      percentage: s.percentage,
    }),
    None => Ok(()),
  }
}

fn check_percentage_sum(proposed: &[OwnershipSlice]) -> Result<(), Violation> {
  let total: f64 = proposed
    .iter()
    .filter(|s| s.is_current)
    .map(|s| s.percentage)
    .sum();
  if (total - FULL_OWNERSHIP).abs() > PERCENTAGE_EPSILON {
    return Err(Violation::PercentageSumMismatch { total });
  }
  Ok(())
}

fn check_single_current(proposed: &[OwnershipSlice]) -> Result<(), Violation> {
  let mut seen = HashSet::new();
  for s in proposed.iter().filter(|s| s.is_current) {
    if !seen.insert(s.owner_id) {
      return Err(Violation::DuplicateCurrentOwner { owner_id: s.owner_id });
    }
  }
  Ok(())
}

fn check_intervals(
  current: &[OwnershipSlice],
  proposed: &[OwnershipSlice],
) -> Result<(), Violation> {
  // History is append-only: every recorded slice must survive with its start
  // and stake intact, and a closed slice must stay closed where it was.
  let by_id: HashMap<Uuid, &OwnershipSlice> = proposed
    .iter()
    .filter_map(|s| s.record_id.map(|id| (id, s)))
    .collect();
  for old in current {
    let Some(record_id) = old.record_id else { continue };
    let rewritten = match by_id.get(&record_id) {
      None => true,
      Some(new) => {
        new.owner_id != old.owner_id
          || new.start_date != old.start_date
          || new.percentage != old.percentage
          || (old.end_date.is_some() && new.end_date != old.end_date)
      }
    };
    if rewritten {
      return Err(Violation::HistoryRewritten { record_id });
    }
  }

  let mut per_owner: BTreeMap<Uuid, Vec<&OwnershipSlice>> = BTreeMap::new();
  for s in proposed {
    // A closing date before the start would make the interval negative.
    if s.end_date.is_some_and(|end| end < s.start_date) {
      return Err(Violation::IntervalOverlap { owner_id: s.owner_id });
    }
    // A current slice is open-ended and vice versa.
    if s.is_current != s.end_date.is_none() {
      return Err(Violation::IntervalOverlap { owner_id: s.owner_id });
    }
    per_owner.entry(s.owner_id).or_default().push(s);
  }

  for (owner_id, mut slices) in per_owner {
    // Open-ended slices sort after closed ones that start on the same day.
    slices.sort_by_key(|s| (s.start_date, s.end_date.is_none(), s.end_date));
    for pair in slices.windows(2) {
      let (earlier, later) = (pair[0], pair[1]);
      match earlier.end_date {
        Some(end) if end <= later.start_date => {}
        _ => return Err(Violation::IntervalOverlap { owner_id }),
      }
    }
  }
  Ok(())
}

/// A transfer may not be dated after the day it is processed.
pub fn check_transfer_date(
  transfer_date: NaiveDate,
  today: NaiveDate,
) -> Result<(), Violation> {
  if transfer_date > today {
    return Err(Violation::FutureDatedTransfer { transfer_date, today });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn open(owner_id: Uuid, start: NaiveDate, percentage: f64) -> OwnershipSlice {
    OwnershipSlice {
      record_id: Some(Uuid::new_v4()),
      owner_id,
      start_date: start,
      end_date: None,
      percentage,
      is_current: true,
    }
  }

  fn closed_at(s: &OwnershipSlice, end: NaiveDate) -> OwnershipSlice {
    OwnershipSlice { end_date: Some(end), is_current: false, ..s.clone() }
  }

  fn fresh(owner_id: Uuid, start: NaiveDate, percentage: f64) -> OwnershipSlice {
    OwnershipSlice { record_id: None, ..open(owner_id, start, percentage) }
  }

  const TODAY: (i32, u32, u32) = (2024, 6, 1);

  fn today() -> NaiveDate { date(TODAY.0, TODAY.1, TODAY.2) }

  #[test]
  fn full_sale_is_valid() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let a_rec = open(a, date(2020, 3, 1), 100.0);
    let sale = date(2024, 1, 10);
    let proposed = vec![closed_at(&a_rec, sale), fresh(b, sale, 100.0)];

    assert_eq!(validate(&[a_rec], &proposed, sale, today()), Ok(()));
  }

  #[test]
  fn partial_sum_is_a_mismatch() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let a_rec = open(a, date(2020, 3, 1), 100.0);
    let t = date(2024, 1, 10);
    let proposed =
      vec![closed_at(&a_rec, t), fresh(a, t, 60.0), fresh(b, t, 30.0)];

    let err = validate(&[a_rec], &proposed, t, today()).unwrap_err();
    assert!(matches!(err, Violation::PercentageSumMismatch { total } if (total - 90.0).abs() < 1e-9));
  }

  #[test]
  fn thirds_sum_within_epsilon() {
    let t = date(2024, 1, 10);
    let proposed: Vec<_> =
      (0..3).map(|_| fresh(Uuid::new_v4(), t, 100.0 / 3.0)).collect();
    assert_eq!(validate(&[], &proposed, t, today()), Ok(()));
  }

  #[test]
  fn range_check_runs_before_sum_check() {
    let t = date(2024, 1, 10);
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let proposed = vec![fresh(a, t, 120.0), fresh(b, t, -20.0)];

    let err = validate(&[], &proposed, t, today()).unwrap_err();
    assert_eq!(err, Violation::PercentageOutOfRange {
      owner_id:   a,
      percentage: 120.0,
    });
  }

  #[test]
  fn duplicate_current_owner_is_rejected() {
    let t = date(2024, 1, 10);
    let a = Uuid::new_v4();
    let proposed = vec![fresh(a, t, 50.0), fresh(a, t, 50.0)];

    let err = validate(&[], &proposed, t, today()).unwrap_err();
    assert_eq!(err, Violation::DuplicateCurrentOwner { owner_id: a });
  }

  #[test]
  fn closing_before_start_is_an_overlap() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let a_rec = open(a, date(2024, 3, 1), 100.0);
    let backdated = date(2024, 1, 10);
    let proposed =
      vec![closed_at(&a_rec, backdated), fresh(b, backdated, 100.0)];

    let err = validate(&[a_rec], &proposed, backdated, today()).unwrap_err();
    assert_eq!(err, Violation::IntervalOverlap { owner_id: a });
  }

  #[test]
  fn reopening_inside_a_closed_interval_is_an_overlap() {
    let a = Uuid::new_v4();
    let history = closed_at(&open(a, date(2020, 1, 1), 100.0), date(2023, 1, 1));
    let t = date(2022, 6, 1);
    let proposed = vec![history.clone(), fresh(a, t, 100.0)];

    let err = validate(&[history], &proposed, t, today()).unwrap_err();
    assert_eq!(err, Violation::IntervalOverlap { owner_id: a });
  }

  #[test]
  fn same_day_close_and_reopen_is_allowed() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let a_rec = open(a, date(2020, 1, 1), 100.0);
    let t = date(2024, 1, 10);
    let proposed =
      vec![closed_at(&a_rec, t), fresh(a, t, 40.0), fresh(b, t, 60.0)];

    assert_eq!(validate(&[a_rec], &proposed, t, today()), Ok(()));
  }

  #[test]
  fn dropping_a_recorded_slice_rewrites_history() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let a_rec = open(a, date(2020, 1, 1), 100.0);
    let t = date(2024, 1, 10);
    let proposed = vec![fresh(b, t, 100.0)];

    let err = validate(&[a_rec.clone()], &proposed, t, today()).unwrap_err();
    assert_eq!(err, Violation::HistoryRewritten {
      record_id: a_rec.record_id.unwrap(),
    });
  }

  #[test]
  fn future_dated_transfer_is_rejected_last() {
    let t = date(2024, 6, 2);
    let proposed = vec![fresh(Uuid::new_v4(), t, 100.0)];

    let err = validate(&[], &proposed, t, today()).unwrap_err();
    assert_eq!(err, Violation::FutureDatedTransfer {
      transfer_date: t,
      today:         today(),
    });
  }

  #[test]
  fn violation_serializes_with_kind_tag() {
    let v = Violation::PercentageSumMismatch { total: 90.0 };
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["kind"], "percentage_sum_mismatch");
    assert_eq!(json["total"], 90.0);
  }
}
