//! Turning a transfer's recorded changes into a proposed end-state.

use chrono::NaiveDate;

use crate::{
  ownership::{OwnershipChange, OwnershipRecord, OwnershipSlice, PERCENTAGE_EPSILON},
  transfer::Opening,
};

/// The state a transfer would leave behind, plus the writes that produce it.
#[derive(Debug, Clone, Default)]
pub struct Proposal {
  /// Every slice of the unit after the transfer: history, untouched current
  /// records, closed records and newly opened ones.
  pub slices:   Vec<OwnershipSlice>,
  /// Record ids of current records the transfer closes.
  pub closures: Vec<uuid::Uuid>,
  pub openings: Vec<Opening>,
}

impl Proposal {
  pub fn is_noop(&self) -> bool {
    self.closures.is_empty() && self.openings.is_empty()
  }
}

/// Apply `changes` to a unit's `records` as of `transfer_date`.
///
/// For each listed owner: a target equal to the current stake leaves the
/// record alone; any other target closes the current record (if one exists)
/// and opens a new one unless the target is zero. Unlisted owners are
/// untouched. Nothing here rejects bad input; see [`crate::validator`].
pub fn propose(
  records: &[OwnershipRecord],
  changes: &[OwnershipChange],
  transfer_date: NaiveDate,
) -> Proposal {
  let mut proposal = Proposal::default();

  for change in changes {
    let current = records
      .iter()
      .find(|r| r.is_current && r.owner_id == change.owner_id);

    if let Some(rec) = current {
      if (rec.percentage - change.percentage).abs() <= PERCENTAGE_EPSILON {
        continue;
      }
      proposal.closures.push(rec.record_id);
    }
    if change.percentage.abs() > PERCENTAGE_EPSILON {
      proposal.openings.push(Opening {
        owner_id:   change.owner_id,
        percentage: change.percentage,
      });
    }
  }

  proposal.slices = records
    .iter()
    .map(|r| {
      let mut slice = r.slice();
      if proposal.closures.contains(&r.record_id) {
        slice.end_date = Some(transfer_date);
        slice.is_current = false;
      }
      slice
    })
    .chain(proposal.openings.iter().map(|o| OwnershipSlice {
      record_id:  None,
      owner_id:   o.owner_id,
      start_date: transfer_date,
      end_date:   None,
      percentage: o.percentage,
      is_current: true,
    }))
    .collect();

  proposal
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn current(owner_id: Uuid, percentage: f64) -> OwnershipRecord {
    OwnershipRecord {
      record_id: Uuid::new_v4(),
      unit_id: Uuid::nil(),
      owner_id,
      transfer_id: None,
      start_date: date(2020, 1, 1),
      end_date: None,
      percentage,
      is_current: true,
      created_at: Utc::now(),
    }
  }

  fn change(owner_id: Uuid, percentage: f64) -> OwnershipChange {
    OwnershipChange { owner_id, percentage }
  }

  #[test]
  fn full_sale_closes_seller_and_opens_buyer() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let rec = current(a, 100.0);
    let t = date(2024, 1, 10);

    let p = propose(&[rec.clone()], &[change(a, 0.0), change(b, 100.0)], t);

    assert_eq!(p.closures, vec![rec.record_id]);
    assert_eq!(p.openings, vec![Opening { owner_id: b, percentage: 100.0 }]);
    let closed = p.slices.iter().find(|s| s.record_id == Some(rec.record_id)).unwrap();
    assert_eq!(closed.end_date, Some(t));
    assert!(!closed.is_current);
    assert_eq!(p.slices.len(), 2);
  }

  #[test]
  fn unchanged_and_unlisted_owners_are_untouched() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let records = vec![current(a, 50.0), current(b, 50.0)];

    let p = propose(&records, &[change(a, 50.0), change(c, 0.0)], date(2024, 1, 10));

    assert!(p.is_noop());
    assert_eq!(p.slices.len(), 2);
    assert!(p.slices.iter().all(|s| s.is_current));
  }

  #[test]
  fn partial_sale_reopens_seller_at_new_stake() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let rec = current(a, 100.0);

    let p = propose(&[rec.clone()], &[change(a, 40.0), change(b, 60.0)], date(2024, 1, 10));

    assert_eq!(p.closures, vec![rec.record_id]);
    assert_eq!(p.openings.len(), 2);
    let current_total: f64 =
      p.slices.iter().filter(|s| s.is_current).map(|s| s.percentage).sum();
    assert!((current_total - 100.0).abs() < 1e-9);
  }
}
