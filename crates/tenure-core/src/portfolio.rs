//! Owner portfolio: everything an owner holds or has held, with co-owners.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{owner::Owner, ownership::OwnershipRecord, unit::Unit};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  Current,
  Historical,
  #[default]
  All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioQuery {
  #[serde(default)]
  pub status: StatusFilter,
  /// Keep only records whose interval overlaps `[from, to]`.
  pub from:   Option<NaiveDate>,
  pub to:     Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
  pub building_name: String,
  pub unit_number:   String,
  #[serde(flatten)]
  pub record:        OwnershipRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
  pub owner:            Owner,
  pub current:          Vec<Holding>,
  pub historical:       Vec<Holding>,
  /// For each unit the owner currently holds, the other current owners.
  pub joint_ownerships: BTreeMap<Uuid, Vec<Uuid>>,
}

/// Assemble a portfolio from an owner's records. `units` must contain every
/// unit referenced by `records`; `co_owners` maps a unit to all of its
/// current owners.
pub fn assemble(
  owner: Owner,
  records: Vec<OwnershipRecord>,
  units: &BTreeMap<Uuid, Unit>,
  co_owners: &BTreeMap<Uuid, Vec<Uuid>>,
  query: &PortfolioQuery,
) -> Portfolio {
  let mut current = Vec::new();
  let mut historical = Vec::new();
  let mut joint_ownerships = BTreeMap::new();

  for record in records {
    let wanted = match query.status {
      StatusFilter::Current => record.is_current,
      StatusFilter::Historical => !record.is_current,
      StatusFilter::All => true,
    };
    if !wanted || !record.overlaps(query.from, query.to) {
      continue;
    }
    let Some(unit) = units.get(&record.unit_id) else { continue };

    if record.is_current {
      let others: Vec<Uuid> = co_owners
        .get(&record.unit_id)
        .into_iter()
        .flatten()
        .copied()
        .filter(|id| *id != owner.owner_id)
        .collect();
      if !others.is_empty() {
        joint_ownerships.insert(record.unit_id, others);
      }
    }

    let holding = Holding {
      building_name: unit.building_name.clone(),
      unit_number: unit.unit_number.clone(),
      record,
    };
    if holding.record.is_current {
      current.push(holding);
    } else {
      historical.push(holding);
    }
  }

  current.sort_by_key(|h| h.record.start_date);
  historical.sort_by_key(|h| h.record.start_date);

  Portfolio { owner, current, historical, joint_ownerships }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::owner::{CorporateDetails, OwnerKind};

  fn owner() -> Owner {
    Owner {
      owner_id:   Uuid::new_v4(),
      full_name:  "Creek Estates LLC".into(),
      kind:       OwnerKind::Corporate(CorporateDetails {
        company_type:         Some("LLC".into()),
        trade_license_number: None,
        emirates_id:          None,
      }),
      contact:    Default::default(),
      is_active:  true,
      created_at: Utc::now(),
    }
  }

  fn unit(n: &str) -> Unit {
    Unit {
      unit_id:       Uuid::new_v4(),
      unique_key:    format!("DXB-{n}"),
      building_name: "Marina Heights".into(),
      unit_number:   n.into(),
      created_at:    Utc::now(),
      retired_at:    None,
    }
  }

  fn record(owner_id: Uuid, unit_id: Uuid, start: NaiveDate, end: Option<NaiveDate>) -> OwnershipRecord {
    OwnershipRecord {
      record_id: Uuid::new_v4(),
      unit_id,
      owner_id,
      transfer_id: None,
      start_date: start,
      end_date: end,
      percentage: 50.0,
      is_current: end.is_none(),
      created_at: Utc::now(),
    }
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn splits_current_and_historical_and_lists_co_owners() {
    let me = owner();
    let partner = Uuid::new_v4();
    let (u1, u2) = (unit("1201"), unit("804"));
    let records = vec![
      record(me.owner_id, u1.unit_id, date(2021, 1, 1), None),
      record(me.owner_id, u2.unit_id, date(2018, 1, 1), Some(date(2020, 1, 1))),
    ];
    let units = BTreeMap::from([(u1.unit_id, u1.clone()), (u2.unit_id, u2)]);
    let co = BTreeMap::from([(u1.unit_id, vec![me.owner_id, partner])]);

    let p = assemble(me, records, &units, &co, &PortfolioQuery::default());

    assert_eq!(p.current.len(), 1);
    assert_eq!(p.historical.len(), 1);
    assert_eq!(p.current[0].unit_number, "1201");
    assert_eq!(p.joint_ownerships.get(&u1.unit_id), Some(&vec![partner]));
  }

  #[test]
  fn date_window_drops_records_outside_it() {
    let me = owner();
    let u = unit("1201");
    let records = vec![
      record(me.owner_id, u.unit_id, date(2015, 1, 1), Some(date(2016, 1, 1))),
      record(me.owner_id, u.unit_id, date(2019, 1, 1), Some(date(2022, 1, 1))),
    ];
    let units = BTreeMap::from([(u.unit_id, u)]);
    let query = PortfolioQuery {
      status: StatusFilter::Historical,
      from:   Some(date(2020, 1, 1)),
      to:     Some(date(2020, 12, 31)),
    };

    let p = assemble(me, records, &units, &BTreeMap::new(), &query);

    assert_eq!(p.historical.len(), 1);
    assert_eq!(p.historical[0].record.start_date, date(2019, 1, 1));
  }
}
