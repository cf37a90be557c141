//! Units: the immutable identity of a piece of property.
//!
//! A unit is created once and never deleted. It can be soft-retired, after
//! which no transfer may be initiated or finalized against it. Transfers
//! still pending at retirement can only be cancelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
  pub unit_id:       Uuid,
  /// Registry-wide unique key, e.g. a land-department reference.
  pub unique_key:    String,
  pub building_name: String,
  pub unit_number:   String,
  pub created_at:    DateTime<Utc>,
  pub retired_at:    Option<DateTime<Utc>>,
}

impl Unit {
  pub fn is_retired(&self) -> bool { self.retired_at.is_some() }
}

/// Input to [`crate::store::RegistryStore::add_unit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUnit {
  pub unique_key:    String,
  pub building_name: String,
  pub unit_number:   String,
}
