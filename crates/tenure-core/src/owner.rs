//! Owners: individuals or corporate entities that can hold a stake in a unit.
//!
//! The individual/corporate split is a tagged variant over a shared identity
//! core, so an individual without an Emirates ID cannot be constructed.

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Emirates ID ─────────────────────────────────────────────────────────────

static EMIRATES_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^784-[0-9]{4}-[0-9]{7}-[0-9]$").expect("static pattern")
});

/// A national identity number in the `784-XXXX-XXXXXXX-X` format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmiratesId(String);

impl EmiratesId {
  pub fn parse(raw: &str) -> Result<Self, Error> {
    let trimmed = raw.trim();
    if EMIRATES_ID_PATTERN.is_match(trimmed) {
      Ok(Self(trimmed.to_owned()))
    } else {
      Err(Error::InvalidInput(format!(
        "emirates id {raw:?} does not match 784-XXXX-XXXXXXX-X"
      )))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for EmiratesId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for EmiratesId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<EmiratesId> for String {
  fn from(id: EmiratesId) -> Self { id.0 }
}

impl fmt::Display for EmiratesId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Owner kinds ─────────────────────────────────────────────────────────────

/// Discriminant stored in the `owner_type` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OwnerType {
  Individual,
  Corporate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualDetails {
  pub emirates_id:     EmiratesId,
  pub first_name:      Option<String>,
  pub last_name:       Option<String>,
  pub date_of_birth:   Option<NaiveDate>,
  pub nationality:     Option<String>,
  pub passport_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateDetails {
  pub company_type:         Option<String>,
  pub trade_license_number: Option<String>,
  /// Corporate owners may be registered with a representative's ID.
  pub emirates_id:          Option<EmiratesId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "owner_type", rename_all = "snake_case")]
pub enum OwnerKind {
  Individual(IndividualDetails),
  Corporate(CorporateDetails),
}

impl OwnerKind {
  pub fn owner_type(&self) -> OwnerType {
    match self {
      Self::Individual(_) => OwnerType::Individual,
      Self::Corporate(_) => OwnerType::Corporate,
    }
  }

  pub fn emirates_id(&self) -> Option<&EmiratesId> {
    match self {
      Self::Individual(d) => Some(&d.emirates_id),
      Self::Corporate(d) => d.emirates_id.as_ref(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
  pub phone: Option<String>,
  pub email: Option<String>,
}

// ─── Owner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
  pub owner_id:   Uuid,
  pub full_name:  String,
  #[serde(flatten)]
  pub kind:       OwnerKind,
  #[serde(default)]
  pub contact:    ContactDetails,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

impl Owner {
  pub fn owner_type(&self) -> OwnerType { self.kind.owner_type() }

  pub fn emirates_id(&self) -> Option<&EmiratesId> { self.kind.emirates_id() }
}

/// Input to [`crate::store::RegistryStore::add_owner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOwner {
  pub full_name: String,
  #[serde(flatten)]
  pub kind:      OwnerKind,
  #[serde(default)]
  pub contact:   ContactDetails,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emirates_id_accepts_canonical_format() {
    let id = EmiratesId::parse("784-1990-1234567-1").unwrap();
    assert_eq!(id.as_str(), "784-1990-1234567-1");
  }

  #[test]
  fn emirates_id_rejects_wrong_prefix_and_lengths() {
    for raw in [
      "785-1990-1234567-1",
      "784-199-1234567-1",
      "784-1990-123456-1",
      "784-1990-1234567-12",
      "784199012345671",
      "",
    ] {
      assert!(EmiratesId::parse(raw).is_err(), "{raw:?} accepted");
    }
  }

  #[test]
  fn individual_without_emirates_id_fails_to_deserialize() {
    let body = serde_json::json!({
      "full_name":  "Mariam Al Nuaimi",
      "owner_type": "individual",
      "first_name": "Mariam",
    });
    assert!(serde_json::from_value::<NewOwner>(body).is_err());
  }

  #[test]
  fn corporate_without_emirates_id_is_fine() {
    let body = serde_json::json!({
      "full_name":            "Palm Holdings LLC",
      "owner_type":           "corporate",
      "trade_license_number": "TL-55821",
    });
    let owner: NewOwner = serde_json::from_value(body).unwrap();
    assert_eq!(owner.kind.owner_type(), OwnerType::Corporate);
    assert!(owner.kind.emirates_id().is_none());
  }
}
