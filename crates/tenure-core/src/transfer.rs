//! Transfers, the discrete administrative events that change the ownership
//! of one unit, and their supporting documents.
//!
//! A transfer moves through a small state machine:
//!
//! ```text
//! Initiated ──attach──▶ DocumentsAttached ──attach──▶ DocumentsAttached
//!     │                        │
//!     └────────validate────────┴──▶ Validated ──commit──▶ Committed
//!                                       └──────reject──▶ Rejected
//! any pre-Committed state ──cancel──▶ Cancelled
//! ```
//!
//! No ownership record is touched before `Committed`, so cancelling never
//! needs compensation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, ownership::OwnershipChange, validator::Violation};

// ─── Enumerations ────────────────────────────────────────────────────────────

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
pub enum TransferType {
  #[serde(alias = "purchase")]
  Sale,
  Gift,
  Inheritance,
  CourtOrder,
  CorporateRestructuring,
  Correction,
}

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
pub enum TransferStatus {
  Initiated,
  DocumentsAttached,
  Validated,
  Committed,
  Rejected,
  Cancelled,
}

/// Events that drive [`TransferStatus`] forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  AttachDocument,
  Validate,
  Commit,
  Reject,
  Cancel,
}

impl TransferStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Committed | Self::Rejected | Self::Cancelled)
  }

  pub fn is_pending(self) -> bool { !self.is_terminal() }

  /// Documents of cancelled or rejected transfers keep their last
  /// verification status.
  pub fn accepts_verification(self) -> bool {
    !matches!(self, Self::Cancelled | Self::Rejected)
  }

  /// The status reached by applying `event`, or `None` if the event is not
  /// legal from this status.
  pub fn transition(self, event: Transition) -> Option<Self> {
    use TransferStatus::*;
    use Transition as T;

    match (self, event) {
      (Initiated | DocumentsAttached, T::AttachDocument) => Some(DocumentsAttached),
      (Initiated | DocumentsAttached, T::Validate) => Some(Validated),
      (Validated, T::Commit) => Some(Committed),
      (Validated, T::Reject) => Some(Rejected),
      (Initiated | DocumentsAttached | Validated, T::Cancel) => Some(Cancelled),
      _ => None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
  #[default]
  Pending,
  Verified,
  Rejected,
}

// ─── Amount ──────────────────────────────────────────────────────────────────

/// A currency-tagged consideration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
  pub value:    f64,
  /// ISO 4217 code, three uppercase letters.
  pub currency: String,
}

impl Amount {
  pub fn validate(&self) -> Result<(), Error> {
    if !(self.value.is_finite() && self.value > 0.0) {
      return Err(Error::InvalidInput(format!(
        "amount must be positive, got {}",
        self.value
      )));
    }
    let code_ok = self.currency.len() == 3
      && self.currency.chars().all(|c| c.is_ascii_uppercase());
    if !code_ok {
      return Err(Error::InvalidInput(format!(
        "currency {:?} is not a three-letter code",
        self.currency
      )));
    }
    Ok(())
  }
}

// ─── Transfer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
  pub transfer_id:   Uuid,
  pub unit_id:       Uuid,
  pub transfer_type: TransferType,
  pub transfer_date: NaiveDate,
  pub amount:        Option<Amount>,
  pub legal_reason:  Option<String>,
  pub status:        TransferStatus,
  pub initiated_by:  String,
  pub changes:       Vec<OwnershipChange>,
  /// Ownership version of the unit the changes were proposed against.
  pub base_version:  u64,
  /// Set when the transfer was rejected by the validator.
  pub rejection:     Option<Violation>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Caller-supplied request for [`crate::registry::Registry::initiate_transfer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
  pub unit_id:       Uuid,
  pub transfer_type: TransferType,
  pub transfer_date: NaiveDate,
  pub changes:       Vec<OwnershipChange>,
  pub amount:        Option<Amount>,
  pub legal_reason:  Option<String>,
}

/// Input to [`crate::store::RegistryStore::insert_transfer`]; the store
/// assigns the id, timestamps and the `Initiated` status.
#[derive(Debug, Clone)]
pub struct NewTransfer {
  pub unit_id:       Uuid,
  pub transfer_type: TransferType,
  pub transfer_date: NaiveDate,
  pub changes:       Vec<OwnershipChange>,
  pub amount:        Option<Amount>,
  pub legal_reason:  Option<String>,
  pub base_version:  u64,
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// A supporting document. The file itself lives in an external blob store;
/// only its path is recorded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDocument {
  pub document_id:         Uuid,
  pub transfer_id:         Uuid,
  pub document_type:       String,
  pub document_name:       String,
  pub file_path:           String,
  pub upload_date:         Option<NaiveDate>,
  pub uploaded_by:         Option<String>,
  pub verification_status: VerificationStatus,
  pub created_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
  pub document_type: String,
  pub document_name: String,
  pub file_path:     String,
  pub upload_date:   Option<NaiveDate>,
  pub uploaded_by:   Option<String>,
}

/// A transfer bundled with its documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDetails {
  #[serde(flatten)]
  pub transfer:  Transfer,
  pub documents: Vec<TransferDocument>,
}

// ─── Finalization ────────────────────────────────────────────────────────────

/// A new current record to be opened by a committing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Opening {
  pub owner_id:   Uuid,
  pub percentage: f64,
}

/// The validated write-set that
/// [`crate::store::RegistryStore::commit_transfer`] applies atomically.
#[derive(Debug, Clone)]
pub struct Finalization {
  pub transfer_id:      Uuid,
  pub unit_id:          Uuid,
  /// Status the transfer must still be in when the commit runs.
  pub from_status:      TransferStatus,
  /// Unit ownership version the plan was computed against.
  pub expected_version: u64,
  pub transfer_date:    NaiveDate,
  /// Current records to close at `transfer_date`.
  pub closures:         Vec<Uuid>,
  pub openings:         Vec<Opening>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn happy_path_through_the_state_machine() {
    let s = TransferStatus::Initiated;
    let s = s.transition(Transition::AttachDocument).unwrap();
    assert_eq!(s, TransferStatus::DocumentsAttached);
    let s = s.transition(Transition::AttachDocument).unwrap();
    let s = s.transition(Transition::Validate).unwrap();
    assert_eq!(s, TransferStatus::Validated);
    assert_eq!(
      s.transition(Transition::Commit),
      Some(TransferStatus::Committed)
    );
  }

  #[test]
  fn terminal_states_accept_nothing() {
    let events = [
      Transition::AttachDocument,
      Transition::Validate,
      Transition::Commit,
      Transition::Reject,
      Transition::Cancel,
    ];
    for status in [
      TransferStatus::Committed,
      TransferStatus::Rejected,
      TransferStatus::Cancelled,
    ] {
      assert!(status.is_terminal());
      for event in events {
        assert_eq!(status.transition(event), None, "{status} + {event:?}");
      }
    }
  }

  #[test]
  fn reject_only_from_validated() {
    assert_eq!(TransferStatus::Initiated.transition(Transition::Reject), None);
    assert_eq!(
      TransferStatus::Validated.transition(Transition::Reject),
      Some(TransferStatus::Rejected)
    );
  }

  #[test]
  fn documents_cannot_be_attached_after_validation() {
    assert_eq!(
      TransferStatus::Validated.transition(Transition::AttachDocument),
      None
    );
  }

  #[test]
  fn status_text_roundtrips_through_strum() {
    let s: TransferStatus = "documents_attached".parse().unwrap();
    assert_eq!(s, TransferStatus::DocumentsAttached);
    assert_eq!(TransferType::CourtOrder.as_ref(), "court_order");
  }

  #[test]
  fn purchase_is_accepted_as_sale() {
    let t: TransferType = serde_json::from_str("\"purchase\"").unwrap();
    assert_eq!(t, TransferType::Sale);
  }

  #[test]
  fn amount_rejects_bad_currency_and_non_positive_values() {
    let ok = Amount { value: 1_250_000.0, currency: "AED".into() };
    assert!(ok.validate().is_ok());
    assert!(Amount { value: 0.0, currency: "AED".into() }.validate().is_err());
    assert!(Amount { value: 10.0, currency: "aed".into() }.validate().is_err());
    assert!(Amount { value: 10.0, currency: "DIRH".into() }.validate().is_err());
  }
}
