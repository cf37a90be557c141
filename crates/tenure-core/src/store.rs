//! The `RegistryStore` trait: durable storage for the registry's rows.
//!
//! The trait is implemented by storage backends (e.g. `tenure-store-sqlite`).
//! Higher layers ([`crate::registry::Registry`], `tenure-api`) depend on this
//! abstraction, not on any concrete backend.
//!
//! Every mutating method writes its audit entries in the same atomic unit as
//! the mutation itself: either both become durable or neither does.
//! Status-changing methods take the status the caller observed and fail if
//! the row has moved on since (compare-and-set).

use std::future::Future;

use uuid::Uuid;

use crate::{
  audit::{AuditEntry, AuditQuery, Provenance},
  owner::{EmiratesId, NewOwner, Owner},
  ownership::{OwnershipRecord, UnitState},
  transfer::{
    Finalization, NewDocument, NewTransfer, Transfer, TransferDocument,
    TransferStatus, VerificationStatus,
  },
  unit::{NewUnit, Unit},
  validator::Violation,
};

pub trait RegistryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Units ─────────────────────────────────────────────────────────────

  fn add_unit(
    &self,
    input: NewUnit,
    who: &Provenance,
  ) -> impl Future<Output = Result<Unit, Self::Error>> + Send;

  fn get_unit(
    &self,
    unit_id: Uuid,
  ) -> impl Future<Output = Result<Option<Unit>, Self::Error>> + Send;

  fn list_units(
    &self,
  ) -> impl Future<Output = Result<Vec<Unit>, Self::Error>> + Send;

  /// Soft-retire a unit. Retiring an already-retired unit returns it as-is.
  fn retire_unit(
    &self,
    unit_id: Uuid,
    who: &Provenance,
  ) -> impl Future<Output = Result<Unit, Self::Error>> + Send;

  // ── Owners ────────────────────────────────────────────────────────────

  fn add_owner(
    &self,
    input: NewOwner,
    who: &Provenance,
  ) -> impl Future<Output = Result<Owner, Self::Error>> + Send;

  fn get_owner(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<Owner>, Self::Error>> + Send;

  fn find_owner_by_emirates_id(
    &self,
    emirates_id: &EmiratesId,
  ) -> impl Future<Output = Result<Option<Owner>, Self::Error>> + Send;

  // ── Ownership ─────────────────────────────────────────────────────────

  /// A consistent snapshot of a unit, its full history and its ownership
  /// version. Returns `None` if the unit does not exist.
  fn unit_state(
    &self,
    unit_id: Uuid,
  ) -> impl Future<Output = Result<Option<UnitState>, Self::Error>> + Send;

  /// Every ownership record an owner has ever held, across units.
  fn owner_records(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<OwnershipRecord>, Self::Error>> + Send;

  // ── Transfers ─────────────────────────────────────────────────────────

  /// Persist a new transfer in `Initiated` status.
  fn insert_transfer(
    &self,
    input: NewTransfer,
    who: &Provenance,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send;

  fn get_transfer(
    &self,
    transfer_id: Uuid,
  ) -> impl Future<Output = Result<Option<Transfer>, Self::Error>> + Send;

  /// All transfers of a unit, oldest first.
  fn list_transfers(
    &self,
    unit_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Transfer>, Self::Error>> + Send;

  /// Append a document and move the transfer from `from` to
  /// `DocumentsAttached`.
  fn attach_document(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    input: NewDocument,
    who: &Provenance,
  ) -> impl Future<Output = Result<TransferDocument, Self::Error>> + Send;

  fn list_documents(
    &self,
    transfer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TransferDocument>, Self::Error>> + Send;

  fn get_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<TransferDocument>, Self::Error>> + Send;

  /// Fails with `InvalidTransferState` if the document's transfer has been
  /// cancelled or rejected.
  fn set_document_status(
    &self,
    document_id: Uuid,
    status: VerificationStatus,
    who: &Provenance,
  ) -> impl Future<Output = Result<TransferDocument, Self::Error>> + Send;

  /// Atomically close superseded records, open new ones, bump the unit's
  /// ownership version and mark the transfer `Committed`. Fails without any
  /// visible effect if the unit version or the transfer status moved, or if
  /// the unit has been retired.
  fn commit_transfer(
    &self,
    plan: Finalization,
    who: &Provenance,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send;

  /// Mark a transfer `Rejected` with its violation, provided the unit is
  /// still at `expected_version`.
  fn reject_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    expected_version: u64,
    violation: Violation,
    who: &Provenance,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send;

  fn cancel_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    who: &Provenance,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send;

  /// Re-pin a pending transfer to a newer unit ownership version.
  fn rebase_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    base_version: u64,
    who: &Provenance,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send;

  // ── Audit ─────────────────────────────────────────────────────────────

  /// Audit entries matching `query`, in sequence order.
  fn audit_entries(
    &self,
    query: AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send;
}
