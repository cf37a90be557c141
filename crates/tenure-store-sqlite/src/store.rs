//! [`SqliteStore`]: the SQLite implementation of [`RegistryStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use tenure_core::{
  Entity, Error as CoreError,
  audit::{AuditEntry, AuditQuery, NewAuditEntry, Provenance, tables},
  owner::{EmiratesId, NewOwner, Owner},
  ownership::{OwnershipRecord, UnitState},
  store::RegistryStore,
  transfer::{
    Finalization, NewDocument, NewTransfer, Transfer, TransferDocument,
    TransferStatus, Transition, VerificationStatus,
  },
  unit::{NewUnit, Unit},
  validator::Violation,
};

use crate::{
  Result, audit,
  encode::{
    AUDIT_COLUMNS, DOCUMENT_COLUMNS, OWNER_COLUMNS, RECORD_COLUMNS,
    RawAuditEntry, RawDocument, RawOwner, RawRecord, RawTransfer, RawUnit,
    TRANSFER_COLUMNS, UNIT_COLUMNS, encode_date, encode_dt, encode_uuid,
    encode_version,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A registry store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls are
/// serialised onto the connection's thread, and every mutation runs in an
/// `IMMEDIATE` transaction together with its audit entries.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .run(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside an `IMMEDIATE` transaction, committing only if it
  /// succeeds. Any error drops the transaction, which rolls it back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .run(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
      })
      .await
  }
}

// ─── Row access ──────────────────────────────────────────────────────────────
//
// Synchronous helpers shared by reads and by the write transactions.

fn unit_row(conn: &Connection, unit_id: Uuid) -> Result<Option<(Unit, u64)>> {
  conn
    .query_row(
      &format!("SELECT {UNIT_COLUMNS} FROM units WHERE unit_id = ?1"),
      rusqlite::params![encode_uuid(unit_id)],
      RawUnit::from_row,
    )
    .optional()?
    .map(RawUnit::into_unit)
    .transpose()
}

fn owner_row(conn: &Connection, owner_id: Uuid) -> Result<Option<Owner>> {
  conn
    .query_row(
      &format!("SELECT {OWNER_COLUMNS} FROM owners WHERE owner_id = ?1"),
      rusqlite::params![encode_uuid(owner_id)],
      RawOwner::from_row,
    )
    .optional()?
    .map(RawOwner::into_owner)
    .transpose()
}

fn record_row(conn: &Connection, record_id: Uuid) -> Result<Option<OwnershipRecord>> {
  conn
    .query_row(
      &format!("SELECT {RECORD_COLUMNS} FROM ownership_history WHERE record_id = ?1"),
      rusqlite::params![encode_uuid(record_id)],
      RawRecord::from_row,
    )
    .optional()?
    .map(RawRecord::into_record)
    .transpose()
}

fn records_where(
  conn: &Connection,
  column: &str,
  id: Uuid,
) -> Result<Vec<OwnershipRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RECORD_COLUMNS} FROM ownership_history
     WHERE {column} = ?1
     ORDER BY start_date, created_at"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(id)], RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRecord::into_record).collect()
}

fn transfer_row(conn: &Connection, transfer_id: Uuid) -> Result<Option<Transfer>> {
  conn
    .query_row(
      &format!("SELECT {TRANSFER_COLUMNS} FROM ownership_transfers WHERE transfer_id = ?1"),
      rusqlite::params![encode_uuid(transfer_id)],
      RawTransfer::from_row,
    )
    .optional()?
    .map(RawTransfer::into_transfer)
    .transpose()
}

fn document_row(conn: &Connection, document_id: Uuid) -> Result<Option<TransferDocument>> {
  conn
    .query_row(
      &format!("SELECT {DOCUMENT_COLUMNS} FROM transfer_documents WHERE document_id = ?1"),
      rusqlite::params![encode_uuid(document_id)],
      RawDocument::from_row,
    )
    .optional()?
    .map(RawDocument::into_document)
    .transpose()
}

/// Load a transfer and check it is still in the status the caller observed.
fn expect_status(
  conn: &Connection,
  transfer_id: Uuid,
  from: TransferStatus,
) -> Result<Transfer> {
  let transfer = transfer_row(conn, transfer_id)?
    .ok_or(CoreError::not_found(Entity::Transfer, transfer_id))?;
  if transfer.status != from {
    return Err(
      CoreError::InvalidTransferState { transfer_id, status: transfer.status }
        .into(),
    );
  }
  Ok(transfer)
}

/// The terminal status finalization takes `from` to by way of `Validated`.
fn settle(
  transfer_id: Uuid,
  from: TransferStatus,
  outcome: Transition,
) -> Result<TransferStatus> {
  from
    .transition(Transition::Validate)
    .and_then(|validated| validated.transition(outcome))
    .ok_or_else(|| {
      CoreError::InvalidTransferState { transfer_id, status: from }.into()
    })
}

/// Check the unit is still at `expected` without changing it.
fn expect_version(conn: &Connection, unit_id: Uuid, expected: u64) -> Result<()> {
  let (_, version) =
    unit_row(conn, unit_id)?.ok_or(CoreError::not_found(Entity::Unit, unit_id))?;
  if version != expected {
    return Err(CoreError::ConcurrentModification { unit_id }.into());
  }
  Ok(())
}

/// Compare-and-set a transfer from `from` to whatever `edit` makes of it,
/// writing the audit entry alongside.
fn update_transfer(
  conn: &Connection,
  who: &Provenance,
  transfer_id: Uuid,
  from: TransferStatus,
  reason: &str,
  edit: impl FnOnce(&mut Transfer),
) -> Result<Transfer> {
  let before = expect_status(conn, transfer_id, from)?;
  let mut after = before.clone();
  edit(&mut after);
  after.updated_at = Utc::now();

  let rejection_json = after
    .rejection
    .as_ref()
    .map(serde_json::to_string)
    .transpose()?;
  conn.execute(
    "UPDATE ownership_transfers
     SET status = ?2, base_version = ?3, rejection_json = ?4, updated_at = ?5
     WHERE transfer_id = ?1 AND status = ?6",
    rusqlite::params![
      encode_uuid(transfer_id),
      after.status.as_ref(),
      encode_version(after.base_version),
      rejection_json,
      encode_dt(after.updated_at),
      from.as_ref(),
    ],
  )?;

  audit::record(conn, who, [NewAuditEntry::update(
    tables::OWNERSHIP_TRANSFERS,
    transfer_id,
    &before,
    &after,
    reason,
  )?])?;
  Ok(after)
}

// ─── RegistryStore impl ──────────────────────────────────────────────────────

impl RegistryStore for SqliteStore {
  type Error = crate::Error;

  // ── Units ─────────────────────────────────────────────────────────────────

  async fn add_unit(&self, input: NewUnit, who: &Provenance) -> Result<Unit> {
    let unit = Unit {
      unit_id:       Uuid::new_v4(),
      unique_key:    input.unique_key,
      building_name: input.building_name,
      unit_number:   input.unit_number,
      created_at:    Utc::now(),
      retired_at:    None,
    };
    let who = who.clone();

    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO units (
             unit_id, unique_key, building_name, unit_number,
             ownership_version, created_at
           ) VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![
            encode_uuid(unit.unit_id),
            unit.unique_key,
            unit.building_name,
            unit.unit_number,
            encode_dt(unit.created_at),
          ],
        )?;
        audit::record(tx, &who, [NewAuditEntry::insert(
          tables::UNITS,
          unit.unit_id,
          &unit,
          "unit registered",
        )?])?;
        Ok(unit)
      })
      .await
  }

  async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>> {
    let found = self.run(move |conn| unit_row(conn, unit_id)).await?;
    Ok(found.map(|(unit, _)| unit))
  }

  async fn list_units(&self) -> Result<Vec<Unit>> {
    self
      .run(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {UNIT_COLUMNS} FROM units ORDER BY building_name, unit_number"
        ))?;
        let raws = stmt
          .query_map([], RawUnit::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws
          .into_iter()
          .map(|raw| raw.into_unit().map(|(unit, _)| unit))
          .collect()
      })
      .await
  }

  async fn retire_unit(&self, unit_id: Uuid, who: &Provenance) -> Result<Unit> {
    let who = who.clone();
    self
      .write(move |tx| {
        let (before, _) =
          unit_row(tx, unit_id)?.ok_or(CoreError::not_found(Entity::Unit, unit_id))?;
        if before.is_retired() {
          return Ok(before);
        }
        let after = Unit { retired_at: Some(Utc::now()), ..before.clone() };
        tx.execute(
          "UPDATE units SET retired_at = ?2 WHERE unit_id = ?1",
          rusqlite::params![encode_uuid(unit_id), after.retired_at.map(encode_dt)],
        )?;
        audit::record(tx, &who, [NewAuditEntry::update(
          tables::UNITS,
          unit_id,
          &before,
          &after,
          "unit retired",
        )?])?;
        Ok(after)
      })
      .await
  }

  // ── Owners ────────────────────────────────────────────────────────────────

  async fn add_owner(&self, input: NewOwner, who: &Provenance) -> Result<Owner> {
    let owner = Owner {
      owner_id:   Uuid::new_v4(),
      full_name:  input.full_name,
      kind:       input.kind,
      contact:    input.contact,
      is_active:  true,
      created_at: Utc::now(),
    };
    let details_json = serde_json::to_string(&owner.kind)?;
    let who = who.clone();

    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO owners (
             owner_id, full_name, owner_type, emirates_id, details_json,
             phone, email, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
          rusqlite::params![
            encode_uuid(owner.owner_id),
            owner.full_name,
            owner.owner_type().as_ref(),
            owner.emirates_id().map(EmiratesId::as_str),
            details_json,
            owner.contact.phone,
            owner.contact.email,
            encode_dt(owner.created_at),
          ],
        )?;
        audit::record(tx, &who, [NewAuditEntry::insert(
          tables::OWNERS,
          owner.owner_id,
          &owner,
          "owner registered",
        )?])?;
        Ok(owner)
      })
      .await
  }

  async fn get_owner(&self, owner_id: Uuid) -> Result<Option<Owner>> {
    self.run(move |conn| owner_row(conn, owner_id)).await
  }

  async fn find_owner_by_emirates_id(
    &self,
    emirates_id: &EmiratesId,
  ) -> Result<Option<Owner>> {
    let id = emirates_id.as_str().to_owned();
    self
      .run(move |conn| {
        conn
          .query_row(
            &format!("SELECT {OWNER_COLUMNS} FROM owners WHERE emirates_id = ?1"),
            rusqlite::params![id],
            RawOwner::from_row,
          )
          .optional()?
          .map(RawOwner::into_owner)
          .transpose()
      })
      .await
  }

  // ── Ownership ─────────────────────────────────────────────────────────────

  async fn unit_state(&self, unit_id: Uuid) -> Result<Option<UnitState>> {
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let Some((unit, version)) = unit_row(&tx, unit_id)? else {
          return Ok(None);
        };
        let records = records_where(&tx, "unit_id", unit_id)?;
        tx.commit()?;
        Ok(Some(UnitState { unit, version, records }))
      })
      .await
  }

  async fn owner_records(&self, owner_id: Uuid) -> Result<Vec<OwnershipRecord>> {
    self
      .run(move |conn| records_where(conn, "owner_id", owner_id))
      .await
  }

  // ── Transfers ─────────────────────────────────────────────────────────────

  async fn insert_transfer(
    &self,
    input: NewTransfer,
    who: &Provenance,
  ) -> Result<Transfer> {
    let now = Utc::now();
    let transfer = Transfer {
      transfer_id:   Uuid::new_v4(),
      unit_id:       input.unit_id,
      transfer_type: input.transfer_type,
      transfer_date: input.transfer_date,
      amount:        input.amount,
      legal_reason:  input.legal_reason,
      status:        TransferStatus::Initiated,
      initiated_by:  who.actor.clone(),
      changes:       input.changes,
      base_version:  input.base_version,
      rejection:     None,
      created_at:    now,
      updated_at:    now,
    };
    let changes_json = serde_json::to_string(&transfer.changes)?;
    let who = who.clone();

    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO ownership_transfers (
             transfer_id, unit_id, transfer_type, transfer_date, amount,
             currency, legal_reason, status, initiated_by, changes_json,
             base_version, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            encode_uuid(transfer.transfer_id),
            encode_uuid(transfer.unit_id),
            transfer.transfer_type.as_ref(),
            encode_date(transfer.transfer_date),
            transfer.amount.as_ref().map(|a| a.value),
            transfer.amount.as_ref().map(|a| a.currency.as_str()),
            transfer.legal_reason,
            transfer.status.as_ref(),
            transfer.initiated_by,
            changes_json,
            encode_version(transfer.base_version),
            encode_dt(transfer.created_at),
            encode_dt(transfer.updated_at),
          ],
        )?;
        audit::record(tx, &who, [NewAuditEntry::insert(
          tables::OWNERSHIP_TRANSFERS,
          transfer.transfer_id,
          &transfer,
          "transfer initiated",
        )?])?;
        Ok(transfer)
      })
      .await
  }

  async fn get_transfer(&self, transfer_id: Uuid) -> Result<Option<Transfer>> {
    self.run(move |conn| transfer_row(conn, transfer_id)).await
  }

  async fn list_transfers(&self, unit_id: Uuid) -> Result<Vec<Transfer>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRANSFER_COLUMNS} FROM ownership_transfers
           WHERE unit_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![encode_uuid(unit_id)], RawTransfer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawTransfer::into_transfer).collect()
      })
      .await
  }

  async fn attach_document(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    input: NewDocument,
    who: &Provenance,
  ) -> Result<TransferDocument> {
    let document = TransferDocument {
      document_id:         Uuid::new_v4(),
      transfer_id,
      document_type:       input.document_type,
      document_name:       input.document_name,
      file_path:           input.file_path,
      upload_date:         input.upload_date,
      uploaded_by:         input.uploaded_by,
      verification_status: VerificationStatus::Pending,
      created_at:          Utc::now(),
    };
    let who = who.clone();

    self
      .write(move |tx| {
        let transfer = expect_status(tx, transfer_id, from)?;
        tx.execute(
          "INSERT INTO transfer_documents (
             document_id, transfer_id, document_type, document_name,
             file_path, upload_date, uploaded_by, verification_status,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            encode_uuid(document.document_id),
            encode_uuid(transfer_id),
            document.document_type,
            document.document_name,
            document.file_path,
            document.upload_date.map(encode_date),
            document.uploaded_by,
            document.verification_status.as_ref(),
            encode_dt(document.created_at),
          ],
        )?;
        audit::record(tx, &who, [NewAuditEntry::insert(
          tables::TRANSFER_DOCUMENTS,
          document.document_id,
          &document,
          "document attached",
        )?])?;

        if transfer.status != TransferStatus::DocumentsAttached {
          update_transfer(tx, &who, transfer_id, from, "documents attached", |t| {
            t.status = TransferStatus::DocumentsAttached;
          })?;
        }
        Ok(document)
      })
      .await
  }

  async fn list_documents(&self, transfer_id: Uuid) -> Result<Vec<TransferDocument>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM transfer_documents
           WHERE transfer_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![encode_uuid(transfer_id)], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawDocument::into_document).collect()
      })
      .await
  }

  async fn get_document(&self, document_id: Uuid) -> Result<Option<TransferDocument>> {
    self.run(move |conn| document_row(conn, document_id)).await
  }

  async fn set_document_status(
    &self,
    document_id: Uuid,
    status: VerificationStatus,
    who: &Provenance,
  ) -> Result<TransferDocument> {
    let who = who.clone();
    self
      .write(move |tx| {
        let before = document_row(tx, document_id)?
          .ok_or(CoreError::not_found(Entity::Document, document_id))?;
        let transfer = transfer_row(tx, before.transfer_id)?
          .ok_or(CoreError::not_found(Entity::Transfer, before.transfer_id))?;
        if !transfer.status.accepts_verification() {
          return Err(
            CoreError::InvalidTransferState {
              transfer_id: transfer.transfer_id,
              status:      transfer.status,
            }
            .into(),
          );
        }
        if before.verification_status == status {
          return Ok(before);
        }
        let after = TransferDocument { verification_status: status, ..before.clone() };
        tx.execute(
          "UPDATE transfer_documents SET verification_status = ?2 WHERE document_id = ?1",
          rusqlite::params![encode_uuid(document_id), status.as_ref()],
        )?;
        audit::record(tx, &who, [NewAuditEntry::update(
          tables::TRANSFER_DOCUMENTS,
          document_id,
          &before,
          &after,
          format!("document {status}"),
        )?])?;
        Ok(after)
      })
      .await
  }

  async fn commit_transfer(&self, plan: Finalization, who: &Provenance) -> Result<Transfer> {
    let who = who.clone();
    self
      .write(move |tx| {
        let transfer_id = plan.transfer_id;
        let unit_id = plan.unit_id;
        expect_status(tx, transfer_id, plan.from_status)?;
        let committed = settle(transfer_id, plan.from_status, Transition::Commit)?;
        let (unit, _) =
          unit_row(tx, unit_id)?.ok_or(CoreError::not_found(Entity::Unit, unit_id))?;
        if unit.is_retired() {
          return Err(CoreError::UnitRetired(unit_id).into());
        }

        let bumped = tx.execute(
          "UPDATE units SET ownership_version = ownership_version + 1
           WHERE unit_id = ?1 AND ownership_version = ?2",
          rusqlite::params![encode_uuid(unit_id), encode_version(plan.expected_version)],
        )?;
        if bumped == 0 {
          return Err(CoreError::ConcurrentModification { unit_id }.into());
        }

        let mut entries = Vec::new();
        let end_date = encode_date(plan.transfer_date);
        for record_id in &plan.closures {
          let before = record_row(tx, *record_id)?
            .filter(|r| r.is_current && r.unit_id == unit_id)
            .ok_or(CoreError::ConcurrentModification { unit_id })?;
          tx.execute(
            "UPDATE ownership_history SET end_date = ?2, is_current = 0
             WHERE record_id = ?1 AND is_current = 1",
            rusqlite::params![encode_uuid(*record_id), end_date],
          )?;
          let after = OwnershipRecord {
            end_date: Some(plan.transfer_date),
            is_current: false,
            ..before.clone()
          };
          entries.push(NewAuditEntry::update(
            tables::OWNERSHIP_HISTORY,
            *record_id,
            &before,
            &after,
            format!("closed by transfer {transfer_id}"),
          )?);
        }

        let created_at = Utc::now();
        for opening in &plan.openings {
          let record = OwnershipRecord {
            record_id: Uuid::new_v4(),
            unit_id,
            owner_id: opening.owner_id,
            transfer_id: Some(transfer_id),
            start_date: plan.transfer_date,
            end_date: None,
            percentage: opening.percentage,
            is_current: true,
            created_at,
          };
          tx.execute(
            "INSERT INTO ownership_history (
               record_id, unit_id, owner_id, transfer_id, start_date,
               end_date, percentage, is_current, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, 1, ?7)",
            rusqlite::params![
              encode_uuid(record.record_id),
              encode_uuid(unit_id),
              encode_uuid(record.owner_id),
              encode_uuid(transfer_id),
              end_date,
              record.percentage,
              encode_dt(created_at),
            ],
          )?;
          entries.push(NewAuditEntry::insert(
            tables::OWNERSHIP_HISTORY,
            record.record_id,
            &record,
            format!("opened by transfer {transfer_id}"),
          )?);
        }
        audit::record(tx, &who, entries)?;

        let transfer = update_transfer(
          tx,
          &who,
          transfer_id,
          plan.from_status,
          "transfer committed",
          |t| t.status = committed,
        )?;
        debug!(
          %transfer_id,
          closed = plan.closures.len(),
          opened = plan.openings.len(),
          "ownership records written"
        );
        Ok(transfer)
      })
      .await
  }

  async fn reject_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    expected_version: u64,
    violation: Violation,
    who: &Provenance,
  ) -> Result<Transfer> {
    let who = who.clone();
    self
      .write(move |tx| {
        let transfer = expect_status(tx, transfer_id, from)?;
        let rejected = settle(transfer_id, from, Transition::Reject)?;
        expect_version(tx, transfer.unit_id, expected_version)?;
        update_transfer(tx, &who, transfer_id, from, "transfer rejected", |t| {
          t.status = rejected;
          t.rejection = Some(violation);
        })
      })
      .await
  }

  async fn cancel_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    who: &Provenance,
  ) -> Result<Transfer> {
    let who = who.clone();
    self
      .write(move |tx| {
        update_transfer(tx, &who, transfer_id, from, "transfer cancelled", |t| {
          t.status = TransferStatus::Cancelled;
        })
      })
      .await
  }

  async fn rebase_transfer(
    &self,
    transfer_id: Uuid,
    from: TransferStatus,
    base_version: u64,
    who: &Provenance,
  ) -> Result<Transfer> {
    let who = who.clone();
    self
      .write(move |tx| {
        update_transfer(tx, &who, transfer_id, from, "transfer rebased", |t| {
          t.base_version = base_version;
        })
      })
      .await
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn audit_entries(&self, query: AuditQuery) -> Result<Vec<AuditEntry>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_logs
           WHERE (?1 IS NULL OR table_name = ?1)
             AND (?2 IS NULL OR record_id = ?2)
           ORDER BY seq"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![query.table_name, query.record_id],
            RawAuditEntry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawAuditEntry::into_entry).collect()
      })
      .await
  }
}
