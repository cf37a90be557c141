//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`, so both sort correctly as text. Enumerations use their
//! snake_case names. Structured fields (owner details, transfer changes,
//! rejection reasons, audit snapshots) are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use tenure_core::{
  audit::AuditEntry,
  owner::{ContactDetails, Owner},
  ownership::OwnershipRecord,
  transfer::{Amount, Transfer, TransferDocument},
  unit::Unit,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Versions are `u64` in the domain and `INTEGER` (i64) in SQLite.
pub fn encode_version(v: u64) -> i64 { v as i64 }

pub fn decode_version(v: i64) -> u64 { v.max(0) as u64 }

// ─── Units ───────────────────────────────────────────────────────────────────

pub const UNIT_COLUMNS: &str = "unit_id, unique_key, building_name, \
                                unit_number, ownership_version, created_at, \
                                retired_at";

pub struct RawUnit {
  pub unit_id:           String,
  pub unique_key:        String,
  pub building_name:     String,
  pub unit_number:       String,
  pub ownership_version: i64,
  pub created_at:        String,
  pub retired_at:        Option<String>,
}

impl RawUnit {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      unit_id:           row.get(0)?,
      unique_key:        row.get(1)?,
      building_name:     row.get(2)?,
      unit_number:       row.get(3)?,
      ownership_version: row.get(4)?,
      created_at:        row.get(5)?,
      retired_at:        row.get(6)?,
    })
  }

  /// The unit together with its ownership version.
  pub fn into_unit(self) -> Result<(Unit, u64)> {
    let unit = Unit {
      unit_id:       decode_uuid(&self.unit_id)?,
      unique_key:    self.unique_key,
      building_name: self.building_name,
      unit_number:   self.unit_number,
      created_at:    decode_dt(&self.created_at)?,
      retired_at:    self.retired_at.as_deref().map(decode_dt).transpose()?,
    };
    Ok((unit, decode_version(self.ownership_version)))
  }
}

// ─── Owners ──────────────────────────────────────────────────────────────────

pub const OWNER_COLUMNS: &str = "owner_id, full_name, details_json, phone, \
                                 email, is_active, created_at";

pub struct RawOwner {
  pub owner_id:     String,
  pub full_name:    String,
  pub details_json: String,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub is_active:    bool,
  pub created_at:   String,
}

impl RawOwner {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner_id:     row.get(0)?,
      full_name:    row.get(1)?,
      details_json: row.get(2)?,
      phone:        row.get(3)?,
      email:        row.get(4)?,
      is_active:    row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_owner(self) -> Result<Owner> {
    Ok(Owner {
      owner_id:   decode_uuid(&self.owner_id)?,
      full_name:  self.full_name,
      kind:       serde_json::from_str(&self.details_json)?,
      contact:    ContactDetails { phone: self.phone, email: self.email },
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Ownership records ───────────────────────────────────────────────────────

pub const RECORD_COLUMNS: &str = "record_id, unit_id, owner_id, transfer_id, \
                                  start_date, end_date, percentage, \
                                  is_current, created_at";

pub struct RawRecord {
  pub record_id:   String,
  pub unit_id:     String,
  pub owner_id:    String,
  pub transfer_id: Option<String>,
  pub start_date:  String,
  pub end_date:    Option<String>,
  pub percentage:  f64,
  pub is_current:  bool,
  pub created_at:  String,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      unit_id:     row.get(1)?,
      owner_id:    row.get(2)?,
      transfer_id: row.get(3)?,
      start_date:  row.get(4)?,
      end_date:    row.get(5)?,
      percentage:  row.get(6)?,
      is_current:  row.get(7)?,
      created_at:  row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<OwnershipRecord> {
    Ok(OwnershipRecord {
      record_id:   decode_uuid(&self.record_id)?,
      unit_id:     decode_uuid(&self.unit_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      transfer_id: self.transfer_id.as_deref().map(decode_uuid).transpose()?,
      start_date:  decode_date(&self.start_date)?,
      end_date:    self.end_date.as_deref().map(decode_date).transpose()?,
      percentage:  self.percentage,
      is_current:  self.is_current,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

// ─── Transfers ───────────────────────────────────────────────────────────────

pub const TRANSFER_COLUMNS: &str = "transfer_id, unit_id, transfer_type, \
                                    transfer_date, amount, currency, \
                                    legal_reason, status, initiated_by, \
                                    changes_json, base_version, \
                                    rejection_json, created_at, updated_at";

pub struct RawTransfer {
  pub transfer_id:    String,
  pub unit_id:        String,
  pub transfer_type:  String,
  pub transfer_date:  String,
  pub amount:         Option<f64>,
  pub currency:       Option<String>,
  pub legal_reason:   Option<String>,
  pub status:         String,
  pub initiated_by:   String,
  pub changes_json:   String,
  pub base_version:   i64,
  pub rejection_json: Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawTransfer {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      transfer_id:    row.get(0)?,
      unit_id:        row.get(1)?,
      transfer_type:  row.get(2)?,
      transfer_date:  row.get(3)?,
      amount:         row.get(4)?,
      currency:       row.get(5)?,
      legal_reason:   row.get(6)?,
      status:         row.get(7)?,
      initiated_by:   row.get(8)?,
      changes_json:   row.get(9)?,
      base_version:   row.get(10)?,
      rejection_json: row.get(11)?,
      created_at:     row.get(12)?,
      updated_at:     row.get(13)?,
    })
  }

  pub fn into_transfer(self) -> Result<Transfer> {
    let amount = match (self.amount, self.currency) {
      (Some(value), Some(currency)) => Some(Amount { value, currency }),
      _ => None,
    };
    Ok(Transfer {
      transfer_id: decode_uuid(&self.transfer_id)?,
      unit_id: decode_uuid(&self.unit_id)?,
      transfer_type: self.transfer_type.parse()?,
      transfer_date: decode_date(&self.transfer_date)?,
      amount,
      legal_reason: self.legal_reason,
      status: self.status.parse()?,
      initiated_by: self.initiated_by,
      changes: serde_json::from_str(&self.changes_json)?,
      base_version: decode_version(self.base_version),
      rejection: self
        .rejection_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub const DOCUMENT_COLUMNS: &str = "document_id, transfer_id, document_type, \
                                    document_name, file_path, upload_date, \
                                    uploaded_by, verification_status, \
                                    created_at";

pub struct RawDocument {
  pub document_id:         String,
  pub transfer_id:         String,
  pub document_type:       String,
  pub document_name:       String,
  pub file_path:           String,
  pub upload_date:         Option<String>,
  pub uploaded_by:         Option<String>,
  pub verification_status: String,
  pub created_at:          String,
}

impl RawDocument {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:         row.get(0)?,
      transfer_id:         row.get(1)?,
      document_type:       row.get(2)?,
      document_name:       row.get(3)?,
      file_path:           row.get(4)?,
      upload_date:         row.get(5)?,
      uploaded_by:         row.get(6)?,
      verification_status: row.get(7)?,
      created_at:          row.get(8)?,
    })
  }

  pub fn into_document(self) -> Result<TransferDocument> {
    Ok(TransferDocument {
      document_id:         decode_uuid(&self.document_id)?,
      transfer_id:         decode_uuid(&self.transfer_id)?,
      document_type:       self.document_type,
      document_name:       self.document_name,
      file_path:           self.file_path,
      upload_date:         self.upload_date.as_deref().map(decode_date).transpose()?,
      uploaded_by:         self.uploaded_by,
      verification_status: self.verification_status.parse()?,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

// ─── Audit entries ───────────────────────────────────────────────────────────

pub const AUDIT_COLUMNS: &str = "seq, entry_id, table_name, record_id, action, \
                                 old_value, new_value, changed_by, \
                                 change_reason, ip_address, user_agent, \
                                 recorded_at, prev_hash, entry_hash";

pub struct RawAuditEntry {
  pub seq:           i64,
  pub entry_id:      String,
  pub table_name:    String,
  pub record_id:     String,
  pub action:        String,
  pub old_value:     Option<String>,
  pub new_value:     Option<String>,
  pub changed_by:    String,
  pub change_reason: String,
  pub ip_address:    Option<String>,
  pub user_agent:    Option<String>,
  pub recorded_at:   String,
  pub prev_hash:     Option<String>,
  pub entry_hash:    String,
}

impl RawAuditEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:           row.get(0)?,
      entry_id:      row.get(1)?,
      table_name:    row.get(2)?,
      record_id:     row.get(3)?,
      action:        row.get(4)?,
      old_value:     row.get(5)?,
      new_value:     row.get(6)?,
      changed_by:    row.get(7)?,
      change_reason: row.get(8)?,
      ip_address:    row.get(9)?,
      user_agent:    row.get(10)?,
      recorded_at:   row.get(11)?,
      prev_hash:     row.get(12)?,
      entry_hash:    row.get(13)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    let json = |s: Option<String>| -> Result<Option<serde_json::Value>> {
      Ok(s.as_deref().map(serde_json::from_str).transpose()?)
    };
    Ok(AuditEntry {
      seq:         decode_version(self.seq),
      entry_id:    decode_uuid(&self.entry_id)?,
      table_name:  self.table_name,
      record_id:   self.record_id,
      action:      self.action.parse()?,
      old_value:   json(self.old_value)?,
      new_value:   json(self.new_value)?,
      changed_by:  self.changed_by,
      reason:      self.change_reason,
      ip_address:  self.ip_address,
      user_agent:  self.user_agent,
      recorded_at: decode_dt(&self.recorded_at)?,
      prev_hash:   self.prev_hash,
      entry_hash:  self.entry_hash,
    })
  }
}
