//! Appending to the hash-chained audit log.
//!
//! Always called with the transaction that performs the audited mutation, so
//! the entries commit or roll back together with it.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tenure_core::audit::{AuditEntry, NewAuditEntry, Provenance};

use crate::{
  Result,
  encode::{encode_dt, encode_uuid, encode_version},
};

pub fn record(
  conn: &Connection,
  who: &Provenance,
  entries: impl IntoIterator<Item = NewAuditEntry>,
) -> Result<()> {
  let mut head: Option<(u64, String)> = conn
    .query_row(
      "SELECT seq, entry_hash FROM audit_logs ORDER BY seq DESC LIMIT 1",
      [],
      |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )
    .optional()?
    .map(|(seq, hash)| (seq.max(0) as u64, hash));

  let recorded_at = Utc::now();
  for entry in entries {
    let prev = head.as_ref().map(|(seq, hash)| (*seq, hash.as_str()));
    let entry = AuditEntry::chain(prev, entry, who, recorded_at);
    insert(conn, &entry)?;
    head = Some((entry.seq, entry.entry_hash));
  }
  Ok(())
}

fn insert(conn: &Connection, entry: &AuditEntry) -> Result<()> {
  let old_value = entry.old_value.as_ref().map(|v| v.to_string());
  let new_value = entry.new_value.as_ref().map(|v| v.to_string());

  conn.execute(
    "INSERT INTO audit_logs (
       seq, entry_id, table_name, record_id, action, old_value, new_value,
       changed_by, change_reason, ip_address, user_agent, recorded_at,
       prev_hash, entry_hash
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    rusqlite::params![
      encode_version(entry.seq),
      encode_uuid(entry.entry_id),
      entry.table_name,
      entry.record_id,
      entry.action.as_ref(),
      old_value,
      new_value,
      entry.changed_by,
      entry.reason,
      entry.ip_address,
      entry.user_agent,
      encode_dt(entry.recorded_at),
      entry.prev_hash,
      entry.entry_hash,
    ],
  )?;
  Ok(())
}
