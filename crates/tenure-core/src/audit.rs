//! Audit entries and the hash chain that makes them tamper-evident.
//!
//! Entries are append-only. Each one carries the hash of its predecessor, so
//! editing or removing an entry breaks every link after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::Result;

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Who is performing a mutation, and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  pub actor:      String,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

impl Provenance {
  pub fn actor(actor: impl Into<String>) -> Self {
    Self { actor: actor.into(), ..Self::default() }
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

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
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AuditAction {
  Insert,
  Update,
}

/// Table names recorded in [`AuditEntry::table_name`].
pub mod tables {
  pub const UNITS: &str = "units";
  pub const OWNERS: &str = "owners";
  pub const OWNERSHIP_HISTORY: &str = "ownership_history";
  pub const OWNERSHIP_TRANSFERS: &str = "ownership_transfers";
  pub const TRANSFER_DOCUMENTS: &str = "transfer_documents";
}

/// One mutation to a tracked row, as it is handed to the recorder.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub table_name: &'static str,
  pub record_id:  Uuid,
  pub action:     AuditAction,
  pub old_value:  Option<serde_json::Value>,
  pub new_value:  Option<serde_json::Value>,
  pub reason:     String,
}

impl NewAuditEntry {
  pub fn insert<T: Serialize>(
    table_name: &'static str,
    record_id: Uuid,
    row: &T,
    reason: impl Into<String>,
  ) -> Result<Self> {
    Ok(Self {
      table_name,
      record_id,
      action: AuditAction::Insert,
      old_value: None,
      new_value: Some(serde_json::to_value(row)?),
      reason: reason.into(),
    })
  }

  pub fn update<T: Serialize>(
    table_name: &'static str,
    record_id: Uuid,
    before: &T,
    after: &T,
    reason: impl Into<String>,
  ) -> Result<Self> {
    Ok(Self {
      table_name,
      record_id,
      action: AuditAction::Update,
      old_value: Some(serde_json::to_value(before)?),
      new_value: Some(serde_json::to_value(after)?),
      reason: reason.into(),
    })
  }
}

/// A persisted, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  /// Position in the log, starting at 1 with no gaps.
  pub seq:         u64,
  pub entry_id:    Uuid,
  pub table_name:  String,
  pub record_id:   String,
  pub action:      AuditAction,
  pub old_value:   Option<serde_json::Value>,
  pub new_value:   Option<serde_json::Value>,
  pub changed_by:  String,
  pub reason:      String,
  pub ip_address:  Option<String>,
  pub user_agent:  Option<String>,
  pub recorded_at: DateTime<Utc>,
  pub prev_hash:   Option<String>,
  pub entry_hash:  String,
}

impl AuditEntry {
  /// Build the next entry in the chain after `prev` (or the first one).
  pub fn chain(
    prev: Option<(u64, &str)>,
    entry: NewAuditEntry,
    provenance: &Provenance,
    recorded_at: DateTime<Utc>,
  ) -> Self {
    let (seq, prev_hash) = match prev {
      Some((seq, hash)) => (seq + 1, Some(hash.to_owned())),
      None => (1, None),
    };
    let mut built = Self {
      seq,
      entry_id: Uuid::new_v4(),
      table_name: entry.table_name.to_owned(),
      record_id: entry.record_id.to_string(),
      action: entry.action,
      old_value: entry.old_value,
      new_value: entry.new_value,
      changed_by: provenance.actor.clone(),
      reason: entry.reason,
      ip_address: provenance.ip_address.clone(),
      user_agent: provenance.user_agent.clone(),
      recorded_at,
      prev_hash,
      entry_hash: String::new(),
    };
    built.entry_hash = built.compute_hash();
    built
  }

  /// SHA-256 over a canonical JSON encoding of every field except the hash
  /// itself. `serde_json` maps are key-ordered, so the encoding is stable.
  pub fn compute_hash(&self) -> String {
    let canonical = serde_json::json!({
      "seq":         self.seq,
      "entry_id":    self.entry_id,
      "prev_hash":   self.prev_hash,
      "table_name":  self.table_name,
      "record_id":   self.record_id,
      "action":      self.action,
      "old_value":   self.old_value,
      "new_value":   self.new_value,
      "changed_by":  self.changed_by,
      "reason":      self.reason,
      "ip_address":  self.ip_address,
      "user_agent":  self.user_agent,
      "recorded_at": self.recorded_at.to_rfc3339(),
    });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Filter for [`crate::store::RegistryStore::audit_entries`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
  pub table_name: Option<String>,
  pub record_id:  Option<String>,
}

// ─── Chain verification ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainViolationKind {
  SequenceGap,
  HashChainBreak,
  HashMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
  pub seq:  u64,
  pub kind: ChainViolationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
  pub entries_checked: u64,
  pub violations:      Vec<ChainViolation>,
}

impl ChainReport {
  pub fn is_intact(&self) -> bool { self.violations.is_empty() }
}

/// Walk the full log in sequence order and report every broken link.
pub fn verify_chain(entries: &[AuditEntry]) -> ChainReport {
  let mut violations = Vec::new();
  let mut push = |seq, kind| violations.push(ChainViolation { seq, kind });

  for (index, entry) in entries.iter().enumerate() {
    let expected_seq = index as u64 + 1;
    if entry.seq != expected_seq {
      push(entry.seq, ChainViolationKind::SequenceGap);
    }

    let expected_prev = index
      .checked_sub(1)
      .map(|i| entries[i].entry_hash.as_str());
    if entry.prev_hash.as_deref() != expected_prev {
      push(entry.seq, ChainViolationKind::HashChainBreak);
    }

    if entry.compute_hash() != entry.entry_hash {
      push(entry.seq, ChainViolationKind::HashMismatch);
    }
  }

  ChainReport { entries_checked: entries.len() as u64, violations }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn log(n: usize) -> Vec<AuditEntry> {
    let who = Provenance {
      actor:      "clerk-7".into(),
      ip_address: Some("10.0.0.4".into()),
      user_agent: Some("registry-desk/2.1".into()),
    };
    let mut out: Vec<AuditEntry> = Vec::new();
    for i in 0..n {
      let prev = out.last().map(|e| (e.seq, e.entry_hash.as_str()));
      let entry = NewAuditEntry::insert(
        tables::UNITS,
        Uuid::new_v4(),
        &serde_json::json!({ "n": i }),
        "unit registered",
      )
      .unwrap();
      let next = AuditEntry::chain(prev, entry, &who, Utc::now());
      out.push(next);
    }
    out
  }

  #[test]
  fn intact_chain_verifies() {
    let report = verify_chain(&log(5));
    assert_eq!(report.entries_checked, 5);
    assert!(report.is_intact());
  }

  #[test]
  fn first_entry_has_no_predecessor() {
    let entries = log(2);
    assert_eq!(entries[0].seq, 1);
    assert!(entries[0].prev_hash.is_none());
    assert_eq!(entries[1].prev_hash.as_deref(), Some(entries[0].entry_hash.as_str()));
  }

  #[test]
  fn edited_snapshot_is_a_hash_mismatch() {
    let mut entries = log(3);
    entries[1].new_value = Some(serde_json::json!({ "n": 99 }));

    let report = verify_chain(&entries);
    assert_eq!(report.violations, vec![ChainViolation {
      seq:  2,
      kind: ChainViolationKind::HashMismatch,
    }]);
  }

  #[test]
  fn removed_entry_breaks_sequence_and_link() {
    let mut entries = log(4);
    entries.remove(1);

    let report = verify_chain(&entries);
    assert!(report.violations.contains(&ChainViolation {
      seq:  3,
      kind: ChainViolationKind::SequenceGap,
    }));
    assert!(report.violations.contains(&ChainViolation {
      seq:  3,
      kind: ChainViolationKind::HashChainBreak,
    }));
  }
}
