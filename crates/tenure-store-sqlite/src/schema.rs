//! SQL schema for the Tenure SQLite store.
//!
//! Executed once at connection startup. Cross-row rules (stakes summing to
//! 100, non-overlapping intervals) live in the validator; everything that can
//! be stated per row or per index is enforced here as well.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS units (
    unit_id           TEXT PRIMARY KEY,
    unique_key        TEXT NOT NULL UNIQUE,
    building_name     TEXT NOT NULL,
    unit_number       TEXT NOT NULL,
    ownership_version INTEGER NOT NULL DEFAULT 0 CHECK (ownership_version >= 0),
    created_at        TEXT NOT NULL,
    retired_at        TEXT
);

CREATE TABLE IF NOT EXISTS owners (
    owner_id     TEXT PRIMARY KEY,
    full_name    TEXT NOT NULL,
    owner_type   TEXT NOT NULL CHECK (owner_type IN ('individual', 'corporate')),
    emirates_id  TEXT UNIQUE CHECK (
        emirates_id IS NULL OR emirates_id GLOB
        '784-[0-9][0-9][0-9][0-9]-[0-9][0-9][0-9][0-9][0-9][0-9][0-9]-[0-9]'
    ),
    details_json TEXT NOT NULL,   -- JSON-encoded OwnerKind
    phone        TEXT,
    email        TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    CHECK (owner_type = 'corporate' OR emirates_id IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS ownership_transfers (
    transfer_id    TEXT PRIMARY KEY,
    unit_id        TEXT NOT NULL REFERENCES units(unit_id),
    transfer_type  TEXT NOT NULL,
    transfer_date  TEXT NOT NULL,   -- YYYY-MM-DD
    amount         REAL CHECK (amount IS NULL OR amount > 0),
    currency       TEXT CHECK (currency IS NULL OR length(currency) = 3),
    legal_reason   TEXT,
    status         TEXT NOT NULL CHECK (status IN (
        'initiated', 'documents_attached', 'validated',
        'committed', 'rejected', 'cancelled'
    )),
    initiated_by   TEXT NOT NULL,
    changes_json   TEXT NOT NULL,   -- JSON array of OwnershipChange
    base_version   INTEGER NOT NULL,
    rejection_json TEXT,            -- JSON-encoded Violation or NULL
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

-- Records are closed, never deleted or rewritten.
CREATE TABLE IF NOT EXISTS ownership_history (
    record_id   TEXT PRIMARY KEY,
    unit_id     TEXT NOT NULL REFERENCES units(unit_id),
    owner_id    TEXT NOT NULL REFERENCES owners(owner_id),
    transfer_id TEXT REFERENCES ownership_transfers(transfer_id),
    start_date  TEXT NOT NULL,
    end_date    TEXT,             -- exclusive; NULL while current
    percentage  REAL NOT NULL CHECK (percentage > 0 AND percentage <= 100),
    is_current  INTEGER NOT NULL CHECK (is_current IN (0, 1)),
    created_at  TEXT NOT NULL,
    CHECK (end_date IS NULL OR end_date >= start_date),
    CHECK ((is_current = 1) = (end_date IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS ownership_current_uq
    ON ownership_history(unit_id, owner_id) WHERE is_current = 1;
CREATE INDEX IF NOT EXISTS ownership_unit_idx  ON ownership_history(unit_id);
CREATE INDEX IF NOT EXISTS ownership_owner_idx ON ownership_history(owner_id);

CREATE TRIGGER IF NOT EXISTS ownership_history_no_delete
BEFORE DELETE ON ownership_history
BEGIN
    SELECT RAISE(ABORT, 'ownership history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS ownership_history_closed_immutable
BEFORE UPDATE ON ownership_history
WHEN OLD.is_current = 0
  OR NEW.unit_id    IS NOT OLD.unit_id
  OR NEW.owner_id   IS NOT OLD.owner_id
  OR NEW.start_date IS NOT OLD.start_date
  OR NEW.percentage IS NOT OLD.percentage
BEGIN
    SELECT RAISE(ABORT, 'only the closing of a current record may be written');
END;

CREATE TABLE IF NOT EXISTS transfer_documents (
    document_id         TEXT PRIMARY KEY,
    transfer_id         TEXT NOT NULL REFERENCES ownership_transfers(transfer_id),
    document_type       TEXT NOT NULL,
    document_name       TEXT NOT NULL,
    file_path           TEXT NOT NULL,
    upload_date         TEXT,
    uploaded_by         TEXT,
    verification_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (verification_status IN ('pending', 'verified', 'rejected')),
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS transfers_unit_idx     ON ownership_transfers(unit_id);
CREATE INDEX IF NOT EXISTS documents_transfer_idx ON transfer_documents(transfer_id);

-- Hash-chained and strictly append-only.
CREATE TABLE IF NOT EXISTS audit_logs (
    seq           INTEGER PRIMARY KEY,
    entry_id      TEXT NOT NULL UNIQUE,
    table_name    TEXT NOT NULL,
    record_id     TEXT NOT NULL,
    action        TEXT NOT NULL CHECK (action IN ('INSERT', 'UPDATE')),
    old_value     TEXT,
    new_value     TEXT,
    changed_by    TEXT NOT NULL,
    change_reason TEXT NOT NULL,
    ip_address    TEXT,
    user_agent    TEXT,
    recorded_at   TEXT NOT NULL,
    prev_hash     TEXT,
    entry_hash    TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS audit_record_idx ON audit_logs(table_name, record_id);

CREATE TRIGGER IF NOT EXISTS audit_logs_no_update
BEFORE UPDATE ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_logs_no_delete
BEFORE DELETE ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit log is append-only');
END;

PRAGMA user_version = 1;
";
