//! SQLite schema definition.

/// Complete database schema for the dental funnel.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients (JSON document + indexed scalar columns)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    status TEXT NOT NULL,
    call_in_date TEXT NOT NULL,                  -- YYYY-MM-DD, monthly statistics key
    document TEXT NOT NULL,                      -- JSON Patient (journeys, ledgers, history)
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
CREATE INDEX IF NOT EXISTS idx_patients_phone ON patients(phone);
CREATE INDEX IF NOT EXISTS idx_patients_status ON patients(status);
CREATE INDEX IF NOT EXISTS idx_patients_call_in_date ON patients(call_in_date);

-- ============================================================================
-- Call Logs (owned by telephony integration, patient link is optional)
-- ============================================================================

CREATE TABLE IF NOT EXISTS call_logs (
    id TEXT PRIMARY KEY,
    patient_id TEXT,                             -- NULL when unmatched or detached
    phone TEXT NOT NULL,
    patient_name TEXT,
    started_at TEXT NOT NULL,
    direction TEXT NOT NULL DEFAULT 'inbound',
    duration_secs INTEGER NOT NULL DEFAULT 0,
    summary TEXT,
    classification TEXT
);

CREATE INDEX IF NOT EXISTS idx_call_logs_patient ON call_logs(patient_id, started_at);

-- ============================================================================
-- Recall
-- ============================================================================

CREATE TABLE IF NOT EXISTS recall_settings (
    treatment TEXT PRIMARY KEY,
    schedules TEXT NOT NULL DEFAULT '[]',        -- JSON array of RecallSchedule
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS recall_messages (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL,
    treatment TEXT NOT NULL,
    timing TEXT NOT NULL,
    timing_days INTEGER NOT NULL,
    message TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'sent', 'failed', 'cancelled')),
    scheduled_at TEXT NOT NULL,
    last_visit TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_recall_messages_patient ON recall_messages(patient_id, treatment);

-- At most one pending message per (patient, treatment, timing)
CREATE UNIQUE INDEX IF NOT EXISTS idx_recall_messages_pending
ON recall_messages(patient_id, treatment, timing) WHERE status = 'pending';

-- ============================================================================
-- Audit Trail (Append-Only, hash-chained)
-- ============================================================================

CREATE TABLE IF NOT EXISTS audit_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT NOT NULL UNIQUE,                   -- SHA-256(prev_hash || payload)
    prev_hash TEXT NOT NULL,
    payload TEXT NOT NULL,                       -- canonical JSON AuditEvent
    action TEXT NOT NULL,
    target_id TEXT,
    outcome TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_target ON audit_events(target_id);

CREATE TRIGGER IF NOT EXISTS audit_events_no_update BEFORE UPDATE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'Audit events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_events_no_delete BEFORE DELETE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'Audit events are append-only');
END;
"#;
