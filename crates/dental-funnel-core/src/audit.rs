//! Tamper-evident audit trail.
//!
//! Every use-case appends one [`AuditEvent`]. Events form a SHA-256 hash
//! chain: `hash = sha256(prev_hash || payload)`, where the first event
//! chains from the empty string.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::Database;

/// Audit trail errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Whether the audited use-case succeeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
        }
    }
}

/// One audited use-case invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub action: String,
    pub target_id: Option<String>,
    pub actor: Option<String>,
    pub outcome: AuditOutcome,
    pub details: serde_json::Value,
    pub recorded_at: String,
}

impl AuditEvent {
    pub fn new(action: &str, target_id: Option<&str>, outcome: AuditOutcome) -> Self {
        Self {
            action: action.to_string(),
            target_id: target_id.map(str::to_string),
            actor: None,
            outcome,
            details: serde_json::Value::Null,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_actor(mut self, actor: Option<&str>) -> Self {
        self.actor = actor.map(str::to_string);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize to canonical JSON for hashing.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of re-walking the hash chain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditVerification {
    pub valid: bool,
    pub event_count: usize,
    /// Sequence number of the first event whose hash does not match
    pub broken_at: Option<i64>,
}

/// Audit trail manager.
pub struct AuditTrail<'a> {
    db: &'a Database,
}

impl<'a> AuditTrail<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an event to the chain, returning its hash.
    pub fn append(&self, event: &AuditEvent) -> AuditResult<String> {
        let payload = event.to_canonical_json()?;
        let prev_hash = self.db.last_audit_hash()?.unwrap_or_default();
        let hash = chain_hash(&prev_hash, &payload);

        self.db.insert_audit_event(
            &hash,
            &prev_hash,
            &payload,
            &event.action,
            event.target_id.as_deref(),
            event.outcome.as_str(),
            &event.recorded_at,
        )?;
        Ok(hash)
    }

    /// Recompute every link of the chain.
    pub fn verify(&self) -> AuditResult<AuditVerification> {
        let rows = self.db.list_audit_events()?;
        let mut expected_prev = String::new();

        for row in &rows {
            let recomputed = chain_hash(&expected_prev, &row.payload);
            if row.prev_hash != expected_prev || row.hash != recomputed {
                return Ok(AuditVerification {
                    valid: false,
                    event_count: rows.len(),
                    broken_at: Some(row.seq),
                });
            }
            expected_prev = row.hash.clone();
        }

        Ok(AuditVerification {
            valid: true,
            event_count: rows.len(),
            broken_at: None,
        })
    }

    /// Decoded events about one target.
    pub fn events_for(&self, target_id: &str) -> AuditResult<Vec<AuditEvent>> {
        self.db
            .list_audit_events_for(target_id)?
            .iter()
            .map(|row| serde_json::from_str(&row.payload).map_err(AuditError::from))
            .collect()
    }
}

/// Append an audit event; failures are logged and never reach the caller.
pub fn record_audit(db: &Database, event: AuditEvent) {
    if let Err(e) = AuditTrail::new(db).append(&event) {
        tracing::warn!(action = %event.action, error = %e, "failed to record audit event");
    }
}

/// SHA-256 of `data` as lowercase hex.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn chain_hash(prev_hash: &str, payload: &str) -> String {
    hash_data(format!("{}{}", prev_hash, payload).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_hash_data_known_value() {
        assert_eq!(
            hash_data(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_chain_links() {
        let db = setup_db();
        let trail = AuditTrail::new(&db);

        let first = trail
            .append(&AuditEvent::new("create_patient", Some("p1"), AuditOutcome::Success))
            .unwrap();
        let second = trail
            .append(&AuditEvent::new("update_patient", Some("p1"), AuditOutcome::Failure))
            .unwrap();
        assert_ne!(first, second);

        let rows = db.list_audit_events().unwrap();
        assert_eq!(rows[0].prev_hash, "");
        assert_eq!(rows[1].prev_hash, first);

        let verification = trail.verify().unwrap();
        assert!(verification.valid);
        assert_eq!(verification.event_count, 2);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let db = setup_db();
        let trail = AuditTrail::new(&db);
        for action in ["create_patient", "record_callback", "delete_patient"] {
            trail
                .append(&AuditEvent::new(action, Some("p1"), AuditOutcome::Success))
                .unwrap();
        }

        // Bypass the append-only trigger to simulate tampering at rest.
        db.conn()
            .execute_batch(
                "DROP TRIGGER audit_events_no_update;
                 UPDATE audit_events SET payload = '{\"action\":\"forged\"}' WHERE seq = 2;",
            )
            .unwrap();

        let verification = trail.verify().unwrap();
        assert!(!verification.valid);
        assert_eq!(verification.broken_at, Some(2));
    }

    #[test]
    fn test_events_for_target() {
        let db = setup_db();
        record_audit(&db, AuditEvent::new("get_patient", Some("p1"), AuditOutcome::Success));
        record_audit(&db, AuditEvent::new("get_patient", Some("p2"), AuditOutcome::Success));
        record_audit(
            &db,
            AuditEvent::new("delete_patient", Some("p1"), AuditOutcome::Failure)
                .with_actor(Some("상담실장"))
                .with_details(serde_json::json!({"error": "not found"})),
        );

        let events = AuditTrail::new(&db).events_for("p1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].actor.as_deref(), Some("상담실장"));
        assert_eq!(events[1].outcome, AuditOutcome::Failure);
    }
}
