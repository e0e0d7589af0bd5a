//! Audit event database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

/// A stored, hash-chained audit row.
#[derive(Debug, Clone)]
pub struct AuditRow {
    pub seq: i64,
    pub hash: String,
    pub prev_hash: String,
    pub payload: String,
    pub action: String,
    pub target_id: Option<String>,
    pub outcome: String,
    pub recorded_at: String,
}

impl Database {
    /// Append an audit row.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_audit_event(
        &self,
        hash: &str,
        prev_hash: &str,
        payload: &str,
        action: &str,
        target_id: Option<&str>,
        outcome: &str,
        recorded_at: &str,
    ) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO audit_events (hash, prev_hash, payload, action, target_id, outcome, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![hash, prev_hash, payload, action, target_id, outcome, recorded_at],
        )?;
        Ok(())
    }

    /// Hash of the latest audit row, if any.
    pub fn last_audit_hash(&self) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT hash FROM audit_events ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All audit rows in append order.
    pub fn list_audit_events(&self) -> DbResult<Vec<AuditRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, hash, prev_hash, payload, action, target_id, outcome, recorded_at
            FROM audit_events
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AuditRow {
                seq: row.get(0)?,
                hash: row.get(1)?,
                prev_hash: row.get(2)?,
                payload: row.get(3)?,
                action: row.get(4)?,
                target_id: row.get(5)?,
                outcome: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Audit rows about one target, in append order.
    pub fn list_audit_events_for(&self, target_id: &str) -> DbResult<Vec<AuditRow>> {
        Ok(self
            .list_audit_events()?
            .into_iter()
            .filter(|row| row.target_id.as_deref() == Some(target_id))
            .collect())
    }
}
