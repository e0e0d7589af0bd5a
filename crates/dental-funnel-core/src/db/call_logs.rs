//! Call-log database operations.

use rusqlite::{params, Row};

use super::{Database, DbResult};
use crate::models::CallLog;

fn call_log_from_row(row: &Row<'_>) -> rusqlite::Result<CallLog> {
    Ok(CallLog {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        phone: row.get(2)?,
        patient_name: row.get(3)?,
        started_at: row.get(4)?,
        direction: row.get(5)?,
        duration_secs: row.get(6)?,
        summary: row.get(7)?,
        classification: row.get(8)?,
    })
}

impl Database {
    /// Insert a call log.
    pub fn insert_call_log(&self, log: &CallLog) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO call_logs (
                id, patient_id, phone, patient_name, started_at,
                direction, duration_secs, summary, classification
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.id,
                log.patient_id,
                log.phone,
                log.patient_name,
                log.started_at,
                log.direction,
                log.duration_secs,
                log.summary,
                log.classification,
            ],
        )?;
        Ok(())
    }

    /// Most recent call logs of a patient, newest first.
    pub fn recent_call_logs(&self, patient_id: &str, limit: usize) -> DbResult<Vec<CallLog>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, phone, patient_name, started_at,
                   direction, duration_secs, summary, classification
            FROM call_logs
            WHERE patient_id = ?1
            ORDER BY started_at DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![patient_id, limit as i64], call_log_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Update the display name on every call log linked to a patient, and on
    /// unlinked logs from the patient's phone number.
    pub fn rename_call_log_patient(&self, patient_id: &str, phone: &str, name: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE call_logs SET patient_name = ?3
            WHERE patient_id = ?1 OR (patient_id IS NULL AND phone = ?2)
            "#,
            [patient_id, phone, name],
        )?;
        Ok(rows_affected)
    }

    /// Unlink every call log from a patient.
    pub fn detach_call_logs(&self, patient_id: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "UPDATE call_logs SET patient_id = NULL WHERE patient_id = ?1",
            [patient_id],
        )?;
        Ok(rows_affected)
    }
}
