//! Recall setting and recall message database operations.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{RecallMessage, RecallMessageStatus, RecallSchedule, RecallSetting};

/// Raw row before JSON/enum decoding.
struct RecallMessageRow {
    id: String,
    patient_id: String,
    treatment: String,
    timing: String,
    timing_days: i64,
    message: String,
    status: String,
    scheduled_at: String,
    last_visit: String,
    created_at: String,
}

impl TryFrom<RecallMessageRow> for RecallMessage {
    type Error = DbError;

    fn try_from(row: RecallMessageRow) -> Result<Self, Self::Error> {
        let status: RecallMessageStatus = row
            .status
            .parse()
            .map_err(|e| DbError::Constraint(format!("{}", e)))?;
        Ok(RecallMessage {
            id: row.id,
            patient_id: row.patient_id,
            treatment: row.treatment,
            timing: row.timing,
            timing_days: row.timing_days,
            message: row.message,
            status,
            scheduled_at: row.scheduled_at,
            last_visit: row.last_visit,
            created_at: row.created_at,
        })
    }
}

impl Database {
    /// Insert or replace the recall schedule of a treatment.
    pub fn upsert_recall_setting(&self, setting: &RecallSetting) -> DbResult<()> {
        let schedules_json = serde_json::to_string(&setting.schedules)?;
        self.conn.execute(
            r#"
            INSERT INTO recall_settings (treatment, schedules, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(treatment) DO UPDATE SET
                schedules = excluded.schedules,
                updated_at = excluded.updated_at
            "#,
            params![
                setting.treatment,
                schedules_json,
                setting.created_at,
                setting.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get the recall schedule of a treatment.
    pub fn get_recall_setting(&self, treatment: &str) -> DbResult<Option<RecallSetting>> {
        let row = self
            .conn
            .query_row(
                "SELECT treatment, schedules, created_at, updated_at FROM recall_settings WHERE treatment = ?",
                [treatment],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((treatment, schedules, created_at, updated_at)) => {
                let schedules: Vec<RecallSchedule> = serde_json::from_str(&schedules)?;
                Ok(Some(RecallSetting {
                    treatment,
                    schedules,
                    created_at,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Timings that already have a pending message for this (patient, treatment).
    pub fn pending_recall_timings(&self, patient_id: &str, treatment: &str) -> DbResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timing FROM recall_messages
            WHERE patient_id = ?1 AND treatment = ?2 AND status = 'pending'
            "#,
        )?;
        let rows = stmt.query_map([patient_id, treatment], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<HashSet<_>, _>>().map_err(Into::into)
    }

    /// Insert a recall message. Returns false when a pending message for the
    /// same timing already exists.
    pub fn insert_recall_message(&self, message: &RecallMessage) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO recall_messages (
                id, patient_id, treatment, timing, timing_days, message,
                status, scheduled_at, last_visit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                message.id,
                message.patient_id,
                message.treatment,
                message.timing,
                message.timing_days,
                message.message,
                message.status.as_str(),
                message.scheduled_at,
                message.last_visit,
                message.created_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Recall messages of a patient ordered by send time.
    pub fn list_recall_messages(&self, patient_id: &str) -> DbResult<Vec<RecallMessage>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, treatment, timing, timing_days, message,
                   status, scheduled_at, last_visit, created_at
            FROM recall_messages
            WHERE patient_id = ?
            ORDER BY scheduled_at, timing_days
            "#,
        )?;

        let rows = stmt.query_map([patient_id], |row| {
            Ok(RecallMessageRow {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                treatment: row.get(2)?,
                timing: row.get(3)?,
                timing_days: row.get(4)?,
                message: row.get(5)?,
                status: row.get(6)?,
                scheduled_at: row.get(7)?,
                last_visit: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?.try_into()?);
        }
        Ok(messages)
    }

    /// Cancel every pending recall message of a patient.
    pub fn cancel_pending_recall_messages(&self, patient_id: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "UPDATE recall_messages SET status = 'cancelled' WHERE patient_id = ? AND status = 'pending'",
            [patient_id],
        )?;
        Ok(rows_affected)
    }
}
