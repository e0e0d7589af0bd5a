//! Patient database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Patient;

fn decode(document: String) -> DbResult<Patient> {
    Ok(serde_json::from_str(&document)?)
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let document = serde_json::to_string(patient)?;
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, phone, status, call_in_date, document, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.status.as_str(),
                patient.call_in_date,
                document,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Replace the stored document of an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let document = serde_json::to_string(patient)?;
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                phone = ?3,
                status = ?4,
                call_in_date = ?5,
                document = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.status.as_str(),
                patient.call_in_date,
                document,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row("SELECT document FROM patients WHERE id = ?", [id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?
            .map(decode)
            .transpose()
    }

    /// Search patients by name prefix or phone substring.
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let name_pattern = format!("{}%", query);
        let phone_pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document FROM patients
            WHERE name LIKE ?1 OR phone LIKE ?2
            ORDER BY name
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(params![name_pattern, phone_pattern, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(decode(row?)?);
        }
        Ok(patients)
    }

    /// Patients whose first-contact date falls in `[start, end]` (inclusive,
    /// `YYYY-MM-DD`).
    pub fn list_patients_called_in(&self, start: &str, end: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document FROM patients
            WHERE call_in_date >= ?1 AND call_in_date <= ?2
            ORDER BY call_in_date, created_at
            "#,
        )?;
        let rows = stmt.query_map([start, end], |row| row.get::<_, String>(0))?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(decode(row?)?);
        }
        Ok(patients)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
