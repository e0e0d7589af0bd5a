//! Database layer for the dental funnel.

mod audit;
mod call_logs;
mod patients;
mod recall;
mod schema;

pub use audit::*;
pub use schema::*;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use thiserror::Error;

use crate::models::Patient;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Read-modify-write one patient document inside a `BEGIN IMMEDIATE`
    /// transaction. The document is written back only if `mutate` succeeds.
    pub fn update_patient_with<T, E, F>(&self, patient_id: &str, mutate: F) -> Result<(Patient, T), E>
    where
        F: FnOnce(&mut Patient) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(DbError::from)?;

        let mut patient = self
            .get_patient(patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", patient_id)))?;

        let value = mutate(&mut patient)?;
        patient.touch();
        self.update_patient(&patient)?;

        tx.commit().map_err(DbError::from)?;
        Ok((patient, value))
    }
}
