//! Dental Funnel Core Library
//!
//! Local-first lead tracking for dental clinics: every lead moves through a
//! consultation-to-treatment funnel, and the clinic reads revenue and monthly
//! statistics off the same patient documents.
//!
//! # Architecture
//!
//! ```text
//!   Phone intake ──► consulting ──► reserved ──► visited ──► treatmentBooked
//!                        │             │            │               │
//!                        │      reschedule ledger   │               ▼
//!                        │                          │          treatment ──► completed ──► followup
//!                        ▼                          ▼                            │
//!                     closed ◄──────────────── closed                            ▼
//!                                                                    recall message scheduling
//!
//!   ┌────────────────────────────┐        ┌─────────────────────────────────┐
//!   │  Transition engine/ledger  │──────► │  propagate() → active journey   │
//!   └─────────────┬──────────────┘        └─────────────────────────────────┘
//!                 │ one BEGIN IMMEDIATE transaction per patient
//!                 ▼
//!   ┌────────────────────────────┐        ┌─────────────────────────────────┐
//!   │   SQLite patient documents │──────► │ revenue classifier / monthly    │
//!   └────────────────────────────┘        │ statistics (read-only)          │
//!                 │                       └─────────────────────────────────┘
//!                 ▼
//!        hash-chained audit trail
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Journey, callbacks, recall settings)
//! - [`db`]: SQLite persistence of patient documents, call logs, recall and audit tables
//! - [`funnel`]: Status transitions, callback ledger, journey mirroring, recall planning
//! - [`analytics`]: Revenue classification and monthly statistics
//! - [`service`]: Transactional use-cases with audit recording
//! - [`audit`]: SHA-256 hash-chained audit trail

pub mod analytics;
pub mod audit;
pub mod config;
pub mod dates;
pub mod db;
pub mod funnel;
pub mod logging;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use analytics::{MonthlyReport, RevenueAnalysis};
pub use config::FunnelConfig;
pub use db::Database;
pub use funnel::{CallbackAmendment, CallbackPayload, NewJourney, Reschedule, StatusChange};
pub use models::{
    CallLog, CallbackEntry, ConsultationResult, Journey, Patient, PatientStatus, RecallMessage,
    RecallSetting,
};
pub use service::{NewPatient, PatientFields, PatientService, PatientUpdate};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use serde::Serialize;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalFunnelError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for DentalFunnelError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => DentalFunnelError::NotFound(what),
            other => DentalFunnelError::DatabaseError(other.to_string()),
        }
    }
}

impl From<funnel::WorkflowError> for DentalFunnelError {
    fn from(e: funnel::WorkflowError) -> Self {
        match e {
            funnel::WorkflowError::NotFound(id) => DentalFunnelError::NotFound(format!("patient {}", id)),
            funnel::WorkflowError::CallbackNotFound(id) => {
                DentalFunnelError::NotFound(format!("callback {}", id))
            }
            funnel::WorkflowError::InvalidInput(msg) => DentalFunnelError::InvalidInput(msg),
            funnel::WorkflowError::Database(e) => e.into(),
        }
    }
}

impl From<analytics::StatsError> for DentalFunnelError {
    fn from(e: analytics::StatsError) -> Self {
        match e {
            analytics::StatsError::InvalidRange(msg) => DentalFunnelError::InvalidRange(msg),
            analytics::StatsError::Database(e) => e.into(),
        }
    }
}

impl From<audit::AuditError> for DentalFunnelError {
    fn from(e: audit::AuditError) -> Self {
        DentalFunnelError::DatabaseError(e.to_string())
    }
}

impl From<models::UnknownVariant> for DentalFunnelError {
    fn from(e: models::UnknownVariant) -> Self {
        DentalFunnelError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for DentalFunnelError {
    fn from(e: serde_json::Error) -> Self {
        DentalFunnelError::SerializationError(e.to_string())
    }
}

impl From<::config::ConfigError> for DentalFunnelError {
    fn from(e: ::config::ConfigError) -> Self {
        DentalFunnelError::InvalidInput(format!("configuration: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalFunnelError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalFunnelError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path with default settings.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<DentalFunnelCore>, DentalFunnelError> {
    let db = Database::open(&path)?;
    Ok(DentalFunnelCore::wrap(db, FunnelConfig::default()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<DentalFunnelCore>, DentalFunnelError> {
    let db = Database::open_in_memory()?;
    Ok(DentalFunnelCore::wrap(db, FunnelConfig::default()))
}

/// Load settings from a TOML file (missing file means defaults) and the
/// environment, install logging and open the configured database.
#[uniffi::export]
pub fn open_with_config(config_path: String) -> Result<Arc<DentalFunnelCore>, DentalFunnelError> {
    let config = FunnelConfig::load_from(&config_path)?;
    logging::init_logging(&config.log_filter);
    let db = Database::open(&config.database_path)?;
    Ok(DentalFunnelCore::wrap(db, config))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DentalFunnelCore {
    db: Arc<Mutex<Database>>,
    config: FunnelConfig,
}

impl DentalFunnelCore {
    fn wrap(db: Database, config: FunnelConfig) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        })
    }
}

#[uniffi::export]
impl DentalFunnelCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a lead on first contact.
    pub fn create_patient(&self, patient: FfiNewPatient) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let request: NewPatient = patient.try_into()?;
        let created = PatientService::new(&db, &self.config).create_patient(request)?;
        Ok(created.into())
    }

    /// Get a patient with its most recent call summaries.
    pub fn get_patient(&self, patient_id: String) -> Result<FfiPatientDetail, DentalFunnelError> {
        let db = self.db.lock()?;
        let detail = PatientService::new(&db, &self.config).get_patient(&patient_id)?;
        Ok(FfiPatientDetail {
            patient: detail.patient.into(),
            recent_calls: detail.recent_calls.into_iter().map(|c| c.into()).collect(),
        })
    }

    /// Search patients by name prefix or phone digits.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, DentalFunnelError> {
        let db = self.db.lock()?;
        let patients = PatientService::new(&db, &self.config).search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Field edit, status transition or schedule-only change.
    pub fn update_patient(
        &self,
        patient_id: String,
        update: FfiPatientUpdate,
    ) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let update: PatientUpdate = update.try_into()?;
        let patient = PatientService::new(&db, &self.config).update_patient(&patient_id, update)?;
        Ok(patient.into())
    }

    pub fn delete_patient(&self, patient_id: String) -> Result<(), DentalFunnelError> {
        let db = self.db.lock()?;
        PatientService::new(&db, &self.config).delete_patient(&patient_id)?;
        Ok(())
    }

    /// Store a call summary, optionally linked to a patient.
    pub fn record_call_log(&self, log: FfiCallLog) -> Result<FfiCallLog, DentalFunnelError> {
        let db = self.db.lock()?;
        let stored = PatientService::new(&db, &self.config).record_call_log(log.into())?;
        Ok(stored.into())
    }

    // =========================================================================
    // Callback Operations
    // =========================================================================

    /// Record a callback attempt and apply its outcome.
    pub fn record_callback(
        &self,
        patient_id: String,
        payload: FfiCallbackPayload,
    ) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let payload: CallbackPayload = payload.try_into()?;
        let receipt = PatientService::new(&db, &self.config).record_callback(&patient_id, payload)?;
        Ok(receipt.patient.into())
    }

    /// Edit a callback, keeping its scheduled date and time.
    pub fn amend_callback(
        &self,
        patient_id: String,
        callback_id: String,
        amendment: FfiCallbackAmendment,
    ) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let amendment: CallbackAmendment = amendment.try_into()?;
        let patient =
            PatientService::new(&db, &self.config).amend_callback(&patient_id, &callback_id, amendment)?;
        Ok(patient.into())
    }

    pub fn delete_callback(&self, patient_id: String, callback_id: String) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let patient = PatientService::new(&db, &self.config).delete_callback(&patient_id, &callback_id)?;
        Ok(patient.into())
    }

    // =========================================================================
    // Consultation & Journey Operations
    // =========================================================================

    /// Store a phone or visit consultation result and apply its outcome.
    pub fn apply_consultation(
        &self,
        patient_id: String,
        consultation: FfiConsultation,
        changed_by: Option<String>,
    ) -> Result<FfiPatient, DentalFunnelError> {
        let db = self.db.lock()?;
        let consultation: ConsultationResult = consultation.try_into()?;
        let patient = PatientService::new(&db, &self.config).apply_consultation(
            &patient_id,
            consultation,
            changed_by.as_deref(),
        )?;
        Ok(patient.into())
    }

    /// Start a new consultation episode, returning the journey ID.
    pub fn open_journey(
        &self,
        patient_id: String,
        treatment_type: String,
        estimated_amount: Option<i64>,
        changed_by: Option<String>,
    ) -> Result<String, DentalFunnelError> {
        let db = self.db.lock()?;
        let request = NewJourney {
            treatment_type,
            estimated_amount,
            changed_by,
        };
        let (_, journey_id) = PatientService::new(&db, &self.config).open_journey(&patient_id, request)?;
        Ok(journey_id)
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Monthly statistics versus the prior month, as JSON.
    pub fn compute_monthly_stats_json(&self, year: i32, month: u32) -> Result<String, DentalFunnelError> {
        let db = self.db.lock()?;
        let report = PatientService::new(&db, &self.config).compute_monthly_stats(year, month)?;
        Ok(serde_json::to_string(&report)?)
    }

    /// Revenue analysis of leads first contacted in `[from, to]`, as JSON.
    pub fn classify_revenue_json(&self, from: String, to: String) -> Result<String, DentalFunnelError> {
        let db = self.db.lock()?;
        let analysis = PatientService::new(&db, &self.config).classify_revenue(&from, &to)?;
        Ok(serde_json::to_string(&analysis)?)
    }

    // =========================================================================
    // Recall Operations
    // =========================================================================

    pub fn upsert_recall_setting(
        &self,
        treatment: String,
        schedules: Vec<FfiRecallSchedule>,
    ) -> Result<(), DentalFunnelError> {
        let db = self.db.lock()?;
        let setting = RecallSetting::new(treatment, schedules.into_iter().map(|s| s.into()).collect());
        PatientService::new(&db, &self.config).upsert_recall_setting(setting)?;
        Ok(())
    }

    pub fn list_recall_messages(&self, patient_id: String) -> Result<Vec<FfiRecallMessage>, DentalFunnelError> {
        let db = self.db.lock()?;
        let messages = PatientService::new(&db, &self.config).list_recall_messages(&patient_id)?;
        Ok(messages.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Audit
    // =========================================================================

    pub fn verify_audit_trail(&self) -> Result<FfiAuditVerification, DentalFunnelError> {
        let db = self.db.lock()?;
        let verification = PatientService::new(&db, &self.config).verify_audit_trail()?;
        Ok(FfiAuditVerification {
            valid: verification.valid,
            event_count: verification.event_count as u32,
            broken_at: verification.broken_at,
        })
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// Serialized name of a serde enum value.
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

fn parse_opt<T: std::str::FromStr>(value: Option<String>) -> Result<Option<T>, T::Err> {
    value.map(|v| v.parse()).transpose()
}

/// FFI-safe patient snapshot. Enum values use their wire names.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: String,
    pub temperature: String,
    pub source: Option<String>,
    pub consultation_type: String,
    pub region: Option<String>,
    pub age: Option<u32>,
    pub interest: Option<String>,
    pub call_in_date: String,
    pub estimated_amount: i64,
    pub actual_amount: i64,
    pub resolved_amount: i64,
    pub payment_status: String,
    pub next_action: Option<String>,
    pub next_action_date: Option<String>,
    pub next_action_note: Option<String>,
    pub next_callback_date: Option<String>,
    pub treatment_start_date: Option<String>,
    pub lead_status: String,
    pub visit_confirmed: bool,
    pub post_visit_status: Option<String>,
    pub is_completed: bool,
    pub attempt_counter: u32,
    pub callback_count: u32,
    pub active_journey_id: Option<String>,
    /// Full patient document
    pub document_json: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        let document_json = serde_json::to_string(&patient).unwrap_or_default();
        Self {
            status: patient.status.as_str().to_string(),
            temperature: wire_name(&patient.temperature),
            consultation_type: wire_name(&patient.consultation_type),
            resolved_amount: patient.resolved_amount(),
            payment_status: wire_name(&patient.payment_status),
            lead_status: patient.lead_status.label().to_string(),
            post_visit_status: patient.post_visit_status.map(|s| s.label().to_string()),
            callback_count: patient.callback_history.len() as u32,
            id: patient.id,
            name: patient.name,
            phone: patient.phone,
            source: patient.source,
            region: patient.region,
            age: patient.age,
            interest: patient.interest,
            call_in_date: patient.call_in_date,
            estimated_amount: patient.estimated_amount,
            actual_amount: patient.actual_amount,
            next_action: patient.next_action,
            next_action_date: patient.next_action_date,
            next_action_note: patient.next_action_note,
            next_callback_date: patient.next_callback_date,
            treatment_start_date: patient.treatment_start_date,
            visit_confirmed: patient.visit_confirmed,
            is_completed: patient.is_completed,
            attempt_counter: patient.attempt_counter,
            active_journey_id: patient.active_journey_id,
            document_json,
        }
    }
}

/// FFI-safe call summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCallLog {
    pub id: String,
    pub patient_id: Option<String>,
    pub phone: String,
    pub patient_name: Option<String>,
    pub started_at: String,
    pub direction: String,
    pub duration_secs: u32,
    pub summary: Option<String>,
    pub classification: Option<String>,
}

impl From<CallLog> for FfiCallLog {
    fn from(log: CallLog) -> Self {
        Self {
            id: log.id,
            patient_id: log.patient_id,
            phone: log.phone,
            patient_name: log.patient_name,
            started_at: log.started_at,
            direction: log.direction,
            duration_secs: log.duration_secs,
            summary: log.summary,
            classification: log.classification,
        }
    }
}

impl From<FfiCallLog> for CallLog {
    fn from(log: FfiCallLog) -> Self {
        let mut call = CallLog::new(log.phone, log.direction, log.started_at);
        if !log.id.is_empty() {
            call.id = log.id;
        }
        call.patient_id = log.patient_id;
        call.patient_name = log.patient_name;
        call.duration_secs = log.duration_secs;
        call.summary = log.summary;
        call.classification = log.classification;
        call
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientDetail {
    pub patient: FfiPatient,
    pub recent_calls: Vec<FfiCallLog>,
}

/// FFI-safe intake request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub phone: String,
    pub source: Option<String>,
    /// inbound, outbound or returning (default inbound)
    pub consultation_type: Option<String>,
    pub region: Option<String>,
    pub age: Option<u32>,
    pub interest: Option<String>,
    pub memo: Option<String>,
    pub call_in_date: Option<String>,
    pub estimated_amount: i64,
}

impl TryFrom<FfiNewPatient> for NewPatient {
    type Error = DentalFunnelError;

    fn try_from(p: FfiNewPatient) -> Result<Self, Self::Error> {
        Ok(NewPatient {
            name: p.name,
            phone: p.phone,
            source: p.source,
            consultation_type: parse_opt(p.consultation_type)?.unwrap_or_default(),
            region: p.region,
            age: p.age,
            interest: p.interest,
            memo: p.memo,
            call_in_date: p.call_in_date,
            estimated_amount: p.estimated_amount,
        })
    }
}

/// FFI-safe field edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub temperature: Option<String>,
    pub source: Option<String>,
    pub consultation_type: Option<String>,
    pub region: Option<String>,
    pub age: Option<u32>,
    pub interest: Option<String>,
    pub memo: Option<String>,
    pub tags: Option<Vec<String>>,
    pub call_in_date: Option<String>,
    pub lead_status: Option<String>,
    pub estimated_amount: Option<i64>,
    pub actual_amount: Option<i64>,
    pub treatment_cost: Option<i64>,
    pub payment_status: Option<String>,
    pub treatment_note: Option<String>,
    pub next_action_note: Option<String>,
    pub expected_completion_date: Option<String>,
}

impl TryFrom<FfiPatientFields> for PatientFields {
    type Error = DentalFunnelError;

    fn try_from(f: FfiPatientFields) -> Result<Self, Self::Error> {
        Ok(PatientFields {
            name: f.name,
            phone: f.phone,
            temperature: parse_opt(f.temperature)?,
            source: f.source,
            consultation_type: parse_opt(f.consultation_type)?,
            region: f.region,
            age: f.age,
            interest: f.interest,
            memo: f.memo,
            tags: f.tags,
            call_in_date: f.call_in_date,
            lead_status: parse_opt(f.lead_status)?,
            estimated_amount: f.estimated_amount,
            actual_amount: f.actual_amount,
            treatment_cost: f.treatment_cost,
            payment_status: parse_opt(f.payment_status)?,
            treatment_note: f.treatment_note,
            next_action_note: f.next_action_note,
            expected_completion_date: f.expected_completion_date,
        })
    }
}

/// FFI-safe status change.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatusChange {
    pub target: String,
    pub event_date: Option<String>,
    pub closed_reason: Option<String>,
    pub is_reactivation: bool,
    pub changed_by: Option<String>,
}

impl TryFrom<FfiStatusChange> for StatusChange {
    type Error = DentalFunnelError;

    fn try_from(c: FfiStatusChange) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            target: c.target.parse()?,
            event_date: c.event_date,
            closed_reason: c.closed_reason,
            is_reactivation: c.is_reactivation,
            changed_by: c.changed_by,
        })
    }
}

/// FFI-safe schedule-only change.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReschedule {
    pub new_date: String,
    pub reason: Option<String>,
    pub note: Option<String>,
}

/// Update discriminated by its type.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiPatientUpdate {
    Fields { fields: FfiPatientFields },
    StatusChange { change: FfiStatusChange },
    ScheduleOnly { schedule: FfiReschedule },
}

impl TryFrom<FfiPatientUpdate> for PatientUpdate {
    type Error = DentalFunnelError;

    fn try_from(update: FfiPatientUpdate) -> Result<Self, Self::Error> {
        Ok(match update {
            FfiPatientUpdate::Fields { fields } => PatientUpdate::Fields(fields.try_into()?),
            FfiPatientUpdate::StatusChange { change } => PatientUpdate::StatusChange(change.try_into()?),
            FfiPatientUpdate::ScheduleOnly { schedule } => PatientUpdate::ScheduleOnly(Reschedule {
                new_date: schedule.new_date,
                reason: schedule.reason,
                note: schedule.note,
            }),
        })
    }
}

/// FFI-safe callback attempt.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCallbackPayload {
    /// 완료, 부재중, 콜백재요청, 예약확정, 예약취소, 보류, 치료동의 or 치료거부
    pub result: String,
    pub notes: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub handled_by: Option<String>,
    pub next_date: Option<String>,
}

impl TryFrom<FfiCallbackPayload> for CallbackPayload {
    type Error = DentalFunnelError;

    fn try_from(p: FfiCallbackPayload) -> Result<Self, Self::Error> {
        Ok(CallbackPayload {
            result: p.result.parse()?,
            notes: p.notes,
            date: p.date,
            time: p.time,
            handled_by: p.handled_by,
            next_date: p.next_date,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCallbackAmendment {
    pub result: Option<String>,
    pub notes: Option<String>,
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
    pub handled_by: Option<String>,
}

impl TryFrom<FfiCallbackAmendment> for CallbackAmendment {
    type Error = DentalFunnelError;

    fn try_from(a: FfiCallbackAmendment) -> Result<Self, Self::Error> {
        Ok(CallbackAmendment {
            result: parse_opt(a.result)?,
            notes: a.notes,
            completed_date: a.completed_date,
            completed_time: a.completed_time,
            handled_by: a.handled_by,
        })
    }
}

/// FFI-safe consultation result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConsultation {
    /// phone or visit
    pub stage: String,
    /// agreed, disagreed or pending
    pub status: String,
    pub treatment: Option<String>,
    pub original_amount: i64,
    pub discount_rate: u32,
    pub discount_amount: Option<i64>,
    pub disagree_reasons: Vec<String>,
    pub correction_plan: Option<String>,
    pub appointment_date: Option<String>,
    pub callback_date: Option<String>,
    pub memo: Option<String>,
}

impl TryFrom<FfiConsultation> for ConsultationResult {
    type Error = DentalFunnelError;

    fn try_from(c: FfiConsultation) -> Result<Self, Self::Error> {
        let mut result = ConsultationResult::new(c.stage.parse()?, c.status.parse()?);
        if c.discount_rate > 100 {
            return Err(DentalFunnelError::InvalidInput(format!(
                "discountRate must be 0-100, got {}",
                c.discount_rate
            )));
        }
        result.treatment = c.treatment;
        result.original_amount = c.original_amount;
        result.discount_rate = c.discount_rate;
        result.discount_amount = c.discount_amount;
        result.disagree_reasons = c.disagree_reasons;
        result.correction_plan = c.correction_plan;
        result.appointment_date = c.appointment_date;
        result.callback_date = c.callback_date;
        result.memo = c.memo;
        Ok(result)
    }
}

/// FFI-safe recall schedule row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecallSchedule {
    pub timing: String,
    pub timing_days: i64,
    /// Template; {환자명} and {이름} become the patient name
    pub message: String,
    pub enabled: bool,
}

impl From<FfiRecallSchedule> for models::RecallSchedule {
    fn from(s: FfiRecallSchedule) -> Self {
        models::RecallSchedule {
            timing: s.timing,
            timing_days: s.timing_days,
            message: s.message,
            enabled: s.enabled,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecallMessage {
    pub id: String,
    pub patient_id: String,
    pub treatment: String,
    pub timing: String,
    pub message: String,
    pub status: String,
    pub scheduled_at: String,
}

impl From<RecallMessage> for FfiRecallMessage {
    fn from(m: RecallMessage) -> Self {
        Self {
            status: m.status.as_str().to_string(),
            id: m.id,
            patient_id: m.patient_id,
            treatment: m.treatment,
            timing: m.timing,
            message: m.message,
            scheduled_at: m.scheduled_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAuditVerification {
    pub valid: bool,
    pub event_count: u32,
    pub broken_at: Option<i64>,
}
