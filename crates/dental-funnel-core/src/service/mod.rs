//! Patient use-cases.
//!
//! Each mutating call is one read-modify-write of a single patient document
//! inside a `BEGIN IMMEDIATE` transaction. Cross-entity follow-ups (call-log
//! renames, recall scheduling) run after commit and never fail the call.
//! Every use-case records one audit event, successful or not.

mod fields;

pub use fields::{NewPatient, PatientFields};

use std::fmt::Display;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::analytics::{
    classify_revenue, date_range, MonthlyReport, MonthlyStatsAggregator, RevenueAnalysis, StatsResult,
};
use crate::audit::{record_audit, AuditEvent, AuditOutcome, AuditResult, AuditTrail, AuditVerification};
use crate::config::FunnelConfig;
use crate::dates;
use crate::db::Database;
use crate::funnel::{
    amend_callback, apply_outcome, apply_transition, delete_callback, open_journey,
    outcome_for_callback, propagate, record_attempt, require_date, reschedule,
    schedule_recall_messages, stage_of, CallbackAmendment, CallbackPayload, JourneyPatch, NewJourney,
    Reschedule, StatusChange, WorkflowError, WorkflowResult,
};
use crate::models::{
    CallLog, CallbackEntry, ConsultationResult, ConsultationStage, Patient, PatientStatus,
    RecallMessage, RecallSetting, StatusHistoryEntry,
};

/// A patient with its most recent call summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDetail {
    pub patient: Patient,
    pub recent_calls: Vec<CallLog>,
}

/// The three kinds of patient update. A schedule-only change moves the
/// reservation date without a status transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientUpdate {
    Fields(PatientFields),
    StatusChange(StatusChange),
    ScheduleOnly(Reschedule),
}

impl PatientUpdate {
    /// Wire name of the update type.
    pub fn update_type(&self) -> &'static str {
        match self {
            PatientUpdate::Fields(_) => "fields",
            PatientUpdate::StatusChange(_) => "statusChange",
            PatientUpdate::ScheduleOnly(_) => "scheduleOnly",
        }
    }
}

/// Result of recording a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackReceipt {
    pub patient: Patient,
    pub callback: CallbackEntry,
    /// Status changes implied by the callback result
    pub transitions: Vec<StatusHistoryEntry>,
}

/// Patient use-case service.
pub struct PatientService<'a> {
    db: &'a Database,
    config: &'a FunnelConfig,
}

impl<'a> PatientService<'a> {
    pub fn new(db: &'a Database, config: &'a FunnelConfig) -> Self {
        Self { db, config }
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a lead on first contact.
    pub fn create_patient(&self, request: NewPatient) -> WorkflowResult<Patient> {
        let result = request.into_patient().and_then(|patient| {
            self.db.insert_patient(&patient)?;
            Ok(patient)
        });

        if let Ok(patient) = &result {
            info!(patient_id = %patient.id, "created patient");
        }
        let target = result.as_ref().ok().map(|p| p.id.clone());
        self.audit("patient.create", target.as_deref(), None, Value::Null, &result);
        result
    }

    /// Patient snapshot with the latest call summaries.
    pub fn get_patient(&self, patient_id: &str) -> WorkflowResult<PatientDetail> {
        let result = self.load_detail(patient_id);
        self.audit("patient.get", Some(patient_id), None, Value::Null, &result);
        result
    }

    fn load_detail(&self, patient_id: &str) -> WorkflowResult<PatientDetail> {
        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or_else(|| WorkflowError::NotFound(patient_id.to_string()))?;
        let recent_calls = self
            .db
            .recent_call_logs(patient_id, self.config.recent_call_log_limit)?;
        Ok(PatientDetail {
            patient,
            recent_calls,
        })
    }

    pub fn search_patients(&self, query: &str, limit: usize) -> WorkflowResult<Vec<Patient>> {
        Ok(self.db.search_patients(query, limit)?)
    }

    /// Apply a field edit, a status transition or a schedule-only change.
    pub fn update_patient(&self, patient_id: &str, update: PatientUpdate) -> WorkflowResult<Patient> {
        let update_type = update.update_type();
        let actor = match &update {
            PatientUpdate::StatusChange(change) => change.changed_by.clone(),
            _ => None,
        };

        let result = self.db.update_patient_with(patient_id, |patient| {
            let previous = (patient.name.clone(), patient.phone.clone());
            let transitions: Vec<StatusHistoryEntry> = match &update {
                PatientUpdate::Fields(fields) => {
                    fields::apply_fields(patient, fields)?;
                    Vec::new()
                }
                PatientUpdate::StatusChange(change) => {
                    apply_transition(patient, change)?.into_iter().collect()
                }
                PatientUpdate::ScheduleOnly(request) => {
                    reschedule(patient, request)?;
                    Vec::new()
                }
            };
            Ok::<_, WorkflowError>((previous, transitions))
        });

        let result = result.map(|(patient, ((previous_name, previous_phone), transitions))| {
            if patient.name != previous_name {
                self.rename_call_logs(&patient, &previous_phone);
            }
            self.after_transitions(&patient, &transitions);
            info!(patient_id = %patient.id, update_type, status = patient.status.as_str(), "updated patient");
            patient
        });

        self.audit(
            "patient.update",
            Some(patient_id),
            actor.as_deref(),
            json!({ "updateType": update_type }),
            &result,
        );
        result
    }

    /// Remove a patient. Call logs are detached and pending recall messages
    /// cancelled on a best-effort basis.
    pub fn delete_patient(&self, patient_id: &str) -> WorkflowResult<()> {
        let result = self.db.delete_patient(patient_id).map_err(WorkflowError::from).and_then(|deleted| {
            if deleted {
                Ok(())
            } else {
                Err(WorkflowError::NotFound(patient_id.to_string()))
            }
        });

        if result.is_ok() {
            if let Err(e) = self.db.detach_call_logs(patient_id) {
                warn!(patient_id, error = %e, "failed to detach call logs");
            }
            if let Err(e) = self.db.cancel_pending_recall_messages(patient_id) {
                warn!(patient_id, error = %e, "failed to cancel recall messages");
            }
            info!(patient_id, "deleted patient");
        }

        self.audit("patient.delete", Some(patient_id), None, Value::Null, &result);
        result
    }

    /// Store a call summary. A known patient's current name is copied onto it.
    pub fn record_call_log(&self, log: CallLog) -> WorkflowResult<CallLog> {
        let result = self.insert_call_log(log);
        let target = result.as_ref().ok().and_then(|l| l.patient_id.clone());
        self.audit("call_log.record", target.as_deref(), None, Value::Null, &result);
        result
    }

    fn insert_call_log(&self, mut log: CallLog) -> WorkflowResult<CallLog> {
        if let Some(patient_id) = log.patient_id.as_deref() {
            let patient = self
                .db
                .get_patient(patient_id)?
                .ok_or_else(|| WorkflowError::NotFound(patient_id.to_string()))?;
            log.patient_name = Some(patient.name);
        }
        self.db.insert_call_log(&log)?;
        Ok(log)
    }

    // =========================================================================
    // Callback Operations
    // =========================================================================

    /// Append a callback attempt and apply the outcome its result implies.
    pub fn record_callback(&self, patient_id: &str, payload: CallbackPayload) -> WorkflowResult<CallbackReceipt> {
        let actor = payload.handled_by.clone();
        let result = self.db.update_patient_with(patient_id, |patient| {
            let callback = record_attempt(patient, &payload)?;
            let stage = callback
                .as_attempt()
                .map(|a| stage_of(a.stage))
                .unwrap_or(ConsultationStage::Phone);

            let transitions = match outcome_for_callback(&payload)? {
                Some(outcome) => apply_outcome(patient, stage, &outcome, payload.handled_by.as_deref())?.transitions,
                None => Vec::new(),
            };
            Ok::<_, WorkflowError>((callback, transitions))
        });

        let result = result.map(|(patient, (callback, transitions))| {
            self.after_transitions(&patient, &transitions);
            info!(
                patient_id = %patient.id,
                callback_id = %callback.id,
                result = payload.result.label(),
                "recorded callback"
            );
            CallbackReceipt {
                patient,
                callback,
                transitions,
            }
        });

        self.audit(
            "callback.record",
            Some(patient_id),
            actor.as_deref(),
            json!({ "result": payload.result.label() }),
            &result,
        );
        result
    }

    /// Edit one callback, keeping its scheduled date and time.
    pub fn amend_callback(
        &self,
        patient_id: &str,
        callback_id: &str,
        amendment: CallbackAmendment,
    ) -> WorkflowResult<Patient> {
        let result = self
            .db
            .update_patient_with(patient_id, |patient| amend_callback(patient, callback_id, &amendment))
            .map(|(patient, _)| patient);

        if result.is_ok() {
            info!(patient_id, callback_id, "amended callback");
        }
        self.audit(
            "callback.amend",
            Some(patient_id),
            amendment.handled_by.as_deref(),
            json!({ "callbackId": callback_id }),
            &result,
        );
        result
    }

    pub fn delete_callback(&self, patient_id: &str, callback_id: &str) -> WorkflowResult<Patient> {
        let result = self
            .db
            .update_patient_with(patient_id, |patient| delete_callback(patient, callback_id))
            .map(|(patient, _)| patient);

        if result.is_ok() {
            info!(patient_id, callback_id, "deleted callback");
        }
        self.audit(
            "callback.delete",
            Some(patient_id),
            None,
            json!({ "callbackId": callback_id }),
            &result,
        );
        result
    }

    // =========================================================================
    // Consultation & Journey Operations
    // =========================================================================

    /// Store a phone or visit consultation and apply its outcome.
    pub fn apply_consultation(
        &self,
        patient_id: &str,
        consultation: ConsultationResult,
        changed_by: Option<&str>,
    ) -> WorkflowResult<Patient> {
        let stage = consultation.stage;
        let result = self.db.update_patient_with(patient_id, |patient| {
            for (field, date) in [
                ("appointmentDate", consultation.appointment_date.as_deref()),
                ("callbackDate", consultation.callback_date.as_deref()),
            ] {
                if let Some(date) = date {
                    require_date(field, date)?;
                }
            }
            if consultation.original_amount < 0 {
                return Err(WorkflowError::InvalidInput("originalAmount must not be negative".into()));
            }

            let outcome = consultation.outcome();
            match stage {
                ConsultationStage::Phone => patient.phone_consultation = Some(consultation.clone()),
                ConsultationStage::Visit => patient.visit_consultation = Some(consultation.clone()),
            }
            let resolved = patient.resolved_amount();
            patient.estimated_amount = resolved;
            propagate(
                patient,
                &JourneyPatch {
                    estimated_amount: Some(resolved),
                    ..Default::default()
                },
            );

            Ok(apply_outcome(patient, stage, &outcome, changed_by)?.transitions)
        });

        let result = result.map(|(patient, transitions)| {
            self.after_transitions(&patient, &transitions);
            info!(patient_id = %patient.id, stage = ?stage, "applied consultation");
            patient
        });

        self.audit(
            "consultation.apply",
            Some(patient_id),
            changed_by,
            json!({ "stage": format!("{:?}", stage) }),
            &result,
        );
        result
    }

    /// Start a new consultation episode.
    pub fn open_journey(&self, patient_id: &str, request: NewJourney) -> WorkflowResult<(Patient, String)> {
        let result = (|| -> WorkflowResult<(Patient, String)> {
            if request.treatment_type.trim().is_empty() {
                return Err(WorkflowError::InvalidInput("treatmentType is required".into()));
            }
            if let Some(amount) = request.estimated_amount.filter(|a| *a < 0) {
                return Err(WorkflowError::InvalidInput(format!(
                    "estimatedAmount must not be negative: {}",
                    amount
                )));
            }
            self.db
                .update_patient_with(patient_id, |patient| Ok::<_, WorkflowError>(open_journey(patient, &request)))
        })();

        if let Ok((_, journey_id)) = &result {
            info!(patient_id, journey_id = %journey_id, "opened journey");
        }
        self.audit(
            "journey.open",
            Some(patient_id),
            request.changed_by.as_deref(),
            json!({ "treatmentType": request.treatment_type }),
            &result,
        );
        result
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Monthly statistics versus the prior month.
    pub fn compute_monthly_stats(&self, year: i32, month: u32) -> StatsResult<MonthlyReport> {
        let result = MonthlyStatsAggregator::new(self.db)
            .with_top_region_limit(self.config.top_region_limit)
            .compute(year, month);
        self.audit(
            "stats.monthly",
            None,
            None,
            json!({ "year": year, "month": month }),
            &result,
        );
        result
    }

    /// Revenue partition of the leads first contacted in `[from, to]`.
    pub fn classify_revenue(&self, from: &str, to: &str) -> StatsResult<RevenueAnalysis> {
        let result = date_range(from, to).and_then(|(start, end)| {
            let patients = self
                .db
                .list_patients_called_in(&dates::format_date(start), &dates::format_date(end))?;
            Ok(classify_revenue(&patients))
        });

        if let Ok(analysis) = &result {
            info!(from, to, patients = analysis.total_patients, "classified revenue");
        }
        self.audit("stats.revenue", None, None, json!({ "from": from, "to": to }), &result);
        result
    }

    // =========================================================================
    // Recall Operations
    // =========================================================================

    /// Create or replace the recall schedule of one treatment.
    pub fn upsert_recall_setting(&self, setting: RecallSetting) -> WorkflowResult<()> {
        let result = validate_recall_setting(&setting).and_then(|_| Ok(self.db.upsert_recall_setting(&setting)?));

        if result.is_ok() {
            info!(treatment = %setting.treatment, schedules = setting.schedules.len(), "saved recall setting");
        }
        self.audit(
            "recall.upsert_setting",
            None,
            None,
            json!({ "treatment": setting.treatment }),
            &result,
        );
        result
    }

    pub fn list_recall_messages(&self, patient_id: &str) -> WorkflowResult<Vec<RecallMessage>> {
        let result = self.db.list_recall_messages(patient_id).map_err(WorkflowError::from);
        self.audit("recall.list", Some(patient_id), None, Value::Null, &result);
        result
    }

    /// Recompute the audit hash chain.
    pub fn verify_audit_trail(&self) -> AuditResult<AuditVerification> {
        let result = AuditTrail::new(self.db).verify();
        if let Ok(verification) = &result {
            if verification.valid {
                info!(events = verification.event_count, "audit trail verified");
            } else {
                warn!(broken_at = ?verification.broken_at, "audit trail broken");
            }
        }
        self.audit("audit.verify", None, None, Value::Null, &result);
        result
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Post-commit effects of status changes: entering completed schedules
    /// recall messages. Failures are logged only.
    fn after_transitions(&self, patient: &Patient, transitions: &[StatusHistoryEntry]) {
        for entry in transitions.iter().filter(|e| e.to == PatientStatus::Completed) {
            if let Err(e) = schedule_recall_messages(
                self.db,
                patient,
                &entry.event_date,
                self.config.recall_send_hour,
                &self.config.default_patient_name,
            ) {
                warn!(patient_id = %patient.id, error = %e, "failed to schedule recall messages");
            }
        }
    }

    fn rename_call_logs(&self, patient: &Patient, previous_phone: &str) {
        match self.db.rename_call_log_patient(&patient.id, previous_phone, &patient.name) {
            Ok(renamed) => info!(patient_id = %patient.id, renamed, "renamed call logs"),
            Err(e) => warn!(patient_id = %patient.id, error = %e, "failed to rename call logs"),
        }
    }

    fn audit<T, E: Display>(
        &self,
        action: &str,
        target_id: Option<&str>,
        actor: Option<&str>,
        details: Value,
        result: &Result<T, E>,
    ) {
        let event = match result {
            Ok(_) => AuditEvent::new(action, target_id, AuditOutcome::Success).with_details(details),
            Err(e) => {
                let details = match details {
                    Value::Object(mut map) => {
                        map.insert("error".to_string(), Value::String(e.to_string()));
                        Value::Object(map)
                    }
                    _ => json!({ "error": e.to_string() }),
                };
                AuditEvent::new(action, target_id, AuditOutcome::Failure).with_details(details)
            }
        };
        record_audit(self.db, event.with_actor(actor));
    }
}

fn validate_recall_setting(setting: &RecallSetting) -> WorkflowResult<()> {
    if setting.treatment.trim().is_empty() {
        return Err(WorkflowError::InvalidInput("treatment is required".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for schedule in &setting.schedules {
        if schedule.timing.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("recall timing label is required".into()));
        }
        if schedule.timing_days < 0 {
            return Err(WorkflowError::InvalidInput(format!(
                "timingDays must not be negative: {}",
                schedule.timing_days
            )));
        }
        if !seen.insert(schedule.timing.as_str()) {
            return Err(WorkflowError::InvalidInput(format!(
                "duplicate recall timing: {}",
                schedule.timing
            )));
        }
    }
    Ok(())
}
