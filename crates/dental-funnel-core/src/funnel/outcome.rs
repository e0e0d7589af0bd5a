//! Consultation outcome updater.
//!
//! Phone-stage results, post-reservation changes and callback follow-ups all
//! reduce to one [`ConsultationOutcome`], applied here by a single match.

use super::{apply_transition, require_date, reschedule, CallbackPayload, Reschedule, StatusChange};
use super::{WorkflowError, WorkflowResult};
use crate::models::{
    CallbackResult, CallbackStage, ConsultationOutcome, ConsultationStage, LeadStatus, Patient,
    PatientStatus, PostVisitStatus, StatusHistoryEntry,
};

/// Status changes caused by applying an outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeEffect {
    pub transitions: Vec<StatusHistoryEntry>,
    pub rescheduled: bool,
}

impl OutcomeEffect {
    fn transition(&mut self, patient: &mut Patient, change: StatusChange) -> WorkflowResult<()> {
        if let Some(entry) = apply_transition(patient, &change)? {
            self.transitions.push(entry);
        }
        Ok(())
    }

    /// Move an existing reservation, or book one at `date`.
    fn book(
        &mut self,
        patient: &mut Patient,
        target: PatientStatus,
        date: &str,
        changed_by: Option<&str>,
    ) -> WorkflowResult<()> {
        if patient.status == target {
            if patient.next_action_date.as_deref() != Some(date) {
                reschedule(
                    patient,
                    &Reschedule {
                        new_date: date.to_string(),
                        reason: Some("재예약".to_string()),
                        note: None,
                    },
                )?;
                self.rescheduled = true;
            }
            Ok(())
        } else {
            self.transition(patient, StatusChange::to(target).on(date).by(changed_by))
        }
    }
}

/// Map a callback result onto the outcome it implies. `Completed` implies none.
pub fn outcome_for_callback(payload: &CallbackPayload) -> WorkflowResult<Option<ConsultationOutcome>> {
    let next_date = payload.next_date.clone();
    let callback_needed = |reservation_cancelled: bool| ConsultationOutcome::CallbackNeeded {
        callback_date: next_date.clone(),
        reasons: Vec::new(),
        correction_plan: None,
        reservation_cancelled,
    };

    let outcome = match payload.result {
        CallbackResult::Completed => return Ok(None),
        CallbackResult::NoAnswer => ConsultationOutcome::NoAnswer {
            callback_date: next_date.clone(),
        },
        CallbackResult::CallbackRequested | CallbackResult::OnHold => callback_needed(false),
        CallbackResult::ReservationCancelled => callback_needed(true),
        CallbackResult::ReservationConfirmed => {
            let date = next_date.clone().ok_or_else(|| {
                WorkflowError::InvalidInput("예약확정 requires an appointment date".into())
            })?;
            ConsultationOutcome::ReservationMade {
                appointment_date: Some(date),
                treatment: None,
            }
        }
        CallbackResult::TreatmentAgreed => ConsultationOutcome::ReservationMade {
            appointment_date: next_date.clone(),
            treatment: None,
        },
        CallbackResult::TreatmentRefused => ConsultationOutcome::Closed {
            reason: Some(if payload.notes.trim().is_empty() {
                CallbackResult::TreatmentRefused.label().to_string()
            } else {
                payload.notes.clone()
            }),
        },
    };
    Ok(Some(outcome))
}

/// Consultation stage a callback belongs to.
pub fn stage_of(stage: CallbackStage) -> ConsultationStage {
    match stage {
        CallbackStage::PreVisit => ConsultationStage::Phone,
        CallbackStage::PostVisit => ConsultationStage::Visit,
    }
}

/// Apply a consultation outcome: update the stage status and perform the
/// implied status transition or reschedule.
pub fn apply_outcome(
    patient: &mut Patient,
    stage: ConsultationStage,
    outcome: &ConsultationOutcome,
    changed_by: Option<&str>,
) -> WorkflowResult<OutcomeEffect> {
    let mut effect = OutcomeEffect::default();

    if stage == ConsultationStage::Visit && !patient.status.is_at_least(PatientStatus::Visited) {
        if patient.status == PatientStatus::Closed {
            return Err(WorkflowError::InvalidInput(
                "visit consultation on a closed patient".into(),
            ));
        }
        effect.transition(patient, StatusChange::to(PatientStatus::Visited).by(changed_by))?;
    }

    match (stage, outcome) {
        (
            ConsultationStage::Phone,
            ConsultationOutcome::ReservationMade {
                appointment_date, ..
            },
        ) => {
            let date = appointment_date.as_deref().ok_or_else(|| {
                WorkflowError::InvalidInput("reservation requires an appointment date".into())
            })?;
            require_date("appointmentDate", date)?;
            patient.lead_status = LeadStatus::Reserved;
            patient.next_callback_date = None;
            effect.book(patient, PatientStatus::Reserved, date, changed_by)?;
        }
        (ConsultationStage::Visit, ConsultationOutcome::ReservationMade { appointment_date, .. }) => {
            patient.post_visit_status = Some(PostVisitStatus::TreatmentAgreed);
            patient.next_callback_date = None;
            if let Some(date) = appointment_date.as_deref() {
                require_date("appointmentDate", date)?;
                effect.book(patient, PatientStatus::TreatmentBooked, date, changed_by)?;
            }
        }
        (
            stage,
            ConsultationOutcome::CallbackNeeded {
                callback_date,
                reservation_cancelled,
                ..
            },
        ) => {
            if let Some(date) = callback_date {
                require_date("callbackDate", date)?;
            }
            patient.next_callback_date = callback_date.clone();
            let (booked, fallback) = match stage {
                ConsultationStage::Phone => {
                    patient.lead_status = LeadStatus::CallbackNeeded;
                    (PatientStatus::Reserved, PatientStatus::Consulting)
                }
                ConsultationStage::Visit => {
                    patient.post_visit_status = Some(PostVisitStatus::RecallNeeded);
                    (PatientStatus::TreatmentBooked, PatientStatus::Visited)
                }
            };
            if *reservation_cancelled && patient.status == booked {
                effect.transition(patient, StatusChange::to(fallback).by(changed_by))?;
            }
        }
        (stage, ConsultationOutcome::NoAnswer { callback_date }) => {
            if let Some(date) = callback_date {
                require_date("callbackDate", date)?;
            }
            patient.next_callback_date = callback_date.clone();
            match stage {
                ConsultationStage::Phone => patient.lead_status = LeadStatus::NoAnswer,
                ConsultationStage::Visit => {
                    if patient.post_visit_status.is_none() {
                        patient.post_visit_status = Some(PostVisitStatus::RecallNeeded);
                    }
                }
            }
        }
        (stage, ConsultationOutcome::Closed { reason }) => {
            match stage {
                ConsultationStage::Phone => patient.lead_status = LeadStatus::Closed,
                ConsultationStage::Visit => patient.post_visit_status = Some(PostVisitStatus::Closed),
            }
            patient.next_callback_date = None;
            effect.transition(
                patient,
                StatusChange::to(PatientStatus::Closed)
                    .closed_because(reason.as_deref())
                    .by(changed_by),
            )?;
        }
        (stage, ConsultationOutcome::ReReserved { appointment_date }) => {
            require_date("appointmentDate", appointment_date)?;
            let target = match stage {
                ConsultationStage::Phone => {
                    patient.lead_status = LeadStatus::ReReserved;
                    PatientStatus::Reserved
                }
                ConsultationStage::Visit => PatientStatus::TreatmentBooked,
            };
            if patient.status.is_reservation() {
                reschedule(
                    patient,
                    &Reschedule {
                        new_date: appointment_date.clone(),
                        reason: Some("재예약".to_string()),
                        note: None,
                    },
                )?;
                effect.rescheduled = true;
            } else {
                effect.transition(patient, StatusChange::to(target).on(appointment_date).by(changed_by))?;
            }
        }
    }

    Ok(effect)
}
