//! Status transition engine.

use tracing::debug;

use super::{propagate, require_date, JourneyPatch, WorkflowResult};
use crate::models::{LeadStatus, Patient, PatientStatus, PostVisitStatus, StatusHistoryEntry};

/// A requested funnel status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub target: PatientStatus,
    /// Business date of the change, defaults to today
    pub event_date: Option<String>,
    /// Closing reason, only used for transitions into closed
    pub closed_reason: Option<String>,
    pub is_reactivation: bool,
    pub changed_by: Option<String>,
}

impl StatusChange {
    pub fn to(target: PatientStatus) -> Self {
        Self {
            target,
            event_date: None,
            closed_reason: None,
            is_reactivation: false,
            changed_by: None,
        }
    }

    pub fn on(mut self, event_date: &str) -> Self {
        self.event_date = Some(event_date.to_string());
        self
    }

    pub fn by(mut self, changed_by: Option<&str>) -> Self {
        self.changed_by = changed_by.map(str::to_string);
        self
    }

    pub fn closed_because(mut self, reason: Option<&str>) -> Self {
        self.closed_reason = reason.map(str::to_string);
        self
    }
}

/// Apply a status change and its side effects. Returns the appended history
/// entry, or `None` when the patient is already in the target status.
pub fn apply_transition(
    patient: &mut Patient,
    change: &StatusChange,
) -> WorkflowResult<Option<StatusHistoryEntry>> {
    let from = patient.status;
    let target = change.target;

    if target == from {
        debug!(patient_id = %patient.id, status = target.as_str(), "transition is a no-op");
        return Ok(None);
    }

    let event_date = match &change.event_date {
        Some(date) => {
            require_date("eventDate", date)?;
            date.clone()
        }
        None => crate::dates::today(),
    };
    let reactivating = from == PatientStatus::Closed || change.is_reactivation;
    let now = chrono::Utc::now().to_rfc3339();

    match target {
        PatientStatus::Closed => {
            patient.next_action = None;
            patient.next_action_date = None;
            patient.is_completed = true;
            patient.completed_reason = change.closed_reason.clone();
            if patient.visit_confirmed {
                patient.post_visit_status = Some(PostVisitStatus::Closed);
            } else {
                patient.lead_status = LeadStatus::Closed;
            }
        }
        PatientStatus::Reserved | PatientStatus::TreatmentBooked => {
            patient.next_action = Some(target.label().to_string());
            patient.next_action_date = Some(event_date.clone());
        }
        PatientStatus::Consulting
        | PatientStatus::Visited
        | PatientStatus::Treatment
        | PatientStatus::Completed
        | PatientStatus::Followup => {
            patient.next_action = None;
            patient.next_action_date = None;
        }
    }

    if reactivating && target != PatientStatus::Closed {
        patient.is_completed = false;
        patient.completed_reason = None;
        if patient.lead_status == LeadStatus::Closed {
            patient.lead_status = LeadStatus::Prospect;
        }
        if patient.post_visit_status == Some(PostVisitStatus::Closed) {
            patient.post_visit_status = None;
        }
    }

    // Consultation-stage flags follow funnel progress.
    if target == PatientStatus::Reserved && patient.lead_status != LeadStatus::ReReserved {
        patient.lead_status = LeadStatus::Reserved;
    }
    if target.is_at_least(PatientStatus::Visited) {
        patient.visit_confirmed = true;
    }
    match target {
        PatientStatus::TreatmentBooked
            if patient.post_visit_status != Some(PostVisitStatus::TreatmentStarted) =>
        {
            patient.post_visit_status = Some(PostVisitStatus::TreatmentAgreed);
        }
        PatientStatus::Treatment | PatientStatus::Completed | PatientStatus::Followup => {
            patient.post_visit_status = Some(PostVisitStatus::TreatmentStarted);
        }
        _ => {}
    }

    if target == PatientStatus::Treatment && patient.treatment_start_date.is_none() {
        patient.treatment_start_date = Some(event_date.clone());
    }

    let entry = StatusHistoryEntry {
        from,
        to: target,
        event_date,
        changed_at: now.clone(),
        changed_by: change.changed_by.clone(),
        reason: if target == PatientStatus::Closed {
            change.closed_reason.clone()
        } else {
            None
        },
    };

    patient.status = target;
    patient.status_changed_at = Some(now);
    patient.status_history.push(entry.clone());

    propagate(
        patient,
        &JourneyPatch {
            status: Some(target),
            next_action_date: Some(patient.next_action_date.clone()),
            status_entries: vec![entry.clone()],
            ..Default::default()
        },
    );

    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::{open_journey, NewJourney, WorkflowError};

    fn patient() -> Patient {
        Patient::new("김민수".into(), "010-1234-5678".into())
    }

    #[test]
    fn test_noop_when_same_status() {
        let mut p = patient();
        let result = apply_transition(&mut p, &StatusChange::to(PatientStatus::Consulting)).unwrap();
        assert!(result.is_none());
        assert!(p.status_history.is_empty());
    }

    #[test]
    fn test_reservation_sets_next_action() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("2024-03-05"))
            .unwrap();
        assert_eq!(p.next_action_date.as_deref(), Some("2024-03-05"));
        assert_eq!(p.next_action.as_deref(), Some("내원예약"));
        assert_eq!(p.lead_status, LeadStatus::Reserved);
        assert_eq!(p.status_history.len(), 1);
        assert_eq!(p.status_history[0].event_date, "2024-03-05");
    }

    #[test]
    fn test_progression_clears_next_action() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("2024-03-05"))
            .unwrap();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Visited).on("2024-03-05"))
            .unwrap();
        assert!(p.next_action_date.is_none());
        assert!(p.next_action.is_none());
        assert!(p.visit_confirmed);
    }

    #[test]
    fn test_treatment_start_date_set_once() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Treatment).on("2024-03-10"))
            .unwrap();
        assert_eq!(p.treatment_start_date.as_deref(), Some("2024-03-10"));
        assert_eq!(p.post_visit_status, Some(PostVisitStatus::TreatmentStarted));

        apply_transition(&mut p, &StatusChange::to(PatientStatus::TreatmentBooked).on("2024-03-20"))
            .unwrap();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Treatment).on("2024-03-20"))
            .unwrap();
        assert_eq!(p.treatment_start_date.as_deref(), Some("2024-03-10"));
    }

    #[test]
    fn test_close_records_reason() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("2024-03-05"))
            .unwrap();
        let entry = apply_transition(
            &mut p,
            &StatusChange::to(PatientStatus::Closed).closed_because(Some("가격 부담")),
        )
        .unwrap()
        .unwrap();
        assert_eq!(entry.reason.as_deref(), Some("가격 부담"));
        assert!(p.next_action_date.is_none());
        assert!(p.is_completed);
        assert_eq!(p.lead_status, LeadStatus::Closed);
    }

    #[test]
    fn test_close_after_visit_marks_post_visit_closed() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Visited)).unwrap();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Closed)).unwrap();
        assert_eq!(p.post_visit_status, Some(PostVisitStatus::Closed));
    }

    #[test]
    fn test_reactivation_clears_completed() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Closed)).unwrap();

        let mut change = StatusChange::to(PatientStatus::Consulting);
        change.is_reactivation = true;
        apply_transition(&mut p, &change).unwrap();

        assert!(!p.is_completed);
        assert!(p.completed_reason.is_none());
        assert_eq!(p.lead_status, LeadStatus::Prospect);
        assert!(p.next_action_date.is_none());
    }

    #[test]
    fn test_reactivation_into_reservation_keeps_date() {
        let mut p = patient();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Closed)).unwrap();
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("2024-06-01"))
            .unwrap();
        assert_eq!(p.next_action_date.as_deref(), Some("2024-06-01"));
        assert!(!p.is_completed);
    }

    #[test]
    fn test_invalid_event_date() {
        let mut p = patient();
        let err = apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("next week"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
        assert_eq!(p.status, PatientStatus::Consulting);
    }

    #[test]
    fn test_transition_mirrors_into_journey() {
        let mut p = patient();
        open_journey(
            &mut p,
            &NewJourney {
                treatment_type: "임플란트".into(),
                ..Default::default()
            },
        );
        apply_transition(&mut p, &StatusChange::to(PatientStatus::Reserved).on("2024-03-05"))
            .unwrap();

        let journey = p.active_journey().unwrap();
        assert_eq!(journey.status, PatientStatus::Reserved);
        assert_eq!(journey.next_action_date.as_deref(), Some("2024-03-05"));
        assert_eq!(journey.status_history.last(), p.status_history.last());
    }
}
