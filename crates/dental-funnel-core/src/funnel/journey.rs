//! Journey mirroring.

use crate::models::{
    CallbackEntry, Journey, LeadStatus, Patient, PatientStatus, PaymentStatus, StatusHistoryEntry,
};

/// Patient-level changes to mirror into the active journey.
///
/// `None` leaves a field alone. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyPatch {
    pub status: Option<PatientStatus>,
    pub next_action_date: Option<Option<String>>,
    pub next_action_note: Option<Option<String>>,
    pub estimated_amount: Option<i64>,
    pub actual_amount: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub treatment_note: Option<Option<String>>,
    pub status_entries: Vec<StatusHistoryEntry>,
    pub callback_entries: Vec<CallbackEntry>,
    /// Entries replaced in place, matched by id
    pub callback_updates: Vec<CallbackEntry>,
    /// Ids of removed entries
    pub callback_removals: Vec<String>,
}

impl JourneyPatch {
    pub fn is_empty(&self) -> bool {
        *self == JourneyPatch::default()
    }
}

/// Apply `patch` to the patient's active journey. Returns false when the
/// patient has no active journey.
pub fn propagate(patient: &mut Patient, patch: &JourneyPatch) -> bool {
    let Some(journey) = patient.active_journey_mut() else {
        return false;
    };

    if let Some(status) = patch.status {
        journey.status = status;
        if status == PatientStatus::Closed {
            if journey.closed_at.is_none() {
                journey.closed_at = Some(chrono::Utc::now().to_rfc3339());
            }
        } else {
            journey.closed_at = None;
        }
    }
    if let Some(date) = &patch.next_action_date {
        journey.next_action_date = date.clone();
    }
    if let Some(note) = &patch.next_action_note {
        journey.next_action_note = note.clone();
    }
    if let Some(amount) = patch.estimated_amount {
        journey.estimated_amount = amount;
    }
    if let Some(amount) = patch.actual_amount {
        journey.actual_amount = amount;
    }
    if let Some(payment) = patch.payment_status {
        journey.payment_status = payment;
    }
    if let Some(note) = &patch.treatment_note {
        journey.treatment_note = note.clone();
    }

    journey.status_history.extend(patch.status_entries.iter().cloned());
    journey.callback_history.extend(patch.callback_entries.iter().cloned());
    for updated in &patch.callback_updates {
        if let Some(entry) = journey.callback_history.iter_mut().find(|e| e.id == updated.id) {
            *entry = updated.clone();
        }
    }
    journey
        .callback_history
        .retain(|e| !patch.callback_removals.contains(&e.id));

    true
}

/// Request to start a new consultation episode.
#[derive(Debug, Clone, Default)]
pub struct NewJourney {
    pub treatment_type: String,
    pub estimated_amount: Option<i64>,
    pub changed_by: Option<String>,
}

/// Start a new episode: deactivate every prior journey and reset the
/// patient to a fresh consultation for `treatment_type`.
pub fn open_journey(patient: &mut Patient, request: &NewJourney) -> String {
    let now = chrono::Utc::now().to_rfc3339();
    let today = crate::dates::today();

    for journey in &mut patient.journeys {
        journey.is_active = false;
    }

    let mut journey = Journey::new(Some(request.treatment_type.clone()), PatientStatus::Consulting);
    journey.estimated_amount = request.estimated_amount.unwrap_or(0);
    journey.status_history.push(StatusHistoryEntry {
        from: PatientStatus::Consulting,
        to: PatientStatus::Consulting,
        event_date: today.clone(),
        changed_at: now.clone(),
        changed_by: request.changed_by.clone(),
        reason: None,
    });
    let journey_id = journey.id.clone();

    if patient.status != PatientStatus::Consulting {
        patient.status_history.push(StatusHistoryEntry {
            from: patient.status,
            to: PatientStatus::Consulting,
            event_date: today,
            changed_at: now.clone(),
            changed_by: request.changed_by.clone(),
            reason: None,
        });
    }

    patient.status = PatientStatus::Consulting;
    patient.status_changed_at = Some(now);
    patient.next_action = None;
    patient.next_action_date = None;
    patient.estimated_amount = request.estimated_amount.unwrap_or(0);
    patient.actual_amount = 0;
    patient.payment_status = PaymentStatus::None;
    patient.treatment_note = None;
    patient.interest = Some(request.treatment_type.clone());

    // Consultation-stage tracking restarts with the episode.
    patient.lead_status = LeadStatus::Prospect;
    patient.visit_confirmed = false;
    patient.post_visit_status = None;
    patient.is_completed = false;
    patient.completed_reason = None;

    patient.journeys.push(journey);
    patient.active_journey_id = Some(journey_id.clone());
    journey_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallbackKind, RescheduleRecord};

    fn patient_with_journey() -> Patient {
        let mut patient = Patient::new("최유진".into(), "010-5555-6666".into());
        open_journey(
            &mut patient,
            &NewJourney {
                treatment_type: "임플란트".into(),
                estimated_amount: Some(3_000_000),
                changed_by: None,
            },
        );
        patient
    }

    #[test]
    fn test_propagate_without_journey() {
        let mut patient = Patient::new("최유진".into(), "010-5555-6666".into());
        let patch = JourneyPatch {
            status: Some(PatientStatus::Reserved),
            ..Default::default()
        };
        assert!(!propagate(&mut patient, &patch));
    }

    #[test]
    fn test_propagate_fields_and_closed_at() {
        let mut patient = patient_with_journey();
        let patch = JourneyPatch {
            status: Some(PatientStatus::Closed),
            next_action_date: Some(None),
            payment_status: Some(PaymentStatus::Partial),
            actual_amount: Some(1_000_000),
            ..Default::default()
        };
        assert!(propagate(&mut patient, &patch));

        let journey = patient.active_journey().unwrap();
        assert_eq!(journey.status, PatientStatus::Closed);
        assert!(journey.closed_at.is_some());
        assert_eq!(journey.payment_status, PaymentStatus::Partial);
        assert_eq!(journey.actual_amount, 1_000_000);
        assert_eq!(journey.estimated_amount, 3_000_000);
    }

    #[test]
    fn test_propagate_callback_updates_and_removals() {
        let mut patient = patient_with_journey();
        let entry = CallbackEntry::new(CallbackKind::Reschedule(RescheduleRecord {
            previous_date: "2024-04-01".into(),
            new_date: "2024-04-02".into(),
            reason: None,
            note: None,
        }));
        propagate(
            &mut patient,
            &JourneyPatch {
                callback_entries: vec![entry.clone()],
                ..Default::default()
            },
        );
        assert_eq!(patient.active_journey().unwrap().callback_history.len(), 1);

        propagate(
            &mut patient,
            &JourneyPatch {
                callback_removals: vec![entry.id.clone()],
                ..Default::default()
            },
        );
        assert!(patient.active_journey().unwrap().callback_history.is_empty());
    }

    #[test]
    fn test_open_journey_deactivates_previous() {
        let mut patient = patient_with_journey();
        let first_id = patient.active_journey_id.clone().unwrap();
        patient.status = PatientStatus::Completed;
        patient.visit_confirmed = true;

        let second_id = open_journey(
            &mut patient,
            &NewJourney {
                treatment_type: "교정".into(),
                estimated_amount: None,
                changed_by: Some("상담실장".into()),
            },
        );

        assert_ne!(first_id, second_id);
        assert_eq!(patient.journeys.iter().filter(|j| j.is_active).count(), 1);
        assert_eq!(patient.active_journey().unwrap().treatment_type.as_deref(), Some("교정"));
        assert_eq!(patient.status, PatientStatus::Consulting);
        assert_eq!(patient.interest.as_deref(), Some("교정"));
        assert!(!patient.visit_confirmed);
        assert_eq!(patient.status_history.last().unwrap().from, PatientStatus::Completed);
    }

    #[test]
    fn test_empty_patch() {
        assert!(JourneyPatch::default().is_empty());
    }
}
