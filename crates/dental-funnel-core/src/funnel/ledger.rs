//! Callback and reschedule ledger.

use super::{propagate, require_date, JourneyPatch, WorkflowError, WorkflowResult};
use crate::models::{
    CallbackAttempt, CallbackEntry, CallbackKind, CallbackResult, CallbackStage, Patient,
    RescheduleRecord,
};

/// Move the scheduled next action to a new date.
#[derive(Debug, Clone, PartialEq)]
pub struct Reschedule {
    pub new_date: String,
    pub reason: Option<String>,
    pub note: Option<String>,
}

/// A callback attempt to record.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    pub result: CallbackResult,
    pub notes: String,
    /// Defaults to today
    pub date: Option<String>,
    /// Defaults to the current time
    pub time: Option<String>,
    pub handled_by: Option<String>,
    /// Appointment or next callback date implied by the result
    pub next_date: Option<String>,
}

impl CallbackPayload {
    pub fn new(result: CallbackResult, notes: &str) -> Self {
        Self {
            result,
            notes: notes.to_string(),
            date: None,
            time: None,
            handled_by: None,
            next_date: None,
        }
    }
}

/// Edit of an existing attempt. The scheduled date/time never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackAmendment {
    pub result: Option<CallbackResult>,
    pub notes: Option<String>,
    /// Actual completion date, defaults to today
    pub completed_date: Option<String>,
    /// Actual completion time, defaults to the current time
    pub completed_time: Option<String>,
    pub handled_by: Option<String>,
}

/// Reschedule a reservation-type patient. The date being replaced is pushed
/// onto the callback ledger before it is overwritten.
pub fn reschedule(patient: &mut Patient, request: &Reschedule) -> WorkflowResult<Option<CallbackEntry>> {
    require_date("newDate", &request.new_date)?;
    if !patient.status.is_reservation() {
        return Err(WorkflowError::InvalidInput(format!(
            "cannot reschedule a patient in status {}",
            patient.status.as_str()
        )));
    }

    let recorded = patient.next_action_date.clone().map(|previous_date| {
        CallbackEntry::new(CallbackKind::Reschedule(RescheduleRecord {
            previous_date,
            new_date: request.new_date.clone(),
            reason: request.reason.clone(),
            note: request.note.clone(),
        }))
    });
    if let Some(entry) = &recorded {
        patient.callback_history.push(entry.clone());
    }

    patient.next_action_date = Some(request.new_date.clone());
    patient.next_action_note = request.note.clone();
    if patient.next_action.is_none() {
        patient.next_action = Some(patient.status.label().to_string());
    }

    propagate(
        patient,
        &JourneyPatch {
            next_action_date: Some(patient.next_action_date.clone()),
            next_action_note: Some(patient.next_action_note.clone()),
            callback_entries: recorded.iter().cloned().collect(),
            ..Default::default()
        },
    );

    Ok(recorded)
}

/// Append a callback attempt with the next attempt number.
pub fn record_attempt(patient: &mut Patient, payload: &CallbackPayload) -> WorkflowResult<CallbackEntry> {
    if let Some(date) = &payload.date {
        require_date("date", date)?;
    }
    if let Some(date) = &payload.next_date {
        require_date("nextDate", date)?;
    }

    // Never reuse a number, even for documents written before the counter existed.
    let highest = patient
        .callback_history
        .iter()
        .filter_map(|e| e.as_attempt().map(|a| a.attempt))
        .max()
        .unwrap_or(0);
    patient.attempt_counter = patient.attempt_counter.max(highest) + 1;

    let stage = if patient.visit_confirmed {
        CallbackStage::PostVisit
    } else {
        CallbackStage::PreVisit
    };

    let entry = CallbackEntry::new(CallbackKind::Attempt(CallbackAttempt {
        attempt: patient.attempt_counter,
        stage,
        date: payload.date.clone().unwrap_or_else(crate::dates::today),
        time: payload.time.clone().unwrap_or_else(crate::dates::now_hhmm),
        result: payload.result,
        notes: payload.notes.clone(),
        handled_by: payload.handled_by.clone(),
        completed_date: None,
        completed_time: None,
    }));
    patient.callback_history.push(entry.clone());

    propagate(
        patient,
        &JourneyPatch {
            callback_entries: vec![entry.clone()],
            ..Default::default()
        },
    );

    Ok(entry)
}

/// Update one attempt, keeping its scheduled date/time and recording the
/// actual completion separately.
pub fn amend_callback(
    patient: &mut Patient,
    callback_id: &str,
    amendment: &CallbackAmendment,
) -> WorkflowResult<CallbackEntry> {
    if let Some(date) = &amendment.completed_date {
        require_date("completedDate", date)?;
    }

    let entry = patient
        .callback_history
        .iter_mut()
        .find(|e| e.id == callback_id)
        .ok_or_else(|| WorkflowError::CallbackNotFound(callback_id.to_string()))?;

    let CallbackKind::Attempt(attempt) = &mut entry.entry else {
        return Err(WorkflowError::InvalidInput(format!(
            "callback {} is a reschedule record and cannot be amended",
            callback_id
        )));
    };

    if let Some(result) = amendment.result {
        attempt.result = result;
    }
    if let Some(notes) = &amendment.notes {
        attempt.notes = notes.clone();
    }
    if amendment.handled_by.is_some() {
        attempt.handled_by = amendment.handled_by.clone();
    }
    attempt.completed_date = Some(
        amendment
            .completed_date
            .clone()
            .unwrap_or_else(crate::dates::today),
    );
    attempt.completed_time = Some(
        amendment
            .completed_time
            .clone()
            .unwrap_or_else(crate::dates::now_hhmm),
    );

    let updated = entry.clone();
    propagate(
        patient,
        &JourneyPatch {
            callback_updates: vec![updated.clone()],
            ..Default::default()
        },
    );

    Ok(updated)
}

/// Remove one ledger entry. The attempt counter is left untouched.
pub fn delete_callback(patient: &mut Patient, callback_id: &str) -> WorkflowResult<CallbackEntry> {
    let index = patient
        .callback_history
        .iter()
        .position(|e| e.id == callback_id)
        .ok_or_else(|| WorkflowError::CallbackNotFound(callback_id.to_string()))?;
    let removed = patient.callback_history.remove(index);

    propagate(
        patient,
        &JourneyPatch {
            callback_removals: vec![removed.id.clone()],
            ..Default::default()
        },
    );

    Ok(removed)
}
