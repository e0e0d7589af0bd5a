//! Per-patient consultation narrative for the monthly report.

use serde::{Deserialize, Serialize};

use crate::models::{CallbackResult, CallbackStage, Patient, PatientStatus};

const EMPTY_NARRATIVE: &str = "상담내용 없음";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeLine {
    pub date: String,
    pub time: String,
    pub stage: CallbackStage,
    pub attempt: u32,
    pub result: CallbackResult,
    pub notes: String,
}

impl NarrativeLine {
    fn render(&self) -> String {
        let head = format!(
            "[{} {}] {} {}차 - {}",
            self.date,
            self.time,
            self.stage.label(),
            self.attempt,
            self.result.label()
        );
        match self.notes.trim() {
            "" => head,
            notes => format!("{}: {}", head, notes),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientNarrative {
    pub patient_id: String,
    pub name: String,
    pub status: PatientStatus,
    pub status_label: String,
    pub interest: Option<String>,
    pub amount: i64,
    pub next_action_date: Option<String>,
    pub lines: Vec<NarrativeLine>,
    /// Rendered lines, one per attempt
    pub text: String,
}

/// Merge phone-stage and visit-stage callback attempts into one
/// chronological narrative.
pub fn build_narrative(patient: &Patient) -> PatientNarrative {
    let mut lines: Vec<NarrativeLine> = patient
        .callback_history
        .iter()
        .filter_map(|entry| entry.as_attempt())
        .map(|attempt| NarrativeLine {
            date: attempt.date.clone(),
            time: attempt.time.clone(),
            stage: attempt.stage,
            attempt: attempt.attempt,
            result: attempt.result,
            notes: attempt.notes.clone(),
        })
        .collect();
    lines.sort_by(|a, b| {
        (a.date.as_str(), a.time.as_str(), a.attempt).cmp(&(b.date.as_str(), b.time.as_str(), b.attempt))
    });

    let text = if lines.is_empty() {
        EMPTY_NARRATIVE.to_string()
    } else {
        lines.iter().map(NarrativeLine::render).collect::<Vec<_>>().join("\n")
    };

    let next_action_date = patient
        .active_journey()
        .and_then(|j| j.next_action_date.clone())
        .or_else(|| patient.next_action_date.clone());

    PatientNarrative {
        patient_id: patient.id.clone(),
        name: patient.name.clone(),
        status: patient.status,
        status_label: patient.status.label().to_string(),
        interest: patient.recall_treatment(),
        amount: patient.resolved_amount(),
        next_action_date,
        lines,
        text,
    }
}
