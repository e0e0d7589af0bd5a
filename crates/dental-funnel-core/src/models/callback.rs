//! Callback ledger entries.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Outcome of one callback attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallbackResult {
    #[serde(rename = "완료")]
    Completed,
    #[serde(rename = "부재중")]
    NoAnswer,
    #[serde(rename = "콜백재요청")]
    CallbackRequested,
    #[serde(rename = "예약확정")]
    ReservationConfirmed,
    #[serde(rename = "예약취소")]
    ReservationCancelled,
    #[serde(rename = "보류")]
    OnHold,
    #[serde(rename = "치료동의")]
    TreatmentAgreed,
    #[serde(rename = "치료거부")]
    TreatmentRefused,
}

impl CallbackResult {
    pub fn label(&self) -> &'static str {
        match self {
            CallbackResult::Completed => "완료",
            CallbackResult::NoAnswer => "부재중",
            CallbackResult::CallbackRequested => "콜백재요청",
            CallbackResult::ReservationConfirmed => "예약확정",
            CallbackResult::ReservationCancelled => "예약취소",
            CallbackResult::OnHold => "보류",
            CallbackResult::TreatmentAgreed => "치료동의",
            CallbackResult::TreatmentRefused => "치료거부",
        }
    }
}

impl FromStr for CallbackResult {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "완료" => Ok(CallbackResult::Completed),
            "부재중" => Ok(CallbackResult::NoAnswer),
            "콜백재요청" => Ok(CallbackResult::CallbackRequested),
            "예약확정" => Ok(CallbackResult::ReservationConfirmed),
            "예약취소" => Ok(CallbackResult::ReservationCancelled),
            "보류" => Ok(CallbackResult::OnHold),
            "치료동의" => Ok(CallbackResult::TreatmentAgreed),
            "치료거부" => Ok(CallbackResult::TreatmentRefused),
            _ => Err(UnknownVariant::new("callback result", s)),
        }
    }
}

/// Whether a callback happened before or after the clinic visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CallbackStage {
    PreVisit,
    PostVisit,
}

impl CallbackStage {
    pub fn label(&self) -> &'static str {
        match self {
            CallbackStage::PreVisit => "전화상담",
            CallbackStage::PostVisit => "내원상담",
        }
    }
}

/// A recorded contact attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackAttempt {
    /// Attempt number, never reused for the same patient
    pub attempt: u32,
    pub stage: CallbackStage,
    /// Scheduled/recorded date (YYYY-MM-DD)
    pub date: String,
    /// Scheduled/recorded time (HH:MM)
    pub time: String,
    pub result: CallbackResult,
    #[serde(default)]
    pub notes: String,
    pub handled_by: Option<String>,
    /// Actual completion date when amended later
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
}

/// A schedule change, recording the date that was replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RescheduleRecord {
    pub previous_date: String,
    pub new_date: String,
    pub reason: Option<String>,
    pub note: Option<String>,
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackKind {
    Attempt(CallbackAttempt),
    Reschedule(RescheduleRecord),
}

/// One entry of a patient's callback ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackEntry {
    pub id: String,
    pub recorded_at: String,
    pub entry: CallbackKind,
}

impl CallbackEntry {
    pub fn new(entry: CallbackKind) -> Self {
        Self {
            id: format!("cb-{}", uuid::Uuid::new_v4()),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            entry,
        }
    }

    pub fn as_attempt(&self) -> Option<&CallbackAttempt> {
        match &self.entry {
            CallbackKind::Attempt(attempt) => Some(attempt),
            CallbackKind::Reschedule(_) => None,
        }
    }

    pub fn as_reschedule(&self) -> Option<&RescheduleRecord> {
        match &self.entry {
            CallbackKind::Reschedule(record) => Some(record),
            CallbackKind::Attempt(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_labels_parse_back() {
        let all = [
            CallbackResult::Completed,
            CallbackResult::NoAnswer,
            CallbackResult::CallbackRequested,
            CallbackResult::ReservationConfirmed,
            CallbackResult::ReservationCancelled,
            CallbackResult::OnHold,
            CallbackResult::TreatmentAgreed,
            CallbackResult::TreatmentRefused,
        ];
        for result in all {
            assert_eq!(result.label().parse::<CallbackResult>().unwrap(), result);
        }
        assert!("통화완료".parse::<CallbackResult>().is_err());
    }

    #[test]
    fn test_entry_json_is_tagged() {
        let entry = CallbackEntry::new(CallbackKind::Reschedule(RescheduleRecord {
            previous_date: "2024-04-01".into(),
            new_date: "2024-04-03".into(),
            reason: Some("환자 요청".into()),
            note: None,
        }));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"reschedule\""));
        assert!(entry.id.starts_with("cb-"));

        let back: CallbackEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_reschedule().unwrap().previous_date, "2024-04-01");
    }
}
