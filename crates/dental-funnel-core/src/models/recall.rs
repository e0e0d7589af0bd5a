//! Recall schedule and message models.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// One row of a treatment's recall schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecallSchedule {
    /// Timing label, e.g. "1주 후"; unique within a treatment
    pub timing: String,
    /// Days after completion
    pub timing_days: i64,
    /// Template with {환자명} / {이름} placeholders
    pub message: String,
    pub enabled: bool,
}

/// Recall table entry for one treatment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecallSetting {
    pub treatment: String,
    pub schedules: Vec<RecallSchedule>,
    pub created_at: String,
    pub updated_at: String,
}

impl RecallSetting {
    pub fn new(treatment: String, schedules: Vec<RecallSchedule>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            treatment,
            schedules,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn enabled_schedules(&self) -> impl Iterator<Item = &RecallSchedule> {
        self.schedules.iter().filter(|s| s.enabled)
    }
}

/// Delivery state of a recall message. Delivery itself happens elsewhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecallMessageStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl RecallMessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecallMessageStatus::Pending => "pending",
            RecallMessageStatus::Sent => "sent",
            RecallMessageStatus::Failed => "failed",
            RecallMessageStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RecallMessageStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecallMessageStatus::Pending),
            "sent" => Ok(RecallMessageStatus::Sent),
            "failed" => Ok(RecallMessageStatus::Failed),
            "cancelled" => Ok(RecallMessageStatus::Cancelled),
            _ => Err(UnknownVariant::new("recall message status", s)),
        }
    }
}

/// A scheduled post-treatment outreach item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecallMessage {
    pub id: String,
    pub patient_id: String,
    pub treatment: String,
    pub timing: String,
    pub timing_days: i64,
    /// Personalized message text
    pub message: String,
    pub status: RecallMessageStatus,
    /// Planned send time (local, YYYY-MM-DDTHH:MM:SS)
    pub scheduled_at: String,
    /// Completion date the schedule was computed from
    pub last_visit: String,
    pub created_at: String,
}
