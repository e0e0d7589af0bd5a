//! Journey models: one consultation episode per treatment cycle.

use serde::{Deserialize, Serialize};

use super::callback::CallbackEntry;
use super::patient::{PatientStatus, PaymentStatus, StatusHistoryEntry};

/// Mirrored sub-record tracking one consultation episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Journey {
    pub id: String,
    pub treatment_type: Option<String>,
    pub status: PatientStatus,
    pub next_action_date: Option<String>,
    pub next_action_note: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub callback_history: Vec<CallbackEntry>,
    #[serde(default)]
    pub estimated_amount: i64,
    #[serde(default)]
    pub actual_amount: i64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub treatment_note: Option<String>,
    pub is_active: bool,
    pub started_at: String,
    pub closed_at: Option<String>,
}

impl Journey {
    /// Start a new episode at the given status.
    pub fn new(treatment_type: Option<String>, status: PatientStatus) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            treatment_type,
            status,
            next_action_date: None,
            next_action_note: None,
            status_history: Vec::new(),
            callback_history: Vec::new(),
            estimated_amount: 0,
            actual_amount: 0,
            payment_status: PaymentStatus::None,
            treatment_note: None,
            is_active: true,
            started_at: chrono::Utc::now().to_rfc3339(),
            closed_at: None,
        }
    }
}
