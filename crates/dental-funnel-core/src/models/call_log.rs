//! Telephony call-log records owned by the call-tracking integration.

use serde::{Deserialize, Serialize};

/// One phone call captured by the telephony integration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallLog {
    pub id: String,
    /// Linked patient, detached when the patient is deleted
    pub patient_id: Option<String>,
    pub phone: String,
    /// Display name shown in the call list
    pub patient_name: Option<String>,
    pub started_at: String,
    /// "inbound" or "outbound"
    pub direction: String,
    pub duration_secs: u32,
    pub summary: Option<String>,
    pub classification: Option<String>,
}

impl CallLog {
    pub fn new(phone: String, direction: String, started_at: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: None,
            phone,
            patient_name: None,
            started_at,
            direction,
            duration_secs: 0,
            summary: None,
            classification: None,
        }
    }
}
