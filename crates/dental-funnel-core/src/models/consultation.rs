//! Consultation results and the outcomes they lead to.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Where the consultation took place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStage {
    /// Phone intake, before any visit
    Phone,
    /// In-clinic consultation after the visit
    Visit,
}

impl FromStr for ConsultationStage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(ConsultationStage::Phone),
            "visit" => Ok(ConsultationStage::Visit),
            _ => Err(UnknownVariant::new("consultation stage", s)),
        }
    }
}

/// Did the lead agree to the proposed treatment?
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgreementStatus {
    Agreed,
    Disagreed,
    Pending,
}

impl FromStr for AgreementStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreed" => Ok(AgreementStatus::Agreed),
            "disagreed" => Ok(AgreementStatus::Disagreed),
            "pending" => Ok(AgreementStatus::Pending),
            _ => Err(UnknownVariant::new("agreement status", s)),
        }
    }
}

/// Result of one phone or visit consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationResult {
    pub stage: ConsultationStage,
    pub status: AgreementStatus,
    pub treatment: Option<String>,
    /// Regular price (visit) or quoted estimate (phone)
    pub original_amount: i64,
    /// Discount in percent, 0-100
    #[serde(default)]
    pub discount_rate: u32,
    /// Explicit price after discount, overrides `discount_rate` when set
    pub discount_amount: Option<i64>,
    #[serde(default)]
    pub disagree_reasons: Vec<String>,
    pub correction_plan: Option<String>,
    pub appointment_date: Option<String>,
    pub callback_date: Option<String>,
    pub memo: Option<String>,
    pub recorded_at: String,
}

impl ConsultationResult {
    pub fn new(stage: ConsultationStage, status: AgreementStatus) -> Self {
        Self {
            stage,
            status,
            treatment: None,
            original_amount: 0,
            discount_rate: 0,
            discount_amount: None,
            disagree_reasons: Vec::new(),
            correction_plan: None,
            appointment_date: None,
            callback_date: None,
            memo: None,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Price after discount, 0 when no discount applies.
    pub fn discount_price(&self) -> i64 {
        match self.discount_amount {
            Some(amount) if amount > 0 => amount,
            _ if self.discount_rate > 0 && self.discount_rate <= 100 => {
                self.original_amount * i64::from(100 - self.discount_rate) / 100
            }
            _ => 0,
        }
    }

    /// Discounted price if any, otherwise the original amount.
    pub fn estimate(&self) -> i64 {
        match self.discount_price() {
            0 => self.original_amount,
            price => price,
        }
    }

    /// Outcome implied by this consultation.
    pub fn outcome(&self) -> ConsultationOutcome {
        match self.status {
            AgreementStatus::Agreed => ConsultationOutcome::ReservationMade {
                appointment_date: self.appointment_date.clone(),
                treatment: self.treatment.clone(),
            },
            AgreementStatus::Disagreed | AgreementStatus::Pending => {
                ConsultationOutcome::CallbackNeeded {
                    callback_date: self.callback_date.clone(),
                    reasons: self.disagree_reasons.clone(),
                    correction_plan: self.correction_plan.clone(),
                    reservation_cancelled: false,
                }
            }
        }
    }
}

/// What a consultation or callback concluded. Each variant carries only the
/// fields relevant to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsultationOutcome {
    /// Visit (phone stage) or treatment (visit stage) booked
    ReservationMade {
        appointment_date: Option<String>,
        treatment: Option<String>,
    },
    /// Lead needs another call
    CallbackNeeded {
        callback_date: Option<String>,
        reasons: Vec<String>,
        correction_plan: Option<String>,
        reservation_cancelled: bool,
    },
    /// Call not answered
    NoAnswer { callback_date: Option<String> },
    /// Lead lost
    Closed { reason: Option<String> },
    /// Existing reservation moved to a new date
    ReReserved { appointment_date: String },
}
