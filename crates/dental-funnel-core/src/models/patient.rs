//! Patient models.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::callback::CallbackEntry;
use super::consultation::ConsultationResult;
use super::journey::Journey;
use super::UnknownVariant;

/// Coarse funnel stage a patient currently occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PatientStatus {
    /// Phone consultation in progress
    Consulting,
    /// Visit booked
    Reserved,
    /// Visited the clinic
    Visited,
    /// Treatment booked after the visit
    TreatmentBooked,
    /// Treatment in progress
    Treatment,
    /// Treatment completed
    Completed,
    /// Post-treatment follow-up
    Followup,
    /// Closed at any point of the funnel
    Closed,
}

impl PatientStatus {
    /// Funnel stages in progression order (closed is outside the order).
    pub const FUNNEL_ORDER: [PatientStatus; 7] = [
        PatientStatus::Consulting,
        PatientStatus::Reserved,
        PatientStatus::Visited,
        PatientStatus::TreatmentBooked,
        PatientStatus::Treatment,
        PatientStatus::Completed,
        PatientStatus::Followup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Consulting => "consulting",
            PatientStatus::Reserved => "reserved",
            PatientStatus::Visited => "visited",
            PatientStatus::TreatmentBooked => "treatmentBooked",
            PatientStatus::Treatment => "treatment",
            PatientStatus::Completed => "completed",
            PatientStatus::Followup => "followup",
            PatientStatus::Closed => "closed",
        }
    }

    /// Display label, also used as the `next_action` text of reservations.
    pub fn label(&self) -> &'static str {
        match self {
            PatientStatus::Consulting => "전화상담",
            PatientStatus::Reserved => "내원예약",
            PatientStatus::Visited => "내원완료",
            PatientStatus::TreatmentBooked => "치료예약",
            PatientStatus::Treatment => "치료중",
            PatientStatus::Completed => "치료완료",
            PatientStatus::Followup => "사후관리",
            PatientStatus::Closed => "종결",
        }
    }

    /// Reservation-type statuses carry a scheduled `next_action_date`.
    pub fn is_reservation(&self) -> bool {
        matches!(self, PatientStatus::Reserved | PatientStatus::TreatmentBooked)
    }

    /// Position in [`Self::FUNNEL_ORDER`], `None` for closed.
    pub fn funnel_rank(&self) -> Option<usize> {
        Self::FUNNEL_ORDER.iter().position(|s| s == self)
    }

    /// True when this stage is at or beyond `other` in the funnel.
    pub fn is_at_least(&self, other: PatientStatus) -> bool {
        match (self.funnel_rank(), other.funnel_rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl FromStr for PatientStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consulting" => Ok(PatientStatus::Consulting),
            "reserved" => Ok(PatientStatus::Reserved),
            "visited" => Ok(PatientStatus::Visited),
            "treatmentBooked" => Ok(PatientStatus::TreatmentBooked),
            "treatment" => Ok(PatientStatus::Treatment),
            "completed" => Ok(PatientStatus::Completed),
            "followup" => Ok(PatientStatus::Followup),
            "closed" => Ok(PatientStatus::Closed),
            _ => Err(UnknownVariant::new("patient status", s)),
        }
    }
}

/// Lead temperature assigned by the counselor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Temperature {
    Hot,
    #[default]
    Warm,
    Cold,
}

impl FromStr for Temperature {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Temperature::Hot),
            "warm" => Ok(Temperature::Warm),
            "cold" => Ok(Temperature::Cold),
            _ => Err(UnknownVariant::new("temperature", s)),
        }
    }
}

/// Payment progress for the agreed treatment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    None,
    Partial,
    Completed,
}

impl PaymentStatus {
    /// Any money received.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Partial | PaymentStatus::Completed)
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PaymentStatus::None),
            "partial" => Ok(PaymentStatus::Partial),
            "completed" => Ok(PaymentStatus::Completed),
            _ => Err(UnknownVariant::new("payment status", s)),
        }
    }
}

/// Direction of the first contact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationType {
    #[default]
    Inbound,
    Outbound,
    /// Former patient calling about a new treatment
    Returning,
}

impl FromStr for ConsultationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(ConsultationType::Inbound),
            "outbound" => Ok(ConsultationType::Outbound),
            "returning" => Ok(ConsultationType::Returning),
            _ => Err(UnknownVariant::new("consultation type", s)),
        }
    }
}

/// Consultation-stage status of a lead, before any visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum LeadStatus {
    #[default]
    #[serde(rename = "잠재고객")]
    Prospect,
    #[serde(rename = "콜백필요")]
    CallbackNeeded,
    #[serde(rename = "부재중")]
    NoAnswer,
    #[serde(rename = "활성고객")]
    Active,
    #[serde(rename = "VIP")]
    Vip,
    #[serde(rename = "예약확정")]
    Reserved,
    #[serde(rename = "재예약확정")]
    ReReserved,
    #[serde(rename = "종결")]
    Closed,
}

impl LeadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::Prospect => "잠재고객",
            LeadStatus::CallbackNeeded => "콜백필요",
            LeadStatus::NoAnswer => "부재중",
            LeadStatus::Active => "활성고객",
            LeadStatus::Vip => "VIP",
            LeadStatus::Reserved => "예약확정",
            LeadStatus::ReReserved => "재예약확정",
            LeadStatus::Closed => "종결",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "잠재고객" => Ok(LeadStatus::Prospect),
            "콜백필요" => Ok(LeadStatus::CallbackNeeded),
            "부재중" => Ok(LeadStatus::NoAnswer),
            "활성고객" => Ok(LeadStatus::Active),
            "VIP" => Ok(LeadStatus::Vip),
            "예약확정" => Ok(LeadStatus::Reserved),
            "재예약확정" => Ok(LeadStatus::ReReserved),
            "종결" => Ok(LeadStatus::Closed),
            _ => Err(UnknownVariant::new("lead status", s)),
        }
    }
}

/// Status of a lead after the clinic visit. Unset means "not yet decided".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PostVisitStatus {
    #[serde(rename = "치료시작")]
    TreatmentStarted,
    #[serde(rename = "치료동의")]
    TreatmentAgreed,
    #[serde(rename = "재콜백필요")]
    RecallNeeded,
    #[serde(rename = "종결")]
    Closed,
}

impl PostVisitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PostVisitStatus::TreatmentStarted => "치료시작",
            PostVisitStatus::TreatmentAgreed => "치료동의",
            PostVisitStatus::RecallNeeded => "재콜백필요",
            PostVisitStatus::Closed => "종결",
        }
    }
}

impl FromStr for PostVisitStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "치료시작" => Ok(PostVisitStatus::TreatmentStarted),
            "치료동의" => Ok(PostVisitStatus::TreatmentAgreed),
            "재콜백필요" => Ok(PostVisitStatus::RecallNeeded),
            "종결" => Ok(PostVisitStatus::Closed),
            _ => Err(UnknownVariant::new("post-visit status", s)),
        }
    }
}

/// Immutable audit entry appended on every status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub from: PatientStatus,
    pub to: PatientStatus,
    /// Business date of the event (visit date, reservation date, ...)
    pub event_date: String,
    /// When the change was recorded
    pub changed_at: String,
    pub changed_by: Option<String>,
    /// Closing reason, only for transitions into closed
    pub reason: Option<String>,
}

/// A dental lead tracked through the funnel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: PatientStatus,
    #[serde(default)]
    pub temperature: Temperature,
    /// Referral channel (유튜브, 블로그, ...)
    pub source: Option<String>,
    #[serde(default)]
    pub consultation_type: ConsultationType,
    pub region: Option<String>,
    pub age: Option<u32>,
    /// Treatment the lead asked about
    pub interest: Option<String>,
    pub memo: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// First-contact date (YYYY-MM-DD), the monthly statistics key
    pub call_in_date: String,

    // Amounts, in the smallest currency unit
    #[serde(default)]
    pub estimated_amount: i64,
    #[serde(default)]
    pub actual_amount: i64,
    /// Flat treatment cost entered directly (last resort of amount resolution)
    #[serde(default)]
    pub treatment_cost: i64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub treatment_note: Option<String>,

    // Scheduling
    pub next_action: Option<String>,
    pub next_action_date: Option<String>,
    pub next_action_note: Option<String>,
    pub next_callback_date: Option<String>,
    pub treatment_start_date: Option<String>,
    pub expected_completion_date: Option<String>,
    pub status_changed_at: Option<String>,

    // Consultation-stage tracking
    #[serde(default)]
    pub lead_status: LeadStatus,
    #[serde(default)]
    pub visit_confirmed: bool,
    pub post_visit_status: Option<PostVisitStatus>,
    /// Lead closed out (종결 처리)
    #[serde(default)]
    pub is_completed: bool,
    pub completed_reason: Option<String>,
    pub phone_consultation: Option<ConsultationResult>,
    pub visit_consultation: Option<ConsultationResult>,

    /// Highest callback attempt number ever issued
    #[serde(default)]
    pub attempt_counter: u32,
    #[serde(default)]
    pub callback_history: Vec<CallbackEntry>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub journeys: Vec<Journey>,
    pub active_journey_id: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    /// Create a lead on first contact.
    pub fn new(name: String, phone: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            phone,
            status: PatientStatus::Consulting,
            temperature: Temperature::default(),
            source: None,
            consultation_type: ConsultationType::default(),
            region: None,
            age: None,
            interest: None,
            memo: None,
            tags: Vec::new(),
            call_in_date: now.date_naive().format("%Y-%m-%d").to_string(),
            estimated_amount: 0,
            actual_amount: 0,
            treatment_cost: 0,
            payment_status: PaymentStatus::default(),
            treatment_note: None,
            next_action: None,
            next_action_date: None,
            next_action_note: None,
            next_callback_date: None,
            treatment_start_date: None,
            expected_completion_date: None,
            status_changed_at: None,
            lead_status: LeadStatus::default(),
            visit_confirmed: false,
            post_visit_status: None,
            is_completed: false,
            completed_reason: None,
            phone_consultation: None,
            visit_consultation: None,
            attempt_counter: 0,
            callback_history: Vec::new(),
            status_history: Vec::new(),
            journeys: Vec::new(),
            active_journey_id: None,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        }
    }

    /// Estimated treatment value: first non-zero of visit discount price,
    /// visit regular price, phone estimate, flat treatment cost.
    pub fn resolved_amount(&self) -> i64 {
        let visit = self.visit_consultation.as_ref();
        let phone = self.phone_consultation.as_ref();
        [
            visit.map(|v| v.discount_price()),
            visit.map(|v| v.original_amount),
            phone.map(|p| p.estimate()),
            Some(self.treatment_cost),
        ]
        .into_iter()
        .flatten()
        .find(|amount| *amount > 0)
        .unwrap_or(0)
    }

    /// Visited and started treatment.
    pub fn is_treatment_started(&self) -> bool {
        self.visit_confirmed && self.post_visit_status == Some(PostVisitStatus::TreatmentStarted)
    }

    /// True if the patient is at `status` now or passed through it earlier.
    pub fn has_reached(&self, status: PatientStatus) -> bool {
        self.status.is_at_least(status)
            || self
                .status_history
                .iter()
                .any(|entry| entry.to.is_at_least(status) || entry.from.is_at_least(status))
    }

    /// Furthest funnel stage ever reached (closed patients included).
    pub fn furthest_stage(&self) -> PatientStatus {
        let mut best = self.status.funnel_rank().unwrap_or(0);
        for entry in &self.status_history {
            for rank in [entry.from.funnel_rank(), entry.to.funnel_rank()].into_iter().flatten() {
                best = best.max(rank);
            }
        }
        PatientStatus::FUNNEL_ORDER[best]
    }

    pub fn active_journey(&self) -> Option<&Journey> {
        let id = self.active_journey_id.as_deref()?;
        self.journeys.iter().find(|j| j.id == id)
    }

    pub fn active_journey_mut(&mut self) -> Option<&mut Journey> {
        let id = self.active_journey_id.clone()?;
        self.journeys.iter_mut().find(|j| j.id == id)
    }

    /// Treatment whose recall schedule applies to this patient.
    pub fn recall_treatment(&self) -> Option<String> {
        self.active_journey()
            .and_then(|j| j.treatment_type.clone())
            .or_else(|| self.visit_consultation.as_ref().and_then(|c| c.treatment.clone()))
            .or_else(|| self.phone_consultation.as_ref().and_then(|c| c.treatment.clone()))
            .or_else(|| self.interest.clone())
            .filter(|t| !t.trim().is_empty())
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
