//! Plain field edits and new-patient intake.

use crate::funnel::{normalize_date, propagate, require_date, JourneyPatch, WorkflowError, WorkflowResult};
use crate::models::{ConsultationType, LeadStatus, Patient, PaymentStatus, Temperature};

/// Last-write-wins edit of non-status fields. `None` leaves a field alone;
/// an empty string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub temperature: Option<Temperature>,
    pub source: Option<String>,
    pub consultation_type: Option<ConsultationType>,
    pub region: Option<String>,
    pub age: Option<u32>,
    pub interest: Option<String>,
    pub memo: Option<String>,
    pub tags: Option<Vec<String>>,
    pub call_in_date: Option<String>,
    pub lead_status: Option<LeadStatus>,
    pub estimated_amount: Option<i64>,
    pub actual_amount: Option<i64>,
    pub treatment_cost: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub treatment_note: Option<String>,
    pub next_action_note: Option<String>,
    pub expected_completion_date: Option<String>,
}

/// First-contact intake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub source: Option<String>,
    pub consultation_type: ConsultationType,
    pub region: Option<String>,
    pub age: Option<u32>,
    pub interest: Option<String>,
    pub memo: Option<String>,
    /// Defaults to today
    pub call_in_date: Option<String>,
    pub estimated_amount: i64,
}

impl NewPatient {
    pub fn new(name: &str, phone: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn into_patient(self) -> WorkflowResult<Patient> {
        let name = required("name", &self.name)?;
        let phone = required("phone", &self.phone)?;
        non_negative("estimatedAmount", self.estimated_amount)?;

        let mut patient = Patient::new(name, phone);
        if let Some(date) = self.call_in_date {
            patient.call_in_date = normalize_date("callInDate", &date)?;
        }
        patient.source = non_empty(self.source);
        patient.consultation_type = self.consultation_type;
        patient.region = non_empty(self.region);
        patient.age = self.age;
        patient.interest = non_empty(self.interest);
        patient.memo = non_empty(self.memo);
        patient.estimated_amount = self.estimated_amount;
        Ok(patient)
    }
}

fn required(field: &str, value: &str) -> WorkflowResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn non_negative(field: &str, amount: i64) -> WorkflowResult<()> {
    if amount < 0 {
        return Err(WorkflowError::InvalidInput(format!("{} must not be negative: {}", field, amount)));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Apply a field edit, mirroring amounts, payment and notes into the active
/// journey. Validates everything before touching the patient.
pub(crate) fn apply_fields(patient: &mut Patient, fields: &PatientFields) -> WorkflowResult<()> {
    let name = fields.name.as_deref().map(|n| required("name", n)).transpose()?;
    let phone = fields.phone.as_deref().map(|p| required("phone", p)).transpose()?;
    for (field, amount) in [
        ("estimatedAmount", fields.estimated_amount),
        ("actualAmount", fields.actual_amount),
        ("treatmentCost", fields.treatment_cost),
    ] {
        if let Some(amount) = amount {
            non_negative(field, amount)?;
        }
    }
    let call_in_date = fields
        .call_in_date
        .as_deref()
        .map(|d| normalize_date("callInDate", d))
        .transpose()?;
    if let Some(date) = fields.expected_completion_date.as_deref().filter(|d| !d.is_empty()) {
        require_date("expectedCompletionDate", date)?;
    }

    if let Some(name) = name {
        patient.name = name;
    }
    if let Some(phone) = phone {
        patient.phone = phone;
    }
    if let Some(temperature) = fields.temperature {
        patient.temperature = temperature;
    }
    if let Some(source) = &fields.source {
        patient.source = non_empty(Some(source.clone()));
    }
    if let Some(kind) = fields.consultation_type {
        patient.consultation_type = kind;
    }
    if let Some(region) = &fields.region {
        patient.region = non_empty(Some(region.clone()));
    }
    if fields.age.is_some() {
        patient.age = fields.age;
    }
    if let Some(interest) = &fields.interest {
        patient.interest = non_empty(Some(interest.clone()));
    }
    if let Some(memo) = &fields.memo {
        patient.memo = non_empty(Some(memo.clone()));
    }
    if let Some(tags) = &fields.tags {
        patient.tags = tags.clone();
    }
    if let Some(date) = call_in_date {
        patient.call_in_date = date;
    }
    if let Some(lead_status) = fields.lead_status {
        patient.lead_status = lead_status;
    }
    if let Some(cost) = fields.treatment_cost {
        patient.treatment_cost = cost;
    }
    if let Some(date) = &fields.expected_completion_date {
        patient.expected_completion_date = non_empty(Some(date.clone()));
    }

    let mut patch = JourneyPatch::default();
    if let Some(amount) = fields.estimated_amount {
        patient.estimated_amount = amount;
        patch.estimated_amount = Some(amount);
    }
    if let Some(amount) = fields.actual_amount {
        patient.actual_amount = amount;
        patch.actual_amount = Some(amount);
    }
    if let Some(payment) = fields.payment_status {
        patient.payment_status = payment;
        patch.payment_status = Some(payment);
    }
    if let Some(note) = &fields.treatment_note {
        patient.treatment_note = non_empty(Some(note.clone()));
        patch.treatment_note = Some(patient.treatment_note.clone());
    }
    if let Some(note) = &fields.next_action_note {
        patient.next_action_note = non_empty(Some(note.clone()));
        patch.next_action_note = Some(patient.next_action_note.clone());
    }

    if !patch.is_empty() {
        propagate(patient, &patch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::{open_journey, NewJourney};

    #[test]
    fn test_new_patient_validation() {
        assert!(matches!(
            NewPatient::new("  ", "010-1234-5678").into_patient(),
            Err(WorkflowError::InvalidInput(_))
        ));

        let mut request = NewPatient::new("김민수", "010-1234-5678");
        request.call_in_date = Some("2024-13-01".into());
        assert!(matches!(request.into_patient(), Err(WorkflowError::InvalidInput(_))));

        let mut request = NewPatient::new(" 김민수 ", "010-1234-5678");
        request.call_in_date = Some("2024-03-05".into());
        request.source = Some("".into());
        let patient = request.into_patient().unwrap();
        assert_eq!(patient.name, "김민수");
        assert_eq!(patient.call_in_date, "2024-03-05");
        assert!(patient.source.is_none());
    }

    #[test]
    fn test_call_in_date_stored_as_calendar_date() {
        let mut request = NewPatient::new("김민수", "010-1234-5678");
        request.call_in_date = Some("2024-03-31T14:00:00".into());
        let mut patient = request.into_patient().unwrap();
        assert_eq!(patient.call_in_date, "2024-03-31");

        apply_fields(
            &mut patient,
            &PatientFields {
                call_in_date: Some("2024-04-30T09:00:00+09:00".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(patient.call_in_date, "2024-04-30");
    }

    #[test]
    fn test_fields_mirror_into_journey() {
        let mut patient = Patient::new("김민수".into(), "010-1234-5678".into());
        open_journey(
            &mut patient,
            &NewJourney {
                treatment_type: "임플란트".into(),
                ..Default::default()
            },
        );

        let fields = PatientFields {
            actual_amount: Some(300_000),
            payment_status: Some(PaymentStatus::Partial),
            treatment_note: Some("1차 수술".into()),
            memo: Some("오후 통화 선호".into()),
            ..Default::default()
        };
        apply_fields(&mut patient, &fields).unwrap();

        assert_eq!(patient.actual_amount, 300_000);
        assert_eq!(patient.memo.as_deref(), Some("오후 통화 선호"));
        let journey = patient.active_journey().unwrap();
        assert_eq!(journey.actual_amount, 300_000);
        assert_eq!(journey.payment_status, PaymentStatus::Partial);
        assert_eq!(journey.treatment_note.as_deref(), Some("1차 수술"));
    }

    #[test]
    fn test_invalid_fields_leave_patient_untouched() {
        let mut patient = Patient::new("김민수".into(), "010-1234-5678".into());
        let before = patient.clone();
        let fields = PatientFields {
            name: Some("이영희".into()),
            actual_amount: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            apply_fields(&mut patient, &fields),
            Err(WorkflowError::InvalidInput(_))
        ));
        assert_eq!(patient, before);
    }

    #[test]
    fn test_empty_string_clears() {
        let mut patient = Patient::new("김민수".into(), "010-1234-5678".into());
        patient.region = Some("경기도".into());
        apply_fields(
            &mut patient,
            &PatientFields {
                region: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(patient.region.is_none());
    }
}
