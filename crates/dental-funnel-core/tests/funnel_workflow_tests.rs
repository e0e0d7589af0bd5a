//! End-to-end funnel workflow tests.

use dental_funnel_core::config::FunnelConfig;
use dental_funnel_core::db::Database;
use dental_funnel_core::funnel::{CallbackPayload, NewJourney, Reschedule, StatusChange, WorkflowError};
use dental_funnel_core::models::{
    AgreementStatus, CallbackResult, ConsultationResult, ConsultationStage, LeadStatus, PatientStatus,
    PostVisitStatus, RecallMessageStatus, RecallSchedule, RecallSetting,
};
use dental_funnel_core::service::{NewPatient, PatientService, PatientUpdate};

fn schedule(timing: &str, days: i64, enabled: bool) -> RecallSchedule {
    RecallSchedule {
        timing: timing.to_string(),
        timing_days: days,
        message: format!("{{환자명}}님, 임플란트 {} 점검 안내드립니다.", timing),
        enabled,
    }
}

fn transition(target: PatientStatus, date: &str) -> PatientUpdate {
    PatientUpdate::StatusChange(StatusChange::to(target).on(date).by(Some("상담실장")))
}

#[test]
fn test_consulting_to_completed() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    service
        .upsert_recall_setting(RecallSetting::new(
            "임플란트".to_string(),
            vec![
                schedule("1주일", 7, true),
                schedule("1개월", 30, true),
                schedule("6개월", 180, false),
            ],
        ))
        .unwrap();

    let mut intake = NewPatient::new("김민수", "010-1234-5678");
    intake.interest = Some("임플란트".to_string());
    intake.call_in_date = Some("2024-03-01".to_string());
    let patient = service.create_patient(intake).unwrap();
    assert_eq!(patient.status, PatientStatus::Consulting);

    let reserved = service
        .update_patient(&patient.id, transition(PatientStatus::Reserved, "2024-03-08"))
        .unwrap();
    assert_eq!(reserved.next_action_date.as_deref(), Some("2024-03-08"));
    assert_eq!(reserved.next_action.as_deref(), Some("내원예약"));

    let visited = service
        .update_patient(&patient.id, transition(PatientStatus::Visited, "2024-03-08"))
        .unwrap();
    assert!(visited.next_action_date.is_none());
    assert!(visited.next_action.is_none());
    assert!(visited.visit_confirmed);

    let treatment = service
        .update_patient(&patient.id, transition(PatientStatus::Treatment, "2024-03-15"))
        .unwrap();
    assert_eq!(treatment.treatment_start_date.as_deref(), Some("2024-03-15"));
    assert_eq!(treatment.post_visit_status, Some(PostVisitStatus::TreatmentStarted));

    let completed = service
        .update_patient(&patient.id, transition(PatientStatus::Completed, "2024-04-01"))
        .unwrap();
    assert!(completed.next_action_date.is_none());
    assert_eq!(completed.treatment_start_date.as_deref(), Some("2024-03-15"));
    assert_eq!(completed.status_history.len(), 4);
    assert!(completed
        .status_history
        .iter()
        .all(|entry| entry.changed_by.as_deref() == Some("상담실장")));

    let messages = service.list_recall_messages(&patient.id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].timing, "1주일");
    assert_eq!(messages[0].scheduled_at, "2024-04-08T10:00:00");
    assert_eq!(messages[0].message, "김민수님, 임플란트 1주일 점검 안내드립니다.");
    assert_eq!(messages[1].scheduled_at, "2024-05-01T10:00:00");
    assert!(messages.iter().all(|m| m.status == RecallMessageStatus::Pending));
}

#[test]
fn test_reentering_completed_skips_pending_timings() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig {
        recall_send_hour: 9,
        ..Default::default()
    };
    let service = PatientService::new(&db, &config);

    service
        .upsert_recall_setting(RecallSetting::new(
            "임플란트".to_string(),
            vec![schedule("1주일", 7, true), schedule("1개월", 30, false)],
        ))
        .unwrap();

    let mut intake = NewPatient::new("이서연", "010-1234-5678");
    intake.interest = Some("임플란트".to_string());
    let patient = service.create_patient(intake).unwrap();

    service
        .update_patient(&patient.id, transition(PatientStatus::Completed, "2024-04-01"))
        .unwrap();
    assert_eq!(service.list_recall_messages(&patient.id).unwrap().len(), 1);

    // Enable the second row, then complete again.
    service
        .upsert_recall_setting(RecallSetting::new(
            "임플란트".to_string(),
            vec![schedule("1주일", 7, true), schedule("1개월", 30, true)],
        ))
        .unwrap();
    service
        .update_patient(&patient.id, transition(PatientStatus::Followup, "2024-04-10"))
        .unwrap();
    service
        .update_patient(&patient.id, transition(PatientStatus::Completed, "2024-04-20"))
        .unwrap();

    let messages = service.list_recall_messages(&patient.id).unwrap();
    assert_eq!(messages.len(), 2);
    let weekly: Vec<_> = messages.iter().filter(|m| m.timing == "1주일").collect();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].scheduled_at, "2024-04-08T09:00:00");
    let monthly = messages.iter().find(|m| m.timing == "1개월").unwrap();
    assert_eq!(monthly.scheduled_at, "2024-05-20T09:00:00");
}

#[test]
fn test_completion_without_recall_setting_still_succeeds() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("최유진", "010-9999-0000"))
        .unwrap();
    let completed = service
        .update_patient(&patient.id, transition(PatientStatus::Completed, "2024-04-01"))
        .unwrap();

    assert_eq!(completed.status, PatientStatus::Completed);
    assert!(service.list_recall_messages(&patient.id).unwrap().is_empty());
}

#[test]
fn test_unreadable_recall_setting_does_not_block_completion() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    db.conn()
        .execute(
            "INSERT INTO recall_settings (treatment, schedules) VALUES ('임플란트', '{not json')",
            [],
        )
        .unwrap();

    let mut intake = NewPatient::new("한지민", "010-4444-5555");
    intake.interest = Some("임플란트".to_string());
    let patient = service.create_patient(intake).unwrap();

    let completed = service
        .update_patient(&patient.id, transition(PatientStatus::Completed, "2024-04-01"))
        .unwrap();
    assert_eq!(completed.status, PatientStatus::Completed);

    let stored = service.get_patient(&patient.id).unwrap().patient;
    assert_eq!(stored.status, PatientStatus::Completed);
    assert!(stored.is_completed);
    assert!(service.list_recall_messages(&patient.id).unwrap().is_empty());
}

#[test]
fn test_reschedule_records_every_previous_date() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("정하늘", "010-2222-3333"))
        .unwrap();
    service
        .update_patient(&patient.id, transition(PatientStatus::Reserved, "2024-03-01"))
        .unwrap();

    let dates = ["2024-03-02", "2024-03-05", "2024-03-09", "2024-03-12"];
    for date in dates {
        service
            .update_patient(
                &patient.id,
                PatientUpdate::ScheduleOnly(Reschedule {
                    new_date: date.to_string(),
                    reason: Some("환자 요청".to_string()),
                    note: Some(format!("{}로 변경", date)),
                }),
            )
            .unwrap();
    }

    let stored = service.get_patient(&patient.id).unwrap().patient;
    assert_eq!(stored.status, PatientStatus::Reserved);
    assert_eq!(stored.next_action_date.as_deref(), Some("2024-03-12"));
    assert_eq!(stored.next_action_note.as_deref(), Some("2024-03-12로 변경"));

    let previous: Vec<&str> = stored
        .callback_history
        .iter()
        .filter_map(|e| e.as_reschedule())
        .map(|r| r.previous_date.as_str())
        .collect();
    assert_eq!(previous, vec!["2024-03-01", "2024-03-02", "2024-03-05", "2024-03-09"]);
}

#[test]
fn test_journey_mirrors_patient_changes() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("한도윤", "010-4444-5555"))
        .unwrap();
    let (_, journey_id) = service
        .open_journey(
            &patient.id,
            NewJourney {
                treatment_type: "교정".to_string(),
                estimated_amount: Some(4_500_000),
                changed_by: None,
            },
        )
        .unwrap();

    service
        .update_patient(&patient.id, transition(PatientStatus::Reserved, "2024-03-20"))
        .unwrap();
    let mut payload = CallbackPayload::new(CallbackResult::CallbackRequested, "보호자와 상의 후 연락");
    payload.next_date = Some("2024-03-18".to_string());
    service.record_callback(&patient.id, payload).unwrap();
    service
        .update_patient(&patient.id, transition(PatientStatus::Closed, "2024-03-25"))
        .unwrap();

    let stored = service.get_patient(&patient.id).unwrap().patient;
    let journey = stored.active_journey().unwrap();
    assert_eq!(journey.id, journey_id);
    assert_eq!(journey.status, PatientStatus::Closed);
    assert!(journey.next_action_date.is_none());
    assert!(journey.closed_at.is_some());
    assert_eq!(journey.estimated_amount, 4_500_000);
    assert_eq!(journey.callback_history.len(), stored.callback_history.len());
    // The opening entry plus two transitions
    assert_eq!(journey.status_history.len(), 3);
    assert_eq!(stored.lead_status, LeadStatus::Closed);

    // A new episode deactivates the closed one.
    let (reopened, second) = service
        .open_journey(
            &patient.id,
            NewJourney {
                treatment_type: "임플란트".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_ne!(second, journey_id);
    assert_eq!(reopened.journeys.iter().filter(|j| j.is_active).count(), 1);
    assert_eq!(reopened.status, PatientStatus::Consulting);
    assert!(!reopened.is_completed);
}

#[test]
fn test_visit_consultation_books_treatment() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("오세훈", "010-7777-8888"))
        .unwrap();
    service
        .update_patient(&patient.id, transition(PatientStatus::Reserved, "2024-03-05"))
        .unwrap();

    let mut consultation = ConsultationResult::new(ConsultationStage::Visit, AgreementStatus::Agreed);
    consultation.treatment = Some("임플란트".to_string());
    consultation.original_amount = 3_200_000;
    consultation.discount_amount = Some(2_800_000);
    consultation.appointment_date = Some("2024-03-19".to_string());

    let updated = service
        .apply_consultation(&patient.id, consultation, Some("원장"))
        .unwrap();
    assert_eq!(updated.status, PatientStatus::TreatmentBooked);
    assert!(updated.visit_confirmed);
    assert_eq!(updated.post_visit_status, Some(PostVisitStatus::TreatmentAgreed));
    assert_eq!(updated.next_action_date.as_deref(), Some("2024-03-19"));
    assert_eq!(updated.resolved_amount(), 2_800_000);
    assert_eq!(updated.estimated_amount, 2_800_000);
    // reserved -> visited -> treatmentBooked
    assert_eq!(updated.status_history.len(), 3);
}

#[test]
fn test_attempt_numbers_never_reused() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("배수지", "010-1212-3434"))
        .unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let receipt = service
            .record_callback(&patient.id, CallbackPayload::new(CallbackResult::NoAnswer, ""))
            .unwrap();
        ids.push(receipt.callback.id);
    }
    service.delete_callback(&patient.id, &ids[2]).unwrap();
    service.delete_callback(&patient.id, &ids[1]).unwrap();

    let receipt = service
        .record_callback(&patient.id, CallbackPayload::new(CallbackResult::OnHold, "다음 주 재연락"))
        .unwrap();
    assert_eq!(receipt.callback.as_attempt().unwrap().attempt, 4);
    assert_eq!(receipt.patient.lead_status, LeadStatus::CallbackNeeded);
}

#[test]
fn test_unknown_ids() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    assert!(matches!(
        service.update_patient("missing", transition(PatientStatus::Visited, "2024-03-01")),
        Err(WorkflowError::NotFound(_))
    ));
    assert!(matches!(
        service.record_callback("missing", CallbackPayload::new(CallbackResult::NoAnswer, "")),
        Err(WorkflowError::NotFound(_))
    ));

    let patient = service
        .create_patient(NewPatient::new("배수지", "010-1212-3434"))
        .unwrap();
    assert!(matches!(
        service.delete_callback(&patient.id, "cb-missing"),
        Err(WorkflowError::CallbackNotFound(_))
    ));
    assert!(matches!(
        service.update_patient(&patient.id, transition(PatientStatus::Reserved, "03/08/2024")),
        Err(WorkflowError::InvalidInput(_))
    ));
}
