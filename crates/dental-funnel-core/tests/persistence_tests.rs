//! On-disk persistence and audit-trail integration tests.

use dental_funnel_core::audit::{AuditOutcome, AuditTrail};
use dental_funnel_core::config::FunnelConfig;
use dental_funnel_core::db::Database;
use dental_funnel_core::funnel::{CallbackPayload, NewJourney, StatusChange};
use dental_funnel_core::models::{CallbackResult, PatientStatus};
use dental_funnel_core::service::{NewPatient, PatientService, PatientUpdate};

#[test]
fn test_patient_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funnel.db");
    let config = FunnelConfig::default();

    let patient_id = {
        let db = Database::open(&path).unwrap();
        let service = PatientService::new(&db, &config);
        let patient = service
            .create_patient(NewPatient::new("송민호", "010-3030-4040"))
            .unwrap();
        service
            .open_journey(
                &patient.id,
                NewJourney {
                    treatment_type: "라미네이트".to_string(),
                    estimated_amount: Some(1_800_000),
                    changed_by: Some("실장".to_string()),
                },
            )
            .unwrap();
        let mut payload = CallbackPayload::new(CallbackResult::ReservationConfirmed, "금요일 2시");
        payload.next_date = Some("2024-05-10".to_string());
        service.record_callback(&patient.id, payload).unwrap();
        patient.id
    };

    let db = Database::open(&path).unwrap();
    let service = PatientService::new(&db, &config);
    let stored = service.get_patient(&patient_id).unwrap().patient;

    assert_eq!(stored.status, PatientStatus::Reserved);
    assert_eq!(stored.next_action_date.as_deref(), Some("2024-05-10"));
    assert_eq!(stored.attempt_counter, 1);
    let journey = stored.active_journey().unwrap();
    assert_eq!(journey.treatment_type.as_deref(), Some("라미네이트"));
    assert_eq!(journey.next_action_date.as_deref(), Some("2024-05-10"));
    assert_eq!(journey.callback_history.len(), 1);

    // Audit chain written by the first connection still verifies.
    let verification = service.verify_audit_trail().unwrap();
    assert!(verification.valid);
    assert_eq!(verification.event_count, 4);
}

#[test]
fn test_audit_records_success_and_failure() {
    let db = Database::open_in_memory().unwrap();
    let config = FunnelConfig::default();
    let service = PatientService::new(&db, &config);

    let patient = service
        .create_patient(NewPatient::new("유재석", "010-1111-0000"))
        .unwrap();
    service
        .update_patient(
            &patient.id,
            PatientUpdate::StatusChange(StatusChange::to(PatientStatus::Visited).by(Some("데스크"))),
        )
        .unwrap();
    let _ = service.update_patient(
        &patient.id,
        PatientUpdate::StatusChange(StatusChange::to(PatientStatus::Reserved).on("not-a-date")),
    );

    let events = AuditTrail::new(&db).events_for(&patient.id).unwrap();
    let actions: Vec<(&str, AuditOutcome)> = events.iter().map(|e| (e.action.as_str(), e.outcome)).collect();
    assert_eq!(
        actions,
        vec![
            ("patient.create", AuditOutcome::Success),
            ("patient.update", AuditOutcome::Success),
            ("patient.update", AuditOutcome::Failure),
        ]
    );
    assert_eq!(events[1].actor.as_deref(), Some("데스크"));
    assert!(events[2].details["error"].as_str().unwrap().contains("not-a-date"));
}

#[test]
fn test_tampering_breaks_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funnel.db");
    let config = FunnelConfig::default();

    let db = Database::open(&path).unwrap();
    let service = PatientService::new(&db, &config);
    for name in ["가", "나", "다"] {
        service.create_patient(NewPatient::new(name, "010-0000-0000")).unwrap();
    }
    assert!(service.verify_audit_trail().unwrap().valid);

    db.conn()
        .execute_batch(
            "DROP TRIGGER IF EXISTS audit_events_no_update;
             UPDATE audit_events SET payload = replace(payload, 'patient.create', 'patient.delete') WHERE seq = 2;",
        )
        .unwrap();

    let verification = AuditTrail::new(&db).verify().unwrap();
    assert!(!verification.valid);
    assert_eq!(verification.broken_at, Some(2));
}
