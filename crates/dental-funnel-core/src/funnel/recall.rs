//! Recall-message scheduling for completed treatments.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use super::{WorkflowError, WorkflowResult};
use crate::db::Database;
use crate::models::{Patient, RecallMessage, RecallMessageStatus, RecallSetting};

const NAME_PLACEHOLDERS: [&str; 2] = ["{환자명}", "{이름}"];

/// Replace the name placeholders of a recall template.
pub fn render_template(template: &str, patient_name: &str, fallback_name: &str) -> String {
    let name = match patient_name.trim() {
        "" => fallback_name,
        name => name,
    };
    NAME_PLACEHOLDERS
        .iter()
        .fold(template.to_string(), |text, placeholder| text.replace(placeholder, name))
}

/// Messages to insert for one completion: one per enabled schedule row,
/// skipping timings that already have a pending message.
pub fn plan_recall_messages(
    patient: &Patient,
    setting: &RecallSetting,
    completed_on: NaiveDate,
    already_pending: &HashSet<String>,
    send_hour: u32,
    fallback_name: &str,
) -> Vec<RecallMessage> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let last_visit = crate::dates::format_date(completed_on);

    setting
        .enabled_schedules()
        .filter(|schedule| !already_pending.contains(&schedule.timing))
        .filter_map(|schedule| {
            let send_at = completed_on
                .checked_add_signed(Duration::days(schedule.timing_days))?
                .and_hms_opt(send_hour, 0, 0)?;
            Some(RecallMessage {
                id: uuid::Uuid::new_v4().to_string(),
                patient_id: patient.id.clone(),
                treatment: setting.treatment.clone(),
                timing: schedule.timing.clone(),
                timing_days: schedule.timing_days,
                message: render_template(&schedule.message, &patient.name, fallback_name),
                status: RecallMessageStatus::Pending,
                scheduled_at: send_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
                last_visit: last_visit.clone(),
                created_at: created_at.clone(),
            })
        })
        .collect()
}

/// Read the patient's recall table and insert the planned messages.
/// Returns the number of messages created.
pub fn schedule_recall_messages(
    db: &Database,
    patient: &Patient,
    completed_on: &str,
    send_hour: u32,
    fallback_name: &str,
) -> WorkflowResult<usize> {
    let completed_on = crate::dates::parse_date(completed_on).ok_or_else(|| {
        WorkflowError::InvalidInput(format!("completion date is not a date: {}", completed_on))
    })?;

    let Some(treatment) = patient.recall_treatment() else {
        debug!(patient_id = %patient.id, "no treatment recorded, skipping recall messages");
        return Ok(0);
    };
    let Some(setting) = db.get_recall_setting(&treatment)? else {
        debug!(patient_id = %patient.id, treatment = %treatment, "no recall setting for treatment");
        return Ok(0);
    };

    let pending = db.pending_recall_timings(&patient.id, &treatment)?;
    let planned = plan_recall_messages(patient, &setting, completed_on, &pending, send_hour, fallback_name);

    let mut created = 0;
    for message in &planned {
        if db.insert_recall_message(message)? {
            created += 1;
        }
    }

    info!(
        patient_id = %patient.id,
        treatment = %treatment,
        created,
        skipped = pending.len(),
        "scheduled recall messages"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecallSchedule;

    fn schedule(timing: &str, days: i64, enabled: bool) -> RecallSchedule {
        RecallSchedule {
            timing: timing.into(),
            timing_days: days,
            message: "{환자명}님, 치료 후 {이름}님의 상태는 어떠신가요?".into(),
            enabled,
        }
    }

    fn setting() -> RecallSetting {
        RecallSetting::new(
            "임플란트".into(),
            vec![
                schedule("1주 후", 7, true),
                schedule("1개월 후", 30, true),
                schedule("3개월 후", 90, false),
            ],
        )
    }

    #[test]
    fn test_render_template() {
        assert_eq!(render_template("{환자명}님 {이름}", "홍길동", "고객"), "홍길동님 홍길동");
        assert_eq!(render_template("{환자명}님", "  ", "고객"), "고객님");
        assert_eq!(render_template("안내드립니다", "홍길동", "고객"), "안내드립니다");
    }

    #[test]
    fn test_plan_skips_disabled_and_pending() {
        let patient = Patient::new("홍길동".into(), "010-0000-0000".into());
        let completed_on = NaiveDate::from_ymd_opt(2024, 1, 28).unwrap();

        let planned = plan_recall_messages(&patient, &setting(), completed_on, &HashSet::new(), 10, "고객");
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].scheduled_at, "2024-02-04T10:00:00");
        assert_eq!(planned[1].scheduled_at, "2024-02-27T10:00:00");
        assert_eq!(planned[0].message, "홍길동님, 치료 후 홍길동님의 상태는 어떠신가요?");
        assert_eq!(planned[0].last_visit, "2024-01-28");

        let pending: HashSet<String> = ["1주 후".to_string()].into_iter().collect();
        let planned = plan_recall_messages(&patient, &setting(), completed_on, &pending, 9, "고객");
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].timing, "1개월 후");
        assert!(planned[0].scheduled_at.ends_with("T09:00:00"));
    }

    #[test]
    fn test_schedule_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_recall_setting(&setting()).unwrap();

        let mut patient = Patient::new("홍길동".into(), "010-0000-0000".into());
        patient.interest = Some("임플란트".into());

        assert_eq!(schedule_recall_messages(&db, &patient, "2024-03-01", 10, "고객").unwrap(), 2);
        assert_eq!(schedule_recall_messages(&db, &patient, "2024-03-01", 10, "고객").unwrap(), 0);
        assert_eq!(db.list_recall_messages(&patient.id).unwrap().len(), 2);
    }

    #[test]
    fn test_schedule_without_setting() {
        let db = Database::open_in_memory().unwrap();
        let mut patient = Patient::new("홍길동".into(), "010-0000-0000".into());
        assert_eq!(schedule_recall_messages(&db, &patient, "2024-03-01", 10, "고객").unwrap(), 0);

        patient.interest = Some("교정".into());
        assert_eq!(schedule_recall_messages(&db, &patient, "2024-03-01", 10, "고객").unwrap(), 0);
    }
}
