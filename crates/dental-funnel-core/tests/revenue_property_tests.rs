//! Property tests for the revenue partition and change indicators.

use dental_funnel_core::analytics::{change_indicator, classify_revenue, ChangeType, RevenueBucket};
use dental_funnel_core::models::{LeadStatus, Patient, PostVisitStatus};
use proptest::prelude::*;

fn lead_status() -> impl Strategy<Value = LeadStatus> {
    prop_oneof![
        Just(LeadStatus::Prospect),
        Just(LeadStatus::CallbackNeeded),
        Just(LeadStatus::NoAnswer),
        Just(LeadStatus::Active),
        Just(LeadStatus::Vip),
        Just(LeadStatus::Reserved),
        Just(LeadStatus::ReReserved),
        Just(LeadStatus::Closed),
    ]
}

fn post_visit_status() -> impl Strategy<Value = Option<PostVisitStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(PostVisitStatus::TreatmentStarted)),
        Just(Some(PostVisitStatus::TreatmentAgreed)),
        Just(Some(PostVisitStatus::RecallNeeded)),
        Just(Some(PostVisitStatus::Closed)),
    ]
}

fn patient() -> impl Strategy<Value = Patient> {
    (
        lead_status(),
        post_visit_status(),
        any::<bool>(),
        any::<bool>(),
        0i64..10_000_000,
    )
        .prop_map(|(lead, post_visit, visited, completed, cost)| {
            let mut p = Patient::new("환자".to_string(), "010-0000-0000".to_string());
            p.lead_status = lead;
            p.post_visit_status = post_visit;
            p.visit_confirmed = visited;
            p.is_completed = completed;
            p.treatment_cost = cost;
            p
        })
}

proptest! {
    #[test]
    fn buckets_partition_the_snapshot(patients in prop::collection::vec(patient(), 0..40)) {
        let analysis = classify_revenue(&patients);

        prop_assert_eq!(
            analysis.achieved.patients + analysis.potential.patients + analysis.lost.patients,
            patients.len()
        );
        prop_assert_eq!(
            analysis.achieved.amount + analysis.potential.amount + analysis.lost.amount,
            analysis.total_amount
        );
        prop_assert_eq!(
            analysis.consultation_potential.patients + analysis.visit_management_potential.patients,
            analysis.potential.patients
        );
        prop_assert_eq!(
            analysis.consultation_lost.patients + analysis.visit_lost.patients,
            analysis.lost.patients
        );
        prop_assert_eq!(analysis.details.len(), patients.len());
    }

    #[test]
    fn achieved_means_visited_and_started(patients in prop::collection::vec(patient(), 1..20)) {
        let analysis = classify_revenue(&patients);
        for detail in &analysis.details {
            let p = patients.iter().find(|p| p.id == detail.patient_id).unwrap();
            let started = p.visit_confirmed && p.post_visit_status == Some(PostVisitStatus::TreatmentStarted);
            prop_assert_eq!(detail.class.bucket() == RevenueBucket::Achieved, started);
        }
    }

    #[test]
    fn classifier_is_idempotent(patients in prop::collection::vec(patient(), 0..20)) {
        prop_assert_eq!(classify_revenue(&patients), classify_revenue(&patients));
    }

    #[test]
    fn details_sorted_by_amount(patients in prop::collection::vec(patient(), 0..20)) {
        let analysis = classify_revenue(&patients);
        for pair in analysis.details.windows(2) {
            prop_assert!(pair[0].amount >= pair[1].amount);
        }
    }

    #[test]
    fn change_indicator_direction(current in 0u32..10_000, previous in 1u32..10_000) {
        let indicator = change_indicator(f64::from(current), f64::from(previous));
        let expected = if current >= previous { ChangeType::Increase } else { ChangeType::Decrease };
        prop_assert_eq!(indicator.kind, expected);
        prop_assert_eq!(indicator.value, f64::from(current.abs_diff(previous)));
    }

    #[test]
    fn change_from_zero_is_current(current in 0u32..10_000) {
        let indicator = change_indicator(f64::from(current), 0.0);
        prop_assert_eq!(indicator.value, f64::from(current));
        prop_assert_eq!(indicator.kind, ChangeType::Increase);
    }
}
