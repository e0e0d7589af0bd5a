//! Revenue classifier.
//!
//! Every patient lands in exactly one class, decided top to bottom:
//!
//! 1. treatment started after a visit: achieved
//! 2. visited, then closed (post-visit 종결 or closed out): lost at visit stage
//! 3. visited otherwise: potential, visit management
//! 4. lead 종결/부재중 or closed out before a visit: lost at consultation stage
//! 5. everything else: potential, consultation stage

use serde::{Deserialize, Serialize};

use super::percentage;
use crate::models::{LeadStatus, Patient, PatientStatus, PostVisitStatus};

/// Fine-grained revenue class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RevenueClass {
    Achieved,
    ConsultationPotential,
    VisitManagementPotential,
    ConsultationLost,
    VisitLost,
}

/// The three top-level buckets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RevenueBucket {
    Achieved,
    Potential,
    Lost,
}

impl RevenueClass {
    pub fn bucket(&self) -> RevenueBucket {
        match self {
            RevenueClass::Achieved => RevenueBucket::Achieved,
            RevenueClass::ConsultationPotential | RevenueClass::VisitManagementPotential => {
                RevenueBucket::Potential
            }
            RevenueClass::ConsultationLost | RevenueClass::VisitLost => RevenueBucket::Lost,
        }
    }
}

/// Classify one patient.
pub fn classify(patient: &Patient) -> RevenueClass {
    if patient.is_treatment_started() {
        return RevenueClass::Achieved;
    }
    if patient.visit_confirmed {
        if patient.post_visit_status == Some(PostVisitStatus::Closed) || patient.is_completed {
            return RevenueClass::VisitLost;
        }
        return RevenueClass::VisitManagementPotential;
    }
    if matches!(patient.lead_status, LeadStatus::Closed | LeadStatus::NoAnswer) || patient.is_completed {
        return RevenueClass::ConsultationLost;
    }
    RevenueClass::ConsultationPotential
}

/// Patient count and amount of one class or bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueTally {
    pub patients: usize,
    pub amount: i64,
    /// Share of all patients, one decimal
    pub percentage: f64,
}

impl RevenueTally {
    fn add(&mut self, amount: i64) {
        self.patients += 1;
        self.amount += amount;
    }
}

/// Per-patient row of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueDetail {
    pub patient_id: String,
    pub name: String,
    pub status: PatientStatus,
    pub class: RevenueClass,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueAnalysis {
    pub total_patients: usize,
    pub total_amount: i64,
    pub achieved: RevenueTally,
    pub potential: RevenueTally,
    pub lost: RevenueTally,
    pub consultation_potential: RevenueTally,
    pub visit_management_potential: RevenueTally,
    pub consultation_lost: RevenueTally,
    pub visit_lost: RevenueTally,
    /// achieved / total amount, percent
    pub achievement_rate: f64,
    /// potential / achieved amount, percent (0 when nothing achieved)
    pub potential_growth: f64,
    /// Sorted by amount, largest first
    pub details: Vec<RevenueDetail>,
}

/// Partition a snapshot into achieved/potential/lost revenue.
pub fn classify_revenue(patients: &[Patient]) -> RevenueAnalysis {
    let mut analysis = RevenueAnalysis {
        total_patients: patients.len(),
        ..Default::default()
    };

    for patient in patients {
        let class = classify(patient);
        let amount = patient.resolved_amount();
        analysis.total_amount += amount;

        match class.bucket() {
            RevenueBucket::Achieved => analysis.achieved.add(amount),
            RevenueBucket::Potential => analysis.potential.add(amount),
            RevenueBucket::Lost => analysis.lost.add(amount),
        }
        match class {
            RevenueClass::Achieved => {}
            RevenueClass::ConsultationPotential => analysis.consultation_potential.add(amount),
            RevenueClass::VisitManagementPotential => analysis.visit_management_potential.add(amount),
            RevenueClass::ConsultationLost => analysis.consultation_lost.add(amount),
            RevenueClass::VisitLost => analysis.visit_lost.add(amount),
        }

        analysis.details.push(RevenueDetail {
            patient_id: patient.id.clone(),
            name: patient.name.clone(),
            status: patient.status,
            class,
            amount,
        });
    }

    let total = patients.len() as f64;
    for tally in [
        &mut analysis.achieved,
        &mut analysis.potential,
        &mut analysis.lost,
        &mut analysis.consultation_potential,
        &mut analysis.visit_management_potential,
        &mut analysis.consultation_lost,
        &mut analysis.visit_lost,
    ] {
        tally.percentage = percentage(tally.patients as f64, total);
    }

    analysis.achievement_rate = percentage(analysis.achieved.amount as f64, analysis.total_amount as f64);
    analysis.potential_growth = percentage(analysis.potential.amount as f64, analysis.achieved.amount as f64);

    analysis.details.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.patient_id.cmp(&b.patient_id))
    });

    analysis
}
