//! Region, channel and funnel-progress breakdowns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::percentage;
use crate::models::{Patient, PatientStatus};

pub const UNKNOWN_REGION: &str = "지역정보 없음";
pub const UNKNOWN_CHANNEL: &str = "유입경로 정보 없음";

const AREA_CODES: [(&str, &str); 16] = [
    ("031", "경기도"),
    ("032", "인천광역시"),
    ("033", "강원도"),
    ("041", "충청남도"),
    ("042", "대전광역시"),
    ("043", "충청북도"),
    ("044", "세종특별자치시"),
    ("051", "부산광역시"),
    ("052", "울산광역시"),
    ("053", "대구광역시"),
    ("054", "경상북도"),
    ("055", "경상남도"),
    ("061", "전라남도"),
    ("062", "광주광역시"),
    ("063", "전라북도"),
    ("064", "제주특별자치도"),
];

/// Province of a landline number. Mobile numbers carry no region.
pub fn region_from_phone(phone: &str) -> Option<&'static str> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with("010") {
        return None;
    }
    if let Some((_, region)) = AREA_CODES.iter().find(|(code, _)| digits.starts_with(code)) {
        return Some(*region);
    }
    if digits.starts_with("02") {
        return Some("서울특별시");
    }
    None
}

/// Recorded region, else the one implied by the phone number.
pub fn patient_region(patient: &Patient) -> String {
    match patient.region.as_deref().map(str::trim) {
        Some(region) if !region.is_empty() => region.to_string(),
        _ => region_from_phone(&patient.phone)
            .unwrap_or(UNKNOWN_REGION)
            .to_string(),
    }
}

pub fn patient_channel(patient: &Patient) -> String {
    match patient.source.as_deref().map(str::trim) {
        Some(source) if !source.is_empty() => source.to_string(),
        _ => UNKNOWN_CHANNEL.to_string(),
    }
}

/// A labelled count and its share of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShareStat {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Count labels, largest first (ties by label), optionally truncated.
pub fn share_breakdown<I>(labels: I, total: usize, limit: Option<usize>) -> Vec<ShareStat>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut stats: Vec<ShareStat> = counts
        .into_iter()
        .map(|(label, count)| ShareStat {
            percentage: percentage(count as f64, total as f64),
            label,
            count,
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    if let Some(limit) = limit {
        stats.truncate(limit);
    }
    stats
}

/// Cumulative funnel counts: every stage a patient passed through counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub consulting: usize,
    pub reserved: usize,
    pub visited: usize,
    pub treatment_booked: usize,
    pub treatment: usize,
    pub completed: usize,
    pub followup: usize,
    pub closed: usize,
}

impl ProgressStats {
    fn slot(&mut self, status: PatientStatus) -> &mut usize {
        match status {
            PatientStatus::Consulting => &mut self.consulting,
            PatientStatus::Reserved => &mut self.reserved,
            PatientStatus::Visited => &mut self.visited,
            PatientStatus::TreatmentBooked => &mut self.treatment_booked,
            PatientStatus::Treatment => &mut self.treatment,
            PatientStatus::Completed => &mut self.completed,
            PatientStatus::Followup => &mut self.followup,
            PatientStatus::Closed => &mut self.closed,
        }
    }

    pub fn get(&self, status: PatientStatus) -> usize {
        match status {
            PatientStatus::Consulting => self.consulting,
            PatientStatus::Reserved => self.reserved,
            PatientStatus::Visited => self.visited,
            PatientStatus::TreatmentBooked => self.treatment_booked,
            PatientStatus::Treatment => self.treatment,
            PatientStatus::Completed => self.completed,
            PatientStatus::Followup => self.followup,
            PatientStatus::Closed => self.closed,
        }
    }
}

/// Open patients count up to their current stage; closed patients count up
/// to the furthest stage they reached, plus closed.
pub fn progress_stats(patients: &[Patient]) -> ProgressStats {
    let mut stats = ProgressStats::default();
    for patient in patients {
        let reached = if patient.status == PatientStatus::Closed {
            *stats.slot(PatientStatus::Closed) += 1;
            patient.furthest_stage()
        } else {
            patient.status
        };
        let rank = reached.funnel_rank().unwrap_or(0);
        for stage in &PatientStatus::FUNNEL_ORDER[..=rank] {
            *stats.slot(*stage) += 1;
        }
    }
    stats
}
