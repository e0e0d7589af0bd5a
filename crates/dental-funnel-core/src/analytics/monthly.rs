//! Monthly funnel statistics with period-over-period change indicators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    build_narrative, classify_revenue, patient_channel, patient_region, percentage, progress_stats,
    round1, share_breakdown, PatientNarrative, ProgressStats, RevenueAnalysis, ShareStat, StatsError,
    StatsResult,
};
use crate::dates;
use crate::db::Database;
use crate::models::{ConsultationType, LeadStatus, Patient, PatientStatus};

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 9999;

/// Inclusive calendar-month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    pub fn start_str(&self) -> String {
        dates::format_date(self.start)
    }

    pub fn end_str(&self) -> String {
        dates::format_date(self.end)
    }

    pub fn previous(&self) -> StatsResult<MonthRange> {
        let (year, month) = dates::previous_month(self.year, self.month);
        month_range(year, month)
    }
}

/// `YYYY-MM-01` through the month's last day.
pub fn month_range(year: i32, month: u32) -> StatsResult<MonthRange> {
    if !(1..=12).contains(&month) {
        return Err(StatsError::InvalidRange(format!("month must be 1-12, got {}", month)));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(StatsError::InvalidRange(format!("year out of range: {}", year)));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| StatsError::InvalidRange(format!("{}-{:02}", year, month)))?;
    let end = dates::last_day_of_month(year, month)
        .ok_or_else(|| StatsError::InvalidRange(format!("{}-{:02}", year, month)))?;
    Ok(MonthRange {
        year,
        month,
        start,
        end,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increase,
    Decrease,
}

/// Month-over-month change of one metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChangeIndicator {
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: ChangeType,
}

pub fn change_indicator(current: f64, previous: f64) -> ChangeIndicator {
    let kind_of = |delta: f64| {
        if delta >= 0.0 {
            ChangeType::Increase
        } else {
            ChangeType::Decrease
        }
    };

    if previous == 0.0 {
        return ChangeIndicator {
            value: current,
            kind: kind_of(current),
        };
    }
    let delta = current - previous;
    ChangeIndicator {
        value: round1(delta.abs()),
        kind: kind_of(delta),
    }
}

/// Funnel metrics of one month's leads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthlyStats {
    pub total_inquiries: usize,
    pub inbound_calls: usize,
    pub outbound_calls: usize,
    pub returning_calls: usize,
    pub appointment_patients: usize,
    pub appointment_rate: f64,
    pub visited_patients: usize,
    pub visit_rate: f64,
    pub treatment_started_patients: usize,
    pub total_treatment_amount: i64,
    pub payment_rate: f64,
    pub paid_patients: usize,
    pub paid_amount: i64,
    /// 0 when no patient has an age
    pub average_age: f64,
    pub region_stats: Vec<ShareStat>,
    pub channel_stats: Vec<ShareStat>,
    pub progress_stats: ProgressStats,
}

fn has_appointment(patient: &Patient) -> bool {
    patient.has_reached(PatientStatus::Reserved)
        || matches!(patient.lead_status, LeadStatus::Reserved | LeadStatus::ReReserved)
}

fn has_visited(patient: &Patient) -> bool {
    patient.visit_confirmed || patient.has_reached(PatientStatus::Visited)
}

/// Aggregate one snapshot.
pub fn compute_stats(patients: &[Patient], top_region_limit: usize) -> MonthlyStats {
    let total = patients.len();
    let count = |pred: &dyn Fn(&Patient) -> bool| patients.iter().filter(|p| pred(p)).count();

    let inbound_calls = count(&|p| p.consultation_type == ConsultationType::Inbound);
    let outbound_calls = count(&|p| p.consultation_type == ConsultationType::Outbound);
    let returning_calls = count(&|p| p.consultation_type == ConsultationType::Returning);
    let appointment_patients = count(&has_appointment);
    let visited_patients = count(&has_visited);

    let started: Vec<&Patient> = patients.iter().filter(|p| p.is_treatment_started()).collect();
    let total_treatment_amount: i64 = started.iter().map(|p| p.resolved_amount()).sum();

    let paid: Vec<&Patient> = patients.iter().filter(|p| p.payment_status.is_paid()).collect();
    let paid_amount: i64 = paid.iter().map(|p| p.actual_amount).sum();

    let ages: Vec<u32> = patients.iter().filter_map(|p| p.age).filter(|age| *age > 0).collect();
    let average_age = if ages.is_empty() {
        0.0
    } else {
        round1(ages.iter().map(|a| f64::from(*a)).sum::<f64>() / ages.len() as f64)
    };

    let whole = total as f64;
    MonthlyStats {
        total_inquiries: total,
        inbound_calls,
        outbound_calls,
        returning_calls,
        appointment_patients,
        appointment_rate: percentage(appointment_patients as f64, whole),
        visited_patients,
        visit_rate: percentage(visited_patients as f64, whole),
        treatment_started_patients: started.len(),
        total_treatment_amount,
        payment_rate: percentage(started.len() as f64, whole),
        paid_patients: paid.len(),
        paid_amount,
        average_age,
        region_stats: share_breakdown(patients.iter().map(patient_region), total, Some(top_region_limit)),
        channel_stats: share_breakdown(patients.iter().map(patient_channel), total, None),
        progress_stats: progress_stats(patients),
    }
}

/// Change indicators of the headline metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyChanges {
    pub total_inquiries: ChangeIndicator,
    pub inbound_calls: ChangeIndicator,
    pub outbound_calls: ChangeIndicator,
    pub returning_calls: ChangeIndicator,
    pub appointment_patients: ChangeIndicator,
    pub appointment_rate: ChangeIndicator,
    pub visited_patients: ChangeIndicator,
    pub visit_rate: ChangeIndicator,
    pub treatment_started_patients: ChangeIndicator,
    pub total_treatment_amount: ChangeIndicator,
    pub payment_rate: ChangeIndicator,
    pub paid_amount: ChangeIndicator,
}

impl MonthlyChanges {
    pub fn between(current: &MonthlyStats, previous: &MonthlyStats) -> Self {
        let n = |c: usize, p: usize| change_indicator(c as f64, p as f64);
        let amount = |c: i64, p: i64| change_indicator(c as f64, p as f64);
        Self {
            total_inquiries: n(current.total_inquiries, previous.total_inquiries),
            inbound_calls: n(current.inbound_calls, previous.inbound_calls),
            outbound_calls: n(current.outbound_calls, previous.outbound_calls),
            returning_calls: n(current.returning_calls, previous.returning_calls),
            appointment_patients: n(current.appointment_patients, previous.appointment_patients),
            appointment_rate: change_indicator(current.appointment_rate, previous.appointment_rate),
            visited_patients: n(current.visited_patients, previous.visited_patients),
            visit_rate: change_indicator(current.visit_rate, previous.visit_rate),
            treatment_started_patients: n(
                current.treatment_started_patients,
                previous.treatment_started_patients,
            ),
            total_treatment_amount: amount(current.total_treatment_amount, previous.total_treatment_amount),
            payment_rate: change_indicator(current.payment_rate, previous.payment_rate),
            paid_amount: amount(current.paid_amount, previous.paid_amount),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub start_date: String,
    pub end_date: String,
    pub current: MonthlyStats,
    pub previous: MonthlyStats,
    pub changes: MonthlyChanges,
    pub revenue: RevenueAnalysis,
    pub narratives: Vec<PatientNarrative>,
}

/// Builds monthly reports from the patient store.
pub struct MonthlyStatsAggregator<'a> {
    db: &'a Database,
    top_region_limit: usize,
}

impl<'a> MonthlyStatsAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            top_region_limit: 5,
        }
    }

    pub fn with_top_region_limit(mut self, limit: usize) -> Self {
        self.top_region_limit = limit;
        self
    }

    /// Statistics for the leads first contacted in `year`/`month`, compared
    /// with the month before.
    pub fn compute(&self, year: i32, month: u32) -> StatsResult<MonthlyReport> {
        let range = month_range(year, month)?;
        let previous_range = range.previous()?;

        let current_patients = self
            .db
            .list_patients_called_in(&range.start_str(), &range.end_str())?;
        let previous_patients = self
            .db
            .list_patients_called_in(&previous_range.start_str(), &previous_range.end_str())?;

        let current = compute_stats(&current_patients, self.top_region_limit);
        let previous = compute_stats(&previous_patients, self.top_region_limit);
        let changes = MonthlyChanges::between(&current, &previous);

        info!(
            year,
            month,
            current = current.total_inquiries,
            previous = previous.total_inquiries,
            "computed monthly statistics"
        );

        Ok(MonthlyReport {
            year,
            month,
            start_date: range.start_str(),
            end_date: range.end_str(),
            revenue: classify_revenue(&current_patients),
            narratives: current_patients.iter().map(build_narrative).collect(),
            current,
            previous,
            changes,
        })
    }
}
