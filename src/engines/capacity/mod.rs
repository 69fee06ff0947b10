//! Bed capacity forecasting, seasonal analysis, staffing, and surge planning.
//!
//! Forecast reads degrade to low confidence or empty results on sparse
//! history rather than erroring; clinical callers always get an answer.

mod staffing;

#[cfg(test)]
mod tests;

pub use staffing::{Shift, StaffRatios};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AdmissionStatus, BedId, BedStatus, PredictionConfidence, TenantId,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::error::EngineError;
use crate::store::{BedStore, ClinicalStore, FlagStore, PredictionStore, StaffingStore};

const CHECKPOINT_HOURS: i64 = 6;
const VALID_HORIZONS: [i64; 3] = [24, 48, 72];
const SURGE_TRIGGER_PCT: f64 = 90.0;
const SURGE_WARNING_PCT: f64 = 80.0;
/// One additional staff member per this many activated surge beds.
const SURGE_BEDS_PER_STAFF: u32 = 4;
/// Days of census history consulted for the admission rate.
const ADMISSION_RATE_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityForecastPoint {
    pub hours_ahead: i64,
    pub at: DateTime<Utc>,
    pub predicted_occupied: f64,
    pub capacity: u32,
    pub occupancy_rate_pct: f64,
    pub confidence: PredictionConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityForecast {
    pub unit: String,
    pub horizon_hours: i64,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<CapacityForecastPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyTrend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOccupancy {
    /// Calendar month 1-12.
    pub month: u32,
    pub average_occupancy_pct: f64,
    pub sample_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalAnalysis {
    pub months_analyzed: u32,
    pub monthly: Vec<MonthlyOccupancy>,
    pub busiest_weekdays: Vec<String>,
    pub quietest_weekdays: Vec<String>,
    pub trend: OccupancyTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftStaffing {
    pub shift: Shift,
    pub expected_patients: f64,
    pub nurses: u32,
    pub doctors: u32,
    pub support: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingRecommendation {
    pub unit: String,
    pub date: NaiveDate,
    pub shifts: Vec<ShiftStaffing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeStatus {
    Activated,
    Warning,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeAssessment {
    pub unit: String,
    pub current_level_pct: f64,
    pub trigger_level_pct: f64,
    pub surge_activated: bool,
    pub status: SurgeStatus,
    pub activatable_beds: Vec<BedId>,
    pub additional_staff_needed: u32,
    pub equipment: Vec<String>,
    pub supplies: Vec<String>,
    pub recommendation: String,
}

pub struct CapacityForecastEngine<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
}

impl<S> CapacityForecastEngine<S>
where
    S: BedStore + ClinicalStore + PredictionStore + StaffingStore + FlagStore + 'static,
{
    pub fn new(store: Arc<S>, flags: Arc<FeatureFlagService<S>>) -> Self {
        Self { store, flags }
    }

    /// Occupancy forecast at fixed 6-hour checkpoints over a 24, 48, or 72
    /// hour horizon.
    pub fn predict_capacity(
        &self,
        tenant: &TenantId,
        unit: &str,
        horizon_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<CapacityForecast, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::CapacityForecasting, now)?;
        if !VALID_HORIZONS.contains(&horizon_hours) {
            return Err(EngineError::validation(format!(
                "forecast horizon must be one of 24, 48, or 72 hours, got {horizon_hours}"
            )));
        }

        let beds = self.store.beds_in_unit(tenant, unit)?;
        let capacity = beds.len() as u32;
        let occupied = beds
            .iter()
            .filter(|bed| bed.status == BedStatus::Occupied)
            .count() as f64;

        // Discharges scheduled from readiness predictions for this unit.
        let mut scheduled: Vec<DateTime<Utc>> = Vec::new();
        for prediction in self.store.latest_readiness_for_tenant(tenant)? {
            if prediction.overall_score < 70.0 {
                continue;
            }
            let Some(admission) = self.store.admission(tenant, &prediction.admission_id)? else {
                continue;
            };
            if admission.unit == unit && admission.status == AdmissionStatus::Active {
                scheduled.push(prediction.predicted_discharge_date);
            }
        }

        // Expected admissions from the historical daily rate, spread linearly
        // across the horizon.
        let since = (now - Duration::days(ADMISSION_RATE_LOOKBACK_DAYS)).date_naive();
        let history = self.store.census_history(tenant, Some(unit), since)?;
        let history_days = history.len();
        let daily_admission_rate = if history_days == 0 {
            0.0
        } else {
            history.iter().map(|day| day.admissions as f64).sum::<f64>() / history_days as f64
        };
        let total_expected_admissions = daily_admission_rate * horizon_hours as f64 / 24.0;

        let mut points = Vec::new();
        let mut hours = CHECKPOINT_HOURS;
        while hours <= horizon_hours {
            let at = now + Duration::hours(hours);
            let discharges = scheduled.iter().filter(|date| **date <= at).count() as f64;
            let fraction = hours as f64 / horizon_hours as f64;
            let expected_admissions = total_expected_admissions * fraction;
            let predicted_occupied = (occupied - discharges + expected_admissions).max(0.0);
            let occupancy_rate_pct = if capacity == 0 {
                0.0
            } else {
                predicted_occupied / capacity as f64 * 100.0
            };

            let confidence = if history_days >= 14 && hours <= 24 {
                PredictionConfidence::High
            } else if history_days >= 7 && hours <= 48 {
                PredictionConfidence::Medium
            } else {
                PredictionConfidence::Low
            };

            points.push(CapacityForecastPoint {
                hours_ahead: hours,
                at,
                predicted_occupied,
                capacity,
                occupancy_rate_pct,
                confidence,
            });
            hours += CHECKPOINT_HOURS;
        }

        Ok(CapacityForecast {
            unit: unit.to_string(),
            horizon_hours,
            generated_at: now,
            points,
        })
    }

    /// Group historical daily occupancy by calendar month and classify the
    /// overall trend. Sparse history yields an empty analysis, not an error.
    pub fn seasonal_patterns(
        &self,
        tenant: &TenantId,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<SeasonalAnalysis, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::CapacityForecasting, now)?;

        let since = (now - Duration::days(months as i64 * 30)).date_naive();
        let mut history = self.store.census_history(tenant, None, since)?;
        history.sort_by_key(|day| day.date);

        let occupancy_pct = |occupied: u32, capacity: u32| {
            if capacity == 0 {
                0.0
            } else {
                occupied as f64 / capacity as f64 * 100.0
            }
        };

        let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut by_weekday: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
        for day in &history {
            let pct = occupancy_pct(day.occupied, day.capacity);
            by_month.entry(day.date.month()).or_default().push(pct);
            by_weekday
                .entry(day.date.weekday().num_days_from_monday() as u8)
                .or_default()
                .push(pct);
        }

        let monthly: Vec<MonthlyOccupancy> = by_month
            .into_iter()
            .map(|(month, samples)| MonthlyOccupancy {
                month,
                average_occupancy_pct: samples.iter().sum::<f64>() / samples.len() as f64,
                sample_days: samples.len(),
            })
            .collect();

        let mut weekday_averages: Vec<(Weekday, f64)> = by_weekday
            .into_iter()
            .map(|(weekday, samples)| {
                (
                    Weekday::try_from(weekday).expect("weekday ordinal is 0..=6"),
                    samples.iter().sum::<f64>() / samples.len() as f64,
                )
            })
            .collect();
        weekday_averages.sort_by(|a, b| b.1.total_cmp(&a.1));
        let busiest_weekdays: Vec<String> = weekday_averages
            .iter()
            .take(3)
            .map(|(weekday, _)| weekday.to_string())
            .collect();
        let quietest_weekdays: Vec<String> = weekday_averages
            .iter()
            .rev()
            .take(3)
            .map(|(weekday, _)| weekday.to_string())
            .collect();

        // First-half vs second-half occupancy at a 10% threshold.
        let trend = if history.len() < 2 {
            OccupancyTrend::Stable
        } else {
            let midpoint = history.len() / 2;
            let half_average = |days: &[crate::domain::DailyCensus]| {
                days.iter()
                    .map(|day| occupancy_pct(day.occupied, day.capacity))
                    .sum::<f64>()
                    / days.len() as f64
            };
            let first = half_average(&history[..midpoint]);
            let second = half_average(&history[midpoint..]);
            if first <= f64::EPSILON {
                OccupancyTrend::Stable
            } else if second > first * 1.10 {
                OccupancyTrend::Increasing
            } else if second < first * 0.90 {
                OccupancyTrend::Decreasing
            } else {
                OccupancyTrend::Stable
            }
        };

        Ok(SeasonalAnalysis {
            months_analyzed: months,
            monthly,
            busiest_weekdays,
            quietest_weekdays,
            trend,
        })
    }

    /// Per-shift staffing for a date, derived from the forecast point nearest
    /// each shift start with the shift multiplier applied, divided by the
    /// unit's ratios and rounded up.
    pub fn staffing_recommendations(
        &self,
        tenant: &TenantId,
        unit: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<StaffingRecommendation, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::CapacityForecasting, now)?;

        // Smallest valid horizon covering the latest shift of the date.
        let latest_shift = Utc
            .from_utc_datetime(&date.and_hms_opt(23, 0, 0).unwrap_or_default());
        let hours_out = (latest_shift - now).num_hours().max(0);
        let horizon = VALID_HORIZONS
            .iter()
            .copied()
            .find(|hours| *hours >= hours_out)
            .unwrap_or(72);
        let forecast = self.predict_capacity(tenant, unit, horizon, now)?;

        let ratios = staffing::ratios_for_unit(unit);
        let mut shifts = Vec::new();
        for shift in Shift::ordered() {
            let shift_start = Utc.from_utc_datetime(
                &date
                    .and_hms_opt(shift.start_hour(), 0, 0)
                    .unwrap_or_default(),
            );
            let nearest = forecast.points.iter().min_by_key(|point| {
                (point.at - shift_start).num_minutes().abs()
            });
            let base_census = nearest
                .map(|point| point.predicted_occupied)
                .unwrap_or(0.0);
            let expected_patients = base_census * shift.multiplier();

            shifts.push(ShiftStaffing {
                shift,
                expected_patients,
                nurses: (expected_patients / ratios.patients_per_nurse).ceil() as u32,
                doctors: (expected_patients / ratios.patients_per_doctor).ceil() as u32,
                support: (expected_patients / ratios.patients_per_support).ceil() as u32,
            });
        }

        Ok(StaffingRecommendation {
            unit: unit.to_string(),
            date,
            shifts,
        })
    }

    /// Surge assessment: triggers at 90% occupancy, enumerating activatable
    /// out-of-service non-isolation beds and proportional staff.
    pub fn assess_surge(
        &self,
        tenant: &TenantId,
        unit: &str,
        now: DateTime<Utc>,
    ) -> Result<SurgeAssessment, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::CapacityForecasting, now)?;

        let beds = self.store.beds_in_unit(tenant, unit)?;
        let capacity = beds.len() as u32;
        let occupied = beds
            .iter()
            .filter(|bed| bed.status == BedStatus::Occupied)
            .count() as u32;
        let current_level_pct = if capacity == 0 {
            0.0
        } else {
            occupied as f64 / capacity as f64 * 100.0
        };

        let surge_activated = current_level_pct >= SURGE_TRIGGER_PCT;
        let status = if surge_activated {
            SurgeStatus::Activated
        } else if current_level_pct >= SURGE_WARNING_PCT {
            SurgeStatus::Warning
        } else {
            SurgeStatus::Normal
        };

        let (activatable_beds, additional_staff_needed, equipment, supplies) = if surge_activated {
            let activatable: Vec<BedId> = beds
                .iter()
                .filter(|bed| {
                    matches!(bed.status, BedStatus::Maintenance | BedStatus::Reserved)
                        && !bed.isolation_capable
                })
                .map(|bed| bed.id.clone())
                .collect();
            let staff = (activatable.len() as u32).div_ceil(SURGE_BEDS_PER_STAFF);
            let (equipment, supplies) = staffing::surge_equipment_for_unit(unit);
            (activatable, staff, equipment, supplies)
        } else {
            (Vec::new(), 0, Vec::new(), Vec::new())
        };

        let recommendation = match status {
            SurgeStatus::Activated => format!(
                "Surge activated at {current_level_pct:.1}% occupancy: open {} out-of-service bed(s) and call in {} additional staff",
                activatable_beds.len(),
                additional_staff_needed
            ),
            SurgeStatus::Warning => format!(
                "Occupancy {current_level_pct:.1}% approaching the surge trigger; review pending discharges"
            ),
            SurgeStatus::Normal => {
                format!("Occupancy {current_level_pct:.1}% within normal operating range")
            }
        };

        Ok(SurgeAssessment {
            unit: unit.to_string(),
            current_level_pct,
            trigger_level_pct: SURGE_TRIGGER_PCT,
            surge_activated,
            status,
            activatable_beds,
            additional_staff_needed,
            equipment,
            supplies,
            recommendation,
        })
    }
}
