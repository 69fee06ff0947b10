use chrono::{Datelike, Duration};

use super::{OccupancyTrend, SurgeStatus};
use crate::domain::{
    AdmissionId, BedStatus, DailyCensus, DischargeReadinessPrediction, PatientId,
    PredictionConfidence,
};
use crate::error::EngineError;
use crate::store::PredictionStore;
use crate::testkit::{
    admission, bed, capacity_engine, enable_all_features, fixed_now, flag_service, patient, store,
    tenant,
};

fn seed_unit(store: &std::sync::Arc<crate::store::memory::MemoryWardStore>, unit: &str, total: usize, occupied: usize) {
    for index in 0..total {
        let mut seeded = bed(&format!("{unit}-{index}"), unit);
        if index < occupied {
            seeded.status = BedStatus::Occupied;
        }
        store.seed_bed(&tenant(), seeded);
    }
}

fn seed_census_days(
    store: &std::sync::Arc<crate::store::memory::MemoryWardStore>,
    unit: &str,
    days: i64,
    occupied: u32,
    capacity: u32,
    admissions: u32,
) {
    let now = fixed_now();
    for offset in 1..=days {
        store.seed_census(
            &tenant(),
            DailyCensus {
                unit: unit.to_string(),
                date: (now - Duration::days(offset)).date_naive(),
                occupied,
                capacity,
                admissions,
            },
        );
    }
}

#[test]
fn horizon_must_be_one_of_the_fixed_windows() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let error = engine
        .predict_capacity(&tenant(), "4W", 36, now)
        .expect_err("36 hours is not a valid horizon");
    assert!(matches!(error, EngineError::Validation(_)));
}

#[test]
fn checkpoint_count_matches_the_horizon() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);
    seed_unit(&store, "4W", 10, 5);

    let day = engine
        .predict_capacity(&tenant(), "4W", 24, now)
        .expect("24h forecast");
    assert_eq!(day.points.len(), 4);

    let three_days = engine
        .predict_capacity(&tenant(), "4W", 72, now)
        .expect("72h forecast");
    assert_eq!(three_days.points.len(), 12);
}

#[test]
fn forecast_subtracts_discharges_and_adds_expected_admissions() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    seed_unit(&store, "4W", 10, 5);
    seed_census_days(&store, "4W", 14, 6, 10, 2);

    // One inpatient scheduled out three hours from now.
    store.seed_patient(&tenant(), patient("p-1"));
    store.seed_admission(
        &tenant(),
        admission("adm-1", "p-1", "4W", 3, now - Duration::days(2)),
    );
    store
        .record_readiness(
            &tenant(),
            DischargeReadinessPrediction {
                admission_id: AdmissionId("adm-1".to_string()),
                patient_id: PatientId("p-1".to_string()),
                overall_score: 85.0,
                medical_score: 85.0,
                social_score: 85.0,
                barriers: Vec::new(),
                interventions: Vec::new(),
                predicted_discharge_date: now + Duration::hours(3),
                confidence: PredictionConfidence::High,
                computed_at: now,
            },
        )
        .expect("prediction records");

    let forecast = engine
        .predict_capacity(&tenant(), "4W", 24, now)
        .expect("forecast computes");

    // occupied 5 - 1 discharge + 2/day spread linearly: 0.5 at six hours.
    let first = &forecast.points[0];
    assert_eq!(first.hours_ahead, 6);
    assert!((first.predicted_occupied - 4.5).abs() < 1e-9);
    assert!((first.occupancy_rate_pct - 45.0).abs() < 1e-9);
    assert_eq!(first.confidence, PredictionConfidence::High);

    // Admission inflow keeps accumulating across checkpoints.
    let last = &forecast.points[3];
    assert_eq!(last.hours_ahead, 24);
    assert!((last.predicted_occupied - 6.0).abs() < 1e-9);
}

#[test]
fn sparse_history_degrades_to_low_confidence() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);
    seed_unit(&store, "4W", 10, 5);

    let forecast = engine
        .predict_capacity(&tenant(), "4W", 24, now)
        .expect("forecast computes without history");

    assert!(forecast
        .points
        .iter()
        .all(|point| point.confidence == PredictionConfidence::Low));
}

#[test]
fn surge_activates_at_ninety_percent() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    // Nine occupied plus one out-of-service bed: capacity ten, 90% level.
    seed_unit(&store, "ICU", 9, 9);
    let mut maintenance = bed("ICU-m1", "ICU");
    maintenance.status = BedStatus::Maintenance;
    store.seed_bed(&tenant(), maintenance);

    let assessment = engine
        .assess_surge(&tenant(), "ICU", now)
        .expect("assessment computes");

    assert!(assessment.surge_activated);
    assert!((assessment.current_level_pct - 90.0).abs() < f64::EPSILON);
    assert!((assessment.trigger_level_pct - 90.0).abs() < f64::EPSILON);
    assert_eq!(assessment.status, SurgeStatus::Activated);
    assert_eq!(assessment.activatable_beds.len(), 1);
    assert_eq!(assessment.additional_staff_needed, 1);
    assert!(assessment
        .equipment
        .iter()
        .any(|item| item == "ventilators"));
    assert!(assessment.recommendation.contains("Surge activated"));
}

#[test]
fn isolation_capable_beds_are_never_activated_for_surge() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    seed_unit(&store, "ICU", 9, 9);
    let mut iso_maintenance = crate::testkit::isolation_bed(
        "ICU-iso",
        "ICU",
        crate::domain::IsolationType::Airborne,
    );
    iso_maintenance.status = BedStatus::Maintenance;
    store.seed_bed(&tenant(), iso_maintenance);

    let assessment = engine
        .assess_surge(&tenant(), "ICU", now)
        .expect("assessment computes");

    assert!(assessment.surge_activated);
    assert!(assessment.activatable_beds.is_empty());
    assert_eq!(assessment.additional_staff_needed, 0);
}

#[test]
fn eighty_percent_occupancy_is_a_warning() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);
    seed_unit(&store, "4W", 10, 8);

    let assessment = engine
        .assess_surge(&tenant(), "4W", now)
        .expect("assessment computes");

    assert!(!assessment.surge_activated);
    assert_eq!(assessment.status, SurgeStatus::Warning);
    assert!(assessment.activatable_beds.is_empty());
}

#[test]
fn staffing_applies_shift_multipliers_and_unit_ratios() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);
    seed_unit(&store, "ICU", 8, 8);

    let recommendation = engine
        .staffing_recommendations(&tenant(), "ICU", now.date_naive(), now)
        .expect("recommendation computes");

    assert_eq!(recommendation.shifts.len(), 3);
    let day = &recommendation.shifts[0];
    // Eight expected patients at ICU ratios: 2:1 nurses, 6:1 doctors.
    assert!((day.expected_patients - 8.0).abs() < 1e-9);
    assert_eq!(day.nurses, 4);
    assert_eq!(day.doctors, 2);
    assert_eq!(day.support, 1);

    let night = &recommendation.shifts[2];
    assert!(night.expected_patients < day.expected_patients);
    assert_eq!(night.nurses, 4);
}

#[test]
fn seasonal_trend_flags_a_rising_second_half() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    // Older month around 50% occupancy, recent month around 70%.
    for offset in 31..=60 {
        store.seed_census(
            &tenant(),
            DailyCensus {
                unit: "4W".to_string(),
                date: (now - Duration::days(offset)).date_naive(),
                occupied: 5,
                capacity: 10,
                admissions: 2,
            },
        );
    }
    for offset in 1..=30 {
        store.seed_census(
            &tenant(),
            DailyCensus {
                unit: "4W".to_string(),
                date: (now - Duration::days(offset)).date_naive(),
                occupied: 7,
                capacity: 10,
                admissions: 2,
            },
        );
    }

    let analysis = engine
        .seasonal_patterns(&tenant(), 3, now)
        .expect("analysis computes");

    assert_eq!(analysis.trend, OccupancyTrend::Increasing);
    assert_eq!(analysis.busiest_weekdays.len(), 3);
    assert_eq!(analysis.quietest_weekdays.len(), 3);
    assert!(!analysis.monthly.is_empty());
    assert!(analysis
        .monthly
        .iter()
        .all(|month| (1..=12).contains(&month.month)));
    // Months actually analyzed cover the seeded range.
    let seeded_month = (now - Duration::days(10)).date_naive().month();
    assert!(analysis
        .monthly
        .iter()
        .any(|month| month.month == seeded_month));
}

#[test]
fn empty_history_yields_a_stable_trend_not_an_error() {
    let store = store();
    let flags = flag_service(&store);
    let engine = capacity_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let analysis = engine
        .seasonal_patterns(&tenant(), 6, now)
        .expect("analysis computes on empty history");

    assert_eq!(analysis.trend, OccupancyTrend::Stable);
    assert!(analysis.monthly.is_empty());
    assert!(analysis.busiest_weekdays.is_empty());
}
