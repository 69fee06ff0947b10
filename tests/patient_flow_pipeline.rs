//! End-to-end specification for the flow pipeline: discharge readiness feeds
//! transfer timing, notifications reach the receiving unit once, and surge
//! assessment reads the same census.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use wardflow::domain::{
        Admission, AdmissionId, AdmissionStatus, Bed, BedId, BedStatus, CleaningPriority,
        CleaningStatus, DischargeDestination, DischargePlanning, MobilityStatus, Patient,
        PatientId, StaffId, StaffMember, StaffRole, TenantId,
    };
    use wardflow::engines::capacity::CapacityForecastEngine;
    use wardflow::engines::discharge::DischargeReadinessEngine;
    use wardflow::engines::flags::{Feature, FeatureFlagService};
    use wardflow::engines::transfer::TransferPriorityEngine;
    use wardflow::store::memory::MemoryWardStore;

    pub(super) fn tenant() -> TenantId {
        TenantId("st-anselm".to_string())
    }

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 14, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) struct Engines {
        pub store: Arc<MemoryWardStore>,
        pub discharge: DischargeReadinessEngine<MemoryWardStore>,
        pub transfer: TransferPriorityEngine<MemoryWardStore>,
        pub capacity: CapacityForecastEngine<MemoryWardStore>,
    }

    pub(super) fn engines() -> Engines {
        let store = Arc::new(MemoryWardStore::new());
        let flags = Arc::new(FeatureFlagService::new(store.clone(), Duration::minutes(5)));
        for feature in Feature::all() {
            flags
                .enable(&tenant(), feature, "integration", None, now())
                .expect("feature enables");
        }
        Engines {
            store: store.clone(),
            discharge: DischargeReadinessEngine::new(store.clone(), flags.clone()),
            transfer: TransferPriorityEngine::new(
                store.clone(),
                flags.clone(),
                Duration::minutes(15),
            ),
            capacity: CapacityForecastEngine::new(store, flags),
        }
    }

    pub(super) fn unit_bed(id: &str, unit: &str, status: BedStatus) -> Bed {
        Bed {
            id: BedId(id.to_string()),
            unit: unit.to_string(),
            isolation_capable: false,
            isolation_type: None,
            telemetry: false,
            oxygen: false,
            bariatric: false,
            distance_to_station: 6.0,
            status,
            cleaning_status: CleaningStatus::Clean,
            cleaning_priority: CleaningPriority::Routine,
            occupied_at: None,
            available_at: None,
            last_cleaned_at: None,
        }
    }

    pub(super) fn ready_patient(id: &str) -> Patient {
        Patient {
            id: PatientId(id.to_string()),
            name: format!("Patient {id}"),
            isolation_required: false,
            isolation_type: None,
            isolation_start: None,
            isolation_end: None,
            mobility_status: MobilityStatus::Ambulatory,
            pain_level: 2,
            discharge_destination: Some(DischargeDestination::Home),
            current_bed: None,
        }
    }

    pub(super) fn admission(
        id: &str,
        patient_id: &str,
        unit: &str,
        acuity: u8,
        status: AdmissionStatus,
        admitted_at: DateTime<Utc>,
    ) -> Admission {
        Admission {
            id: AdmissionId(id.to_string()),
            patient_id: PatientId(patient_id.to_string()),
            unit: unit.to_string(),
            acuity_level: acuity,
            admitted_at,
            status,
            planning: DischargePlanning {
                placement_arranged: true,
                transportation_arranged: true,
                medication_reconciliation_complete: true,
                completed_education_topics: 2,
                follow_up_scheduled: true,
            },
            transfer_started_at: None,
            discharged_at: None,
        }
    }

    pub(super) fn charge_nurse(id: &str, unit: &str) -> StaffMember {
        StaffMember {
            id: StaffId(id.to_string()),
            name: format!("Nurse {id}"),
            unit: unit.to_string(),
            role: StaffRole::Nurse,
            on_duty: true,
        }
    }
}

use chrono::Duration;

use common::*;
use wardflow::domain::{AdmissionId, AdmissionStatus, BedStatus, PredictionConfidence};
use wardflow::store::ClinicalStore;

#[test]
fn readiness_predictions_drive_transfer_timing() {
    let engines = engines();
    let tenant = tenant();
    let now = now();

    // A full medical ward: one inpatient is ready to go home.
    for index in 0..4 {
        engines.store.seed_bed(
            &tenant,
            unit_bed(&format!("4w-{index}"), "4W", BedStatus::Occupied),
        );
    }
    engines.store.seed_patient(&tenant, ready_patient("p-home"));
    engines.store.seed_admission(
        &tenant,
        admission(
            "adm-home",
            "p-home",
            "4W",
            3,
            AdmissionStatus::Active,
            now - Duration::days(2),
        ),
    );

    let prediction = engines
        .discharge
        .predict(&tenant, &AdmissionId("adm-home".to_string()), now)
        .expect("prediction computes");
    assert!(prediction.overall_score >= 90.0);
    assert_eq!(prediction.confidence, PredictionConfidence::High);

    // A critical ED boarder waits for that ward.
    engines.store.seed_patient(&tenant, ready_patient("p-ed"));
    let mut boarder = admission(
        "adm-ed",
        "p-ed",
        "4W",
        1,
        AdmissionStatus::AwaitingTransfer,
        now - Duration::hours(2),
    );
    boarder.planning.follow_up_scheduled = false;
    engines.store.seed_admission(&tenant, boarder);

    let timings = engines
        .transfer
        .optimize_timing(&tenant, Some("4W"), now)
        .expect("timings compute");
    assert_eq!(timings.len(), 1);
    // The scheduled discharge (six hours out) lands in the eight-hour bucket.
    assert_eq!(
        timings[0].estimated_bed_available,
        now + Duration::hours(8)
    );

    // Receiving-unit staff get exactly one notification per window.
    engines
        .store
        .seed_staff(&tenant, charge_nurse("rn-1", "4W"));
    let first = engines
        .transfer
        .notify_transfer(&tenant, &AdmissionId("adm-ed".to_string()), now)
        .expect("notify succeeds");
    assert_eq!(first.notifications_sent, 1);

    let duplicate = engines
        .transfer
        .notify_transfer(
            &tenant,
            &AdmissionId("adm-ed".to_string()),
            now + Duration::minutes(3),
        )
        .expect("duplicate is suppressed");
    assert!(duplicate.suppressed_as_duplicate);

    let flipped = engines
        .store
        .admission(&tenant, &AdmissionId("adm-ed".to_string()))
        .expect("admission reads")
        .expect("admission exists");
    assert_eq!(flipped.status, AdmissionStatus::TransferInProgress);
}

#[test]
fn surge_assessment_reads_the_same_census_as_forecasting() {
    let engines = engines();
    let tenant = tenant();
    let now = now();

    for index in 0..9 {
        engines.store.seed_bed(
            &tenant,
            unit_bed(&format!("icu-{index}"), "ICU", BedStatus::Occupied),
        );
    }
    engines
        .store
        .seed_bed(&tenant, unit_bed("icu-m", "ICU", BedStatus::Maintenance));

    let assessment = engines
        .capacity
        .assess_surge(&tenant, "ICU", now)
        .expect("assessment computes");
    assert!(assessment.surge_activated);
    assert!((assessment.current_level_pct - 90.0).abs() < f64::EPSILON);
    assert_eq!(assessment.activatable_beds.len(), 1);

    let forecast = engines
        .capacity
        .predict_capacity(&tenant, "ICU", 24, now)
        .expect("forecast computes");
    assert_eq!(forecast.points.len(), 4);
    // No discharges scheduled and no admission history: occupancy holds.
    assert!(forecast
        .points
        .iter()
        .all(|point| (point.predicted_occupied - 9.0).abs() < 1e-9));
}
