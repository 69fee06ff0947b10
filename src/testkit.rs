//! Shared fixtures for engine tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{
    Admission, AdmissionId, AdmissionStatus, Bed, BedId, BedStatus, CleaningPriority,
    CleaningStatus, DischargeDestination, DischargePlanning, IsolationType, MobilityStatus,
    Patient, PatientId, StaffId, StaffMember, StaffRole, TenantId,
};
use crate::engines::capacity::CapacityForecastEngine;
use crate::engines::discharge::DischargeReadinessEngine;
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::engines::isolation::IsolationEngine;
use crate::engines::scoring::BedScoringEngine;
use crate::engines::transfer::TransferPriorityEngine;
use crate::engines::turnover::TurnoverTracker;
use crate::store::memory::MemoryWardStore;

pub(crate) fn tenant() -> TenantId {
    TenantId("mercy-general".to_string())
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn store() -> Arc<MemoryWardStore> {
    Arc::new(MemoryWardStore::new())
}

pub(crate) fn flag_service(store: &Arc<MemoryWardStore>) -> Arc<FeatureFlagService<MemoryWardStore>> {
    Arc::new(FeatureFlagService::new(store.clone(), Duration::minutes(5)))
}

/// Enable every gated capability for the fixture tenant.
pub(crate) fn enable_all_features(
    flags: &FeatureFlagService<MemoryWardStore>,
    tenant: &TenantId,
    now: DateTime<Utc>,
) {
    for feature in Feature::all() {
        flags
            .enable(tenant, feature, "fixture", None, now)
            .expect("feature enables");
    }
}

pub(crate) fn isolation_engine(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> Arc<IsolationEngine<MemoryWardStore>> {
    Arc::new(IsolationEngine::new(store.clone(), flags.clone(), 30))
}

pub(crate) fn scoring_engine(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> BedScoringEngine<MemoryWardStore> {
    BedScoringEngine::new(store.clone(), flags.clone(), isolation_engine(store, flags))
}

pub(crate) fn discharge_engine(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> DischargeReadinessEngine<MemoryWardStore> {
    DischargeReadinessEngine::new(store.clone(), flags.clone())
}

pub(crate) fn transfer_engine(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> TransferPriorityEngine<MemoryWardStore> {
    TransferPriorityEngine::new(store.clone(), flags.clone(), Duration::minutes(15))
}

pub(crate) fn capacity_engine(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> CapacityForecastEngine<MemoryWardStore> {
    CapacityForecastEngine::new(store.clone(), flags.clone())
}

pub(crate) fn turnover_tracker(
    store: &Arc<MemoryWardStore>,
    flags: &Arc<FeatureFlagService<MemoryWardStore>>,
) -> TurnoverTracker<MemoryWardStore> {
    TurnoverTracker::new(store.clone(), flags.clone())
}

pub(crate) fn bed(id: &str, unit: &str) -> Bed {
    Bed {
        id: BedId(id.to_string()),
        unit: unit.to_string(),
        isolation_capable: false,
        isolation_type: None,
        telemetry: false,
        oxygen: false,
        bariatric: false,
        distance_to_station: 8.0,
        status: BedStatus::Available,
        cleaning_status: CleaningStatus::Clean,
        cleaning_priority: CleaningPriority::Routine,
        occupied_at: None,
        available_at: None,
        last_cleaned_at: None,
    }
}

pub(crate) fn isolation_bed(id: &str, unit: &str, isolation_type: IsolationType) -> Bed {
    Bed {
        isolation_capable: true,
        isolation_type: Some(isolation_type),
        ..bed(id, unit)
    }
}

pub(crate) fn patient(id: &str) -> Patient {
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

/// Planning checklist with every item complete.
pub(crate) fn ready_planning() -> DischargePlanning {
    DischargePlanning {
        placement_arranged: true,
        transportation_arranged: true,
        medication_reconciliation_complete: true,
        completed_education_topics: 2,
        follow_up_scheduled: true,
    }
}

pub(crate) fn admission(
    id: &str,
    patient_id: &str,
    unit: &str,
    acuity_level: u8,
    admitted_at: DateTime<Utc>,
) -> Admission {
    Admission {
        id: AdmissionId(id.to_string()),
        patient_id: PatientId(patient_id.to_string()),
        unit: unit.to_string(),
        acuity_level,
        admitted_at,
        status: AdmissionStatus::Active,
        planning: ready_planning(),
        transfer_started_at: None,
        discharged_at: None,
    }
}

pub(crate) fn nurse(id: &str, unit: &str) -> StaffMember {
    StaffMember {
        id: StaffId(id.to_string()),
        name: format!("Nurse {id}"),
        unit: unit.to_string(),
        role: StaffRole::Nurse,
        on_duty: true,
    }
}
