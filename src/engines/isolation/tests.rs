use chrono::Duration;

use crate::domain::{
    BedStatus, Diagnosis, IsolationType, LabResult, PatientId,
};
use crate::error::EngineError;
use crate::store::ClinicalStore;
use crate::testkit::{
    bed, enable_all_features, fixed_now, flag_service, isolation_bed, isolation_engine, patient,
    store, tenant,
};

fn diagnosis(patient_id: &str, code: &str) -> Diagnosis {
    Diagnosis {
        patient_id: PatientId(patient_id.to_string()),
        code: code.to_string(),
        description: format!("charted {code}"),
        recorded_at: fixed_now() - Duration::days(2),
    }
}

fn positive_lab(patient_id: &str, test_name: &str, result_text: &str) -> LabResult {
    LabResult {
        patient_id: PatientId(patient_id.to_string()),
        test_name: test_name.to_string(),
        result_text: result_text.to_string(),
        positive: true,
        pending: false,
        collected_at: fixed_now() - Duration::days(1),
    }
}

#[test]
fn c_difficile_diagnosis_maps_to_contact_isolation() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_patient(&tenant(), patient("p-1"));
    store.seed_diagnosis(&tenant(), diagnosis("p-1", "A04.7"));

    let assessment = engine
        .check_requirements(&tenant(), &PatientId("p-1".to_string()), now)
        .expect("assessment computes");

    assert!(assessment.isolation_required);
    assert_eq!(assessment.isolation_type, Some(IsolationType::Contact));

    let persisted = store
        .patient(&tenant(), &PatientId("p-1".to_string()))
        .expect("patient reads")
        .expect("patient exists");
    assert!(persisted.isolation_required);
    assert_eq!(persisted.isolation_type, Some(IsolationType::Contact));
    assert_eq!(persisted.isolation_start, Some(now));
}

#[test]
fn airborne_wins_when_multiple_categories_match() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_patient(&tenant(), patient("p-2"));
    store.seed_diagnosis(&tenant(), diagnosis("p-2", "A04.7"));
    store.seed_lab_result(
        &tenant(),
        positive_lab("p-2", "AFB culture", "Mycobacterium tuberculosis isolated"),
    );

    let assessment = engine
        .check_requirements(&tenant(), &PatientId("p-2".to_string()), now)
        .expect("assessment computes");

    assert_eq!(assessment.isolation_type, Some(IsolationType::Airborne));
    assert!(assessment
        .matched_categories
        .contains(&IsolationType::Contact));
    assert!(assessment
        .matched_categories
        .contains(&IsolationType::Airborne));
}

#[test]
fn negative_lab_results_never_trigger_isolation() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_patient(&tenant(), patient("p-3"));
    let mut lab = positive_lab("p-3", "MRSA screen", "MRSA not detected");
    lab.positive = false;
    store.seed_lab_result(&tenant(), lab);

    let assessment = engine
        .check_requirements(&tenant(), &PatientId("p-3".to_string()), now)
        .expect("assessment computes");
    assert!(!assessment.isolation_required);
    assert_eq!(assessment.isolation_type, None);
}

#[test]
fn repeated_checks_keep_the_original_start_date() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_patient(&tenant(), patient("p-4"));
    store.seed_diagnosis(&tenant(), diagnosis("p-4", "A04.7"));

    engine
        .check_requirements(&tenant(), &PatientId("p-4".to_string()), now)
        .expect("first assessment");
    engine
        .check_requirements(
            &tenant(),
            &PatientId("p-4".to_string()),
            now + Duration::hours(6),
        )
        .expect("second assessment");

    let persisted = store
        .patient(&tenant(), &PatientId("p-4".to_string()))
        .expect("patient reads")
        .expect("patient exists");
    assert_eq!(persisted.isolation_start, Some(now));
}

#[test]
fn validate_rejects_cross_category_substitution() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let mut contact_patient = patient("p-5");
    contact_patient.isolation_required = true;
    contact_patient.isolation_type = Some(IsolationType::Contact);
    store.seed_patient(&tenant(), contact_patient);
    store.seed_bed(
        &tenant(),
        isolation_bed("bed-d1", "4W", IsolationType::Droplet),
    );

    let error = engine
        .validate_bed_assignment(
            &tenant(),
            &PatientId("p-5".to_string()),
            &crate::domain::BedId("bed-d1".to_string()),
        )
        .expect_err("droplet bed cannot take a contact patient");
    assert!(matches!(error, EngineError::Validation(_)));
}

#[test]
fn validate_rejects_an_unavailable_bed() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_patient(&tenant(), patient("p-6"));
    let mut occupied = bed("bed-o1", "4W");
    occupied.status = BedStatus::Occupied;
    store.seed_bed(&tenant(), occupied);

    let error = engine
        .validate_bed_assignment(
            &tenant(),
            &PatientId("p-6".to_string()),
            &crate::domain::BedId("bed-o1".to_string()),
        )
        .expect_err("occupied bed is rejected");
    assert!(matches!(error, EngineError::Conflict { .. }));
}

#[test]
fn clear_isolation_requires_reason_and_stamps_end_date() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let mut isolated = patient("p-7");
    isolated.isolation_required = true;
    isolated.isolation_type = Some(IsolationType::Contact);
    isolated.isolation_start = Some(now - Duration::days(3));
    store.seed_patient(&tenant(), isolated);

    let error = engine
        .clear_isolation(&tenant(), &PatientId("p-7".to_string()), "", "dr-lane", now)
        .expect_err("blank reason is rejected");
    assert!(matches!(error, EngineError::Validation(_)));

    engine
        .clear_isolation(
            &tenant(),
            &PatientId("p-7".to_string()),
            "two negative cultures",
            "dr-lane",
            now,
        )
        .expect("isolation clears");

    let persisted = store
        .patient(&tenant(), &PatientId("p-7".to_string()))
        .expect("patient reads")
        .expect("patient exists");
    assert!(!persisted.isolation_required);
    assert_eq!(persisted.isolation_type, None);
    assert_eq!(persisted.isolation_end, Some(now));
}

#[test]
fn room_availability_rolls_up_by_unit_and_type() {
    let store = store();
    let flags = flag_service(&store);
    let engine = isolation_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_bed(
        &tenant(),
        isolation_bed("iso-1", "ICU", IsolationType::Airborne),
    );
    let mut occupied = isolation_bed("iso-2", "ICU", IsolationType::Airborne);
    occupied.status = BedStatus::Occupied;
    store.seed_bed(&tenant(), occupied);
    store.seed_bed(
        &tenant(),
        isolation_bed("iso-3", "4W", IsolationType::Contact),
    );
    // Plain beds never appear in the rollup.
    store.seed_bed(&tenant(), bed("plain-1", "4W"));

    let rollup = engine
        .room_availability(&tenant(), now)
        .expect("rollup computes");

    assert_eq!(rollup.len(), 2);
    let icu = rollup
        .iter()
        .find(|entry| entry.unit == "ICU")
        .expect("ICU entry present");
    assert_eq!(icu.available, 1);
    assert_eq!(icu.occupied, 1);
    assert!((icu.utilization_pct - 50.0).abs() < f64::EPSILON);
}
