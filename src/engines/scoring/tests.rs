use chrono::Duration;

use super::criteria::{score_bed, DEFAULT_WEIGHTS};
use super::{BedRequirements, RecommendationConfidence};
use crate::domain::{BedId, BedStatus, IsolationType, PatientId, StaffId};
use crate::engines::flags::Feature;
use crate::error::EngineError;
use crate::store::{AuditTrail, BedStore, ClinicalStore};
use crate::testkit::{
    bed, enable_all_features, fixed_now, flag_service, isolation_bed, nurse, patient,
    scoring_engine, store, tenant,
};

fn contact_requirements() -> BedRequirements {
    BedRequirements {
        isolation_required: true,
        isolation_type: Some(IsolationType::Contact),
        ..BedRequirements::default()
    }
}

#[test]
fn isolation_requirement_filters_out_mismatched_beds() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_bed(
        &tenant(),
        isolation_bed("bed-101", "4W", IsolationType::Contact),
    );
    store.seed_bed(&tenant(), bed("bed-102", "4W"));

    let recommendations = engine
        .recommend_beds(&tenant(), &contact_requirements(), now)
        .expect("recommendations compute");

    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].bed_id, BedId("bed-101".to_string()));
    assert!(recommendations[0].warnings.is_empty());
    assert!(recommendations[0]
        .reasons
        .iter()
        .any(|reason| reason.contains("isolation type contact matched")));
}

#[test]
fn every_returned_bed_matches_the_required_isolation_type() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_bed(
        &tenant(),
        isolation_bed("iso-c1", "4W", IsolationType::Contact),
    );
    store.seed_bed(
        &tenant(),
        isolation_bed("iso-c2", "5W", IsolationType::Contact),
    );
    store.seed_bed(
        &tenant(),
        isolation_bed("iso-d1", "4W", IsolationType::Droplet),
    );
    store.seed_bed(&tenant(), bed("plain-1", "4W"));

    let recommendations = engine
        .recommend_beds(&tenant(), &contact_requirements(), now)
        .expect("recommendations compute");

    assert!(!recommendations.is_empty());
    for recommendation in &recommendations {
        let bed = store
            .bed(&tenant(), &recommendation.bed_id)
            .expect("bed reads")
            .expect("bed exists");
        assert_eq!(bed.isolation_type, Some(IsolationType::Contact));
    }
}

#[test]
fn no_candidates_returns_an_empty_list_not_an_error() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let mut occupied = bed("bed-1", "4W");
    occupied.status = BedStatus::Occupied;
    store.seed_bed(&tenant(), occupied);

    let recommendations = engine
        .recommend_beds(&tenant(), &BedRequirements::default(), now)
        .expect("empty result is not an error");
    assert!(recommendations.is_empty());
}

#[test]
fn feature_gate_blocks_recommendations_when_disabled() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    // Only the scoring gate stays off.
    for feature in Feature::all() {
        if feature != Feature::BedScoring {
            flags
                .enable(&tenant(), feature, "fixture", None, now)
                .expect("feature enables");
        }
    }
    store.seed_bed(&tenant(), bed("bed-1", "4W"));

    let error = engine
        .recommend_beds(&tenant(), &BedRequirements::default(), now)
        .expect_err("gate is off");
    assert!(matches!(error, EngineError::FeatureDisabled { .. }));
}

#[test]
fn satisfying_an_additional_required_criterion_never_lowers_the_score() {
    let requirements = BedRequirements {
        telemetry_required: true,
        oxygen_required: true,
        ..BedRequirements::default()
    };

    let mut without_telemetry = bed("bed-a", "4W");
    without_telemetry.oxygen = true;
    let mut with_telemetry = without_telemetry.clone();
    with_telemetry.telemetry = true;

    let baseline = score_bed(&without_telemetry, &requirements, None, &DEFAULT_WEIGHTS);
    let improved = score_bed(&with_telemetry, &requirements, None, &DEFAULT_WEIGHTS);

    assert!(improved.total >= baseline.total);
    assert!(baseline
        .warnings
        .iter()
        .any(|warning| warning.contains("telemetry")));
    assert!(improved.warnings.is_empty());
}

#[test]
fn top_three_candidates_come_back_in_score_order() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let requirements = BedRequirements {
        telemetry_required: true,
        ..BedRequirements::default()
    };

    for (id, telemetry, distance) in [
        ("bed-1", true, 3.0),
        ("bed-2", true, 25.0),
        ("bed-3", true, 8.0),
        ("bed-4", true, 15.0),
    ] {
        let mut candidate = bed(id, "4W");
        candidate.telemetry = telemetry;
        candidate.distance_to_station = distance;
        store.seed_bed(&tenant(), candidate);
    }

    let recommendations = engine
        .recommend_beds(&tenant(), &requirements, now)
        .expect("recommendations compute");

    assert_eq!(recommendations.len(), 3);
    assert!(recommendations[0].score >= recommendations[1].score);
    assert!(recommendations[1].score >= recommendations[2].score);
    assert_eq!(recommendations[0].bed_id, BedId("bed-1".to_string()));
}

#[test]
fn confidence_tiers_follow_the_score() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    let mut strong = bed("bed-s", "4W");
    strong.telemetry = true;
    strong.oxygen = true;
    strong.distance_to_station = 3.0;
    store.seed_bed(&tenant(), strong);
    store.seed_staff(&tenant(), nurse("rn-1", "4W"));

    let requirements = BedRequirements {
        unit: Some("4W".to_string()),
        telemetry_required: true,
        oxygen_required: true,
        ..BedRequirements::default()
    };
    let recommendations = engine
        .recommend_beds(&tenant(), &requirements, now)
        .expect("recommendations compute");

    assert_eq!(recommendations.len(), 1);
    assert!(recommendations[0].score >= 80.0);
    assert_eq!(
        recommendations[0].confidence,
        RecommendationConfidence::High
    );
}

#[test]
fn assign_bed_flips_the_bed_and_links_the_patient() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_bed(&tenant(), bed("bed-1", "4W"));
    store.seed_patient(&tenant(), patient("p-1"));

    let assignment = engine
        .assign_bed(
            &tenant(),
            &PatientId("p-1".to_string()),
            &BedId("bed-1".to_string()),
            &StaffId("rn-9".to_string()),
            "closest telemetry-free bed",
            now,
        )
        .expect("assignment succeeds");

    assert_eq!(assignment.assigned_at, now);

    let bed = store
        .bed(&tenant(), &BedId("bed-1".to_string()))
        .expect("bed reads")
        .expect("bed exists");
    assert_eq!(bed.status, BedStatus::Occupied);
    assert_eq!(bed.occupied_at, Some(now));

    let patient = store
        .patient(&tenant(), &PatientId("p-1".to_string()))
        .expect("patient reads")
        .expect("patient exists");
    assert_eq!(patient.current_bed, Some(BedId("bed-1".to_string())));

    let ledger = store.assignments(&tenant()).expect("ledger reads");
    assert_eq!(ledger.len(), 1);

    let audit = store
        .entries_for(&tenant(), "bed-1")
        .expect("audit trail reads");
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "bed_assigned");
}

#[test]
fn assigning_an_occupied_bed_is_a_conflict() {
    let store = store();
    let flags = flag_service(&store);
    let engine = scoring_engine(&store, &flags);
    let now = fixed_now();
    enable_all_features(&flags, &tenant(), now);

    store.seed_bed(&tenant(), bed("bed-1", "4W"));
    store.seed_patient(&tenant(), patient("p-1"));
    store.seed_patient(&tenant(), patient("p-2"));

    engine
        .assign_bed(
            &tenant(),
            &PatientId("p-1".to_string()),
            &BedId("bed-1".to_string()),
            &StaffId("rn-9".to_string()),
            "first come",
            now,
        )
        .expect("first assignment succeeds");

    let error = engine
        .assign_bed(
            &tenant(),
            &PatientId("p-2".to_string()),
            &BedId("bed-1".to_string()),
            &StaffId("rn-9".to_string()),
            "second come",
            now + Duration::minutes(1),
        )
        .expect_err("bed is already taken");
    assert!(matches!(error, EngineError::Conflict { .. }));
}
