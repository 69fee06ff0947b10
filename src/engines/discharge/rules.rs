use std::collections::BTreeSet;

use crate::domain::{
    BarrierCategory, BarrierKind, BarrierSeverity, DischargeBarrier, DischargeDestination,
    DischargePlanning, MobilityStatus,
};

/// Medical readiness deductions. The score starts at 100 and each triggered
/// condition subtracts its deduction, with per-condition caps.
#[derive(Debug, Clone, Copy)]
pub struct MedicalDeductions {
    pub unstable_vitals: f64,
    pub pending_lab: f64,
    pub pending_lab_cap: f64,
    pub monitored_medication: f64,
    pub monitored_medication_cap: f64,
    pub bedbound: f64,
    pub wheelchair: f64,
    pub severe_pain: f64,
}

pub const MEDICAL_DEDUCTIONS: MedicalDeductions = MedicalDeductions {
    unstable_vitals: 30.0,
    pending_lab: 5.0,
    pending_lab_cap: 20.0,
    monitored_medication: 10.0,
    monitored_medication_cap: 30.0,
    bedbound: 20.0,
    wheelchair: 10.0,
    severe_pain: 15.0,
};

/// Social readiness deductions.
#[derive(Debug, Clone, Copy)]
pub struct SocialDeductions {
    pub no_destination: f64,
    pub snf_placement_unarranged: f64,
    pub home_health_unarranged: f64,
    pub transportation_unarranged: f64,
    pub medication_reconciliation: f64,
    pub education_incomplete: f64,
    pub no_follow_up: f64,
}

pub const SOCIAL_DEDUCTIONS: SocialDeductions = SocialDeductions {
    no_destination: 40.0,
    snf_placement_unarranged: 30.0,
    home_health_unarranged: 25.0,
    transportation_unarranged: 15.0,
    medication_reconciliation: 20.0,
    education_incomplete: 15.0,
    no_follow_up: 10.0,
};

/// Education topics a patient must complete before discharge counts as ready.
pub const REQUIRED_EDUCATION_TOPICS: u8 = 2;
/// Pain above this level blocks medical readiness.
pub const SEVERE_PAIN_THRESHOLD: u8 = 7;

/// Readiness band: hours until discharge implied by the overall score before
/// barrier delays are added.
pub(crate) fn readiness_band_hours(score: f64) -> i64 {
    if score >= 90.0 {
        6
    } else if score >= 80.0 {
        12
    } else if score >= 70.0 {
        24
    } else if score >= 60.0 {
        48
    } else {
        72
    }
}

/// Chart snapshot the medical and social rubrics score against.
pub(crate) struct DischargeSnapshot {
    pub unstable_vitals_24h: bool,
    pub pending_lab_count: usize,
    pub monitored_medication_count: usize,
    pub mobility: MobilityStatus,
    pub pain_level: u8,
    pub destination: Option<DischargeDestination>,
    pub planning: DischargePlanning,
}

pub(crate) struct ReadinessScores {
    pub medical: f64,
    pub social: f64,
    pub barriers: Vec<DischargeBarrier>,
}

/// Apply both deduction tables. Barriers derive 1:1 from triggered
/// deductions; a kind in `resolved` keeps its barrier row (marked resolved)
/// but no longer deducts points or delays the predicted date.
pub(crate) fn score_snapshot(
    snapshot: &DischargeSnapshot,
    resolved: &BTreeSet<BarrierKind>,
) -> ReadinessScores {
    let mut medical: f64 = 100.0;
    let mut social: f64 = 100.0;
    let mut barriers = Vec::new();

    let trigger = |kind: BarrierKind,
                   category: BarrierCategory,
                   severity: BarrierSeverity,
                   delay_hours: i64,
                   deduction: f64,
                   description: String,
                   pool: &mut f64,
                   barriers: &mut Vec<DischargeBarrier>| {
        let resolved = resolved.contains(&kind);
        if !resolved {
            *pool -= deduction;
        }
        barriers.push(DischargeBarrier {
            kind,
            category,
            description,
            severity,
            estimated_delay_hours: if resolved { 0 } else { delay_hours },
            resolved,
        });
    };

    let m = MEDICAL_DEDUCTIONS;
    if snapshot.unstable_vitals_24h {
        trigger(
            BarrierKind::UnstableVitals,
            BarrierCategory::Medical,
            BarrierSeverity::High,
            24,
            m.unstable_vitals,
            "unstable vital signs recorded in the last 24 hours".to_string(),
            &mut medical,
            &mut barriers,
        );
    }
    if snapshot.pending_lab_count > 0 {
        let deduction =
            (snapshot.pending_lab_count as f64 * m.pending_lab).min(m.pending_lab_cap);
        trigger(
            BarrierKind::PendingLabs,
            BarrierCategory::Medical,
            BarrierSeverity::Moderate,
            6,
            deduction,
            format!("{} lab result(s) still pending", snapshot.pending_lab_count),
            &mut medical,
            &mut barriers,
        );
    }
    if snapshot.monitored_medication_count > 0 {
        let deduction = (snapshot.monitored_medication_count as f64 * m.monitored_medication)
            .min(m.monitored_medication_cap);
        trigger(
            BarrierKind::MonitoredMedications,
            BarrierCategory::Medical,
            BarrierSeverity::Moderate,
            12,
            deduction,
            format!(
                "{} active medication(s) require monitoring",
                snapshot.monitored_medication_count
            ),
            &mut medical,
            &mut barriers,
        );
    }
    match snapshot.mobility {
        MobilityStatus::Bedbound => trigger(
            BarrierKind::LimitedMobility,
            BarrierCategory::Medical,
            BarrierSeverity::High,
            24,
            m.bedbound,
            "patient is bedbound".to_string(),
            &mut medical,
            &mut barriers,
        ),
        MobilityStatus::Wheelchair => trigger(
            BarrierKind::LimitedMobility,
            BarrierCategory::Medical,
            BarrierSeverity::Moderate,
            12,
            m.wheelchair,
            "patient is wheelchair-dependent".to_string(),
            &mut medical,
            &mut barriers,
        ),
        MobilityStatus::Ambulatory => {}
    }
    if snapshot.pain_level > SEVERE_PAIN_THRESHOLD {
        trigger(
            BarrierKind::UncontrolledPain,
            BarrierCategory::Medical,
            BarrierSeverity::Moderate,
            12,
            m.severe_pain,
            format!("pain level {} above threshold", snapshot.pain_level),
            &mut medical,
            &mut barriers,
        );
    }

    let s = SOCIAL_DEDUCTIONS;
    match snapshot.destination {
        None => trigger(
            BarrierKind::NoDestination,
            BarrierCategory::Social,
            BarrierSeverity::High,
            48,
            s.no_destination,
            "no discharge destination identified".to_string(),
            &mut social,
            &mut barriers,
        ),
        Some(DischargeDestination::SkilledNursing) if !snapshot.planning.placement_arranged => {
            trigger(
                BarrierKind::PlacementUnarranged,
                BarrierCategory::Social,
                BarrierSeverity::High,
                36,
                s.snf_placement_unarranged,
                "skilled nursing placement not yet arranged".to_string(),
                &mut social,
                &mut barriers,
            )
        }
        Some(DischargeDestination::HomeHealth) if !snapshot.planning.placement_arranged => {
            trigger(
                BarrierKind::HomeHealthUnarranged,
                BarrierCategory::Social,
                BarrierSeverity::Moderate,
                24,
                s.home_health_unarranged,
                "home-health services not yet arranged".to_string(),
                &mut social,
                &mut barriers,
            )
        }
        Some(_) => {}
    }
    if !snapshot.planning.transportation_arranged {
        trigger(
            BarrierKind::TransportationUnarranged,
            BarrierCategory::Social,
            BarrierSeverity::Low,
            6,
            s.transportation_unarranged,
            "discharge transportation not arranged".to_string(),
            &mut social,
            &mut barriers,
        );
    }
    if !snapshot.planning.medication_reconciliation_complete {
        trigger(
            BarrierKind::MedicationReconciliationIncomplete,
            BarrierCategory::Administrative,
            BarrierSeverity::Moderate,
            8,
            s.medication_reconciliation,
            "medication reconciliation incomplete".to_string(),
            &mut social,
            &mut barriers,
        );
    }
    if snapshot.planning.completed_education_topics < REQUIRED_EDUCATION_TOPICS {
        trigger(
            BarrierKind::EducationIncomplete,
            BarrierCategory::Administrative,
            BarrierSeverity::Low,
            4,
            s.education_incomplete,
            format!(
                "{} of {} discharge education topics completed",
                snapshot.planning.completed_education_topics, REQUIRED_EDUCATION_TOPICS
            ),
            &mut social,
            &mut barriers,
        );
    }
    if !snapshot.planning.follow_up_scheduled {
        trigger(
            BarrierKind::NoFollowUp,
            BarrierCategory::Administrative,
            BarrierSeverity::Low,
            4,
            s.no_follow_up,
            "no follow-up appointment scheduled".to_string(),
            &mut social,
            &mut barriers,
        );
    }

    ReadinessScores {
        medical: medical.clamp(0.0, 100.0),
        social: social.clamp(0.0, 100.0),
        barriers,
    }
}
