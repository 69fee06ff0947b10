use serde::{Deserialize, Serialize};

use crate::domain::{Bed, CleaningStatus, IsolationType};

use super::BedRequirements;

/// Criteria contributing to a candidate bed's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedCriterion {
    IsolationMatch,
    Telemetry,
    Oxygen,
    UnitMatch,
    Proximity,
    Bariatric,
    StaffRatio,
    Cleanliness,
}

impl BedCriterion {
    pub const fn label(self) -> &'static str {
        match self {
            Self::IsolationMatch => "isolation_match",
            Self::Telemetry => "telemetry",
            Self::Oxygen => "oxygen",
            Self::UnitMatch => "unit_match",
            Self::Proximity => "proximity",
            Self::Bariatric => "bariatric",
            Self::StaffRatio => "staff_ratio",
            Self::Cleanliness => "cleanliness",
        }
    }
}

/// Point budget per criterion. Kept as one named table so the rubric is
/// independently testable and tunable. The budget intentionally does not
/// partition to a strict 100: non-required criteria still earn partial
/// credit, so two beds can tie for different clinical reasons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub isolation: f64,
    pub telemetry: f64,
    pub oxygen: f64,
    pub unit_match: f64,
    pub proximity: f64,
    pub bariatric: f64,
    pub staff_ratio: f64,
    pub cleanliness: f64,
}

pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    isolation: 30.0,
    telemetry: 20.0,
    oxygen: 15.0,
    unit_match: 15.0,
    proximity: 10.0,
    bariatric: 10.0,
    staff_ratio: 5.0,
    cleanliness: 5.0,
};

/// Discrete contribution to a bed's score, mirroring the reasoning trail
/// surfaced to placement coordinators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: BedCriterion,
    pub points: f64,
    pub note: String,
}

pub(crate) struct BedScore {
    pub components: Vec<ScoreComponent>,
    pub total: f64,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

/// Score one candidate against the requirements. Unmet required criteria
/// contribute 0 points and a warning; satisfied or non-applicable criteria
/// contribute full or partial credit and a reason.
pub(crate) fn score_bed(
    bed: &Bed,
    requirements: &BedRequirements,
    patients_per_nurse: Option<f64>,
    weights: &ScoringWeights,
) -> BedScore {
    let mut components = Vec::new();
    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    let push = |criterion: BedCriterion,
                points: f64,
                note: String,
                components: &mut Vec<ScoreComponent>| {
        components.push(ScoreComponent {
            criterion,
            points,
            note,
        });
    };

    // Isolation match.
    if requirements.isolation_required {
        let required = requirements.isolation_type;
        if bed.isolation_capable && bed.isolation_type == required {
            let note = format!(
                "isolation type {} matched",
                required.map(IsolationType::label).unwrap_or("unspecified")
            );
            reasons.push(note.clone());
            push(BedCriterion::IsolationMatch, weights.isolation, note, &mut components);
        } else {
            let warning = format!(
                "bed {} cannot provide required {} isolation",
                bed.id.0,
                required.map(IsolationType::label).unwrap_or("unspecified")
            );
            warnings.push(warning.clone());
            push(BedCriterion::IsolationMatch, 0.0, warning, &mut components);
        }
    } else {
        let note = "isolation not required".to_string();
        reasons.push(note.clone());
        push(
            BedCriterion::IsolationMatch,
            weights.isolation * 0.5,
            note,
            &mut components,
        );
    }

    // Telemetry.
    if requirements.telemetry_required {
        if bed.telemetry {
            let note = "telemetry monitoring available".to_string();
            reasons.push(note.clone());
            push(BedCriterion::Telemetry, weights.telemetry, note, &mut components);
        } else {
            let warning = format!("bed {} lacks required telemetry", bed.id.0);
            warnings.push(warning.clone());
            push(BedCriterion::Telemetry, 0.0, warning, &mut components);
        }
    } else {
        let note = "telemetry not required".to_string();
        reasons.push(note.clone());
        push(
            BedCriterion::Telemetry,
            weights.telemetry * 0.5,
            note,
            &mut components,
        );
    }

    // Oxygen.
    if requirements.oxygen_required {
        if bed.oxygen {
            let note = "wall oxygen available".to_string();
            reasons.push(note.clone());
            push(BedCriterion::Oxygen, weights.oxygen, note, &mut components);
        } else {
            let warning = format!("bed {} lacks required oxygen supply", bed.id.0);
            warnings.push(warning.clone());
            push(BedCriterion::Oxygen, 0.0, warning, &mut components);
        }
    } else {
        let note = "oxygen not required".to_string();
        reasons.push(note.clone());
        push(
            BedCriterion::Oxygen,
            weights.oxygen * 0.5,
            note,
            &mut components,
        );
    }

    // Specialty unit match.
    match &requirements.unit {
        Some(unit) => {
            if &bed.unit == unit {
                let note = format!("bed is in requested unit {unit}");
                reasons.push(note.clone());
                push(BedCriterion::UnitMatch, weights.unit_match, note, &mut components);
            } else {
                let warning = format!("bed {} is in {}, not requested {unit}", bed.id.0, bed.unit);
                warnings.push(warning.clone());
                push(BedCriterion::UnitMatch, 0.0, warning, &mut components);
            }
        }
        None => {
            let note = "no specialty unit requested".to_string();
            reasons.push(note.clone());
            push(
                BedCriterion::UnitMatch,
                weights.unit_match * 0.5,
                note,
                &mut components,
            );
        }
    }

    // Proximity to the nurses' station, banded by distance.
    let proximity_factor = if bed.distance_to_station <= 5.0 {
        1.0
    } else if bed.distance_to_station <= 10.0 {
        0.7
    } else if bed.distance_to_station <= 20.0 {
        0.4
    } else {
        0.2
    };
    let note = format!(
        "{:.0}m from nurses' station",
        bed.distance_to_station
    );
    reasons.push(note.clone());
    push(
        BedCriterion::Proximity,
        weights.proximity * proximity_factor,
        note,
        &mut components,
    );

    // Bariatric.
    if requirements.bariatric_required {
        if bed.bariatric {
            let note = "bariatric-rated frame".to_string();
            reasons.push(note.clone());
            push(BedCriterion::Bariatric, weights.bariatric, note, &mut components);
        } else {
            let warning = format!("bed {} is not bariatric-rated", bed.id.0);
            warnings.push(warning.clone());
            push(BedCriterion::Bariatric, 0.0, warning, &mut components);
        }
    } else {
        let note = "bariatric accommodation not required".to_string();
        reasons.push(note.clone());
        push(
            BedCriterion::Bariatric,
            weights.bariatric * 0.5,
            note,
            &mut components,
        );
    }

    // Unit staffing pressure.
    match patients_per_nurse {
        Some(ratio) if ratio <= 4.0 => {
            let note = format!("unit staffing healthy ({ratio:.1} patients per nurse)");
            reasons.push(note.clone());
            push(BedCriterion::StaffRatio, weights.staff_ratio, note, &mut components);
        }
        Some(ratio) if ratio <= 6.0 => {
            let note = format!("unit staffing stretched ({ratio:.1} patients per nurse)");
            reasons.push(note.clone());
            push(
                BedCriterion::StaffRatio,
                weights.staff_ratio * 0.5,
                note,
                &mut components,
            );
        }
        Some(ratio) => {
            let note = format!("unit staffing strained ({ratio:.1} patients per nurse)");
            reasons.push(note.clone());
            push(BedCriterion::StaffRatio, 0.0, note, &mut components);
        }
        None => {
            let note = "staffing data unavailable".to_string();
            reasons.push(note.clone());
            push(
                BedCriterion::StaffRatio,
                weights.staff_ratio * 0.5,
                note,
                &mut components,
            );
        }
    }

    // Cleanliness.
    match bed.cleaning_status {
        CleaningStatus::Clean => {
            let note = "bed cleaned and ready".to_string();
            reasons.push(note.clone());
            push(BedCriterion::Cleanliness, weights.cleanliness, note, &mut components);
        }
        CleaningStatus::InProgress => {
            let note = "cleaning in progress".to_string();
            reasons.push(note.clone());
            push(
                BedCriterion::Cleanliness,
                weights.cleanliness * 0.5,
                note,
                &mut components,
            );
        }
        CleaningStatus::Dirty => {
            let note = "bed awaiting cleaning".to_string();
            reasons.push(note.clone());
            push(BedCriterion::Cleanliness, 0.0, note, &mut components);
        }
    }

    let total: f64 = components.iter().map(|component| component.points).sum();
    BedScore {
        components,
        total: total.clamp(0.0, 100.0),
        reasons,
        warnings,
    }
}
