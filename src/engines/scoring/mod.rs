//! Bed recommendation and assignment.
//!
//! Filters candidate beds against hard clinical constraints, ranks them with
//! the weighted criteria rubric, and performs the assignment as one atomic
//! conditional claim so concurrent callers cannot double-book a bed.

mod criteria;

#[cfg(test)]
mod tests;

pub use criteria::{BedCriterion, ScoreComponent, ScoringWeights, DEFAULT_WEIGHTS};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditEntry, Bed, BedAssignment, BedId, BedStatus, IsolationType, PatientId, StaffId,
    StaffRole, TenantId,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::engines::isolation::IsolationEngine;
use crate::error::EngineError;
use crate::store::{
    AssignmentWrite, BedStore, ClinicalStore, FlagStore, StaffingStore, StoreError,
};

/// Candidate filtering never returns more than this many beds to the scorer.
const CANDIDATE_CAP: usize = 20;
const RECOMMENDATION_LIMIT: usize = 3;

/// Clinical requirements for a placement request. Each constraint is only
/// enforced when required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BedRequirements {
    pub patient_id: Option<PatientId>,
    pub unit: Option<String>,
    pub isolation_required: bool,
    pub isolation_type: Option<IsolationType>,
    pub telemetry_required: bool,
    pub oxygen_required: bool,
    pub bariatric_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationConfidence {
    High,
    Medium,
    Low,
}

impl RecommendationConfidence {
    fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::High
        } else if score >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedRecommendation {
    pub bed_id: BedId,
    pub unit: String,
    pub score: f64,
    pub confidence: RecommendationConfidence,
    pub components: Vec<ScoreComponent>,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct BedScoringEngine<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
    isolation: Arc<IsolationEngine<S>>,
    weights: ScoringWeights,
}

impl<S> BedScoringEngine<S>
where
    S: BedStore + ClinicalStore + StaffingStore + FlagStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        flags: Arc<FeatureFlagService<S>>,
        isolation: Arc<IsolationEngine<S>>,
    ) -> Self {
        Self::with_weights(store, flags, isolation, DEFAULT_WEIGHTS)
    }

    pub fn with_weights(
        store: Arc<S>,
        flags: Arc<FeatureFlagService<S>>,
        isolation: Arc<IsolationEngine<S>>,
        weights: ScoringWeights,
    ) -> Self {
        Self {
            store,
            flags,
            isolation,
            weights,
        }
    }

    /// Rank available beds for a placement request. An empty result means no
    /// candidate survived filtering; it is not an error.
    pub fn recommend_beds(
        &self,
        tenant: &TenantId,
        requirements: &BedRequirements,
        now: DateTime<Utc>,
    ) -> Result<Vec<BedRecommendation>, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::BedScoring, now)?;

        let candidates: Vec<Bed> = self
            .store
            .beds(tenant)?
            .into_iter()
            .filter(|bed| Self::passes_hard_constraints(bed, requirements))
            .take(CANDIDATE_CAP)
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let staffing = self.unit_staffing_ratios(tenant, &candidates)?;

        let mut recommendations: Vec<BedRecommendation> = candidates
            .iter()
            .map(|bed| {
                let ratio = staffing.get(&bed.unit).copied().flatten();
                let score = criteria::score_bed(bed, requirements, ratio, &self.weights);
                BedRecommendation {
                    bed_id: bed.id.clone(),
                    unit: bed.unit.clone(),
                    score: score.total,
                    confidence: RecommendationConfidence::from_score(score.total),
                    components: score.components,
                    reasons: score.reasons,
                    warnings: score.warnings,
                }
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.bed_id.cmp(&b.bed_id))
        });
        recommendations.truncate(RECOMMENDATION_LIMIT);

        tracing::debug!(
            tenant = %tenant,
            candidates = candidates.len(),
            returned = recommendations.len(),
            "bed recommendations computed"
        );
        Ok(recommendations)
    }

    /// Assign a bed to a patient: one atomic transaction creating the ledger
    /// row, flipping the bed to occupied, and linking the patient. A lost
    /// race against another assignment surfaces as a conflict.
    pub fn assign_bed(
        &self,
        tenant: &TenantId,
        patient_id: &PatientId,
        bed_id: &BedId,
        assigned_by: &StaffId,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> Result<BedAssignment, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::BedScoring, now)?;
        self.isolation
            .validate_bed_assignment(tenant, patient_id, bed_id)?;

        let patient = self
            .store
            .patient(tenant, patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &patient_id.0))?;

        let assignment = BedAssignment {
            bed_id: bed_id.clone(),
            patient_id: patient_id.clone(),
            assigned_at: now,
            assigned_by: assigned_by.clone(),
            reasoning: reasoning.to_string(),
            isolation_snapshot: patient.isolation_type,
        };
        let audit = AuditEntry {
            actor: assigned_by.0.clone(),
            action: "bed_assigned".to_string(),
            subject: bed_id.0.clone(),
            detail: format!("patient {} assigned: {}", patient_id.0, reasoning),
            recorded_at: now,
        };

        let assignment = self
            .store
            .assign(tenant, AssignmentWrite { assignment, audit })
            .map_err(|error| match error {
                StoreError::Conflict => EngineError::Conflict {
                    bed: bed_id.0.clone(),
                },
                other => EngineError::Store(other),
            })?;

        tracing::info!(
            tenant = %tenant,
            bed = %bed_id,
            patient = %patient_id,
            by = %assigned_by.0,
            "bed assigned"
        );
        Ok(assignment)
    }

    fn passes_hard_constraints(bed: &Bed, requirements: &BedRequirements) -> bool {
        if bed.status != BedStatus::Available {
            return false;
        }
        if requirements.isolation_required
            && (!bed.isolation_capable || bed.isolation_type != requirements.isolation_type)
        {
            return false;
        }
        if requirements.telemetry_required && !bed.telemetry {
            return false;
        }
        if requirements.oxygen_required && !bed.oxygen {
            return false;
        }
        if requirements.bariatric_required && !bed.bariatric {
            return false;
        }
        if let Some(unit) = &requirements.unit {
            if &bed.unit != unit {
                return false;
            }
        }
        true
    }

    /// Occupied-bed to on-duty-nurse ratio per candidate unit. `None` when a
    /// unit has no nurses on duty or no roster data.
    fn unit_staffing_ratios(
        &self,
        tenant: &TenantId,
        candidates: &[Bed],
    ) -> Result<HashMap<String, Option<f64>>, EngineError> {
        let mut ratios = HashMap::new();
        for bed in candidates {
            if ratios.contains_key(&bed.unit) {
                continue;
            }
            let nurses = self
                .store
                .on_duty(tenant, &bed.unit)?
                .into_iter()
                .filter(|member| member.role == StaffRole::Nurse)
                .count();
            let occupied = self
                .store
                .beds_in_unit(tenant, &bed.unit)?
                .into_iter()
                .filter(|bed| bed.status == BedStatus::Occupied)
                .count();
            let ratio = if nurses == 0 {
                None
            } else {
                Some(occupied as f64 / nurses as f64)
            };
            ratios.insert(bed.unit.clone(), ratio);
        }
        Ok(ratios)
    }
}
