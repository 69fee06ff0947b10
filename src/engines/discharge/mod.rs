//! Discharge readiness prediction.
//!
//! Scores medical and social readiness from the chart, derives barriers and
//! interventions from the triggered deductions, and projects the discharge
//! date. Every run appends to the prediction log; the latest record per
//! admission is the operational view.

mod interventions;
mod rules;


pub use rules::{MedicalDeductions, SocialDeductions, MEDICAL_DEDUCTIONS, SOCIAL_DEDUCTIONS};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Admission, AdmissionId, AdmissionStatus, BarrierKind, DischargeReadinessPrediction, Patient,
    PredictionConfidence, TenantId,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::error::EngineError;
use crate::store::{ClinicalStore, FlagStore, PredictionStore};

const MEDICAL_WEIGHT: f64 = 0.6;
const SOCIAL_WEIGHT: f64 = 0.4;
const DEFAULT_READY_SCORE: f64 = 80.0;

/// Aggregate discharge metrics over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeMetrics {
    pub window_days: i64,
    pub discharged_count: usize,
    pub average_los_hours: f64,
    pub delayed_count: usize,
    pub delayed_rate_pct: f64,
    pub average_delay_hours: f64,
    pub barrier_distribution: BTreeMap<String, u32>,
    pub intervention_completion_pct: f64,
}

pub struct DischargeReadinessEngine<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
}

impl<S> DischargeReadinessEngine<S>
where
    S: ClinicalStore + PredictionStore + FlagStore + 'static,
{
    pub fn new(store: Arc<S>, flags: Arc<FeatureFlagService<S>>) -> Self {
        Self { store, flags }
    }

    /// Score an admission and append the prediction. Barriers already marked
    /// resolved on the latest record stay resolved and no longer deduct.
    pub fn predict(
        &self,
        tenant: &TenantId,
        admission_id: &AdmissionId,
        now: DateTime<Utc>,
    ) -> Result<DischargeReadinessPrediction, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::DischargePlanning, now)?;

        let admission = self
            .store
            .admission(tenant, admission_id)?
            .ok_or_else(|| EngineError::not_found("admission", &admission_id.0))?;
        let patient = self
            .store
            .patient(tenant, &admission.patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &admission.patient_id.0))?;

        let resolved = self
            .store
            .latest_readiness(tenant, admission_id)?
            .map(|previous| {
                previous
                    .barriers
                    .iter()
                    .filter(|barrier| barrier.resolved)
                    .map(|barrier| barrier.kind)
                    .collect::<BTreeSet<_>>()
            })
            .unwrap_or_default();

        self.compute_and_record(tenant, &admission, &patient, &resolved, now)
    }

    /// Mark a barrier resolved and recompute the whole prediction.
    pub fn resolve_barrier(
        &self,
        tenant: &TenantId,
        admission_id: &AdmissionId,
        barrier: &str,
        now: DateTime<Utc>,
    ) -> Result<DischargeReadinessPrediction, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::DischargePlanning, now)?;

        let kind = BarrierKind::from_label(barrier)
            .ok_or_else(|| EngineError::validation(format!("unknown barrier id '{barrier}'")))?;

        let latest = self
            .store
            .latest_readiness(tenant, admission_id)?
            .ok_or_else(|| EngineError::not_found("discharge_prediction", &admission_id.0))?;

        if !latest
            .barriers
            .iter()
            .any(|entry| entry.kind == kind && !entry.resolved)
        {
            return Err(EngineError::validation(format!(
                "barrier '{barrier}' is not open on admission {admission_id}"
            )));
        }

        let admission = self
            .store
            .admission(tenant, admission_id)?
            .ok_or_else(|| EngineError::not_found("admission", &admission_id.0))?;
        let patient = self
            .store
            .patient(tenant, &admission.patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &admission.patient_id.0))?;

        let mut resolved: BTreeSet<BarrierKind> = latest
            .barriers
            .iter()
            .filter(|entry| entry.resolved)
            .map(|entry| entry.kind)
            .collect();
        resolved.insert(kind);

        self.compute_and_record(tenant, &admission, &patient, &resolved, now)
    }

    /// Admissions whose latest prediction clears the readiness threshold,
    /// ordered score descending then predicted date ascending.
    pub fn discharge_ready(
        &self,
        tenant: &TenantId,
        min_score: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DischargeReadinessPrediction>, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::DischargePlanning, now)?;
        let min_score = min_score.unwrap_or(DEFAULT_READY_SCORE);

        let mut ready: Vec<DischargeReadinessPrediction> = self
            .store
            .latest_readiness_for_tenant(tenant)?
            .into_iter()
            .filter(|prediction| prediction.overall_score >= min_score)
            .collect();
        ready.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.predicted_discharge_date.cmp(&b.predicted_discharge_date))
        });
        Ok(ready)
    }

    pub fn metrics(
        &self,
        tenant: &TenantId,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<DischargeMetrics, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::DischargePlanning, now)?;
        let since = now - Duration::days(window_days);

        let discharged: Vec<Admission> = self
            .store
            .admissions_with_status(tenant, AdmissionStatus::Discharged)?
            .into_iter()
            .filter(|admission| admission.discharged_at.map(|at| at >= since).unwrap_or(false))
            .collect();

        let mut total_los_hours = 0.0;
        let mut delayed_count = 0usize;
        let mut total_delay_hours = 0.0;
        for admission in &discharged {
            let Some(discharged_at) = admission.discharged_at else {
                continue;
            };
            total_los_hours += (discharged_at - admission.admitted_at).num_minutes() as f64 / 60.0;
            if let Some(prediction) = self.store.latest_readiness(tenant, &admission.id)? {
                if discharged_at > prediction.predicted_discharge_date {
                    delayed_count += 1;
                    total_delay_hours += (discharged_at - prediction.predicted_discharge_date)
                        .num_minutes() as f64
                        / 60.0;
                }
            }
        }

        let mut barrier_distribution: BTreeMap<String, u32> = BTreeMap::new();
        let mut intervention_total = 0usize;
        let mut intervention_completed = 0usize;
        for prediction in self.store.latest_readiness_for_tenant(tenant)? {
            for barrier in &prediction.barriers {
                *barrier_distribution
                    .entry(barrier.kind.label().to_string())
                    .or_insert(0) += 1;
            }
            intervention_total += prediction.interventions.len();
            intervention_completed += prediction
                .interventions
                .iter()
                .filter(|intervention| intervention.completed)
                .count();
        }

        let discharged_count = discharged.len();
        Ok(DischargeMetrics {
            window_days,
            discharged_count,
            average_los_hours: if discharged_count == 0 {
                0.0
            } else {
                total_los_hours / discharged_count as f64
            },
            delayed_count,
            delayed_rate_pct: if discharged_count == 0 {
                0.0
            } else {
                delayed_count as f64 / discharged_count as f64 * 100.0
            },
            average_delay_hours: if delayed_count == 0 {
                0.0
            } else {
                total_delay_hours / delayed_count as f64
            },
            barrier_distribution,
            intervention_completion_pct: if intervention_total == 0 {
                0.0
            } else {
                intervention_completed as f64 / intervention_total as f64 * 100.0
            },
        })
    }

    fn compute_and_record(
        &self,
        tenant: &TenantId,
        admission: &Admission,
        patient: &Patient,
        resolved: &BTreeSet<BarrierKind>,
        now: DateTime<Utc>,
    ) -> Result<DischargeReadinessPrediction, EngineError> {
        let snapshot = self.snapshot(tenant, admission, patient, now)?;
        let scores = rules::score_snapshot(&snapshot, resolved);

        let overall = (MEDICAL_WEIGHT * scores.medical + SOCIAL_WEIGHT * scores.social)
            .clamp(0.0, 100.0);

        let open_barriers = scores
            .barriers
            .iter()
            .filter(|barrier| !barrier.resolved)
            .count();
        let delay_hours: i64 = scores
            .barriers
            .iter()
            .map(|barrier| barrier.estimated_delay_hours)
            .sum();
        let predicted_discharge_date =
            now + Duration::hours(rules::readiness_band_hours(overall) + delay_hours);

        let confidence = if overall >= 80.0 && open_barriers == 0 {
            PredictionConfidence::High
        } else if overall >= 60.0 && open_barriers <= 2 {
            PredictionConfidence::Medium
        } else {
            PredictionConfidence::Low
        };

        let interventions = interventions::interventions_for(&scores.barriers);
        let prediction = DischargeReadinessPrediction {
            admission_id: admission.id.clone(),
            patient_id: patient.id.clone(),
            overall_score: overall,
            medical_score: scores.medical,
            social_score: scores.social,
            barriers: scores.barriers,
            interventions,
            predicted_discharge_date,
            confidence,
            computed_at: now,
        };

        self.store.record_readiness(tenant, prediction.clone())?;
        tracing::debug!(
            tenant = %tenant,
            admission = %admission.id,
            score = overall,
            barriers = open_barriers,
            "discharge readiness recorded"
        );
        Ok(prediction)
    }

    fn snapshot(
        &self,
        tenant: &TenantId,
        admission: &Admission,
        patient: &Patient,
        now: DateTime<Utc>,
    ) -> Result<rules::DischargeSnapshot, EngineError> {
        let unstable_vitals_24h = self
            .store
            .vitals_since(tenant, &patient.id, now - Duration::hours(24))?
            .iter()
            .any(|record| !record.stable);
        let pending_lab_count = self.store.pending_labs(tenant, &patient.id)?.len();
        let monitored_medication_count = self
            .store
            .medication_orders(tenant, &patient.id)?
            .iter()
            .filter(|order| order.active && order.requires_monitoring)
            .count();

        Ok(rules::DischargeSnapshot {
            unstable_vitals_24h,
            pending_lab_count,
            monitored_medication_count,
            mobility: patient.mobility_status,
            pain_level: patient.pain_level,
            destination: patient.discharge_destination,
            planning: admission.planning.clone(),
        })
    }
}
