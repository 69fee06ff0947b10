//! Infection-control isolation rules.
//!
//! Maps recent diagnoses and positive lab results to an isolation category,
//! persists the requirement onto the patient, and validates bed/patient
//! isolation compatibility for the assignment path.

mod rules;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditEntry, BedId, BedStatus, IsolationType, PatientId, TenantId,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::error::EngineError;
use crate::store::{BedStore, ClinicalStore, FlagStore, IsolationWrite};

/// Outcome of scanning a patient's recent chart for isolation requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationAssessment {
    pub patient_id: PatientId,
    pub isolation_required: bool,
    pub isolation_type: Option<IsolationType>,
    /// Every matched category before the restrictiveness tie-break.
    pub matched_categories: Vec<IsolationType>,
    /// Codes and organisms that triggered a match, for chart review.
    pub triggers: Vec<String>,
}

/// Per unit and isolation type availability rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationRoomAvailability {
    pub unit: String,
    pub isolation_type: IsolationType,
    pub available: u32,
    pub occupied: u32,
    pub utilization_pct: f64,
}

pub struct IsolationEngine<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
    chart_lookback: Duration,
}

impl<S> IsolationEngine<S>
where
    S: ClinicalStore + BedStore + FlagStore + 'static,
{
    pub fn new(store: Arc<S>, flags: Arc<FeatureFlagService<S>>, chart_lookback_days: i64) -> Self {
        Self {
            store,
            flags,
            chart_lookback: Duration::days(chart_lookback_days),
        }
    }

    /// Scan recent diagnoses and positive labs, derive the required isolation
    /// category, and persist it onto the patient. The write is idempotent:
    /// repeated scans never move the start date.
    pub fn check_requirements(
        &self,
        tenant: &TenantId,
        patient_id: &PatientId,
        now: DateTime<Utc>,
    ) -> Result<IsolationAssessment, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::IsolationControl, now)?;

        let mut patient = self
            .store
            .patient(tenant, patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &patient_id.0))?;

        let since = now - self.chart_lookback;
        let mut matched = Vec::new();
        let mut triggers = Vec::new();

        for diagnosis in self.store.diagnoses_since(tenant, patient_id, since)? {
            if let Some(category) = rules::category_for_diagnosis(&diagnosis.code) {
                if !matched.contains(&category) {
                    matched.push(category);
                }
                triggers.push(format!("diagnosis {} ({})", diagnosis.code, category.label()));
            }
        }

        for result in self.store.lab_results_since(tenant, patient_id, since)? {
            if !result.positive {
                continue;
            }
            if let Some(category) = rules::category_for_result_text(&result.result_text) {
                if !matched.contains(&category) {
                    matched.push(category);
                }
                triggers.push(format!(
                    "lab {}: {} ({})",
                    result.test_name,
                    result.result_text,
                    category.label()
                ));
            }
        }

        let selected = rules::most_restrictive(&matched);

        if let Some(selected) = selected {
            let unchanged =
                patient.isolation_required && patient.isolation_type == Some(selected);
            if !unchanged {
                patient.isolation_required = true;
                patient.isolation_type = Some(selected);
                if patient.isolation_start.is_none() {
                    patient.isolation_start = Some(now);
                }
                patient.isolation_end = None;

                let audit = AuditEntry {
                    actor: "isolation-engine".to_string(),
                    action: "isolation_required".to_string(),
                    subject: patient_id.0.clone(),
                    detail: format!("isolation set to {}", selected.label()),
                    recorded_at: now,
                };
                self.store.persist_isolation(
                    tenant,
                    IsolationWrite {
                        patient: patient.clone(),
                        audit,
                    },
                )?;
                tracing::info!(
                    tenant = %tenant,
                    patient = %patient_id,
                    isolation = selected.label(),
                    "isolation requirement persisted"
                );
            }
        }

        Ok(IsolationAssessment {
            patient_id: patient_id.clone(),
            isolation_required: selected.is_some() || patient.isolation_required,
            isolation_type: selected.or(patient.isolation_type),
            matched_categories: matched,
            triggers,
        })
    }

    /// Validate that a bed can take a patient under isolation rules. The bed
    /// must be available, and an isolation-required patient only matches a
    /// bed whose isolation type is exactly equal; no cross-category
    /// substitution.
    pub fn validate_bed_assignment(
        &self,
        tenant: &TenantId,
        patient_id: &PatientId,
        bed_id: &BedId,
    ) -> Result<(), EngineError> {
        let patient = self
            .store
            .patient(tenant, patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &patient_id.0))?;
        let bed = self
            .store
            .bed(tenant, bed_id)?
            .ok_or_else(|| EngineError::not_found("bed", &bed_id.0))?;

        if bed.status != BedStatus::Available {
            return Err(EngineError::Conflict {
                bed: bed_id.0.clone(),
            });
        }

        if patient.isolation_required {
            let required = patient.isolation_type.ok_or_else(|| {
                EngineError::validation("patient requires isolation but no type is recorded")
            })?;
            if !bed.isolation_capable {
                return Err(EngineError::validation(format!(
                    "bed {} is not isolation-capable but patient requires {}",
                    bed_id.0,
                    required.label()
                )));
            }
            if bed.isolation_type != Some(required) {
                return Err(EngineError::validation(format!(
                    "bed {} isolation type {} does not match required {}",
                    bed_id.0,
                    bed.isolation_type.map(IsolationType::label).unwrap_or("none"),
                    required.label()
                )));
            }
        }

        Ok(())
    }

    /// Lift isolation from a patient. Requires a documented reason and stamps
    /// the end date; the update and its audit entry land in one transaction.
    pub fn clear_isolation(
        &self,
        tenant: &TenantId,
        patient_id: &PatientId,
        reason: &str,
        cleared_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::validation(
                "clearing isolation requires a non-empty reason",
            ));
        }

        let mut patient = self
            .store
            .patient(tenant, patient_id)?
            .ok_or_else(|| EngineError::not_found("patient", &patient_id.0))?;

        if !patient.isolation_required {
            return Err(EngineError::validation("patient is not under isolation"));
        }

        let previous = patient.isolation_type;
        patient.isolation_required = false;
        patient.isolation_type = None;
        patient.isolation_end = Some(now);

        let audit = AuditEntry {
            actor: cleared_by.to_string(),
            action: "isolation_cleared".to_string(),
            subject: patient_id.0.clone(),
            detail: format!(
                "cleared {} isolation: {}",
                previous.map(IsolationType::label).unwrap_or("unknown"),
                reason
            ),
            recorded_at: now,
        };
        self.store
            .persist_isolation(tenant, IsolationWrite { patient, audit })?;
        Ok(())
    }

    /// Aggregate isolation-capable bed availability per unit and type.
    pub fn room_availability(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<IsolationRoomAvailability>, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::IsolationControl, now)?;

        let mut rollup: BTreeMap<(String, IsolationType), (u32, u32)> = BTreeMap::new();
        for bed in self.store.beds(tenant)? {
            if !bed.isolation_capable {
                continue;
            }
            let Some(isolation_type) = bed.isolation_type else {
                continue;
            };
            let entry = rollup
                .entry((bed.unit.clone(), isolation_type))
                .or_insert((0, 0));
            match bed.status {
                BedStatus::Available => entry.0 += 1,
                BedStatus::Occupied => entry.1 += 1,
                _ => {}
            }
        }

        Ok(rollup
            .into_iter()
            .map(|((unit, isolation_type), (available, occupied))| {
                let total = available + occupied;
                let utilization_pct = if total == 0 {
                    0.0
                } else {
                    occupied as f64 / total as f64 * 100.0
                };
                IsolationRoomAvailability {
                    unit,
                    isolation_type,
                    available,
                    occupied,
                    utilization_pct,
                }
            })
            .collect())
    }
}
