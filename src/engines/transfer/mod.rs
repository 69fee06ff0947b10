//! ED-to-ward transfer prioritization.
//!
//! Scores admissions boarding in the ED under acuity and wait-time pressure,
//! predicts receiving-unit bed availability, and notifies receiving-unit
//! staff when a transfer starts. An admission's `unit` is the ward awaiting
//! the patient, assigned at ED admission.


use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Admission, AdmissionId, AdmissionStatus, BedStatus, Notification, PredictionConfidence,
    TenantId, TransferPriority,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::error::EngineError;
use crate::store::{
    BedStore, ClinicalStore, FlagStore, NotificationOutbox, PredictionStore, StaffingStore,
};

/// Boarding-time targets in hours per acuity level.
const ACUITY_TARGET_HOURS: [(u8, f64); 5] = [(1, 1.0), (2, 2.0), (3, 4.0), (4, 6.0), (5, 8.0)];
/// Fixed look-ahead checkpoints for bed availability buckets.
const AVAILABILITY_CHECKPOINTS: [i64; 4] = [1, 2, 4, 8];

const ACUITY_COMPONENT_MIN: f64 = 10.0;
const ACUITY_COMPONENT_MAX: f64 = 50.0;
const WAIT_COMPONENT_CAP: f64 = 30.0;
const ISOLATION_BONUS: f64 = 20.0;

pub(crate) fn target_hours(acuity: u8) -> f64 {
    ACUITY_TARGET_HOURS
        .iter()
        .find(|(level, _)| *level == acuity)
        .map(|(_, hours)| *hours)
        .unwrap_or(8.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Urgent,
    High,
    Medium,
    Low,
}

impl PriorityTier {
    fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Urgent
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Transfer priority enriched with timing guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferTiming {
    pub priority: TransferPriority,
    pub tier: PriorityTier,
    pub reasoning: String,
    pub estimated_bed_available: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityBucket {
    pub hours_ahead: i64,
    pub predicted_available: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedAvailabilityForecast {
    pub unit: String,
    pub current_available: u32,
    pub buckets: Vec<AvailabilityBucket>,
    pub confidence: PredictionConfidence,
}

/// Result of a notify call; duplicate sends inside the dedup window are
/// suppressed rather than repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyOutcome {
    pub notifications_sent: usize,
    pub suppressed_as_duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMetrics {
    pub window_days: i64,
    pub awaiting_count: usize,
    pub transferred_count: usize,
    pub average_boarding_hours: f64,
    pub within_target_pct: f64,
    pub average_priority: f64,
    pub urgent_count: usize,
}

pub struct TransferPriorityEngine<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
    dedup_window: Duration,
}

impl<S> TransferPriorityEngine<S>
where
    S: ClinicalStore + BedStore + PredictionStore + StaffingStore + NotificationOutbox + FlagStore + 'static,
{
    pub fn new(store: Arc<S>, flags: Arc<FeatureFlagService<S>>, dedup_window: Duration) -> Self {
        Self {
            store,
            flags,
            dedup_window,
        }
    }

    /// Score every admission awaiting transfer, optionally narrowed to one
    /// receiving unit, highest priority first. Each run appends to the
    /// priority log.
    pub fn prioritize(
        &self,
        tenant: &TenantId,
        unit: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransferPriority>, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TransferPrioritization, now)?;

        let mut priorities = Vec::new();
        for admission in self
            .store
            .admissions_with_status(tenant, AdmissionStatus::AwaitingTransfer)?
        {
            if let Some(unit) = unit {
                if admission.unit != unit {
                    continue;
                }
            }
            let patient = self
                .store
                .patient(tenant, &admission.patient_id)?
                .ok_or_else(|| EngineError::not_found("patient", &admission.patient_id.0))?;

            let acuity_component = (60.0 - admission.acuity_level as f64 * 10.0)
                .clamp(ACUITY_COMPONENT_MIN, ACUITY_COMPONENT_MAX);
            let wait_hours = (now - admission.admitted_at).num_minutes() as f64 / 60.0;
            let wait_component = ((wait_hours / target_hours(admission.acuity_level)) * 15.0)
                .min(WAIT_COMPONENT_CAP);
            let isolation_bonus = if patient.isolation_required {
                ISOLATION_BONUS
            } else {
                0.0
            };

            let priority = TransferPriority {
                admission_id: admission.id.clone(),
                patient_id: admission.patient_id.clone(),
                unit: admission.unit.clone(),
                score: acuity_component + wait_component + isolation_bonus,
                acuity_component,
                wait_component,
                isolation_bonus,
                computed_at: now,
            };
            self.store.record_transfer_priority(tenant, priority.clone())?;
            priorities.push(priority);
        }

        priorities.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.admission_id.cmp(&b.admission_id))
        });
        Ok(priorities)
    }

    /// Prioritize and attach tier, reasoning, and an estimated time a bed
    /// opens on the receiving unit.
    pub fn optimize_timing(
        &self,
        tenant: &TenantId,
        unit: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransferTiming>, EngineError> {
        let priorities = self.prioritize(tenant, unit, now)?;

        let mut timings = Vec::with_capacity(priorities.len());
        for priority in priorities {
            let admission = self
                .store
                .admission(tenant, &priority.admission_id)?
                .ok_or_else(|| EngineError::not_found("admission", &priority.admission_id.0))?;
            let forecast = self.predict_bed_availability(tenant, &priority.unit, 8, now)?;
            let estimated_bed_available =
                Self::estimate_available(&forecast, admission.acuity_level, now);

            let tier = PriorityTier::from_score(priority.score);
            let wait_hours = (now - admission.admitted_at).num_minutes() as f64 / 60.0;
            let mut reasoning = format!(
                "acuity {} patient boarding {:.1}h against a {:.0}h target",
                admission.acuity_level,
                wait_hours,
                target_hours(admission.acuity_level)
            );
            if priority.isolation_bonus > 0.0 {
                reasoning.push_str("; isolation precautions required");
            }
            reasoning.push_str(&format!(
                "; priority {:.0} ({})",
                priority.score,
                tier.label()
            ));

            timings.push(TransferTiming {
                priority,
                tier,
                reasoning,
                estimated_bed_available,
            });
        }
        Ok(timings)
    }

    /// Current availability plus scheduled discharges (readiness >= 70)
    /// bucketed at the fixed checkpoints.
    pub fn predict_bed_availability(
        &self,
        tenant: &TenantId,
        unit: &str,
        horizon_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<BedAvailabilityForecast, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TransferPrioritization, now)?;

        let current_available = self
            .store
            .beds_in_unit(tenant, unit)?
            .into_iter()
            .filter(|bed| bed.status == BedStatus::Available)
            .count() as u32;

        // Predicted discharge times for current inpatients of this unit.
        let mut scheduled: Vec<DateTime<Utc>> = Vec::new();
        for prediction in self.store.latest_readiness_for_tenant(tenant)? {
            if prediction.overall_score < 70.0 {
                continue;
            }
            let Some(admission) = self.store.admission(tenant, &prediction.admission_id)? else {
                continue;
            };
            if admission.unit == unit && admission.status == AdmissionStatus::Active {
                scheduled.push(prediction.predicted_discharge_date);
            }
        }

        let buckets: Vec<AvailabilityBucket> = AVAILABILITY_CHECKPOINTS
            .iter()
            .filter(|hours| **hours <= horizon_hours)
            .map(|hours| {
                let checkpoint = now + Duration::hours(*hours);
                let discharges = scheduled.iter().filter(|at| **at <= checkpoint).count() as u32;
                AvailabilityBucket {
                    hours_ahead: *hours,
                    predicted_available: current_available + discharges,
                }
            })
            .collect();

        let final_bucket = buckets
            .last()
            .map(|bucket| bucket.predicted_available)
            .unwrap_or(current_available);
        let confidence = if final_bucket >= 3 {
            PredictionConfidence::High
        } else if final_bucket >= 1 {
            PredictionConfidence::Medium
        } else {
            PredictionConfidence::Low
        };

        Ok(BedAvailabilityForecast {
            unit: unit.to_string(),
            current_available,
            buckets,
            confidence,
        })
    }

    /// Notify receiving-unit staff that the transfer is starting and flip the
    /// admission to transfer-in-progress. Repeat calls for the same admission
    /// and unit inside the dedup window are suppressed.
    pub fn notify_transfer(
        &self,
        tenant: &TenantId,
        admission_id: &AdmissionId,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TransferPrioritization, now)?;

        let admission = self
            .store
            .admission(tenant, admission_id)?
            .ok_or_else(|| EngineError::not_found("admission", &admission_id.0))?;
        if !matches!(
            admission.status,
            AdmissionStatus::AwaitingTransfer | AdmissionStatus::TransferInProgress
        ) {
            return Err(EngineError::validation(format!(
                "admission {} is not awaiting transfer",
                admission_id.0
            )));
        }

        let recent = self.store.recent_for(
            tenant,
            admission_id,
            &admission.unit,
            now - self.dedup_window,
        )?;
        if !recent.is_empty() {
            tracing::info!(
                tenant = %tenant,
                admission = %admission_id,
                unit = admission.unit,
                "transfer notification suppressed as duplicate"
            );
            return Ok(NotifyOutcome {
                notifications_sent: 0,
                suppressed_as_duplicate: true,
            });
        }

        let staff = self.store.on_duty(tenant, &admission.unit)?;
        let mut sent = 0;
        for member in staff {
            self.store.push(
                tenant,
                Notification {
                    recipient: member.id,
                    unit: admission.unit.clone(),
                    admission_id: admission_id.clone(),
                    message: format!(
                        "Incoming transfer: admission {} (acuity {}) en route to {}",
                        admission_id.0, admission.acuity_level, admission.unit
                    ),
                    created_at: now,
                },
            )?;
            sent += 1;
        }

        if admission.status == AdmissionStatus::AwaitingTransfer {
            self.store.set_admission_status(
                tenant,
                admission_id,
                AdmissionStatus::TransferInProgress,
                now,
            )?;
        }

        tracing::info!(
            tenant = %tenant,
            admission = %admission_id,
            unit = admission.unit,
            notified = sent,
            "transfer notifications dispatched"
        );
        Ok(NotifyOutcome {
            notifications_sent: sent,
            suppressed_as_duplicate: false,
        })
    }

    pub fn metrics(
        &self,
        tenant: &TenantId,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<TransferMetrics, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TransferPrioritization, now)?;
        let since = now - Duration::days(window_days);

        let awaiting = self
            .store
            .admissions_with_status(tenant, AdmissionStatus::AwaitingTransfer)?;

        let transferred: Vec<Admission> = self
            .store
            .admissions_with_status(tenant, AdmissionStatus::TransferInProgress)?
            .into_iter()
            .filter(|admission| {
                admission
                    .transfer_started_at
                    .map(|at| at >= since)
                    .unwrap_or(false)
            })
            .collect();

        let mut total_boarding_hours = 0.0;
        let mut within_target = 0usize;
        for admission in &transferred {
            let Some(started) = admission.transfer_started_at else {
                continue;
            };
            let boarding_hours = (started - admission.admitted_at).num_minutes() as f64 / 60.0;
            total_boarding_hours += boarding_hours;
            if boarding_hours <= target_hours(admission.acuity_level) {
                within_target += 1;
            }
        }

        let priorities = self.store.latest_transfer_priorities(tenant)?;
        let urgent_count = priorities
            .iter()
            .filter(|priority| priority.score >= 80.0)
            .count();
        let average_priority = if priorities.is_empty() {
            0.0
        } else {
            priorities.iter().map(|priority| priority.score).sum::<f64>()
                / priorities.len() as f64
        };

        let transferred_count = transferred.len();
        Ok(TransferMetrics {
            window_days,
            awaiting_count: awaiting.len(),
            transferred_count,
            average_boarding_hours: if transferred_count == 0 {
                0.0
            } else {
                total_boarding_hours / transferred_count as f64
            },
            within_target_pct: if transferred_count == 0 {
                0.0
            } else {
                within_target as f64 / transferred_count as f64 * 100.0
            },
            average_priority,
            urgent_count,
        })
    }

    fn estimate_available(
        forecast: &BedAvailabilityForecast,
        acuity: u8,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        // Higher acuity scans from the earliest checkpoint.
        let floor_hours = match acuity {
            1 => 1,
            2 => 2,
            3 => 4,
            _ => 8,
        };
        let candidate = forecast
            .buckets
            .iter()
            .filter(|bucket| bucket.hours_ahead >= floor_hours)
            .find(|bucket| bucket.predicted_available > 0);
        match candidate {
            Some(bucket) => now + Duration::hours(bucket.hours_ahead),
            None if forecast.current_available > 0 => now,
            None => now + Duration::hours(8),
        }
    }
}
