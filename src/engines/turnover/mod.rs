//! Bed turnover tracking.
//!
//! Drives the bed status state machine, stamps lifecycle timestamps, records
//! completed cleaning cycles against per-bed targets, and ranks the cleaning
//! queue for environmental services.


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditEntry, Bed, BedId, BedStatus, CleaningPriority, CleaningStatus, TenantId, TurnoverEvent,
};
use crate::engines::flags::{Feature, FeatureFlagService};
use crate::error::EngineError;
use crate::store::{BedStore, BedTransitionWrite, FlagStore};

/// Cleaning-time targets in minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnoverTargets {
    pub stat_minutes: i64,
    pub isolation_minutes: i64,
    pub standard_minutes: i64,
}

pub const DEFAULT_TARGETS: TurnoverTargets = TurnoverTargets {
    stat_minutes: 30,
    isolation_minutes: 90,
    standard_minutes: 60,
};

impl TurnoverTargets {
    /// Stat requests outrank the isolation-capable target.
    pub fn target_minutes_for(&self, bed: &Bed) -> i64 {
        if bed.cleaning_priority == CleaningPriority::Stat {
            self.stat_minutes
        } else if bed.isolation_capable {
            self.isolation_minutes
        } else {
            self.standard_minutes
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningAction {
    Critical,
    Overdue,
    Warning,
    Normal,
}

impl CleaningAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Overdue => "overdue",
            Self::Warning => "warning",
            Self::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningQueueEntry {
    pub bed_id: BedId,
    pub unit: String,
    pub priority: CleaningPriority,
    pub base_priority: f64,
    pub waiting_minutes: i64,
    pub target_minutes: i64,
    pub urgency_score: f64,
    pub recommended_action: CleaningAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverStats {
    pub count: usize,
    pub average_minutes: f64,
    pub median_minutes: f64,
    pub min_minutes: i64,
    pub max_minutes: i64,
    pub exceeded_target_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverMetrics {
    pub window_days: i64,
    pub overall: Option<TurnoverStats>,
    pub by_unit: BTreeMap<String, TurnoverStats>,
}

pub struct TurnoverTracker<S> {
    store: Arc<S>,
    flags: Arc<FeatureFlagService<S>>,
    targets: TurnoverTargets,
}

impl<S> TurnoverTracker<S>
where
    S: BedStore + FlagStore + 'static,
{
    pub fn new(store: Arc<S>, flags: Arc<FeatureFlagService<S>>) -> Self {
        Self::with_targets(store, flags, DEFAULT_TARGETS)
    }

    pub fn with_targets(
        store: Arc<S>,
        flags: Arc<FeatureFlagService<S>>,
        targets: TurnoverTargets,
    ) -> Self {
        Self {
            store,
            flags,
            targets,
        }
    }

    /// Move a bed through the state machine, stamping lifecycle timestamps
    /// and auditing the change. Completing a cleaning cycle records the
    /// turnover event against the bed's target in the same transaction.
    pub fn update_status(
        &self,
        tenant: &TenantId,
        bed_id: &BedId,
        status: BedStatus,
        cleaning_status: Option<CleaningStatus>,
        cleaning_priority: Option<CleaningPriority>,
        changed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Bed, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TurnoverTracking, now)?;

        let previous = self
            .store
            .bed(tenant, bed_id)?
            .ok_or_else(|| EngineError::not_found("bed", &bed_id.0))?;

        if !Self::transition_allowed(previous.status, status, cleaning_status) {
            return Err(EngineError::validation(format!(
                "invalid bed transition {} -> {}",
                previous.status.label(),
                status.label()
            )));
        }

        let mut bed = previous.clone();
        bed.status = status;
        if let Some(priority) = cleaning_priority {
            bed.cleaning_priority = priority;
        }

        if status != previous.status {
            match status {
                BedStatus::Occupied => bed.occupied_at = Some(now),
                // Entering available or starting a cleaning cycle both mark
                // the moment the bed left service.
                BedStatus::Available | BedStatus::Cleaning => bed.available_at = Some(now),
                _ => {}
            }
        }
        if status == BedStatus::Cleaning && previous.status != BedStatus::Cleaning {
            bed.cleaning_status = cleaning_status.unwrap_or(CleaningStatus::Dirty);
        } else if let Some(cleaning_status) = cleaning_status {
            bed.cleaning_status = cleaning_status;
        }
        if bed.cleaning_status == CleaningStatus::Clean
            && previous.cleaning_status != CleaningStatus::Clean
        {
            bed.last_cleaned_at = Some(now);
        }

        let turnover_event = if previous.status == BedStatus::Cleaning
            && status == BedStatus::Available
        {
            previous.available_at.map(|started_at| {
                let duration_minutes = (now - started_at).num_minutes();
                let target_minutes = self.targets.target_minutes_for(&previous);
                TurnoverEvent {
                    bed_id: bed_id.clone(),
                    unit: previous.unit.clone(),
                    started_at,
                    completed_at: now,
                    duration_minutes,
                    target_minutes,
                    exceeded_target: duration_minutes > target_minutes,
                }
            })
        } else {
            None
        };

        if status == BedStatus::Available {
            bed.cleaning_priority = CleaningPriority::Routine;
        }

        let audit = AuditEntry {
            actor: changed_by.to_string(),
            action: "bed_status_changed".to_string(),
            subject: bed_id.0.clone(),
            detail: format!("{} -> {}", previous.status.label(), status.label()),
            recorded_at: now,
        };

        if let Some(event) = &turnover_event {
            if event.exceeded_target {
                tracing::warn!(
                    tenant = %tenant,
                    bed = %bed_id,
                    duration_minutes = event.duration_minutes,
                    target_minutes = event.target_minutes,
                    "bed turnover exceeded target"
                );
            }
        }

        let bed = self.store.apply_transition(
            tenant,
            BedTransitionWrite {
                bed,
                audit,
                turnover_event,
            },
        )?;
        Ok(bed)
    }

    /// Rank beds awaiting cleaning: stat requests first, then capability
    /// (isolation > telemetry > other), then elapsed wait.
    pub fn prioritize_cleaning(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CleaningQueueEntry>, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TurnoverTracking, now)?;

        let mut queue = Vec::new();
        for bed in self.store.beds(tenant)? {
            if bed.status != BedStatus::Cleaning
                || !matches!(
                    bed.cleaning_status,
                    CleaningStatus::Dirty | CleaningStatus::InProgress
                )
            {
                continue;
            }

            let base_priority = if bed.isolation_capable {
                30.0
            } else if bed.telemetry {
                20.0
            } else {
                10.0
            };
            let waiting_minutes = bed
                .available_at
                .map(|started| (now - started).num_minutes().max(0))
                .unwrap_or(0);
            let target_minutes = self.targets.target_minutes_for(&bed);
            let urgency_score =
                base_priority + waiting_minutes as f64 / target_minutes as f64 * 100.0;

            let ratio = waiting_minutes as f64 / target_minutes as f64;
            let recommended_action = if ratio > 1.5 {
                CleaningAction::Critical
            } else if ratio > 1.0 {
                CleaningAction::Overdue
            } else if ratio > 0.8 {
                CleaningAction::Warning
            } else {
                CleaningAction::Normal
            };

            queue.push(CleaningQueueEntry {
                bed_id: bed.id.clone(),
                unit: bed.unit.clone(),
                priority: bed.cleaning_priority,
                base_priority,
                waiting_minutes,
                target_minutes,
                urgency_score,
                recommended_action,
            });
        }

        queue.sort_by(|a, b| {
            let tier = |priority: CleaningPriority| match priority {
                CleaningPriority::Stat => 0,
                CleaningPriority::Routine => 1,
            };
            tier(a.priority)
                .cmp(&tier(b.priority))
                .then_with(|| {
                    b.base_priority
                        .partial_cmp(&a.base_priority)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.waiting_minutes.cmp(&a.waiting_minutes))
        });
        Ok(queue)
    }

    pub fn metrics(
        &self,
        tenant: &TenantId,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<TurnoverMetrics, EngineError> {
        self.flags
            .require_enabled(tenant, Feature::TurnoverTracking, now)?;

        let events = self
            .store
            .turnover_events(tenant, now - Duration::days(window_days))?;

        let mut by_unit_events: BTreeMap<String, Vec<&TurnoverEvent>> = BTreeMap::new();
        for event in &events {
            by_unit_events
                .entry(event.unit.clone())
                .or_default()
                .push(event);
        }

        let by_unit: BTreeMap<String, TurnoverStats> = by_unit_events
            .into_iter()
            .filter_map(|(unit, events)| Self::stats(&events).map(|stats| (unit, stats)))
            .collect();

        Ok(TurnoverMetrics {
            window_days,
            overall: Self::stats(&events.iter().collect::<Vec<_>>()),
            by_unit,
        })
    }

    fn transition_allowed(
        from: BedStatus,
        to: BedStatus,
        cleaning_status: Option<CleaningStatus>,
    ) -> bool {
        // A same-status call is only meaningful as cleaning progress.
        if from == to {
            return from == BedStatus::Cleaning && cleaning_status.is_some();
        }
        matches!(
            (from, to),
            (BedStatus::Available, BedStatus::Occupied)
                | (BedStatus::Available, BedStatus::Cleaning)
                | (BedStatus::Available, BedStatus::Maintenance)
                | (BedStatus::Available, BedStatus::Reserved)
                | (BedStatus::Occupied, BedStatus::Available)
                | (BedStatus::Occupied, BedStatus::Cleaning)
                | (BedStatus::Cleaning, BedStatus::Available)
                | (BedStatus::Maintenance, BedStatus::Available)
                | (BedStatus::Reserved, BedStatus::Available)
                | (BedStatus::Reserved, BedStatus::Occupied)
        )
    }

    fn stats(events: &[&TurnoverEvent]) -> Option<TurnoverStats> {
        if events.is_empty() {
            return None;
        }
        let mut durations: Vec<i64> = events.iter().map(|event| event.duration_minutes).collect();
        durations.sort_unstable();

        let count = durations.len();
        let total: i64 = durations.iter().sum();
        let median = if count % 2 == 1 {
            durations[count / 2] as f64
        } else {
            (durations[count / 2 - 1] + durations[count / 2]) as f64 / 2.0
        };
        let exceeded = events.iter().filter(|event| event.exceeded_target).count();

        Some(TurnoverStats {
            count,
            average_minutes: total as f64 / count as f64,
            median_minutes: median,
            min_minutes: durations[0],
            max_minutes: durations[count - 1],
            exceeded_target_pct: exceeded as f64 / count as f64 * 100.0,
        })
    }
}
