//! Tenant-scoped feature gates for the decision-support engines.
//!
//! Reads are served through an injected TTL cache; writes are atomic
//! flag-plus-audit transactions followed by immediate cache invalidation, so
//! a disable is observable on the very next read regardless of TTL.

mod cache;

#[cfg(test)]
mod tests;

pub use cache::{FlagCache, ReadFailurePolicy, TtlFlagCache};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::domain::{FeatureFlag, FlagAuditEntry, TenantId};
use crate::error::EngineError;
use crate::store::{FlagStore, FlagWrite};

/// Engine capabilities that can be gated per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    BedScoring,
    IsolationControl,
    DischargePlanning,
    TransferPrioritization,
    CapacityForecasting,
    TurnoverTracking,
}

impl Feature {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BedScoring => "bed_scoring",
            Self::IsolationControl => "isolation_control",
            Self::DischargePlanning => "discharge_planning",
            Self::TransferPrioritization => "transfer_prioritization",
            Self::CapacityForecasting => "capacity_forecasting",
            Self::TurnoverTracking => "turnover_tracking",
        }
    }

    pub const fn all() -> [Self; 6] {
        [
            Self::BedScoring,
            Self::IsolationControl,
            Self::DischargePlanning,
            Self::TransferPrioritization,
            Self::CapacityForecasting,
            Self::TurnoverTracking,
        ]
    }
}

/// Service composing the flag store, the read cache, and the failure policy.
pub struct FeatureFlagService<S> {
    store: Arc<S>,
    cache: Arc<dyn FlagCache>,
    policy: ReadFailurePolicy,
}

impl<S> FeatureFlagService<S>
where
    S: FlagStore + 'static,
{
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self::with_cache(
            store,
            Arc::new(TtlFlagCache::new(ttl)),
            ReadFailurePolicy::FailOpen,
        )
    }

    pub fn with_cache(
        store: Arc<S>,
        cache: Arc<dyn FlagCache>,
        policy: ReadFailurePolicy,
    ) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    /// Cached lookup. A missing row means disabled; a store failure is
    /// resolved by the configured [`ReadFailurePolicy`].
    pub fn is_enabled(&self, tenant: &TenantId, feature: Feature, now: DateTime<Utc>) -> bool {
        if let Some(enabled) = self.cache.get(tenant, feature.as_str(), now) {
            return enabled;
        }

        match self.store.flag(tenant, feature.as_str()) {
            Ok(flag) => {
                let enabled = flag.map(|flag| flag.enabled).unwrap_or(false);
                self.cache.put(tenant, feature.as_str(), enabled, now);
                enabled
            }
            Err(error) => {
                let fallback = self.policy.fallback();
                tracing::warn!(
                    tenant = %tenant,
                    feature = feature.as_str(),
                    policy = self.policy.label(),
                    fallback,
                    %error,
                    "flag store read failed, applying failure policy"
                );
                fallback
            }
        }
    }

    /// Gate helper used by the other engines.
    pub fn require_enabled(
        &self,
        tenant: &TenantId,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.is_enabled(tenant, feature, now) {
            Ok(())
        } else {
            Err(EngineError::FeatureDisabled {
                tenant: tenant.clone(),
                feature: feature.as_str().to_string(),
            })
        }
    }

    pub fn enable(
        &self,
        tenant: &TenantId,
        feature: Feature,
        by: &str,
        configuration: Option<Value>,
        now: DateTime<Utc>,
    ) -> Result<FeatureFlag, EngineError> {
        let previous = self.store.flag(tenant, feature.as_str())?;
        let configuration = configuration
            .or_else(|| previous.as_ref().map(|flag| flag.configuration.clone()))
            .unwrap_or(Value::Null);
        self.write(tenant, feature, true, by, None, configuration, previous, now)
    }

    /// Disabling a clinical capability always requires a documented reason.
    pub fn disable(
        &self,
        tenant: &TenantId,
        feature: Feature,
        by: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<FeatureFlag, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::validation(
                "disabling a feature requires a non-empty reason",
            ));
        }
        let previous = self.store.flag(tenant, feature.as_str())?;
        let configuration = previous
            .as_ref()
            .map(|flag| flag.configuration.clone())
            .unwrap_or(Value::Null);
        self.write(
            tenant,
            feature,
            false,
            by,
            Some(reason.to_string()),
            configuration,
            previous,
            now,
        )
    }

    pub fn update_configuration(
        &self,
        tenant: &TenantId,
        feature: Feature,
        by: &str,
        configuration: Value,
        now: DateTime<Utc>,
    ) -> Result<FeatureFlag, EngineError> {
        let previous = self
            .store
            .flag(tenant, feature.as_str())?
            .ok_or_else(|| EngineError::not_found("feature_flag", feature.as_str()))?;
        let enabled = previous.enabled;
        self.write(
            tenant,
            feature,
            enabled,
            by,
            None,
            configuration,
            Some(previous),
            now,
        )
    }

    pub fn audit_log(
        &self,
        tenant: &TenantId,
        feature: Option<Feature>,
        limit: usize,
    ) -> Result<Vec<FlagAuditEntry>, EngineError> {
        Ok(self
            .store
            .audit_log(tenant, feature.map(Feature::as_str), limit)?)
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &self,
        tenant: &TenantId,
        feature: Feature,
        enabled: bool,
        by: &str,
        reason: Option<String>,
        configuration: Value,
        previous: Option<FeatureFlag>,
        now: DateTime<Utc>,
    ) -> Result<FeatureFlag, EngineError> {
        let flag = FeatureFlag {
            tenant: tenant.clone(),
            feature: feature.as_str().to_string(),
            enabled,
            configuration: configuration.clone(),
            updated_at: now,
            updated_by: by.to_string(),
            reason: reason.clone(),
        };
        let audit = FlagAuditEntry {
            tenant: tenant.clone(),
            feature: feature.as_str().to_string(),
            previous_enabled: previous.as_ref().map(|flag| flag.enabled),
            new_enabled: enabled,
            previous_configuration: previous.map(|flag| flag.configuration),
            new_configuration: configuration,
            changed_by: by.to_string(),
            reason,
            recorded_at: now,
        };

        self.store.apply(FlagWrite {
            flag: flag.clone(),
            audit,
        })?;
        self.cache.invalidate(tenant, feature.as_str());

        tracing::info!(
            tenant = %tenant,
            feature = feature.as_str(),
            enabled,
            by,
            "feature flag updated"
        );
        Ok(flag)
    }
}
