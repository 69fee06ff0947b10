use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use crate::domain::{FeatureFlag, FlagAuditEntry, TenantId};
use crate::engines::flags::{Feature, FeatureFlagService, ReadFailurePolicy, TtlFlagCache};
use crate::error::EngineError;
use crate::store::{FlagStore, FlagWrite, StoreError};
use crate::testkit::{fixed_now, flag_service, store, tenant};

struct UnavailableFlagStore;

impl FlagStore for UnavailableFlagStore {
    fn flag(&self, _tenant: &TenantId, _feature: &str) -> Result<Option<FeatureFlag>, StoreError> {
        Err(StoreError::Unavailable("flag table offline".to_string()))
    }

    fn apply(&self, _write: FlagWrite) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("flag table offline".to_string()))
    }

    fn audit_log(
        &self,
        _tenant: &TenantId,
        _feature: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<FlagAuditEntry>, StoreError> {
        Err(StoreError::Unavailable("flag table offline".to_string()))
    }
}

#[test]
fn missing_flag_defaults_to_disabled() {
    let store = store();
    let flags = flag_service(&store);

    assert!(!flags.is_enabled(&tenant(), Feature::BedScoring, fixed_now()));
}

#[test]
fn enable_then_read_round_trips_through_cache() {
    let store = store();
    let flags = flag_service(&store);
    let now = fixed_now();

    flags
        .enable(&tenant(), Feature::BedScoring, "ops", None, now)
        .expect("flag enables");

    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now));
    // Second read inside the TTL window is served from cache.
    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now + Duration::minutes(2)));
}

#[test]
fn disable_requires_a_reason() {
    let store = store();
    let flags = flag_service(&store);

    let error = flags
        .disable(&tenant(), Feature::BedScoring, "ops", "   ", fixed_now())
        .expect_err("blank reason is rejected");
    assert!(matches!(error, EngineError::Validation(_)));
}

#[test]
fn disable_invalidates_cache_before_ttl_expiry() {
    let store = store();
    let flags = flag_service(&store);
    let now = fixed_now();

    flags
        .enable(&tenant(), Feature::BedScoring, "ops", None, now)
        .expect("flag enables");
    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now));

    flags
        .disable(
            &tenant(),
            Feature::BedScoring,
            "ops",
            "pilot rollback",
            now + Duration::minutes(1),
        )
        .expect("flag disables");

    // Still inside the original 5-minute TTL window, yet the disable is
    // already observable.
    assert!(!flags.is_enabled(&tenant(), Feature::BedScoring, now + Duration::minutes(2)));
}

#[test]
fn audit_log_is_newest_first_and_captures_previous_state() {
    let store = store();
    let flags = flag_service(&store);
    let now = fixed_now();

    flags
        .enable(&tenant(), Feature::BedScoring, "ops", None, now)
        .expect("flag enables");
    flags
        .disable(
            &tenant(),
            Feature::BedScoring,
            "ops",
            "pilot rollback",
            now + Duration::minutes(10),
        )
        .expect("flag disables");

    let log = flags
        .audit_log(&tenant(), Some(Feature::BedScoring), 10)
        .expect("audit log reads");
    assert_eq!(log.len(), 2);
    assert!(!log[0].new_enabled);
    assert_eq!(log[0].previous_enabled, Some(true));
    assert_eq!(log[0].reason.as_deref(), Some("pilot rollback"));
    assert!(log[1].new_enabled);
    assert_eq!(log[1].previous_enabled, None);
}

#[test]
fn update_configuration_requires_an_existing_flag() {
    let store = store();
    let flags = flag_service(&store);

    let error = flags
        .update_configuration(
            &tenant(),
            Feature::BedScoring,
            "ops",
            json!({"max_candidates": 10}),
            fixed_now(),
        )
        .expect_err("missing flag row is rejected");
    assert!(matches!(error, EngineError::NotFound { .. }));
}

#[test]
fn update_configuration_preserves_enabled_state() {
    let store = store();
    let flags = flag_service(&store);
    let now = fixed_now();

    flags
        .enable(&tenant(), Feature::BedScoring, "ops", None, now)
        .expect("flag enables");
    let updated = flags
        .update_configuration(
            &tenant(),
            Feature::BedScoring,
            "ops",
            json!({"max_candidates": 10}),
            now + Duration::minutes(1),
        )
        .expect("configuration updates");

    assert!(updated.enabled);
    assert_eq!(updated.configuration, json!({"max_candidates": 10}));
    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now + Duration::minutes(2)));
}

#[test]
fn fail_open_policy_treats_store_errors_as_enabled() {
    let flags = FeatureFlagService::with_cache(
        Arc::new(UnavailableFlagStore),
        Arc::new(TtlFlagCache::default()),
        ReadFailurePolicy::FailOpen,
    );

    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, fixed_now()));
}

#[test]
fn fail_closed_policy_treats_store_errors_as_disabled() {
    let flags = FeatureFlagService::with_cache(
        Arc::new(UnavailableFlagStore),
        Arc::new(TtlFlagCache::default()),
        ReadFailurePolicy::FailClosed,
    );

    assert!(!flags.is_enabled(&tenant(), Feature::BedScoring, fixed_now()));
}

#[test]
fn ttl_expiry_falls_back_to_the_store() {
    let store = store();
    let flags = flag_service(&store);
    let now = fixed_now();

    flags
        .enable(&tenant(), Feature::BedScoring, "ops", None, now)
        .expect("flag enables");
    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now));

    // Past the TTL the cache entry is stale and the store row still wins.
    assert!(flags.is_enabled(&tenant(), Feature::BedScoring, now + Duration::minutes(6)));
}
