use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::domain::TenantId;

/// Behavior of the flag read path when the backing store errors.
///
/// Fail-open treats errors as enabled so clinical workflows never block on
/// infrastructure hiccups; it is deliberately risky and every application of
/// the policy is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    FailOpen,
    FailClosed,
}

impl ReadFailurePolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }

    pub const fn fallback(self) -> bool {
        matches!(self, Self::FailOpen)
    }
}

/// Cache abstraction so the flag service can be backed by any
/// concurrency-safe map or external cache service.
pub trait FlagCache: Send + Sync {
    fn get(&self, tenant: &TenantId, feature: &str, now: DateTime<Utc>) -> Option<bool>;
    fn put(&self, tenant: &TenantId, feature: &str, enabled: bool, now: DateTime<Utc>);
    fn invalidate(&self, tenant: &TenantId, feature: &str);
}

struct CachedFlag {
    enabled: bool,
    cached_at: DateTime<Utc>,
}

/// Mutex-guarded TTL cache keyed by tenant + feature.
pub struct TtlFlagCache {
    ttl: Duration,
    entries: Mutex<HashMap<(TenantId, String), CachedFlag>>,
}

impl TtlFlagCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for TtlFlagCache {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

impl FlagCache for TtlFlagCache {
    fn get(&self, tenant: &TenantId, feature: &str, now: DateTime<Utc>) -> Option<bool> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return None,
        };
        entries
            .get(&(tenant.clone(), feature.to_string()))
            .filter(|cached| now - cached.cached_at < self.ttl)
            .map(|cached| cached.enabled)
    }

    fn put(&self, tenant: &TenantId, feature: &str, enabled: bool, now: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                (tenant.clone(), feature.to_string()),
                CachedFlag {
                    enabled,
                    cached_at: now,
                },
            );
        }
    }

    fn invalidate(&self, tenant: &TenantId, feature: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&(tenant.clone(), feature.to_string()));
        }
    }
}
