use crate::domain::TenantId;
use crate::store::StoreError;

/// Error raised by the decision-support engines.
///
/// Validation and not-found conditions surface immediately and are never
/// retried; store failures propagate so transactional writes roll back at the
/// backend rather than being swallowed here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("feature '{feature}' is disabled for tenant {tenant}")]
    FeatureDisabled { tenant: TenantId, feature: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("bed '{bed}' is no longer available")]
    Conflict { bed: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
