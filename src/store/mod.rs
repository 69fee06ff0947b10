//! Storage abstractions consumed by the engines.
//!
//! Every trait is tenant-scoped and synchronous; callers establish tenant
//! scope before invoking engine methods. Composite write payloads bundle a
//! state change with the audit row describing it so that backends persist
//! both in a single transaction; an audit failure fails the whole write.

pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Admission, AdmissionId, AdmissionStatus, AuditEntry, Bed, BedAssignment, BedId, DailyCensus,
    Diagnosis, DischargeReadinessPrediction, FeatureFlag, FlagAuditEntry, LabResult,
    MedicationOrder, Notification, Patient, PatientId, StaffMember, TenantId, TransferPriority,
    TurnoverEvent, VitalsRecord,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conditional write lost: row no longer in the expected state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic bed-assignment write: claim the bed only if it is still available,
/// append the ledger row, link the patient, and record the audit entry.
/// Backends surface [`StoreError::Conflict`] when the claim loses a race.
#[derive(Debug, Clone)]
pub struct AssignmentWrite {
    pub assignment: BedAssignment,
    pub audit: AuditEntry,
}

/// Atomic bed status transition: persist the updated bed, the audit entry,
/// and, when a cleaning cycle completed, the turnover event row.
#[derive(Debug, Clone)]
pub struct BedTransitionWrite {
    pub bed: Bed,
    pub audit: AuditEntry,
    pub turnover_event: Option<TurnoverEvent>,
}

/// Atomic isolation update on a patient plus its audit entry.
#[derive(Debug, Clone)]
pub struct IsolationWrite {
    pub patient: Patient,
    pub audit: AuditEntry,
}

/// Atomic feature-flag write: the updated flag row plus the audit entry
/// capturing previous and new state.
#[derive(Debug, Clone)]
pub struct FlagWrite {
    pub flag: FeatureFlag,
    pub audit: FlagAuditEntry,
}

/// Beds, the assignment ledger, and turnover history.
pub trait BedStore: Send + Sync {
    fn bed(&self, tenant: &TenantId, id: &BedId) -> Result<Option<Bed>, StoreError>;
    fn beds(&self, tenant: &TenantId) -> Result<Vec<Bed>, StoreError>;
    fn beds_in_unit(&self, tenant: &TenantId, unit: &str) -> Result<Vec<Bed>, StoreError>;
    fn assign(&self, tenant: &TenantId, write: AssignmentWrite)
        -> Result<BedAssignment, StoreError>;
    fn apply_transition(&self, tenant: &TenantId, write: BedTransitionWrite)
        -> Result<Bed, StoreError>;
    fn assignments(&self, tenant: &TenantId) -> Result<Vec<BedAssignment>, StoreError>;
    fn turnover_events(
        &self,
        tenant: &TenantId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TurnoverEvent>, StoreError>;
}

/// Patients, admissions, and charted clinical data.
pub trait ClinicalStore: Send + Sync {
    fn patient(&self, tenant: &TenantId, id: &PatientId) -> Result<Option<Patient>, StoreError>;
    fn admission(
        &self,
        tenant: &TenantId,
        id: &AdmissionId,
    ) -> Result<Option<Admission>, StoreError>;
    fn admissions_with_status(
        &self,
        tenant: &TenantId,
        status: AdmissionStatus,
    ) -> Result<Vec<Admission>, StoreError>;
    fn diagnoses_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Diagnosis>, StoreError>;
    fn lab_results_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<LabResult>, StoreError>;
    fn pending_labs(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
    ) -> Result<Vec<LabResult>, StoreError>;
    fn vitals_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<VitalsRecord>, StoreError>;
    fn medication_orders(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
    ) -> Result<Vec<MedicationOrder>, StoreError>;
    fn persist_isolation(&self, tenant: &TenantId, write: IsolationWrite)
        -> Result<(), StoreError>;
    fn set_admission_status(
        &self,
        tenant: &TenantId,
        id: &AdmissionId,
        status: AdmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Append-only scoring history with materialized latest-per-admission views.
pub trait PredictionStore: Send + Sync {
    fn record_readiness(
        &self,
        tenant: &TenantId,
        prediction: DischargeReadinessPrediction,
    ) -> Result<(), StoreError>;
    fn latest_readiness(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
    ) -> Result<Option<DischargeReadinessPrediction>, StoreError>;
    fn latest_readiness_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<DischargeReadinessPrediction>, StoreError>;
    fn readiness_history(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
    ) -> Result<Vec<DischargeReadinessPrediction>, StoreError>;
    fn record_transfer_priority(
        &self,
        tenant: &TenantId,
        priority: TransferPriority,
    ) -> Result<(), StoreError>;
    fn latest_transfer_priorities(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<TransferPriority>, StoreError>;
}

/// Feature-flag rows and their audit trail.
pub trait FlagStore: Send + Sync {
    fn flag(&self, tenant: &TenantId, feature: &str) -> Result<Option<FeatureFlag>, StoreError>;
    fn apply(&self, write: FlagWrite) -> Result<(), StoreError>;
    fn audit_log(
        &self,
        tenant: &TenantId,
        feature: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FlagAuditEntry>, StoreError>;
}

/// Staffing rosters and census history for forecasting.
pub trait StaffingStore: Send + Sync {
    fn on_duty(&self, tenant: &TenantId, unit: &str) -> Result<Vec<StaffMember>, StoreError>;
    fn census_history(
        &self,
        tenant: &TenantId,
        unit: Option<&str>,
        since: NaiveDate,
    ) -> Result<Vec<DailyCensus>, StoreError>;
}

/// Outbound notification queue for receiving-unit staff.
pub trait NotificationOutbox: Send + Sync {
    fn push(&self, tenant: &TenantId, notification: Notification) -> Result<(), StoreError>;
    fn recent_for(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
        unit: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError>;
}

/// Read side of the operational audit trail, keyed by subject identifier.
pub trait AuditTrail: Send + Sync {
    fn entries_for(&self, tenant: &TenantId, subject: &str) -> Result<Vec<AuditEntry>, StoreError>;
}
