use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier scoping every engine call to a single hospital tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BedId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdmissionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaffId(pub String);

impl fmt::Display for BedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AdmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Infection-control category assigned to patients and isolation-capable beds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationType {
    Contact,
    Droplet,
    Airborne,
    Protective,
}

impl IsolationType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Droplet => "droplet",
            Self::Airborne => "airborne",
            Self::Protective => "protective",
        }
    }

    /// Clinical restrictiveness used to tie-break multiple matched categories.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Airborne => 3,
            Self::Droplet => 2,
            Self::Contact => 1,
            Self::Protective => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
    Reserved,
}

impl BedStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Cleaning => "cleaning",
            Self::Maintenance => "maintenance",
            Self::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStatus {
    Dirty,
    InProgress,
    Clean,
}

impl CleaningStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dirty => "dirty",
            Self::InProgress => "in_progress",
            Self::Clean => "clean",
        }
    }
}

/// Whether a cleaning request was flagged stat by the requesting unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPriority {
    Routine,
    Stat,
}

/// A physical bed. Beds are never deleted; status changes flow through the
/// turnover state machine and every change is audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub unit: String,
    pub isolation_capable: bool,
    /// Immutable room metadata, not patient-specific.
    pub isolation_type: Option<IsolationType>,
    pub telemetry: bool,
    pub oxygen: bool,
    pub bariatric: bool,
    /// Metres from the nurses' station.
    pub distance_to_station: f32,
    pub status: BedStatus,
    pub cleaning_status: CleaningStatus,
    pub cleaning_priority: CleaningPriority,
    pub occupied_at: Option<DateTime<Utc>>,
    pub available_at: Option<DateTime<Utc>>,
    pub last_cleaned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityStatus {
    Ambulatory,
    Wheelchair,
    Bedbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DischargeDestination {
    Home,
    HomeHealth,
    SkilledNursing,
    Rehab,
}

impl DischargeDestination {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::HomeHealth => "home_health",
            Self::SkilledNursing => "skilled_nursing",
            Self::Rehab => "rehab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub isolation_required: bool,
    pub isolation_type: Option<IsolationType>,
    pub isolation_start: Option<DateTime<Utc>>,
    pub isolation_end: Option<DateTime<Utc>>,
    pub mobility_status: MobilityStatus,
    /// Self-reported 0-10 scale.
    pub pain_level: u8,
    pub discharge_destination: Option<DischargeDestination>,
    pub current_bed: Option<BedId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Active,
    AwaitingTransfer,
    TransferInProgress,
    Discharged,
}

impl AdmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::AwaitingTransfer => "awaiting_transfer",
            Self::TransferInProgress => "transfer_in_progress",
            Self::Discharged => "discharged",
        }
    }
}

/// Discharge-planning checklist captured on the admission by case management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargePlanning {
    pub placement_arranged: bool,
    pub transportation_arranged: bool,
    pub medication_reconciliation_complete: bool,
    pub completed_education_topics: u8,
    pub follow_up_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub id: AdmissionId,
    pub patient_id: PatientId,
    pub unit: String,
    /// 1 (critical) through 5 (non-urgent), assigned at ED admission.
    pub acuity_level: u8,
    pub admitted_at: DateTime<Utc>,
    pub status: AdmissionStatus,
    pub planning: DischargePlanning,
    pub transfer_started_at: Option<DateTime<Utc>>,
    pub discharged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub patient_id: PatientId,
    /// ICD-10 code as charted, e.g. "A04.7".
    pub code: String,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub patient_id: PatientId,
    pub test_name: String,
    /// Free-text organism / result line reported by the lab.
    pub result_text: String,
    pub positive: bool,
    pub pending: bool,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsRecord {
    pub patient_id: PatientId,
    pub recorded_at: DateTime<Utc>,
    pub stable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub patient_id: PatientId,
    pub name: String,
    pub active: bool,
    pub requires_monitoring: bool,
}

/// Append-only ledger row linking a patient to a bed. Never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedAssignment {
    pub bed_id: BedId,
    pub patient_id: PatientId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: StaffId,
    pub reasoning: String,
    /// Patient isolation state captured at assignment time.
    pub isolation_snapshot: Option<IsolationType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Nurse,
    Doctor,
    Support,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub unit: String,
    pub role: StaffRole,
    pub on_duty: bool,
}

/// One row of the append-only operational audit trail. Audit writes are part
/// of the same transaction as the state change they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub subject: String,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: StaffId,
    pub unit: String,
    pub admission_id: AdmissionId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Completed cleaning cycle recorded when a bed returns to service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverEvent {
    pub bed_id: BedId,
    pub unit: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub target_minutes: i64,
    pub exceeded_target: bool,
}

/// Daily occupancy snapshot retained for forecasting and seasonal analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCensus {
    pub unit: String,
    pub date: NaiveDate,
    pub occupied: u32,
    pub capacity: u32,
    pub admissions: u32,
}

/// Tenant-scoped gate for one engine capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub tenant: TenantId,
    pub feature: String,
    pub enabled: bool,
    pub configuration: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierCategory {
    Medical,
    Social,
    Administrative,
    Equipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierSeverity {
    Low,
    Moderate,
    High,
}

/// Discrete obstacle delaying a discharge, derived from a triggered scoring
/// deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    UnstableVitals,
    PendingLabs,
    MonitoredMedications,
    LimitedMobility,
    UncontrolledPain,
    NoDestination,
    PlacementUnarranged,
    HomeHealthUnarranged,
    TransportationUnarranged,
    MedicationReconciliationIncomplete,
    EducationIncomplete,
    NoFollowUp,
}

impl BarrierKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnstableVitals => "unstable_vitals",
            Self::PendingLabs => "pending_labs",
            Self::MonitoredMedications => "monitored_medications",
            Self::LimitedMobility => "limited_mobility",
            Self::UncontrolledPain => "uncontrolled_pain",
            Self::NoDestination => "no_destination",
            Self::PlacementUnarranged => "placement_unarranged",
            Self::HomeHealthUnarranged => "home_health_unarranged",
            Self::TransportationUnarranged => "transportation_unarranged",
            Self::MedicationReconciliationIncomplete => "medication_reconciliation_incomplete",
            Self::EducationIncomplete => "education_incomplete",
            Self::NoFollowUp => "no_follow_up",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "unstable_vitals" => Some(Self::UnstableVitals),
            "pending_labs" => Some(Self::PendingLabs),
            "monitored_medications" => Some(Self::MonitoredMedications),
            "limited_mobility" => Some(Self::LimitedMobility),
            "uncontrolled_pain" => Some(Self::UncontrolledPain),
            "no_destination" => Some(Self::NoDestination),
            "placement_unarranged" => Some(Self::PlacementUnarranged),
            "home_health_unarranged" => Some(Self::HomeHealthUnarranged),
            "transportation_unarranged" => Some(Self::TransportationUnarranged),
            "medication_reconciliation_incomplete" => {
                Some(Self::MedicationReconciliationIncomplete)
            }
            "education_incomplete" => Some(Self::EducationIncomplete),
            "no_follow_up" => Some(Self::NoFollowUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeBarrier {
    pub kind: BarrierKind,
    pub category: BarrierCategory,
    pub description: String,
    pub severity: BarrierSeverity,
    pub estimated_delay_hours: i64,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionPriority {
    Routine,
    Urgent,
}

/// Action suggested to clear a specific barrier, produced from a static
/// barrier-kind lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedIntervention {
    pub barrier: BarrierKind,
    pub role: StaffRole,
    pub priority: InterventionPriority,
    pub description: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionConfidence {
    High,
    Medium,
    Low,
}

impl PredictionConfidence {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Latest scoring run for an admission's discharge readiness. Stored as an
/// append-only log; reads materialize the newest record per admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeReadinessPrediction {
    pub admission_id: AdmissionId,
    pub patient_id: PatientId,
    pub overall_score: f64,
    pub medical_score: f64,
    pub social_score: f64,
    pub barriers: Vec<DischargeBarrier>,
    pub interventions: Vec<PlannedIntervention>,
    pub predicted_discharge_date: DateTime<Utc>,
    pub confidence: PredictionConfidence,
    pub computed_at: DateTime<Utc>,
}

/// Latest transfer-priority scoring run for an ED admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPriority {
    pub admission_id: AdmissionId,
    pub patient_id: PatientId,
    pub unit: String,
    pub score: f64,
    pub acuity_component: f64,
    pub wait_component: f64,
    pub isolation_bonus: f64,
    pub computed_at: DateTime<Utc>,
}

/// Audit record capturing both sides of a flag write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagAuditEntry {
    pub tenant: TenantId,
    pub feature: String,
    pub previous_enabled: Option<bool>,
    pub new_enabled: bool,
    pub previous_configuration: Option<serde_json::Value>,
    pub new_configuration: serde_json::Value,
    pub changed_by: String,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
