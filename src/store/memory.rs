//! In-memory reference backend.
//!
//! All tables live behind a single mutex, so composite writes are naturally
//! atomic. Prediction records are appended to a log with a
//! latest-per-admission index rather than updated in place, keeping history
//! available for trend analysis.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Admission, AdmissionId, AdmissionStatus, AuditEntry, Bed, BedAssignment, BedId, BedStatus,
    DailyCensus, Diagnosis, DischargeReadinessPrediction, FeatureFlag, FlagAuditEntry, LabResult,
    MedicationOrder, Notification, Patient, PatientId, StaffMember, TenantId, TransferPriority,
    TurnoverEvent, VitalsRecord,
};
use crate::store::{
    AssignmentWrite, AuditTrail, BedStore, BedTransitionWrite, ClinicalStore, FlagStore, FlagWrite,
    IsolationWrite, NotificationOutbox, PredictionStore, StaffingStore, StoreError,
};

#[derive(Default)]
struct State {
    beds: HashMap<(TenantId, BedId), Bed>,
    patients: HashMap<(TenantId, PatientId), Patient>,
    admissions: HashMap<(TenantId, AdmissionId), Admission>,
    diagnoses: Vec<(TenantId, Diagnosis)>,
    lab_results: Vec<(TenantId, LabResult)>,
    vitals: Vec<(TenantId, VitalsRecord)>,
    medications: Vec<(TenantId, MedicationOrder)>,
    assignments: Vec<(TenantId, BedAssignment)>,
    turnover_events: Vec<(TenantId, TurnoverEvent)>,
    audit: Vec<(TenantId, AuditEntry)>,
    flags: HashMap<(TenantId, String), FeatureFlag>,
    flag_audit: Vec<FlagAuditEntry>,
    readiness_log: Vec<(TenantId, DischargeReadinessPrediction)>,
    readiness_latest: HashMap<(TenantId, AdmissionId), usize>,
    transfer_log: Vec<(TenantId, TransferPriority)>,
    transfer_latest: HashMap<(TenantId, AdmissionId), usize>,
    staff: Vec<(TenantId, StaffMember)>,
    census: Vec<(TenantId, DailyCensus)>,
    notifications: Vec<(TenantId, Notification)>,
}

/// Mutex-guarded in-memory store implementing every repository trait.
#[derive(Default)]
pub struct MemoryWardStore {
    state: Mutex<State>,
}

impl MemoryWardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn seed_bed(&self, tenant: &TenantId, bed: Bed) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.beds.insert((tenant.clone(), bed.id.clone()), bed);
    }

    pub fn seed_patient(&self, tenant: &TenantId, patient: Patient) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .patients
            .insert((tenant.clone(), patient.id.clone()), patient);
    }

    pub fn seed_admission(&self, tenant: &TenantId, admission: Admission) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .admissions
            .insert((tenant.clone(), admission.id.clone()), admission);
    }

    pub fn seed_diagnosis(&self, tenant: &TenantId, diagnosis: Diagnosis) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.diagnoses.push((tenant.clone(), diagnosis));
    }

    pub fn seed_lab_result(&self, tenant: &TenantId, result: LabResult) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.lab_results.push((tenant.clone(), result));
    }

    pub fn seed_vitals(&self, tenant: &TenantId, record: VitalsRecord) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.vitals.push((tenant.clone(), record));
    }

    pub fn seed_medication(&self, tenant: &TenantId, order: MedicationOrder) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.medications.push((tenant.clone(), order));
    }

    pub fn seed_staff(&self, tenant: &TenantId, member: StaffMember) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.staff.push((tenant.clone(), member));
    }

    pub fn seed_census(&self, tenant: &TenantId, census: DailyCensus) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.census.push((tenant.clone(), census));
    }

    pub fn notifications(&self, tenant: &TenantId) -> Vec<Notification> {
        let state = self.state.lock().expect("store mutex poisoned");
        state
            .notifications
            .iter()
            .filter(|(t, _)| t == tenant)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

impl BedStore for MemoryWardStore {
    fn bed(&self, tenant: &TenantId, id: &BedId) -> Result<Option<Bed>, StoreError> {
        let state = self.lock()?;
        Ok(state.beds.get(&(tenant.clone(), id.clone())).cloned())
    }

    fn beds(&self, tenant: &TenantId) -> Result<Vec<Bed>, StoreError> {
        let state = self.lock()?;
        let mut beds: Vec<Bed> = state
            .beds
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, bed)| bed.clone())
            .collect();
        beds.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(beds)
    }

    fn beds_in_unit(&self, tenant: &TenantId, unit: &str) -> Result<Vec<Bed>, StoreError> {
        Ok(self
            .beds(tenant)?
            .into_iter()
            .filter(|bed| bed.unit == unit)
            .collect())
    }

    fn assign(
        &self,
        tenant: &TenantId,
        write: AssignmentWrite,
    ) -> Result<BedAssignment, StoreError> {
        let mut state = self.lock()?;
        let bed_key = (tenant.clone(), write.assignment.bed_id.clone());
        let patient_key = (tenant.clone(), write.assignment.patient_id.clone());

        // Conditional claim: the bed row must still be available.
        let bed = state.beds.get(&bed_key).ok_or(StoreError::NotFound)?;
        if bed.status != BedStatus::Available {
            return Err(StoreError::Conflict);
        }
        if !state.patients.contains_key(&patient_key) {
            return Err(StoreError::NotFound);
        }

        let bed = state.beds.get_mut(&bed_key).ok_or(StoreError::NotFound)?;
        bed.status = BedStatus::Occupied;
        bed.occupied_at = Some(write.assignment.assigned_at);

        let patient = state
            .patients
            .get_mut(&patient_key)
            .ok_or(StoreError::NotFound)?;
        patient.current_bed = Some(write.assignment.bed_id.clone());

        state
            .assignments
            .push((tenant.clone(), write.assignment.clone()));
        state.audit.push((tenant.clone(), write.audit));
        Ok(write.assignment)
    }

    fn apply_transition(
        &self,
        tenant: &TenantId,
        write: BedTransitionWrite,
    ) -> Result<Bed, StoreError> {
        let mut state = self.lock()?;
        let key = (tenant.clone(), write.bed.id.clone());
        if !state.beds.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        state.beds.insert(key, write.bed.clone());
        state.audit.push((tenant.clone(), write.audit));
        if let Some(event) = write.turnover_event {
            state.turnover_events.push((tenant.clone(), event));
        }
        Ok(write.bed)
    }

    fn assignments(&self, tenant: &TenantId) -> Result<Vec<BedAssignment>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .assignments
            .iter()
            .filter(|(t, _)| t == tenant)
            .map(|(_, a)| a.clone())
            .collect())
    }

    fn turnover_events(
        &self,
        tenant: &TenantId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TurnoverEvent>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .turnover_events
            .iter()
            .filter(|(t, event)| t == tenant && event.completed_at >= since)
            .map(|(_, event)| event.clone())
            .collect())
    }
}

impl ClinicalStore for MemoryWardStore {
    fn patient(&self, tenant: &TenantId, id: &PatientId) -> Result<Option<Patient>, StoreError> {
        let state = self.lock()?;
        Ok(state.patients.get(&(tenant.clone(), id.clone())).cloned())
    }

    fn admission(
        &self,
        tenant: &TenantId,
        id: &AdmissionId,
    ) -> Result<Option<Admission>, StoreError> {
        let state = self.lock()?;
        Ok(state.admissions.get(&(tenant.clone(), id.clone())).cloned())
    }

    fn admissions_with_status(
        &self,
        tenant: &TenantId,
        status: AdmissionStatus,
    ) -> Result<Vec<Admission>, StoreError> {
        let state = self.lock()?;
        let mut admissions: Vec<Admission> = state
            .admissions
            .iter()
            .filter(|((t, _), admission)| t == tenant && admission.status == status)
            .map(|(_, admission)| admission.clone())
            .collect();
        admissions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(admissions)
    }

    fn diagnoses_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Diagnosis>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .diagnoses
            .iter()
            .filter(|(t, d)| t == tenant && &d.patient_id == patient && d.recorded_at >= since)
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn lab_results_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<LabResult>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .lab_results
            .iter()
            .filter(|(t, r)| t == tenant && &r.patient_id == patient && r.collected_at >= since)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn pending_labs(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
    ) -> Result<Vec<LabResult>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .lab_results
            .iter()
            .filter(|(t, r)| t == tenant && &r.patient_id == patient && r.pending)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn vitals_since(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
        since: DateTime<Utc>,
    ) -> Result<Vec<VitalsRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .vitals
            .iter()
            .filter(|(t, v)| t == tenant && &v.patient_id == patient && v.recorded_at >= since)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn medication_orders(
        &self,
        tenant: &TenantId,
        patient: &PatientId,
    ) -> Result<Vec<MedicationOrder>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .medications
            .iter()
            .filter(|(t, m)| t == tenant && &m.patient_id == patient)
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn persist_isolation(
        &self,
        tenant: &TenantId,
        write: IsolationWrite,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = (tenant.clone(), write.patient.id.clone());
        if !state.patients.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        state.patients.insert(key, write.patient);
        state.audit.push((tenant.clone(), write.audit));
        Ok(())
    }

    fn set_admission_status(
        &self,
        tenant: &TenantId,
        id: &AdmissionId,
        status: AdmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let admission = state
            .admissions
            .get_mut(&(tenant.clone(), id.clone()))
            .ok_or(StoreError::NotFound)?;
        admission.status = status;
        match status {
            AdmissionStatus::TransferInProgress => admission.transfer_started_at = Some(at),
            AdmissionStatus::Discharged => admission.discharged_at = Some(at),
            _ => {}
        }
        Ok(())
    }
}

impl PredictionStore for MemoryWardStore {
    fn record_readiness(
        &self,
        tenant: &TenantId,
        prediction: DischargeReadinessPrediction,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = (tenant.clone(), prediction.admission_id.clone());
        state.readiness_log.push((tenant.clone(), prediction));
        let index = state.readiness_log.len() - 1;
        state.readiness_latest.insert(key, index);
        Ok(())
    }

    fn latest_readiness(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
    ) -> Result<Option<DischargeReadinessPrediction>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .readiness_latest
            .get(&(tenant.clone(), admission.clone()))
            .and_then(|index| state.readiness_log.get(*index))
            .map(|(_, p)| p.clone()))
    }

    fn latest_readiness_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<DischargeReadinessPrediction>, StoreError> {
        let state = self.lock()?;
        let mut latest: Vec<DischargeReadinessPrediction> = state
            .readiness_latest
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .filter_map(|(_, index)| state.readiness_log.get(*index))
            .map(|(_, p)| p.clone())
            .collect();
        latest.sort_by(|a, b| a.admission_id.cmp(&b.admission_id));
        Ok(latest)
    }

    fn readiness_history(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
    ) -> Result<Vec<DischargeReadinessPrediction>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .readiness_log
            .iter()
            .filter(|(t, p)| t == tenant && &p.admission_id == admission)
            .map(|(_, p)| p.clone())
            .collect())
    }

    fn record_transfer_priority(
        &self,
        tenant: &TenantId,
        priority: TransferPriority,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = (tenant.clone(), priority.admission_id.clone());
        state.transfer_log.push((tenant.clone(), priority));
        let index = state.transfer_log.len() - 1;
        state.transfer_latest.insert(key, index);
        Ok(())
    }

    fn latest_transfer_priorities(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<TransferPriority>, StoreError> {
        let state = self.lock()?;
        let mut latest: Vec<TransferPriority> = state
            .transfer_latest
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .filter_map(|(_, index)| state.transfer_log.get(*index))
            .map(|(_, p)| p.clone())
            .collect();
        latest.sort_by(|a, b| a.admission_id.cmp(&b.admission_id));
        Ok(latest)
    }
}

impl FlagStore for MemoryWardStore {
    fn flag(&self, tenant: &TenantId, feature: &str) -> Result<Option<FeatureFlag>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .flags
            .get(&(tenant.clone(), feature.to_string()))
            .cloned())
    }

    fn apply(&self, write: FlagWrite) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = (write.flag.tenant.clone(), write.flag.feature.clone());
        state.flags.insert(key, write.flag);
        state.flag_audit.push(write.audit);
        Ok(())
    }

    fn audit_log(
        &self,
        tenant: &TenantId,
        feature: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FlagAuditEntry>, StoreError> {
        let state = self.lock()?;
        let mut entries: Vec<FlagAuditEntry> = state
            .flag_audit
            .iter()
            .filter(|entry| {
                &entry.tenant == tenant
                    && feature.map(|f| entry.feature == f).unwrap_or(true)
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

impl StaffingStore for MemoryWardStore {
    fn on_duty(&self, tenant: &TenantId, unit: &str) -> Result<Vec<StaffMember>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .staff
            .iter()
            .filter(|(t, member)| t == tenant && member.unit == unit && member.on_duty)
            .map(|(_, member)| member.clone())
            .collect())
    }

    fn census_history(
        &self,
        tenant: &TenantId,
        unit: Option<&str>,
        since: NaiveDate,
    ) -> Result<Vec<DailyCensus>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .census
            .iter()
            .filter(|(t, census)| {
                t == tenant
                    && census.date >= since
                    && unit.map(|u| census.unit == u).unwrap_or(true)
            })
            .map(|(_, census)| census.clone())
            .collect())
    }
}

impl NotificationOutbox for MemoryWardStore {
    fn push(&self, tenant: &TenantId, notification: Notification) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.notifications.push((tenant.clone(), notification));
        Ok(())
    }

    fn recent_for(
        &self,
        tenant: &TenantId,
        admission: &AdmissionId,
        unit: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .filter(|(t, n)| {
                t == tenant
                    && &n.admission_id == admission
                    && n.unit == unit
                    && n.created_at >= since
            })
            .map(|(_, n)| n.clone())
            .collect())
    }
}

impl AuditTrail for MemoryWardStore {
    fn entries_for(&self, tenant: &TenantId, subject: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .audit
            .iter()
            .filter(|(t, entry)| t == tenant && entry.subject == subject)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}
