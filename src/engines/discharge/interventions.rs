use crate::domain::{
    BarrierKind, DischargeBarrier, InterventionPriority, PlannedIntervention, StaffRole,
};

/// Static barrier-kind lookup producing the suggested intervention.
const INTERVENTIONS: &[(BarrierKind, StaffRole, InterventionPriority, &str)] = &[
    (
        BarrierKind::UnstableVitals,
        StaffRole::Doctor,
        InterventionPriority::Urgent,
        "Reassess clinical stability and adjust the treatment plan",
    ),
    (
        BarrierKind::PendingLabs,
        StaffRole::Nurse,
        InterventionPriority::Routine,
        "Expedite outstanding lab work and flag results for review",
    ),
    (
        BarrierKind::MonitoredMedications,
        StaffRole::Doctor,
        InterventionPriority::Routine,
        "Review monitored medications for discharge conversion",
    ),
    (
        BarrierKind::LimitedMobility,
        StaffRole::Support,
        InterventionPriority::Routine,
        "Schedule a physical therapy mobility evaluation",
    ),
    (
        BarrierKind::UncontrolledPain,
        StaffRole::Nurse,
        InterventionPriority::Urgent,
        "Escalate pain management review before discharge",
    ),
    (
        BarrierKind::NoDestination,
        StaffRole::Support,
        InterventionPriority::Urgent,
        "Engage case management to confirm a discharge destination",
    ),
    (
        BarrierKind::PlacementUnarranged,
        StaffRole::Support,
        InterventionPriority::Urgent,
        "Secure the skilled nursing facility placement",
    ),
    (
        BarrierKind::HomeHealthUnarranged,
        StaffRole::Support,
        InterventionPriority::Routine,
        "Arrange home-health agency services",
    ),
    (
        BarrierKind::TransportationUnarranged,
        StaffRole::Support,
        InterventionPriority::Routine,
        "Book discharge transportation",
    ),
    (
        BarrierKind::MedicationReconciliationIncomplete,
        StaffRole::Nurse,
        InterventionPriority::Routine,
        "Complete medication reconciliation with pharmacy",
    ),
    (
        BarrierKind::EducationIncomplete,
        StaffRole::Nurse,
        InterventionPriority::Routine,
        "Deliver the remaining discharge education topics",
    ),
    (
        BarrierKind::NoFollowUp,
        StaffRole::Support,
        InterventionPriority::Routine,
        "Schedule the follow-up appointment before discharge",
    ),
];

pub(crate) fn interventions_for(barriers: &[DischargeBarrier]) -> Vec<PlannedIntervention> {
    barriers
        .iter()
        .filter_map(|barrier| {
            INTERVENTIONS
                .iter()
                .find(|(kind, _, _, _)| *kind == barrier.kind)
                .map(|(kind, role, priority, description)| PlannedIntervention {
                    barrier: *kind,
                    role: *role,
                    priority: *priority,
                    description: (*description).to_string(),
                    completed: barrier.resolved,
                })
        })
        .collect()
}
