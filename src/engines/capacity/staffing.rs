use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Day,
    Evening,
    Night,
}

impl Shift {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    /// Census multiplier applied to the nearest forecast point.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Evening => 0.9,
            Self::Night => 0.8,
        }
    }

    /// Local start hour of the shift.
    pub const fn start_hour(self) -> u32 {
        match self {
            Self::Day => 7,
            Self::Evening => 15,
            Self::Night => 23,
        }
    }

    pub const fn ordered() -> [Self; 3] {
        [Self::Day, Self::Evening, Self::Night]
    }
}

/// Patients per staff member by role. ICU carries the tightest ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaffRatios {
    pub patients_per_nurse: f64,
    pub patients_per_doctor: f64,
    pub patients_per_support: f64,
}

const ICU_RATIOS: StaffRatios = StaffRatios {
    patients_per_nurse: 2.0,
    patients_per_doctor: 6.0,
    patients_per_support: 8.0,
};

const ED_RATIOS: StaffRatios = StaffRatios {
    patients_per_nurse: 3.0,
    patients_per_doctor: 8.0,
    patients_per_support: 10.0,
};

const WARD_RATIOS: StaffRatios = StaffRatios {
    patients_per_nurse: 4.0,
    patients_per_doctor: 12.0,
    patients_per_support: 10.0,
};

pub(crate) fn ratios_for_unit(unit: &str) -> StaffRatios {
    let unit = unit.to_ascii_lowercase();
    if unit.contains("icu") || unit.contains("intensive") {
        ICU_RATIOS
    } else if unit.contains("ed") || unit.contains("emergency") {
        ED_RATIOS
    } else {
        WARD_RATIOS
    }
}

/// Surge equipment and supply checklists by unit class.
pub(crate) fn surge_equipment_for_unit(unit: &str) -> (Vec<String>, Vec<String>) {
    let unit_lower = unit.to_ascii_lowercase();
    let (equipment, supplies): (&[&str], &[&str]) =
        if unit_lower.contains("icu") || unit_lower.contains("intensive") {
            (
                &["ventilators", "infusion pumps", "cardiac monitors"],
                &["central line kits", "sedation stock", "ppe reserve"],
            )
        } else if unit_lower.contains("ed") || unit_lower.contains("emergency") {
            (
                &["portable monitors", "stretchers", "triage stations"],
                &["iv start kits", "splinting supplies", "ppe reserve"],
            )
        } else {
            (
                &["portable monitors", "oxygen concentrators"],
                &["linen packs", "med-surg consumables", "ppe reserve"],
            )
        };
    (
        equipment.iter().map(|item| item.to_string()).collect(),
        supplies.iter().map(|item| item.to_string()).collect(),
    )
}
