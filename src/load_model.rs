use crate::host::RoomInfo;
use anyhow::anyhow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// How a room is used, as assigned by the user. Only office and conference loads are
/// treated as correlated with occupancy.
///
/// Parses from the user-facing choice names (e.g. "Open-plan office", "Conference room").
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomUseCategory {
    #[strum(
        to_string = "Office",
        serialize = "Open-plan office",
        serialize = "Closed office"
    )]
    Office,
    #[strum(
        to_string = "Conference",
        serialize = "Conference room",
        serialize = "Conference room example"
    )]
    Conference,
    #[strum(to_string = "Auxiliary")]
    Auxiliary,
    #[strum(
        to_string = "Other",
        serialize = "Lobby",
        serialize = "Corridor",
        serialize = "Plenum"
    )]
    Other,
}

impl TryFrom<String> for RoomUseCategory {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomUseCategory::from_str(value.trim())
            .map_err(|_| anyhow!("'{value}' is not a recognised room use category"))
    }
}

impl From<RoomUseCategory> for String {
    fn from(value: RoomUseCategory) -> Self {
        value.to_string()
    }
}

// Standards space type tags as found on the host model's space types.
const OFFICE_SPACE_TYPES: [&str; 12] = [
    "WholeBuilding - Sm Office",
    "WholeBuilding - Md Office",
    "WholeBuilding - Lg Office",
    "Office",
    "ClosedOffice",
    "OpenOffice",
    "SmallOffice - ClosedOffice",
    "SmallOffice - OpenOffice",
    "MediumOffice - ClosedOffice",
    "MediumOffice - OpenOffice",
    "LargeOffice - ClosedOffice",
    "LargeOffice - OpenOffice",
];

const CONFERENCE_SPACE_TYPES: [&str; 6] = [
    "Conference",
    "Classroom",
    "SmallOffice - Conference",
    "MediumOffice - Conference",
    "MediumOffice - Classroom",
    "LargeOffice - Conference",
];

const AUXILIARY_SPACE_TYPES: [&str; 5] = [
    "OfficeLarge Data Center",
    "OfficeLarge Main Data Center",
    "SmallOffice - Elec/MechRoom",
    "MediumOffice - Elec/MechRoom",
    "LargeOffice - Elec/MechRoom",
];

impl RoomUseCategory {
    /// The category a room defaults to when the user has not chosen one, based on the
    /// standards space type of its space type. Untagged and unrecognised rooms are `Other`.
    pub fn default_for_standards_space_type(standards_space_type: Option<&str>) -> Self {
        let Some(tag) = standards_space_type else {
            return Self::Other;
        };
        if OFFICE_SPACE_TYPES.contains(&tag) {
            Self::Office
        } else if CONFERENCE_SPACE_TYPES.contains(&tag) {
            Self::Conference
        } else if AUXILIARY_SPACE_TYPES.contains(&tag) {
            Self::Auxiliary
        } else {
            Self::Other
        }
    }
}

/// Linear plug load model: `load = base + dynamic * occupancy_fraction`, in W per person
/// at maximum occupancy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadModel {
    base: f64,
    dynamic: f64,
}

pub const OFFICE_LOAD_MODEL: LoadModel = LoadModel {
    base: 60.0,
    dynamic: 140.0,
};

pub const CONFERENCE_LOAD_MODEL: LoadModel = LoadModel {
    base: 20.0,
    dynamic: 140.0,
};

impl LoadModel {
    pub fn new(base: f64, dynamic: f64) -> anyhow::Result<Self> {
        let max_load = base + dynamic;
        if max_load == 0.0 || !max_load.is_finite() {
            return Err(anyhow!(
                "Load model with base {base} W and dynamic {dynamic} W cannot be normalised"
            ));
        }
        Ok(Self { base, dynamic })
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn dynamic(&self) -> f64 {
        self.dynamic
    }

    /// Load when the room is fully occupied, used as the normalisation constant.
    pub fn max_load(&self) -> f64 {
        self.base + self.dynamic
    }

    pub fn load(&self, occupancy_fraction: f64) -> f64 {
        self.base + self.dynamic * occupancy_fraction
    }

    /// Fraction of the maximum load drawn at the given occupancy fraction.
    pub fn normalized_load(&self, occupancy_fraction: f64) -> f64 {
        self.load(occupancy_fraction) / self.max_load()
    }
}

/// Calibrated load model for a category, or `None` for rooms that are not given a
/// synthesized schedule.
pub fn resolve(category: RoomUseCategory) -> Option<LoadModel> {
    match category {
        RoomUseCategory::Office => Some(OFFICE_LOAD_MODEL),
        RoomUseCategory::Conference => Some(CONFERENCE_LOAD_MODEL),
        RoomUseCategory::Auxiliary | RoomUseCategory::Other => None,
    }
}

/// Assigns exactly one category to every room: the user's choice where one was made,
/// otherwise the default for the room's standards space type.
pub fn assign_categories(
    rooms: &[RoomInfo],
    overrides: &IndexMap<String, RoomUseCategory>,
) -> IndexMap<String, RoomUseCategory> {
    rooms
        .iter()
        .map(|room| {
            let category = overrides.get(&room.name).copied().unwrap_or_else(|| {
                RoomUseCategory::default_for_standards_space_type(
                    room.standards_space_type.as_deref(),
                )
            });
            (room.name.clone(), category)
        })
        .collect()
}
