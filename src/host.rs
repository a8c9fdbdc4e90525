//! The slice of a building energy model that MELs schedules need: its rooms, the
//! electric equipment serving them, and the ability to attach file-backed schedules.

use std::path::PathBuf;

/// A room in the host model together with the standards tag of its space type.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomInfo {
    pub name: String,
    pub standards_space_type: Option<String>,
}

/// An electric equipment instance currently serving a room, and the definition it uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquipmentHandle {
    pub name: String,
    pub definition: String,
}

/// A schedule backed by one column of a CSV file.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleFileRequest {
    pub name: String,
    pub path: PathBuf,
    /// 1-based column in the file.
    pub column: usize,
    pub rows_to_skip: usize,
    pub minutes_per_item: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub name: String,
}

/// Electric equipment to create for a room, along with its own definition.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEquipment {
    pub name: String,
    pub definition_name: String,
    pub watts_per_person: f64,
}

pub trait HostModel {
    fn rooms(&self) -> Vec<RoomInfo>;

    /// Electric equipment instances serving the room, whether attached to the room itself
    /// or to its space type.
    fn electric_equipment(&self, room: &str) -> Vec<EquipmentHandle>;

    fn remove_electric_equipment(&mut self, equipment: &EquipmentHandle) -> anyhow::Result<()>;

    /// Removes a definition once nothing references it. Returns `false` if it was kept
    /// because other equipment still uses it.
    fn remove_electric_equipment_definition(&mut self, definition: &str) -> anyhow::Result<bool>;

    /// Fails if the file named by the request does not exist.
    fn attach_schedule_file(
        &mut self,
        request: &ScheduleFileRequest,
    ) -> anyhow::Result<ScheduleHandle>;

    fn attach_electric_equipment(
        &mut self,
        room: &str,
        equipment: &NewEquipment,
        schedule: &ScheduleHandle,
    ) -> anyhow::Result<()>;
}
