use crate::host::{
    EquipmentHandle, HostModel, NewEquipment, RoomInfo, ScheduleFileRequest, ScheduleHandle,
};
use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// A building model held in memory and persisted as JSON, exposing the spaces, space
/// types, electric equipment and schedule files of an energy model.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InMemoryModel {
    #[serde(default)]
    pub space_types: IndexMap<String, SpaceType>,
    #[serde(default)]
    pub spaces: IndexMap<String, Space>,
    #[serde(default)]
    pub electric_equipment_definitions: IndexMap<String, ElectricEquipmentDefinition>,
    #[serde(default)]
    pub electric_equipment: IndexMap<String, ElectricEquipment>,
    #[serde(default)]
    pub schedule_files: IndexMap<String, ScheduleFile>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceType {
    pub standards_space_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Space {
    pub space_type: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignLevel {
    Watts(f64),
    WattsPerSpaceFloorArea(f64),
    WattsPerPerson(f64),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElectricEquipmentDefinition {
    pub design_level: DesignLevel,
}

/// What an equipment instance is attached to. Equipment on a space type serves every
/// space of that type.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentParent {
    Space(String),
    SpaceType(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElectricEquipment {
    pub definition: String,
    pub parent: EquipmentParent,
    #[serde(default)]
    pub schedule: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleFile {
    pub file_path: PathBuf,
    pub column_number: usize,
    pub rows_to_skip_at_top: usize,
    pub minutes_per_item: u32,
}

impl InMemoryModel {
    pub fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Could not open model file {}: {e}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn to_writer(&self, writer: impl Write) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn serves(&self, equipment: &ElectricEquipment, room: &str) -> bool {
        match &equipment.parent {
            EquipmentParent::Space(space) => space == room,
            EquipmentParent::SpaceType(space_type) => self
                .spaces
                .get(room)
                .and_then(|space| space.space_type.as_ref())
                .is_some_and(|room_space_type| room_space_type == space_type),
        }
    }
}

impl HostModel for InMemoryModel {
    fn rooms(&self) -> Vec<RoomInfo> {
        self.spaces
            .iter()
            .map(|(name, space)| RoomInfo {
                name: name.clone(),
                standards_space_type: space
                    .space_type
                    .as_ref()
                    .and_then(|space_type| self.space_types.get(space_type))
                    .and_then(|space_type| space_type.standards_space_type.clone()),
            })
            .collect()
    }

    fn electric_equipment(&self, room: &str) -> Vec<EquipmentHandle> {
        self.electric_equipment
            .iter()
            .filter(|(_, equipment)| self.serves(equipment, room))
            .map(|(name, equipment)| EquipmentHandle {
                name: name.clone(),
                definition: equipment.definition.clone(),
            })
            .collect()
    }

    fn remove_electric_equipment(&mut self, equipment: &EquipmentHandle) -> anyhow::Result<()> {
        self.electric_equipment
            .shift_remove(&equipment.name)
            .ok_or_else(|| anyhow!("Electric equipment '{}' is not in the model", equipment.name))?;
        Ok(())
    }

    fn remove_electric_equipment_definition(&mut self, definition: &str) -> anyhow::Result<bool> {
        if !self.electric_equipment_definitions.contains_key(definition) {
            bail!("Electric equipment definition '{definition}' is not in the model");
        }
        if self
            .electric_equipment
            .values()
            .any(|equipment| equipment.definition == definition)
        {
            return Ok(false);
        }
        self.electric_equipment_definitions.shift_remove(definition);
        Ok(true)
    }

    fn attach_schedule_file(
        &mut self,
        request: &ScheduleFileRequest,
    ) -> anyhow::Result<ScheduleHandle> {
        if !request.path.is_file() {
            bail!("File '{}' does not exist", request.path.display());
        }
        self.schedule_files.insert(
            request.name.clone(),
            ScheduleFile {
                file_path: request.path.clone(),
                column_number: request.column,
                rows_to_skip_at_top: request.rows_to_skip,
                minutes_per_item: request.minutes_per_item,
            },
        );
        Ok(ScheduleHandle {
            name: request.name.clone(),
        })
    }

    fn attach_electric_equipment(
        &mut self,
        room: &str,
        equipment: &NewEquipment,
        schedule: &ScheduleHandle,
    ) -> anyhow::Result<()> {
        if !self.spaces.contains_key(room) {
            bail!("Space '{room}' is not in the model");
        }
        if !self.schedule_files.contains_key(&schedule.name) {
            bail!("Schedule '{}' is not in the model", schedule.name);
        }
        self.electric_equipment_definitions.insert(
            equipment.definition_name.clone(),
            ElectricEquipmentDefinition {
                design_level: DesignLevel::WattsPerPerson(equipment.watts_per_person),
            },
        );
        self.electric_equipment.insert(
            equipment.name.clone(),
            ElectricEquipment {
                definition: equipment.definition_name.clone(),
                parent: EquipmentParent::Space(room.to_string()),
                schedule: Some(schedule.name.clone()),
            },
        );
        Ok(())
    }
}
