use crate::errors::MelsError;
use crate::load_model::RoomUseCategory;
use crate::schedule_writer::DEFAULT_SCHEDULE_FILE_NAME;
use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Default file name given to its output by the occupancy simulator.
pub const DEFAULT_OCCUPANCY_FILE_NAME: &str = "OccSimulator_out_IDF.csv";
pub const DEFAULT_MINUTES_PER_STEP: u32 = 10;

/// Settings for one MELs schedule run, usually read from a JSON file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Occupancy schedule to use instead of searching the conventional locations.
    #[serde(default)]
    pub occ_schedule_path: Option<PathBuf>,
    #[serde(default = "default_minutes_per_step")]
    pub minutes_per_step: u32,
    /// Room name to chosen room type, e.g. "Open-plan office" or "Conference room".
    #[serde(default)]
    pub room_categories: IndexMap<String, RoomUseCategory>,
    #[serde(default = "default_output_file_name")]
    pub output_file_name: String,
    #[serde(default = "default_occupancy_file_name")]
    pub occupancy_file_name: String,
}

fn default_minutes_per_step() -> u32 {
    DEFAULT_MINUTES_PER_STEP
}

fn default_output_file_name() -> String {
    DEFAULT_SCHEDULE_FILE_NAME.to_string()
}

fn default_occupancy_file_name() -> String {
    DEFAULT_OCCUPANCY_FILE_NAME.to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            occ_schedule_path: None,
            minutes_per_step: DEFAULT_MINUTES_PER_STEP,
            room_categories: IndexMap::new(),
            output_file_name: default_output_file_name(),
            occupancy_file_name: default_occupancy_file_name(),
        }
    }
}

impl RunConfig {
    pub fn from_reader(reader: impl Read) -> Result<Self, MelsError> {
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| MelsError::Config(anyhow!("could not read run configuration: {e}")))?;
        config.validate().map_err(MelsError::Config)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, MelsError> {
        let file = File::open(path).map_err(|e| MelsError::io(path, e))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.minutes_per_step == 0 {
            bail!("minutes_per_step must be at least 1");
        }
        if self.output_file_name.trim().is_empty() {
            bail!("output_file_name must not be empty");
        }
        if self.occupancy_file_name.trim().is_empty() {
            bail!("occupancy_file_name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_apply_defaults_to_empty_config() {
        let config = RunConfig::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.minutes_per_step, 10);
        assert_eq!(config.output_file_name, "sch_MELs.csv");
        assert_eq!(config.occupancy_file_name, "OccSimulator_out_IDF.csv");
    }

    #[rstest]
    fn should_read_room_choices() {
        let config = RunConfig::from_reader(
            r#"{
                "occ_schedule_path": "/data/occ.csv",
                "minutes_per_step": 15,
                "room_categories": {
                    "Room A": "Open-plan office",
                    "Room B": "Conference room",
                    "Room C": "Lobby"
                }
            }"#
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(config.occ_schedule_path, Some(PathBuf::from("/data/occ.csv")));
        assert_eq!(config.minutes_per_step, 15);
        assert_eq!(
            config.room_categories,
            IndexMap::from([
                ("Room A".to_string(), RoomUseCategory::Office),
                ("Room B".to_string(), RoomUseCategory::Conference),
                ("Room C".to_string(), RoomUseCategory::Other),
            ])
        );
    }

    #[rstest]
    #[case(r#"{"room_categories": {"Room A": "Kitchen"}}"#)]
    #[case(r#"{"minutes_per_step": 0}"#)]
    #[case(r#"{"output_file_name": " "}"#)]
    #[case(r#"{"unknown_setting": true}"#)]
    fn should_reject_invalid_config(#[case] json: &str) {
        assert!(matches!(
            RunConfig::from_reader(json.as_bytes()),
            Err(MelsError::Config(_))
        ));
    }
}
