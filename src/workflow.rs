//! Builds occupant variability workflows from a baseline workflow file, switching the
//! occupancy related measures on according to the requested level of detail.

use crate::errors::MelsError;
use anyhow::{anyhow, bail};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const BASELINE_WORKFLOW_FILE_NAME: &str = "baseline.osw";

const SKIP_ARGUMENT: &str = "__SKIP__";
const OCC_SCHEDULE_DIR_ARGUMENT: &str = "occ_schedule_dir";

const OCCUPANCY_SIMULATOR_MEASURE: &str = "Occupancy_Simulator";
const LIGHTING_SCHEDULE_MEASURE: &str = "create_lighting_schedule";
const MELS_SCHEDULE_MEASURE: &str = "create_mels_schedule_from_occupant_count";
const DEMAND_CONTROLLED_VENTILATION_MEASURE: &str = "add_demand_controlled_ventilation";
const HVAC_SETPOINT_MEASURE: &str = "update_hvac_setpoint_schedule";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub file_paths: Vec<PathBuf>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    /// Any further workflow keys, carried through untouched.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WorkflowStep {
    pub measure_dir_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Workflow {
    pub fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_writer(&self, writer: impl Write) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Sets an argument on every step running the named measure.
    pub fn set_measure_argument(
        &mut self,
        measure_dir_name: &str,
        argument: &str,
        value: impl Into<Value>,
    ) -> anyhow::Result<()> {
        let value = value.into();
        let mut found = false;
        for step in self
            .steps
            .iter_mut()
            .filter(|step| step.measure_dir_name == measure_dir_name)
        {
            step.arguments.insert(argument.to_string(), value.clone());
            found = true;
        }
        if !found {
            bail!(
                "Could not set '{argument}' to '{value}', measure '{measure_dir_name}' is not in the workflow"
            );
        }
        Ok(())
    }

    pub fn measure_argument(&self, measure_dir_name: &str, argument: &str) -> Option<&Value> {
        self.steps
            .iter()
            .find(|step| step.measure_dir_name == measure_dir_name)
            .and_then(|step| step.arguments.get(argument))
    }

    fn unskip(&mut self, measure_dir_name: &str) -> anyhow::Result<()> {
        self.set_measure_argument(measure_dir_name, SKIP_ARGUMENT, false)
    }
}

/// The baseline workflow, with the project's files directory added to its search paths.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowTemplate {
    workflow: Workflow,
}

impl WorkflowTemplate {
    pub fn load(baseline_dir: &Path, files_dir: &Path) -> Result<Self, MelsError> {
        let path = baseline_dir.join(BASELINE_WORKFLOW_FILE_NAME);
        let file = File::open(&path).map_err(|e| MelsError::io(&path, e))?;
        let workflow = Workflow::from_reader(BufReader::new(file)).map_err(|e| {
            MelsError::Config(anyhow!(
                "baseline workflow {} could not be read: {e}",
                path.display()
            ))
        })?;
        debug!("Loaded baseline workflow from {}", path.display());

        Ok(Self::from_workflow(workflow, files_dir))
    }

    pub fn from_workflow(mut workflow: Workflow, files_dir: &Path) -> Self {
        workflow.file_paths.push(files_dir.to_path_buf());
        Self { workflow }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }
}

/// Holds the baseline template once it has been loaded so that later appliers share it.
#[derive(Debug, Default)]
pub struct TemplateCache {
    template: Mutex<Option<Arc<WorkflowTemplate>>>,
}

impl TemplateCache {
    /// Returns the cached template, loading it on first use. Later calls ignore their
    /// arguments.
    pub fn get_or_load(
        &self,
        baseline_dir: &Path,
        files_dir: &Path,
    ) -> Result<Arc<WorkflowTemplate>, MelsError> {
        let mut template = self.template.lock();
        if let Some(template) = template.as_ref() {
            return Ok(template.clone());
        }
        let loaded = Arc::new(WorkflowTemplate::load(baseline_dir, files_dir)?);
        *template = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.template.lock().is_some()
    }
}

lazy_static! {
    static ref SHARED_TEMPLATE_CACHE: TemplateCache = TemplateCache::default();
}

pub fn shared_template_cache() -> &'static TemplateCache {
    &SHARED_TEMPLATE_CACHE
}

#[derive(Clone, Debug)]
pub struct OccupancyVariabilityApplier {
    template: Arc<WorkflowTemplate>,
}

impl OccupancyVariabilityApplier {
    pub fn new(template: Arc<WorkflowTemplate>) -> Self {
        Self { template }
    }

    /// Applier using the process-wide template, loaded from `baseline_dir` on first use.
    pub fn shared(baseline_dir: &Path, files_dir: &Path) -> Result<Self, MelsError> {
        Ok(Self::new(
            shared_template_cache().get_or_load(baseline_dir, files_dir)?,
        ))
    }

    /// A copy of the baseline workflow for the given seed model and weather file, with
    /// the occupancy measures enabled for level of detail 1, 2 or 3.
    ///
    /// At level 2 a given schedule directory is passed to the lighting or MELs measure
    /// instead of enabling it.
    pub fn create_workflow(
        &self,
        seed_file: &str,
        weather_file: &str,
        lod: u8,
        lighting_occ_schedule_dir: Option<&str>,
        mels_occ_schedule_dir: Option<&str>,
    ) -> anyhow::Result<Workflow> {
        info!("Applying occupant variability measures to the workflow at LOD {lod}");
        let mut workflow = self.template.workflow().clone();
        workflow.seed_file = Some(seed_file.to_string());
        workflow.weather_file = Some(weather_file.to_string());
        workflow.name = Some(format!("Occupancy Variability LOD{lod}"));
        workflow.description = Some(format!("Occupancy variability at level of detail {lod}"));

        match lod {
            1 => {}
            2 => {
                workflow.unskip(OCCUPANCY_SIMULATOR_MEASURE)?;
                for (measure, occ_schedule_dir) in [
                    (LIGHTING_SCHEDULE_MEASURE, lighting_occ_schedule_dir),
                    (MELS_SCHEDULE_MEASURE, mels_occ_schedule_dir),
                ] {
                    match occ_schedule_dir {
                        Some(dir) => {
                            workflow.set_measure_argument(measure, OCC_SCHEDULE_DIR_ARGUMENT, dir)?
                        }
                        None => workflow.unskip(measure)?,
                    }
                }
            }
            3 => {
                for measure in [
                    OCCUPANCY_SIMULATOR_MEASURE,
                    LIGHTING_SCHEDULE_MEASURE,
                    MELS_SCHEDULE_MEASURE,
                    DEMAND_CONTROLLED_VENTILATION_MEASURE,
                    HVAC_SETPOINT_MEASURE,
                ] {
                    workflow.unskip(measure)?;
                }
            }
            _ => bail!("Level of detail {lod} is not supported, expected 1, 2 or 3"),
        }

        Ok(workflow)
    }
}
