pub mod config;
pub mod errors;
pub mod host;
pub mod load_model;
pub mod locator;
pub mod model;
pub mod occupancy;
pub mod output;
pub mod reconcile;
pub mod schedule_writer;
pub mod synthesis;
pub mod workflow;

pub use crate::config::RunConfig;
pub use crate::errors::MelsError;
use crate::host::HostModel;
use crate::load_model::assign_categories;
use crate::locator::{FileProbe, OccupancySourceLocator};
use crate::occupancy::read_occupancy_schedule;
use crate::output::Output;
use crate::reconcile::reconcile;
use crate::schedule_writer::write_schedule_file;
pub use crate::synthesis::ExcludedRoom;
use crate::synthesis::synthesize_schedules;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// What a run read, wrote and changed in the model.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub source_path: PathBuf,
    /// Where the equipment schedule was written, if it was written anywhere.
    pub schedule_path: Option<PathBuf>,
    pub rooms_processed: usize,
    pub rooms_excluded: Vec<ExcludedRoom>,
    pub equipment_removed: usize,
    pub equipment_attached: usize,
}

impl RunSummary {
    pub fn completion_message(&self) -> String {
        let outcome = if self.equipment_attached > 0 {
            "creating and adding new electrical equipment schedules"
        } else {
            "creating electrical equipment schedules without changing the model"
        };
        format!(
            "Finished {outcome} for {} spaces, {} spaces excluded.",
            self.rooms_processed,
            self.rooms_excluded.len()
        )
    }
}

/// Creates MELs schedules for the office and conference rooms of `model` from the
/// simulated occupancy of each room, and swaps their electric equipment for equipment
/// driven by those schedules.
///
/// Nothing is written and the model is left untouched when the occupancy file cannot be
/// found or read. When `output` does not persist what it is given, the model is not
/// changed either.
#[instrument(skip_all)]
pub fn run_measure<P: FileProbe>(
    model: &mut impl HostModel,
    config: &RunConfig,
    locator: &OccupancySourceLocator<P>,
    output: impl Output,
) -> Result<RunSummary, MelsError> {
    info!("Start to create electrical equipment measure from occupant schedule");

    let source_path = locator.locate(config.occ_schedule_path.as_deref())?;
    info!("Use occupancy schedule file at: {}", source_path.display());
    let occupancy = read_occupancy_schedule(&source_path)?;
    info!("Successfully read occupant count schedule from CSV file.");

    let assignments = assign_categories(&model.rooms(), &config.room_categories);
    info!("Creating new electrical equipment schedules...");
    let (table, rooms_excluded) = synthesize_schedules(&occupancy, &assignments)?;

    let mut summary = RunSummary {
        source_path,
        schedule_path: None,
        rooms_processed: table.len(),
        rooms_excluded,
        equipment_removed: 0,
        equipment_attached: 0,
    };

    if table.is_empty() {
        warn!("No office or conference rooms with an occupant schedule, the model is unchanged");
    } else {
        summary.schedule_path = write_schedule_file(&table, &output, &config.output_file_name)?;
        match &summary.schedule_path {
            Some(schedule_path) => {
                let reconciled =
                    reconcile(model, &table, schedule_path, config.minutes_per_step)?;
                summary.equipment_removed = reconciled.equipment_removed;
                summary.equipment_attached = reconciled.equipment_attached;
            }
            None => info!("Schedules were not saved anywhere, leaving the model unchanged"),
        }
    }

    info!("{}", summary.completion_message());

    Ok(summary)
}
