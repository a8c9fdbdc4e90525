use crate::errors::MelsError;
use crate::load_model::{resolve, LoadModel, RoomUseCategory};
use crate::occupancy::OccupancyTable;
use indexmap::IndexMap;
use tracing::{debug, info};

/// Normalized equipment load fractions for one room, in time order.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomSchedule {
    pub room: String,
    pub load_model: LoadModel,
    pub fractions: Vec<f64>,
}

/// Pointwise map of an occupancy series onto a load model's normalized load.
pub fn synthesize(room: &str, load_model: LoadModel, occupancy: &[f64]) -> RoomSchedule {
    RoomSchedule {
        room: room.to_string(),
        load_model,
        fractions: occupancy
            .iter()
            .map(|&fraction| load_model.normalized_load(fraction))
            .collect(),
    }
}

/// Per-room equipment schedules sharing one row count. Columns keep insertion order,
/// which becomes the column order of the written file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EquipmentScheduleTable {
    row_count: Option<usize>,
    schedules: IndexMap<String, RoomSchedule>,
}

impl EquipmentScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, schedule: RoomSchedule) -> Result<(), MelsError> {
        let found = schedule.fractions.len();
        match self.row_count {
            Some(expected) if expected != found => {
                return Err(MelsError::InconsistentSeriesLength {
                    room: schedule.room,
                    expected,
                    found,
                })
            }
            Some(_) => {}
            None => self.row_count = Some(found),
        }
        self.schedules.insert(schedule.room.clone(), schedule);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn room_names(&self) -> impl Iterator<Item = &str> {
        self.schedules.keys().map(String::as_str)
    }

    pub fn get(&self, room: &str) -> Option<&RoomSchedule> {
        self.schedules.get(room)
    }

    /// 1-based column of a room in the written schedule file.
    pub fn column_of(&self, room: &str) -> Option<usize> {
        self.schedules.get_index_of(room).map(|index| index + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomSchedule> {
        self.schedules.values()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The room's category does not correlate plug loads with occupancy.
    UnsupportedCategory(RoomUseCategory),
    /// The room appears in the occupancy file but not in the model.
    Unassigned,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcludedRoom {
    pub room: String,
    pub reason: ExclusionReason,
}

/// Synthesizes a schedule for every office and conference room in the occupancy table,
/// in the table's column order. Other rooms are reported as excluded.
pub fn synthesize_schedules(
    occupancy: &OccupancyTable,
    assignments: &IndexMap<String, RoomUseCategory>,
) -> Result<(EquipmentScheduleTable, Vec<ExcludedRoom>), MelsError> {
    let mut table = EquipmentScheduleTable::new();
    let mut excluded = vec![];

    for (room, series) in occupancy.iter() {
        let Some(&category) = assignments.get(room) else {
            debug!("Room '{room}' has no category assigned, skipping");
            excluded.push(ExcludedRoom {
                room: room.to_string(),
                reason: ExclusionReason::Unassigned,
            });
            continue;
        };
        match resolve(category) {
            Some(load_model) => table.push(synthesize(room, load_model, series))?,
            None => {
                debug!("Room '{room}' is {category}, skipping");
                excluded.push(ExcludedRoom {
                    room: room.to_string(),
                    reason: ExclusionReason::UnsupportedCategory(category),
                });
            }
        }
    }
    info!(
        "Created equipment schedules for {} rooms, {} excluded",
        table.len(),
        excluded.len()
    );

    Ok((table, excluded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_model::{CONFERENCE_LOAD_MODEL, OFFICE_LOAD_MODEL};
    use crate::occupancy::parse_occupancy_schedule;
    use crate::occupancy::tests::occupancy_csv;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::path::Path;

    #[fixture]
    fn occupancy() -> OccupancyTable {
        let content = occupancy_csv(
            "Room ID,Outdoor,Room A,Room B,Room C,Room D",
            &["00:00,0.0,0.5,1.0,0.3,0.2", "00:10,0.0,0.0,0.25,0.3,0.2"],
        );
        parse_occupancy_schedule(&content, Path::new("occ.csv")).unwrap()
    }

    #[rstest]
    fn should_map_occupancy_pointwise() {
        let schedule = synthesize("Room A", OFFICE_LOAD_MODEL, &[0.0, 0.5, 1.0]);

        assert_eq!(schedule.fractions.len(), 3);
        assert_abs_diff_eq!(schedule.fractions[0], 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(schedule.fractions[1], 0.65, epsilon = 1e-9);
        assert_eq!(schedule.fractions[2], 1.0);
    }

    #[rstest]
    fn should_keep_row_count_for_any_length(#[values(1, 2, 144, 1008)] rows: usize) {
        let occupancy = (0..rows).map(|i| (i % 7) as f64 / 6.0).collect::<Vec<_>>();
        let schedule = synthesize("Room A", CONFERENCE_LOAD_MODEL, &occupancy);
        assert_eq!(schedule.fractions.len(), rows);
    }

    #[rstest]
    fn should_reject_series_of_different_length() {
        let mut table = EquipmentScheduleTable::new();
        table
            .push(synthesize("Room A", OFFICE_LOAD_MODEL, &[0.0, 1.0]))
            .unwrap();

        let result = table.push(synthesize("Room B", OFFICE_LOAD_MODEL, &[0.0]));

        match result {
            Err(MelsError::InconsistentSeriesLength {
                room,
                expected,
                found,
            }) => {
                assert_eq!(room, "Room B");
                assert_eq!((expected, found), (2, 1));
            }
            other => panic!("expected inconsistent length, got {other:?}"),
        }
        assert_eq!(table.len(), 1);
    }

    #[rstest]
    fn should_synthesize_office_and_conference_and_exclude_the_rest(occupancy: OccupancyTable) {
        let assignments = IndexMap::from([
            ("Room A".to_string(), RoomUseCategory::Office),
            ("Room B".to_string(), RoomUseCategory::Conference),
            ("Room C".to_string(), RoomUseCategory::Auxiliary),
        ]);

        let (table, excluded) = synthesize_schedules(&occupancy, &assignments).unwrap();

        assert_eq!(table.room_names().collect::<Vec<_>>(), vec!["Room A", "Room B"]);
        assert_eq!(table.column_of("Room A"), Some(1));
        assert_eq!(table.column_of("Room B"), Some(2));
        assert_eq!(table.column_of("Room C"), None);
        assert_eq!(table.row_count(), 2);

        let room_b = table.get("Room B").unwrap();
        assert_eq!(room_b.fractions[0], 1.0);
        assert_abs_diff_eq!(room_b.fractions[1], (20.0 + 35.0) / 160.0, epsilon = 1e-9);

        assert_eq!(
            excluded,
            vec![
                ExcludedRoom {
                    room: "Room C".to_string(),
                    reason: ExclusionReason::UnsupportedCategory(RoomUseCategory::Auxiliary),
                },
                ExcludedRoom {
                    room: "Room D".to_string(),
                    reason: ExclusionReason::Unassigned,
                },
            ]
        );
    }
}
