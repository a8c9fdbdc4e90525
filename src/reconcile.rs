use crate::errors::MelsError;
use crate::host::{EquipmentHandle, HostModel, NewEquipment, ScheduleFileRequest};
use crate::synthesis::EquipmentScheduleTable;
use itertools::Itertools;
use std::path::Path;
use tracing::{debug, info, instrument};

/// The host reads schedule files by skipping the room-name row.
const SCHEDULE_ROWS_TO_SKIP: usize = 1;

/// A room, its column in the schedule file and the equipment serving it at the time of
/// the removal pass. Only lives for the duration of a reconciliation.
#[derive(Debug)]
struct RoomEquipmentBinding<'a> {
    room: &'a str,
    column: usize,
    equipment: Vec<EquipmentHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub equipment_removed: usize,
    pub definitions_removed: usize,
    pub equipment_attached: usize,
}

/// Replaces the electric equipment of every room with a synthesized schedule by equipment
/// driven from its column of `schedule_path`.
///
/// All removals finish before the first attachment. A failed attachment leaves earlier
/// removals in place.
#[instrument(skip(model, table))]
pub fn reconcile(
    model: &mut impl HostModel,
    table: &EquipmentScheduleTable,
    schedule_path: &Path,
    minutes_per_item: u32,
) -> Result<ReconcileSummary, MelsError> {
    let mut summary = ReconcileSummary::default();

    info!("Removing old electric equipment and definitions for office and conference rooms.");
    let mut bindings = Vec::with_capacity(table.len());
    for room in table.room_names() {
        let binding = RoomEquipmentBinding {
            room,
            column: table.column_of(room).unwrap_or_default(),
            equipment: model.electric_equipment(room),
        };
        remove_equipment(model, &binding, &mut summary)?;
        bindings.push(binding);
    }

    info!("Adding new electric equipment and definitions for office and conference rooms.");
    for binding in &bindings {
        attach_equipment(model, table, binding, schedule_path, minutes_per_item)?;
        summary.equipment_attached += 1;
    }

    Ok(summary)
}

fn remove_equipment(
    model: &mut impl HostModel,
    binding: &RoomEquipmentBinding,
    summary: &mut ReconcileSummary,
) -> Result<(), MelsError> {
    let room = binding.room;
    let removal_error = |source| MelsError::HostRemoval {
        room: room.to_string(),
        source,
    };

    // instances go first, a definition cannot be removed while equipment references it
    for equipment in &binding.equipment {
        debug!("Remove old electric equipment object {}", equipment.name);
        model
            .remove_electric_equipment(equipment)
            .map_err(removal_error)?;
        summary.equipment_removed += 1;
    }
    for definition in binding
        .equipment
        .iter()
        .map(|equipment| equipment.definition.as_str())
        .unique()
    {
        if model
            .remove_electric_equipment_definition(definition)
            .map_err(removal_error)?
        {
            debug!("Remove old electric equipment definition object: {definition}");
            summary.definitions_removed += 1;
        } else {
            debug!("Keeping electric equipment definition {definition}, still in use");
        }
    }

    Ok(())
}

fn attach_equipment(
    model: &mut impl HostModel,
    table: &EquipmentScheduleTable,
    binding: &RoomEquipmentBinding,
    schedule_path: &Path,
    minutes_per_item: u32,
) -> Result<(), MelsError> {
    let room = binding.room;
    let attachment_error = |source| MelsError::HostAttachment {
        room: room.to_string(),
        source,
    };
    let watts_per_person = table
        .get(room)
        .map(|schedule| schedule.load_model.max_load())
        .unwrap_or_default();

    let schedule = model
        .attach_schedule_file(&ScheduleFileRequest {
            name: format!("{room} equip sch"),
            path: schedule_path.to_path_buf(),
            column: binding.column,
            rows_to_skip: SCHEDULE_ROWS_TO_SKIP,
            minutes_per_item,
        })
        .map_err(attachment_error)?;
    model
        .attach_electric_equipment(
            room,
            &NewEquipment {
                name: format!("{room} electric equipment"),
                definition_name: format!("{room} electric equipment definition"),
                watts_per_person,
            },
            &schedule,
        )
        .map_err(attachment_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{RoomInfo, ScheduleHandle};
    use crate::load_model::{CONFERENCE_LOAD_MODEL, OFFICE_LOAD_MODEL};
    use crate::synthesis::synthesize;
    use anyhow::{anyhow, bail};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[derive(Clone, Debug, PartialEq)]
    enum HostCall {
        RemoveEquipment(String),
        RemoveDefinition(String),
        AttachSchedule(ScheduleFileRequest),
        AttachEquipment(String, NewEquipment, String),
    }

    /// Host double recording every mutating call in order.
    #[derive(Debug, Default)]
    struct RecordingHost {
        rooms: Vec<RoomInfo>,
        equipment: IndexMap<String, Vec<EquipmentHandle>>,
        calls: Vec<HostCall>,
        reject_schedules: bool,
    }

    impl HostModel for RecordingHost {
        fn rooms(&self) -> Vec<RoomInfo> {
            self.rooms.clone()
        }

        fn electric_equipment(&self, room: &str) -> Vec<EquipmentHandle> {
            self.equipment.get(room).cloned().unwrap_or_default()
        }

        fn remove_electric_equipment(&mut self, equipment: &EquipmentHandle) -> anyhow::Result<()> {
            let removed = self
                .equipment
                .values_mut()
                .any(|handles| match handles.iter().position(|h| h == equipment) {
                    Some(i) => {
                        handles.remove(i);
                        true
                    }
                    None => false,
                });
            if !removed {
                bail!("no electric equipment named {}", equipment.name);
            }
            self.calls
                .push(HostCall::RemoveEquipment(equipment.name.clone()));
            Ok(())
        }

        fn remove_electric_equipment_definition(&mut self, definition: &str) -> anyhow::Result<bool> {
            self.calls
                .push(HostCall::RemoveDefinition(definition.to_string()));
            Ok(!self
                .equipment
                .values()
                .flatten()
                .any(|h| h.definition == definition))
        }

        fn attach_schedule_file(
            &mut self,
            request: &ScheduleFileRequest,
        ) -> anyhow::Result<ScheduleHandle> {
            if self.reject_schedules {
                return Err(anyhow!("File '{}' does not exist", request.path.display()));
            }
            self.calls.push(HostCall::AttachSchedule(request.clone()));
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
            self.calls.push(HostCall::AttachEquipment(
                room.to_string(),
                equipment.clone(),
                schedule.name.clone(),
            ));
            Ok(())
        }
    }

    fn handle(name: &str, definition: &str) -> EquipmentHandle {
        EquipmentHandle {
            name: name.to_string(),
            definition: definition.to_string(),
        }
    }

    #[fixture]
    fn host() -> RecordingHost {
        RecordingHost {
            equipment: IndexMap::from([
                (
                    "Room A".to_string(),
                    vec![handle("A plug", "Plug def"), handle("A extra", "Extra def")],
                ),
                ("Room B".to_string(), vec![handle("B plug", "Plug def")]),
                ("Room C".to_string(), vec![handle("C plug", "Aux def")]),
            ]),
            ..Default::default()
        }
    }

    #[fixture]
    fn table() -> EquipmentScheduleTable {
        let mut table = EquipmentScheduleTable::new();
        table
            .push(synthesize("Room A", OFFICE_LOAD_MODEL, &[0.5]))
            .unwrap();
        table
            .push(synthesize("Room B", CONFERENCE_LOAD_MODEL, &[1.0]))
            .unwrap();
        table
    }

    fn is_attachment(call: &HostCall) -> bool {
        matches!(
            call,
            HostCall::AttachSchedule(_) | HostCall::AttachEquipment(..)
        )
    }

    #[rstest]
    fn should_finish_all_removals_before_any_attachment(
        mut host: RecordingHost,
        table: EquipmentScheduleTable,
    ) {
        reconcile(&mut host, &table, Path::new("/run/sch_MELs.csv"), 10).unwrap();

        let first_attachment = host.calls.iter().position(is_attachment).unwrap();
        let last_removal = host
            .calls
            .iter()
            .rposition(|call| !is_attachment(call))
            .unwrap();
        assert!(last_removal < first_attachment, "{:#?}", host.calls);
    }

    #[rstest]
    fn should_remove_instances_before_their_definitions(
        mut host: RecordingHost,
        table: EquipmentScheduleTable,
    ) {
        let summary = reconcile(&mut host, &table, Path::new("/run/sch_MELs.csv"), 10).unwrap();

        let removals = host
            .calls
            .iter()
            .filter(|call| !is_attachment(call))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(
            removals,
            vec![
                HostCall::RemoveEquipment("A plug".to_string()),
                HostCall::RemoveEquipment("A extra".to_string()),
                HostCall::RemoveDefinition("Plug def".to_string()),
                HostCall::RemoveDefinition("Extra def".to_string()),
                HostCall::RemoveEquipment("B plug".to_string()),
                HostCall::RemoveDefinition("Plug def".to_string()),
            ]
        );
        // "Plug def" is still used by Room B's equipment when Room A is processed
        assert_eq!(
            summary,
            ReconcileSummary {
                equipment_removed: 3,
                definitions_removed: 2,
                equipment_attached: 2,
            }
        );
    }

    #[rstest]
    fn should_leave_rooms_without_a_column_untouched(
        mut host: RecordingHost,
        table: EquipmentScheduleTable,
    ) {
        reconcile(&mut host, &table, Path::new("/run/sch_MELs.csv"), 10).unwrap();

        assert_eq!(host.equipment["Room C"], vec![handle("C plug", "Aux def")]);
        assert!(!host.calls.iter().any(|call| match call {
            HostCall::AttachEquipment(room, ..) => room == "Room C",
            HostCall::RemoveEquipment(name) => name == "C plug",
            _ => false,
        }));
    }

    #[rstest]
    fn should_bind_each_room_to_its_column(mut host: RecordingHost, table: EquipmentScheduleTable) {
        reconcile(&mut host, &table, Path::new("/run/sch_MELs.csv"), 15).unwrap();

        let attachments = host
            .calls
            .into_iter()
            .filter(is_attachment)
            .collect::<Vec<_>>();
        assert_eq!(
            attachments,
            vec![
                HostCall::AttachSchedule(ScheduleFileRequest {
                    name: "Room A equip sch".to_string(),
                    path: "/run/sch_MELs.csv".into(),
                    column: 1,
                    rows_to_skip: 1,
                    minutes_per_item: 15,
                }),
                HostCall::AttachEquipment(
                    "Room A".to_string(),
                    NewEquipment {
                        name: "Room A electric equipment".to_string(),
                        definition_name: "Room A electric equipment definition".to_string(),
                        watts_per_person: 200.0,
                    },
                    "Room A equip sch".to_string(),
                ),
                HostCall::AttachSchedule(ScheduleFileRequest {
                    name: "Room B equip sch".to_string(),
                    path: "/run/sch_MELs.csv".into(),
                    column: 2,
                    rows_to_skip: 1,
                    minutes_per_item: 15,
                }),
                HostCall::AttachEquipment(
                    "Room B".to_string(),
                    NewEquipment {
                        name: "Room B electric equipment".to_string(),
                        definition_name: "Room B electric equipment definition".to_string(),
                        watts_per_person: 160.0,
                    },
                    "Room B equip sch".to_string(),
                ),
            ]
        );
    }

    #[rstest]
    fn should_fail_without_rolling_back_when_host_rejects_schedule(
        mut host: RecordingHost,
        table: EquipmentScheduleTable,
    ) {
        host.reject_schedules = true;

        let result = reconcile(&mut host, &table, Path::new("/missing/sch_MELs.csv"), 10);

        match result {
            Err(MelsError::HostAttachment { room, .. }) => assert_eq!(room, "Room A"),
            other => panic!("expected attachment failure, got {other:?}"),
        }
        assert!(host.equipment["Room A"].is_empty());
        assert!(host.equipment["Room B"].is_empty());
    }
}
