use crate::errors::MelsError;
use crate::output::Output;
use crate::synthesis::EquipmentScheduleTable;
use csv::{ReaderBuilder as CsvReaderBuilder, WriterBuilder};
use indexmap::IndexMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_SCHEDULE_FILE_NAME: &str = "sch_MELs.csv";

/// Writes one column per room. The room name is the first row of its column and the
/// load fractions follow in time order, which is how the host reads schedule files
/// (skip one row, pick a column).
pub fn write_schedule_csv(
    table: &EquipmentScheduleTable,
    writer: impl Write,
) -> Result<(), MelsError> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer.write_record(table.room_names())?;
    for t_idx in 0..table.row_count() {
        let row = table
            .iter()
            .map(|schedule| schedule.fractions[t_idx].to_string())
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }
    writer
        .flush()
        .map_err(|e| MelsError::Csv(csv::Error::from(e)))?;

    Ok(())
}

/// Writes the table under `file_name` and returns the path the host should read it
/// from, or `None` if the output does not persist anything.
pub fn write_schedule_file(
    table: &EquipmentScheduleTable,
    output: &impl Output,
    file_name: &str,
) -> Result<Option<PathBuf>, MelsError> {
    if output.is_noop() {
        debug!("Output discards what it is given, not writing {file_name}");
        return Ok(None);
    }
    info!("Writing new electrical equipment schedules to CSV file.");
    let writer = output
        .writer_for_location_key(file_name)
        .map_err(|source| MelsError::Output {
            location: file_name.to_string(),
            source,
        })?;
    write_schedule_csv(table, writer)?;

    Ok(output.path_for_location_key(file_name))
}

/// Reads a schedule file written by [`write_schedule_csv`] back into room columns.
pub fn read_schedule_csv(reader: impl Read) -> Result<IndexMap<String, Vec<f64>>, MelsError> {
    let mut reader = CsvReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut columns: IndexMap<String, Vec<f64>> = reader
        .headers()?
        .iter()
        .map(|room| (room.to_string(), vec![]))
        .collect();
    for result in reader.records() {
        let record = result?;
        for (series, raw) in columns.values_mut().zip(record.iter()) {
            let value = raw.parse::<f64>().map_err(|_| {
                MelsError::malformed(
                    "equipment schedule",
                    format!("value '{raw}' is not a number"),
                )
            })?;
            series.push(value);
        }
    }

    Ok(columns)
}
