use crate::errors::MelsError;
use csv::{ReaderBuilder as CsvReaderBuilder, Trim};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Line holding the room identifiers in the occupancy simulator output.
const ROOM_HEADER_LINE: usize = 3;
/// Lines before the data block, which starts with its own header row.
const PREAMBLE_LINES: usize = 6;
/// Header columns that never name a room.
const NON_ROOM_COLUMNS: [&str; 3] = ["Room ID", "Outdoor", "Outside building"];
pub const TIME_COLUMN: &str = "Time";

/// Occupancy fractions per room, one value per time step, in time order.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyTable {
    timestamps: Vec<String>,
    rooms: IndexMap<String, Vec<f64>>,
}

impl OccupancyTable {
    pub fn timestamps(&self) -> &[String] {
        &self.timestamps
    }

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn room_names(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn series(&self, room: &str) -> Option<&[f64]> {
        self.rooms.get(room).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.rooms
            .iter()
            .map(|(room, series)| (room.as_str(), series.as_slice()))
    }
}

/// Drops non-room columns from a header row and prepends the synthetic time column.
pub fn clean_room_headers<'a>(fields: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    std::iter::once(TIME_COLUMN.to_string())
        .chain(
            fields
                .into_iter()
                .filter(|field| !field.trim().is_empty() && !NON_ROOM_COLUMNS.contains(field))
                .map(str::to_string),
        )
        .collect()
}

pub fn read_occupancy_schedule(path: &Path) -> Result<OccupancyTable, MelsError> {
    let content = fs::read_to_string(path).map_err(|e| MelsError::io(path, e))?;
    parse_occupancy_schedule(&content, path)
}

/// Parses the occupancy simulator's CSV output. `path` is only used for error reporting.
#[instrument(skip(content))]
pub fn parse_occupancy_schedule(content: &str, path: &Path) -> Result<OccupancyTable, MelsError> {
    let lines = content.lines().collect::<Vec<_>>();
    if lines.len() <= ROOM_HEADER_LINE {
        return Err(MelsError::malformed(
            path,
            format!(
                "expected at least {} preamble rows but the file has {}",
                ROOM_HEADER_LINE + 1,
                lines.len()
            ),
        ));
    }

    let header_fields = split_csv_line(lines[ROOM_HEADER_LINE])
        .map_err(|e| MelsError::malformed(path, format!("unreadable room header row: {e}")))?;
    if header_fields.is_empty() {
        return Err(MelsError::malformed(path, "room header row is empty"));
    }
    let headers = clean_room_headers(header_fields.iter().map(String::as_str));
    if headers.len() == 1 {
        return Err(MelsError::malformed(path, "room header row names no rooms"));
    }
    info!(
        "The building has {} spaces with available occupant schedule file.",
        headers.len() - 1
    );

    if lines.len() <= PREAMBLE_LINES {
        return Err(MelsError::malformed(
            path,
            "no data block follows the preamble",
        ));
    }
    let data_block = lines[PREAMBLE_LINES..].join("\n");
    let mut reader = CsvReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data_block.as_bytes());

    let data_headers = reader
        .headers()
        .map_err(|e| MelsError::malformed(path, format!("unreadable data header row: {e}")))?
        .clone();
    let mut columns = IndexMap::with_capacity(headers.len() - 1);
    for room in &headers[1..] {
        let position = data_headers
            .iter()
            .position(|name| name == room)
            .ok_or_else(|| {
                MelsError::malformed(
                    path,
                    format!("room '{room}' is listed in the header row but has no data column"),
                )
            })?;
        columns.insert(room.clone(), position);
    }

    let mut timestamps = vec![];
    let mut rooms: IndexMap<String, Vec<f64>> = columns
        .keys()
        .map(|room| (room.clone(), vec![]))
        .collect();

    for result in reader.records() {
        let record = result.map_err(|e| MelsError::malformed(path, e.to_string()))?;
        let line = PREAMBLE_LINES as u64
            + record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != data_headers.len() {
            return Err(MelsError::malformed(
                path,
                format!(
                    "row on line {line} has {} fields but the data header has {}",
                    record.len(),
                    data_headers.len()
                ),
            ));
        }
        timestamps.push(record.get(0).unwrap_or_default().to_string());
        for (room, position) in &columns {
            let raw = &record[*position];
            let value = raw.parse::<f64>().map_err(|_| {
                MelsError::malformed(
                    path,
                    format!("value '{raw}' for room '{room}' on line {line} is not a number"),
                )
            })?;
            rooms[room].push(value);
        }
    }
    if timestamps.is_empty() {
        return Err(MelsError::malformed(
            path,
            "no data rows follow the data header",
        ));
    }
    debug!("Read {} time steps of occupancy", timestamps.len());

    Ok(OccupancyTable { timestamps, rooms })
}

fn split_csv_line(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = CsvReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(vec![]),
    }
}
