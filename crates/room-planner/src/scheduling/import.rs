//! CSV seeding for rooms, timeslots and final assignments.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::info;

use super::domain::{Assignment, Room, SectionId, TimeRange, TimeslotDefinition, TimeslotError};
use super::repository::{AssignmentStore, StoreError};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Timeslot { line: usize, source: TimeslotError },
    Capacity { line: usize, value: String },
    Store(StoreError),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read import file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::Timeslot { line, source } => write!(f, "line {}: {}", line, source),
            ImportError::Capacity { line, value } => {
                write!(f, "line {}: capacity '{}' is not a whole number", line, value)
            }
            ImportError::Store(err) => write!(f, "could not store imported rows: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Timeslot { source, .. } => Some(source),
            ImportError::Capacity { .. } => None,
            ImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Row counts written by one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rooms: usize,
    pub timeslots: usize,
    pub assignments: usize,
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    room_id: String,
    building: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    capacity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    room_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeslotRow {
    key: u32,
    timeslot: String,
}

#[derive(Debug, Deserialize)]
struct AssignmentRow {
    section_id: String,
    room_id: String,
    day_code: String,
    timeslot: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    program_section: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source)
}

pub fn parse_rooms<R: Read>(source: R) -> Result<Vec<Room>, ImportError> {
    let mut rooms = Vec::new();
    for (index, row) in reader(source).deserialize::<RoomRow>().enumerate() {
        let row = row?;
        let capacity = row
            .capacity
            .map(|value| {
                value.parse::<u32>().map_err(|_| ImportError::Capacity {
                    line: index + 2,
                    value,
                })
            })
            .transpose()?;
        rooms.push(Room {
            room_id: row.room_id,
            building: row.building,
            capacity,
            room_type: row.room_type,
        });
    }
    Ok(rooms)
}

pub fn parse_timeslots<R: Read>(source: R) -> Result<Vec<TimeslotDefinition>, ImportError> {
    let mut slots = Vec::new();
    for row in reader(source).deserialize::<TimeslotRow>() {
        let row = row?;
        slots.push(TimeslotDefinition {
            key: row.key,
            timeslot: row.timeslot,
        });
    }
    Ok(slots)
}

/// Parses assignment rows, deriving start/end times from each timeslot.
pub fn parse_assignments<R: Read>(source: R) -> Result<Vec<Assignment>, ImportError> {
    let mut assignments = Vec::new();
    for (index, row) in reader(source).deserialize::<AssignmentRow>().enumerate() {
        let row = row?;
        // Header occupies line 1.
        let line = index + 2;
        let range = TimeRange::parse(&row.timeslot)
            .map_err(|source| ImportError::Timeslot { line, source })?;

        assignments.push(Assignment {
            section_id: SectionId(row.section_id),
            room_id: row.room_id,
            day_code: row.day_code,
            timeslot: row.timeslot,
            start_time: range.start,
            end_time: range.end,
            department: row.department,
            program_section: row.program_section,
        });
    }
    Ok(assignments)
}

/// Writes parsed CSV rows into a store. Only inserts; existing rows are never touched.
pub struct TimetableImporter<'a, S> {
    store: &'a S,
    summary: ImportSummary,
}

impl<'a, S> TimetableImporter<'a, S>
where
    S: AssignmentStore,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            summary: ImportSummary::default(),
        }
    }

    pub async fn rooms<R: Read>(&mut self, source: R) -> Result<&mut Self, ImportError> {
        for room in parse_rooms(source)? {
            self.store.insert_room(room).await?;
            self.summary.rooms += 1;
        }
        Ok(self)
    }

    pub async fn timeslots<R: Read>(&mut self, source: R) -> Result<&mut Self, ImportError> {
        for slot in parse_timeslots(source)? {
            self.store.insert_timeslot(slot).await?;
            self.summary.timeslots += 1;
        }
        Ok(self)
    }

    pub async fn assignments<R: Read>(&mut self, source: R) -> Result<&mut Self, ImportError> {
        for assignment in parse_assignments(source)? {
            self.store.insert_assignment(assignment).await?;
            self.summary.assignments += 1;
        }
        Ok(self)
    }

    pub async fn rooms_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, ImportError> {
        let file = std::fs::File::open(path)?;
        self.rooms(file).await
    }

    pub async fn timeslots_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<&mut Self, ImportError> {
        let file = std::fs::File::open(path)?;
        self.timeslots(file).await
    }

    pub async fn assignments_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<&mut Self, ImportError> {
        let file = std::fs::File::open(path)?;
        self.assignments(file).await
    }

    pub fn finish(self) -> ImportSummary {
        info!(
            rooms = self.summary.rooms,
            timeslots = self.summary.timeslots,
            assignments = self.summary.assignments,
            "timetable import complete"
        );
        self.summary
    }
}
