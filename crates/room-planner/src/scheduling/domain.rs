use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a course section; one assignment exists per section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub String);

impl SectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One scheduled meeting of a course section in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub section_id: SectionId,
    pub room_id: String,
    pub day_code: String,
    pub timeslot: String,
    pub start_time: String,
    pub end_time: String,
    pub department: String,
    pub program_section: String,
}

/// Physical room that assignments reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub building: String,
    pub capacity: Option<u32>,
    pub room_type: Option<String>,
}

/// Catalog entry for a bookable timeslot, ordered by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeslotDefinition {
    pub key: u32,
    pub timeslot: String,
}

/// Start and end display times split out of a timeslot label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub const SEPARATOR: &'static str = " - ";

    /// Splits `"<start> - <end>"`; anything other than two non-empty parts is rejected.
    pub fn parse(timeslot: &str) -> Result<Self, TimeslotError> {
        let parts: Vec<&str> = timeslot.split(Self::SEPARATOR).map(str::trim).collect();
        match parts.as_slice() {
            [start, end] if !start.is_empty() && !end.is_empty() => Ok(Self {
                start: (*start).to_string(),
                end: (*end).to_string(),
            }),
            _ => Err(TimeslotError {
                timeslot: timeslot.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timeslot '{timeslot}' is not formatted as '<start> - <end>'")]
pub struct TimeslotError {
    pub timeslot: String,
}
