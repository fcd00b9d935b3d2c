use serde::Serialize;
use tracing::warn;

use super::days::conflict_days;
use super::domain::{Assignment, SectionId};
use super::repository::{AssignmentTransaction, SlotQuery, StoreError};

/// Existing booking that blocks a requested move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleConflict {
    pub conflicting_section_id: SectionId,
    pub room_id: String,
    pub day_code: String,
    pub timeslot: String,
}

impl From<Assignment> for ScheduleConflict {
    fn from(witness: Assignment) -> Self {
        Self {
            conflicting_section_id: witness.section_id,
            room_id: witness.room_id,
            day_code: witness.day_code,
            timeslot: witness.timeslot,
        }
    }
}

/// Builds the query for every booking that would overlap `day_code`/`timeslot` in `room_id`.
pub fn slot_query(
    room_id: &str,
    day_code: &str,
    timeslot: &str,
    excluded_section_id: &SectionId,
) -> SlotQuery {
    SlotQuery {
        room_id: room_id.to_string(),
        day_codes: conflict_days(day_code),
        timeslot: timeslot.to_string(),
        exclude_section_id: excluded_section_id.clone(),
    }
}

/// Returns the first assignment occupying the candidate slot, if any.
///
/// Must run on the same transaction that performs the write.
pub async fn find_conflict(
    tx: &mut dyn AssignmentTransaction,
    room_id: &str,
    day_code: &str,
    timeslot: &str,
    excluded_section_id: &SectionId,
) -> Result<Option<Assignment>, StoreError> {
    let query = slot_query(room_id, day_code, timeslot, excluded_section_id);
    let matches = tx.find_assignments(&query).await?;

    if matches.len() > 1 {
        warn!(
            room_id,
            timeslot,
            witnesses = matches.len(),
            "room already double booked"
        );
    }

    Ok(matches.into_iter().next())
}
