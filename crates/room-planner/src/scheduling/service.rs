use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::conflict::{find_conflict, ScheduleConflict};
use super::days::{single_day_names, DayCode};
use super::domain::{Assignment, Room, SectionId, TimeRange, TimeslotError};
use super::repository::{AssignmentScope, AssignmentStore, ScheduleUpdate, StoreError};

/// How the executor treats day codes outside the known table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownDayPolicy {
    /// Fail the move with `InvalidRequest` before touching the store.
    #[default]
    Reject,
    /// Accept the code; it only conflicts with identical codes.
    Allow,
}

impl UnknownDayPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" | "strict" => Some(Self::Reject),
            "allow" | "lenient" => Some(Self::Allow),
            _ => None,
        }
    }
}

/// Operator request to move a section to a new day and timeslot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    pub section_id: String,
    pub new_day_code: String,
    pub new_timeslot: String,
}

impl MoveRequest {
    pub fn new(
        section_id: impl Into<String>,
        new_day_code: impl Into<String>,
        new_timeslot: impl Into<String>,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            new_day_code: new_day_code.into(),
            new_timeslot: new_timeslot.into(),
        }
    }
}

/// Outcome of a move that reached the conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The record as persisted after the move.
    Committed(Assignment),
    /// Nothing was written; the witness occupies the requested slot.
    Rejected(ScheduleConflict),
}

/// Error raised when a move cannot be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("invalid move request: {0}")]
    InvalidRequest(String),
    #[error("course section {0} not found")]
    NotFound(SectionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TimeslotError> for MoveError {
    fn from(value: TimeslotError) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}

/// Per-room exclusion so one room's check and write never interleave with another move.
#[derive(Default)]
struct RoomLocks {
    rooms: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RoomLocks {
    async fn acquire(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
            rooms.entry(room_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Service that validates and applies timetable moves against a store.
pub struct TimetableService<S> {
    store: Arc<S>,
    room_locks: RoomLocks,
    unknown_days: UnknownDayPolicy,
}

impl<S> TimetableService<S>
where
    S: AssignmentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            room_locks: RoomLocks::default(),
            unknown_days: UnknownDayPolicy::default(),
        }
    }

    pub fn with_unknown_day_policy(mut self, policy: UnknownDayPolicy) -> Self {
        self.unknown_days = policy;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move a section to a new day and timeslot, keeping its room.
    ///
    /// The conflict check and the write share one transaction and the
    /// room's lock, so concurrent moves into the same slot cannot both commit.
    pub async fn move_assignment(&self, request: &MoveRequest) -> Result<MoveOutcome, MoveError> {
        let (section_id, day_code, timeslot) = self.validate(request)?;

        // Rooms never change on a move, so the room read here stays valid
        // once the lock is held.
        let room_id = self
            .store
            .get_assignment(&section_id)
            .await?
            .ok_or_else(|| MoveError::NotFound(section_id.clone()))?
            .room_id;
        let _room_guard = self.room_locks.acquire(&room_id).await;

        let mut tx = self.store.begin().await?;
        let mut assignment = tx
            .get_assignment(&section_id)
            .await?
            .ok_or_else(|| MoveError::NotFound(section_id.clone()))?;

        if let Some(witness) = find_conflict(
            tx.as_mut(),
            &assignment.room_id,
            day_code,
            timeslot,
            &assignment.section_id,
        )
        .await?
        {
            let conflict = ScheduleConflict::from(witness);
            info!(
                section = %section_id,
                room = %assignment.room_id,
                day = day_code,
                timeslot,
                conflicting_section = %conflict.conflicting_section_id,
                "move rejected by schedule conflict"
            );
            return Ok(MoveOutcome::Rejected(conflict));
        }

        let range = TimeRange::parse(timeslot)?;
        let update = ScheduleUpdate {
            section_id: section_id.clone(),
            day_code: day_code.to_string(),
            timeslot: timeslot.to_string(),
            start_time: range.start,
            end_time: range.end,
        };
        tx.update_assignment(&update).await?;
        tx.commit().await?;

        update.apply(&mut assignment);
        info!(
            section = %section_id,
            room = %assignment.room_id,
            day = day_code,
            timeslot,
            "move committed"
        );
        Ok(MoveOutcome::Committed(assignment))
    }

    fn validate<'r>(
        &self,
        request: &'r MoveRequest,
    ) -> Result<(SectionId, &'r str, &'r str), MoveError> {
        let section_id = request.section_id.trim();
        let day_code = request.new_day_code.trim();
        let timeslot = request.new_timeslot.trim();

        let missing: Vec<&str> = [
            ("section_id", section_id),
            ("new_day_code", day_code),
            ("new_timeslot", timeslot),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(MoveError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if DayCode::parse(day_code).is_none() {
            match self.unknown_days {
                UnknownDayPolicy::Reject => {
                    return Err(MoveError::InvalidRequest(format!(
                        "unknown day code '{day_code}'"
                    )));
                }
                UnknownDayPolicy::Allow => {
                    warn!(day = day_code, "accepting unknown day code");
                }
            }
        }

        Ok((SectionId(section_id.to_string()), day_code, timeslot))
    }

    /// Single-day names in calendar order.
    pub fn days(&self) -> Vec<&'static str> {
        single_day_names()
    }

    pub async fn timeslots(&self) -> Result<Vec<String>, StoreError> {
        let slots = self.store.list_timeslots().await?;
        Ok(slots.into_iter().map(|slot| slot.timeslot).collect())
    }

    pub async fn assignments(&self, scope: &AssignmentScope) -> Result<Vec<Assignment>, StoreError> {
        self.store.list_assignments(scope).await
    }

    pub async fn rooms(&self, building: &str) -> Result<Vec<Room>, StoreError> {
        self.store.list_rooms(building).await
    }
}
