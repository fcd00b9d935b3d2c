use std::collections::BTreeSet;

use async_trait::async_trait;

use super::domain::{Assignment, Room, SectionId, TimeslotDefinition};

/// Candidate slot a conflict query searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub room_id: String,
    pub day_codes: BTreeSet<String>,
    pub timeslot: String,
    pub exclude_section_id: SectionId,
}

impl SlotQuery {
    pub fn matches(&self, assignment: &Assignment) -> bool {
        assignment.room_id == self.room_id
            && self.day_codes.contains(&assignment.day_code)
            && assignment.timeslot == self.timeslot
            && assignment.section_id != self.exclude_section_id
    }
}

/// The four scheduling fields a move rewrites together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub section_id: SectionId,
    pub day_code: String,
    pub timeslot: String,
    pub start_time: String,
    pub end_time: String,
}

impl ScheduleUpdate {
    pub fn apply(&self, assignment: &mut Assignment) {
        assignment.day_code = self.day_code.clone();
        assignment.timeslot = self.timeslot.clone();
        assignment.start_time = self.start_time.clone();
        assignment.end_time = self.end_time.clone();
    }
}

/// Which assignments a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentScope {
    All,
    Building(String),
    Room { building: String, room_id: String },
}

/// Storage abstraction for rooms, timeslots and final assignments.
///
/// Reads outside a transaction may observe state that a concurrent move is
/// about to change; anything that decides a write goes through [`begin`].
///
/// [`begin`]: AssignmentStore::begin
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AssignmentTransaction>, StoreError>;
    async fn get_assignment(
        &self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError>;
    /// Ordered by start time, then end time.
    async fn list_assignments(
        &self,
        scope: &AssignmentScope,
    ) -> Result<Vec<Assignment>, StoreError>;
    async fn list_rooms(&self, building: &str) -> Result<Vec<Room>, StoreError>;
    /// Ordered by key.
    async fn list_timeslots(&self) -> Result<Vec<TimeslotDefinition>, StoreError>;
    async fn insert_room(&self, room: Room) -> Result<(), StoreError>;
    async fn insert_timeslot(&self, timeslot: TimeslotDefinition) -> Result<(), StoreError>;
    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError>;
}

/// Unit of work over assignments. Dropping it without [`commit`] discards
/// every staged update.
///
/// [`commit`]: AssignmentTransaction::commit
#[async_trait]
pub trait AssignmentTransaction: Send {
    async fn get_assignment(
        &mut self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError>;
    async fn find_assignments(&mut self, query: &SlotQuery)
        -> Result<Vec<Assignment>, StoreError>;
    async fn update_assignment(&mut self, update: &ScheduleUpdate) -> Result<(), StoreError>;
    async fn commit(&mut self) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("transaction already finished")]
    Finished,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
}
