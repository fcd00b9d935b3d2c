//! Timetable scheduling: day groups, conflict detection and room moves.
//!
//! [`TimetableService::move_assignment`] is the only path that changes an
//! existing assignment. Rows are created by the CSV importer and the store
//! adapters decide how they are persisted.

pub mod conflict;
pub mod days;
pub mod domain;
pub mod import;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use conflict::{find_conflict, ScheduleConflict};
pub use days::{conflict_days, single_day_names, DayCode};
pub use domain::{Assignment, Room, SectionId, TimeRange, TimeslotDefinition, TimeslotError};
pub use import::{ImportError, ImportSummary, TimetableImporter};
pub use memory::InMemoryAssignmentStore;
pub use repository::{
    AssignmentScope, AssignmentStore, AssignmentTransaction, ScheduleUpdate, SlotQuery,
    StoreError,
};
pub use router::timetable_router;
pub use service::{MoveError, MoveOutcome, MoveRequest, TimetableService, UnknownDayPolicy};
pub use sqlite::SqliteAssignmentStore;
