use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::scheduling::days::DayCode;
use crate::scheduling::domain::{Assignment, Room, SectionId, TimeRange, TimeslotDefinition};
use crate::scheduling::memory::InMemoryAssignmentStore;
use crate::scheduling::repository::{
    AssignmentScope, AssignmentStore, AssignmentTransaction, ScheduleUpdate, SlotQuery,
    StoreError,
};
use crate::scheduling::service::TimetableService;

pub(super) fn assignment(section: &str, room: &str, day: &str, timeslot: &str) -> Assignment {
    let range = TimeRange::parse(timeslot).expect("fixture timeslot is well formed");
    Assignment {
        section_id: SectionId::from(section),
        room_id: room.to_string(),
        day_code: day.to_string(),
        timeslot: timeslot.to_string(),
        start_time: range.start,
        end_time: range.end,
        department: "CCS".to_string(),
        program_section: "BSCS 1-A".to_string(),
    }
}

pub(super) fn room(room_id: &str, building: &str) -> Room {
    Room {
        room_id: room_id.to_string(),
        building: building.to_string(),
        capacity: Some(40),
        room_type: Some("Lecture".to_string()),
    }
}

pub(super) fn campus_rooms() -> Vec<Room> {
    vec![
        room("R101", "Main"),
        room("R102", "Main"),
        room("L201", "Annex"),
    ]
}

/// `CS101-A` sits in R101 on Monday 08:00 - 09:00.
pub(super) fn cs101() -> Assignment {
    assignment("CS101-A", "R101", "M", "08:00 - 09:00")
}

/// `MATH201-B` holds R101 on Monday-Thursday 10:00 - 11:00.
pub(super) fn math201() -> Assignment {
    assignment("MATH201-B", "R101", "MTh", "10:00 - 11:00")
}

pub(super) fn store_with(assignments: Vec<Assignment>) -> Arc<InMemoryAssignmentStore> {
    Arc::new(InMemoryAssignmentStore::with_records(
        campus_rooms(),
        assignments,
    ))
}

pub(super) fn service_with(
    assignments: Vec<Assignment>,
) -> (
    TimetableService<InMemoryAssignmentStore>,
    Arc<InMemoryAssignmentStore>,
) {
    let store = store_with(assignments);
    (TimetableService::new(store.clone()), store)
}

pub(super) async fn stored(store: &InMemoryAssignmentStore, section: &str) -> Assignment {
    store
        .get_assignment(&SectionId::from(section))
        .await
        .expect("memory store reads")
        .expect("section present")
}

/// Panics if two sections share a room, an overlapping day and a timeslot.
pub(super) fn assert_no_double_booking(assignments: &[Assignment]) {
    for (index, a) in assignments.iter().enumerate() {
        for b in &assignments[index + 1..] {
            let overlapping_days = match (DayCode::parse(&a.day_code), DayCode::parse(&b.day_code))
            {
                (Some(left), Some(right)) => left.conflicts_with(right),
                _ => a.day_code == b.day_code,
            };
            assert!(
                !(a.room_id == b.room_id && overlapping_days && a.timeslot == b.timeslot),
                "{} and {} double book {} ({} / {}) at {}",
                a.section_id,
                b.section_id,
                a.room_id,
                a.day_code,
                b.day_code,
                a.timeslot
            );
        }
    }
}

pub(super) fn timeslot_catalog() -> Vec<TimeslotDefinition> {
    ["07:30 - 08:30", "08:00 - 09:00", "09:00 - 10:00", "10:00 - 11:00"]
        .into_iter()
        .enumerate()
        .map(|(index, label)| TimeslotDefinition {
            key: index as u32 + 1,
            timeslot: label.to_string(),
        })
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every operation reports an outage.
pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

#[async_trait]
impl AssignmentStore for UnavailableStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTransaction>, StoreError> {
        Err(offline())
    }

    async fn get_assignment(
        &self,
        _section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        Err(offline())
    }

    async fn list_assignments(
        &self,
        _scope: &AssignmentScope,
    ) -> Result<Vec<Assignment>, StoreError> {
        Err(offline())
    }

    async fn list_rooms(&self, _building: &str) -> Result<Vec<Room>, StoreError> {
        Err(offline())
    }

    async fn list_timeslots(&self) -> Result<Vec<TimeslotDefinition>, StoreError> {
        Err(offline())
    }

    async fn insert_room(&self, _room: Room) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn insert_timeslot(&self, _timeslot: TimeslotDefinition) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn insert_assignment(&self, _assignment: Assignment) -> Result<(), StoreError> {
        Err(offline())
    }
}

/// Memory store whose transactions fail at the write step.
pub(super) struct ReadOnlyStore {
    pub(super) inner: InMemoryAssignmentStore,
}

struct ReadOnlyTransaction {
    inner: Box<dyn AssignmentTransaction>,
}

#[async_trait]
impl AssignmentTransaction for ReadOnlyTransaction {
    async fn get_assignment(
        &mut self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        self.inner.get_assignment(section_id).await
    }

    async fn find_assignments(
        &mut self,
        query: &SlotQuery,
    ) -> Result<Vec<Assignment>, StoreError> {
        self.inner.find_assignments(query).await
    }

    async fn update_assignment(&mut self, _update: &ScheduleUpdate) -> Result<(), StoreError> {
        Err(StoreError::Query("attempt to write a readonly database".to_string()))
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}

#[async_trait]
impl AssignmentStore for ReadOnlyStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTransaction>, StoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(ReadOnlyTransaction { inner }))
    }

    async fn get_assignment(
        &self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        self.inner.get_assignment(section_id).await
    }

    async fn list_assignments(
        &self,
        scope: &AssignmentScope,
    ) -> Result<Vec<Assignment>, StoreError> {
        self.inner.list_assignments(scope).await
    }

    async fn list_rooms(&self, building: &str) -> Result<Vec<Room>, StoreError> {
        self.inner.list_rooms(building).await
    }

    async fn list_timeslots(&self) -> Result<Vec<TimeslotDefinition>, StoreError> {
        self.inner.list_timeslots().await
    }

    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        self.inner.insert_room(room).await
    }

    async fn insert_timeslot(&self, timeslot: TimeslotDefinition) -> Result<(), StoreError> {
        self.inner.insert_timeslot(timeslot).await
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.inner.insert_assignment(assignment).await
    }
}
