use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::domain::{Assignment, Room, SectionId, TimeslotDefinition};
use super::repository::{
    AssignmentScope, AssignmentStore, AssignmentTransaction, ScheduleUpdate, SlotQuery,
    StoreError,
};

#[derive(Debug, Default)]
struct MemoryState {
    assignments: BTreeMap<SectionId, Assignment>,
    rooms: BTreeMap<String, Room>,
    timeslots: BTreeMap<u32, TimeslotDefinition>,
}

/// Process-local store. A transaction holds the whole store until it ends,
/// so moves against it are fully serialized.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssignmentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store; later entries replace earlier ones with the same key.
    pub fn with_records(
        rooms: impl IntoIterator<Item = Room>,
        assignments: impl IntoIterator<Item = Assignment>,
    ) -> Self {
        let mut state = MemoryState::default();
        for room in rooms {
            state.rooms.insert(room.room_id.clone(), room);
        }
        for assignment in assignments {
            state
                .assignments
                .insert(assignment.section_id.clone(), assignment);
        }

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Snapshot of every assignment in section order.
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.state
            .lock()
            .await
            .assignments
            .values()
            .cloned()
            .collect()
    }
}

fn sort_by_time(assignments: &mut [Assignment]) {
    assignments.sort_by(|a, b| {
        (a.start_time.as_str(), a.end_time.as_str())
            .cmp(&(b.start_time.as_str(), b.end_time.as_str()))
    });
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            state: Some(guard),
            staged: BTreeMap::new(),
        }))
    }

    async fn get_assignment(
        &self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        Ok(self.state.lock().await.assignments.get(section_id).cloned())
    }

    async fn list_assignments(
        &self,
        scope: &AssignmentScope,
    ) -> Result<Vec<Assignment>, StoreError> {
        let state = self.state.lock().await;
        let in_building = |room_id: &str, building: &str| {
            state
                .rooms
                .get(room_id)
                .is_some_and(|room| room.building == building)
        };

        let mut assignments: Vec<Assignment> = state
            .assignments
            .values()
            .filter(|assignment| match scope {
                AssignmentScope::All => true,
                AssignmentScope::Building(building) => in_building(&assignment.room_id, building),
                AssignmentScope::Room { building, room_id } => {
                    assignment.room_id == *room_id && in_building(room_id, building)
                }
            })
            .cloned()
            .collect();
        sort_by_time(&mut assignments);
        Ok(assignments)
    }

    async fn list_rooms(&self, building: &str) -> Result<Vec<Room>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rooms
            .values()
            .filter(|room| room.building == building)
            .cloned()
            .collect())
    }

    async fn list_timeslots(&self) -> Result<Vec<TimeslotDefinition>, StoreError> {
        Ok(self.state.lock().await.timeslots.values().cloned().collect())
    }

    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.rooms.contains_key(&room.room_id) {
            return Err(StoreError::Duplicate(format!("room {}", room.room_id)));
        }
        state.rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn insert_timeslot(&self, timeslot: TimeslotDefinition) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.timeslots.contains_key(&timeslot.key) {
            return Err(StoreError::Duplicate(format!("timeslot {}", timeslot.key)));
        }
        state.timeslots.insert(timeslot.key, timeslot);
        Ok(())
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.assignments.contains_key(&assignment.section_id) {
            return Err(StoreError::Duplicate(format!(
                "section {}",
                assignment.section_id
            )));
        }
        state
            .assignments
            .insert(assignment.section_id.clone(), assignment);
        Ok(())
    }
}

struct MemoryTransaction {
    state: Option<OwnedMutexGuard<MemoryState>>,
    staged: BTreeMap<SectionId, ScheduleUpdate>,
}

impl MemoryTransaction {
    fn state(&self) -> Result<&MemoryState, StoreError> {
        self.state.as_deref().ok_or(StoreError::Finished)
    }

    /// Committed row with any update staged in this transaction applied.
    fn view(&self, assignment: &Assignment) -> Assignment {
        let mut view = assignment.clone();
        if let Some(update) = self.staged.get(&assignment.section_id) {
            update.apply(&mut view);
        }
        view
    }
}

#[async_trait]
impl AssignmentTransaction for MemoryTransaction {
    async fn get_assignment(
        &mut self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        let state = self.state()?;
        Ok(state
            .assignments
            .get(section_id)
            .map(|assignment| self.view(assignment)))
    }

    async fn find_assignments(
        &mut self,
        query: &SlotQuery,
    ) -> Result<Vec<Assignment>, StoreError> {
        let state = self.state()?;
        Ok(state
            .assignments
            .values()
            .map(|assignment| self.view(assignment))
            .filter(|assignment| query.matches(assignment))
            .collect())
    }

    async fn update_assignment(&mut self, update: &ScheduleUpdate) -> Result<(), StoreError> {
        if !self.state()?.assignments.contains_key(&update.section_id) {
            return Err(StoreError::NotFound(format!("section {}", update.section_id)));
        }
        self.staged
            .insert(update.section_id.clone(), update.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let mut state = self.state.take().ok_or(StoreError::Finished)?;
        for (section_id, update) in std::mem::take(&mut self.staged) {
            if let Some(assignment) = state.assignments.get_mut(&section_id) {
                update.apply(assignment);
            }
        }
        Ok(())
    }
}
