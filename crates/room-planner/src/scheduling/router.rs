use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::repository::{AssignmentScope, AssignmentStore, StoreError};
use super::service::{MoveError, MoveOutcome, MoveRequest, TimetableService};

/// Body accepted by the update endpoint; absent fields count as empty.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub course_code_section: String,
    #[serde(default, rename = "newDay")]
    pub new_day: String,
    #[serde(default, rename = "newTimeslot")]
    pub new_timeslot: String,
}

impl From<UpdateRequest> for MoveRequest {
    fn from(value: UpdateRequest) -> Self {
        MoveRequest::new(value.course_code_section, value.new_day, value.new_timeslot)
    }
}

/// Router builder exposing the timetable lookups and the move endpoint.
pub fn timetable_router<S>(service: Arc<TimetableService<S>>) -> Router
where
    S: AssignmentStore + 'static,
{
    Router::new()
        .route("/api/timetable", get(days_handler::<S>))
        .route("/api/timeslots", get(timeslots_handler::<S>))
        .route("/api/final-assignments", get(assignments_handler::<S>))
        .route(
            "/api/final-assignments/:building",
            get(building_assignments_handler::<S>),
        )
        .route(
            "/api/final-assignments/:building/:room",
            get(room_assignments_handler::<S>),
        )
        .route("/api/rooms/:building", get(rooms_handler::<S>))
        .route("/api/update", post(update_handler::<S>))
        .with_state(service)
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
    Json(payload): Json<UpdateRequest>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    let request = MoveRequest::from(payload);
    match service.move_assignment(&request).await {
        Ok(MoveOutcome::Committed(assignment)) => {
            let payload = json!({
                "success": true,
                "message": "Schedule updated successfully",
                "assignment": assignment,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(MoveOutcome::Rejected(conflict)) => {
            let payload = json!({
                "error": "Schedule conflict detected",
                "conflict": conflict,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(MoveError::InvalidRequest(reason)) => {
            let payload = json!({ "error": reason });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(MoveError::NotFound(section_id)) => {
            let payload = json!({
                "error": "Course not found",
                "course_code_section": section_id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(MoveError::Store(err)) => store_failure("update assignment", err),
    }
}

pub(crate) async fn days_handler<S>(State(service): State<Arc<TimetableService<S>>>) -> Response
where
    S: AssignmentStore + 'static,
{
    (StatusCode::OK, Json(service.days())).into_response()
}

pub(crate) async fn timeslots_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    match service.timeslots().await {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(err) => store_failure("fetch time slots", err),
    }
}

pub(crate) async fn assignments_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    list_assignments(&service, AssignmentScope::All).await
}

pub(crate) async fn building_assignments_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
    Path(building): Path<String>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    list_assignments(&service, AssignmentScope::Building(building)).await
}

pub(crate) async fn room_assignments_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
    Path((building, room_id)): Path<(String, String)>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    list_assignments(&service, AssignmentScope::Room { building, room_id }).await
}

pub(crate) async fn rooms_handler<S>(
    State(service): State<Arc<TimetableService<S>>>,
    Path(building): Path<String>,
) -> Response
where
    S: AssignmentStore + 'static,
{
    match service.rooms(&building).await {
        Ok(rooms) => (StatusCode::OK, Json(rooms)).into_response(),
        Err(err) => store_failure("fetch rooms", err),
    }
}

async fn list_assignments<S>(service: &TimetableService<S>, scope: AssignmentScope) -> Response
where
    S: AssignmentStore + 'static,
{
    match service.assignments(&scope).await {
        Ok(assignments) => (StatusCode::OK, Json(assignments)).into_response(),
        Err(err) => store_failure("fetch final assignments", err),
    }
}

fn store_failure(action: &str, err: StoreError) -> Response {
    error!(action, error = %err, "store request failed");
    let payload = json!({ "error": format!("Failed to {action}") });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
