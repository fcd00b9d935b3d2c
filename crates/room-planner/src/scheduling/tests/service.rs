use super::common::*;
use std::sync::Arc;

use crate::scheduling::conflict::ScheduleConflict;
use crate::scheduling::domain::SectionId;
use crate::scheduling::memory::InMemoryAssignmentStore;
use crate::scheduling::repository::StoreError;
use crate::scheduling::service::{
    MoveError, MoveOutcome, MoveRequest, TimetableService, UnknownDayPolicy,
};

#[tokio::test]
async fn commits_move_into_free_slot() {
    let (service, store) = service_with(vec![cs101()]);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00 - 11:00"))
        .await
        .expect("move evaluates");

    let moved = match outcome {
        MoveOutcome::Committed(assignment) => assignment,
        other => panic!("expected commit, got {other:?}"),
    };
    assert_eq!(moved.day_code, "Th");
    assert_eq!(moved.start_time, "10:00");
    assert_eq!(moved.end_time, "11:00");
    assert_eq!(moved.room_id, "R101");

    assert_eq!(stored(&store, "CS101-A").await, moved);
}

#[tokio::test]
async fn rejects_move_into_combined_day_booking() {
    let (service, store) = service_with(vec![cs101(), math201()]);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00 - 11:00"))
        .await
        .expect("move evaluates");

    assert_eq!(
        outcome,
        MoveOutcome::Rejected(ScheduleConflict {
            conflicting_section_id: SectionId::from("MATH201-B"),
            room_id: "R101".to_string(),
            day_code: "MTh".to_string(),
            timeslot: "10:00 - 11:00".to_string(),
        })
    );
    assert_eq!(stored(&store, "CS101-A").await, cs101());
}

#[tokio::test]
async fn combined_day_move_collides_with_single_day_booking() {
    let friday = assignment("ENG110-C", "R101", "F", "09:00 - 10:00");
    let (service, _) = service_with(vec![cs101(), friday]);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "TF", "09:00 - 10:00"))
        .await
        .expect("move evaluates");

    match outcome {
        MoveOutcome::Rejected(conflict) => {
            assert_eq!(conflict.conflicting_section_id, SectionId::from("ENG110-C"));
            assert_eq!(conflict.day_code, "F");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn other_rooms_and_unrelated_days_do_not_conflict() {
    let elsewhere = assignment("PHYS101-A", "R102", "Th", "10:00 - 11:00");
    let wednesday = assignment("HIST101-A", "R101", "W", "10:00 - 11:00");
    let (service, _) = service_with(vec![cs101(), elsewhere, wednesday]);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00 - 11:00"))
        .await
        .expect("move evaluates");

    assert!(matches!(outcome, MoveOutcome::Committed(_)));
}

#[tokio::test]
async fn missing_section_is_not_found() {
    let (service, _) = service_with(vec![cs101()]);

    match service
        .move_assignment(&MoveRequest::new("NOPE999", "M", "08:00 - 09:00"))
        .await
    {
        Err(MoveError::NotFound(section)) => assert_eq!(section, SectionId::from("NOPE999")),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_fields_are_invalid_before_lookup() {
    let service = TimetableService::new(Arc::new(UnavailableStore));

    for request in [
        MoveRequest::new("CS101-A", "Th", ""),
        MoveRequest::new("CS101-A", "  ", "10:00 - 11:00"),
        MoveRequest::new("", "Th", "10:00 - 11:00"),
        MoveRequest::default(),
    ] {
        match service.move_assignment(&request).await {
            Err(MoveError::InvalidRequest(reason)) => {
                assert!(reason.contains("missing required fields"), "{reason}")
            }
            other => panic!("expected invalid request for {request:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn malformed_timeslot_is_invalid_and_leaves_record_untouched() {
    let (service, store) = service_with(vec![cs101()]);

    match service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00-11:00"))
        .await
    {
        Err(MoveError::InvalidRequest(reason)) => assert!(reason.contains("10:00-11:00")),
        other => panic!("expected invalid request, got {other:?}"),
    }
    assert_eq!(stored(&store, "CS101-A").await, cs101());
}

#[tokio::test]
async fn unknown_day_codes_are_rejected_by_default() {
    let (service, store) = service_with(vec![cs101()]);

    match service
        .move_assignment(&MoveRequest::new("CS101-A", "MW", "10:00 - 11:00"))
        .await
    {
        Err(MoveError::InvalidRequest(reason)) => assert!(reason.contains("unknown day code")),
        other => panic!("expected invalid request, got {other:?}"),
    }
    assert_eq!(stored(&store, "CS101-A").await, cs101());
}

#[tokio::test]
async fn lenient_policy_accepts_unknown_day_codes() {
    let blocker = assignment("ART100-A", "R101", "MW", "10:00 - 11:00");
    let store = store_with(vec![cs101(), blocker]);
    let service =
        TimetableService::new(store.clone()).with_unknown_day_policy(UnknownDayPolicy::Allow);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "MW", "10:00 - 11:00"))
        .await
        .expect("move evaluates");
    assert!(matches!(outcome, MoveOutcome::Rejected(_)));

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "MW", "08:00 - 09:00"))
        .await
        .expect("move evaluates");
    assert!(matches!(outcome, MoveOutcome::Committed(_)));
    assert_eq!(stored(&store, "CS101-A").await.day_code, "MW");
}

#[tokio::test]
async fn moving_to_current_slot_does_not_conflict_with_itself() {
    let (service, store) = service_with(vec![cs101(), math201()]);

    let outcome = service
        .move_assignment(&MoveRequest::new("CS101-A", "M", "08:00 - 09:00"))
        .await
        .expect("move evaluates");

    assert_eq!(outcome, MoveOutcome::Committed(cs101()));
    assert_eq!(stored(&store, "CS101-A").await, cs101());
}

#[tokio::test]
async fn repeated_rejection_is_identical() {
    let (service, store) = service_with(vec![cs101(), math201()]);
    let request = MoveRequest::new("CS101-A", "M", "10:00 - 11:00");

    let first = service.move_assignment(&request).await.expect("first attempt");
    let second = service.move_assignment(&request).await.expect("second attempt");

    assert!(matches!(first, MoveOutcome::Rejected(_)));
    assert_eq!(first, second);
    assert_eq!(store.assignments().await, vec![cs101(), math201()]);
}

#[tokio::test]
async fn committed_move_keeps_all_four_fields_consistent() {
    let (service, store) = service_with(vec![cs101()]);

    service
        .move_assignment(&MoveRequest::new(" CS101-A ", "WS", "7:30 AM - 9:00 AM"))
        .await
        .expect("move evaluates");

    let moved = stored(&store, "CS101-A").await;
    assert_eq!(moved.day_code, "WS");
    assert_eq!(moved.timeslot, "7:30 AM - 9:00 AM");
    assert_eq!(
        format!("{} - {}", moved.start_time, moved.end_time),
        moved.timeslot
    );
    assert_eq!(moved.department, "CCS");
}

#[tokio::test]
async fn store_failure_on_write_leaves_record_untouched() {
    let inner = InMemoryAssignmentStore::with_records(campus_rooms(), vec![cs101()]);
    let service = TimetableService::new(Arc::new(ReadOnlyStore {
        inner: inner.clone(),
    }));

    match service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00 - 11:00"))
        .await
    {
        Err(MoveError::Store(StoreError::Query(_))) => {}
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(stored(&inner, "CS101-A").await, cs101());
}

#[tokio::test]
async fn unavailable_store_surfaces_store_error() {
    let service = TimetableService::new(Arc::new(UnavailableStore));

    match service
        .move_assignment(&MoveRequest::new("CS101-A", "Th", "10:00 - 11:00"))
        .await
    {
        Err(MoveError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn sequences_of_moves_never_double_book() {
    let (service, store) = service_with(vec![
        assignment("A", "R101", "M", "08:00 - 09:00"),
        assignment("B", "R101", "T", "08:00 - 09:00"),
        assignment("C", "R101", "WS", "09:00 - 10:00"),
        assignment("D", "R102", "MTh", "08:00 - 09:00"),
    ]);
    let days = ["M", "T", "W", "Th", "F", "S", "Su", "MTh", "TF", "WS"];
    let slots = ["08:00 - 09:00", "09:00 - 10:00"];

    let mut committed = 0;
    for (step, section) in ["A", "B", "C", "D"].iter().cycle().take(40).enumerate() {
        let day = days[(step * 7) % days.len()];
        let slot = slots[(step / 3) % slots.len()];
        let outcome = service
            .move_assignment(&MoveRequest::new(*section, day, slot))
            .await
            .expect("move evaluates");
        if matches!(outcome, MoveOutcome::Committed(_)) {
            committed += 1;
        }
        assert_no_double_booking(&store.assignments().await);
    }

    assert!(committed > 0, "at least some moves should land");
}
