//! Room and timetable planning backend.
//!
//! The [`scheduling`] module owns the conflict rules for moving a course
//! section to a new day and timeslot; the remaining modules carry the
//! configuration, logging and error plumbing shared with the API service.

pub mod config;
pub mod error;
pub mod scheduling;
pub mod telemetry;
