use crate::infra::{build_service, open_store};
use clap::Args;
use room_planner::config::AppConfig;
use room_planner::error::AppError;
use room_planner::scheduling::{
    Assignment, AssignmentScope, MoveOutcome, MoveRequest, TimetableImporter,
};
use room_planner::telemetry;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV with room_id,building[,capacity,room_type]
    #[arg(long)]
    pub(crate) rooms: Option<PathBuf>,
    /// CSV with key,timeslot
    #[arg(long)]
    pub(crate) timeslots: Option<PathBuf>,
    /// CSV with section_id,room_id,day_code,timeslot[,department,program_section]
    #[arg(long)]
    pub(crate) assignments: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct MoveArgs {
    /// Course section to move, e.g. CS101-A
    pub(crate) section_id: String,
    /// Target day code (M, T, W, Th, F, S, Su, MTh, TF, WS)
    pub(crate) day: String,
    /// Target timeslot label, e.g. "10:00 - 11:00"
    pub(crate) timeslot: String,
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// Only list assignments in rooms of this building
    #[arg(long)]
    pub(crate) building: Option<String>,
    /// Only list assignments in this room (requires --building)
    #[arg(long, requires = "building")]
    pub(crate) room: Option<String>,
    /// Emit JSON instead of a text table
    #[arg(long)]
    pub(crate) json: bool,
}

impl ListArgs {
    pub(crate) fn scope(&self) -> AssignmentScope {
        match (&self.building, &self.room) {
            (Some(building), Some(room_id)) => AssignmentScope::Room {
                building: building.clone(),
                room_id: room_id.clone(),
            },
            (Some(building), None) => AssignmentScope::Building(building.clone()),
            _ => AssignmentScope::All,
        }
    }
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let store = open_store(&config.database).await?;

    let mut importer = TimetableImporter::new(store.as_ref());
    if let Some(path) = &args.rooms {
        info!(path = %path.display(), "importing rooms");
        importer.rooms_from_path(path).await?;
    }
    if let Some(path) = &args.timeslots {
        info!(path = %path.display(), "importing timeslots");
        importer.timeslots_from_path(path).await?;
    }
    if let Some(path) = &args.assignments {
        info!(path = %path.display(), "importing final assignments");
        importer.assignments_from_path(path).await?;
    }
    let summary = importer.finish();

    println!(
        "imported {} rooms, {} timeslots, {} assignments",
        summary.rooms, summary.timeslots, summary.assignments
    );
    Ok(())
}

pub(crate) async fn run_move(args: MoveArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let request = MoveRequest::new(args.section_id, args.day, args.timeslot);
    match service.move_assignment(&request).await? {
        MoveOutcome::Committed(assignment) => {
            println!("moved: {}", format_assignment(&assignment));
            Ok(())
        }
        MoveOutcome::Rejected(conflict) => Err(AppError::Conflict(conflict)),
    }
}

pub(crate) async fn run_list(args: ListArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let assignments = service.assignments(&args.scope()).await?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&assignments)
            .map_err(|err| AppError::Io(err.into()))?;
        println!("{rendered}");
    } else {
        for assignment in &assignments {
            println!("{}", format_assignment(assignment));
        }
    }
    Ok(())
}

pub(crate) fn format_assignment(assignment: &Assignment) -> String {
    format!(
        "{:<14} {:<8} {:<4} {:<15} {}",
        assignment.section_id,
        assignment.room_id,
        assignment.day_code,
        assignment.timeslot,
        assignment.department
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_planner::scheduling::SectionId;

    fn list_args(building: Option<&str>, room: Option<&str>) -> ListArgs {
        ListArgs {
            building: building.map(str::to_string),
            room: room.map(str::to_string),
            json: false,
        }
    }

    #[test]
    fn list_scope_narrows_with_flags() {
        assert_eq!(list_args(None, None).scope(), AssignmentScope::All);
        assert_eq!(
            list_args(Some("Main"), None).scope(),
            AssignmentScope::Building("Main".to_string())
        );
        assert_eq!(
            list_args(Some("Main"), Some("R101")).scope(),
            AssignmentScope::Room {
                building: "Main".to_string(),
                room_id: "R101".to_string(),
            }
        );
    }

    #[test]
    fn formatted_row_carries_slot_details() {
        let assignment = Assignment {
            section_id: SectionId::from("CS101-A"),
            room_id: "R101".to_string(),
            day_code: "MTh".to_string(),
            timeslot: "10:00 - 11:00".to_string(),
            start_time: "10:00".to_string(),
            end_time: "11:00".to_string(),
            department: "CCS".to_string(),
            program_section: "BSCS 1-A".to_string(),
        };

        let row = format_assignment(&assignment);
        assert!(row.starts_with("CS101-A"));
        assert!(row.contains("MTh"));
        assert!(row.contains("10:00 - 11:00"));
        assert!(row.ends_with("CCS"));
    }
}
