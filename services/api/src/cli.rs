use crate::commands::{run_import, run_list, run_move, ImportArgs, ListArgs, MoveArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use room_planner::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Room Planner",
    about = "Serve and administer the university room timetable from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed rooms, timeslots and final assignments from CSV files
    Import(ImportArgs),
    /// Move a course section to a new day and timeslot
    Move(MoveArgs),
    /// Print final assignments, optionally scoped to a building or room
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Import(args) => run_import(args).await,
        Command::Move(args) => run_move(args).await,
        Command::List(args) => run_list(args).await,
    }
}
