#[macro_use]
extern crate prettytable;

use anyhow::anyhow;
use directories::ProjectDirs;
use log::error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use structopt::StructOpt;

mod cli;
mod clock;
mod display;
mod events;
mod frames;
mod interface;
mod journal;
mod logging;
mod model;
mod surface;
use crate::journal::init_journal;
use rusqlite::Connection;

use cli::{Command::*, CommandLineArgs};

fn find_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "gozque", "taskclock").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get a connection to the journal database, creating it if it does
/// not exist.
pub fn get_journal_db(journal_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = journal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let journal_exists = journal_path.exists();
    let db = Connection::open(journal_path)?;
    if !journal_exists {
        init_journal(&db)?;
    }
    Ok(db)
}

/// Logs go to the given directory, else under the data directory, else
/// next to the journal file. None when there is nowhere to put them.
fn resolve_log_dir(
    log_dir: Option<PathBuf>,
    data_dir: Option<&Path>,
    journal_file: &Path,
) -> Option<PathBuf> {
    log_dir
        .or_else(|| data_dir.map(|dir| dir.join("logs")))
        .or_else(|| journal_file.parent().map(|dir| dir.join("logs")))
}

fn main() -> anyhow::Result<()> {
    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        journal_file,
        log_level,
        log_dir,
    } = CommandLineArgs::from_args();

    let data_dir = find_data_dir();

    // Unpack the journal file.
    let journal_file = journal_file
        .or_else(|| data_dir.as_ref().map(|dir| dir.join("journal.sqlite")))
        .ok_or(anyhow!("Failed to find journal file."))?;

    let log_level = log_level.unwrap_or_else(|| logging::default_log_level().to_string());
    let _logger = match resolve_log_dir(log_dir, data_dir.as_deref(), &journal_file) {
        Some(log_dir) => Some(logging::init_logging(&log_level, &log_dir)?),
        None => None,
    };

    let database = get_journal_db(&journal_file)?;

    // Perform the action.
    let result = match action {
        Add { name, order } => interface::add_task(database, name, order),
        Rm { id } => interface::remove_task(database, id),
        Rename { id, name } => interface::rename_task(database, id, name),
        List => interface::list(database),
        Records { id } => interface::records(database, id),
        Start { id, frame_ms } => interface::start(database, id, Duration::from_millis(frame_ms)),
    };
    if let Err(err) = &result {
        error!("event=command_failed error={:#}", err);
    }
    result
}
