use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Create a new task.
    Add {
        /// The task name.
        #[structopt()]
        name: String,

        /// Display order of the task (defaults to last)
        #[structopt(short, long)]
        order: Option<u32>,
    },
    /// Remove a task and its records.
    Rm {
        #[structopt()]
        id: u32,
    },
    /// Rename a task.
    Rename {
        #[structopt()]
        id: u32,

        #[structopt()]
        name: String,
    },
    /// List all tasks with their accumulated time.
    List,
    /// Show the time recorded on a task, day by day.
    Records {
        #[structopt()]
        id: u32,
    },
    /// Time a task until stopped (enter, "s", "h" or "q" stop it).
    Start {
        #[structopt()]
        id: u32,

        /// Milliseconds between redraws.
        #[structopt(long, default_value = "250")]
        frame_ms: u64,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(name = "taskclock", about = "A minimalistic terminal time tracker.")]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different journal file.
    #[structopt(parse(from_os_str), short, long)]
    pub journal_file: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error or off.
    #[structopt(long)]
    pub log_level: Option<String>,

    /// Write logs into this directory.
    #[structopt(parse(from_os_str), long)]
    pub log_dir: Option<PathBuf>,
}
