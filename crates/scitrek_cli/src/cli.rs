use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scitrek")]
#[command(about = "Command-line access to SciTrek lesson answers")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// File holding the signed-in student's tokens
    #[arg(long, default_value = "scitrek-credentials.json")]
    pub credentials: PathBuf,

    /// Absolute directory for rolling log files (logging is off when omitted)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check core linkage
    Ping,
    /// Sign in; the password is read from SCITREK_PASSWORD
    Login {
        /// Student username.
        #[arg(long)]
        username: String,
    },
    /// Show the signed-in student
    Whoami,
    /// Print saved answers and progress for one lesson day
    Answers {
        /// Lesson day, 1 through 5.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=5))]
        day: u32,
    },
    /// Edit answers for one lesson day and save them
    Save {
        /// Lesson day, 1 through 5.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=5))]
        day: u32,

        /// Field edit as `path=value`, e.g. `worksheet[0]=DNA`; JSON values are accepted
        #[arg(long = "set", value_name = "PATH=VALUE", required = true)]
        edits: Vec<String>,
    },
    /// Sign out and forget stored tokens
    Logout,
}
