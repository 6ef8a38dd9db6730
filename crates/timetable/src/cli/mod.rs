//! Command-line interface for the timetable engine.
//!
//! This module provides the CLI structure for the `ttgrid` binary. Editing
//! commands drive the same grid handlers a pointer would, so a rejected drop
//! or a reverted move behaves exactly as it does on screen.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_day, AddCommand, ConfigCommand, ImportCommand, MoveCommand, OutputFormat, Placement,
    ResizeCommand, ShowCommand, StatusCommand,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::item::UserId;
use crate::logging::Verbosity;

/// ttgrid - Build a weekly timetable from the command line
///
/// Drop modules onto a Monday to Friday grid, then move, resize, retype
/// or delete the sessions. Overlapping placements are refused.
#[derive(Debug, Parser)]
#[command(name = "ttgrid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// User whose timetable to use (defaults to session.user from the config)
    #[arg(short, long, global = true, value_name = "USER")]
    pub user: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the timetable
    Show(ShowCommand),

    /// Drop a module onto the grid
    Add(AddCommand),

    /// Drag an item to another cell
    Move(MoveCommand),

    /// Drag an item's bottom edge to change its duration
    Resize(ResizeCommand),

    /// Cycle an item's session type (Lecture, Lab, Tutorial)
    Cycle {
        /// Id of the item
        id: String,
    },

    /// Delete an item
    Delete {
        /// Id of the item
        id: String,
    },

    /// Replace the whole timetable with items from a JSON file
    Import(ImportCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Resolve the user from `--user`, falling back to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no user is given or the id is invalid.
    pub fn user_id(&self, config: &Config) -> Result<UserId> {
        let user = self
            .user
            .as_deref()
            .or(config.session.user.as_deref())
            .ok_or_else(|| Error::ConfigValidation {
                message: "no user given, pass --user or set session.user".to_string(),
            })?;
        UserId::parse(user)
    }
}
