//! CLI command definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand, ValueEnum};

use crate::config::{DAY_COUNT, DAY_LABELS};

const DAY_NAMES: [&str; DAY_COUNT as usize] =
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Parse a weekday given as an index (`0` is Monday) or a name (`tue`, `Tuesday`).
///
/// # Errors
///
/// Returns a message naming the accepted values.
pub fn parse_day(value: &str) -> Result<u32, String> {
    if let Ok(index) = value.parse::<u32>() {
        if index < DAY_COUNT {
            return Ok(index);
        }
    }

    DAY_LABELS
        .iter()
        .zip(DAY_NAMES)
        .position(|(label, name)| {
            value.eq_ignore_ascii_case(label) || value.eq_ignore_ascii_case(name)
        })
        .and_then(|index| u32::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "'{value}' is not a weekday, use 0-{} or one of {}",
                DAY_COUNT - 1,
                DAY_LABELS.join(", ")
            )
        })
}

/// Output format for showing a timetable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Week grid, one row per hour
    #[default]
    Grid,
    /// One line per item
    List,
    /// JSON array of items
    Json,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "grid")]
    pub format: OutputFormat,
}

/// Add command arguments.
///
/// The item lands in the cell at `--day`/`--hour`, or in the cell under the
/// grid pixel `--x`/`--y`.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("placement").required(true).args(["day", "x"])))]
pub struct AddCommand {
    /// Module identifier
    #[arg(long)]
    pub module_id: String,

    /// Module code, e.g. CS1010
    #[arg(long)]
    pub code: String,

    /// Module name, used as the item title
    #[arg(long)]
    pub name: String,

    /// Weekday (0-4 or mon..fri)
    #[arg(long, value_parser = parse_day, requires = "hour")]
    pub day: Option<u32>,

    /// Start hour
    #[arg(long, requires = "day")]
    pub hour: Option<u32>,

    /// Drop position, horizontal pixel inside the grid
    #[arg(long, requires = "y", allow_negative_numbers = true)]
    pub x: Option<f64>,

    /// Drop position, vertical pixel inside the grid
    #[arg(long, requires = "x", allow_negative_numbers = true)]
    pub y: Option<f64>,
}

/// Where an added item should be dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// A day/hour cell.
    Cell {
        /// Weekday index.
        day: u32,
        /// Start hour.
        hour: u32,
    },
    /// A pixel position relative to the grid container.
    Point {
        /// Horizontal pixel.
        x: f64,
        /// Vertical pixel.
        y: f64,
    },
}

impl AddCommand {
    /// The requested drop placement.
    #[must_use]
    pub fn placement(&self) -> Option<Placement> {
        match (self.day, self.hour, self.x, self.y) {
            (Some(day), Some(hour), _, _) => Some(Placement::Cell { day, hour }),
            (_, _, Some(x), Some(y)) => Some(Placement::Point { x, y }),
            _ => None,
        }
    }
}

/// Move command arguments.
#[derive(Debug, Args)]
pub struct MoveCommand {
    /// Id of the item to move
    pub id: String,

    /// Target weekday (0-4 or mon..fri)
    #[arg(long, value_parser = parse_day)]
    pub day: u32,

    /// Target start hour
    #[arg(long)]
    pub hour: u32,
}

/// Resize command arguments.
#[derive(Debug, Args)]
pub struct ResizeCommand {
    /// Id of the item to resize
    pub id: String,

    /// New duration in hours
    #[arg(short, long)]
    pub duration: u32,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// JSON file holding an array of items
    pub file: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
