//! Configuration management for the timetable engine.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::UserId;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "timetable";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "timetable.db";

/// Number of weekday columns on the grid (Monday to Friday).
pub const DAY_COUNT: u32 = 5;

/// Column header labels, Monday first.
pub const DAY_LABELS: [&str; DAY_COUNT as usize] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TIMETABLE_`)
/// 2. TOML config file at `~/.config/timetable/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grid geometry and display window.
    pub grid: GridConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Session configuration.
    pub session: SessionConfig,
}

/// Geometry of the weekly grid.
///
/// Hours describe the half-open display window `[start_hour, end_hour)`.
/// Everything else is in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// First hour shown on the grid.
    pub start_hour: u32,
    /// Hour at which the grid ends (exclusive).
    pub end_hour: u32,
    /// Height of one hour row.
    pub hour_height: f64,
    /// Height of the day label header above the rows.
    pub header_height: f64,
    /// Width of the time label gutter left of the columns.
    pub gutter_left: f64,
    /// Width of the grid container when none is measured.
    pub container_width: f64,
    /// Lower bound for a day column's width.
    pub min_column_width: f64,
    /// Height of the band at an item's bottom edge that starts a resize.
    pub resize_zone: f64,
    /// Vertical gap left below each rendered item.
    pub item_gap: f64,
    /// Horizontal padding between a column edge and its items.
    pub item_inset: f64,
    /// Lower bound for a rendered item's width.
    pub min_item_width: f64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/timetable/timetable.db`
    pub database_path: Option<PathBuf>,
}

/// Session-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// User whose timetable the CLI edits when `--user` is not given.
    pub user: Option<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 18,
            hour_height: 60.0,
            header_height: 28.0,
            gutter_left: 64.0,
            container_width: 1000.0,
            min_column_width: 120.0,
            resize_zone: 8.0,
            item_gap: 4.0,
            item_inset: 6.0,
            min_item_width: 40.0,
        }
    }
}

impl GridConfig {
    /// Number of hour rows in the display window.
    #[must_use]
    pub fn hour_count(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }

    /// Check whether `hour` is a valid start hour inside the window.
    #[must_use]
    pub fn contains_hour(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }

    /// Validate the grid geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is empty or a pixel size is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.start_hour >= self.end_hour {
            return Err(Error::ConfigValidation {
                message: format!(
                    "start_hour ({}) must be less than end_hour ({})",
                    self.start_hour, self.end_hour
                ),
            });
        }

        if self.end_hour > 24 {
            return Err(Error::ConfigValidation {
                message: format!("end_hour ({}) cannot be later than 24", self.end_hour),
            });
        }

        let positive = [
            ("hour_height", self.hour_height),
            ("container_width", self.container_width),
            ("min_column_width", self.min_column_width),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }

        let non_negative = [
            ("header_height", self.header_height),
            ("gutter_left", self.gutter_left),
            ("resize_zone", self.resize_zone),
            ("item_gap", self.item_gap),
            ("item_inset", self.item_inset),
            ("min_item_width", self.min_item_width),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} cannot be negative"),
                });
            }
        }

        if self.resize_zone >= self.hour_height {
            return Err(Error::ConfigValidation {
                message: format!(
                    "resize_zone ({}) must be smaller than hour_height ({})",
                    self.resize_zone, self.hour_height
                ),
            });
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `TIMETABLE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TIMETABLE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;

        if let Some(user) = &self.session.user {
            UserId::parse(user).map_err(|_| Error::ConfigValidation {
                message: format!("session.user is not a valid user id: {user}"),
            })?;
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
