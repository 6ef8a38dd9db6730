//! Core timetable record types.
//!
//! A [`TimetableItem`] is one block on the weekly grid: a session of a module
//! on a given weekday, starting on the hour and lasting whole hours. Items
//! travel as camelCase JSON, the same shape the stored per-user lists use.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{GridConfig, DAY_COUNT};
use crate::error::{Error, Result};
use crate::grid::collision::find_overlap;

/// Prefix carried by ids the client assigns before an item is saved.
pub const TEMPORARY_ID_PREFIX: &str = "tmp-";

/// Prefix carried by ids the store assigns on save.
pub const PERSISTED_ID_PREFIX: &str = "item-";

static TEMPORARY_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier of a timetable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh client-side id for an unsaved item.
    ///
    /// Ids are unique within the process: the millisecond clock is paired
    /// with a sequence number so two drops in the same millisecond differ.
    #[must_use]
    pub fn temporary() -> Self {
        let seq = TEMPORARY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{TEMPORARY_ID_PREFIX}{}-{seq}",
            Utc::now().timestamp_millis()
        ))
    }

    /// Derive the id a store assigns when it saves a temporary item.
    #[must_use]
    pub fn persisted(user: &UserId, temporary: &ItemId, saved_at_millis: i64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(user.as_str().as_bytes());
        hasher.update(b"/");
        hasher.update(temporary.as_str().as_bytes());
        hasher.update(b"/");
        hasher.update(&saved_at_millis.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        Self(format!("{PERSISTED_ID_PREFIX}{}", &hex[..16]))
    }

    /// Check whether this id was assigned by the client and not yet saved.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of the user owning a timetable.
///
/// Validated on construction so it can be used directly as a storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Parse and validate a user id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUserId`] unless the id is 1 to 128 characters
    /// of ASCII letters, digits, `_` or `-`.
    pub fn parse(id: &str) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("Invalid regex pattern"));

        if pattern.is_match(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(Error::InvalidUserId(id.to_string()))
        }
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of teaching session an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionType {
    /// A lecture. New items start as lectures.
    #[default]
    Lecture,
    /// A lab session.
    Lab,
    /// A tutorial.
    Tutorial,
}

impl SessionType {
    /// The next type in the Lecture → Lab → Tutorial cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Lecture => Self::Lab,
            Self::Lab => Self::Tutorial,
            Self::Tutorial => Self::Lecture,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lecture => write!(f, "Lecture"),
            Self::Lab => write!(f, "Lab"),
            Self::Tutorial => write!(f, "Tutorial"),
        }
    }
}

/// A module offered in the sidebar, dragged onto the grid to create items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Module identifier.
    pub id: String,
    /// Human readable module name.
    pub name: String,
    /// Short module code, e.g. `CS1010`.
    pub code: String,
}

/// Payload attached to a drag that starts in the module sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DropPayload {
    /// A module dragged from the sidebar.
    ModuleDrag {
        /// The module being dragged.
        module: ModuleDescriptor,
    },
}

fn default_duration() -> u32 {
    1
}

/// One scheduled session on the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableItem {
    /// Item identifier.
    pub id: ItemId,

    /// Weekday column, 0 (Monday) to 4 (Friday).
    pub day: u32,

    /// First hour occupied by the item.
    pub start_hour: u32,

    /// Number of whole hours occupied.
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Module this session belongs to.
    pub module_id: String,

    /// Code of the module, copied at creation.
    #[serde(default)]
    pub module_code: String,

    /// Display title, copied from the module name at creation.
    pub title: String,

    /// Free-form room or location.
    #[serde(default)]
    pub location: String,

    /// Kind of session.
    #[serde(rename = "type", default)]
    pub session_type: SessionType,
}

impl TimetableItem {
    /// Create a one-hour lecture for `module` at the given cell.
    #[must_use]
    pub fn from_module(module: &ModuleDescriptor, day: u32, start_hour: u32) -> Self {
        Self {
            id: ItemId::temporary(),
            day,
            start_hour,
            duration: 1,
            module_id: module.id.clone(),
            module_code: module.code.clone(),
            title: module.name.clone(),
            location: String::new(),
            session_type: SessionType::Lecture,
        }
    }

    /// Hour at which the item ends (exclusive).
    #[must_use]
    pub fn end_hour(&self) -> u32 {
        self.start_hour.saturating_add(self.duration)
    }

    /// Check the item against the grid's window and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidItem`] naming the first offending field.
    pub fn validate(&self, grid: &GridConfig) -> Result<()> {
        let id = self.id.as_str();

        if id.trim().is_empty() {
            return Err(Error::invalid_item(id, "id", "cannot be empty"));
        }

        if self.day >= DAY_COUNT {
            return Err(Error::invalid_item(
                id,
                "day",
                format!("must be between 0 and {}, got {}", DAY_COUNT - 1, self.day),
            ));
        }

        if !grid.contains_hour(self.start_hour) {
            return Err(Error::invalid_item(
                id,
                "startHour",
                format!(
                    "must be between {} and {}, got {}",
                    grid.start_hour,
                    grid.end_hour - 1,
                    self.start_hour
                ),
            ));
        }

        if self.duration == 0 {
            return Err(Error::invalid_item(id, "duration", "must be at least 1"));
        }

        let hours_left = grid.end_hour - self.start_hour;
        if self.duration > hours_left {
            return Err(Error::invalid_item(
                id,
                "duration",
                format!(
                    "runs past the end of the grid ({hours_left} hour(s) left, got {})",
                    self.duration
                ),
            ));
        }

        if self.module_id.trim().is_empty() {
            return Err(Error::invalid_item(id, "moduleId", "cannot be empty"));
        }

        if self.title.trim().is_empty() {
            return Err(Error::invalid_item(id, "title", "cannot be empty"));
        }

        Ok(())
    }
}

/// Check a submitted list: every item fits the grid and no two overlap.
///
/// # Errors
///
/// Returns [`Error::InvalidItem`] for the first invalid item, or
/// [`Error::Overlap`] for the first clashing pair.
pub fn validate_list(items: &[TimetableItem], grid: &GridConfig) -> Result<()> {
    for item in items {
        item.validate(grid)?;
    }

    match find_overlap(items) {
        Some((first, second)) => Err(Error::Overlap {
            first: first.id.to_string(),
            second: second.id.to_string(),
            day: first.day,
        }),
        None => Ok(()),
    }
}

/// Read a JSON array of items from a file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and [`Error::Json`] if
/// it is not an array of items.
pub fn read_items(path: &Path) -> Result<Vec<TimetableItem>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Reference to an item by id, as carried by delete changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    /// Id of the referenced item.
    pub id: ItemId,
}

/// A local mutation of the timetable, reported to whoever persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "item", rename_all = "lowercase")]
pub enum Change {
    /// A new item was created.
    Add(TimetableItem),
    /// An existing item was moved, resized or edited.
    Update(TimetableItem),
    /// An item was removed.
    Delete(ItemRef),
}

impl Change {
    /// Build a delete change for `id`.
    #[must_use]
    pub fn delete(id: ItemId) -> Self {
        Self::Delete(ItemRef { id })
    }

    /// Name of the action, as used on the wire.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }

    /// Id of the item the change applies to.
    #[must_use]
    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::Add(item) | Self::Update(item) => &item.id,
            Self::Delete(item_ref) => &item_ref.id,
        }
    }

    /// Apply the change to a local item list.
    ///
    /// Add replaces an item with the same id or appends, update replaces the
    /// matching item, delete filters it out.
    pub fn apply_to(&self, items: &mut Vec<TimetableItem>) {
        match self {
            Self::Add(item) => {
                items.retain(|it| it.id != item.id);
                items.push(item.clone());
            }
            Self::Update(item) => {
                if let Some(existing) = items.iter_mut().find(|it| it.id == item.id) {
                    *existing = item.clone();
                }
            }
            Self::Delete(item_ref) => items.retain(|it| it.id != item_ref.id),
        }
    }
}
