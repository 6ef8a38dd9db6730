//! `timetable` - A weekly timetable grid engine
//!
//! This library maps pointer positions onto a Monday to Friday hour grid,
//! turns drops, drags and resizes into item changes while keeping items on
//! the same day from overlapping, and persists each user's timetable
//! optimistically through a pluggable store.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod item;
pub mod logging;
pub mod session;
pub mod storage;

pub use config::{Config, GridConfig};
pub use error::{Error, Result};
pub use grid::{GridLayout, Timetable};
pub use item::{Change, ItemId, ModuleDescriptor, SessionType, TimetableItem, UserId};
pub use logging::init_logging;
pub use session::{TimetableSession, TimetableStore};
pub use storage::{Storage, StorageStats};
