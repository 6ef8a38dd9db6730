//! The interactive weekly grid.
//!
//! [`Timetable`] owns the locally displayed item list and turns user input
//! into [`Change`]s:
//!
//! - **Creation** only happens by dropping a module from the sidebar onto a
//!   free cell. Clicking an empty cell never creates anything.
//! - **Moving and resizing** go through the pointer gesture handlers in
//!   [`interaction`].
//! - **Editing**: cycling the session type, generic updates, and deletion.
//!
//! Every handler returns the change it applied locally, or `None` when the
//! input was ignored. Placements that would overlap another item are
//! rejected or reverted silently; nothing is reported for them.
//!
//! # Example
//!
//! ```
//! use timetable::config::GridConfig;
//! use timetable::grid::{Cell, GridLayout, Timetable};
//! use timetable::item::{Change, ModuleDescriptor};
//!
//! let mut grid = Timetable::new(GridLayout::new(GridConfig::default()));
//! let module = ModuleDescriptor {
//!     id: "m1".to_string(),
//!     name: "Algorithms".to_string(),
//!     code: "CS3230".to_string(),
//! };
//!
//! let point = grid.layout().cell_center(Cell::new(0, 10));
//! assert!(matches!(grid.drop_module(point, &module), Some(Change::Add(_))));
//! // The cell is now taken, a second drop is ignored
//! assert!(grid.drop_module(point, &module).is_none());
//! ```

pub mod collision;
pub mod interaction;
pub mod layout;

pub use interaction::{Gesture, GestureKind, PointerId};
pub use layout::{Cell, GridLayout, Point, Rect};

use tracing::{debug, trace, warn};

use crate::config::DAY_COUNT;
use crate::item::{Change, DropPayload, ItemId, ModuleDescriptor, TimetableItem};

/// Local state of the weekly grid.
#[derive(Debug)]
pub struct Timetable {
    layout: GridLayout,
    items: Vec<TimetableItem>,
    locked: bool,
    delete_mode: bool,
    gesture: Gesture,
}

impl Timetable {
    /// Create an empty grid.
    #[must_use]
    pub fn new(layout: GridLayout) -> Self {
        Self::with_items(layout, Vec::new())
    }

    /// Create a grid showing `items`.
    #[must_use]
    pub fn with_items(layout: GridLayout, items: Vec<TimetableItem>) -> Self {
        Self {
            layout,
            items,
            locked: false,
            delete_mode: false,
            gesture: Gesture::Idle,
        }
    }

    /// The grid geometry.
    #[must_use]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Update the container bounds, e.g. after a window resize.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.layout.set_bounds(bounds);
    }

    /// The items currently shown, including any in-flight gesture.
    #[must_use]
    pub fn items(&self) -> &[TimetableItem] {
        &self.items
    }

    /// Look up an item by id.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&TimetableItem> {
        self.items.iter().find(|it| it.id == *id)
    }

    fn item_mut(&mut self, id: &ItemId) -> Option<&mut TimetableItem> {
        self.items.iter_mut().find(|it| it.id == *id)
    }

    /// Replace the shown items with the authoritative list.
    ///
    /// Any gesture in progress is dropped along with the old list.
    pub fn sync_items(&mut self, items: Vec<TimetableItem>) {
        if !self.gesture.is_idle() {
            debug!("Discarding gesture on item sync");
        }
        self.gesture = Gesture::Idle;
        self.items = items;
    }

    /// Whether pointer interaction is disabled.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Enable or disable the lock. Locking aborts a gesture in progress.
    pub fn set_locked(&mut self, locked: bool) {
        if locked {
            self.abort_gesture();
        }
        self.locked = locked;
    }

    /// Whether clicks delete items instead of starting gestures.
    #[must_use]
    pub fn is_delete_mode(&self) -> bool {
        self.delete_mode
    }

    /// Enable or disable delete mode. Entering it aborts a gesture in progress.
    pub fn set_delete_mode(&mut self, delete_mode: bool) {
        if delete_mode {
            self.abort_gesture();
        }
        self.delete_mode = delete_mode;
    }

    /// Check whether a placement overlaps any other item on the same day.
    #[must_use]
    pub fn is_slot_occupied(
        &self,
        day: u32,
        start_hour: u32,
        duration: u32,
        exclude: Option<&ItemId>,
    ) -> bool {
        collision::is_slot_occupied(&self.items, day, start_hour, duration, exclude)
    }

    /// Largest duration an item starting at `start_hour` may have.
    #[must_use]
    pub fn max_allowed_duration(&self, day: u32, start_hour: u32, exclude: Option<&ItemId>) -> u32 {
        collision::max_allowed_duration(
            &self.items,
            day,
            start_hour,
            exclude,
            self.layout.config().end_hour,
        )
    }

    /// Create a one-hour lecture for `module` in the cell under `point`.
    ///
    /// Ignored when the grid is locked or the cell is already taken.
    pub fn drop_module(&mut self, point: Point, module: &ModuleDescriptor) -> Option<Change> {
        if self.locked {
            return None;
        }

        let cell = self.layout.cell_at(point);
        if self.is_slot_occupied(cell.day, cell.hour, 1, None) {
            debug!(day = cell.day, hour = cell.hour, "Drop rejected, slot occupied");
            return None;
        }

        let item = TimetableItem::from_module(module, cell.day, cell.hour);
        debug!(id = %item.id, day = cell.day, hour = cell.hour, "Added {}", module.code);
        self.items.push(item.clone());
        Some(Change::Add(item))
    }

    /// Handle a raw drop carrying the sidebar's JSON payload.
    ///
    /// Payloads that fail to parse are logged and ignored.
    pub fn drop_payload(&mut self, point: Point, payload: &str) -> Option<Change> {
        match serde_json::from_str::<DropPayload>(payload) {
            Ok(DropPayload::ModuleDrag { module }) => self.drop_module(point, &module),
            Err(e) => {
                warn!(error = %e, "Failed to parse drop payload");
                None
            }
        }
    }

    /// Handle a click on an item. Deletes it when delete mode is on.
    pub fn click(&mut self, id: &ItemId) -> Option<Change> {
        if self.delete_mode {
            self.delete_item(id)
        } else {
            None
        }
    }

    /// Remove an item.
    pub fn delete_item(&mut self, id: &ItemId) -> Option<Change> {
        if self.locked {
            return None;
        }

        let before = self.items.len();
        self.items.retain(|it| it.id != *id);
        if self.items.len() == before {
            return None;
        }

        if self.gesture.item() == Some(id) {
            self.gesture = Gesture::Idle;
        }
        debug!(id = %id, "Deleted item");
        Some(Change::delete(id.clone()))
    }

    /// Advance an item's session type: Lecture, Lab, Tutorial, then Lecture.
    pub fn cycle_session_type(&mut self, id: &ItemId) -> Option<Change> {
        if self.locked {
            return None;
        }

        let item = self.item_mut(id)?;
        item.session_type = item.session_type.next();
        trace!(id = %id, session_type = %item.session_type, "Cycled session type");
        Some(Change::Update(item.clone()))
    }

    /// Replace an item with an edited copy.
    ///
    /// A grown duration that would overlap a later item, or run past the
    /// grid, is clamped to the largest allowed duration. A new position that
    /// falls outside the grid or overlaps another item is rejected.
    pub fn update_item(&mut self, mut updated: TimetableItem) -> Option<Change> {
        if self.locked {
            return None;
        }

        let original = self.item(&updated.id)?;
        let config = self.layout.config();
        let moved = original.day != updated.day || original.start_hour != updated.start_hour;

        if moved {
            let fits_window = updated.day < DAY_COUNT
                && config.contains_hour(updated.start_hour)
                && (1..=config.end_hour - updated.start_hour).contains(&updated.duration);
            if !fits_window
                || self.is_slot_occupied(
                    updated.day,
                    updated.start_hour,
                    updated.duration,
                    Some(&updated.id),
                )
            {
                debug!(id = %updated.id, "Update rejected, placement unavailable");
                return None;
            }
        } else if original.duration != updated.duration {
            let max = self.max_allowed_duration(updated.day, updated.start_hour, Some(&updated.id));
            let clamped = updated.duration.clamp(1, max);
            if clamped != updated.duration {
                debug!(id = %updated.id, requested = updated.duration, clamped, "Clamped duration");
                updated.duration = clamped;
            }
        }

        let current = self.item_mut(&updated.id)?;
        if *current == updated {
            return None;
        }
        *current = updated.clone();
        Some(Change::Update(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::item::tests::{item, module};
    use crate::item::SessionType;

    fn grid(items: Vec<TimetableItem>) -> Timetable {
        Timetable::with_items(GridLayout::new(GridConfig::default()), items)
    }

    fn at(grid: &Timetable, day: u32, hour: u32) -> Point {
        grid.layout().cell_center(Cell::new(day, hour))
    }

    #[test]
    fn test_drop_creates_lecture() {
        let mut grid = grid(vec![]);
        let point = at(&grid, 3, 14);

        let change = grid.drop_module(point, &module()).unwrap();
        let Change::Add(added) = change else {
            panic!("expected an add");
        };
        assert_eq!((added.day, added.start_hour, added.duration), (3, 14, 1));
        assert_eq!(added.session_type, SessionType::Lecture);
        assert!(added.id.is_temporary());
        assert_eq!(grid.items().len(), 1);
    }

    #[test]
    fn test_drop_on_occupied_cell_is_ignored() {
        let items = vec![item("a", 0, 10, 2)];
        let mut grid = grid(items.clone());

        let point = at(&grid, 0, 11);
        assert!(grid.drop_module(point, &module()).is_none());
        assert_eq!(grid.items(), items.as_slice());
    }

    #[test]
    fn test_drop_outside_grid_clamps() {
        let mut grid = grid(vec![]);
        let change = grid
            .drop_module(Point::new(99_999.0, -40.0), &module())
            .unwrap();
        assert_eq!(change.item_id(), &grid.items()[0].id);
        assert_eq!((grid.items()[0].day, grid.items()[0].start_hour), (4, 9));
    }

    #[test]
    fn test_drop_ignored_when_locked() {
        let mut grid = grid(vec![]);
        grid.set_locked(true);
        let point = at(&grid, 0, 9);
        assert!(grid.drop_module(point, &module()).is_none());
        assert!(grid.items().is_empty());
    }

    #[test]
    fn test_drop_payload() {
        let mut grid = grid(vec![]);
        let point = at(&grid, 1, 9);
        let payload = r#"{"type":"module-drag","module":{"id":"m","name":"Networks","code":"CS2105"}}"#;

        assert!(grid.drop_payload(point, payload).is_some());
        assert_eq!(grid.items()[0].module_code, "CS2105");

        let point = at(&grid, 2, 9);
        assert!(grid.drop_payload(point, "not json").is_none());
        assert!(grid.drop_payload(point, r#"{"type":"file"}"#).is_none());
        assert_eq!(grid.items().len(), 1);
    }

    #[test]
    fn test_click_deletes_only_in_delete_mode() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        assert!(grid.click(&id).is_none());
        assert_eq!(grid.items().len(), 1);

        grid.set_delete_mode(true);
        assert_eq!(grid.click(&id), Some(Change::delete(id.clone())));
        assert!(grid.items().is_empty());
    }

    #[test]
    fn test_delete_unknown_item() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        assert!(grid.delete_item(&ItemId::new("zzz")).is_none());
        assert_eq!(grid.items().len(), 1);
    }

    #[test]
    fn test_delete_ignored_when_locked() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        grid.set_locked(true);
        assert!(grid.delete_item(&ItemId::new("a")).is_none());
        assert_eq!(grid.items().len(), 1);
    }

    #[test]
    fn test_cycle_session_type() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        let Some(Change::Update(updated)) = grid.cycle_session_type(&id) else {
            panic!("expected an update");
        };
        assert_eq!(updated.session_type, SessionType::Lab);

        grid.cycle_session_type(&id);
        grid.cycle_session_type(&id);
        assert_eq!(grid.item(&id).unwrap().session_type, SessionType::Lecture);

        assert!(grid.cycle_session_type(&ItemId::new("zzz")).is_none());
    }

    #[test]
    fn test_update_item_clamps_duration() {
        let mut grid = grid(vec![item("a", 0, 10, 2), item("b", 0, 12, 1)]);

        let mut grown = item("a", 0, 10, 3);
        grown.location = "LT19".to_string();
        let Some(Change::Update(updated)) = grid.update_item(grown) else {
            panic!("expected an update");
        };
        assert_eq!(updated.duration, 2);
        assert_eq!(updated.location, "LT19");
    }

    #[test]
    fn test_update_item_clamps_to_window() {
        let mut grid = grid(vec![item("a", 0, 16, 1)]);
        let Some(Change::Update(updated)) = grid.update_item(item("a", 0, 16, 5)) else {
            panic!("expected an update");
        };
        assert_eq!(updated.duration, 2);
    }

    #[test]
    fn test_update_item_rejects_colliding_move() {
        let mut grid = grid(vec![item("a", 0, 10, 2), item("b", 1, 9, 1)]);
        assert!(grid.update_item(item("b", 0, 11, 1)).is_none());
        assert_eq!(grid.item(&ItemId::new("b")).unwrap().day, 1);

        assert!(grid.update_item(item("b", 0, 12, 1)).is_some());
        assert_eq!(grid.item(&ItemId::new("b")).unwrap().day, 0);
    }

    #[test]
    fn test_update_item_rejects_move_off_grid() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        assert!(grid.update_item(item("a", 7, 10, 2)).is_none());
        assert!(grid.update_item(item("a", 0, 17, 2)).is_none());
        assert!(grid.update_item(item("a", 0, 8, 1)).is_none());
    }

    #[test]
    fn test_update_item_huge_duration() {
        let mut grid = grid(vec![item("a", 0, 10, 2), item("b", 1, 9, 1)]);

        assert!(grid.update_item(item("b", 2, 10, u32::MAX)).is_none());
        assert_eq!(grid.item(&ItemId::new("b")).unwrap(), &item("b", 1, 9, 1));

        let Some(Change::Update(updated)) = grid.update_item(item("a", 0, 10, u32::MAX)) else {
            panic!("expected an update");
        };
        assert_eq!(updated.duration, 8);
    }

    #[test]
    fn test_update_item_unchanged_emits_nothing() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        assert!(grid.update_item(item("a", 0, 10, 2)).is_none());
    }

    #[test]
    fn test_sync_items_replaces_list() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        grid.sync_items(vec![item("x", 4, 9, 1), item("y", 4, 10, 1)]);
        assert_eq!(grid.items().len(), 2);
        assert!(grid.item(&ItemId::new("a")).is_none());
    }

    #[test]
    fn test_drop_then_resize_into_neighbour() {
        // Window 9-18 with one item occupying 10-12 on Monday
        let mut grid = grid(vec![item("first", 0, 10, 2)]);

        assert!(grid.drop_module(at(&grid, 0, 10), &module()).is_none());

        let Some(Change::Add(added)) = grid.drop_module(at(&grid, 0, 12), &module()) else {
            panic!("expected an add");
        };
        assert_eq!((added.day, added.start_hour, added.duration), (0, 12, 1));

        let first = ItemId::new("first");
        assert_eq!(grid.max_allowed_duration(0, 10, Some(&first)), 2);
        grid.resize_item_to(&first, 3);
        assert_eq!(grid.item(&first).unwrap().duration, 2);
    }
}
