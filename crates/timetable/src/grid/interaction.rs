//! Pointer gestures on timetable items.
//!
//! A gesture starts with [`Timetable::pointer_down`] on an item and ends
//! with [`Timetable::pointer_up`]. Pressing inside the item's bottom resize
//! band (or on its resize handle) resizes it, pressing anywhere else drags
//! it. The pressing pointer is captured: events from any other pointer are
//! ignored until it is released.
//!
//! While dragging, the item follows the pointer cell by cell without any
//! collision check. The check happens once on release, and a colliding
//! drop puts the item back where it was. Resizing clamps the duration on
//! every move, so it never needs a revert.

use tracing::{debug, trace};

use super::layout::{Cell, Point};
use super::Timetable;
use crate::item::{Change, ItemId};

/// Identifier of a pointer (mouse, pen or touch contact).
pub type PointerId = u32;

/// Kind of an active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    /// Moving an item to another cell.
    Drag,
    /// Changing an item's duration.
    Resize,
}

/// Gesture state of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Gesture {
    /// No pointer captured.
    #[default]
    Idle,
    /// An item follows the pointer.
    Dragging {
        /// The dragged item.
        item: ItemId,
        /// The captured pointer.
        pointer: PointerId,
        /// Day and start hour before the drag.
        origin: Cell,
    },
    /// An item's bottom edge follows the pointer.
    Resizing {
        /// The resized item.
        item: ItemId,
        /// The captured pointer.
        pointer: PointerId,
        /// Duration before the resize.
        original_duration: u32,
    },
}

impl Gesture {
    /// Check whether no gesture is active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Kind of the active gesture.
    #[must_use]
    pub fn kind(&self) -> Option<GestureKind> {
        match self {
            Self::Idle => None,
            Self::Dragging { .. } => Some(GestureKind::Drag),
            Self::Resizing { .. } => Some(GestureKind::Resize),
        }
    }

    /// Item the active gesture applies to.
    #[must_use]
    pub fn item(&self) -> Option<&ItemId> {
        match self {
            Self::Idle => None,
            Self::Dragging { item, .. } | Self::Resizing { item, .. } => Some(item),
        }
    }

    /// Pointer captured by the active gesture.
    #[must_use]
    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            Self::Idle => None,
            Self::Dragging { pointer, .. } | Self::Resizing { pointer, .. } => Some(*pointer),
        }
    }

    fn captures(&self, pointer: PointerId) -> bool {
        self.pointer() == Some(pointer)
    }
}

impl Timetable {
    /// The current gesture state.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Start a gesture on an item.
    ///
    /// Returns whether the pointer was captured. Nothing starts while the
    /// grid is locked or in delete mode, while another gesture is active, or
    /// when the item is unknown.
    pub fn pointer_down(
        &mut self,
        id: &ItemId,
        pointer: PointerId,
        point: Point,
        on_handle: bool,
    ) -> bool {
        if self.locked || self.delete_mode || !self.gesture.is_idle() {
            return false;
        }
        let Some(item) = self.item(id) else {
            return false;
        };

        self.gesture = if on_handle || self.layout.in_resize_zone(item, point) {
            Gesture::Resizing {
                item: id.clone(),
                pointer,
                original_duration: item.duration,
            }
        } else {
            Gesture::Dragging {
                item: id.clone(),
                pointer,
                origin: Cell::new(item.day, item.start_hour),
            }
        };
        trace!(id = %id, pointer, kind = ?self.gesture.kind(), "Captured pointer");
        true
    }

    /// Track the captured pointer.
    ///
    /// Returns whether the event was honoured.
    pub fn pointer_move(&mut self, pointer: PointerId, point: Point) -> bool {
        if !self.gesture.captures(pointer) {
            return false;
        }

        match self.gesture.clone() {
            Gesture::Idle => false,
            Gesture::Dragging { item, .. } => self.drag_to(&item, point),
            Gesture::Resizing { item, .. } => self.resize_to(&item, point),
        }
    }

    /// Finish the gesture of the captured pointer at `point`.
    ///
    /// A drag that ends on an occupied slot reverts to its start position.
    /// Returns the update to persist, or `None` when nothing changed.
    pub fn pointer_up(&mut self, pointer: PointerId, point: Point) -> Option<Change> {
        if !self.gesture.captures(pointer) {
            return None;
        }
        self.pointer_move(pointer, point);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Dragging { item, origin, .. } => {
                let current = self.item(&item)?.clone();
                if self.is_slot_occupied(
                    current.day,
                    current.start_hour,
                    current.duration,
                    Some(&item),
                ) {
                    debug!(
                        id = %item,
                        day = current.day,
                        hour = current.start_hour,
                        "Drop collides, reverting"
                    );
                    self.restore_position(&item, origin);
                    return None;
                }
                if Cell::new(current.day, current.start_hour) == origin {
                    return None;
                }
                debug!(id = %item, day = current.day, hour = current.start_hour, "Moved item");
                Some(Change::Update(current))
            }
            Gesture::Resizing {
                item,
                original_duration,
                ..
            } => {
                let current = self.item(&item)?.clone();
                if current.duration == original_duration {
                    return None;
                }
                debug!(id = %item, duration = current.duration, "Resized item");
                Some(Change::Update(current))
            }
        }
    }

    /// Abandon the active gesture and put its item back as it was.
    pub fn abort_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Dragging { item, origin, .. } => {
                debug!(id = %item, "Aborted drag");
                self.restore_position(&item, origin);
            }
            Gesture::Resizing {
                item,
                original_duration,
                ..
            } => {
                debug!(id = %item, "Aborted resize");
                if let Some(it) = self.item_mut(&item) {
                    it.duration = original_duration;
                }
            }
        }
    }

    /// Drag an item so that it starts in `target`, as a pointer would.
    pub fn drag_item_to(&mut self, id: &ItemId, target: Cell) -> Option<Change> {
        const POINTER: PointerId = 0;

        let start = self.item(id)?;
        let press = self
            .layout
            .cell_center(Cell::new(start.day, start.start_hour));
        if !self.pointer_down(id, POINTER, press, false) {
            return None;
        }

        let release = self.layout.cell_center(target);
        self.pointer_move(POINTER, release);
        self.pointer_up(POINTER, release)
    }

    /// Resize an item to `duration` hours by dragging its handle.
    ///
    /// The result is clamped like any pointer resize.
    pub fn resize_item_to(&mut self, id: &ItemId, duration: u32) -> Option<Change> {
        const POINTER: PointerId = 0;

        let item = self.item(id)?;
        let rect = self.layout.item_rect(item);
        let press = self
            .layout
            .to_client(Point::new(rect.center().x, rect.bottom()));
        let target_y = self.layout.row_top(item.start_hour)
            + (f64::from(duration) - 0.5) * self.layout.config().hour_height;
        let release = self.layout.to_client(Point::new(rect.center().x, target_y));

        if !self.pointer_down(id, POINTER, press, true) {
            return None;
        }
        self.pointer_move(POINTER, release);
        self.pointer_up(POINTER, release)
    }

    fn drag_to(&mut self, id: &ItemId, point: Point) -> bool {
        let cell = self.layout.cell_at(point);
        let config = self.layout.config();
        let (start_hour, end_hour) = (config.start_hour, config.end_hour);

        let Some(item) = self.item_mut(id) else {
            self.gesture = Gesture::Idle;
            return false;
        };
        // Keep the whole item inside the window
        let latest = end_hour.saturating_sub(item.duration).max(start_hour);
        item.day = cell.day;
        item.start_hour = cell.hour.min(latest);
        true
    }

    fn resize_to(&mut self, id: &ItemId, point: Point) -> bool {
        let Some(item) = self.item(id) else {
            self.gesture = Gesture::Idle;
            return false;
        };
        let requested = self.layout.duration_at(item, point);
        let max = self.max_allowed_duration(item.day, item.start_hour, Some(id));
        let duration = requested.clamp(1, max);

        if let Some(item) = self.item_mut(id) {
            item.duration = duration;
        }
        true
    }

    fn restore_position(&mut self, id: &ItemId, origin: Cell) {
        if let Some(item) = self.item_mut(id) {
            item.day = origin.day;
            item.start_hour = origin.hour;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::collision::find_overlap;
    use crate::grid::{GridLayout, Rect};
    use crate::item::tests::{item, module};
    use crate::item::TimetableItem;

    fn grid(items: Vec<TimetableItem>) -> Timetable {
        let layout =
            GridLayout::with_bounds(GridConfig::default(), Rect::new(100.0, 50.0, 976.0, 568.0));
        Timetable::with_items(layout, items)
    }

    fn center(grid: &Timetable, day: u32, hour: u32) -> Point {
        grid.layout().cell_center(Cell::new(day, hour))
    }

    /// A point on the bottom resize band of an item.
    fn handle(grid: &Timetable, id: &str) -> Point {
        let rect = grid.layout().item_rect(grid.item(&ItemId::new(id)).unwrap());
        grid.layout()
            .to_client(Point::new(rect.center().x, rect.bottom() - 2.0))
    }

    fn position(grid: &Timetable, id: &str) -> (u32, u32, u32) {
        let it = grid.item(&ItemId::new(id)).unwrap();
        (it.day, it.start_hour, it.duration)
    }

    #[test]
    fn test_pointer_down_selects_gesture() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        let id = ItemId::new("a");

        assert!(grid.pointer_down(&id, 1, center(&grid, 0, 10), false));
        assert_eq!(grid.gesture().kind(), Some(GestureKind::Drag));
        grid.abort_gesture();

        let point = handle(&grid, "a");
        assert!(grid.pointer_down(&id, 1, point, false));
        assert_eq!(grid.gesture().kind(), Some(GestureKind::Resize));
        grid.abort_gesture();

        assert!(grid.pointer_down(&id, 1, center(&grid, 0, 10), true));
        assert_eq!(grid.gesture().kind(), Some(GestureKind::Resize));
    }

    #[test]
    fn test_pointer_down_ignored() {
        let mut grid = grid(vec![item("a", 0, 10, 1), item("b", 1, 10, 1)]);
        let point = center(&grid, 0, 10);

        assert!(!grid.pointer_down(&ItemId::new("zzz"), 1, point, false));

        grid.set_locked(true);
        assert!(!grid.pointer_down(&ItemId::new("a"), 1, point, false));
        grid.set_locked(false);

        grid.set_delete_mode(true);
        assert!(!grid.pointer_down(&ItemId::new("a"), 1, point, false));
        grid.set_delete_mode(false);

        assert!(grid.pointer_down(&ItemId::new("a"), 1, point, false));
        // One gesture at a time
        assert!(!grid.pointer_down(&ItemId::new("b"), 2, point, false));
        assert_eq!(grid.gesture().item(), Some(&ItemId::new("a")));
    }

    #[test]
    fn test_drag_moves_item() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 7, center(&grid, 0, 10), false);
        assert!(grid.pointer_move(7, center(&grid, 2, 13)));
        assert_eq!(position(&grid, "a"), (2, 13, 2));

        let Some(Change::Update(moved)) = grid.pointer_up(7, center(&grid, 3, 14)) else {
            panic!("expected an update");
        };
        assert_eq!((moved.day, moved.start_hour), (3, 14));
        assert!(grid.gesture().is_idle());
    }

    #[test]
    fn test_drag_back_to_origin_emits_nothing() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        grid.pointer_move(1, center(&grid, 4, 15));
        assert!(grid.pointer_up(1, center(&grid, 0, 10)).is_none());
        assert_eq!(position(&grid, "a"), (0, 10, 2));
    }

    #[test]
    fn test_drag_onto_collision_reverts() {
        let mut grid = grid(vec![item("a", 0, 10, 2), item("b", 1, 14, 3)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        // Passing over an occupied slot is allowed while dragging
        grid.pointer_move(1, center(&grid, 1, 15));
        assert_eq!(position(&grid, "a"), (1, 15, 2));

        assert!(grid.pointer_up(1, center(&grid, 1, 13)).is_none());
        assert_eq!(position(&grid, "a"), (0, 10, 2));
        assert!(grid.gesture().is_idle());
    }

    #[test]
    fn test_drag_keeps_item_inside_window() {
        let mut grid = grid(vec![item("a", 0, 10, 3)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        let Some(Change::Update(moved)) = grid.pointer_up(1, center(&grid, 0, 17)) else {
            panic!("expected an update");
        };
        assert_eq!((moved.start_hour, moved.end_hour()), (15, 18));
    }

    #[test]
    fn test_release_outside_grid_clamps() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        let change = grid.pointer_up(1, Point::new(10_000.0, -10_000.0));
        assert!(change.is_some());
        assert_eq!(position(&grid, "a"), (4, 9, 1));
    }

    #[test]
    fn test_pointer_capture() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        assert_eq!(grid.gesture().pointer(), Some(1));

        assert!(!grid.pointer_move(2, center(&grid, 3, 12)));
        assert!(grid.pointer_up(2, center(&grid, 3, 12)).is_none());
        assert_eq!(position(&grid, "a"), (0, 10, 1));
        assert!(!grid.gesture().is_idle());

        assert!(grid.pointer_up(1, center(&grid, 1, 10)).is_some());
        assert!(!grid.pointer_move(1, center(&grid, 2, 10)));
        assert_eq!(position(&grid, "a"), (1, 10, 1));
    }

    #[test]
    fn test_resize_grows_and_shrinks() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        let press = handle(&grid, "a");
        grid.pointer_down(&id, 1, press, false);
        grid.pointer_move(1, center(&grid, 0, 13));
        assert_eq!(position(&grid, "a"), (0, 10, 4));
        grid.pointer_move(1, center(&grid, 0, 11));
        assert_eq!(position(&grid, "a"), (0, 10, 2));

        let Some(Change::Update(resized)) = grid.pointer_up(1, center(&grid, 0, 11)) else {
            panic!("expected an update");
        };
        assert_eq!(resized.duration, 2);
    }

    #[test]
    fn test_resize_stays_in_range_for_large_deltas() {
        let mut grid = grid(vec![item("a", 0, 10, 2), item("b", 0, 15, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, handle(&grid, "a"), false);
        for y in [1.0e9, -1.0e9, f64::MAX, f64::MIN, 0.0, 700.0, f64::NAN] {
            grid.pointer_move(1, Point::new(200.0, y));
            let duration = position(&grid, "a").2;
            assert!((1..=5).contains(&duration), "duration {duration} for y {y}");
        }
        grid.pointer_up(1, Point::new(200.0, 1.0e9));
        assert_eq!(position(&grid, "a").2, 5);
    }

    #[test]
    fn test_resize_to_same_duration_emits_nothing() {
        let mut grid = grid(vec![item("a", 0, 10, 2)]);
        assert!(grid.resize_item_to(&ItemId::new("a"), 2).is_none());
        assert_eq!(position(&grid, "a"), (0, 10, 2));
    }

    #[test]
    fn test_resize_item_to_clamps_low() {
        let mut grid = grid(vec![item("a", 0, 10, 3)]);
        let Some(Change::Update(resized)) = grid.resize_item_to(&ItemId::new("a"), 0) else {
            panic!("expected an update");
        };
        assert_eq!(resized.duration, 1);
    }

    #[test]
    fn test_drag_item_to() {
        let mut grid = grid(vec![item("a", 0, 10, 1), item("b", 2, 9, 4)]);
        let a = ItemId::new("a");

        assert!(grid.drag_item_to(&a, Cell::new(2, 11)).is_none());
        assert_eq!(position(&grid, "a"), (0, 10, 1));

        assert!(grid.drag_item_to(&a, Cell::new(2, 13)).is_some());
        assert_eq!(position(&grid, "a"), (2, 13, 1));

        assert!(grid.drag_item_to(&ItemId::new("zzz"), Cell::new(2, 13)).is_none());
    }

    #[test]
    fn test_lock_mid_gesture_restores_item() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        grid.pointer_move(1, center(&grid, 3, 15));
        grid.set_locked(true);

        assert!(grid.gesture().is_idle());
        assert_eq!(position(&grid, "a"), (0, 10, 1));
        assert!(grid.pointer_up(1, center(&grid, 3, 15)).is_none());
    }

    #[test]
    fn test_abort_resize_restores_duration() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, handle(&grid, "a"), false);
        grid.pointer_move(1, center(&grid, 0, 16));
        assert_eq!(position(&grid, "a").2, 7);
        grid.abort_gesture();
        assert_eq!(position(&grid, "a").2, 1);
    }

    #[test]
    fn test_delete_mid_gesture_ends_it() {
        let mut grid = grid(vec![item("a", 0, 10, 1)]);
        let id = ItemId::new("a");

        grid.pointer_down(&id, 1, center(&grid, 0, 10), false);
        assert!(grid.delete_item(&id).is_some());
        assert!(grid.gesture().is_idle());
        assert!(!grid.pointer_move(1, center(&grid, 1, 10)));
    }

    #[test]
    fn test_resize_by_pointer_stops_at_next_item() {
        let mut grid = grid(vec![item("first", 0, 10, 2)]);

        assert!(grid.drop_module(center(&grid, 0, 10), &module()).is_none());
        assert!(grid.drop_module(center(&grid, 0, 12), &module()).is_some());

        let first = ItemId::new("first");
        grid.pointer_down(&first, 1, handle(&grid, "first"), false);
        grid.pointer_move(1, center(&grid, 0, 12));
        assert_eq!(position(&grid, "first"), (0, 10, 2));
        assert!(grid.pointer_up(1, center(&grid, 0, 12)).is_none());
    }

    #[test]
    fn test_accepted_operations_never_overlap() {
        let mut grid = grid(vec![]);
        // Deterministic linear congruential sequence
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = |bound: u32| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            u32::try_from((state >> 33) % u64::from(bound)).unwrap()
        };

        for _ in 0..400 {
            let op = next(3);
            let (day, hour) = (next(5), 9 + next(9));
            let ids: Vec<ItemId> = grid.items().iter().map(|it| it.id.clone()).collect();

            match op {
                0 => {
                    grid.drop_module(center(&grid, day, hour), &module());
                }
                1 if !ids.is_empty() => {
                    let id = &ids[next(u32::try_from(ids.len()).unwrap()) as usize];
                    grid.drag_item_to(id, Cell::new(day, hour));
                }
                2 if !ids.is_empty() => {
                    let id = &ids[next(u32::try_from(ids.len()).unwrap()) as usize];
                    grid.resize_item_to(id, next(12));
                }
                _ => {}
            }

            assert!(find_overlap(grid.items()).is_none());
            for it in grid.items() {
                assert!(it.duration >= 1 && it.end_hour() <= 18);
            }
        }
    }
}
