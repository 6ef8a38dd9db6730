//! Overlap queries over an in-memory item list.
//!
//! All intervals are half-open hours, `[start, start + duration)`: an item
//! ending at 12 and one starting at 12 do not collide. Items store a
//! duration of at least one hour; a zero duration is read as one.

use crate::item::{ItemId, TimetableItem};

/// Check whether `[a, a + da)` and `[b, b + db)` overlap.
#[must_use]
pub fn intervals_overlap(a: u32, da: u32, b: u32, db: u32) -> bool {
    a < b.saturating_add(db) && b < a.saturating_add(da)
}

fn is_excluded(item: &TimetableItem, exclude: Option<&ItemId>) -> bool {
    exclude.is_some_and(|id| item.id == *id)
}

/// Check whether a proposed placement overlaps any item on the same day.
///
/// `exclude` skips the item being moved or resized.
#[must_use]
pub fn is_slot_occupied(
    items: &[TimetableItem],
    day: u32,
    start_hour: u32,
    duration: u32,
    exclude: Option<&ItemId>,
) -> bool {
    items.iter().any(|item| {
        !is_excluded(item, exclude)
            && item.day == day
            && intervals_overlap(
                start_hour,
                duration,
                item.start_hour,
                item.duration.max(1),
            )
    })
}

/// Largest duration starting at `start_hour` that stays clear of later items.
///
/// Bounded by the hours left before `end_hour` and never below one.
#[must_use]
pub fn max_allowed_duration(
    items: &[TimetableItem],
    day: u32,
    start_hour: u32,
    exclude: Option<&ItemId>,
    end_hour: u32,
) -> u32 {
    items
        .iter()
        .filter(|item| !is_excluded(item, exclude))
        .filter(|item| item.day == day && item.start_hour > start_hour)
        .map(|item| item.start_hour - start_hour)
        .fold(end_hour.saturating_sub(start_hour), u32::min)
        .max(1)
}

/// Find the first pair of items that overlap on the same day.
#[must_use]
pub fn find_overlap(items: &[TimetableItem]) -> Option<(&TimetableItem, &TimetableItem)> {
    items.iter().enumerate().find_map(|(i, first)| {
        items[i + 1..]
            .iter()
            .find(|second| {
                first.day == second.day
                    && intervals_overlap(
                        first.start_hour,
                        first.duration.max(1),
                        second.start_hour,
                        second.duration.max(1),
                    )
            })
            .map(|second| (first, second))
    })
}
