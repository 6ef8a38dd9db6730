//! Pixel geometry of the weekly grid.
//!
//! The grid container is laid out as a header row of day labels above a
//! left gutter of hour labels, with one column per weekday and one row per
//! hour of the display window. Pointer positions arrive in client
//! coordinates; rectangles for rendering are relative to the container.

use crate::config::{GridConfig, DAY_COUNT, DAY_LABELS};
use crate::item::TimetableItem;

/// Horizontal space reserved right of the last column.
const TRAILING_MARGIN: f64 = 12.0;

/// Smallest usable width shared between the day columns.
const MIN_USABLE_WIDTH: f64 = 200.0;

/// A pointer position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Check whether `point` lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }
}

/// A day/hour cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Weekday column, 0 (Monday) to 4 (Friday).
    pub day: u32,
    /// Hour row, inside the display window.
    pub hour: u32,
}

impl Cell {
    /// Create a cell.
    #[must_use]
    pub fn new(day: u32, hour: u32) -> Self {
        Self { day, hour }
    }
}

/// Maps between pointer pixels and grid cells for one container size.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    config: GridConfig,
    bounds: Rect,
    column_width: f64,
}

impl GridLayout {
    /// Create a layout for a container at the origin, `container_width` wide.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let width = config.container_width;
        let height = config.header_height + f64::from(config.hour_count()) * config.hour_height;
        Self::with_bounds(config, Rect::new(0.0, 0.0, width, height))
    }

    /// Create a layout for a container with the given client bounds.
    #[must_use]
    pub fn with_bounds(config: GridConfig, bounds: Rect) -> Self {
        let column_width = Self::column_width_for(&config, bounds.width);
        Self {
            config,
            bounds,
            column_width,
        }
    }

    /// Width of one day column for a container `container_width` wide.
    #[must_use]
    pub fn column_width_for(config: &GridConfig, container_width: f64) -> f64 {
        let usable = (container_width - config.gutter_left - TRAILING_MARGIN).max(MIN_USABLE_WIDTH);
        (usable / f64::from(DAY_COUNT)).max(config.min_column_width)
    }

    /// Update the container bounds after a move or resize.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.column_width = Self::column_width_for(&self.config, bounds.width);
        self.bounds = bounds;
    }

    /// The grid configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The container bounds in client coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Width of one day column.
    #[must_use]
    pub fn column_width(&self) -> f64 {
        self.column_width
    }

    /// Height of the hour rows, header excluded.
    #[must_use]
    pub fn grid_height(&self) -> f64 {
        f64::from(self.config.hour_count()) * self.config.hour_height
    }

    /// Height of the whole grid, header included.
    #[must_use]
    pub fn total_height(&self) -> f64 {
        self.grid_height() + self.config.header_height
    }

    /// Left edge of a day column, relative to the container.
    #[must_use]
    pub fn column_left(&self, day: u32) -> f64 {
        self.config.gutter_left + f64::from(day) * self.column_width
    }

    /// Top edge of an hour row, relative to the container.
    #[must_use]
    pub fn row_top(&self, hour: u32) -> f64 {
        let offset = f64::from(hour) - f64::from(self.config.start_hour);
        self.config.header_height + offset.max(0.0) * self.config.hour_height
    }

    /// Convert a client point to container-relative coordinates.
    #[must_use]
    pub fn to_local(&self, point: Point) -> Point {
        Point::new(point.x - self.bounds.left, point.y - self.bounds.top)
    }

    /// Convert a container-relative point to client coordinates.
    #[must_use]
    pub fn to_client(&self, point: Point) -> Point {
        Point::new(point.x + self.bounds.left, point.y + self.bounds.top)
    }

    /// Map a client point to the nearest valid cell.
    ///
    /// Points outside the grid are clamped, never rejected.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_at(&self, point: Point) -> Cell {
        let local = self.to_local(point);
        let rel_x = local.x - self.config.gutter_left;
        let rel_y = local.y - self.config.header_height;

        let last_day = f64::from(DAY_COUNT - 1);
        let last_row = f64::from(self.config.hour_count().saturating_sub(1));

        // NaN clamps to NaN and casts to 0, the first column/row
        let day = (rel_x / self.column_width).floor().clamp(0.0, last_day) as u32;
        let row = (rel_y / self.config.hour_height).floor().clamp(0.0, last_row) as u32;

        Cell::new(day, self.config.start_hour + row)
    }

    /// Rectangle of a cell, relative to the container.
    #[must_use]
    pub fn cell_rect(&self, cell: Cell) -> Rect {
        Rect::new(
            self.column_left(cell.day),
            self.row_top(cell.hour),
            self.column_width,
            self.config.hour_height,
        )
    }

    /// Center of a cell in client coordinates.
    #[must_use]
    pub fn cell_center(&self, cell: Cell) -> Point {
        self.to_client(self.cell_rect(cell).center())
    }

    /// Rectangle an item is rendered in, relative to the container.
    #[must_use]
    pub fn item_rect(&self, item: &TimetableItem) -> Rect {
        let height =
            f64::from(item.duration.max(1)) * self.config.hour_height - self.config.item_gap;
        Rect::new(
            self.column_left(item.day) + self.config.item_inset,
            self.row_top(item.start_hour),
            (self.column_width - 2.0 * self.config.item_inset).max(self.config.min_item_width),
            height.max(1.0),
        )
    }

    /// Check whether a client point falls in the item's bottom resize band.
    #[must_use]
    pub fn in_resize_zone(&self, item: &TimetableItem, point: Point) -> bool {
        let local = self.to_local(point);
        let rect = self.item_rect(item);
        local.y >= rect.bottom() - self.config.resize_zone && local.y <= rect.bottom()
    }

    /// Duration that would make the item's bottom edge reach `point`.
    ///
    /// Whole hours, rounded up; zero when the point is above the item.
    /// Callers clamp the result to the allowed range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_at(&self, item: &TimetableItem, point: Point) -> u32 {
        let local = self.to_local(point);
        let delta = local.y - self.row_top(item.start_hour);
        // Saturating cast keeps huge deltas at u32::MAX
        (delta / self.config.hour_height).ceil().max(0.0) as u32
    }

    /// Labels of the hour rows, e.g. `9:00`.
    #[must_use]
    pub fn hour_labels(&self) -> Vec<String> {
        (self.config.start_hour..self.config.end_hour)
            .map(|hour| format!("{hour}:00"))
            .collect()
    }

    /// Labels of the day columns.
    #[must_use]
    pub fn day_labels(&self) -> &'static [&'static str] {
        &DAY_LABELS
    }
}
