//! Selection geometry - drag handling and display-to-source coordinate mapping
//!
//! Pure coordinate math for the crop overlay: pointer drags normalize into
//! rectangles, and viewport rectangles map onto source pixels for extraction.

use serde::{Deserialize, Serialize};

/// A point in viewport pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in viewport pixel space.
///
/// Width and height are non-negative by construction. A rectangle with zero
/// width or height is the null selection, meaning "use the whole image."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Build a normalized rectangle from two opposite corners.
    ///
    /// Users drag in any direction; min/abs keeps the dimensions positive.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// True when this is the null selection (zero area).
    pub fn is_null(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Display-to-source scale factors, derived from the natural vs. rendered
/// dimensions of the loaded image.
///
/// Recomputed whenever the underlying image changes; never cached across
/// images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    /// Derive scale factors from source (natural) and display (rendered)
    /// dimensions. Returns `None` when the display dimensions are not
    /// positive, since no meaningful mapping exists.
    pub fn from_dimensions(
        source_width: u32,
        source_height: u32,
        display_width: f64,
        display_height: f64,
    ) -> Option<Self> {
        if display_width <= 0.0 || display_height <= 0.0 {
            return None;
        }
        Some(Self {
            x: source_width as f64 / display_width,
            y: source_height as f64 / display_height,
        })
    }
}

/// A pixel rectangle in source image space, ready for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a viewport rectangle into source pixel space.
///
/// The result is clamped to the source bounds so accumulated floating error
/// can never produce a rectangle that reads outside the image.
pub fn resolve_source_rect(
    rect: Rect,
    scale: ScaleFactor,
    source_width: u32,
    source_height: u32,
) -> SourceRect {
    let x = ((rect.x * scale.x).round().max(0.0) as u32).min(source_width);
    let y = ((rect.y * scale.y).round().max(0.0) as u32).min(source_height);
    let width = ((rect.width * scale.x).round().max(0.0) as u32).min(source_width - x);
    let height = ((rect.height * scale.y).round().max(0.0) as u32).min(source_height - y);
    SourceRect {
        x,
        y,
        width,
        height,
    }
}

/// Drag state for the crop selection overlay.
///
/// Mirrors the pointer lifecycle: `begin_drag` anchors the origin, `drag_to`
/// follows the pointer, `end_drag` freezes the rectangle, and `clear` starts
/// over without leaving the selection screen.
#[derive(Debug, Default)]
pub struct SelectionState {
    origin: Option<Point>,
    rect: Option<Rect>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag. Emits the zero-area rectangle anchored at the origin.
    pub fn begin_drag(&mut self, origin: Point) -> Rect {
        let rect = Rect::from_corners(origin, origin);
        self.origin = Some(origin);
        self.rect = Some(rect);
        rect
    }

    /// Track the pointer during a drag. No-op while no drag is active.
    pub fn drag_to(&mut self, current: Point) -> Option<Rect> {
        let origin = self.origin?;
        let rect = Rect::from_corners(origin, current);
        self.rect = Some(rect);
        Some(rect)
    }

    /// Freeze the current rectangle; the drag is inactive afterwards.
    pub fn end_drag(&mut self) -> Option<Rect> {
        self.origin = None;
        self.rect
    }

    /// Discard the current rectangle ("reselect").
    pub fn clear(&mut self) {
        self.origin = None;
        self.rect = None;
    }

    /// The current selection rectangle, if any.
    pub fn current(&self) -> Option<Rect> {
        self.rect
    }

    /// True while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_normalizes_any_direction() {
        let mut selection = SelectionState::new();
        let anchored = selection.begin_drag(Point::new(10.0, 20.0));
        assert!(anchored.is_null());
        assert_eq!(anchored.x, 10.0);
        assert_eq!(anchored.y, 20.0);

        // Drag up and to the left: origin becomes the bottom-right corner.
        let rect = selection.drag_to(Point::new(4.0, 8.0)).unwrap();
        assert_eq!(rect.x, 4.0);
        assert_eq!(rect.y, 8.0);
        assert_eq!(rect.width, 6.0);
        assert_eq!(rect.height, 12.0);

        // Drag past the origin to the other side.
        let rect = selection.drag_to(Point::new(25.0, 11.0)).unwrap();
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 11.0);
        assert_eq!(rect.width, 15.0);
        assert_eq!(rect.height, 9.0);
        assert!(rect.width >= 0.0 && rect.height >= 0.0);
    }

    #[test]
    fn test_drag_without_begin_is_noop() {
        let mut selection = SelectionState::new();
        assert!(selection.drag_to(Point::new(5.0, 5.0)).is_none());
        assert!(selection.current().is_none());
    }

    #[test]
    fn test_end_drag_freezes_rect() {
        let mut selection = SelectionState::new();
        selection.begin_drag(Point::new(0.0, 0.0));
        selection.drag_to(Point::new(10.0, 10.0));
        let frozen = selection.end_drag().unwrap();
        assert!(!selection.is_dragging());
        // Further pointer movement no longer changes the rectangle.
        assert!(selection.drag_to(Point::new(50.0, 50.0)).is_none());
        assert_eq!(selection.current(), Some(frozen));
    }

    #[test]
    fn test_clear_is_reselect() {
        let mut selection = SelectionState::new();
        selection.begin_drag(Point::new(0.0, 0.0));
        selection.drag_to(Point::new(10.0, 10.0));
        selection.end_drag();
        selection.clear();
        assert!(selection.current().is_none());
    }

    #[test]
    fn test_resolve_scales_linearly() {
        let rect = Rect {
            x: 4.0,
            y: 6.0,
            width: 10.0,
            height: 8.0,
        };
        let scale = ScaleFactor { x: 2.0, y: 2.0 };
        let direct = resolve_source_rect(rect, scale, 400, 300);

        // Scaling the rectangle by k and the factors by 1/k is the identity.
        let k = 4.0;
        let scaled_rect = Rect {
            x: rect.x * k,
            y: rect.y * k,
            width: rect.width * k,
            height: rect.height * k,
        };
        let scaled_factor = ScaleFactor {
            x: scale.x / k,
            y: scale.y / k,
        };
        let indirect = resolve_source_rect(scaled_rect, scaled_factor, 400, 300);
        assert_eq!(direct, indirect);
        assert_eq!(
            direct,
            SourceRect {
                x: 8,
                y: 12,
                width: 20,
                height: 16
            }
        );
    }

    #[test]
    fn test_resolve_clamps_to_source_bounds() {
        let rect = Rect {
            x: 90.0,
            y: 90.0,
            width: 30.0,
            height: 30.0,
        };
        let scale = ScaleFactor { x: 1.0, y: 1.0 };
        let resolved = resolve_source_rect(rect, scale, 100, 100);
        assert_eq!(resolved.x, 90);
        assert_eq!(resolved.y, 90);
        assert_eq!(resolved.width, 10);
        assert_eq!(resolved.height, 10);
    }

    #[test]
    fn test_scale_factor_rejects_degenerate_display() {
        assert!(ScaleFactor::from_dimensions(800, 600, 0.0, 300.0).is_none());
        assert!(ScaleFactor::from_dimensions(800, 600, 400.0, -1.0).is_none());
        let scale = ScaleFactor::from_dimensions(800, 600, 400.0, 300.0).unwrap();
        assert_eq!(scale.x, 2.0);
        assert_eq!(scale.y, 2.0);
    }
}
