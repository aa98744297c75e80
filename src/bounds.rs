//! Pure geometry for the floating surface: movement bounds, target sizes and
//! the snap-fraction mapping around the movement-bounds perimeter.
//!
//! Nothing here holds state. Every function returns a fresh value, so calling
//! one twice with the same inputs yields the same rectangle.
//!
//! Snap fractions run clockwise from the top-left corner of the movement
//! bounds, one unit per edge:
//!
//! ```text
//!   0 ────────── 1
//!   │            │
//!   4(=0)        │
//!   │            │
//!   3 ────────── 2
//! ```

use crate::geometry::{Rect, Size};

/// The legal range of the surface's top-left corner inside `insets`, with
/// `bottom_offset` pixels taken away at the bottom (IME or shelf).
///
/// The result never inverts: when the surface no longer fits, the range
/// collapses onto the inset's top/left edge.
pub fn movement_bounds(surface: Rect, insets: Rect, bottom_offset: i32) -> Rect {
    let right = (insets.right - surface.width()).max(insets.left);
    let bottom = (insets.bottom - surface.height()).max(insets.top) - bottom_offset;
    Rect::new(insets.left, insets.top, right, bottom.max(insets.top))
}

/// Whether `bottom_offset` eats the whole vertical range, as with a
/// landscape fullscreen IME.
pub fn is_vertically_occluded(surface: Rect, insets: Rect, bottom_offset: i32) -> bool {
    (insets.bottom - surface.height()).max(insets.top) - bottom_offset < insets.top
}

/// Share of the display's shorter side that a surface edge never goes below.
const DEFAULT_SIZE_PERCENT: f64 = 0.23;

/// Size with the given aspect ratio whose shorter edge is `min_edge`, or
/// [`DEFAULT_SIZE_PERCENT`] of the display's shorter side if that is larger.
/// Scaled down uniformly if it would not fit on the display.
pub fn size_for_aspect_ratio(
    aspect_ratio: f32,
    min_edge: i32,
    display_width: i32,
    display_height: i32,
) -> Size {
    let ratio = f64::from(aspect_ratio);
    let display_edge = f64::from(display_width.min(display_height).max(0)) * DEFAULT_SIZE_PERCENT;
    let edge = f64::from(min_edge.max(1)).max(display_edge.floor());
    let (width, height) = if !ratio.is_finite() || ratio <= 0.0 {
        (edge, edge)
    } else if ratio <= 1.0 {
        (edge, edge / ratio)
    } else {
        (edge * ratio, edge)
    };

    let scale = (f64::from(display_width) / width)
        .min(f64::from(display_height) / height)
        .min(1.0)
        .max(0.0);
    Size::new(
        (width * scale).round() as i32,
        (height * scale).round() as i32,
    )
}

/// Move `bounds` onto the nearest edge of `movement`, clamping the other axis.
pub fn snap_to_closest_edge(bounds: Rect, movement: Rect) -> Rect {
    let bounded_left = bounds.left.clamp(movement.left, movement.right);
    let bounded_top = bounds.top.clamp(movement.top, movement.bottom);

    let from_left = (bounds.left - movement.left).abs();
    let from_top = (bounds.top - movement.top).abs();
    let from_right = (movement.right - bounds.left).abs();
    let from_bottom = (movement.bottom - bounds.top).abs();
    let shortest = from_left.min(from_right).min(from_top.min(from_bottom));

    if shortest == from_left {
        bounds.offset_to(movement.left, bounded_top)
    } else if shortest == from_top {
        bounds.offset_to(bounded_left, movement.top)
    } else if shortest == from_right {
        bounds.offset_to(movement.right, bounded_top)
    } else {
        bounds.offset_to(bounded_left, movement.bottom)
    }
}

/// Snap fraction in `[0, 4)` for `bounds` after snapping it to the closest
/// edge of `movement`.
pub fn snap_fraction(bounds: Rect, movement: Rect) -> f32 {
    let snapped = snap_to_closest_edge(bounds, movement);
    let width_fraction = ratio(snapped.left - movement.left, movement.width());
    let height_fraction = ratio(snapped.top - movement.top, movement.height());

    if snapped.top == movement.top {
        width_fraction
    } else if snapped.left == movement.right {
        1.0 + height_fraction
    } else if snapped.top == movement.bottom {
        2.0 + (1.0 - width_fraction)
    } else {
        3.0 + (1.0 - height_fraction)
    }
}

/// Place `bounds` on the perimeter of `movement` at `fraction`.
///
/// Fractions outside `[0, 4)` wrap around.
pub fn apply_snap_fraction(bounds: Rect, movement: Rect, fraction: f32) -> Rect {
    let fraction = fraction.rem_euclid(4.0);
    let width = movement.width() as f32;
    let height = movement.height() as f32;

    if fraction < 1.0 {
        let left = movement.left + (fraction * width).round() as i32;
        bounds.offset_to(left, movement.top)
    } else if fraction < 2.0 {
        let top = movement.top + ((fraction - 1.0) * height).round() as i32;
        bounds.offset_to(movement.right, top)
    } else if fraction < 3.0 {
        let left = movement.left + ((1.0 - (fraction - 2.0)) * width).round() as i32;
        bounds.offset_to(left, movement.bottom)
    } else {
        let top = movement.top + ((1.0 - (fraction - 3.0)) * height).round() as i32;
        bounds.offset_to(movement.left, top)
    }
}

fn ratio(offset: i32, span: i32) -> f32 {
    if span == 0 {
        0.0
    } else {
        offset as f32 / span as f32
    }
}
