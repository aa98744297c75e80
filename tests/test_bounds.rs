//! Tests for `pipgestr::bounds` - movement bounds, aspect-ratio sizing and
//! snap fractions.
use pipgestr::bounds::{
    apply_snap_fraction, is_vertically_occluded, movement_bounds, size_for_aspect_ratio,
    snap_fraction, snap_to_closest_edge,
};
use pipgestr::geometry::{Rect, Size};

// -- Helpers --------------------------------------------------

fn display() -> Rect {
    Rect::new(0, 0, 1080, 1920)
}

/// 480x270 surface.
fn surface_at(left: i32, top: i32) -> Rect {
    Rect::from_origin_size(left, top, Size::new(480, 270))
}

/// Movement bounds of a 480x270 surface on the full display.
fn movement() -> Rect {
    Rect::new(0, 0, 600, 1650)
}

// -- movement_bounds ------------------------------------------

#[test]
fn test_movement_bounds_full_display() {
    assert_eq!(movement_bounds(surface_at(100, 400), display(), 0), movement());
}

#[test]
fn test_movement_bounds_ignores_surface_position() {
    assert_eq!(
        movement_bounds(surface_at(100, 400), display(), 0),
        movement_bounds(surface_at(7, 1200), display(), 0)
    );
}

#[test]
fn test_movement_bounds_is_pure() {
    let first = movement_bounds(surface_at(0, 0), display(), 600);
    let second = movement_bounds(surface_at(0, 0), display(), 600);
    assert_eq!(first, second);
}

#[test]
fn test_movement_bounds_bottom_offset() {
    let bounds = movement_bounds(surface_at(0, 0), display(), 600);
    assert_eq!(bounds, Rect::new(0, 0, 600, 1050));
}

#[test]
fn test_movement_bounds_respects_insets() {
    let insets = Rect::new(24, 80, 1056, 1800);
    let bounds = movement_bounds(surface_at(0, 0), insets, 0);
    assert_eq!(bounds, Rect::new(24, 80, 576, 1530));
}

#[test]
fn test_movement_bounds_never_inverts() {
    let bounds = movement_bounds(surface_at(0, 0), display(), 5000);
    assert_eq!(bounds.top, 0);
    assert_eq!(bounds.bottom, 0);
    assert!(is_vertically_occluded(surface_at(0, 0), display(), 5000));
}

#[test]
fn test_not_occluded_by_regular_ime() {
    assert!(!is_vertically_occluded(surface_at(0, 0), display(), 600));
}

#[test]
fn test_surface_wider_than_insets() {
    let wide = Rect::from_origin_size(0, 0, Size::new(2000, 100));
    let bounds = movement_bounds(wide, display(), 0);
    assert_eq!(bounds.left, 0);
    assert_eq!(bounds.right, 0);
}

// -- size_for_aspect_ratio ------------------------------------

#[test]
fn test_size_landscape_ratio() {
    assert_eq!(
        size_for_aspect_ratio(16.0 / 9.0, 540, 1080, 1920),
        Size::new(960, 540)
    );
}

#[test]
fn test_size_portrait_ratio() {
    assert_eq!(
        size_for_aspect_ratio(9.0 / 16.0, 540, 1080, 1920),
        Size::new(540, 960)
    );
}

#[test]
fn test_size_scaled_down_to_fit_display() {
    assert_eq!(
        size_for_aspect_ratio(2.0, 1000, 1080, 1920),
        Size::new(1080, 540)
    );
}

#[test]
fn test_size_invalid_ratio_is_square() {
    assert_eq!(size_for_aspect_ratio(0.0, 300, 1080, 1920), Size::new(300, 300));
    assert_eq!(
        size_for_aspect_ratio(f32::NAN, 300, 1080, 1920),
        Size::new(300, 300)
    );
}

#[test]
fn test_size_small_edge_grows_to_display_share() {
    // 23% of 1080
    assert_eq!(size_for_aspect_ratio(1.0, 100, 1080, 1920), Size::new(248, 248));
    assert_eq!(
        size_for_aspect_ratio(16.0 / 9.0, 100, 1080, 1920),
        Size::new(441, 248)
    );
}

// -- snap_to_closest_edge -------------------------------------

#[test]
fn test_snap_to_left_edge() {
    assert_eq!(
        snap_to_closest_edge(surface_at(50, 800), movement()),
        surface_at(0, 800)
    );
}

#[test]
fn test_snap_to_right_edge() {
    assert_eq!(
        snap_to_closest_edge(surface_at(560, 800), movement()),
        surface_at(600, 800)
    );
}

#[test]
fn test_snap_to_bottom_clamps_outside_position() {
    assert_eq!(
        snap_to_closest_edge(surface_at(300, 1700), movement()),
        surface_at(300, 1650)
    );
}

// -- snap fractions -------------------------------------------

#[test]
fn test_snap_fraction_per_edge() {
    assert_eq!(snap_fraction(surface_at(300, 0), movement()), 0.5);
    assert_eq!(snap_fraction(surface_at(600, 825), movement()), 1.5);
    assert_eq!(snap_fraction(surface_at(150, 1650), movement()), 2.75);
    assert_eq!(snap_fraction(surface_at(0, 825), movement()), 3.5);
}

#[test]
fn test_apply_snap_fraction_per_edge() {
    let surface = surface_at(0, 0);
    assert_eq!(apply_snap_fraction(surface, movement(), 0.5), surface_at(300, 0));
    assert_eq!(apply_snap_fraction(surface, movement(), 1.5), surface_at(600, 825));
    assert_eq!(apply_snap_fraction(surface, movement(), 2.75), surface_at(150, 1650));
    assert_eq!(apply_snap_fraction(surface, movement(), 3.5), surface_at(0, 825));
}

#[test]
fn test_apply_snap_fraction_wraps() {
    let surface = surface_at(0, 0);
    assert_eq!(
        apply_snap_fraction(surface, movement(), 5.5),
        apply_snap_fraction(surface, movement(), 1.5)
    );
    assert_eq!(
        apply_snap_fraction(surface, movement(), -0.5),
        apply_snap_fraction(surface, movement(), 3.5)
    );
}

#[test]
fn test_snap_fraction_carries_position_across_sizes() {
    // Right edge, a third of the way down, lands a third down on the larger surface's right edge.
    let small = surface_at(600, 550);
    let fraction = snap_fraction(small, movement());
    let large = Rect::from_origin_size(0, 0, Size::new(960, 540));
    let large_movement = movement_bounds(large, display(), 0);
    let placed = apply_snap_fraction(large, large_movement, fraction);
    assert_eq!(placed.left, large_movement.right);
    assert_eq!(placed.top, (large_movement.height() as f32 / 3.0).round() as i32);
}
