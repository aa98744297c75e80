//! Capabilities the controller consumes but does not own: moving and
//! animating the surface, the overlay menu, and host-side queries and
//! notifications.
use std::fmt;
use std::time::Duration;

use strum::{Display, EnumString, IntoStaticStr};

use crate::error::PipError;
use crate::geometry::{PointF, Rect};
use crate::touch::PointerEvent;

/// Visibility of the overlay menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr)]
pub enum MenuState {
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "close")]
    Close,
    #[strum(serialize = "full")]
    Full,
}

/// Identifies an animation started by the controller. Completion is reported
/// back with [`crate::controller::InteractionController::on_animation_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which way a pinned-surface transition went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransitionDirection {
    #[strum(serialize = "to_pip")]
    ToPip,
    #[strum(serialize = "leave_pip")]
    LeavePip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HoverNotification {
    #[strum(serialize = "hover_enter")]
    Enter,
    #[strum(serialize = "hover_exit")]
    Exit,
}

/// Geometry handed to the accessibility action-replacing connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessibilityBounds {
    pub normal: Rect,
    pub expanded: Rect,
    pub normal_movement: Rect,
    pub expanded_movement: Rect,
}

/// Moves and animates the floating surface.
///
/// Animations run on their own clock. Implementations report completion
/// through the controller with the `id` they were started with; starting a
/// new animation retargets whatever was running.
pub trait MotionApplier {
    fn current_bounds(&self) -> Rect;

    /// Bounds the surface is heading to if an animation is running.
    fn possibly_animating_bounds(&self) -> Rect {
        self.current_bounds()
    }

    fn set_movement_bounds(&mut self, movement: Rect);

    /// Re-read bounds from the window system after it moved the surface.
    fn synchronize_bounds(&mut self) {}

    fn move_to(&mut self, bounds: Rect);

    fn animate_to_offset(&mut self, bounds: Rect, dy: i32, id: AnimationId);

    /// Returns the snap fraction of the surface before expanding.
    fn animate_to_expanded(
        &mut self,
        target: Rect,
        movement: Rect,
        expanded_movement: Rect,
        id: AnimationId,
    ) -> f32;

    /// Without a snap fraction the surface snaps to the nearest edge.
    fn animate_to_unexpanded(
        &mut self,
        target: Rect,
        snap_fraction: Option<f32>,
        normal_movement: Rect,
        current_movement: Rect,
        immediate: bool,
        id: AnimationId,
    );

    fn fling_to_snap(&mut self, velocity: PointF, id: AnimationId);

    fn stash_to_edge(&mut self, velocity: PointF, id: AnimationId);

    /// Leave the floating mode and go full screen.
    fn expand_leave(&mut self);

    fn dismiss(&mut self);

    /// Pull the surface onto the magnetic dismiss target.
    fn stick_to_target(&mut self, center: PointF);

    fn release_from_target(&mut self);
}

/// The overlay menu shown on top of the surface.
pub trait MenuController {
    fn show(
        &mut self,
        state: MenuState,
        bounds: Rect,
        allow_timeout: bool,
        will_resize: bool,
        show_resize_handle: bool,
    );

    fn show_with_delay(
        &mut self,
        state: MenuState,
        bounds: Rect,
        allow_timeout: bool,
        will_resize: bool,
        show_resize_handle: bool,
    ) {
        self.show(state, bounds, allow_timeout, will_resize, show_resize_handle);
    }

    fn hide(&mut self);

    /// Restart the menu's auto-hide timer.
    fn poke(&mut self);

    fn handle_pointer_event(&mut self, event: &PointerEvent);
}

/// Host queries and notifications.
pub trait Host {
    fn display_bounds(&self) -> Rect;

    fn display_rotation(&self) -> Result<u32, PipError>;

    fn is_touch_exploration_enabled(&self) -> bool;

    fn is_accessibility_enabled(&self) -> bool;

    fn send_hover_notification(&mut self, notification: HoverNotification);

    fn set_action_replacing_connection(&mut self, registered: bool);

    fn on_accessibility_bounds_changed(&mut self, bounds: AccessibilityBounds);

    /// Fade the dismiss target's affordance in or out.
    fn fade_dismiss_target(&mut self, visible: bool, duration: Duration);
}
