//! In-process stand-ins for the surface, the menu and the host.
//!
//! Animations land instantly and are reported as finished on the next
//! [`settle`]; the menu applies state changes the same way. Every call is
//! recorded so callers can see what the controller asked for.
//!
//! The live device loop and trace replay both drive a [`SimController`].
use std::time::Duration;

use crate::bounds;
use crate::config::InteractionSettings;
use crate::controller::InteractionController;
use crate::error::PipError;
use crate::geometry::{PointF, Rect};
use crate::host::{
    AccessibilityBounds, AnimationId, Host, HoverNotification, MenuController, MenuState,
    MotionApplier, TransitionDirection,
};
use crate::touch::PointerEvent;

/// How far ahead of the release point a fling is projected.
const FLING_PROJECTION_SECS: f32 = 0.1;

/// Default surface aspect ratio.
const DEFAULT_ASPECT_RATIO: f32 = 16.0 / 9.0;

/// Upper bound on menu/animation round trips per settle.
const MAX_SETTLE_ROUNDS: usize = 16;

pub type SimController = InteractionController<SimMotion, SimMenu, SimHost>;

// -- Surface --------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MotionCall {
    SetMovementBounds(Rect),
    SynchronizeBounds,
    MoveTo(Rect),
    AnimateToOffset {
        bounds: Rect,
        dy: i32,
        id: AnimationId,
    },
    AnimateToExpanded {
        target: Rect,
        id: AnimationId,
    },
    AnimateToUnexpanded {
        target: Rect,
        snap_fraction: Option<f32>,
        immediate: bool,
        id: AnimationId,
    },
    FlingToSnap {
        velocity: PointF,
        id: AnimationId,
    },
    StashToEdge {
        velocity: PointF,
        id: AnimationId,
    },
    ExpandLeave,
    Dismiss,
    StickToTarget(PointF),
    ReleaseFromTarget,
}

#[derive(Debug, Clone)]
pub struct SimMotion {
    bounds: Rect,
    movement: Rect,
    display: Rect,
    finished: Vec<AnimationId>,
    pub calls: Vec<MotionCall>,
}

impl SimMotion {
    pub fn new(bounds: Rect, display: Rect) -> Self {
        Self {
            bounds,
            movement: Rect::EMPTY,
            display,
            finished: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Animations that ran to completion since the last call.
    pub fn take_finished_animations(&mut self) -> Vec<AnimationId> {
        std::mem::take(&mut self.finished)
    }

    fn land(&mut self, bounds: Rect, id: AnimationId) {
        self.bounds = bounds;
        self.finished.push(id);
    }
}

impl MotionApplier for SimMotion {
    fn current_bounds(&self) -> Rect {
        self.bounds
    }

    fn set_movement_bounds(&mut self, movement: Rect) {
        self.movement = movement;
        self.calls.push(MotionCall::SetMovementBounds(movement));
    }

    fn synchronize_bounds(&mut self) {
        self.calls.push(MotionCall::SynchronizeBounds);
    }

    fn move_to(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.calls.push(MotionCall::MoveTo(bounds));
    }

    fn animate_to_offset(&mut self, bounds: Rect, dy: i32, id: AnimationId) {
        self.calls.push(MotionCall::AnimateToOffset { bounds, dy, id });
        self.land(bounds.offset(0, dy), id);
    }

    fn animate_to_expanded(
        &mut self,
        target: Rect,
        movement: Rect,
        expanded_movement: Rect,
        id: AnimationId,
    ) -> f32 {
        let fraction = bounds::snap_fraction(self.bounds, movement);
        self.calls.push(MotionCall::AnimateToExpanded { target, id });
        self.land(
            bounds::apply_snap_fraction(target, expanded_movement, fraction),
            id,
        );
        fraction
    }

    fn animate_to_unexpanded(
        &mut self,
        target: Rect,
        snap_fraction: Option<f32>,
        normal_movement: Rect,
        _current_movement: Rect,
        immediate: bool,
        id: AnimationId,
    ) {
        self.calls.push(MotionCall::AnimateToUnexpanded {
            target,
            snap_fraction,
            immediate,
            id,
        });
        let restored = match snap_fraction {
            Some(fraction) => bounds::apply_snap_fraction(target, normal_movement, fraction),
            None => bounds::snap_to_closest_edge(
                target.offset_to(self.bounds.left, self.bounds.top),
                normal_movement,
            ),
        };
        self.land(restored, id);
    }

    fn fling_to_snap(&mut self, velocity: PointF, id: AnimationId) {
        self.calls.push(MotionCall::FlingToSnap { velocity, id });
        let projected = self.bounds.offset(
            (velocity.x * FLING_PROJECTION_SECS) as i32,
            (velocity.y * FLING_PROJECTION_SECS) as i32,
        );
        let snapped = bounds::snap_to_closest_edge(projected, self.movement);
        self.land(snapped, id);
    }

    fn stash_to_edge(&mut self, velocity: PointF, id: AnimationId) {
        self.calls.push(MotionCall::StashToEdge { velocity, id });
        let half = self.bounds.width() / 2;
        let toward_left = velocity.x < 0.0 || self.bounds.left < self.display.left;
        let left = if toward_left {
            self.display.left - half
        } else {
            self.display.right - half
        };
        let top = self.bounds.top.clamp(self.movement.top, self.movement.bottom);
        self.land(self.bounds.offset_to(left, top), id);
    }

    fn expand_leave(&mut self) {
        self.calls.push(MotionCall::ExpandLeave);
    }

    fn dismiss(&mut self) {
        self.calls.push(MotionCall::Dismiss);
    }

    fn stick_to_target(&mut self, center: PointF) {
        self.calls.push(MotionCall::StickToTarget(center));
    }

    fn release_from_target(&mut self) {
        self.calls.push(MotionCall::ReleaseFromTarget);
    }
}

// -- Menu -----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MenuCall {
    Show {
        state: MenuState,
        allow_timeout: bool,
        will_resize: bool,
    },
    ShowWithDelay {
        state: MenuState,
        will_resize: bool,
    },
    Hide,
    Poke,
    Pointer(PointerEvent),
}

#[derive(Debug, Clone, Default)]
pub struct SimMenu {
    state: MenuState,
    state_changes: Vec<(MenuState, bool)>,
    pub calls: Vec<MenuCall>,
}

impl SimMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    /// `(state, resize)` pairs to report back to the controller.
    pub fn take_state_changes(&mut self) -> Vec<(MenuState, bool)> {
        std::mem::take(&mut self.state_changes)
    }

    fn transition(&mut self, state: MenuState, resize: bool) {
        // The compact menu has no hold-open here; it times out at once.
        if state == MenuState::Close {
            return;
        }
        if self.state != state {
            self.state = state;
            self.state_changes.push((state, resize));
        }
    }
}

impl MenuController for SimMenu {
    fn show(
        &mut self,
        state: MenuState,
        _bounds: Rect,
        allow_timeout: bool,
        will_resize: bool,
        _show_resize_handle: bool,
    ) {
        self.calls.push(MenuCall::Show {
            state,
            allow_timeout,
            will_resize,
        });
        self.transition(state, will_resize);
    }

    fn show_with_delay(
        &mut self,
        state: MenuState,
        _bounds: Rect,
        _allow_timeout: bool,
        will_resize: bool,
        _show_resize_handle: bool,
    ) {
        self.calls.push(MenuCall::ShowWithDelay { state, will_resize });
        self.transition(state, will_resize);
    }

    fn hide(&mut self) {
        self.calls.push(MenuCall::Hide);
        self.transition(MenuState::None, true);
    }

    fn poke(&mut self) {
        self.calls.push(MenuCall::Poke);
    }

    fn handle_pointer_event(&mut self, event: &PointerEvent) {
        self.calls.push(MenuCall::Pointer(*event));
    }
}

// -- Host -----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Hover(HoverNotification),
    ActionReplacing(bool),
    AccessibilityBounds(AccessibilityBounds),
    FadeDismissTarget { visible: bool, duration: Duration },
}

#[derive(Debug, Clone)]
pub struct SimHost {
    pub display: Rect,
    pub rotation: u32,
    /// Make rotation queries fail, as when the window service is gone.
    pub rotation_unavailable: bool,
    pub touch_exploration: bool,
    pub accessibility: bool,
    pub calls: Vec<HostCall>,
}

impl SimHost {
    pub fn new(display: Rect) -> Self {
        Self {
            display,
            rotation: 0,
            rotation_unavailable: false,
            touch_exploration: false,
            accessibility: true,
            calls: Vec::new(),
        }
    }
}

impl Host for SimHost {
    fn display_bounds(&self) -> Rect {
        self.display
    }

    fn display_rotation(&self) -> Result<u32, PipError> {
        if self.rotation_unavailable {
            return Err(PipError::HostUnavailable("display rotation".to_string()));
        }
        Ok(self.rotation)
    }

    fn is_touch_exploration_enabled(&self) -> bool {
        self.touch_exploration
    }

    fn is_accessibility_enabled(&self) -> bool {
        self.accessibility
    }

    fn send_hover_notification(&mut self, notification: HoverNotification) {
        self.calls.push(HostCall::Hover(notification));
    }

    fn set_action_replacing_connection(&mut self, registered: bool) {
        self.calls.push(HostCall::ActionReplacing(registered));
    }

    fn on_accessibility_bounds_changed(&mut self, bounds: AccessibilityBounds) {
        self.calls.push(HostCall::AccessibilityBounds(bounds));
    }

    fn fade_dismiss_target(&mut self, visible: bool, duration: Duration) {
        self.calls
            .push(HostCall::FadeDismissTarget { visible, duration });
    }
}

// -- Wiring ---------------------------------------------------

/// A 16:9 surface a quarter of the display's short side tall, in the
/// top-right corner.
pub fn default_surface(display: Rect) -> Rect {
    let short_side = display.width().min(display.height());
    let size = bounds::size_for_aspect_ratio(
        DEFAULT_ASPECT_RATIO,
        short_side / 4,
        display.width(),
        display.height(),
    );
    Rect::from_origin_size(display.right - size.width, display.top, size)
}

/// A controller over simulated collaborators with `surface` already pinned
/// and laid out on `display`.
pub fn pinned_controller(settings: InteractionSettings, display: Rect, surface: Rect) -> SimController {
    let mut controller = InteractionController::new(
        settings,
        SimMotion::new(surface, display),
        SimMenu::new(),
        SimHost::new(display),
    );
    controller.on_activity_pinned();
    let normal = surface.offset_to(0, 0);
    controller.on_movement_bounds_changed(display, normal, surface, false, false, 0);
    controller.on_pinned_animation_ended(TransitionDirection::ToPip);
    controller
}

/// Feed menu state changes and finished animations back into the controller
/// until nothing is left.
pub fn settle(controller: &mut SimController) {
    for _ in 0..MAX_SETTLE_ROUNDS {
        let changes = controller.menu_mut().take_state_changes();
        let finished = controller.motion_mut().take_finished_animations();
        if changes.is_empty() && finished.is_empty() {
            return;
        }
        for (state, resize) in changes {
            controller.on_menu_state_changed(state, resize);
        }
        for id in finished {
            controller.on_animation_finished(id);
        }
    }
}
