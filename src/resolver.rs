//! Turns touch-session transitions into high-level gestures.
//!
//! The resolver only decides. Each call returns a [`GestureResult`] that the
//! controller dispatches to its collaborators.
use log::debug;
use strum::{Display, IntoStaticStr};

use crate::geometry::{Point, PointF, Rect};
use crate::host::MenuState;
use crate::touch::{PointerEvent, PointerPhase, TouchState};

/// Outcome of feeding one event to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Display, IntoStaticStr)]
pub enum GestureResult {
    #[strum(serialize = "none")]
    None,
    /// The surface follows the pointer. `started` marks the first drag move.
    #[strum(serialize = "moved")]
    Moved { bounds: Rect, started: bool },
    #[strum(serialize = "flung")]
    Flung { velocity: PointF, hide_menu_after: bool },
    #[strum(serialize = "stashed")]
    Stashed { velocity: PointF, hide_menu_after: bool },
    /// Double-tap grew the surface to its expanded size.
    #[strum(serialize = "expanded")]
    Expanded,
    /// Double-tap shrank the surface back to its normal size.
    #[strum(serialize = "collapsed")]
    Collapsed,
    /// Double-tap left floating mode for full screen.
    #[strum(serialize = "fullscreen")]
    Fullscreen,
    #[strum(serialize = "menu_opened")]
    MenuOpened { from_hover: bool },
    /// A tap that may still become a double-tap; the menu waits for the timeout.
    #[strum(serialize = "double_tap_armed")]
    DoubleTapArmed,
    #[strum(serialize = "dismissed")]
    Dismissed,
}

/// Snapshot of controller state the resolver decides against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFrame {
    pub menu_state: MenuState,
    /// Current, possibly still animating, surface bounds.
    pub bounds: Rect,
    pub movement_bounds: Rect,
    pub display_bounds: Rect,
    pub expanded_bounds: Rect,
    pub enable_stash: bool,
    pub pinch_to_zoom: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GestureResolver {
    start_position: Point,
    delta: PointF,
    movement_within_dismiss: bool,
}

impl GestureResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the drag began, and so far stayed, below the movement bounds.
    pub fn is_movement_within_dismiss(&self) -> bool {
        self.movement_within_dismiss
    }

    /// Capture the drag origin. Returns whether the visible menu needs a poke.
    pub fn on_down(&mut self, touch: &TouchState, frame: &GestureFrame) -> bool {
        if !touch.is_user_interacting() {
            return false;
        }
        self.start_position = Point::new(frame.bounds.left, frame.bounds.top);
        self.delta = PointF::ZERO;
        self.movement_within_dismiss =
            touch.down_touch_position().y >= frame.movement_bounds.bottom as f32;
        frame.menu_state != MenuState::None
    }

    /// `GestureResult::None` means the move was not handled here.
    pub fn on_move(&mut self, touch: &TouchState, frame: &GestureFrame) -> GestureResult {
        if !touch.is_user_interacting() || !touch.is_dragging() {
            return GestureResult::None;
        }

        // Integrate into origin + cumulative delta rather than chaining raw
        // event deltas onto the last applied position.
        let last_delta = touch.last_touch_delta();
        let last_x = self.start_position.x as f32 + self.delta.x;
        let last_y = self.start_position.y as f32 + self.delta.y;
        let left = last_x + last_delta.x;
        let top = last_y + last_delta.y;
        self.delta.x += left - last_x;
        self.delta.y += top - last_y;

        if self.movement_within_dismiss {
            self.movement_within_dismiss =
                touch.last_touch_position().y >= frame.movement_bounds.bottom as f32;
        }

        GestureResult::Moved {
            bounds: frame.bounds.offset_to(left as i32, top as i32),
            started: touch.started_dragging(),
        }
    }

    /// `None` means the session was not live and the caller should clean up.
    pub fn on_up(&mut self, touch: &mut TouchState, frame: &GestureFrame) -> Option<GestureResult> {
        if !touch.is_user_interacting() {
            return None;
        }

        let result = if touch.is_dragging() {
            let velocity = touch.velocity();
            let hide_menu_after = frame.menu_state == MenuState::None;
            // The session ends here, before the fling settles.
            touch.reset();

            let bounds = frame.bounds;
            let display = frame.display_bounds;
            if frame.enable_stash && (bounds.right > display.right || bounds.left < display.left) {
                GestureResult::Stashed {
                    velocity,
                    hide_menu_after,
                }
            } else {
                GestureResult::Flung {
                    velocity,
                    hide_menu_after,
                }
            }
        } else if touch.is_double_tap() {
            if frame.pinch_to_zoom {
                let to_expand = frame.bounds.width() < frame.expanded_bounds.width()
                    && frame.bounds.height() < frame.expanded_bounds.height();
                if to_expand {
                    GestureResult::Expanded
                } else {
                    GestureResult::Collapsed
                }
            } else {
                GestureResult::Fullscreen
            }
        } else if frame.menu_state != MenuState::Full {
            if touch.is_waiting_for_double_tap() {
                // A second tap may still come; open the menu from the timeout.
                touch.schedule_double_tap_timeout_callback();
                GestureResult::DoubleTapArmed
            } else {
                GestureResult::MenuOpened { from_hover: false }
            }
        } else {
            GestureResult::None
        };

        debug!("Pointer up resolved as {result}");
        Some(result)
    }

    /// Hover opens the menu on enter and arms a close timer on exit, unless
    /// touch exploration turns touches into hovers.
    pub fn on_hover(
        &mut self,
        touch: &mut TouchState,
        event: &PointerEvent,
        touch_exploration: bool,
    ) -> GestureResult {
        if touch_exploration {
            return GestureResult::None;
        }
        match event.phase {
            PointerPhase::HoverEnter => {
                touch.remove_hover_exit_timeout_callback();
                GestureResult::MenuOpened { from_hover: true }
            }
            PointerPhase::HoverExit => {
                touch.schedule_hover_exit_timeout_callback(event.time());
                GestureResult::None
            }
            _ => GestureResult::None,
        }
    }
}
