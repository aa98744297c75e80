//! The interaction controller: owns the touch session, the gesture resolver
//! and the dismiss zone, keeps the menu state and the current geometry
//! snapshot, and drives the collaborators.
//!
//! Everything runs on one serialized queue. Pointer events, timer ticks,
//! animation completions and host notifications are all plain method calls.
use std::fmt::Write as _;

use log::{debug, error, info, warn};
use strum::Display;

use crate::bounds;
use crate::config::InteractionSettings;
use crate::dismiss::{DismissZoneHandler, ZoneDecision};
use crate::geometry::Rect;
use crate::host::{
    AccessibilityBounds, AnimationId, Host, HoverNotification, MenuController, MenuState,
    MotionApplier, TransitionDirection,
};
use crate::resolver::{GestureFrame, GestureResolver, GestureResult};
use crate::scheduler::{Nanos, TimerEvent};
use crate::touch::{PointerEvent, PointerPhase, TouchState, TouchThresholds};

// -- Geometry snapshot ----------------------------------------

/// Derived rectangles. Replaced as a whole whenever an input changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometrySnapshot {
    pub insets: Rect,
    pub normal: Rect,
    pub normal_movement: Rect,
    pub expanded: Rect,
    pub expanded_movement: Rect,
    /// Movement bounds for the surface's current size.
    pub movement: Rect,
}

/// Something eating into the bottom of the screen: IME or shelf.
#[derive(Debug, Clone, Copy, Default)]
struct Occluder {
    visible: bool,
    height: i32,
}

// -- Primary animation tracking -------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AnimationKind {
    #[strum(serialize = "offset")]
    Offset,
    #[strum(serialize = "expand")]
    Expand,
    #[strum(serialize = "unexpand")]
    Unexpand,
    #[strum(serialize = "fling")]
    Fling,
    #[strum(serialize = "stash")]
    Stash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndAction {
    HideMenu,
}

#[derive(Debug, Clone, Copy)]
struct PrimaryAnimation {
    id: AnimationId,
    kind: AnimationKind,
    end_action: Option<EndAction>,
}

/// At most one primary animation is live; starting one supersedes the last.
#[derive(Debug, Default)]
struct AnimationTracker {
    next_id: u64,
    current: Option<PrimaryAnimation>,
}

impl AnimationTracker {
    fn start(&mut self, kind: AnimationKind, end_action: Option<EndAction>) -> AnimationId {
        self.next_id += 1;
        let id = AnimationId(self.next_id);
        let started = PrimaryAnimation {
            id,
            kind,
            end_action,
        };
        if let Some(previous) = self.current.replace(started) {
            debug!(
                "{} animation {} superseded by {kind} {id}",
                previous.kind, previous.id
            );
        }
        id
    }

    fn finish(&mut self, id: AnimationId) -> Option<PrimaryAnimation> {
        self.current.take_if(|animation| animation.id == id)
    }
}

// -- InteractionController ------------------------------------

pub struct InteractionController<M, U, H> {
    motion: M,
    menu: U,
    host: H,
    settings: InteractionSettings,

    touch: TouchState,
    resolver: GestureResolver,
    dismiss: DismissZoneHandler,
    animations: AnimationTracker,

    geometry: GeometrySnapshot,
    menu_state: MenuState,
    ime: Occluder,
    shelf: Occluder,
    movement_extra_offsets: i32,
    /// Movement bounds from before the IME or shelf changed, until the host
    /// relays out.
    movement_before_occlusion: Option<Rect>,
    saved_snap_fraction: Option<f32>,
    display_rotation: u32,
    /// Rotation an unexpand animation waits for before replaying.
    deferred_unexpand_rotation: Option<u32>,
    user_resize_bounds: Rect,

    pinned: bool,
    show_menu_on_animation_end: bool,
    sending_hover_events: bool,
    clock: Nanos,
    resolved: Vec<GestureResult>,
}

impl<M, U, H> InteractionController<M, U, H>
where
    M: MotionApplier,
    U: MenuController,
    H: Host,
{
    pub fn new(settings: InteractionSettings, motion: M, menu: U, host: H) -> Self {
        Self {
            touch: TouchState::new(TouchThresholds::from(&settings.thresholds)),
            dismiss: DismissZoneHandler::new(&settings.thresholds),
            resolver: GestureResolver::new(),
            animations: AnimationTracker::default(),
            motion,
            menu,
            host,
            settings,
            geometry: GeometrySnapshot::default(),
            menu_state: MenuState::None,
            ime: Occluder::default(),
            shelf: Occluder::default(),
            movement_extra_offsets: 0,
            movement_before_occlusion: None,
            saved_snap_fraction: None,
            display_rotation: 0,
            deferred_unexpand_rotation: None,
            user_resize_bounds: Rect::EMPTY,
            pinned: false,
            show_menu_on_animation_end: false,
            sending_hover_events: false,
            clock: 0,
            resolved: Vec::new(),
        }
    }

    // -- Accessors ----------------------------------------------

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut M {
        &mut self.motion
    }

    pub fn menu(&self) -> &U {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut U {
        &mut self.menu
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn touch(&self) -> &TouchState {
        &self.touch
    }

    pub fn dismiss(&self) -> &DismissZoneHandler {
        &self.dismiss
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn geometry(&self) -> &GeometrySnapshot {
        &self.geometry
    }

    pub fn movement_bounds(&self) -> Rect {
        self.geometry.movement
    }

    pub fn normal_bounds(&self) -> Rect {
        self.geometry.normal
    }

    pub fn expanded_bounds(&self) -> Rect {
        self.geometry.expanded
    }

    pub fn menu_state(&self) -> MenuState {
        self.menu_state
    }

    pub fn saved_snap_fraction(&self) -> Option<f32> {
        self.saved_snap_fraction
    }

    pub fn display_rotation(&self) -> u32 {
        self.display_rotation
    }

    pub fn deferred_unexpand_rotation(&self) -> Option<u32> {
        self.deferred_unexpand_rotation
    }

    pub fn user_resize_bounds(&self) -> Rect {
        self.user_resize_bounds
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// The primary animation whose completion is still awaited.
    pub fn current_animation(&self) -> Option<AnimationId> {
        self.animations.current.map(|animation| animation.id)
    }

    /// Gestures committed since the last call, oldest first.
    pub fn take_resolved(&mut self) -> Vec<GestureResult> {
        std::mem::take(&mut self.resolved)
    }

    // -- Pointer input ------------------------------------------

    /// Feed one pointer event. Returns whether the controller consumed it.
    pub fn handle_touch_event(&mut self, event: &PointerEvent) -> bool {
        // Timers due strictly before this event run first; a tie goes to the event.
        self.advance_clock(event.time().saturating_sub(1));
        self.clock = self.clock.max(event.time());

        if !self.pinned {
            debug!("Ignoring {} with no pinned surface", event.phase);
            return false;
        }

        let phase = event.phase;
        if phase.is_touch() && (phase == PointerPhase::Down || self.touch.is_user_interacting()) {
            let decision = self.dismiss.maybe_consume_motion_event(event, &self.touch);
            match decision {
                ZoneDecision::Captured => {
                    if let Some(target) = self.dismiss.target() {
                        self.motion.stick_to_target(target.center);
                    }
                }
                ZoneDecision::Escaped => self.motion.release_from_target(),
                _ => {}
            }
            if decision.consumes() {
                if phase == PointerPhase::Down {
                    // A drag out of the field later needs a proper origin.
                    self.touch.on_touch_event(event);
                    let frame = self.gesture_frame();
                    self.resolver.on_down(&self.touch, &frame);
                } else {
                    self.touch.add_movement_to_velocity_tracker(event);
                }
                if decision == ZoneDecision::Dismissed {
                    self.dismiss_surface();
                }
                return true;
            }
        }

        self.touch.on_touch_event(event);
        let started_dragging = phase == PointerPhase::Move && self.touch.started_dragging();
        let mut deliver_to_menu = self.menu_state != MenuState::None;

        match phase {
            PointerPhase::Down => {
                let frame = self.gesture_frame();
                if self.resolver.on_down(&self.touch, &frame) {
                    self.menu.poke();
                }
            }
            PointerPhase::Move => {
                let frame = self.gesture_frame();
                match self.resolver.on_move(&self.touch, &frame) {
                    GestureResult::Moved { bounds, started } => {
                        if started {
                            self.saved_snap_fraction = None;
                            self.dismiss
                                .show_dismiss_target_maybe(self.clock, &mut self.host);
                        }
                        self.motion.move_to(bounds);
                    }
                    _ => deliver_to_menu = !self.touch.is_dragging(),
                }
            }
            PointerPhase::Up => {
                // The IME may have come up since the drag began.
                self.update_movement_bounds();
                self.dismiss
                    .hide_dismiss_target_maybe(self.clock, &mut self.host);
                let frame = self.gesture_frame();
                let was_dragging = self.touch.is_dragging();
                match self.resolver.on_up(&mut self.touch, &frame) {
                    Some(result) => self.dispatch_release(result),
                    None => deliver_to_menu = !was_dragging,
                }
                self.touch.reset();
            }
            PointerPhase::Cancel => {
                self.dismiss
                    .hide_dismiss_target_maybe(self.clock, &mut self.host);
                deliver_to_menu = !self.touch.is_dragging();
                self.touch.reset();
            }
            PointerPhase::HoverEnter | PointerPhase::HoverMove | PointerPhase::HoverExit => {
                self.handle_hover(event, deliver_to_menu);
            }
        }

        if deliver_to_menu {
            if started_dragging {
                self.menu
                    .handle_pointer_event(&event.with_phase(PointerPhase::Cancel));
                self.menu.poke();
            } else {
                self.menu.handle_pointer_event(event);
            }
        }
        true
    }

    fn handle_hover(&mut self, event: &PointerEvent, deliver_to_menu: bool) {
        let exploration = self.host.is_touch_exploration_enabled();
        let result = self.resolver.on_hover(&mut self.touch, event, exploration);
        if let GestureResult::MenuOpened { .. } = result {
            let bounds = self.motion.current_bounds();
            self.menu.show(MenuState::Full, bounds, false, false, false);
            self.record(result);
        }

        match event.phase {
            PointerPhase::HoverEnter | PointerPhase::HoverMove => {
                if !deliver_to_menu && !self.sending_hover_events {
                    self.send_hover_notification(HoverNotification::Enter);
                    self.sending_hover_events = true;
                }
            }
            PointerPhase::HoverExit => {
                if !deliver_to_menu && self.sending_hover_events {
                    self.send_hover_notification(HoverNotification::Exit);
                    self.sending_hover_events = false;
                }
            }
            _ => {}
        }
    }

    fn send_hover_notification(&mut self, notification: HoverNotification) {
        if self.host.is_accessibility_enabled() {
            self.host.send_hover_notification(notification);
        }
    }

    /// Carry out what the resolver decided on release.
    fn dispatch_release(&mut self, result: GestureResult) {
        match result {
            GestureResult::Flung {
                velocity,
                hide_menu_after,
            }
            | GestureResult::Stashed {
                velocity,
                hide_menu_after,
            } => {
                if self.menu_state != MenuState::None {
                    // Keep the menu up, with its timeout restarted.
                    let bounds = self.motion.current_bounds();
                    let will_resize = self.will_resize_menu();
                    self.menu
                        .show(self.menu_state, bounds, true, will_resize, false);
                }
                let end_action = hide_menu_after.then_some(EndAction::HideMenu);
                if matches!(result, GestureResult::Stashed { .. }) {
                    let id = self.animations.start(AnimationKind::Stash, end_action);
                    self.motion.stash_to_edge(velocity, id);
                } else {
                    let id = self.animations.start(AnimationKind::Fling, end_action);
                    self.motion.fling_to_snap(velocity, id);
                }
            }
            GestureResult::Expanded => {
                self.user_resize_bounds = self.geometry.expanded;
                self.animate_to_expanded_state();
            }
            GestureResult::Collapsed => {
                self.user_resize_bounds = self.geometry.normal;
                self.animate_to_unexpanded_state(self.geometry.normal);
            }
            GestureResult::Fullscreen => {
                // Frozen until the transition is over.
                self.set_touch_enabled(false);
                self.motion.expand_leave();
            }
            GestureResult::MenuOpened { .. } => {
                let bounds = self.motion.current_bounds();
                let will_resize = self.will_resize_menu();
                self.menu
                    .show(MenuState::Full, bounds, true, will_resize, false);
            }
            GestureResult::None
            | GestureResult::Moved { .. }
            | GestureResult::DoubleTapArmed
            | GestureResult::Dismissed => {}
        }
        self.record(result);
    }

    fn dismiss_surface(&mut self) {
        self.dismiss
            .hide_dismiss_target_maybe(self.clock, &mut self.host);
        self.touch.remove_double_tap_timeout_callback();
        self.touch.reset();
        self.motion.dismiss();
        self.record(GestureResult::Dismissed);
    }

    fn record(&mut self, result: GestureResult) {
        match result {
            GestureResult::None | GestureResult::Moved { .. } => {}
            GestureResult::DoubleTapArmed => {
                debug!("Gesture: {result}");
                self.resolved.push(result);
            }
            _ => {
                info!("Gesture: {result}");
                self.resolved.push(result);
            }
        }
    }

    // -- Clock and async completions ----------------------------

    /// Fire every timer due at `now`.
    pub fn on_tick(&mut self, now: Nanos) {
        self.clock = self.clock.max(now);
        self.advance_clock(now);
    }

    fn advance_clock(&mut self, now: Nanos) {
        let mut due = self.touch.poll_timers(now);
        if let Some(deadline) = self.dismiss.poll_fade(now) {
            due.push((deadline, TimerEvent::DismissFadeFinished));
        }
        due.sort_by_key(|(deadline, _)| *deadline);

        for (deadline, event) in due {
            if !self.pinned && event != TimerEvent::DismissFadeFinished {
                warn!("Dropping timer {event} (deadline t={deadline}) with no pinned surface");
                continue;
            }
            debug!("Timer {event} fired (deadline t={deadline})");
            match event {
                TimerEvent::DoubleTapTimeout => {
                    let bounds = self.motion.current_bounds();
                    let will_resize = self.will_resize_menu();
                    self.menu
                        .show_with_delay(MenuState::Full, bounds, true, will_resize, false);
                    self.record(GestureResult::MenuOpened { from_hover: false });
                }
                TimerEvent::HoverExitTimeout => self.menu.hide(),
                TimerEvent::DismissFadeFinished => {}
            }
        }
    }

    /// Earliest pending timer deadline, for hosts that sleep between ticks.
    pub fn next_timer_deadline(&self) -> Option<Nanos> {
        self.touch
            .next_deadline()
            .into_iter()
            .chain(self.dismiss.fade_deadline())
            .min()
    }

    /// Completion of an animation started by this controller.
    pub fn on_animation_finished(&mut self, id: AnimationId) {
        let Some(animation) = self.animations.finish(id) else {
            warn!("Ignoring completion of stale animation {id}");
            return;
        };
        debug!("{} animation {id} finished", animation.kind);
        if animation.end_action == Some(EndAction::HideMenu) {
            // Never shown during the drag, so nothing should linger after it.
            self.menu.hide();
        }
    }

    // -- Geometry -------------------------------------------------

    fn ime_bottom_offset(&self) -> i32 {
        if self.ime.visible { self.ime.height } else { 0 }
    }

    fn will_resize_menu(&self) -> bool {
        self.will_resize_between(self.geometry.normal, self.geometry.expanded)
    }

    fn will_resize_between(&self, normal: Rect, expanded: Rect) -> bool {
        self.settings.features.enable_resize_for_menu && expanded.size() != normal.size()
    }

    fn gesture_frame(&self) -> GestureFrame {
        GestureFrame {
            menu_state: self.menu_state,
            bounds: self.motion.possibly_animating_bounds(),
            movement_bounds: self.geometry.movement,
            display_bounds: self.host.display_bounds(),
            expanded_bounds: self.geometry.expanded,
            enable_stash: self.settings.features.enable_stash,
            pinch_to_zoom: self.settings.features.pinch_to_zoom,
        }
    }

    /// Re-derive movement bounds from the surface's current size.
    fn update_movement_bounds(&mut self) {
        let movement = bounds::movement_bounds(
            self.motion.current_bounds(),
            self.geometry.insets,
            self.ime_bottom_offset(),
        );
        self.geometry = GeometrySnapshot {
            movement,
            ..self.geometry
        };
        self.motion.set_movement_bounds(movement);
    }

    pub fn on_movement_bounds_changed(
        &mut self,
        insets: Rect,
        normal: Rect,
        current: Rect,
        from_ime: bool,
        from_shelf: bool,
        rotation: u32,
    ) {
        if self.user_resize_bounds.is_empty() {
            self.user_resize_bounds = normal;
        }

        let bottom_offset = self.ime_bottom_offset();
        if self.display_rotation != rotation {
            debug!("Display rotation {} -> {rotation}", self.display_rotation);
            self.touch.reset();
        }

        let normal_movement = bounds::movement_bounds(normal, insets, bottom_offset);
        let movement = match self.movement_before_occlusion.take() {
            Some(previous) => previous,
            None if self.geometry.movement.is_empty() => {
                bounds::movement_bounds(current, insets, 0)
            }
            None => self.geometry.movement,
        };

        let display = self.host.display_bounds();
        let aspect_ratio = normal.width() as f32 / normal.height().max(1) as f32;
        let expanded_size = bounds::size_for_aspect_ratio(
            aspect_ratio,
            self.settings.thresholds.expanded_shortest_edge as i32,
            display.width(),
            display.height(),
        );
        let expanded = Rect::from_origin_size(0, 0, expanded_size);
        let expanded_movement = bounds::movement_bounds(expanded, insets, bottom_offset);

        let extra_offset = (if self.ime.visible {
            self.settings.thresholds.ime_offset as i32
        } else {
            0
        })
        .max(if !self.ime.visible && self.shelf.visible {
            self.shelf.height
        } else {
            0
        });

        if from_ime || from_shelf {
            if self.touch.is_user_interacting() {
                debug!("Occlusion change deferred until the touch ends");
            } else {
                let is_expanded = self.menu_state == MenuState::Full
                    && self.will_resize_between(normal, expanded);
                self.shift_for_occlusion(insets, current, movement, extra_offset, is_expanded.then_some(expanded));
            }
        }

        self.geometry = GeometrySnapshot {
            insets,
            normal,
            normal_movement,
            expanded,
            expanded_movement,
            movement,
        };
        self.display_rotation = rotation;
        self.update_movement_bounds();
        self.movement_extra_offsets = extra_offset;
        self.host.on_accessibility_bounds_changed(AccessibilityBounds {
            normal,
            expanded,
            normal_movement,
            expanded_movement,
        });

        if self.deferred_unexpand_rotation == Some(rotation) {
            self.deferred_unexpand_rotation = None;
            info!("Replaying unexpand deferred until rotation {rotation}");
            let id = self.animations.start(AnimationKind::Unexpand, None);
            let snap_fraction = self.saved_snap_fraction.take();
            self.motion.animate_to_unexpanded(
                normal,
                snap_fraction,
                self.geometry.normal_movement,
                self.geometry.movement,
                true,
                id,
            );
        }
    }

    /// Keep a surface near the bottom clear of a new IME or shelf, or follow
    /// the bottom edge down when they go away.
    fn shift_for_occlusion(
        &mut self,
        insets: Rect,
        current: Rect,
        previous_movement: Rect,
        extra_offset: i32,
        expanded: Option<Rect>,
    ) {
        let bottom_offset = self.ime_bottom_offset();
        let to_movement = bounds::movement_bounds(current, insets, bottom_offset);
        let prev_bottom = previous_movement.bottom - self.movement_extra_offsets;
        // A fully occluding IME (landscape fullscreen) gets no extra offset.
        let to_bottom = if bounds::is_vertically_occluded(current, insets, bottom_offset) {
            to_movement.bottom
        } else {
            to_movement.bottom - extra_offset
        };

        let mut current = current;
        if let (Some(expanded), Some(fraction)) = (expanded, self.saved_snap_fraction) {
            current = bounds::apply_snap_fraction(expanded, to_movement, fraction);
        }

        let buffer = self.settings.thresholds.bottom_offset_buffer as i32;
        let near_bottom = if prev_bottom < to_bottom {
            current.top > prev_bottom - buffer
        } else if prev_bottom > to_bottom {
            current.top > to_bottom - buffer
        } else {
            false
        };

        if near_bottom {
            let id = self.animations.start(AnimationKind::Offset, None);
            self.motion
                .animate_to_offset(current, to_bottom - current.top, id);
        }
    }

    /// Bounds after rotation: a surface resting on the bottom edge stays there.
    pub fn adjust_bounds_for_rotation(&self, out: Rect, current: Rect, insets: Rect) -> Rect {
        let to_movement = bounds::movement_bounds(out, insets, 0);
        let prev_bottom = self.geometry.movement.bottom - self.movement_extra_offsets;
        let buffer = self.settings.thresholds.bottom_offset_buffer as i32;
        if prev_bottom - buffer <= current.top {
            out.offset_to(out.left, to_movement.bottom)
        } else {
            out
        }
    }

    fn animate_to_expanded_state(&mut self) {
        let id = self.animations.start(AnimationKind::Expand, None);
        let fraction = self.motion.animate_to_expanded(
            self.geometry.expanded,
            self.geometry.movement,
            self.geometry.expanded_movement,
            id,
        );
        self.saved_snap_fraction = Some(fraction);
    }

    fn animate_to_unexpanded_state(&mut self, restore: Rect) {
        let restored_movement =
            bounds::movement_bounds(restore, self.geometry.insets, self.ime_bottom_offset());
        let id = self.animations.start(AnimationKind::Unexpand, None);
        let fraction = self.saved_snap_fraction.take();
        self.motion.animate_to_unexpanded(
            restore,
            fraction,
            restored_movement,
            self.geometry.movement,
            false,
            id,
        );
    }

    // -- Host notifications -------------------------------------

    pub fn on_ime_visibility_changed(&mut self, visible: bool, height: i32) {
        self.ime = Occluder { visible, height };
        self.refresh_for_occlusion();
    }

    pub fn on_shelf_visibility_changed(&mut self, visible: bool, height: i32) {
        self.shelf = Occluder { visible, height };
        self.refresh_for_occlusion();
    }

    /// Movement bounds follow the IME right away; the old ones are kept for
    /// the offset animation in the next relayout.
    fn refresh_for_occlusion(&mut self) {
        if self.geometry.insets.is_empty() {
            return;
        }
        self.movement_before_occlusion
            .get_or_insert(self.geometry.movement);
        self.update_movement_bounds();
    }

    pub fn on_configuration_changed(&mut self, settings: InteractionSettings) {
        self.touch
            .set_thresholds(TouchThresholds::from(&settings.thresholds));
        self.dismiss.update_magnetic_target_size(&settings.thresholds);
        self.settings = settings;
        self.motion.synchronize_bounds();
        if self.pinned {
            self.dismiss
                .create_or_update_dismiss_target(self.host.display_bounds());
        }
    }

    pub fn on_aspect_ratio_changed(&mut self) {
        self.user_resize_bounds = Rect::EMPTY;
    }

    pub fn set_touch_enabled(&mut self, enabled: bool) {
        self.touch.set_allow_touches(enabled);
    }

    pub fn on_activity_pinned(&mut self) {
        self.dismiss
            .create_or_update_dismiss_target(self.host.display_bounds());
        self.pinned = true;
        self.show_menu_on_animation_end = true;
        info!("Surface pinned");
    }

    /// `last_removed` is set once no pinned surface remains.
    pub fn on_activity_unpinned(&mut self, last_removed: bool) {
        if !last_removed {
            return;
        }
        self.dismiss.clean_up_dismiss_target();
        self.touch.remove_double_tap_timeout_callback();
        self.touch.remove_hover_exit_timeout_callback();
        self.touch.reset();
        self.pinned = false;
        info!("Surface unpinned");
    }

    pub fn on_pinned_animation_ended(&mut self, direction: TransitionDirection) {
        self.motion.synchronize_bounds();
        self.update_movement_bounds();
        if direction == TransitionDirection::ToPip {
            self.user_resize_bounds = self.motion.current_bounds();
        }
        if self.show_menu_on_animation_end {
            self.show_menu_on_animation_end = false;
            let bounds = self.motion.current_bounds();
            self.menu.show(MenuState::Close, bounds, true, false, false);
        }
    }

    pub fn on_registration_changed(&mut self, registered: bool) {
        self.host.set_action_replacing_connection(registered);
        if !registered && self.touch.is_user_interacting() {
            // The terminal UP may never arrive now.
            self.dismiss.clean_up_dismiss_target();
        }
    }

    // -- Menu -----------------------------------------------------

    /// Open the full menu without auto-hide, unless the user is touching.
    pub fn show_menu(&mut self) {
        if self.touch.is_user_interacting() {
            return;
        }
        let bounds = self.motion.current_bounds();
        let will_resize = self.will_resize_menu();
        self.menu
            .show(MenuState::Full, bounds, false, will_resize, false);
    }

    pub fn on_menu_show_requested(&mut self) {
        let bounds = self.motion.current_bounds();
        let will_resize = self.will_resize_menu();
        self.menu
            .show(MenuState::Full, bounds, true, will_resize, false);
    }

    pub fn on_menu_expand_requested(&mut self) {
        self.motion.expand_leave();
        self.record(GestureResult::Fullscreen);
    }

    pub fn on_menu_dismiss_requested(&mut self) {
        self.touch.remove_double_tap_timeout_callback();
        self.motion.dismiss();
        self.record(GestureResult::Dismissed);
    }

    /// The menu reports a visibility change; `resize` asks for the matching
    /// expand or restore animation.
    pub fn on_menu_state_changed(&mut self, state: MenuState, resize: bool) {
        if self.menu_state == state {
            debug!("Menu already {state}, nothing to do");
            return;
        }

        match (self.menu_state, state) {
            (_, MenuState::Full) => {
                if resize {
                    self.animate_to_expanded_state();
                }
            }
            (MenuState::Full, MenuState::None) => {
                if resize {
                    self.maybe_defer_unexpand();
                    if self.deferred_unexpand_rotation.is_none() {
                        let restore = if self.user_resize_bounds.is_empty() {
                            self.geometry.normal
                        } else {
                            self.user_resize_bounds
                        };
                        self.animate_to_unexpanded_state(restore);
                    }
                } else {
                    self.saved_snap_fraction = None;
                }
            }
            _ => {}
        }

        info!("Menu {} -> {state}", self.menu_state);
        self.menu_state = state;
        self.update_movement_bounds();
        self.on_registration_changed(state == MenuState::None);
    }

    /// If the display already rotated but our bounds have not caught up,
    /// hold the unexpand until they do.
    fn maybe_defer_unexpand(&mut self) {
        if self.deferred_unexpand_rotation.is_some() {
            return;
        }
        match self.host.display_rotation() {
            Ok(rotation) if rotation != self.display_rotation => {
                info!(
                    "Deferring unexpand: rotation {} -> {rotation} pending",
                    self.display_rotation
                );
                self.deferred_unexpand_rotation = Some(rotation);
            }
            Ok(_) => {}
            Err(e) => error!("Could not get display rotation: {e}"),
        }
    }

    // -- Diagnostics --------------------------------------------

    pub fn dump(&self) -> String {
        let mut out = String::new();
        let g = &self.geometry;
        let _ = writeln!(out, "InteractionController");
        let _ = writeln!(out, "  movement_bounds={}", g.movement);
        let _ = writeln!(out, "  normal_bounds={}", g.normal);
        let _ = writeln!(out, "  normal_movement_bounds={}", g.normal_movement);
        let _ = writeln!(out, "  expanded_bounds={}", g.expanded);
        let _ = writeln!(out, "  expanded_movement_bounds={}", g.expanded_movement);
        let _ = writeln!(out, "  menu_state={}", self.menu_state);
        let _ = writeln!(out, "  ime={:?} shelf={:?}", self.ime, self.shelf);
        let _ = writeln!(out, "  saved_snap_fraction={:?}", self.saved_snap_fraction);
        let _ = writeln!(out, "  movement_extra_offsets={}", self.movement_extra_offsets);
        let _ = writeln!(out, "  display_rotation={}", self.display_rotation);
        let _ = writeln!(
            out,
            "  deferred_unexpand_rotation={:?}",
            self.deferred_unexpand_rotation
        );
        let _ = writeln!(
            out,
            "  touch: interacting={} dragging={} waiting_for_double_tap={}",
            self.touch.is_user_interacting(),
            self.touch.is_dragging(),
            self.touch.is_waiting_for_double_tap()
        );
        let _ = writeln!(
            out,
            "  movement_within_dismiss={}",
            self.resolver.is_movement_within_dismiss()
        );
        let _ = writeln!(out, "  dismiss_target={}", self.dismiss.visibility());
        out
    }
}
