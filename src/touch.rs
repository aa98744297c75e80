//! Lifecycle of a single pointer session: positions, velocity, drag and
//! double-tap detection, plus the two single-shot timers tied to taps and
//! hovering.
use std::time::Duration;

use log::debug;
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::ValidatedThresholds;
use crate::error::report_illegal_sequence;
use crate::geometry::PointF;
use crate::scheduler::{Nanos, OneShotTimer, TimerEvent, nanos};
use crate::velocity::VelocityTracker;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum PointerPhase {
    #[strum(serialize = "down")]
    Down,
    #[strum(serialize = "move")]
    Move,
    #[strum(serialize = "up")]
    Up,
    #[strum(serialize = "cancel")]
    Cancel,
    #[strum(serialize = "hover_enter")]
    HoverEnter,
    #[strum(serialize = "hover_move")]
    HoverMove,
    #[strum(serialize = "hover_exit")]
    HoverExit,
}

impl PointerPhase {
    pub fn is_touch(self) -> bool {
        matches!(self, Self::Down | Self::Move | Self::Up | Self::Cancel)
    }
}

/// Position of the pointer at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: PointF,
    pub time: Nanos,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub sample: PointerSample,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f32, y: f32, time: Nanos) -> Self {
        Self {
            phase,
            sample: PointerSample {
                position: PointF::new(x, y),
                time,
            },
        }
    }

    pub fn position(&self) -> PointF {
        self.sample.position
    }

    pub fn time(&self) -> Nanos {
        self.sample.time
    }

    /// Copy of this event with a different phase.
    pub fn with_phase(&self, phase: PointerPhase) -> Self {
        Self { phase, ..*self }
    }
}

/// Distances in px, durations on the event clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchThresholds {
    pub touch_slop: f32,
    pub double_tap_timeout: Duration,
    pub double_tap_slop: f32,
    pub hover_exit_timeout: Duration,
    pub max_fling_velocity: f32,
}

impl From<&ValidatedThresholds> for TouchThresholds {
    fn from(th: &ValidatedThresholds) -> Self {
        Self {
            touch_slop: th.touch_slop as f32,
            double_tap_timeout: Duration::from_secs_f64(th.double_tap_timeout.max(0.0)),
            double_tap_slop: th.double_tap_slop as f32,
            hover_exit_timeout: Duration::from_secs_f64(th.hover_exit_timeout.max(0.0)),
            max_fling_velocity: th.max_fling_velocity as f32,
        }
    }
}

/// Tracks one pointer session at a time.
///
/// UP and CANCEL finalize the session but leave it inspectable; the owner
/// discards it with [`TouchState::reset`].
#[derive(Debug, Clone)]
pub struct TouchState {
    thresholds: TouchThresholds,
    velocity_tracker: VelocityTracker,

    down_touch: PointF,
    down_time: Nanos,
    last_touch: PointF,
    last_delta: PointF,
    down_delta: PointF,
    velocity: PointF,
    up_time: Nanos,
    /// Release of the last plain tap, the anchor for double-tap detection.
    last_tap_up: Option<(Nanos, PointF)>,

    allow_touches: bool,
    is_user_interacting: bool,
    is_dragging: bool,
    started_dragging: bool,
    is_double_tap: bool,
    is_waiting_for_double_tap: bool,
    released: bool,

    double_tap_timer: OneShotTimer,
    hover_exit_timer: OneShotTimer,
}

impl TouchState {
    pub fn new(thresholds: TouchThresholds) -> Self {
        Self {
            thresholds,
            velocity_tracker: VelocityTracker::new(),
            down_touch: PointF::ZERO,
            down_time: 0,
            last_touch: PointF::ZERO,
            last_delta: PointF::ZERO,
            down_delta: PointF::ZERO,
            velocity: PointF::ZERO,
            up_time: 0,
            last_tap_up: None,
            allow_touches: true,
            is_user_interacting: false,
            is_dragging: false,
            started_dragging: false,
            is_double_tap: false,
            is_waiting_for_double_tap: false,
            released: false,
            double_tap_timer: OneShotTimer::default(),
            hover_exit_timer: OneShotTimer::default(),
        }
    }

    pub fn thresholds(&self) -> &TouchThresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: TouchThresholds) {
        self.thresholds = thresholds;
    }

    /// Feed one pointer event. Ignored entirely while touches are disallowed.
    pub fn on_touch_event(&mut self, event: &PointerEvent) {
        if !self.allow_touches {
            return;
        }
        let position = event.position();
        let time = event.time();

        match event.phase {
            PointerPhase::Down => {
                self.velocity_tracker.clear();
                self.velocity_tracker.add_sample(time, position);
                self.down_touch = position;
                self.down_time = time;
                self.down_delta = PointF::ZERO;
                self.last_touch = position;
                self.last_delta = PointF::ZERO;
                self.velocity = PointF::ZERO;
                self.is_user_interacting = true;
                self.is_dragging = false;
                self.started_dragging = false;
                self.released = false;
                self.is_double_tap = self.last_tap_up.is_some_and(|(up_time, up_position)| {
                    time >= up_time
                        && time - up_time <= nanos(self.thresholds.double_tap_timeout)
                        && up_position.distance_to(position) <= self.thresholds.double_tap_slop
                });
                self.is_waiting_for_double_tap = false;
                if self.double_tap_timer.cancel() {
                    debug!("Second tap arrived, double-tap timeout cancelled");
                }
            }
            PointerPhase::Move => {
                if !self.is_user_interacting {
                    return;
                }
                self.velocity_tracker.add_sample(time, position);
                self.last_delta = position - self.last_touch;
                self.down_delta = position - self.down_touch;

                if !self.is_dragging {
                    if self.down_delta.length() > self.thresholds.touch_slop {
                        self.is_dragging = true;
                        self.started_dragging = true;
                        debug!("Drag started at {position}");
                    }
                } else {
                    self.started_dragging = false;
                }
                self.last_touch = position;
            }
            PointerPhase::Up => {
                if !self.is_user_interacting {
                    return;
                }
                self.velocity_tracker.add_sample(time, position);
                self.velocity = self
                    .velocity_tracker
                    .velocity(self.thresholds.max_fling_velocity);
                self.last_touch = position;
                self.up_time = time;
                self.released = true;

                let held = time.saturating_sub(self.down_time);
                self.is_waiting_for_double_tap = !self.is_double_tap
                    && !self.is_dragging
                    && held < nanos(self.thresholds.double_tap_timeout);
                self.last_tap_up = if self.is_dragging || self.is_double_tap {
                    None
                } else {
                    Some((time, position))
                };
            }
            PointerPhase::Cancel => {
                self.velocity_tracker.clear();
                self.velocity = PointF::ZERO;
                self.last_tap_up = None;
            }
            PointerPhase::HoverEnter | PointerPhase::HoverMove | PointerPhase::HoverExit => {}
        }
    }

    /// Track velocity only, without any drag-distance accounting.
    pub fn add_movement_to_velocity_tracker(&mut self, event: &PointerEvent) {
        if matches!(
            event.phase,
            PointerPhase::Down | PointerPhase::Move | PointerPhase::Up
        ) {
            self.velocity_tracker.add_sample(event.time(), event.position());
        }
    }

    /// Discard the session. Calling it again is a no-op.
    ///
    /// A session dropped before its UP takes its pending double-tap timeout
    /// with it; a released tap keeps waiting for its second tap.
    pub fn reset(&mut self) {
        if self.is_user_interacting && !self.released {
            self.remove_double_tap_timeout_callback();
        }
        self.is_user_interacting = false;
        self.is_dragging = false;
        self.started_dragging = false;
        self.released = false;
    }

    pub fn set_allow_touches(&mut self, allow: bool) {
        self.allow_touches = allow;
    }

    pub fn allow_touches(&self) -> bool {
        self.allow_touches
    }

    pub fn is_user_interacting(&self) -> bool {
        self.is_user_interacting
    }

    /// True from the move that crossed the drag threshold until the session ends.
    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// True only for the move that crossed the drag threshold.
    pub fn started_dragging(&self) -> bool {
        self.started_dragging
    }

    pub fn is_double_tap(&self) -> bool {
        self.is_double_tap
    }

    pub fn is_waiting_for_double_tap(&self) -> bool {
        self.is_waiting_for_double_tap
    }

    pub fn down_touch_position(&self) -> PointF {
        self.down_touch
    }

    pub fn last_touch_position(&self) -> PointF {
        self.last_touch
    }

    pub fn last_touch_delta(&self) -> PointF {
        self.last_delta
    }

    pub fn down_touch_delta(&self) -> PointF {
        self.down_delta
    }

    /// Velocity finalized by the last UP, zero before it.
    pub fn velocity(&self) -> PointF {
        self.velocity
    }

    /// Velocity from the samples tracked so far in this session.
    pub fn current_velocity(&self) -> PointF {
        self.velocity_tracker
            .velocity(self.thresholds.max_fling_velocity)
    }

    // -- Timers -------------------------------------------------

    /// Arm the fallback that opens the menu if no second tap arrives.
    pub fn schedule_double_tap_timeout_callback(&mut self) {
        if !self.is_waiting_for_double_tap {
            report_illegal_sequence("double-tap timeout armed without a released tap");
            return;
        }
        let deadline = self.up_time + nanos(self.thresholds.double_tap_timeout);
        self.double_tap_timer.schedule(deadline);
        debug!("Double-tap timeout armed for t={deadline}");
    }

    pub fn remove_double_tap_timeout_callback(&mut self) {
        self.is_waiting_for_double_tap = false;
        self.double_tap_timer.cancel();
    }

    pub fn is_double_tap_timeout_pending(&self) -> bool {
        self.double_tap_timer.is_pending()
    }

    pub fn schedule_hover_exit_timeout_callback(&mut self, now: Nanos) {
        self.hover_exit_timer
            .schedule(now + nanos(self.thresholds.hover_exit_timeout));
    }

    pub fn remove_hover_exit_timeout_callback(&mut self) {
        self.hover_exit_timer.cancel();
    }

    pub fn is_hover_exit_timeout_pending(&self) -> bool {
        self.hover_exit_timer.is_pending()
    }

    /// Earliest deadline among the pending timers.
    pub fn next_deadline(&self) -> Option<Nanos> {
        self.double_tap_timer
            .deadline()
            .into_iter()
            .chain(self.hover_exit_timer.deadline())
            .min()
    }

    /// Fire the timers due at `now`, returning them with their deadlines.
    pub fn poll_timers(&mut self, now: Nanos) -> Vec<(Nanos, TimerEvent)> {
        let mut fired = Vec::new();
        if let Some(deadline) = self.double_tap_timer.poll(now) {
            self.is_waiting_for_double_tap = false;
            self.last_tap_up = None;
            fired.push((deadline, TimerEvent::DoubleTapTimeout));
        }
        if let Some(deadline) = self.hover_exit_timer.poll(now) {
            fired.push((deadline, TimerEvent::HoverExitTimeout));
        }
        fired
    }
}
