//! Magnetic dismiss zone near the bottom of the display.
//!
//! The handler sees every event before the gesture resolver. Inside the
//! magnetic field a drag "sticks": events are consumed and only feed the
//! velocity tracker, until the pointer leaves the field or is released fast
//! enough to escape.
use std::time::Duration;

use log::{debug, info};
use strum::Display;

use crate::config::ValidatedThresholds;
use crate::geometry::{PointF, Rect};
use crate::host::Host;
use crate::scheduler::{Nanos, OneShotTimer, nanos};
use crate::touch::{PointerEvent, PointerPhase, TouchState};

/// Duration of the dismiss target fading in/out.
pub const DISMISS_TRANSITION_DURATION: Duration = Duration::from_millis(200);

/// Scale from the target's base size to its magnetic field radius.
pub const MAGNETIC_FIELD_RADIUS_MULTIPLIER: f32 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DismissTarget {
    pub center: PointF,
    pub base_size: f32,
}

impl DismissTarget {
    pub fn radius(&self) -> f32 {
        self.base_size * MAGNETIC_FIELD_RADIUS_MULTIPLIER
    }

    pub fn contains(&self, point: PointF) -> bool {
        self.center.distance_to(point) <= self.radius()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TargetVisibility {
    #[strum(serialize = "hidden")]
    Hidden,
    #[strum(serialize = "fading_in")]
    FadingIn,
    #[strum(serialize = "shown")]
    Shown,
    #[strum(serialize = "fading_out")]
    FadingOut,
}

/// What the zone did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ZoneDecision {
    /// Not ours; hand it to the gesture resolver.
    Declined,
    Consumed,
    /// Consumed, and the surface just got stuck to the target.
    Captured,
    /// The surface broke free; the event continues to the resolver.
    Escaped,
    /// Released on the target: consumed, the surface goes away.
    Dismissed,
}

impl ZoneDecision {
    pub fn consumes(self) -> bool {
        matches!(self, Self::Consumed | Self::Captured | Self::Dismissed)
    }
}

#[derive(Debug, Clone)]
pub struct DismissZoneHandler {
    target: Option<DismissTarget>,
    display: Rect,
    target_size: f32,
    bottom_margin: f32,
    escape_velocity: f32,
    stuck: bool,
    visibility: TargetVisibility,
    /// Replaced by every show/hide, so a superseded fade never completes.
    fade_timer: OneShotTimer,
}

impl DismissZoneHandler {
    pub fn new(thresholds: &ValidatedThresholds) -> Self {
        Self {
            target: None,
            display: Rect::EMPTY,
            target_size: thresholds.dismiss_target_size as f32,
            bottom_margin: thresholds.dismiss_target_bottom_margin as f32,
            escape_velocity: thresholds.dismiss_escape_velocity as f32,
            stuck: false,
            visibility: TargetVisibility::Hidden,
            fade_timer: OneShotTimer::default(),
        }
    }

    pub fn target(&self) -> Option<DismissTarget> {
        self.target
    }

    pub fn visibility(&self) -> TargetVisibility {
        self.visibility
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// Place (or re-place) the target for the given display.
    pub fn create_or_update_dismiss_target(&mut self, display: Rect) {
        self.display = display;
        let center = PointF::new(
            display.center().x,
            display.bottom as f32 - self.bottom_margin - self.target_size / 2.0,
        );
        self.target = Some(DismissTarget {
            center,
            base_size: self.target_size,
        });
        debug!(
            "Dismiss target at {center}, field radius {:.1}",
            self.target_size * MAGNETIC_FIELD_RADIUS_MULTIPLIER
        );
    }

    pub fn update_magnetic_target_size(&mut self, thresholds: &ValidatedThresholds) {
        self.target_size = thresholds.dismiss_target_size as f32;
        self.bottom_margin = thresholds.dismiss_target_bottom_margin as f32;
        self.escape_velocity = thresholds.dismiss_escape_velocity as f32;
        if self.target.is_some() {
            self.create_or_update_dismiss_target(self.display);
        }
    }

    pub fn clean_up_dismiss_target(&mut self) {
        self.target = None;
        self.stuck = false;
        self.fade_timer.cancel();
        self.visibility = TargetVisibility::Hidden;
    }

    /// First refusal on a pointer event.
    pub fn maybe_consume_motion_event(
        &mut self,
        event: &PointerEvent,
        touch: &TouchState,
    ) -> ZoneDecision {
        let Some(target) = self.target else {
            return ZoneDecision::Declined;
        };
        let inside = target.contains(event.position());

        match event.phase {
            PointerPhase::Down if inside => ZoneDecision::Consumed,
            PointerPhase::Move if inside && touch.is_dragging() => {
                if self.stuck {
                    ZoneDecision::Consumed
                } else {
                    self.stuck = true;
                    debug!("Surface captured by dismiss target");
                    ZoneDecision::Captured
                }
            }
            PointerPhase::Move if self.stuck => {
                self.stuck = false;
                debug!("Surface dragged out of dismiss target");
                ZoneDecision::Escaped
            }
            PointerPhase::Up if self.stuck || (inside && touch.is_dragging()) => {
                self.stuck = false;
                let velocity = touch.current_velocity();
                if velocity.length() >= self.escape_velocity {
                    debug!("Surface flung out of dismiss target at {velocity}");
                    ZoneDecision::Escaped
                } else {
                    info!("Surface released on dismiss target");
                    ZoneDecision::Dismissed
                }
            }
            PointerPhase::Cancel if self.stuck => {
                self.stuck = false;
                ZoneDecision::Escaped
            }
            _ => ZoneDecision::Declined,
        }
    }

    pub fn show_dismiss_target_maybe<H: Host>(&mut self, now: Nanos, host: &mut H) {
        if self.target.is_none()
            || matches!(
                self.visibility,
                TargetVisibility::Shown | TargetVisibility::FadingIn
            )
        {
            return;
        }
        self.visibility = TargetVisibility::FadingIn;
        self.fade_timer
            .schedule(now + nanos(DISMISS_TRANSITION_DURATION));
        host.fade_dismiss_target(true, DISMISS_TRANSITION_DURATION);
    }

    pub fn hide_dismiss_target_maybe<H: Host>(&mut self, now: Nanos, host: &mut H) {
        if matches!(
            self.visibility,
            TargetVisibility::Hidden | TargetVisibility::FadingOut
        ) {
            return;
        }
        self.visibility = TargetVisibility::FadingOut;
        self.fade_timer
            .schedule(now + nanos(DISMISS_TRANSITION_DURATION));
        host.fade_dismiss_target(false, DISMISS_TRANSITION_DURATION);
    }

    pub fn fade_deadline(&self) -> Option<Nanos> {
        self.fade_timer.deadline()
    }

    /// Complete the current fade if it is due; returns its deadline.
    pub fn poll_fade(&mut self, now: Nanos) -> Option<Nanos> {
        let deadline = self.fade_timer.poll(now)?;
        self.visibility = match self.visibility {
            TargetVisibility::FadingIn => TargetVisibility::Shown,
            TargetVisibility::FadingOut => TargetVisibility::Hidden,
            settled => settled,
        };
        Some(deadline)
    }
}
