//! Single-shot, cancelable timers on the controller's event clock.
//!
//! Timers never run on their own. The owner polls them with the current
//! event time and acts on the ones that came due, which keeps every callback
//! on the same serialized queue as the pointer events.

use std::time::Duration;

use strum::Display;

/// Event-clock timestamp in nanoseconds.
pub type Nanos = u64;

pub fn nanos(duration: Duration) -> Nanos {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Deferred callbacks the controller knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TimerEvent {
    #[strum(serialize = "double_tap_timeout")]
    DoubleTapTimeout,
    #[strum(serialize = "hover_exit_timeout")]
    HoverExitTimeout,
    #[strum(serialize = "dismiss_fade_finished")]
    DismissFadeFinished,
}

/// A single pending deadline. Scheduling replaces whatever was pending.
#[derive(Debug, Default, Clone)]
pub struct OneShotTimer {
    deadline: Option<Nanos>,
}

impl OneShotTimer {
    pub fn schedule(&mut self, deadline: Nanos) {
        self.deadline = Some(deadline);
    }

    /// Returns whether something was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Nanos> {
        self.deadline
    }

    /// Fire if due at `now`; the timer is disarmed when it fires.
    pub fn poll(&mut self, now: Nanos) -> Option<Nanos> {
        let deadline = self.deadline.filter(|&d| d <= now)?;
        self.deadline = None;
        Some(deadline)
    }
}
