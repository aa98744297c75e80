//! Raw touch event classification and pointer assembly - no I/O, no
//! hardware, fully testable.
//!
//! Multi-touch protocol B reports arrive as separate axis and tracking-id
//! events closed by `SYN_REPORT`. [`PointerAssembler`] folds each frame into
//! at most one [`PointerEvent`] in display coordinates for the primary
//! contact.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::controller::InteractionController;
use crate::geometry::{PointF, Rect};
use crate::host::{Host, MenuController, MotionApplier};
use crate::resolver::GestureResult;
use crate::scheduler::{Nanos, nanos};
use crate::touch::{PointerEvent, PointerPhase};

// -- RawTouchEvent --------------------------------------------

/// Intermediate representation of a relevant touch event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTouchEvent {
    PositionX(i32),
    PositionY(i32),
    TrackingId(i32),
    FingerUp,
    SynReport,
}

// -- PointerAssembler -----------------------------------------

#[derive(Debug, Clone)]
pub struct PointerAssembler {
    x_range: (i32, i32),
    y_range: (i32, i32),
    display: Rect,
    pending_x: Option<i32>,
    pending_y: Option<i32>,
    position: PointF,
    down: bool,
    new_contact: bool,
    lifted: bool,
}

impl PointerAssembler {
    /// `x_range`/`y_range` are the device's axis minimum and maximum.
    pub fn new(x_range: (i32, i32), y_range: (i32, i32), display: Rect) -> Self {
        Self {
            x_range,
            y_range,
            display,
            pending_x: None,
            pending_y: None,
            position: PointF::ZERO,
            down: false,
            new_contact: false,
            lifted: false,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    /// Feed one raw event. A pointer event comes out only on `SynReport`.
    pub fn feed(&mut self, event: RawTouchEvent, time: Nanos) -> Option<PointerEvent> {
        match event {
            RawTouchEvent::PositionX(x) => self.pending_x = Some(x),
            RawTouchEvent::PositionY(y) => self.pending_y = Some(y),
            RawTouchEvent::TrackingId(_) => {
                if !self.down {
                    self.new_contact = true;
                }
            }
            RawTouchEvent::FingerUp => self.lifted = true,
            RawTouchEvent::SynReport => return self.flush(time),
        }
        None
    }

    fn flush(&mut self, time: Nanos) -> Option<PointerEvent> {
        let moved = self.pending_x.is_some() || self.pending_y.is_some();
        if let Some(x) = self.pending_x.take() {
            self.position.x = scale(x, self.x_range, self.display.left, self.display.width());
        }
        if let Some(y) = self.pending_y.take() {
            self.position.y = scale(y, self.y_range, self.display.top, self.display.height());
        }

        let phase = if self.lifted {
            self.lifted = false;
            self.new_contact = false;
            if !self.down {
                return None;
            }
            self.down = false;
            PointerPhase::Up
        } else if self.new_contact {
            self.new_contact = false;
            self.down = true;
            PointerPhase::Down
        } else if self.down && moved {
            PointerPhase::Move
        } else {
            return None;
        };
        Some(PointerEvent::new(phase, self.position.x, self.position.y, time))
    }
}

/// Map a raw axis value onto `[origin, origin + extent]`.
fn scale(value: i32, (min, max): (i32, i32), origin: i32, extent: i32) -> f32 {
    let span = (max - min).max(1);
    let offset = (value - min).clamp(0, span);
    origin as f32 + (i64::from(offset) * i64::from(extent)) as f32 / span as f32
}

// -- Core processing ------------------------------------------

/// Feed a batch of timestamped raw events through the assembler into the
/// controller and collect the gestures that were committed.
pub fn process_touch_events<M, U, H>(
    assembler: &mut PointerAssembler,
    controller: &mut InteractionController<M, U, H>,
    events: &[(RawTouchEvent, Nanos)],
) -> Vec<GestureResult>
where
    M: MotionApplier,
    U: MenuController,
    H: Host,
{
    for &(event, time) in events {
        if let Some(pointer) = assembler.feed(event, time) {
            controller.handle_touch_event(&pointer);
        }
    }
    controller.take_resolved()
}

// -- Helpers --------------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"` (case-insensitive).
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor, product) = cleaned.split_once(':')?;
    Some((
        u16::from_str_radix(vendor, 16).ok()?,
        u16::from_str_radix(product, 16).ok()?,
    ))
}

/// Event timestamp on the controller clock.
pub fn event_time(event: &evdev::InputEvent) -> Nanos {
    event
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .map(nanos)
        .unwrap_or(0)
}

/// Wall-clock now on the same clock as [`event_time`].
pub fn clock_now() -> Nanos {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(nanos)
        .unwrap_or(0)
}

/// Classify a single `evdev::InputEvent` into one of the touch-relevant
/// categories.  Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<RawTouchEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind};

    match event.kind() {
        InputEventKind::AbsAxis(AbsoluteAxisType::ABS_MT_POSITION_X) => {
            Some(RawTouchEvent::PositionX(event.value()))
        }
        InputEventKind::AbsAxis(AbsoluteAxisType::ABS_MT_POSITION_Y) => {
            Some(RawTouchEvent::PositionY(event.value()))
        }
        InputEventKind::AbsAxis(AbsoluteAxisType::ABS_MT_TRACKING_ID) => {
            if event.value() == -1 {
                Some(RawTouchEvent::FingerUp)
            } else {
                Some(RawTouchEvent::TrackingId(event.value()))
            }
        }
        InputEventKind::Synchronization(evdev::Synchronization::SYN_REPORT) => {
            Some(RawTouchEvent::SynReport)
        }
        _ => None,
    }
}
