//! Recorded input traces: parse a TOML trace and replay it through a
//! simulated controller.
//!
//! ```toml
//! [display]
//! width = 1080
//! height = 1920
//!
//! [surface]          # optional, defaults to a 16:9 surface top-right
//! left = 100
//! top = 400
//! width = 480
//! height = 270
//!
//! [[step]]
//! at_ms = 0
//! action = "down"
//! x = 200.0
//! y = 500.0
//!
//! [[step]]
//! at_ms = 400
//! action = "ime"
//! height = 600       # 0 hides it
//!
//! [[step]]
//! at_ms = 900
//! action = "rotate"
//! rotation = 1
//! ```
//!
//! Actions are the pointer phases (`down`, `move`, `up`, `cancel`,
//! `hover_enter`, `hover_move`, `hover_exit`) plus `tick`, `ime` and `rotate`.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use crate::config::InteractionSettings;
use crate::error::PipError;
use crate::geometry::{PointF, Rect, Size};
use crate::resolver::GestureResult;
use crate::scheduler::Nanos;
use crate::sim;
use crate::touch::{PointerEvent, PointerPhase};

const NANOS_PER_MS: u64 = 1_000_000;

#[derive(Debug, Deserialize)]
struct RawTrace {
    display: RawDisplay,
    surface: Option<RawSurface>,
    #[serde(default)]
    step: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawDisplay {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct RawSurface {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    at_ms: u64,
    action: String,
    x: Option<f32>,
    y: Option<f32>,
    height: Option<i32>,
    rotation: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceAction {
    Pointer(PointerPhase, PointF),
    /// Let time pass with no input.
    Tick,
    Ime { visible: bool, height: i32 },
    Rotate(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStep {
    pub at: Nanos,
    pub action: TraceAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub display: Rect,
    pub surface: Option<Rect>,
    pub steps: Vec<TraceStep>,
}

pub fn parse_trace_str(text: &str) -> Result<Trace, PipError> {
    let raw: RawTrace =
        toml::from_str(text).map_err(|e| PipError::TraceParseError(e.to_string()))?;

    let display = Rect::new(
        0,
        0,
        i32::try_from(raw.display.width).unwrap_or(i32::MAX),
        i32::try_from(raw.display.height).unwrap_or(i32::MAX),
    );
    let surface = raw
        .surface
        .map(|s| Rect::from_origin_size(s.left, s.top, Size::new(s.width, s.height)));

    let mut steps = Vec::with_capacity(raw.step.len());
    let mut last_at = 0;
    for (index, step) in raw.step.iter().enumerate() {
        if step.at_ms < last_at {
            return Err(PipError::TraceParseError(format!(
                "step {index}: at_ms {} goes back in time",
                step.at_ms
            )));
        }
        last_at = step.at_ms;
        steps.push(TraceStep {
            at: step.at_ms.saturating_mul(NANOS_PER_MS),
            action: parse_action(index, step)?,
        });
    }

    Ok(Trace {
        display,
        surface,
        steps,
    })
}

fn parse_action(index: usize, step: &RawStep) -> Result<TraceAction, PipError> {
    match step.action.as_str() {
        "tick" => Ok(TraceAction::Tick),
        "ime" => {
            let height = step.height.unwrap_or(0);
            Ok(TraceAction::Ime {
                visible: height > 0,
                height,
            })
        }
        "rotate" => step.rotation.map(TraceAction::Rotate).ok_or_else(|| {
            PipError::TraceParseError(format!("step {index}: 'rotate' needs a rotation"))
        }),
        other => {
            let phase = PointerPhase::from_str(other).map_err(|_| {
                PipError::TraceParseError(format!("step {index}: unknown action '{other}'"))
            })?;
            let (Some(x), Some(y)) = (step.x, step.y) else {
                return Err(PipError::TraceParseError(format!(
                    "step {index}: '{other}' needs x and y"
                )));
            };
            Ok(TraceAction::Pointer(phase, PointF::new(x, y)))
        }
    }
}

pub fn parse_trace_file(path: &Path) -> Result<Trace, PipError> {
    let text = fs::read_to_string(path).map_err(|e| PipError::TraceReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_trace_str(&text)
}

/// Replay `trace` against a freshly pinned surface and return every gesture
/// committed, in order. Pending timers are flushed at the end.
pub fn run_trace(trace: &Trace, settings: InteractionSettings) -> Vec<GestureResult> {
    let display = trace.display;
    let surface = trace
        .surface
        .unwrap_or_else(|| sim::default_surface(display));
    let mut controller = sim::pinned_controller(settings, display, surface);
    sim::settle(&mut controller);

    let normal = surface.offset_to(0, 0);
    let mut resolved = controller.take_resolved();
    for step in &trace.steps {
        debug!("t={}ms {:?}", step.at / NANOS_PER_MS, step.action);
        match step.action {
            TraceAction::Pointer(phase, position) => {
                let event = PointerEvent::new(phase, position.x, position.y, step.at);
                controller.handle_touch_event(&event);
            }
            TraceAction::Tick => controller.on_tick(step.at),
            TraceAction::Ime { visible, height } => {
                controller.on_tick(step.at);
                controller.on_ime_visibility_changed(visible, height);
                let current = controller.motion().bounds();
                let rotation = controller.display_rotation();
                controller.on_movement_bounds_changed(display, normal, current, true, false, rotation);
            }
            TraceAction::Rotate(rotation) => {
                controller.on_tick(step.at);
                controller.host_mut().rotation = rotation;
                let current = controller.motion().bounds();
                controller.on_movement_bounds_changed(display, normal, current, false, false, rotation);
            }
        }
        sim::settle(&mut controller);
        resolved.extend(controller.take_resolved());
    }

    controller.on_tick(Nanos::MAX);
    sim::settle(&mut controller);
    resolved.extend(controller.take_resolved());
    resolved
}
