//! Integration tests for the event-processing logic in `event`.
//!
//! Tests use `RawTouchEvent` directly (no hardware) and also verify
//! `classify_event` with synthetic `evdev::InputEvent`s.
use pipgestr::config::{Features, InteractionSettings, ValidatedThresholds};
use pipgestr::event::{PointerAssembler, RawTouchEvent, classify_event, parse_usb_id, process_touch_events};
use pipgestr::geometry::Rect;
use pipgestr::resolver::GestureResult;
use pipgestr::scheduler::Nanos;
use pipgestr::sim::{self, SimController};
use pipgestr::touch::{PointerEvent, PointerPhase};
use evdev::{AbsoluteAxisType, EventType, InputEvent, Synchronization};

// -- Helpers --------------------------------------------------

fn display() -> Rect {
    Rect::new(0, 0, 1080, 1920)
}

fn ms(value: u64) -> Nanos {
    (1_000 + value) * 1_000_000
}

/// Device axes that map one-to-one onto the display.
fn identity_assembler() -> PointerAssembler {
    PointerAssembler::new((0, 1080), (0, 1920), display())
}

fn controller() -> SimController {
    let settings = InteractionSettings {
        thresholds: ValidatedThresholds {
            touch_slop: 16.0,
            double_tap_timeout: 0.3,
            double_tap_slop: 100.0,
            hover_exit_timeout: 0.05,
            max_fling_velocity: 8000.0,
            dismiss_escape_velocity: 750.0,
            dismiss_target_size: 144.0,
            dismiss_target_bottom_margin: 72.0,
            bottom_offset_buffer: 16.0,
            expanded_shortest_edge: 540.0,
            ime_offset: 48.0,
        },
        features: Features::default(),
    };
    sim::pinned_controller(settings, display(), Rect::new(100, 400, 580, 670))
}

fn contact(x: i32, y: i32, at_ms: u64) -> Vec<(RawTouchEvent, Nanos)> {
    vec![
        (RawTouchEvent::TrackingId(0), ms(at_ms)),
        (RawTouchEvent::PositionX(x), ms(at_ms)),
        (RawTouchEvent::PositionY(y), ms(at_ms)),
        (RawTouchEvent::SynReport, ms(at_ms)),
    ]
}

fn motion(x: i32, y: i32, at_ms: u64) -> Vec<(RawTouchEvent, Nanos)> {
    vec![
        (RawTouchEvent::PositionX(x), ms(at_ms)),
        (RawTouchEvent::PositionY(y), ms(at_ms)),
        (RawTouchEvent::SynReport, ms(at_ms)),
    ]
}

fn lift(at_ms: u64) -> Vec<(RawTouchEvent, Nanos)> {
    vec![
        (RawTouchEvent::FingerUp, ms(at_ms)),
        (RawTouchEvent::SynReport, ms(at_ms)),
    ]
}

/// Shorthand: feed raw events, return the pointer events that came out.
fn assemble(assembler: &mut PointerAssembler, events: &[(RawTouchEvent, Nanos)]) -> Vec<PointerEvent> {
    events
        .iter()
        .filter_map(|&(event, time)| assembler.feed(event, time))
        .collect()
}

// -- PointerAssembler -----------------------------------------

#[test]
fn test_contact_produces_down() {
    let mut assembler = identity_assembler();
    let events = assemble(&mut assembler, &contact(300, 500, 0));
    assert_eq!(events, vec![PointerEvent::new(PointerPhase::Down, 300.0, 500.0, ms(0))]);
    assert!(assembler.is_down());
}

#[test]
fn test_full_contact_lifecycle() {
    let mut assembler = identity_assembler();
    let mut raw = contact(300, 500, 0);
    raw.extend(motion(310, 540, 10));
    raw.extend(lift(20));

    let phases: Vec<_> = assemble(&mut assembler, &raw)
        .iter()
        .map(|event| event.phase)
        .collect();
    assert_eq!(
        phases,
        vec![PointerPhase::Down, PointerPhase::Move, PointerPhase::Up]
    );
    assert!(!assembler.is_down());
}

#[test]
fn test_up_keeps_last_position() {
    let mut assembler = identity_assembler();
    let mut raw = contact(300, 500, 0);
    raw.extend(motion(320, 560, 10));
    raw.extend(lift(20));
    let events = assemble(&mut assembler, &raw);
    assert_eq!(
        events.last(),
        Some(&PointerEvent::new(PointerPhase::Up, 320.0, 560.0, ms(20)))
    );
}

#[test]
fn test_single_axis_update_is_a_move() {
    let mut assembler = identity_assembler();
    assemble(&mut assembler, &contact(300, 500, 0));
    let events = assemble(
        &mut assembler,
        &[
            (RawTouchEvent::PositionY(600), ms(10)),
            (RawTouchEvent::SynReport, ms(10)),
        ],
    );
    assert_eq!(events, vec![PointerEvent::new(PointerPhase::Move, 300.0, 600.0, ms(10))]);
}

#[test]
fn test_axes_scaled_to_display() {
    let mut assembler = PointerAssembler::new((0, 2000), (0, 2000), Rect::new(0, 0, 1000, 500));
    let events = assemble(&mut assembler, &contact(1000, 1000, 0));
    assert_eq!(events[0].position().x, 500.0);
    assert_eq!(events[0].position().y, 250.0);
}

#[test]
fn test_out_of_range_axis_clamped() {
    let mut assembler = PointerAssembler::new((0, 2000), (0, 2000), Rect::new(0, 0, 1000, 500));
    let events = assemble(&mut assembler, &contact(3000, -10, 0));
    assert_eq!(events[0].position().x, 1000.0);
    assert_eq!(events[0].position().y, 0.0);
}

#[test]
fn test_syn_report_only_produces_nothing() {
    let mut assembler = identity_assembler();
    assert!(assemble(&mut assembler, &[(RawTouchEvent::SynReport, ms(0))]).is_empty());
}

#[test]
fn test_finger_up_without_contact_produces_nothing() {
    let mut assembler = identity_assembler();
    assert!(assemble(&mut assembler, &lift(0)).is_empty());
}

#[test]
fn test_motion_without_contact_produces_nothing() {
    let mut assembler = identity_assembler();
    assert!(assemble(&mut assembler, &motion(300, 500, 0)).is_empty());
}

#[test]
fn test_second_tracking_id_while_down_is_not_a_new_down() {
    let mut assembler = identity_assembler();
    assemble(&mut assembler, &contact(300, 500, 0));
    let events = assemble(&mut assembler, &contact(700, 900, 10));
    assert_eq!(events, vec![PointerEvent::new(PointerPhase::Move, 700.0, 900.0, ms(10))]);
}

#[test]
fn test_assembler_ready_after_lift() {
    let mut assembler = identity_assembler();
    let mut raw = contact(300, 500, 0);
    raw.extend(lift(50));
    raw.extend(contact(400, 600, 500));
    let phases: Vec<_> = assemble(&mut assembler, &raw)
        .iter()
        .map(|event| event.phase)
        .collect();
    assert_eq!(
        phases,
        vec![PointerPhase::Down, PointerPhase::Up, PointerPhase::Down]
    );
}

// -- process_touch_events -------------------------------------

#[test]
fn test_raw_tap_arms_double_tap() {
    let mut assembler = identity_assembler();
    let mut controller = controller();
    let mut raw = contact(300, 500, 0);
    raw.extend(lift(50));
    assert_eq!(
        process_touch_events(&mut assembler, &mut controller, &raw),
        vec![GestureResult::DoubleTapArmed]
    );
}

#[test]
fn test_raw_drag_flings() {
    let mut assembler = identity_assembler();
    let mut controller = controller();
    let mut raw = contact(300, 500, 0);
    raw.extend(motion(300, 540, 10));
    raw.extend(motion(300, 580, 20));
    raw.extend(motion(300, 620, 30));
    raw.extend(lift(40));

    let gestures = process_touch_events(&mut assembler, &mut controller, &raw);
    assert!(matches!(gestures.as_slice(), [GestureResult::Flung { .. }]));
}

#[test]
fn test_two_batches_double_tap() {
    let mut assembler = identity_assembler();
    let mut controller = controller();
    let mut first = contact(300, 500, 0);
    first.extend(lift(50));
    let mut second = contact(305, 505, 150);
    second.extend(lift(200));

    let mut gestures = process_touch_events(&mut assembler, &mut controller, &first);
    gestures.extend(process_touch_events(&mut assembler, &mut controller, &second));
    assert_eq!(
        gestures,
        vec![GestureResult::DoubleTapArmed, GestureResult::Fullscreen]
    );
}

#[test]
fn test_empty_batch_no_gesture() {
    let mut assembler = identity_assembler();
    let mut controller = controller();
    assert!(process_touch_events(&mut assembler, &mut controller, &[]).is_empty());
}

// -- classify_event: evdev → RawTouchEvent --------------------

#[test]
fn test_classify_mt_position_x() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_X.0,
        42,
    );
    assert_eq!(classify_event(&ev), Some(RawTouchEvent::PositionX(42)));
}

#[test]
fn test_classify_mt_position_y() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_Y.0,
        99,
    );
    assert_eq!(classify_event(&ev), Some(RawTouchEvent::PositionY(99)));
}

#[test]
fn test_classify_tracking_id_new_finger() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        5,
    );
    assert_eq!(classify_event(&ev), Some(RawTouchEvent::TrackingId(5)));
}

#[test]
fn test_classify_tracking_id_finger_up() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        -1,
    );
    assert_eq!(classify_event(&ev), Some(RawTouchEvent::FingerUp));
}

#[test]
fn test_classify_syn_report() {
    let ev = InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0);
    assert_eq!(classify_event(&ev), Some(RawTouchEvent::SynReport));
}

#[test]
fn test_classify_irrelevant_abs_axis() {
    // ABS_X (single-touch) is not ABS_MT_POSITION_X
    let ev = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 100);
    assert_eq!(classify_event(&ev), None);
}

#[test]
fn test_classify_key_event_ignored() {
    let ev = InputEvent::new(EventType::KEY, 0x14a, 1); // BTN_TOUCH
    assert_eq!(classify_event(&ev), None);
}

// -- parse_usb_id ---------------------------------------------

#[test]
fn test_parse_usb_id_valid() {
    assert_eq!(parse_usb_id("1234:5678"), Some((0x1234, 0x5678)));
}

#[test]
fn test_parse_usb_id_uppercase() {
    assert_eq!(parse_usb_id("ABCD:EF01"), Some((0xABCD, 0xEF01)));
}

#[test]
fn test_parse_usb_id_with_usb_prefix() {
    assert_eq!(parse_usb_id("USB:1234:5678"), Some((0x1234, 0x5678)));
}

#[test]
fn test_parse_usb_id_invalid_no_colon() {
    assert_eq!(parse_usb_id("12345678"), None);
}

#[test]
fn test_parse_usb_id_invalid_hex() {
    assert_eq!(parse_usb_id("ZZZZ:0000"), None);
}

#[test]
fn test_parse_usb_id_empty() {
    assert_eq!(parse_usb_id(""), None);
}
