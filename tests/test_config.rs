//! Tests for `pipgestr::config` - TOML parsing, threshold merging,
//! feature inheritance, device filtering, and error handling.

use std::io::Write;
use tempfile::NamedTempFile;

use pipgestr::config::{AppConfig, Features, parse_config_file, parse_config_str};
use pipgestr::geometry::Rect;

// ── Helpers ──────────────────────────────────────────────────

/// All required thresholds as a TOML snippet for embedding in test configs.
const ALL_THRESHOLDS: &str = r#"
[global.thresholds]
touch_slop = 24.0
double_tap_timeout = 0.3
double_tap_slop = 100.0
hover_exit_timeout = 0.05
max_fling_velocity = 8000.0
dismiss_escape_velocity = 750.0
dismiss_target_size = 144.0
dismiss_target_bottom_margin = 72.0
bottom_offset_buffer = 16.0
expanded_shortest_edge = 540.0
ime_offset = 48.0
"#;

/// Write TOML to a temp file and parse it. Optionally prepends global thresholds.
fn load(toml_content: &str, with_thresholds: bool) -> AppConfig {
    let full = if with_thresholds {
        format!("{ALL_THRESHOLDS}\n{toml_content}")
    } else {
        toml_content.to_string()
    };
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(full.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap()
}

/// Parse raw TOML that is expected to fail.
fn load_err(toml_content: &str) -> String {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap_err().to_string()
}

const TABLET: &str = r#"
[device.tablet]
device_usb_id = "1234:5678"
enabled = true
display_width = 1600
display_height = 2560
"#;

// ── Error handling ───────────────────────────────────────────

#[test]
fn test_file_not_found() {
    let msg = parse_config_file(std::path::Path::new("/no/such/file.toml"))
        .unwrap_err()
        .to_string();
    assert!(msg.contains("Failed to read config file"));
    assert!(msg.contains("/no/such/file.toml"));
}

#[test]
fn test_invalid_toml() {
    let msg = load_err("this is not valid toml [[[");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_wrong_value_type() {
    let msg = load_err("[global.thresholds]\ntouch_slop = \"wide\"\n");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_device_missing_thresholds_lists_field_names() {
    let msg = load_err(
        r#"
[global.thresholds]
touch_slop = 24.0

[device.d1]
device_usb_id = "1234:5678"
enabled = true
display_width = 1080
display_height = 1920
"#,
    );
    assert!(msg.contains("'d1'"));
    assert!(msg.contains("double_tap_timeout"));
    assert!(msg.contains("ime_offset"));
    assert!(!msg.contains("touch_slop"));
}

#[test]
fn test_device_without_display_size_is_an_error() {
    let msg = load_err(&format!(
        "{ALL_THRESHOLDS}\n[device.d1]\ndevice_usb_id = \"1234:5678\"\nenabled = true\ndisplay_width = 1080\n"
    ));
    assert!(msg.contains("'d1'"));
    assert!(msg.contains("display_height"));
}

// ── Empty / minimal configs ──────────────────────────────────

#[test]
fn test_empty_config() {
    let config = load("", false);
    assert_eq!(config.log_level, "info");
    assert!(config.log_file.is_none());
    assert!(config.devices.is_empty());
    assert!(config.global.is_none());
}

#[test]
fn test_global_settings_error_names_missing_thresholds() {
    let config = load("[global.thresholds]\ntouch_slop = 8.0\n", false);
    let msg = config.global_settings().unwrap_err().to_string();
    assert!(msg.contains("'global'"));
    assert!(msg.contains("max_fling_velocity"));
    assert!(!msg.contains("touch_slop"));
}

#[test]
fn test_global_thresholds_only() {
    let config = load("", true);
    let settings = config.global_settings().unwrap();
    assert_eq!(settings.thresholds.touch_slop, 24.0);
    assert_eq!(settings.thresholds.double_tap_timeout, 0.3);
    assert_eq!(settings.thresholds.expanded_shortest_edge, 540.0);
    assert_eq!(settings.features, Features::default());
}

#[test]
fn test_log_settings() {
    let config = load("[global]\nlog_level = \"debug\"\nlog_file = \"/tmp/pip.log\"\n", true);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_file.as_deref(), Some("/tmp/pip.log"));
}

#[test]
fn test_parse_config_str_matches_file() {
    let text = format!("{ALL_THRESHOLDS}\n{TABLET}");
    let from_str = parse_config_str(&text, std::path::Path::new("inline.toml")).unwrap();
    let from_file = load(TABLET, true);
    assert_eq!(
        from_str.devices["tablet"].settings,
        from_file.devices["tablet"].settings
    );
}

// ── Features ─────────────────────────────────────────────────

#[test]
fn test_feature_defaults() {
    let features = Features::default();
    assert!(!features.enable_stash);
    assert!(features.enable_resize_for_menu);
    assert!(!features.pinch_to_zoom);
}

#[test]
fn test_global_features_override_defaults() {
    let config = load("[global.features]\nenable_stash = true\n", true);
    let features = config.global_settings().unwrap().features;
    assert!(features.enable_stash);
    assert!(features.enable_resize_for_menu);
}

#[test]
fn test_device_features_inherit_and_override() {
    let config = load(
        &format!(
            "[global.features]\nenable_stash = true\npinch_to_zoom = true\n{TABLET}\n\
             [device.tablet.features]\npinch_to_zoom = false\n"
        ),
        true,
    );
    let features = config.devices["tablet"].settings.features;
    assert!(features.enable_stash);
    assert!(!features.pinch_to_zoom);
    assert!(features.enable_resize_for_menu);
}

// ── Devices ──────────────────────────────────────────────────

#[test]
fn test_device_parsed() {
    let config = load(TABLET, true);
    let tablet = &config.devices["tablet"];
    assert_eq!(tablet.device_usb_id, "1234:5678");
    assert_eq!(tablet.display, Rect::new(0, 0, 1600, 2560));
}

#[test]
fn test_device_threshold_override() {
    let config = load(
        &format!("{TABLET}\n[device.tablet.thresholds]\ntouch_slop = 32.0\n"),
        true,
    );
    let thresholds = &config.devices["tablet"].settings.thresholds;
    assert_eq!(thresholds.touch_slop, 32.0);
    assert_eq!(thresholds.double_tap_slop, 100.0);
}

#[test]
fn test_device_complete_without_global() {
    let device_thresholds = ALL_THRESHOLDS.replace("[global.thresholds]", "[device.tablet.thresholds]");
    let config = load(&format!("{TABLET}\n{device_thresholds}"), false);
    assert!(config.devices.contains_key("tablet"));
    assert!(config.global.is_none());
}

#[test]
fn test_disabled_device_skipped() {
    let config = load(
        r#"
[device.off]
device_usb_id = "1234:5678"
enabled = false
"#,
        true,
    );
    assert!(config.devices.is_empty());
}

#[test]
fn test_device_enabled_defaults_to_false() {
    let config = load("[device.quiet]\ndevice_usb_id = \"1234:5678\"\n", true);
    assert!(config.devices.is_empty());
}

#[test]
fn test_device_without_usb_id_skipped() {
    let config = load(
        r#"
[device.anon]
enabled = true
display_width = 1080
display_height = 1920

[device.blank]
device_usb_id = ""
enabled = true
display_width = 1080
display_height = 1920
"#,
        true,
    );
    assert!(config.devices.is_empty());
}

#[test]
fn test_multiple_devices() {
    let config = load(
        &format!(
            "{TABLET}\n[device.phone]\ndevice_usb_id = \"abcd:ef01\"\nenabled = true\n\
             display_width = 1080\ndisplay_height = 2400\n"
        ),
        true,
    );
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices["phone"].display.height(), 2400);
}
