//! Configuration data structures and TOML parsing.
//!
//! The config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [global.thresholds]
//! touch_slop = 24.0
//! double_tap_timeout = 0.3
//! double_tap_slop = 100.0
//! hover_exit_timeout = 0.05
//! max_fling_velocity = 8000.0
//! dismiss_escape_velocity = 750.0
//! dismiss_target_size = 144.0
//! dismiss_target_bottom_margin = 72.0
//! bottom_offset_buffer = 16.0
//! expanded_shortest_edge = 540.0
//! ime_offset = 48.0
//!
//! [global.features]
//! enable_stash = true
//!
//! [device.tablet]
//! device_usb_id = "1234:5678"
//! enabled = true
//! display_width = 1600
//! display_height = 2560
//!
//! [device.tablet.thresholds]
//! touch_slop = 32.0
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::PipError;
use crate::geometry::Rect;

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    #[serde(default)]
    device: HashMap<String, RawDevice>,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default)]
    thresholds: RawThresholds,
    #[serde(default)]
    features: RawFeatures,
}

/// Threshold values - all optional so device sections can partially override.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawThresholds {
    touch_slop: Option<f64>,
    double_tap_timeout: Option<f64>,
    double_tap_slop: Option<f64>,
    hover_exit_timeout: Option<f64>,
    max_fling_velocity: Option<f64>,
    dismiss_escape_velocity: Option<f64>,
    dismiss_target_size: Option<f64>,
    dismiss_target_bottom_margin: Option<f64>,
    bottom_offset_buffer: Option<f64>,
    expanded_shortest_edge: Option<f64>,
    ime_offset: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawFeatures {
    enable_stash: Option<bool>,
    enable_resize_for_menu: Option<bool>,
    pinch_to_zoom: Option<bool>,
}

/// A `[device.<id>]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    device_usb_id: Option<String>,
    enabled: Option<bool>,
    display_width: Option<u32>,
    display_height: Option<u32>,
    #[serde(default)]
    thresholds: RawThresholds,
    #[serde(default)]
    features: RawFeatures,
}

/// Fully validated thresholds - all values guaranteed to be present.
///
/// Distances are in pixels, durations in seconds, velocities in px/s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedThresholds {
    pub touch_slop: f64,
    pub double_tap_timeout: f64,
    pub double_tap_slop: f64,
    pub hover_exit_timeout: f64,
    pub max_fling_velocity: f64,
    pub dismiss_escape_velocity: f64,
    pub dismiss_target_size: f64,
    pub dismiss_target_bottom_margin: f64,
    pub bottom_offset_buffer: f64,
    pub expanded_shortest_edge: f64,
    pub ime_offset: f64,
}

/// Optional behaviours of the floating surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Release past a horizontal display edge tucks the surface away.
    pub enable_stash: bool,
    /// Opening the full menu grows the surface to its expanded size.
    pub enable_resize_for_menu: bool,
    /// Double-tap toggles expanded/normal size instead of going full screen.
    pub pinch_to_zoom: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            enable_stash: false,
            enable_resize_for_menu: true,
            pinch_to_zoom: false,
        }
    }
}

/// Everything the interaction controller is tuned by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSettings {
    pub thresholds: ValidatedThresholds,
    pub features: Features,
}

/// Configuration for a single touch device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub device_usb_id: String,
    pub display: Rect,
    pub settings: InteractionSettings,
}

/// Top-level parsed configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    /// Global settings, present when the global thresholds are complete.
    pub global: Option<InteractionSettings>,
    pub devices: HashMap<String, DeviceConfig>,
    global_missing: Vec<&'static str>,
}

impl AppConfig {
    /// Global settings, or an error naming the thresholds `[global]` lacks.
    pub fn global_settings(&self) -> Result<&InteractionSettings, PipError> {
        self.global.as_ref().ok_or_else(|| PipError::MissingThresholds {
            scope: "global".to_string(),
            missing: self.global_missing.join(", "),
        })
    }
}

/// Generate merge and into_validated for threshold fields.
macro_rules! threshold_fields {
    ($($field:ident),+ $(,)?) => {
        impl RawThresholds {
            fn merge_with_fallback(&self, fallback: &RawThresholds) -> RawThresholds {
                RawThresholds {
                    $($field: self.$field.or(fallback.$field),)+
                }
            }

            fn into_validated(self) -> Result<ValidatedThresholds, Vec<&'static str>> {
                let mut missing = Vec::new();
                $(
                    if self.$field.is_none() {
                        missing.push(stringify!($field));
                    }
                )+

                match ($(self.$field,)+) {
                    ($(Some($field),)+) => Ok(ValidatedThresholds { $($field,)+ }),
                    _ => Err(missing),
                }
            }
        }
    };
}

threshold_fields!(
    touch_slop,
    double_tap_timeout,
    double_tap_slop,
    hover_exit_timeout,
    max_fling_velocity,
    dismiss_escape_velocity,
    dismiss_target_size,
    dismiss_target_bottom_margin,
    bottom_offset_buffer,
    expanded_shortest_edge,
    ime_offset,
);

impl RawFeatures {
    /// Field-wise override: `self` wins, then `fallback`, then the defaults.
    fn resolve(&self, fallback: &RawFeatures) -> Features {
        let defaults = Features::default();
        Features {
            enable_stash: self
                .enable_stash
                .or(fallback.enable_stash)
                .unwrap_or(defaults.enable_stash),
            enable_resize_for_menu: self
                .enable_resize_for_menu
                .or(fallback.enable_resize_for_menu)
                .unwrap_or(defaults.enable_resize_for_menu),
            pinch_to_zoom: self
                .pinch_to_zoom
                .or(fallback.pinch_to_zoom)
                .unwrap_or(defaults.pinch_to_zoom),
        }
    }
}

/// Parse TOML config text; `path` is only used in error messages.
pub fn parse_config_str(text: &str, path: &Path) -> Result<AppConfig, PipError> {
    let raw: RawConfig = toml::from_str(text).map_err(|e| PipError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let (global, global_missing) = match raw.global.thresholds.clone().into_validated() {
        Ok(thresholds) => (
            Some(InteractionSettings {
                thresholds,
                features: raw.global.features.resolve(&RawFeatures::default()),
            }),
            Vec::new(),
        ),
        Err(missing) => (None, missing),
    };

    let mut devices = HashMap::new();

    for (device_id, raw_dev) in &raw.device {
        if !raw_dev.enabled.unwrap_or(false) {
            debug!("Device '{device_id}' is not enabled – skipping.");
            continue;
        }

        let Some(usb_id) = raw_dev.device_usb_id.as_deref().filter(|s| !s.is_empty()) else {
            warn!(
                "Device '{device_id}' is enabled but has no device_usb_id – skipping. \
                 Run 'pipgestr --list-devices' to find your USB ID.",
            );
            continue;
        };

        let (Some(width), Some(height)) = (raw_dev.display_width, raw_dev.display_height) else {
            return Err(PipError::MissingDisplay {
                device: device_id.clone(),
            });
        };

        let thresholds = raw_dev
            .thresholds
            .merge_with_fallback(&raw.global.thresholds)
            .into_validated()
            .map_err(|missing| PipError::MissingThresholds {
                scope: device_id.clone(),
                missing: missing.join(", "),
            })?;

        devices.insert(
            device_id.clone(),
            DeviceConfig {
                device_usb_id: usb_id.to_string(),
                display: Rect::new(0, 0, to_px(width), to_px(height)),
                settings: InteractionSettings {
                    thresholds,
                    features: raw_dev.features.resolve(&raw.global.features),
                },
            },
        );
    }

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        global,
        devices,
        global_missing,
    })
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, PipError> {
    let text = fs::read_to_string(path).map_err(|e| PipError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config_str(&text, path)
}

fn to_px(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
