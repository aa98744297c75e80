//! Multi-device input manager and device discovery (I/O layer).
//!
//! Each configured touchscreen gets its own thread and its own controller.
//! Pure event-processing logic lives in [`crate::event`].
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use evdev::{AbsoluteAxisType, Device};
use log::{debug, error, info, warn};

use crate::config::{AppConfig, DeviceConfig, parse_config_file};
use crate::error::PipError;
use crate::event::{
    PointerAssembler, RawTouchEvent, classify_event, clock_now, event_time, parse_usb_id,
    process_touch_events,
};
use crate::scheduler::Nanos;
use crate::sim::{self, SimController};

const MAX_RECONNECT_ATTEMPTS: usize = 10;
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
/// Longest wait for input before the running flag is checked again.
const IDLE_WAIT: Duration = Duration::from_millis(250);

type Batch = Vec<(RawTouchEvent, Nanos)>;

// -- PipManager (top-level orchestrator) ----------------------

pub struct PipManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
}

impl PipManager {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, PipError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start listening to all configured devices. Blocks until every device
    /// thread has exited.
    pub fn start(&mut self) -> Result<(), PipError> {
        if self.config.devices.is_empty() {
            error!("No devices configured");
            return Ok(());
        }

        self.running.store(true, Ordering::Relaxed);
        info!("Starting input manager");

        let mut handles = Vec::new();
        for (device_id, device_config) in &self.config.devices {
            let Some(device) = find_device(device_id, device_config) else {
                warn!("Device not found: {device_id}");
                continue;
            };
            let device_id = device_id.clone();
            let config = device_config.clone();
            let running = Arc::clone(&self.running);

            let handle = thread::Builder::new()
                .name(format!("pip-{device_id}"))
                .spawn(move || run_device_loop(&device_id, device, &config, &running))
                .map_err(|e| PipError::HostUnavailable(format!("device thread: {e}")))?;
            handles.push(handle);
        }

        if handles.is_empty() {
            error!("No devices found, exiting");
            return Ok(());
        }

        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Shared flag for signal handling; clearing it stops every device loop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

// -- Device I/O -----------------------------------------------

fn is_touch_device(device: &Device) -> bool {
    let Some(abs_axes) = device.supported_absolute_axes() else {
        return false;
    };
    abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
        && abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
}

/// Find a touchscreen device by USB vendor:product ID.
fn find_device(device_id: &str, config: &DeviceConfig) -> Option<Device> {
    let Some((vendor, product)) = parse_usb_id(&config.device_usb_id) else {
        warn!(
            "Device {device_id}: invalid USB ID format '{}' (expected vendor:product)",
            config.device_usb_id
        );
        return None;
    };

    let found = evdev::enumerate().find(|(_, device)| {
        let id = device.input_id();
        is_touch_device(device) && id.vendor() == vendor && id.product() == product
    });
    match found {
        Some((path, device)) => {
            info!(
                "Found {device_id} by USB ID {}: {} ({})",
                config.device_usb_id,
                device.name().unwrap_or("unknown"),
                path.display()
            );
            Some(device)
        }
        None => {
            warn!(
                "Device {device_id}: no touch device with USB ID {} found",
                config.device_usb_id
            );
            None
        }
    }
}

/// Build the assembler from the device's axis ranges and the controller for
/// its display, then run until stopped.
fn run_device_loop(device_id: &str, device: Device, config: &DeviceConfig, running: &AtomicBool) {
    let display = config.display;
    let mut controller =
        sim::pinned_controller(config.settings.clone(), display, sim::default_surface(display));
    sim::settle(&mut controller);

    let mut device = Some(device);
    let mut attempt = 0;
    while running.load(Ordering::Relaxed) {
        let Some(current) = device.take() else {
            attempt += 1;
            if attempt > MAX_RECONNECT_ATTEMPTS {
                error!(
                    "Failed to reconnect to {device_id} after {MAX_RECONNECT_ATTEMPTS} attempts"
                );
                return;
            }
            info!("Reconnect attempt {attempt}/{MAX_RECONNECT_ATTEMPTS} for {device_id}...");
            thread::sleep(RECONNECT_INTERVAL);
            device = find_device(device_id, config);
            continue;
        };

        let Some(mut assembler) = assembler_for(device_id, &current, config) else {
            return;
        };
        if attempt > 0 {
            info!("Reconnected to {device_id}");
            attempt = 0;
        }
        info!(
            "Started processing device: {device_id} (USB {})",
            config.device_usb_id
        );

        let input = match spawn_reader(device_id, current) {
            Ok(input) => input,
            Err(e) => {
                error!("Device {device_id}: {e}");
                return;
            }
        };
        if let Err(e) = event_loop(device_id, &input, &mut assembler, &mut controller, running) {
            if running.load(Ordering::Relaxed) {
                warn!("Device {device_id} disconnected: {e}");
                // A half-finished touch would never see its UP.
                controller.on_activity_unpinned(true);
                controller.on_activity_pinned();
            }
        }
    }
}

fn assembler_for(device_id: &str, device: &Device, config: &DeviceConfig) -> Option<PointerAssembler> {
    let abs = match device.get_abs_state() {
        Ok(state) => state,
        Err(e) => {
            error!("Device {device_id} failed to get abs state: {e}");
            return None;
        }
    };
    let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    debug!(
        "  X range: {}..{}, Y range: {}..{}",
        x.minimum, x.maximum, y.minimum, y.maximum
    );
    Some(PointerAssembler::new(
        (x.minimum, x.maximum),
        (y.minimum, y.maximum),
        config.display,
    ))
}

/// Move the device onto its own thread, which blocks in `fetch_events` and
/// forwards each classified batch. It exits after the first read error or
/// once the receiving loop is gone.
fn spawn_reader(device_id: &str, device: Device) -> Result<Receiver<io::Result<Batch>>, PipError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("pip-{device_id}-input"))
        .spawn(move || read_batches(device, &tx))
        .map_err(|e| PipError::HostUnavailable(format!("input thread: {e}")))?;
    Ok(rx)
}

fn read_batches(mut device: Device, tx: &Sender<io::Result<Batch>>) {
    loop {
        let batch = device.fetch_events().map(|events| {
            events
                .filter_map(|event| classify_event(&event).map(|raw| (raw, event_time(&event))))
                .collect::<Batch>()
        });
        let failed = batch.is_err();
        if tx.send(batch).is_err() || failed {
            return;
        }
    }
}

/// How long to wait for input before the earliest timer is due.
fn wait_for(deadline: Option<Nanos>, now: Nanos) -> Duration {
    match deadline {
        Some(deadline) => Duration::from_nanos(deadline.saturating_sub(now)).min(IDLE_WAIT),
        None => IDLE_WAIT,
    }
}

/// Event loop. Pending timers fire at their deadline even without input.
fn event_loop(
    device_id: &str,
    input: &Receiver<io::Result<Batch>>,
    assembler: &mut PointerAssembler,
    controller: &mut SimController,
    running: &AtomicBool,
) -> io::Result<()> {
    while running.load(Ordering::Relaxed) {
        let timeout = wait_for(controller.next_timer_deadline(), clock_now());
        let batch = match input.recv_timeout(timeout) {
            Ok(batch) => batch?,
            Err(RecvTimeoutError::Timeout) => {
                controller.on_tick(clock_now());
                for gesture in controller.take_resolved() {
                    debug!("{device_id}: {gesture}");
                }
                sim::settle(controller);
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "input thread stopped",
                ));
            }
        };
        if let Some(&(_, first)) = batch.first() {
            controller.on_tick(first.saturating_sub(1));
        }

        for gesture in process_touch_events(assembler, controller, &batch) {
            debug!("{device_id}: {gesture}");
        }
        sim::settle(controller);
    }
    Ok(())
}

/// List all multi-touch capable devices.
pub fn list_touch_devices() -> ExitCode {
    println!("\n=== pipgestr: Available Touchscreen Devices ===\n");
    let mut touch_count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }

        touch_count += 1;
        println!(
            "Device {touch_count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
        );
    }

    if touch_count == 0 {
        println!(
            "No multi-touch devices found.\n\n\
             Troubleshooting:\n\
             \x20 - Check if touchscreen is connected\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {touch_count} touch device(s).\n\n\
         Add the USB ID and display size to your pipgestr.toml:\n\
         \x20 [device.<name>]\n\
         \x20 device_usb_id = \"<USB ID>\"\n\
         \x20 enabled = true\n\
         \x20 display_width = <px>\n\
         \x20 display_height = <px>"
    );
    ExitCode::SUCCESS
}
