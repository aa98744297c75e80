//! pipgestr – Gesture handling for floating picture-in-picture surfaces.
//!
//! CLI entry point.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use pipgestr::config::AppConfig;
use pipgestr::error::PipError;
use pipgestr::manager::{PipManager, list_touch_devices};
use pipgestr::trace::{parse_trace_file, run_trace};

#[derive(Parser)]
#[command(
    name = "pipgestr",
    about = "Gesture handling for floating picture-in-picture surfaces"
)]
struct Cli {
    /// Path to configuration file
    #[arg(default_value = "/etc/pipgestr/pipgestr.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List available touchscreen devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Replay a recorded trace with the global settings and print the gestures
    #[arg(short, long, value_name = "TRACE")]
    replay: Option<PathBuf>,
}

/// Simple logger that writes to stderr and optionally to a log file.
struct PipgestrLogger {
    level: LevelFilter,
    file: Option<Mutex<std::fs::File>>,
}

impl Log for PipgestrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("pipgestr")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let line = format!("[{secs} {level} pipgestr] {}\n", record.args());

        eprint!("{line}");

        if let Some(file_mutex) = &self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file_mutex) = &self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// CLI `--verbose` overrides the config file setting.
fn init_logger(verbose: bool, config: &AppConfig) {
    let level: LevelFilter = if verbose {
        LevelFilter::Debug
    } else {
        config.log_level.parse().unwrap_or(LevelFilter::Info)
    };

    let file = config.log_file.as_deref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Mutex::new(file)),
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}");
                None
            }
        }
    });

    if log::set_boxed_logger(Box::new(PipgestrLogger { level, file })).is_ok() {
        log::set_max_level(level);
    }
}

fn replay(config: &AppConfig, trace_path: &Path) -> Result<(), PipError> {
    let settings = config.global_settings()?.clone();
    let trace = parse_trace_file(trace_path)?;
    log::info!(
        "Replaying {} step(s) from {}",
        trace.steps.len(),
        trace_path.display()
    );
    for gesture in run_trace(&trace, settings) {
        println!("{gesture}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_touch_devices();
    }

    // Parse config first (before logger init) so we can read the configured log level.
    let mut manager = match PipManager::new(&cli.config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!(
                "Error: {e}\n\n\
                 To find available touchscreen devices, run:\n\
                 \x20 pipgestr --list-devices"
            );
            return ExitCode::FAILURE;
        }
    };
    init_logger(cli.verbose, manager.config());
    log::info!("Loaded configuration from: {}", cli.config.display());

    if let Some(trace_path) = &cli.replay {
        return match replay(manager.config(), trace_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Graceful shutdown on Ctrl-C
    let running = manager.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::Relaxed);
    }) {
        eprintln!("Error setting Ctrl-C handler: {e}");
        return ExitCode::FAILURE;
    }

    match manager.start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
