mod config;
mod error;
mod schedule;
mod services;
mod theme;

use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use tokio::runtime::Runtime;

use crate::config::Settings;
use crate::error::ThemeError;
use crate::schedule::Mode;
use crate::services::broadcast::Broadcaster;
use crate::services::engine::ThemeEngine;
use crate::services::store::{FileBackend, ThemeStore};
use crate::theme::applier::ThemeApplier;
use crate::theme::css;
use crate::theme::surface::{DocumentSurface, FileSurface, MemoryDocument};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("themeshift {} - Schedule-driven browser-chrome theme switcher", VERSION);
    println!();
    println!("USAGE:");
    println!("    themeshift [OPTIONS] [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    run                     Run the scheduling loop (default)");
    println!("    status                  Print current schedule and override state");
    println!("    set <MODE> [MINUTES]    Pin a mode manually (day|evening|night)");
    println!("    clear                   Clear a manual override and resume the schedule");
    println!("    css <MODE>              Print the generated stylesheet for a mode");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help              Print help information");
    println!("    -v, --version           Print version information");
    println!("    --browser <ID>          Browser target (edge-canary|opera|orion|generic)");
}

fn print_version() {
    println!("themeshift {}", VERSION);
}

/// Logs timestamped lines to stderr and, when available, to
/// ~/.themeshift/themeshift.log.
struct AppLogger {
    file: Mutex<Option<File>>,
    level: LevelFilter,
}

impl Log for AppLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now();
        let line = format!(
            "[{}][{}][{}] {}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.target(),
            record.level(),
            record.args()
        );
        eprintln!("{}", line);
        if let Ok(mut file) = self.file.lock() {
            if let Some(f) = file.as_mut() {
                let _ = writeln!(f, "{}", line);
            }
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let file = Settings::log_path().and_then(|path| {
        OpenOptions::new().create(true).append(true).open(path).ok()
    });
    let logger = AppLogger {
        file: Mutex::new(file),
        level: LevelFilter::Info,
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

fn build_engine(settings: &Settings) -> Result<ThemeEngine, ThemeError> {
    settings.schedule.validate()?;
    let browser = settings.parsed_browser()?;

    let store = match Settings::state_path() {
        Some(path) => ThemeStore::new(Box::new(FileBackend::new(path))),
        None => ThemeStore::in_memory(),
    };
    let surface: Box<dyn DocumentSurface> = match settings.resolved_output_dir() {
        Some(dir) => Box::new(FileSurface::new(dir)),
        None => Box::new(MemoryDocument::new()),
    };

    let broadcaster = Broadcaster::new();
    let applier = ThemeApplier::new(browser, surface, broadcaster.clone());
    Ok(ThemeEngine::new(
        settings.schedule,
        Duration::from_secs(settings.tick_seconds),
        store,
        applier,
        broadcaster,
    ))
}

fn cmd_run(settings: &Settings) -> Result<(), ThemeError> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mut engine = build_engine(settings)?;

        let mut events = engine.broadcaster().subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                log::info!("{}: {} on {}", event.kind, event.mode, event.browser);
            }
        });

        let mode = engine.initialize().await?;
        println!(
            "themeshift running: {} mode for {} (Ctrl-C to stop)",
            mode, settings.browser
        );
        let _ = tokio::signal::ctrl_c().await;
        engine.shutdown().await;
        Ok(())
    })
}

fn cmd_status(settings: &Settings) -> Result<(), ThemeError> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let engine = build_engine(settings)?;
        let status = engine.status().await;
        println!("browser:         {}", status.browser);
        println!("schedule mode:   {}", status.schedule_mode);
        println!(
            "stored mode:     {}",
            status
                .stored_mode
                .map(|m| m.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
        println!("override active: {}", status.override_active);
        println!(
            "auto loop:       {}",
            if status.auto_running { "running" } else { "stopped" }
        );
        println!(
            "next transition: {} at {} (in {} min)",
            status.next_transition.next_mode,
            status.next_transition.format_clock(),
            status.next_transition.eta_ms / 60_000
        );
        Ok(())
    })
}

fn cmd_set(settings: &Settings, mode_name: &str, minutes: Option<u64>) -> Result<(), ThemeError> {
    let mode = Mode::parse(mode_name)?;
    let minutes = minutes.unwrap_or(settings.override_minutes);
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mut engine = build_engine(settings)?;
        engine
            .set_manually(mode, Duration::from_secs(minutes * 60))
            .await?;
        println!("{} mode pinned for {} minutes", mode, minutes);
        Ok(())
    })
}

fn cmd_clear(settings: &Settings) -> Result<(), ThemeError> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mut engine = build_engine(settings)?;
        let mode = engine.clear_override().await?;
        println!("override cleared, resumed {} mode", mode);
        Ok(())
    })
}

fn cmd_css(settings: &Settings, mode_name: &str) -> Result<(), ThemeError> {
    let mode = Mode::parse(mode_name)?;
    let browser = settings.parsed_browser()?;
    print!("{}", css::render_stylesheet(mode, browser));
    Ok(())
}

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();

    // --browser <ID> overrides the configured target for this invocation
    let mut browser_override = None;
    if let Some(pos) = args.iter().position(|a| a == "--browser") {
        if pos + 1 >= args.len() {
            eprintln!("Error: --browser requires a value");
            std::process::exit(1);
        }
        browser_override = Some(args.remove(pos + 1));
        args.remove(pos);
    }

    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_help();
            return;
        }
        Some("-v") | Some("--version") => {
            print_version();
            return;
        }
        _ => {}
    }

    // Load first: it creates the config directory the log file lives in.
    let mut settings = Settings::load();
    init_logging();
    if let Some(browser) = browser_override {
        settings.browser = browser;
    }

    let result = match args.first().map(String::as_str) {
        None | Some("run") => cmd_run(&settings),
        Some("status") => cmd_status(&settings),
        Some("set") => match args.get(1) {
            Some(mode_name) => {
                let minutes = args.get(2).and_then(|m| m.parse().ok());
                cmd_set(&settings, mode_name, minutes)
            }
            None => {
                eprintln!("Error: set requires a mode (day|evening|night)");
                std::process::exit(1);
            }
        },
        Some("clear") => cmd_clear(&settings),
        Some("css") => match args.get(1) {
            Some(mode_name) => cmd_css(&settings, mode_name),
            None => {
                eprintln!("Error: css requires a mode (day|evening|night)");
                std::process::exit(1);
            }
        },
        Some(unknown) => {
            eprintln!("Error: unknown command '{}'", unknown);
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
