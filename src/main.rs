use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use altar_core::engine::{Engine, RunConfig, StopSignal};
use altar_core::error::ConfigError;
use altar_core::logger::{self, Level};
use altar_core::platform::{create_platform, hotkey};
use altar_core::sampler;
use altar_core::settings::{Profile, Settings};
use altar_core::types::Coordinate;

#[derive(Parser)]
#[command(name = "altar", version, about = "Drag matching slots to a drop zone and confirm")]
struct Cli {
    /// Use the stub platform (no screen capture, no real input)
    #[arg(long, global = true)]
    stub: bool,

    /// Log at debug level regardless of settings
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true, default_value = "settings.json")]
    settings: PathBuf,

    #[arg(long, global = true, default_value = "profile.json")]
    profile: PathBuf,

    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Tui,
    /// Run the loop without a dashboard until the stop hotkey is pressed
    Run,
    /// Print the colors currently at the given x,y coordinates
    Probe {
        #[arg(required = true, value_parser = parse_coord)]
        coords: Vec<Coordinate>,
    },
}

fn parse_coord(s: &str) -> Result<Coordinate, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok(Coordinate::new(x, y))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.settings);
    let level = if cli.debug { Level::Debug } else { settings.message_level };
    logger::init(&cli.log_dir, level)
        .with_context(|| format!("opening log file in {}", cli.log_dir.display()))?;

    // First launch: leave an editable copy of the defaults
    if !cli.settings.exists() {
        match settings.save(&cli.settings) {
            Ok(()) => logger::info(&format!("wrote default settings to {}", cli.settings.display())),
            Err(e) => logger::warn(&format!("{:#}", e)),
        }
    }

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui(cli.stub, load_config(&cli.profile, &settings)),
        Command::Run => run_headless(cli.stub, load_config(&cli.profile, &settings)),
        Command::Probe { coords } => probe(cli.stub, &coords),
    }
}

/// A missing profile is reported the same way as an incomplete one.
fn load_config(path: &Path, settings: &Settings) -> Result<RunConfig, ConfigError> {
    let profile = match Profile::load(path) {
        Ok(p) => p,
        Err(e) => {
            logger::warn(&format!("{:#}", e));
            Profile::default()
        }
    };
    profile.to_run_config(settings)
}

fn run_tui(force_stub: bool, config: Result<RunConfig, ConfigError>) -> Result<()> {
    let (log_tx, log_rx) = mpsc::channel::<String>();
    logger::set_tui_sender(log_tx);
    logger::info("altar started");
    if let Err(e) = &config {
        logger::warn(&format!("profile not usable: {}", e));
    }

    let hotkey_signal = StopSignal::new();
    hotkey::start_hotkey_listener(hotkey_signal.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = altar_tui::App::new(
        Arc::new(Engine::default()),
        config,
        force_stub,
        hotkey_signal,
        log_rx,
    );
    let result = altar_tui::event::run(&mut terminal, &mut app);

    // Restore terminal
    logger::clear_tui_sender();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn run_headless(force_stub: bool, config: Result<RunConfig, ConfigError>) -> Result<()> {
    let config = config.context("profile not usable")?;

    // Mirror log lines to stdout in place of the log panel
    let (log_tx, log_rx) = mpsc::channel::<String>();
    logger::set_tui_sender(log_tx);
    let printer = thread::spawn(move || {
        for line in log_rx {
            let parts: Vec<&str> = line.splitn(5, '\x1f').collect();
            match parts.as_slice() {
                [level, prefix, _, ts, msg] if prefix.is_empty() => println!("{} {:<5} {}", ts, level, msg),
                [level, prefix, _, ts, msg] => println!("{} {:<5} [{}] {}", ts, level, prefix, msg),
                _ => println!("{}", line),
            }
        }
    });

    let hotkey_signal = StopSignal::new();
    hotkey::start_hotkey_listener(hotkey_signal.clone());
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        logger::info(&format!("press {} to stop", hotkey::hotkey_label()));
    }

    let engine = Engine::default();
    let mut platform = create_platform(force_stub)?;
    logger::info(&format!("running on the {} platform", platform.name()));
    let summary = engine.run(platform.as_mut(), &config, || hotkey_signal.is_set());

    logger::clear_tui_sender();
    if printer.join().is_err() {
        eprintln!("log printer panicked");
    }
    println!("{}", summary);
    if summary.is_failure() {
        bail!("run ended abnormally");
    }
    Ok(())
}

fn probe(force_stub: bool, coords: &[Coordinate]) -> Result<()> {
    let mut platform = create_platform(force_stub)?;
    let samples = sampler::sample_batch(platform.as_mut(), coords);
    for (c, sample) in coords.iter().zip(samples) {
        match sample {
            Ok(color) => println!("{:<14} {}  {{ \"r\": {}, \"g\": {}, \"b\": {} }}", c.to_string(), color, color.r, color.g, color.b),
            Err(e) => println!("{:<14} unavailable: {}", c.to_string(), e),
        }
    }
    Ok(())
}
