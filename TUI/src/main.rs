mod action;
mod app;
mod backend;
mod command;
mod config;
mod controller;
mod runtime;
mod session;
mod ui;
mod ui_state;
mod upload;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use action::Action;
use app::App;
use backend::Backend;
use config::Config;
use runtime::Runtime;
use ui::draw;

#[derive(Parser, Debug)]
#[command(name = "redefine", version, about = "Terminal client for the ReDefine image editor")]
struct Cli {
    /// Base URL of the ReDefine backend
    #[arg(long, default_value = "http://127.0.0.1:8000/")]
    server: String,

    /// Progress poll period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Where downloaded results are saved
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Skip the startup health check
    #[arg(long, short = 'o')]
    offline: bool,
}

fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("redefine")
        .join("redefine.log")
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().unwrap_or_else(default_log_file);
    init_logging(&log_file)?;

    let mut config = Config::default();
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms.max(1);
    }

    let backend = Backend::new(&cli.server).with_context(|| format!("invalid --server {}", cli.server))?;
    let server_label = backend.base_url().to_string();
    let download_dir = cli.download_dir.clone().unwrap_or_else(default_download_dir);
    let mut runtime = Runtime::new(
        backend,
        Duration::from_millis(config.poll_interval_ms),
        download_dir,
    )
    .context("starting async runtime")?;

    info!(server = %server_label, log = %log_file.display(), "starting");

    // Setup terminal
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut app = App::new(config, server_label);
    if !cli.offline {
        for effect in app.dispatch(Action::CheckHealth) {
            runtime.execute(effect);
        }
    }

    let result = run_app(&mut terminal, &mut app, &mut runtime, tick_rate);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "ui loop failed");
        eprintln!("Error: {}", e);
    }
    info!("exiting");

    result.map_err(Into::into)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &mut Runtime,
    tick_rate: Duration,
) -> io::Result<()> {
    loop {
        app.tick();

        // Backend completions and poll ticks
        for action in runtime.drain() {
            for effect in app.dispatch(action) {
                runtime.execute(effect);
            }
        }

        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(tick_rate)? {
            let actions = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Paste(text) => app.handle_paste(&text),
                _ => Vec::new(),
            };
            for action in actions {
                for effect in app.dispatch(action) {
                    runtime.execute(effect);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
