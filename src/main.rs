mod actions;
mod app;
mod backend;
mod config;
mod copy;
mod domain;
mod events;
mod handlers;
mod infra;
mod logging;
mod pane;
mod search;
mod selection;
mod terminal;
mod tree;
mod ui;

use crate::actions::navigate;
use crate::app::{App, BackendEvent, BackendTask};
use crate::backend::worker_loop;
use crate::config::AppConfig;
use crate::domain::PaneSide;
use crate::events::ProgressBus;
use crate::handlers::{handle_backend_event, handle_key_event};
use crate::infra::{FileSystemClient, LocalFileSystem};
use crate::terminal::{Tui, install_panic_hook, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    if let Err(err) = logging::init(&config) {
        eprintln!("logging disabled: {err:#}");
    }

    let client: Arc<dyn FileSystemClient> = Arc::new(LocalFileSystem);
    let home = client
        .home_dir()
        .context("failed to resolve the home directory")?;
    let start = config.start_dir.clone().unwrap_or(home);
    tracing::info!(start = %start.display(), "starting");

    install_panic_hook();
    let mut terminal = setup_terminal()?;

    let run_result = run_app(&mut terminal, config, client, start).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = run_result {
        tracing::error!(error = %format!("{err:#}"), "exited with error");
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    config: AppConfig,
    client: Arc<dyn FileSystemClient>,
    start: PathBuf,
) -> Result<()> {
    let bus = ProgressBus::new();
    let mut app = App::new(config, bus.clone());

    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(client, bus, task_rx, event_tx));

    navigate(&mut app, &task_tx, PaneSide::Left, start.clone())?;
    navigate(&mut app, &task_tx, PaneSide::Right, start)?;

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(&mut app, &task_tx, event)?;
        }
        app.copy.poll_progress();
        app.expire_notice(Instant::now());

        terminal.draw(|frame| ui::draw(frame, &app))?;

        if event::poll(Duration::from_millis(100)).context("event poll failed")?
            && let Event::Key(key) = event::read().context("event read failed")?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(&mut app, key, &task_tx)?;
        }
    }

    if let Err(err) = app.config.save() {
        tracing::warn!(error = %format!("{err:#}"), "failed to save config");
    }

    Ok(())
}
