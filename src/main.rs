// src/main.rs

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use prism_scan::config::{Settings, StorePath};
use prism_scan::core::aggregator::{WeightProfiles, select_profile};
use prism_scan::core::coordinator::{ScanCoordinator, ScanOutcome, ScanRequest};
use prism_scan::core::scanner::default_registry;
use prism_scan::core::store::ResultStore;
use prism_scan::logging::initialize_logging;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

mod app;
mod ui;

use app::{App, AppState, View};

/// What the background tasks report back to the UI loop.
enum UiEvent {
    ScanFinished(Result<ScanOutcome, String>),
    History(Vec<prism_scan::core::models::ScanRecord>),
}

#[derive(Parser, Debug)]
#[command(name = "prism-scan")]
#[command(version)]
#[command(about = "Passive web page scanner with weighted security and privacy scores.", long_about = None)]
struct Cli {
    /// No sub-command starts the terminal UI.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Weight profile for the headline score (normal, privacy, security, random)
    #[arg(short, long, global = true)]
    profile: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a URL and print the stored record as JSON
    Scan {
        #[arg(required = true)]
        url: String,
    },
    /// Print every stored record, newest first
    List,
    /// Check that a profile name is known
    Profile { name: String },
}

async fn open_store(settings: &Settings) -> Result<ResultStore> {
    let store = match &settings.store {
        StorePath::Memory => ResultStore::in_memory().await?,
        StorePath::File(path) => ResultStore::open(path)
            .await
            .wrap_err_with(|| format!("opening result store at {}", path.display()))?,
    };
    if settings.reset_store {
        let removed = store.clear().await?;
        info!(removed, "Result store reset at start-up.");
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    initialize_logging()?;

    let cli = Cli::parse();

    // Profile names are validated before anything touches the network or disk.
    if let Some(Commands::Profile { name }) = &cli.command {
        let profile = select_profile(name)?;
        println!("{}", profile);
        return Ok(());
    }

    let settings = Settings::from_env();
    info!(?settings, "Starting prism-scan.");
    let store = open_store(&settings).await?;
    let profiles = WeightProfiles::predefined(&mut rand::thread_rng());
    let coordinator = Arc::new(ScanCoordinator::new(
        default_registry(&settings),
        profiles,
        store,
        settings.probe_deadline,
    ));

    match cli.command {
        Some(Commands::Scan { url }) => {
            let request = ScanRequest::parse(&url, cli.profile.as_deref())?;
            let outcome = coordinator.submit(request).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
            Ok(())
        }
        Some(Commands::List) => {
            let records = coordinator.list_all().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        None => {
            let profile = cli.profile.as_deref().map(select_profile).transpose()?.unwrap_or_default();
            run_tui(coordinator, App::new(profile)).await
        }
        Some(Commands::Profile { .. }) => Ok(()),
    }
}

async fn run_tui(coordinator: Arc<ScanCoordinator>, mut app: App) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let (tx, mut rx) = mpsc::channel(8);
    let outcome = event_loop(&mut terminal, &mut app, &coordinator, &tx, &mut rx).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    coordinator: &Arc<ScanCoordinator>,
    tx: &mpsc::Sender<UiEvent>,
    rx: &mut mpsc::Receiver<UiEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app, coordinator, tx)?;
        }
        app.on_tick();

        while let Ok(message) = rx.try_recv() {
            match message {
                UiEvent::ScanFinished(Ok(outcome)) => app.finish_scan(outcome),
                UiEvent::ScanFinished(Err(message)) => app.fail_scan(message),
                UiEvent::History(records) => app.set_history(records),
            }
        }
    }
    Ok(())
}

fn handle_events(
    app: &mut App,
    coordinator: &Arc<ScanCoordinator>,
    tx: &mpsc::Sender<UiEvent>,
) -> Result<()> {
    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    if app.show_disclaimer {
        match key.code {
            KeyCode::Enter => app.show_disclaimer = false,
            KeyCode::Esc => app.quit(),
            _ => {}
        }
        return Ok(());
    }

    match app.state {
        AppState::Idle => handle_idle_input(app, key.code, coordinator, tx),
        AppState::Scanning => {
            if key.code == KeyCode::Esc {
                app.quit();
            }
        }
        AppState::Finished | AppState::Failed(_) => {
            handle_report_input(app, key.code, coordinator, tx)
        }
    }
    Ok(())
}

fn handle_idle_input(
    app: &mut App,
    key_code: KeyCode,
    coordinator: &Arc<ScanCoordinator>,
    tx: &mpsc::Sender<UiEvent>,
) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab => app.cycle_profile(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            let Some(url) = app.target_url() else {
                return;
            };
            app.start_scan();
            let request = ScanRequest::new(url, app.profile);
            let coordinator = Arc::clone(coordinator);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = coordinator.submit(request).await.map_err(|e| {
                    error!(error = %e, "Scan failed.");
                    e.to_string()
                });
                let _ = tx.send(UiEvent::ScanFinished(outcome)).await;
            });
        }
        _ => {}
    }
}

fn handle_report_input(
    app: &mut App,
    key_code: KeyCode,
    coordinator: &Arc<ScanCoordinator>,
    tx: &mpsc::Sender<UiEvent>,
) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('l') => app.toggle_logs(),
        KeyCode::Char('h') => {
            app.toggle_history();
            if app.view == View::History {
                let coordinator = Arc::clone(coordinator);
                let tx = tx.clone();
                tokio::spawn(async move {
                    match coordinator.list_all().await {
                        Ok(records) => {
                            let _ = tx.send(UiEvent::History(records)).await;
                        }
                        Err(e) => error!(error = %e, "Could not load scan history."),
                    }
                });
            }
        }
        KeyCode::Tab => app.cycle_profile(),
        KeyCode::Enter if app.view == View::History => app.open_selected_history(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sub_command_starts_the_tui() {
        let cli = Cli::try_parse_from(["prism-scan"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.profile.is_none());

        let cli = Cli::try_parse_from(["prism-scan", "-p", "security"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.profile.as_deref(), Some("security"));
    }

    #[test]
    fn parses_headless_commands() {
        let cli =
            Cli::try_parse_from(["prism-scan", "scan", "https://example.com", "--profile", "privacy"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Scan { ref url }) if url == "https://example.com"));
        assert_eq!(cli.profile.as_deref(), Some("privacy"));

        let cli = Cli::try_parse_from(["prism-scan", "list"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::List)));

        let cli = Cli::try_parse_from(["prism-scan", "profile", "security"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Profile { ref name }) if name == "security"));
    }

    #[test]
    fn rejects_malformed_invocations() {
        assert!(Cli::try_parse_from(["prism-scan", "scan"]).is_err());
        assert!(Cli::try_parse_from(["prism-scan", "list", "--profile"]).is_err());
        assert!(Cli::try_parse_from(["prism-scan", "explode"]).is_err());
    }
}
