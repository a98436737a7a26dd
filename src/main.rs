// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use improvement_viewer::{
    validate_identifier, Cli, Command, LoadError, Month, SheetsStore, Workflow, VERSION,
};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    info!("Starting improvement-viewer v{}", VERSION);

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let store = {
        let _guard = runtime.enter();
        SheetsStore::new(&cli.store).context("Failed to build entry store client")?
    };
    let store_url = store.web_app_url().to_string();
    let workflow = Workflow::new(Arc::new(store));

    match cli.command() {
        Command::View => run_ui_mode(&runtime, workflow),
        Command::Ping => runtime.block_on(run_ping(&workflow, &store_url)),
        Command::Status { id, month } => runtime.block_on(run_status(&workflow, &id, month)),
        Command::History { id } => runtime.block_on(run_history(&workflow, &id)),
        Command::Entries { month } => runtime.block_on(run_entries(&workflow, month)),
    }
}

/// Log to a file: the viewer owns the terminal
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run_ping(workflow: &Workflow, url: &str) -> Result<()> {
    println!("🔍 Testing connection to {}", url);
    workflow
        .store()
        .ping()
        .await
        .context("Connection test failed")?;
    println!("✅ Entry store is reachable");
    Ok(())
}

async fn run_status(workflow: &Workflow, id: &str, month: Month) -> Result<()> {
    if !validate_identifier(id) {
        bail!("ID Number must be exactly 8 digits.");
    }

    let status = workflow.registration_status(id, month).await;
    println!("{}", status.message);
    if let Some(date) = &status.registration_date {
        println!("Registered at: {}", date);
    }
    Ok(())
}

async fn run_history(workflow: &Workflow, id: &str) -> Result<()> {
    let rows = workflow
        .registrations_by_id(id)
        .await
        .context("Failed to fetch registration history")?;

    println!("Found {} registration(s) for ID {}", rows.len(), id);
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn run_entries(workflow: &Workflow, month: Month) -> Result<()> {
    match workflow.load_entries(month).await {
        Ok(entries) => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        Err(e @ LoadError::NoEntries(_)) => {
            eprintln!("{}", e.user_message());
            Ok(())
        }
        Err(e) => Err(e).context("Failed to load entries"),
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(runtime: &Runtime, workflow: Workflow) -> Result<()> {
    let mut app = ui::App::new(workflow);
    ui::run_ui(&mut app, runtime)?;

    info!("UI closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_runtime: &Runtime, _workflow: Workflow) -> Result<()> {
    eprintln!("❌ Interactive mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a query command: ping, status, history, entries");
    std::process::exit(1);
}
