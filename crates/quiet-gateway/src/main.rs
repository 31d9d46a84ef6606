use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod app;
mod auth;
mod http;

#[derive(Parser)]
#[command(name = "quiet-gateway", version, about = "Quiet Hours scheduler API and notifier")]
struct Cli {
    /// Path to quiet.toml (defaults to ~/.quiet-hours/quiet.toml).
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server and the notifier engine (default).
    Serve,
    /// Provision a user and print their API token once.
    CreateUser {
        /// Address reminder emails will go to.
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiet_gateway=info,quiet_notify=info,tower_http=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    // Config: explicit flag > QUIET_CONFIG env > ~/.quiet-hours/quiet.toml
    let config_path = cli
        .config
        .or_else(|| std::env::var("QUIET_CONFIG").ok());
    let config = quiet_core::config::QuietConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            warn!("Config load failed ({e}), using defaults");
            quiet_core::config::QuietConfig::default()
        });

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);

    match cli.command.unwrap_or(Command::Serve) {
        Command::CreateUser { email } => create_user(&db_path, &email),
        Command::Serve => serve(config, &db_path).await,
    }
}

fn create_user(db_path: &str, email: &str) -> anyhow::Result<()> {
    let users =
        quiet_users::UserDirectory::new(rusqlite::Connection::open(db_path)?)?;
    let user = users.register(email)?;
    // The token is shown exactly once; it is not recoverable later.
    println!("user id:   {}", user.id);
    println!("email:     {}", user.email);
    println!("api token: {}", user.api_token);
    Ok(())
}

async fn serve(config: quiet_core::config::QuietConfig, db_path: &str) -> anyhow::Result<()> {
    info!(path = %db_path, "opening SQLite database");

    // Each subsystem gets its own connection so the engine's polling never
    // contends with HTTP handler statements.
    let store = Arc::new(quiet_store::BlockStore::new(rusqlite::Connection::open(
        db_path,
    )?)?);
    let users = Arc::new(quiet_users::UserDirectory::new(
        rusqlite::Connection::open(db_path)?,
    )?);

    let client = quiet_notify::provider::default_client()?;
    let providers = quiet_notify::provider::build_providers(&config.providers, &client);
    if providers.is_empty() {
        warn!("no email providers configured; reminders will fail until credentials are set");
    } else {
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        info!(order = ?names, "email providers ready");
    }

    let dispatcher = Arc::new(quiet_notify::Dispatcher::new(
        store.clone(),
        users.clone(),
        providers,
        &config.notify,
    ));

    // Background notifier: ticks until the shutdown flag flips.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine =
        quiet_notify::NotifierEngine::new(dispatcher.clone(), config.notify.interval_secs);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = Arc::new(app::AppState::new(config, store, users, dispatcher));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
    info!(%bind, port, "quiet-gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

/// WAL and the db file itself need the directory to exist first.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
