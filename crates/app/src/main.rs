use std::time::Duration;

use clap::Parser;
use migration::{Migrator, MigratorTrait, sqlite_url};
use sea_orm::{ConnectOptions, DatabaseConnection};
use server::{IdentitySettings, ServerState, TokenSigner};
use settings::{Args, Command, Database, Settings};

use crate::error::{AppError, Result};

mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::IssueToken { user, ttl_secs } => {
            let IdentitySettings::SignedToken { secret } = &settings.server.identity else {
                return Err(AppError::Usage(
                    "issue-token needs server.identity.mode = \"signed_token\"".to_string(),
                ));
            };
            let token =
                TokenSigner::new(secret.as_bytes()).issue(user, Duration::from_secs(ttl_secs))?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> Result<()> {
    let db = parse_database(&settings.database).await?;
    let cache = engine::cache::select(&settings.cache.backend()).await;
    tracing::info!("cache backend: {}", cache.name());

    let engine = engine::Engine::builder()
        .database(db)
        .cache(cache)
        .ttls(settings.cache.ttls())
        .build()
        .await?;

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let state = ServerState::new(engine, &settings.server);
    server::run_with_listener(state, listener, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn parse_database(config: &Database) -> Result<DatabaseConnection> {
    let mut options = match config {
        Database::Memory => {
            // Every pooled connection would get its own in-memory database.
            let mut options = ConnectOptions::new("sqlite::memory:");
            options.max_connections(1).min_connections(1);
            options
        }
        Database::Sqlite(path) => ConnectOptions::new(sqlite_url(path)),
    };
    options.sqlx_logging(false);

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown requested, draining connections");
}
