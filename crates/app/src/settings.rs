//! Handles settings for the application. Configuration is written in
//! `settings.toml` (or the file given with `--config`) and can be overridden
//! by `LEDGER__<SECTION>__<KEY>` environment variables.
//!
//! ```toml
//! database = { sqlite = "ledger.db" }
//!
//! [app]
//! level = "debug"
//!
//! [server]
//! port = 3000
//! identity = { mode = "signed_token", secret = "..." }
//!
//! [cache]
//! backend = "redis"
//! url = "redis://127.0.0.1:6379/0"
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use engine::cache::{CacheBackend, CacheSettings, CacheTtls};
use serde::Deserialize;
use server::ServerSettings;
use uuid::Uuid;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Parser)]
#[command(name = "ledger", version)]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long, env = "LEDGER_CONFIG")]
    pub config: Option<String>,
    /// Override log level.
    #[arg(long)]
    pub level: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print a signed identity token, for `signed_token` identity mode.
    IssueToken {
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub backend: CacheBackend,
    pub url: String,
    pub connect_timeout_ms: u64,
    pub max_entries: u64,
    pub budgets_ttl_secs: u64,
    pub report_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        let backend = CacheSettings::default();
        let ttls = CacheTtls::default();
        Self {
            backend: backend.backend,
            url: backend.url,
            connect_timeout_ms: backend.connect_timeout_ms,
            max_entries: backend.max_entries,
            budgets_ttl_secs: ttls.budgets.as_secs(),
            report_ttl_secs: ttls.report.as_secs(),
        }
    }
}

impl Cache {
    pub fn backend(&self) -> CacheSettings {
        CacheSettings {
            backend: self.backend.clone(),
            url: self.url.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            max_entries: self.max_entries,
        }
    }

    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            budgets: Duration::from_secs(self.budgets_ttl_secs),
            report: Duration::from_secs(self.report_ttl_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: ServerSettings,
    pub database: Database,
    pub cache: Cache,
}

impl Settings {
    pub fn load(args: &Args) -> Result<Self> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(config_path).required(args.config.is_some()))
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(level) = &args.level {
            settings.app.level = level.clone();
        }
        Ok(settings)
    }
}
