//! CLI command definitions and dispatch.

pub mod config;
pub mod debug;
pub mod fetch;
pub mod login;
pub mod logout;
pub mod open;
pub mod status;
pub mod watch;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::debug;

use insights_auth::{
    AuthSessionManager, CredentialStore, DebugMode, HttpAuthenticator, SystemTimeSource,
    open_backend,
};
use insights_core::config::AppConfig;
use insights_core::events::EventBus;
use insights_core::result::AppResult;

use crate::logging::LogControl;
use crate::output::OutputFormat;
use crate::terminal::{RouteState, TerminalNotifier, TerminalPrompt};

/// Environment variable selecting the configuration overlay.
const ENV_VAR: &str = "INSIGHTS_ENV";

/// Production Insights: dashboard session client
#[derive(Debug, Parser)]
#[command(name = "insights", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and environment overlays
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Configuration overlay to apply (defaults to $INSIGHTS_ENV, then "development")
    #[arg(short, long)]
    pub env: Option<String>,

    /// Route the session is viewed from
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in with a personal number and password
    Login(login::LoginArgs),
    /// End the current session
    Logout,
    /// Show the current session
    Status,
    /// Navigate to a route through the route guard
    Open(open::OpenArgs),
    /// Keep the session alive: expiry checks, renewal, cross-process sync
    Watch(watch::WatchArgs),
    /// GET an API resource with the session's bearer token
    Fetch(fetch::FetchArgs),
    /// Debug mode flag
    Debug(debug::DebugArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Load configuration from the config directory and environment
    pub fn load_config(&self) -> AppResult<AppConfig> {
        let env = self
            .env
            .clone()
            .or_else(|| std::env::var(ENV_VAR).ok())
            .unwrap_or_else(|| "development".to_string());
        AppConfig::load_from(&self.config_dir, &env)
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig, log: &LogControl) -> AppResult<()> {
        if let Commands::Config(args) = &self.command {
            return config::execute(args, &config, &self.config_dir, self.format).await;
        }

        let ctx = SessionContext::open(config, &self.path)?;
        log.apply_debug_mode(ctx.debug.is_enabled()?)?;

        match &self.command {
            Commands::Login(args) => login::execute(args, &ctx, self.format).await,
            Commands::Logout => logout::execute(&ctx),
            Commands::Status => status::execute(&ctx, self.format),
            Commands::Open(args) => open::execute(args, &ctx),
            Commands::Watch(args) => watch::execute(args, &ctx, self.format).await,
            Commands::Fetch(args) => fetch::execute(args, &ctx).await,
            Commands::Debug(args) => debug::execute(args, &ctx, log),
            Commands::Config(_) => Ok(()),
        }
    }
}

/// A session manager wired to the terminal surfaces.
#[derive(Debug)]
pub struct SessionContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// The session
    pub manager: AuthSessionManager,
    /// Token and destination slots
    pub store: CredentialStore,
    /// Current route
    pub routes: Arc<RouteState>,
    /// Persisted debug flag
    pub debug: DebugMode,
    watcher: Option<JoinHandle<()>>,
}

impl SessionContext {
    /// Opens the configured store and builds the manager. Nothing is
    /// resumed until a command calls `startup`.
    pub fn open(config: AppConfig, path: &str) -> AppResult<Self> {
        let backend = open_backend(&config.storage)?;
        debug!(backend = %config.storage.backend, path = %config.storage.path, "Store opened");
        let store = CredentialStore::new(backend.store, &config.storage);
        let routes = Arc::new(RouteState::at(path));
        let authenticator = Arc::new(HttpAuthenticator::new(&config.api)?);

        let manager = AuthSessionManager::new(
            &config.session,
            store.clone(),
            authenticator,
            routes.clone(),
            Arc::new(TerminalNotifier),
            Arc::new(TerminalPrompt::default()),
            Arc::new(SystemTimeSource),
            EventBus::default(),
        );

        Ok(Self {
            debug: DebugMode::new(store.clone()),
            config,
            manager,
            store,
            routes,
            watcher: backend.watcher,
        })
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
