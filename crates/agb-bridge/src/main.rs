//! Authentik → Gotify bridge
//!
//! Receives Authentik webhook notifications, classifies them, and pushes
//! human-readable alerts to a Gotify server.

use agb_core::classify::{ClassificationPolicy, EventClassifier, NotificationDraft};
use agb_core::config::{BridgeConfig, ConfigLoader};
use agb_core::sink::NotificationSink;
use agb_gotify::{GotifyClient, GotifyConfig};
use agb_web::{AppState, WebConfig, ROUTE_SUFFIX};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "authentik-gotify-bridge")]
#[command(version)]
#[command(about = "Authentik webhook to Gotify notification bridge", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AGB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook bridge
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the Authentik setup instructions
    Setup,

    /// Send a test notification through the configured Gotify server
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.clone());

    // CLI verbose flag takes precedence, then config, then default
    let log_level = if cli.verbose > 0 {
        match cli.verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        match config.bridge.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { host, port } => serve_command(config, host, port).await,
        Commands::Setup => setup_command(&config),
        Commands::Check => check_command(&config).await,
    }
}

/// Load configuration from file/env, with fallback to defaults
fn load_config(cli_path: Option<PathBuf>) -> BridgeConfig {
    let loader = ConfigLoader::new().with_cli_path(cli_path);
    match loader.load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}, using defaults", e);
            BridgeConfig::default()
        }
    }
}

fn require_gotify(config: &BridgeConfig) -> anyhow::Result<()> {
    if config.gotify.url.is_empty() {
        anyhow::bail!("gotify.url is not configured (set it in the config file or AGB_GOTIFY_URL)");
    }
    if config.gotify.token.is_empty() {
        anyhow::bail!(
            "gotify.token is not configured (set it in the config file or AGB_GOTIFY_TOKEN)"
        );
    }
    Ok(())
}

async fn serve_command(
    config: BridgeConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    require_gotify(&config)?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let sink: Arc<dyn NotificationSink> = Arc::new(GotifyClient::new(
        GotifyConfig::from_settings(&config.gotify),
    ));
    let classifier = EventClassifier::new(
        ClassificationPolicy::new(),
        config.bridge.friendly_name.clone(),
    );

    let state = Arc::new(AppState { classifier, sink });

    info!("Starting Authentik → Gotify bridge...");
    info!("Forwarding notifications to {}", config.gotify.url);
    if let Some(name) = &config.bridge.friendly_name {
        info!("Instance label: {}", name);
    }

    agb_web::start_server(WebConfig { host, port }, state).await
}

fn setup_command(config: &BridgeConfig) -> anyhow::Result<()> {
    let webhook_url = format!(
        "http://{}:{}/{}",
        display_host(&config.server.host),
        config.server.port,
        ROUTE_SUFFIX
    );
    println!("{}", agb_web::setup_guide(&webhook_url));
    Ok(())
}

/// Host to show in the setup guide. Wildcard bind addresses are not
/// reachable URLs, so substitute a placeholder for the operator.
fn display_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" | "[::]" => "<bridge-host>",
        _ => host,
    }
}

async fn check_command(config: &BridgeConfig) -> anyhow::Result<()> {
    require_gotify(config)?;

    let client = GotifyClient::new(GotifyConfig::from_settings(&config.gotify));
    let draft = NotificationDraft {
        title: "Authentik bridge test".to_string(),
        body: "Test notification from authentik-gotify-bridge. \
               If you can read this, delivery works."
            .to_string(),
        priority: agb_core::classify::PRIORITY_NORMAL,
    };

    client.send(&draft).await?;
    println!("Test notification delivered to {}", config.gotify.url);

    Ok(())
}
