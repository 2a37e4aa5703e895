use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edubridge_agents::{LlmProvider, ProviderRegistry};
use edubridge_config::{AppConfig, ConfigLoader};
use edubridge_gateway::{AppState, Collaborators, GatewayServer, api};
use edubridge_security::RedactingWriter;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edubridge")]
#[command(author, version, about = "EduBridge - classroom assistant backend", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to $EDUBRIDGE_CONFIG, then ~/.edubridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List configured LLM backends and whether a credential is set
    Providers {
        /// Probe each available backend's API
        #[arg(long)]
        check: bool,
    },

    /// Run a single chat turn and print the structured reply
    Ask {
        /// The question or request
        #[arg(required = true)]
        text: Vec<String>,

        /// Session to record the turn under
        #[arg(short, long, default_value = "cli")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Providers { check } => providers(&config, check).await,
        Commands::Ask { text, user } => ask(config, &user, &text.join(" ")).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("edubridge=debug,edubridge_gateway=debug,edubridge_agents=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr())
        .init();
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    info!("starting edubridge v{}", env!("CARGO_PKG_VERSION"));
    let server = GatewayServer::from_config(config)?;
    server.run().await?;
    Ok(())
}

async fn providers(config: &AppConfig, check: bool) -> Result<()> {
    let registry = ProviderRegistry::from_config(&config.providers);
    let available = registry.available_backends();

    println!("{:<22} {:<34} {:<20} STATUS", "ID", "MODEL", "CREDENTIAL");
    for descriptor in registry.descriptors() {
        let backend = available.iter().find(|b| b.descriptor.id == descriptor.id);
        let status = match backend {
            None => "missing credential".to_string(),
            Some(_) if !check => "ready".to_string(),
            Some(backend) => probe(backend.connect().as_ref()).await,
        };
        println!(
            "{:<22} {:<34} {:<20} {}",
            descriptor.id, descriptor.model, descriptor.credential_env, status
        );
    }

    if available.is_empty() {
        println!(
            "\nNo backend is usable. Set one of: {}",
            registry.credential_keys().join(", ")
        );
    }
    Ok(())
}

async fn probe(provider: &dyn LlmProvider) -> String {
    match provider.health_check().await {
        Ok(true) => "reachable".to_string(),
        Ok(false) => "unhealthy".to_string(),
        Err(e) => format!("error: {e}"),
    }
}

async fn ask(config: AppConfig, user: &str, text: &str) -> Result<()> {
    let collaborators = Collaborators::from_config(&config)?;
    let state = AppState::new(config, collaborators);

    let reply = api::run_turn(&state, user, text).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
