//! First Rule server binary.

use clap::{Parser, Subcommand};
use first_rule_partner_auth::Scope;
use first_rule_server::{FirstRuleServer, generate_key_seed, load_config, render_key_seed};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for first-rule-server
#[derive(Parser, Debug)]
#[command(name = "first-rule-server")]
#[command(about = "OpenPlay webhook ingestion and partner API for First Rule")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "first-rule.toml", env = "FIRST_RULE_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Generate a partner API key and print its configuration entry
    GenerateKey {
        /// Partner organization the key belongs to
        #[arg(long)]
        partner_id: String,
        /// Label for the key
        #[arg(long, default_value = "default")]
        name: String,
        /// Granted scopes
        #[arg(long = "scope", value_delimiter = ',', default_value = "read")]
        scopes: Vec<Scope>,
        /// Requests per minute; 0 disables the limit
        #[arg(long, default_value_t = 60)]
        rate_limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    config.apply_env();

    if let Some(Command::GenerateKey {
        partner_id,
        name,
        scopes,
        rate_limit,
    }) = args.command
    {
        let (plaintext, seed) = generate_key_seed(
            &config.partner_api.to_auth_config(),
            &partner_id,
            &name,
            &scopes,
            rate_limit,
        );
        println!("API key (shown once): {plaintext}");
        println!();
        println!("{}", render_key_seed(&seed)?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!(config = %args.config, "Configuration loaded");

    let server = FirstRuleServer::new(config).await?;
    server.run(shutdown_signal()).await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
