//! Dayloop CLI: the main entry point.
//!
//! ```text
//! dayloop "Need to buy groceries tomorrow" "I like to shop in the morning"
//! ```
//!
//! Runs one request through the agent loop against the configured MCP
//! server, prints the answer and posts it to the notify endpoint.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dayloop_agent::AgentLoop;
use dayloop_channels::WebhookNotifier;
use dayloop_config::AppConfig;
use dayloop_core::{Notifier, Provider, RunOutcome};
use dayloop_mcp::StdioConnector;
use dayloop_providers::{OracleGateway, build_from_config, model_for};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "dayloop",
    about = "Dayloop: plan your day with an LLM and an MCP todo server",
    version,
    author
)]
struct Cli {
    /// What you want done, e.g. "Need to buy groceries tomorrow"
    request: String,

    /// Preferences to remember across runs, e.g. "I work out in the morning"
    preferences: Option<String>,

    /// Config file to use instead of ~/.dayloop/config.toml
    #[arg(long, env = "DAYLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the iteration ceiling
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_iterations: Option<u32>,

    /// Print the answer without posting it to the notify endpoint
    #[arg(long)]
    no_notify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // stdout carries only the answer
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    let mut config = AppConfig::load_with_env(&config_path)
        .map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = cli.max_iterations {
        config.agent.max_iterations = max as usize;
    }

    // Local servers run without a key; hosted ones do not.
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY   = '...'   (recommended)");
        eprintln!("    DAYLOOP_API_KEY  = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", config_path.display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    let model = model_for(&config, &config.default_provider);
    info!(provider = provider.name(), model = %model, "Using oracle");

    let gateway = OracleGateway::new(provider, model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_timeout(Duration::from_secs(config.agent.oracle_timeout_secs));
    let connector = Arc::new(StdioConnector::new(config.mcp.clone()));

    let mut agent = AgentLoop::new(gateway, connector)
        .with_config(&config.agent)
        .with_preference_file(config.memory.preference_file.clone());

    let outcome = agent.run(&cli.request, cli.preferences.as_deref()).await;

    match outcome {
        RunOutcome::Completed { answer, history } => {
            info!(iterations = history.len(), "Done");
            println!("{answer}");

            if !cli.no_notify {
                if let Some(notifier) = WebhookNotifier::from_config(&config.notify) {
                    if let Err(e) = notifier.deliver(&answer).await {
                        warn!(error = %e, "Could not deliver answer");
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Aborted { reason, history } => {
            eprintln!("Run aborted after {} iteration(s): {reason}", history.len());
            Ok(ExitCode::FAILURE)
        }
    }
}
