use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use tap_gateway::{ConnectOptions, Gateway};

#[derive(Parser)]
#[command(name = "livetap", version, about = "livetap: live-broadcast subscriptions over a stdio tool server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tool calls over stdin/stdout (default)
    Serve,
    /// Show current configuration
    Status,
    /// Print the tool definitions as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = tap_gateway::config::load_config()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.gateway.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!("livetap v{} serving on stdio", env!("CARGO_PKG_VERSION"));
            let gateway = Arc::new(Gateway::new(cfg));
            tap_gateway::rpc::serve(
                gateway,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await
        }
        Commands::Status => {
            println!("livetap v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", tap_gateway::config::config_path().display());
            println!(
                "Connector: {}",
                cfg.source.command.as_deref().unwrap_or("not configured")
            );
            let connect = ConnectOptions::from_config(&cfg.source);
            println!(
                "Session ID: {}",
                if connect.session_id.is_some() { "configured" } else { "not set" }
            );
            println!("History capacity: {}", cfg.history.capacity);
            println!(
                "Reconnect: {} attempts, {} ms apart",
                cfg.reconnect.max_attempts, cfg.reconnect.delay_ms
            );
            println!("Player: {}", cfg.media.player);
            println!("Recorder: {}", cfg.media.recorder);
            Ok(())
        }
        Commands::Tools => {
            let gateway = Gateway::new(cfg);
            println!("{}", serde_json::to_string_pretty(&gateway.tool_definitions())?);
            Ok(())
        }
    }
}
