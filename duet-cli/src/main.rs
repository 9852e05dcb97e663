use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use duet_client::exec::{CodeExecutor, ExecutionRequest, HttpExecutor, output_lines};
use duet_client::ClientConfig;
use duet_relay::{RelayConfig, RelayServer};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "Interview room relay and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the signaling relay.
    Relay {
        #[arg(long)]
        bind: Option<SocketAddr>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Runs a snippet on the execution service and prints the output log.
    Exec {
        #[arg(short, long)]
        language: String,

        file: PathBuf,

        #[arg(long)]
        stdin: Option<PathBuf>,

        #[arg(long)]
        endpoint: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("duet=info,duet_relay=info,duet_client=info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind, config } => run_relay(bind, config).await,
        Commands::Exec {
            language,
            file,
            stdin,
            endpoint,
            config,
        } => run_exec(language, file, stdin, endpoint, config).await,
    }
}

async fn run_relay(bind: Option<SocketAddr>, config: Option<PathBuf>) -> Result<()> {
    let mut config = match config {
        Some(path) => RelayConfig::load(&path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = bind {
        config.bind = bind;
    }

    let server = RelayServer::bind(config).await?;
    let addr = server.local_addr()?;
    println!("{}", "🚀 Starting duet relay...".green().bold());
    println!("   📡 ws://{}/ws", addr);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down relay");
        })
        .await?;

    println!("{}", "Relay stopped.".cyan());
    Ok(())
}

async fn run_exec(
    language: String,
    file: PathBuf,
    stdin: Option<PathBuf>,
    endpoint: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut executor_config = match config {
        Some(path) => ClientConfig::load(&path)?.executor,
        None => ClientConfig::default().executor,
    };
    if let Some(endpoint) = endpoint {
        executor_config.endpoint = endpoint;
    }

    let source = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut request = ExecutionRequest::new(language, source);
    if let Some(path) = stdin {
        let input = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        request = request.with_stdin(input);
    }

    println!(
        "{}",
        format!("📦 Running {} on {}...", file.display(), executor_config.endpoint).cyan()
    );
    let executor = HttpExecutor::new(executor_config)?;
    let result = executor.execute(&request).await;
    let failed = result.is_err();

    for line in output_lines(result) {
        if line.starts_with("Error: ") {
            println!("{}", line.red());
        } else if line.starts_with("stderr: ") {
            println!("{}", line.yellow());
        } else if line.starts_with("Finished") {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }

    if failed {
        anyhow::bail!("Execution failed");
    }
    Ok(())
}
