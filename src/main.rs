use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use plaint_core::config::AppConfig;
use plaint_core::types::{task_channel, HistoryEntry, MetadataHandle, StreamItem};
use plaint_flow::{
    complaint_flow, is_complete, run_complaint, ComplaintFlow, FlowServices, RunStatus, SharedState,
};
use plaint_gateway::GatewayServer;
use plaint_store::{AgencyDirectory, SqliteComplaintStore};

#[derive(Parser)]
#[command(name = "plaint", version, about = "Conversational complaint intake")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "plaint.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// File a complaint interactively in the terminal (default)
    Chat,
    /// Start the HTTP gateway
    Serve,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plaint=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load_or_env(&cli.config)?;
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "No config file, using environment");
    }

    if let Some(Commands::Config) = cli.command {
        print_config(&config);
        return Ok(());
    }

    let store = Arc::new(SqliteComplaintStore::open(Path::new(&config.store.path))?);
    let services = Arc::new(FlowServices {
        llm: plaint_llm::build_client(&config),
        model: config.model.clone(),
        store: store.clone(),
        resources: Arc::new(AgencyDirectory::new()),
        settings: config.flow.clone(),
    });
    let flow = Arc::new(complaint_flow(services));

    match cli.command {
        Some(Commands::Serve) => {
            info!(bind = %config.gateway.bind, "Starting HTTP gateway");
            let server = GatewayServer::new(config.gateway.clone(), flow, store, config.flow.clone());

            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Some(Commands::Chat) | None => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_chat(&flow, config.flow.quality_threshold, stdin).await?;
        }
        Some(Commands::Config) => {}
    }

    Ok(())
}

fn print_config(config: &AppConfig) {
    println!("Model:     {} ({})", config.model.model_id, config.model.provider);
    if let Some(ref base_url) = config.model.base_url {
        println!("Base URL:  {}", base_url);
    }
    println!(
        "API key:   {}",
        if config.model.api_key.is_some() { "set" } else { "not set" }
    );
    for fallback in &config.fallback_models {
        println!("Fallback:  {} ({})", fallback.model_id, fallback.provider);
    }
    println!("Threshold: {}", config.flow.quality_threshold);
    println!("Gateway:   {}", config.gateway.bind);
    println!("Store:     {}", config.store.path);
}

fn is_farewell(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye")
}

/// Interview loop: one flow run per user turn, history and metadata carried
/// between turns the way a web client would carry them.
async fn run_chat<R>(flow: &ComplaintFlow, threshold: i64, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("Plaint v{}", env!("CARGO_PKG_VERSION"));
    println!("Tell us what went wrong. Type quit to exit.\n");

    let mut lines = input.lines();
    let mut stdout = io::stdout();
    let mut history: Vec<HistoryEntry> = Vec::new();
    let metadata = MetadataHandle::default();

    loop {
        print!("> ");
        stdout.flush()?;

        let input = match lines.next_line().await? {
            Some(line) => line,
            None => break, // EOF
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if is_farewell(input) {
            println!("Goodbye!");
            break;
        }

        history.push(HistoryEntry::user(input));
        let concluded = is_complete(&metadata.snapshot(), threshold);

        let (tx, mut rx) = task_channel();
        let printer = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                match item {
                    StreamItem::Chunk(text) => {
                        print!("{}", text);
                        io::stdout().flush().ok();
                    }
                    StreamItem::Error(message) => eprintln!("\n{}", message),
                    StreamItem::End => break,
                }
            }
        });

        let mut state = SharedState::new(std::mem::take(&mut history), metadata.clone())
            .with_queue(tx)
            .summarized(concluded);
        let result = run_complaint(flow, &mut state).await;
        let status = state.status;
        let complaint_id = state.complaint_id.clone();
        // Drops the queue, so the printer stops even if the run never ended it
        history = state.into_history();
        printer.await.ok();
        println!("\n");

        if let Err(e) = result {
            error!(error = %e, "Turn failed");
            println!("Something went wrong: {}. Please try again.\n", e);
            continue;
        }

        if status == RunStatus::Submitted {
            if let Some(id) = complaint_id {
                info!(complaint_id = %id, "Complaint submitted");
            }
            break;
        }
    }

    Ok(())
}
