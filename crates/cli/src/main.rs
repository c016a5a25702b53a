mod check_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    stubwire_config::StubwireConfig,
    stubwire_engine::MessagingEngine,
    stubwire_gateway::GatewayState,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "stubwire", about = "stubwire: message channel stub server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "STUBWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Message stub mappings file loaded at startup (overrides config value).
    #[arg(long, global = true, env = "STUBWIRE_MAPPINGS")]
    mappings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the stub server (default when no subcommand is provided).
    Serve,
    /// Parse a message stub mappings file and summarise it.
    Check {
        file: PathBuf,
        /// List every mapping, not just the totals.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Config from `--config` or the standard locations, with CLI overrides applied.
fn resolve_config(cli: &Cli) -> anyhow::Result<StubwireConfig> {
    let mut config = match &cli.config {
        Some(path) => stubwire_config::load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => stubwire_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(mappings) = &cli.mappings {
        config.stubs.mappings = Some(mappings.clone());
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(feature = "prometheus")]
fn init_metrics(
    config: &StubwireConfig,
) -> anyhow::Result<Option<stubwire_metrics::MetricsHandle>> {
    stubwire_metrics::init_metrics(stubwire_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: config.metrics.labels.clone().into_iter().collect(),
    })
    .context("installing metrics recorder")
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let addr = config.server.address();
    #[cfg(feature = "prometheus")]
    let metrics = init_metrics(&config)?;

    let engine = Arc::new(MessagingEngine::from_config(config).context("starting message engine")?);
    info!(
        stubs = engine.stubs().len(),
        journal_limit = ?engine.journal().max_entries(),
        "message engine ready"
    );

    let state = GatewayState::new(engine);
    #[cfg(feature = "prometheus")]
    let state = state.with_metrics(metrics);

    stubwire_gateway::start_gateway(state, &addr, shutdown_signal()).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "stubwire starting");

    match &cli.command {
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Check { file, verbose }) => {
            let default_priority = resolve_config(&cli)?.stubs.default_priority;
            check_commands::check(file, default_priority, *verbose)
        },
    }
}
