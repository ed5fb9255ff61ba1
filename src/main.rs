use std::path::Path;

use anyhow::Context;
use deep_research::{
    agents::ResearchDeps,
    api::routes::build_app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::{Output, Status},
        Cli, Commands,
    },
    streaming::{stream_events, StreamEvent},
    utils::logging::{init_tracing, LogConfig},
    AppState, ResearchConfig,
};
use futures::StreamExt;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = Output::new(!cli.no_color);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.config, cli.verbose).await,
        Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        } => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
            }
        }
        Commands::Config { validate } => show_config(&cli.config, validate, &output),
        Commands::Research { query } => research(&cli.config, cli.verbose, query, &output).await,
    }
}

fn load_config(path: &Path, verbose: bool) -> anyhow::Result<ResearchConfig> {
    let config = ResearchConfig::read(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    init_tracing(&LogConfig::from_server(&config.server).verbose(verbose));
    config.validate()?;
    Ok(config)
}

async fn serve(path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config = load_config(path, verbose)?;
    let addr = config.bind_address();

    let state = AppState::from_config(config)?;
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Ctrl+C received, shutting down");
}

async fn research(path: &Path, verbose: bool, query: String, output: &Output) -> anyhow::Result<()> {
    let config = load_config(path, verbose)?;
    let state = AppState::from_config(config)?;

    let snapshots = state
        .research_agent
        .research(query, Vec::new(), ResearchDeps::today());
    let mut events = Box::pin(stream_events(uuid::Uuid::new_v4().to_string(), snapshots));

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta { delta, .. } => output.stream_text(&delta),
            StreamEvent::Done => output.newline(),
            StreamEvent::TextStart { .. } | StreamEvent::TextEnd { .. } => {}
        }
    }
    Ok(())
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = ResearchConfig::read(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    output.section("Configuration");
    output.field("file", &path.display().to_string());
    output.field("address", &config.bind_address());
    output.field("log", &format!("{} ({})", config.server.log_level, config.server.log_format));
    output.field("follow-up rounds", &config.research.followup_rounds().to_string());

    output.section("Agents");
    let rows: Vec<Vec<String>> = config
        .agents
        .iter()
        .map(|(role, agent)| {
            let tools = if agent.tools.is_empty() {
                "-".to_string()
            } else {
                agent.tools.join(", ")
            };
            vec![role.to_string(), agent.model.clone(), tools]
        })
        .collect();
    output.table(&["Role", "Model", "Tools"], &rows);

    if validate {
        match config.validate() {
            Ok(()) => output.status(Status::Done, "configuration is valid"),
            Err(e) => {
                output.status(Status::Fail, &e.to_string());
                anyhow::bail!("invalid configuration");
            }
        }
    }
    Ok(())
}
