//! CLI entrypoint for PLC Copilot
//!
//! Wires configuration, adapters and handlers together, then runs the
//! requested command.

use anyhow::{bail, Context, Result};
use clap::Parser;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

use plc_copilot::adapters::ai::{
    AIEventCallback, CompositeEventCallback, InMemoryUsageTracker, ModelCascade, OpenAIConfig,
    OpenAIProvider, TracingEventCallback,
};
use plc_copilot::adapters::{LocalSessionFileStore, PlainTextExtractor};
use plc_copilot::application::{
    CleanupSessionsCommand, CleanupSessionsHandler, GetWorkflowStatsQuery, IngestDocumentCommand,
    IngestDocumentHandler, WorkflowOrchestrator, WorkflowStatsHandler,
};
use plc_copilot::cli::{CleanupArgs, Command, InteractArgs, RootArgs, StatsArgs};
use plc_copilot::config::{AiConfig, AppConfig, LoggingConfig};
use plc_copilot::domain::workflow::InteractionRequest;
use plc_copilot::ports::{CleanupReport, CompletionGateway, LanguageModel, UsageTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let args = RootArgs::parse();
    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    config.workflow.validate()?;
    config.sessions.validate()?;
    config.logging.validate()?;

    let store = Arc::new(
        LocalSessionFileStore::new(&config.sessions.storage_dir)
            .with_max_file_size(config.sessions.max_file_size_bytes),
    );

    match args.command {
        Command::Interact(interact) => run_interact(&config, store, interact).await,
        Command::Cleanup(cleanup) => run_cleanup(&config, store, cleanup).await,
        Command::Stats(stats) => run_stats(&config, store, stats).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    // stdout carries the JSON result, so logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(logging.env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_interact(
    config: &AppConfig,
    store: Arc<LocalSessionFileStore>,
    args: InteractArgs,
) -> Result<()> {
    config.ai.validate()?;

    let mut request = read_request(args.request.as_deref()).await?;

    if !args.documents.is_empty() {
        let session_id = args.session.unwrap_or_default();
        let ingest = IngestDocumentHandler::new(store, Arc::new(PlainTextExtractor::new()));

        for path in &args.documents {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read document {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let document = ingest
                .handle(IngestDocumentCommand {
                    session_id,
                    file_name,
                    bytes,
                })
                .await?;
            request.documents.push(document);
        }
        info!(session_id = %session_id, documents = args.documents.len(), "Documents attached");
    }

    let tracker = Arc::new(InMemoryUsageTracker::new());
    let gateway = build_gateway(&config.ai, tracker.clone())?;
    info!(models = ?gateway.candidates(), "Model cascade ready");

    let orchestrator = WorkflowOrchestrator::new(gateway, config.workflow_settings());
    let response = match orchestrator.process_interaction(request).await {
        Ok(response) => response,
        Err(failure) if failure.is_recoverable() => failure.into_fallback_response(),
        Err(failure) => bail!(failure),
    };

    let usage = tracker.get_summary().await?;
    info!(
        requests = usage.request_count,
        tokens = usage.total_tokens,
        cost_cents = usage.total_cost_cents,
        "Model usage"
    );

    print_json(&response, args.pretty)
}

async fn run_cleanup(
    config: &AppConfig,
    store: Arc<LocalSessionFileStore>,
    args: CleanupArgs,
) -> Result<()> {
    if args.sessions.is_empty() && !args.expired {
        bail!("nothing to clean up; pass --session <UUID> or --expired");
    }

    let handler = CleanupSessionsHandler::new(store, config.sessions.session_timeout());
    let mut report = CleanupReport::default();
    if !args.sessions.is_empty() {
        report.absorb(
            handler
                .handle(CleanupSessionsCommand {
                    session_ids: args.sessions,
                })
                .await?,
        );
    }
    if args.expired {
        report.absorb(handler.handle_expired().await?);
    }

    print_json(
        &serde_json::json!({
            "sessions_cleaned": report.sessions_cleaned,
            "files_released": report.files_released,
        }),
        false,
    )
}

async fn run_stats(
    config: &AppConfig,
    store: Arc<LocalSessionFileStore>,
    args: StatsArgs,
) -> Result<()> {
    // Usage is per process; a one-shot stats query only sees storage
    let handler = WorkflowStatsHandler::new(
        store,
        Arc::new(InMemoryUsageTracker::new()),
        config.sessions.session_timeout(),
    );
    let stats = handler.handle(GetWorkflowStatsQuery).await?;
    print_json(&stats, args.pretty)
}

/// Builds the model cascade in configured priority order.
fn build_gateway(
    ai: &AiConfig,
    tracker: Arc<InMemoryUsageTracker>,
) -> Result<Arc<dyn CompletionGateway>> {
    let Some(api_key) = ai.openai_api_key.as_ref() else {
        bail!("OpenAI API key is not configured");
    };

    let mut candidates: Vec<Arc<dyn LanguageModel>> = Vec::new();
    for model in ai.model_list() {
        let provider_config = OpenAIConfig::from_secret(Secret::new(api_key.expose_secret().clone()))
            .with_model(model)
            .with_base_url(ai.base_url.clone())
            .with_timeout(ai.timeout());
        candidates.push(Arc::new(OpenAIProvider::new(provider_config)?));
    }

    let callbacks: Arc<dyn AIEventCallback> = Arc::new(
        CompositeEventCallback::new()
            .with(Arc::new(TracingEventCallback))
            .with(tracker),
    );

    Ok(Arc::new(
        ModelCascade::new(candidates)
            .with_max_transient_retries(ai.max_transient_retries)
            .with_backoff_base(ai.backoff_base())
            .with_event_callback(callbacks),
    ))
}

async fn read_request(path: Option<&Path>) -> Result<InteractionRequest> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read request {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read request from stdin")?;
            buffer
        }
    };

    serde_json::from_str(&raw).context("request is not a valid interaction request")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}
