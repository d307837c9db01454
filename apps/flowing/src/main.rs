use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    events, suggestions::build_feed, FlowingApi, MlPreloadMonitor, Services, SlaMonitor,
    SuggestionRotator,
};
use serde_json::{Map, Value};
use shared::{
    context::{keys, UiContext},
    domain::IssueKey,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::FooterView;

#[derive(Parser, Debug)]
#[command(name = "flowing", about = "Terminal footer assistant for the Flowing service desk")]
struct Cli {
    /// Config file (defaults to ./flowing.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the backend base url.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a ticket and rotate footer suggestions until interrupted.
    Watch {
        #[arg(long)]
        issue: Option<String>,
        #[arg(long)]
        queue: Option<String>,
        #[arg(long)]
        desk: Option<String>,
        #[arg(long)]
        issues_count: Option<u64>,
        /// Ask the backend to preload ML models first.
        #[arg(long)]
        preload: bool,
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Print the SLA summary of one ticket.
    Sla { issue: String },
    /// Start the ML model preload and follow its progress.
    Preload {
        #[arg(long)]
        no_wait: bool,
    },
    /// List model option values, optionally for a single field.
    Options { field: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let api = FlowingApi::new(&settings.api_url, settings.request_timeout())
        .context("failed to set up backend client")?;
    info!(api_url = %settings.api_url, "using backend");

    match cli.command {
        Command::Watch {
            issue,
            queue,
            desk,
            issues_count,
            preload,
            duration_secs,
        } => {
            let view = ViewArgs {
                issue: issue.map(IssueKey::new),
                queue,
                desk,
                issues_count,
            };
            watch(api, &settings, view, preload, duration_secs.map(Duration::from_secs)).await
        }
        Command::Sla { issue } => print_sla(&api, &IssueKey::new(issue)).await,
        Command::Preload { no_wait } => preload(api, &settings, no_wait).await,
        Command::Options { field } => print_options(&api, field.as_deref()).await,
    }
}

struct ViewArgs {
    issue: Option<IssueKey>,
    queue: Option<String>,
    desk: Option<String>,
    issues_count: Option<u64>,
}

async fn watch(
    api: FlowingApi,
    settings: &Settings,
    view: ViewArgs,
    preload: bool,
    duration: Option<Duration>,
) -> Result<()> {
    let services = Services::with_api(api);
    let footer = FooterView::attach(&services.store, &services.bridge);
    let sla_monitor = SlaMonitor::start(
        services.store.clone(),
        services.bridge.clone(),
        services.sla_source(),
        settings.sla_refresh(),
    );
    let preload_monitor = MlPreloadMonitor::new(
        services.preload_backend(),
        services.store.clone(),
        services.bridge.clone(),
        settings.ml_poll_interval(),
    );
    if preload {
        if let Err(err) = preload_monitor.trigger().await {
            warn!(error = %format!("{err:#}"), "continuing without ML preload");
        }
    } else {
        preload_monitor.poll_once().await;
    }

    let mut fields = Map::new();
    if let Some(queue) = view.queue {
        fields.insert(keys::CURRENT_QUEUE.to_string(), Value::String(queue));
    }
    if let Some(desk) = view.desk {
        fields.insert(keys::CURRENT_DESK.to_string(), Value::String(desk));
    }
    if let Some(count) = view.issues_count {
        fields.insert(keys::ISSUES_COUNT.to_string(), Value::from(count));
    }
    if !fields.is_empty() {
        services.bridge.emit(events::VIEW_CHANGED, Value::Object(fields));
    }
    services.select_issue(view.issue.as_ref());

    let store = services.store.clone();
    let bridge = services.bridge.clone();
    let rotator = SuggestionRotator::start(
        move || build_feed(&UiContext::from_state(&store.get_state())),
        settings.suggestion_interval(),
        move |suggestion| {
            bridge.emit_json(events::SUGGESTIONS_REFRESHED, suggestion);
        },
    );

    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = interrupted => {}
            }
        }
        None => interrupted.await,
    }

    rotator.stop();
    preload_monitor.stop();
    sla_monitor.stop();
    footer.detach();
    services.shutdown();
    info!("footer stopped");
    Ok(())
}

async fn print_sla(api: &FlowingApi, issue: &IssueKey) -> Result<()> {
    let data = api
        .issue_sla(issue)
        .await
        .with_context(|| format!("SLA unavailable for {issue}"))?;
    match data.summary() {
        Some(summary) => println!("{issue}: {}", render::render_sla(&summary)),
        None => println!("{issue}: no SLA configured"),
    }
    Ok(())
}

async fn preload(api: FlowingApi, settings: &Settings, no_wait: bool) -> Result<()> {
    let services = Services::with_api(api);
    let footer = FooterView::attach(&services.store, &services.bridge);
    let monitor = MlPreloadMonitor::new(
        services.preload_backend(),
        services.store.clone(),
        services.bridge.clone(),
        settings.ml_poll_interval(),
    );

    let message = monitor.trigger().await?;
    println!("{message}");
    if no_wait {
        monitor.stop();
    } else {
        while monitor.is_polling() {
            tokio::time::sleep(settings.ml_poll_interval()).await;
        }
    }

    footer.detach();
    services.shutdown();
    Ok(())
}

async fn print_options(api: &FlowingApi, field: Option<&str>) -> Result<()> {
    let options = api
        .model_options()
        .await
        .context("model options unavailable")?;
    match field {
        Some(field) => {
            let values = options
                .get(field)
                .with_context(|| format!("no options for field '{field}'"))?;
            println!("{}", serde_json::to_string_pretty(values)?);
        }
        None => println!("{}", serde_json::to_string_pretty(&options)?),
    }
    Ok(())
}
