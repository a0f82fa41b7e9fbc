//! DocBuilder daemon: on-demand HTTP, webhook, scheduled, and combined
//! API trigger surfaces over the same `Orchestrator` used by the CLI.
//!
//! At most one build runs at a time: every trigger surface funnels
//! through a single `tokio::sync::Mutex<()>`, `try_lock`ed so a
//! concurrent trigger returns immediately with a `skipped` result
//! tagged `build_in_progress` rather than queuing.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use croner::Cron;
use docbuilder_build::{
    load_config, BuildOutcome, BuildReport, BuildRequest, DaemonMode, GitVcsProvider,
    HugoSiteGenerator, ListenerConfig, MarkdownTransformPipeline, Orchestrator,
    ScheduleEntryConfig, ScheduleTriggerConfig, TriggerSource, WebhookConfig,
};
use docbuilder_state::{DaemonStatus, ScheduleTrigger, StateStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[derive(Parser)]
#[command(name = "docbuilderd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DocBuilder daemon", long_about = None)]
struct Cli {
    #[arg(long, env = "DOCBUILDER_CONFIG", default_value = "docbuilder.yaml")]
    config: PathBuf,

    #[arg(long, env = "DOCBUILDER_DATA_DIR", default_value = ".docbuilder")]
    data_dir: PathBuf,

    /// Overrides the configured listener host, when the mode has one
    #[arg(long, env = "DOCBUILDER_HOST")]
    host: Option<String>,

    /// Overrides the configured listener port, when the mode has one
    #[arg(long, env = "DOCBUILDER_PORT")]
    port: Option<u16>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    json: bool,
}

struct AppState {
    orchestrator: Orchestrator,
    state: StateStore,
    build_lock: Mutex<()>,
    webhook: Option<WebhookGuard>,
}

struct WebhookGuard {
    secret: Option<String>,
    max_payload_bytes: u64,
    rate_limiter: Mutex<RateLimiter>,
}

impl WebhookGuard {
    fn new(config: &WebhookConfig) -> Self {
        WebhookGuard {
            secret: config.secret.clone(),
            max_payload_bytes: config.max_payload_bytes,
            rate_limiter: Mutex::new(RateLimiter::new(
                config.rate_limit.requests_per_minute,
                config.rate_limit.burst,
            )),
        }
    }
}

/// A simple token bucket: refills continuously at `requests_per_minute
/// / 60` tokens per second, capped at `burst`.
struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl RateLimiter {
    fn new(requests_per_minute: u32, burst: u32) -> Self {
        RateLimiter {
            capacity: burst as f64,
            tokens: burst as f64,
            refill_per_sec: requests_per_minute as f64 / 60.0,
            last: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    docbuilder_core::init_tracing(cli.json, level);

    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let mut daemon_config = config
        .daemon
        .take()
        .context("docbuilderd requires a `daemon` section in the config file")?;
    apply_listener_overrides(&mut daemon_config.mode, cli.host.as_deref(), cli.port);

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("failed to create data directory {}", cli.data_dir.display()))?;
    let state = StateStore::open(cli.data_dir.join("daemon-state.json"), env!("CARGO_PKG_VERSION"))
        .context("failed to open state store")?;
    state.daemon_info().set_status(DaemonStatus::Starting)?;

    let webhook_guard = match &daemon_config.mode {
        DaemonMode::Webhook { webhook, .. } | DaemonMode::Api { webhook, .. } => {
            Some(WebhookGuard::new(webhook))
        }
        DaemonMode::Http { .. } | DaemonMode::Scheduled { .. } => None,
    };

    let orchestrator = Orchestrator {
        repositories: config.repositories,
        build_config: config.build.clone(),
        workspace_root: cli.data_dir.join("workspaces"),
        content_dir: cli.data_dir.join("content"),
        output_dir: cli.data_dir.join("public"),
        state: state.clone(),
        vcs: Arc::new(GitVcsProvider::new()),
        transform: Arc::new(MarkdownTransformPipeline::new()),
        site: Arc::new(HugoSiteGenerator::new(config.build.site_generator_binary.clone())),
    };

    let app_state = Arc::new(AppState {
        orchestrator,
        state: state.clone(),
        build_lock: Mutex::new(()),
        webhook: webhook_guard,
    });

    state.daemon_info().set_status(DaemonStatus::Running)?;

    let result = match daemon_config.mode {
        DaemonMode::Http { listener } => run_http(app_state, listener, None).await,
        DaemonMode::Webhook { listener, webhook } => {
            run_http(app_state, listener, Some(webhook.path)).await
        }
        DaemonMode::Api { listener, webhook } => {
            run_http(app_state, listener, Some(webhook.path)).await
        }
        DaemonMode::Scheduled { schedules } => run_scheduled(app_state, schedules).await,
    };

    let final_status = if result.is_ok() {
        DaemonStatus::Stopped
    } else {
        DaemonStatus::Unhealthy
    };
    state.daemon_info().set_status(final_status).ok();
    result
}

fn apply_listener_overrides(mode: &mut DaemonMode, host: Option<&str>, port: Option<u16>) {
    let listener = match mode {
        DaemonMode::Http { listener } => Some(listener),
        DaemonMode::Webhook { listener, .. } => Some(listener),
        DaemonMode::Api { listener, .. } => Some(listener),
        DaemonMode::Scheduled { .. } => None,
    };
    if let Some(listener) = listener {
        if let Some(host) = host {
            listener.host = host.to_string();
        }
        if let Some(port) = port {
            listener.port = port;
        }
    }
}

async fn trigger_build(
    app: &AppState,
    trigger: TriggerSource,
) -> docbuilder_core::error::Result<BuildReport> {
    let _permit = match app.build_lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            return Ok(BuildReport::skipped(
                uuid::Uuid::new_v4().to_string(),
                "build_in_progress",
            ));
        }
    };
    let request = BuildRequest::new(trigger);
    let cancel = CancellationToken::new();
    app.orchestrator.run(&request, &cancel).await
}

fn build_router(app: Arc<AppState>, webhook_path: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/build", post(handle_build))
        .route("/status", get(handle_status));
    if let Some(path) = webhook_path {
        router = router.route(path, post(handle_webhook));
    }
    router.with_state(app)
}

async fn handle_build(State(app): State<Arc<AppState>>) -> impl IntoResponse {
    match trigger_build(&app, TriggerSource::Api).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn handle_status(State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let daemon = app.state.daemon_info().get();
    let statistics = app.state.statistics().get();
    match (daemon, statistics) {
        (Ok(daemon), Ok(statistics)) => {
            Json(serde_json::json!({ "daemon": daemon, "statistics": statistics })).into_response()
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "state store error").into_response(),
    }
}

async fn handle_webhook(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(guard) = &app.webhook else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if body.len() as u64 > guard.max_payload_bytes {
        return (StatusCode::PAYLOAD_TOO_LARGE, "payload exceeds configured maximum")
            .into_response();
    }

    if let Some(secret) = &guard.secret {
        let provided = headers
            .get("x-docbuilder-secret")
            .and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_str()) {
            return (StatusCode::UNAUTHORIZED, "invalid webhook secret").into_response();
        }
    }

    if !guard.rate_limiter.lock().await.try_acquire() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }

    match trigger_build(&app, TriggerSource::Webhook).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn run_http(app: Arc<AppState>, listener_cfg: ListenerConfig, webhook_path: Option<String>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", listener_cfg.host, listener_cfg.port)
        .parse()
        .with_context(|| format!("invalid listener address {}:{}", listener_cfg.host, listener_cfg.port))?;
    let router = build_router(app, webhook_path.as_deref());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "docbuilderd listening");
    axum::serve(listener, router)
        .await
        .context("http server error")
}

async fn run_scheduled(app: Arc<AppState>, schedules: Vec<ScheduleEntryConfig>) -> Result<()> {
    let mut handles = Vec::with_capacity(schedules.len());
    for entry in schedules {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = run_schedule_loop(app, entry).await {
                tracing::error!(error = %e, "schedule loop exited");
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn run_schedule_loop(app: Arc<AppState>, entry: ScheduleEntryConfig) -> Result<()> {
    if app.state.schedules().get(&entry.name)?.is_none() {
        let trigger = match &entry.trigger {
            ScheduleTriggerConfig::Cron { expression } => ScheduleTrigger::Cron(expression.clone()),
            ScheduleTriggerConfig::Interval { seconds } => {
                ScheduleTrigger::Interval(Duration::from_secs(*seconds))
            }
        };
        let now = chrono::Utc::now();
        app.state.schedules().create(docbuilder_state::Schedule {
            id: entry.name.clone(),
            name: entry.name.clone(),
            trigger,
            is_active: true,
            last_run: None,
            next_run: None,
            run_count: 0,
            failure_count: 0,
            config: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        })?;
    }

    loop {
        let sleep_for = match &entry.trigger {
            ScheduleTriggerConfig::Cron { expression } => {
                let cron = Cron::new(expression)
                    .parse()
                    .with_context(|| format!("invalid cron expression: {expression}"))?;
                let now = chrono::Utc::now();
                let next = cron
                    .find_next_occurrence(&now, false)
                    .context("cron schedule has no future occurrence")?;
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
            ScheduleTriggerConfig::Interval { seconds } => Duration::from_secs(*seconds),
        };
        tokio::time::sleep_until(tokio::time::Instant::now() + sleep_for).await;

        let outcome = trigger_build(&app, TriggerSource::Schedule).await;
        let ok = matches!(&outcome, Ok(r) if r.outcome != BuildOutcome::Failed);
        app.state.schedules().record_run(&entry.name, ok, None)?;
    }
}
