mod config;
mod dispatch;
mod error;
mod models;
mod ticket;
#[cfg(test)]
mod testing;

use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use config::Config;
use error::BridgeError;
use models::{
    linear::LinearSystem,
    notification::{Notifier, SlackNotifier},
    slack::InteractionForm,
    ticketsystem::TicketSystem,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::{any::Any, net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// ----------------------------------------------------------------------
// 1  Command line / environment
// ----------------------------------------------------------------------
#[derive(Parser, Debug)]
#[command(author, version, about = "Moves ServiceNow incidents from Slack into Linear")]
pub struct Cli {
    /// Linear API key
    #[arg(long, env = "LINEAR_API_KEY", hide_env_values = true)]
    pub linear_api_key: Option<String>,

    /// Linear team new issues are created in
    #[arg(long, env = "LINEAR_TEAM_ID")]
    pub linear_team_id: Option<String>,

    /// Slack bot token, used for the startup check
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,

    /// ServiceNow instance URL, e.g. https://acme.service-now.com
    #[arg(long, env = "SERVICENOW_URL")]
    pub servicenow_url: Option<String>,

    /// Incoming webhook that receives the on-call announcement
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    /// Port (Default 5002)
    #[arg(short, long, env = "PORT", default_value_t = 5002)]
    pub port: u16,

    #[arg(long, env = "LINEAR_API_URL", default_value = "https://api.linear.app/graphql")]
    pub linear_api_url: String,

    #[arg(long, env = "SLACK_API_URL", default_value = "https://slack.com/api")]
    pub slack_api_url: String,

    /// Timeout for every outbound HTTP call, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Also write logs to daily rotated files in this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Don't check Linear and Slack connectivity before serving
    #[arg(long)]
    pub skip_startup_checks: bool,
}

// ----------------------------------------------------------------------
// 2  Shared app state
// ----------------------------------------------------------------------
pub struct AppState {
    pub config: Config,
    pub tracker: Arc<dyn TicketSystem>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    fn from_config(config: Config) -> Result<Self, BridgeError> {
        let client = config.http_client()?;
        let tracker = LinearSystem::new(
            client.clone(),
            config.linear.api_url.clone(),
            SecretString::from(config.linear.api_key.expose_secret().to_owned()),
        );
        let notifier = SlackNotifier::new(
            client,
            config.slack.webhook_url.clone(),
            config.slack.api_url.clone(),
            SecretString::from(config.slack.bot_token.expose_secret().to_owned()),
        );
        Ok(Self {
            config,
            tracker: Arc::new(tracker),
            notifier: Arc::new(notifier),
        })
    }
}

// ----------------------------------------------------------------------
// 3  Startup
// ----------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a) CLI + logging
    let cli = Cli::parse();
    let guard = init_logging(cli.log_dir.as_deref())?;
    info!("Starting Slack to Linear bridge");

    // b) Config
    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "Exiting.");
            drop(guard);
            std::process::exit(1);
        }
    };
    let port = config.port;
    let state = Arc::new(AppState::from_config(config)?);

    // c) Connectivity checks
    if !state.config.skip_startup_checks {
        check_connections(&state).await;
    }

    // d) Server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}/slack/interactions");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn init_logging(log_dir: Option<&std::path::Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("slack-linear-bridge")
                .filename_suffix("log")
                .max_log_files(5)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn check_connections(state: &AppState) {
    let linear_ok = match state.tracker.check_connection().await {
        Ok(()) => {
            info!("{} API connection successful", state.tracker.name());
            true
        }
        Err(error) => {
            error!("{} API connection error: {:#}", state.tracker.name(), error);
            false
        }
    };
    let slack_ok = match state.notifier.check_connection().await {
        Ok(()) => {
            info!("Slack API connection successful");
            true
        }
        Err(error) => {
            error!("Slack API connection error: {:#}", error);
            false
        }
    };

    if !(linear_ok && slack_ok) {
        warn!("One or more API connections failed. Application may not function correctly.");
    }
}

// ----------------------------------------------------------------------
// 4  Router + handlers
// ----------------------------------------------------------------------
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/slack/interactions", post(slack_interaction))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "message": "Slack to Linear Integration Service is running"
        })),
    )
}

#[tracing::instrument(skip_all)]
async fn slack_interaction(
    State(state): State<Arc<AppState>>,
    form: Result<Form<InteractionForm>, FormRejection>,
) -> Response {
    let raw = match form {
        Ok(Form(form)) => form.payload,
        Err(rejection) => {
            warn!(%rejection, "rejected interaction body");
            return BridgeError::InvalidPayload(rejection.body_text()).into_response();
        }
    };

    match dispatch::handle_interaction(&state, raw.as_deref()).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(error) => {
            warn!(%error, status = %error.status(), "interaction not completed");
            error.into_response()
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(%detail, "request handler panicked");
    BridgeError::Internal(detail).into_response()
}
