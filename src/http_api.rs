use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    config::{AppConfig, HttpConfig},
    driver::TestDriver,
    probe::Prober,
    records::RunReport,
    store::ResultStore,
    stress::{StartOutcome, StopOutcome, StressController, StressStatus},
    utils::timestamp,
    InitializationError, ServiceError,
};

/// Shared state behind every route
pub struct AppState {
    pub instance: String,
    pub prober: Arc<dyn Prober>,
    pub store: Arc<ResultStore>,
    pub driver: TestDriver,
    pub stress: StressController,
}

impl AppState {
    pub fn new(config: &AppConfig, prober: Arc<dyn Prober>) -> Self {
        let store = Arc::new(ResultStore::new(config.storage.clone()));

        Self {
            instance: config.instance.clone(),
            driver: TestDriver::new(
                config.driver.clone(),
                config.instance.clone(),
                Arc::clone(&prober),
                Arc::clone(&store),
            ),
            stress: StressController::new(
                config.stress.clone(),
                Arc::clone(&prober),
                Arc::clone(&store),
            ),
            prober,
            store,
        }
    }
}

type ApiState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct IpResponse {
    ip: String,
    timestamp: String,
    instance: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressStarted {
    message: &'static str,
    initial_ip: String,
    run_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressRejected {
    error: &'static str,
    message: &'static str,
    request_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressStopped {
    message: &'static str,
    was_running: bool,
    request_count: u64,
}

#[derive(Debug, Serialize)]
struct RestartHint {
    message: &'static str,
    methods: [&'static str; 3],
    note: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

fn not_found(what: &str) -> Response {
    let body = ErrorResponse {
        error: format!("{} not found", what),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

const ENDPOINTS: [(&str, &str); 9] = [
    ("/test", "Run a bounded probe test"),
    ("/ip", "Show the current outbound IP"),
    ("/logs", "Show the probe log"),
    ("/results", "Show the last test results"),
    ("/stress-test", "Start the stress loop"),
    ("/stop-stress", "Stop the stress loop"),
    ("/stress-status", "Show stress loop status"),
    ("/crash-report", "Show the last crash report"),
    ("/restart-hint", "How to get a new outbound IP"),
];

async fn index_handler(State(state): State<ApiState>) -> Html<String> {
    let items: String = ENDPOINTS
        .iter()
        .map(|(path, description)| {
            format!(
                "<li><a href=\"{path}\">GET {path}</a> - {description}</li>",
                path = path,
                description = description
            )
        })
        .collect();

    Html(format!(
        "<h1>IP Rotation Tester</h1>\
         <p><strong>Instance:</strong> {}</p>\
         <p><strong>Current time:</strong> {}</p>\
         <h2>Endpoints</h2><ul>{}</ul>",
        state.instance,
        timestamp(),
        items
    ))
}

async fn test_handler(State(state): State<ApiState>) -> Result<Json<RunReport>, ServiceError> {
    info!("Bounded test requested");
    Ok(Json(state.driver.run().await?))
}

async fn ip_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = IpResponse {
        ip: state.prober.current_ip().await,
        timestamp: timestamp(),
        instance: state.instance.clone(),
    };

    (StatusCode::OK, Json(response))
}

async fn logs_handler(State(state): State<ApiState>) -> Result<Response, ServiceError> {
    Ok(match state.store.read_log().await? {
        Some(content) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            content,
        )
            .into_response(),
        None => not_found("Logs"),
    })
}

async fn results_handler(State(state): State<ApiState>) -> Result<Response, ServiceError> {
    Ok(match state.store.read_results().await? {
        Some(results) => Json(results).into_response(),
        None => not_found("Results"),
    })
}

async fn crash_report_handler(State(state): State<ApiState>) -> Result<Response, ServiceError> {
    Ok(match state.store.read_crash_report().await? {
        Some(report) => Json(report).into_response(),
        None => not_found("Crash report"),
    })
}

async fn stress_start_handler(State(state): State<ApiState>) -> Response {
    match state.stress.start().await {
        StartOutcome::Started { run_id, initial_ip } => Json(StressStarted {
            message: "Stress test started, see logs",
            initial_ip,
            run_id,
        })
        .into_response(),
        StartOutcome::AlreadyRunning { request_count } => Json(StressRejected {
            error: "Stress test already running",
            message: "Wait for it to finish or stop it via /stop-stress",
            request_count,
        })
        .into_response(),
    }
}

async fn stress_stop_handler(State(state): State<ApiState>) -> Json<StressStopped> {
    Json(match state.stress.stop().await {
        StopOutcome::Stopped { request_count } => StressStopped {
            message: "Stress test stopped",
            was_running: true,
            request_count,
        },
        StopOutcome::NotRunning { request_count } => StressStopped {
            message: "Stress test was not running",
            was_running: false,
            request_count,
        },
    })
}

async fn stress_status_handler(State(state): State<ApiState>) -> Json<StressStatus> {
    Json(state.stress.status().await)
}

async fn restart_hint_handler() -> Json<RestartHint> {
    Json(RestartHint {
        message: "To rotate the outbound IP, restart the instance:",
        methods: [
            "heroku restart --app YOUR_APP_NAME",
            "heroku ps:restart --app YOUR_APP_NAME",
            "Heroku Dashboard -> More -> Restart all dynos",
        ],
        note: "The outbound IP changes after a restart",
    })
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/test", get(test_handler))
        .route("/ip", get(ip_handler))
        .route("/logs", get(logs_handler))
        .route("/results", get(results_handler))
        .route("/stress-test", get(stress_start_handler))
        .route("/stop-stress", get(stress_stop_handler))
        .route("/stress-status", get(stress_status_handler))
        .route("/crash-report", get(crash_report_handler))
        .route("/restart-hint", get(restart_hint_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_http_server(
    config: &HttpConfig,
    state: ApiState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ServiceError> {
    let app = router(state);

    let addr = format!("{}:{}", config.bind_addr, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| InitializationError::server(format!("Failed to bind {}: {}", addr, e)))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| InitializationError::server(e.to_string()))?;

    Ok(())
}
