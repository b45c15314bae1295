use std::sync::Arc;
use tokio::sync::Mutex;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;

use djamms_core::client::VenueClient;
use djamms_core::types::{DenyReason, PlayerStateSnapshot, RenewOutcome};

use crate::handlers::*;

pub type AppState = Arc<Mutex<VenueClient>>;

pub async fn run(host: &str, port: u16, storage: &str) {
    let client = create_client(storage);
    let state: AppState = Arc::new(Mutex::new(client));

    // NOTE: Rate limiting should be handled at the infrastructure level
    // (nginx, envoy, cloud load balancer) for production deployments.

    let app = Router::new()
        // Health is always open (no auth)
        .route("/health", get(health))
        // Protected routes
        .route("/venues/{venue_id}/master", post(request_master))
        .route("/venues/{venue_id}/master", get(current_master))
        .route("/venues/{venue_id}/master/{device_id}", delete(release_master))
        .route(
            "/venues/{venue_id}/master/{device_id}/heartbeat",
            post(heartbeat),
        )
        .route("/venues/{venue_id}/commands", post(issue_command))
        .route("/venues/{venue_id}/commands", get(pending_commands))
        .route("/commands/{command_id}/executed", post(mark_executed))
        .route("/venues/{venue_id}/state", put(publish_state))
        .route("/venues/{venue_id}/state", get(latest_state))
        .route("/sweep", post(sweep))
        .layer(middleware::from_fn(auth_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", host, port);

    if std::env::var("DJAMMS_API_KEY").is_ok() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No DJAMMS_API_KEY set — server is open (dev mode)");
    }

    tracing::info!("🎵 DJAMMS coordination server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

// ─── Auth Middleware ────────────────────────────────────────────────────────

async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // If no API key is configured, allow all requests (dev mode)
    let expected_key = match std::env::var("DJAMMS_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => return Ok(next.run(request).await),
    };

    // Always allow health check without auth
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    // Check the Authorization header
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth_header.strip_prefix("Bearer ").unwrap_or("");

    if token == expected_key {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("🚫 Unauthorized request to {}", request.uri().path());
        Err(StatusCode::UNAUTHORIZED)
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn request_master(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
    Json(req): Json<RequestMasterBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": e,
            })),
        );
    }

    let mut client = state.lock().await;
    let decision = client.request_master(&venue_id, &req.device_id);

    match &decision.reason {
        None => {
            tracing::info!(
                venue_id = %venue_id,
                device_id = %req.device_id,
                grant = ?decision.grant,
                "Master granted"
            );
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "success": true,
                    "data": decision,
                })),
            )
        }
        Some(DenyReason::MasterActive {
            holder_device,
            heartbeat_at,
        }) => {
            tracing::info!(
                venue_id = %venue_id,
                device_id = %req.device_id,
                holder = %holder_device,
                "Master denied"
            );
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "success": false,
                    "reason": "MASTER_ACTIVE",
                    "current_master": {
                        "device_id": holder_device,
                        "heartbeat_at": heartbeat_at,
                    },
                })),
            )
        }
        Some(DenyReason::NetworkError { detail }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "reason": "NETWORK_ERROR",
                "error": detail,
            })),
        ),
    }
}

async fn current_master(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<MasterInfo>>) {
    let client = state.lock().await;
    match client.current_master(&venue_id) {
        Ok(Some(lease)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(MasterInfo::from_lease(&lease))),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!(
                "No master record for venue '{}'",
                venue_id
            ))),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(e.to_string())),
        ),
    }
}

async fn release_master(
    State(state): State<AppState>,
    Path((venue_id, device_id)): Path<(String, String)>,
) -> Json<ApiResponse<String>> {
    let mut client = state.lock().await;
    match client.release_master(&venue_id, &device_id) {
        Ok(true) => {
            tracing::info!(venue_id = %venue_id, device_id = %device_id, "Master released");
            Json(ApiResponse::ok(format!(
                "Venue '{}' released by '{}'",
                venue_id, device_id
            )))
        }
        Ok(false) => Json(ApiResponse::<String>::err(format!(
            "Device '{}' does not hold venue '{}'",
            device_id, venue_id
        ))),
        Err(e) => Json(ApiResponse::<String>::err(e.to_string())),
    }
}

async fn heartbeat(
    State(state): State<AppState>,
    Path((venue_id, device_id)): Path<(String, String)>,
) -> (StatusCode, Json<ApiResponse<HeartbeatResponse>>) {
    let mut client = state.lock().await;
    match client.heartbeat(&venue_id, &device_id) {
        Ok(RenewOutcome::Renewed { expires_at }) => (
            StatusCode::OK,
            Json(ApiResponse::ok(HeartbeatResponse {
                renewed: true,
                expires_at: Some(expires_at),
                holder_device: None,
            })),
        ),
        Ok(RenewOutcome::LostToPeer { holder_device }) => {
            tracing::info!(
                venue_id = %venue_id,
                device_id = %device_id,
                holder = %holder_device,
                "Heartbeat rejected, venue held elsewhere"
            );
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::ok(HeartbeatResponse {
                    renewed: false,
                    expires_at: None,
                    holder_device: Some(holder_device),
                })),
            )
        }
        Ok(RenewOutcome::NoLease) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!(
                "No renewable lease for venue '{}'",
                venue_id
            ))),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(e.to_string())),
        ),
    }
}

async fn issue_command(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
    Json(req): Json<IssueCommandBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": e,
            })),
        );
    }

    let mut client = state.lock().await;
    match client.issue_command(&venue_id, req.command, &req.issued_by) {
        Ok(command) => {
            tracing::info!(
                venue_id = %venue_id,
                command_id = %command.id,
                issued_by = %command.issued_by,
                "Command issued"
            );
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "success": true,
                    "data": command,
                })),
            )
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

async fn pending_commands(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let client = state.lock().await;
    match client.pending_commands(&venue_id) {
        Ok(commands) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": commands,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

async fn mark_executed(
    State(state): State<AppState>,
    Path(command_id): Path<String>,
    Json(req): Json<MarkExecutedBody>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    if let Err(e) = req.validate() {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e)));
    }

    let mut client = state.lock().await;
    match client.mark_executed(&command_id, &req.device_id) {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::ok(format!("Command '{}' executed", command_id))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!(
                "Command '{}' not found or already executed",
                command_id
            ))),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(e.to_string())),
        ),
    }
}

async fn publish_state(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
    Json(req): Json<PublishStateBody>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    if let Err(e) = req.validate() {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e)));
    }

    let snapshot = PlayerStateSnapshot {
        venue_id: venue_id.clone(),
        now_playing: req.now_playing,
        is_playing: req.is_playing,
        volume: req.volume,
        last_updated: 0, // stamped by the client
        updated_by: req.device_id.clone(),
    };

    let mut client = state.lock().await;
    match client.publish_state(snapshot) {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::ok(format!("State published for '{}'", venue_id))),
        ),
        Ok(false) => {
            tracing::info!(
                venue_id = %venue_id,
                device_id = %req.device_id,
                "Stale publish rejected"
            );
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::err(format!(
                    "Device '{}' does not hold the live lease for '{}'",
                    req.device_id, venue_id
                ))),
            )
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(e.to_string())),
        ),
    }
}

async fn latest_state(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let client = state.lock().await;
    match client.latest_state(&venue_id) {
        Ok(Some(snapshot)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": snapshot,
            })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("No snapshot for venue '{}'", venue_id),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

async fn sweep(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut client = state.lock().await;
    match client.sweep() {
        Ok(report) => {
            tracing::info!(
                leases_expired = report.leases_expired,
                commands_purged = report.commands_purged,
                "Maintenance sweep complete"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "data": report,
                })),
            )
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

// ─── Storage Backend Selection ──────────────────────────────────────────────

fn create_client(storage: &str) -> VenueClient {
    if storage == "memory" {
        tracing::info!("💾 Storage backend: in-memory (venue state will not persist)");
        VenueClient::new()
    } else if let Some(path) = storage.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            tracing::info!("💾 Storage backend: SQLite ({})", path);
            match VenueClient::with_sqlite(path) {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!("Failed to open SQLite: {}. Falling back to in-memory.", e);
                    VenueClient::new()
                }
            }
        }
        #[cfg(not(feature = "sqlite"))]
        {
            tracing::error!(
                "SQLite storage requested but `sqlite` feature is not enabled. \
                 Rebuild with: cargo build --features sqlite"
            );
            tracing::warn!("Falling back to in-memory storage.");
            let _ = path;
            VenueClient::new()
        }
    } else {
        tracing::error!(
            "Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'", storage
        );
        tracing::warn!("Falling back to in-memory storage.");
        VenueClient::new()
    }
}
