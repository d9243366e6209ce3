use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{self, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::RelayError;
use crate::profile::{NewProfile, Profile, ProfileContext, ProfileUpdate};
use crate::relay::{ChatRelay, ChatRequest, SubscribeRelay, SubscribeRequest};

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state for the HTTP API.
pub struct AppState {
    pub config: Config,
    pub chat: ChatRelay,
    pub subscribe: SubscribeRelay,
    /// Profile state of the serving session.
    pub profiles: Mutex<ProfileContext>,
}

impl AppState {
    pub fn new(
        config: Config,
        chat: ChatRelay,
        subscribe: SubscribeRelay,
        profiles: ProfileContext,
    ) -> Self {
        Self {
            config,
            chat,
            subscribe,
            profiles: Mutex::new(profiles),
        }
    }

    /// Create AppState with relays auto-configured from config.
    pub fn from_config(config: Config, profiles: ProfileContext) -> Self {
        let chat = ChatRelay::from_config(&config);
        let subscribe = SubscribeRelay::from_config(&config);
        Self::new(config, chat, subscribe, profiles)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.message())
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn bad_body(rejection: JsonRejection) -> Response {
    warn!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, "Invalid request body")
}

fn profile_not_found(id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, &format!("Profile not found: {}", id))
}

/// Profile collection plus the active profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesView {
    pub profiles: Vec<Profile>,
    pub current_profile: Option<Profile>,
}

impl ProfilesView {
    fn of(ctx: &ProfileContext) -> Self {
        Self {
            profiles: ctx.profiles().to_vec(),
            current_profile: ctx.current_profile().cloned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectProfileRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build: String,
    pub demo: bool,
}

/// Create the axum Router with all API routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE]);

    Router::new()
        // Relays
        .route("/api/chat", post(handle_chat))
        .route("/api/subscribe", post(handle_subscribe))
        // Profiles
        .route("/api/profiles", get(handle_list_profiles).post(handle_create_profile))
        .route("/api/profiles/current", put(handle_select_profile))
        .route(
            "/api/profiles/{id}",
            patch(handle_update_profile).delete(handle_delete_profile),
        )
        // Health
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// POST /api/chat: Profile-aware chat relay
async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    match state.chat.handle(req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/subscribe: Waitlist signup
async fn handle_subscribe(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    match state.subscribe.handle(req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/profiles: Collection and current profile
async fn handle_list_profiles(State(state): State<Arc<AppState>>) -> Json<ProfilesView> {
    let ctx = state.profiles.lock().await;
    Json(ProfilesView::of(&ctx))
}

/// POST /api/profiles: Create a profile
async fn handle_create_profile(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewProfile>, JsonRejection>,
) -> Response {
    let Json(fields) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let profile = state.profiles.lock().await.create_profile(fields);
    info!("Created profile {}", profile.id);
    (StatusCode::CREATED, Json(profile)).into_response()
}

/// PATCH /api/profiles/{id}: Partial update
async fn handle_update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response {
    let Json(update) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let mut ctx = state.profiles.lock().await;
    let is_current = ctx.current_profile().is_some_and(|p| p.id == id);
    if ctx.find(&id).is_none() && !is_current {
        return profile_not_found(&id);
    }
    ctx.update_profile(&id, &update);
    Json(ProfilesView::of(&ctx)).into_response()
}

/// DELETE /api/profiles/{id}
async fn handle_delete_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let mut ctx = state.profiles.lock().await;
    let is_current = ctx.current_profile().is_some_and(|p| p.id == id);
    if ctx.find(&id).is_none() && !is_current {
        return profile_not_found(&id);
    }
    if ctx.delete_profile(&id) {
        info!("Deleted profile {}", id);
    }
    Json(ProfilesView::of(&ctx)).into_response()
}

/// PUT /api/profiles/current: Switch the active profile
async fn handle_select_profile(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SelectProfileRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let mut ctx = state.profiles.lock().await;
    let Some(profile) = ctx.find(&req.id).cloned() else {
        return profile_not_found(&req.id);
    };
    ctx.set_current_profile(profile);
    Json(ProfilesView::of(&ctx)).into_response()
}

/// GET /health: Health check
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        build: crate::GIT_HASH.to_string(),
        demo: state.chat.is_demo(),
    })
}

/// Start the HTTP server on the given address.
pub async fn serve(addr: &str, state: Arc<AppState>) -> crate::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
