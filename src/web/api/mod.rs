pub mod animations;
pub mod events;
pub mod status;
pub mod zones;

use crate::context::CoreContext;
use crate::error::CoreError;
use crate::services::{AnimationService, AppStateService, ZoneService};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared state behind every API handler.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreContext>,
    pub zones: Arc<ZoneService>,
    pub animations: Arc<AnimationService>,
    pub app: Arc<AppStateService>,
    pub event_tx: broadcast::Sender<String>,
}

impl ApiContext {
    pub fn new(
        core: Arc<CoreContext>,
        zones: Arc<ZoneService>,
        animations: Arc<AnimationService>,
        app: Arc<AppStateService>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let context = Self {
            core,
            zones,
            animations,
            app,
            event_tx,
        };
        events::forward_bus_events(&context);
        context
    }
}

/// API error envelope: the core error kind plus a human-readable message.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::IllegalState(_) => StatusCode::CONFLICT,
            CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Assemble the API router.
pub fn router(context: ApiContext) -> Router {
    Router::new()
        .route("/api/zones", get(zones::get_zones))
        .route("/api/zones/:zone", get(zones::get_zone))
        .route("/api/zones/:zone/color", put(zones::update_color))
        .route("/api/zones/:zone/brightness", put(zones::update_brightness))
        .route("/api/zones/:zone/render-mode", put(zones::update_render_mode))
        .route("/api/zones/:zone/power", put(zones::update_power))
        .route("/api/animations", get(animations::get_animations))
        .route("/api/animation/start", post(animations::start_animation))
        .route("/api/animation/stop", post(animations::stop_animation))
        .route(
            "/api/animation/parameters/:param",
            put(animations::update_parameter),
        )
        .route("/api/status", get(status::get_status))
        .route("/api/events", get(events::event_stream))
        .with_state(context)
}
