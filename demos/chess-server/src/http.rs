//! HTTP API: room creation and health check.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use knightwire::prelude::{CreateGameRequest, CreateGameResponse, ServerHandle};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::validator::ShakmatyValidator;

pub type ChessHandle = ServerHandle<ShakmatyValidator>;

type ApiError = (StatusCode, Json<Value>);

pub fn router(handle: ChessHandle) -> Router {
    Router::new()
        .route("/api/create-game", post(create_game))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(handle)
}

/// Creates a room. The body is optional; an empty body means no color
/// preference.
pub async fn create_game(
    State(handle): State<ChessHandle>,
    body: Bytes,
) -> Result<Json<CreateGameResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateGameRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("invalid request body: {e}")})),
            )
        })?
    };

    match handle.create_game(request).await {
        Ok(created) => Ok(Json(created)),
        Err(e) => {
            tracing::error!(error = %e, "failed to create game");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": e.to_string()})),
            ))
        }
    }
}

/// Health check endpoint
pub async fn health_check(State(handle): State<ChessHandle>) -> Json<Value> {
    Json(json!({"status": "ok", "rooms": handle.room_count().await}))
}
