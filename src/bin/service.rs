use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use corn_maze_engine::local_service::{LocalMazeService, LocalMazeServiceOptions};
use corn_maze_engine::service::{MazeService, ServiceError};
use corn_maze_engine::types::Direction;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

type SharedService = Arc<LocalMazeService>;

#[derive(Debug, Deserialize)]
struct StartRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "mazeId")]
    maze_id: String,
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "mazeId")]
    maze_id: String,
    direction: String,
}

#[derive(Debug, Deserialize)]
struct MazeQuery {
    #[serde(rename = "mazeId")]
    maze_id: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct SettingsQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let service: SharedService =
        Arc::new(LocalMazeService::new(LocalMazeServiceOptions::default()));
    info!(mazes = ?service.maze_ids(), "corn-maze dev service starting");

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/corn-maze/start", post(start_handler))
        .route("/api/corn-maze/maze", get(maze_handler))
        .route("/api/corn-maze/progress", get(progress_handler))
        .route("/api/corn-maze/move", post(move_handler))
        .route("/api/corn-maze/settings", get(settings_handler))
        .with_state(service);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind service socket");
    info!(%bind_addr, "listening");
    axum::serve(listener, app)
        .await
        .expect("service runtime failed");
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn start_handler(
    State(service): State<SharedService>,
    Json(request): Json<StartRequest>,
) -> impl IntoResponse {
    match service.start_maze(&request.user_id, &request.maze_id).await {
        Ok(progress) => (StatusCode::OK, Json(json!(progress))),
        Err(err) => error_response(err),
    }
}

async fn maze_handler(
    State(service): State<SharedService>,
    Query(query): Query<MazeQuery>,
) -> impl IntoResponse {
    match service.get_maze(&query.maze_id, &query.user_id).await {
        Ok(response) => (StatusCode::OK, Json(json!(response))),
        Err(err) => error_response(err),
    }
}

async fn progress_handler(
    State(service): State<SharedService>,
    Query(query): Query<MazeQuery>,
) -> impl IntoResponse {
    match service.get_user_progress(&query.maze_id, &query.user_id).await {
        Ok(response) => (StatusCode::OK, Json(json!(response))),
        Err(err) => error_response(err),
    }
}

async fn move_handler(
    State(service): State<SharedService>,
    Json(request): Json<MoveRequest>,
) -> impl IntoResponse {
    let Some(direction) = Direction::parse(&request.direction) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "invalid direction" })),
        );
    };
    match service
        .move_in_maze(&request.user_id, &request.maze_id, direction)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(json!(outcome))),
        Err(err) => error_response(err),
    }
}

async fn settings_handler(
    State(service): State<SharedService>,
    Query(query): Query<SettingsQuery>,
) -> impl IntoResponse {
    match service.get_game_settings(&query.user_id).await {
        Ok(settings) => (StatusCode::OK, Json(json!(settings))),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        ServiceError::SessionNotFound | ServiceError::UnknownMaze(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "message": err.to_string() })))
}
