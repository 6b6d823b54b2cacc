use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::types::{
    Direction, GameSettings, MazeProgress, MazeResponse, MoveOutcome, ProgressResponse,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("maze service returned status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("move request timed out after {0} ms")]
    Timeout(u64),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("session not found")]
    SessionNotFound,
    #[error("unknown maze: {0}")]
    UnknownMaze(String),
}

/// Remote maze service contract.
///
/// The service owns maze layout and move legality; the engine only consumes
/// its answers.
#[async_trait]
pub trait MazeService: Send + Sync {
    async fn start_maze(&self, user_id: &str, maze_id: &str)
        -> Result<MazeProgress, ServiceError>;

    async fn get_maze(&self, maze_id: &str, user_id: &str) -> Result<MazeResponse, ServiceError>;

    async fn get_user_progress(
        &self,
        maze_id: &str,
        user_id: &str,
    ) -> Result<ProgressResponse, ServiceError>;

    async fn move_in_maze(
        &self,
        user_id: &str,
        maze_id: &str,
        direction: Direction,
    ) -> Result<MoveOutcome, ServiceError>;

    async fn get_game_settings(&self, user_id: &str) -> Result<GameSettings, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the corn-maze REST service.
#[derive(Clone, Debug)]
pub struct HttpMazeService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMazeService {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ServiceError::InvalidResponse(err.to_string()));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        match status.as_u16() {
            404 if message.contains("session") => Err(ServiceError::SessionNotFound),
            404 => Err(ServiceError::UnknownMaze(message)),
            code => Err(ServiceError::Status { code, message }),
        }
    }
}

#[async_trait]
impl MazeService for HttpMazeService {
    async fn start_maze(
        &self,
        user_id: &str,
        maze_id: &str,
    ) -> Result<MazeProgress, ServiceError> {
        let response = self
            .client
            .post(self.url("/api/corn-maze/start"))
            .json(&json!({ "userId": user_id, "mazeId": maze_id }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_maze(&self, maze_id: &str, user_id: &str) -> Result<MazeResponse, ServiceError> {
        let response = self
            .client
            .get(self.url("/api/corn-maze/maze"))
            .query(&[("mazeId", maze_id), ("userId", user_id)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_user_progress(
        &self,
        maze_id: &str,
        user_id: &str,
    ) -> Result<ProgressResponse, ServiceError> {
        let response = self
            .client
            .get(self.url("/api/corn-maze/progress"))
            .query(&[("mazeId", maze_id), ("userId", user_id)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn move_in_maze(
        &self,
        user_id: &str,
        maze_id: &str,
        direction: Direction,
    ) -> Result<MoveOutcome, ServiceError> {
        let response = self
            .client
            .post(self.url("/api/corn-maze/move"))
            .json(&json!({
                "userId": user_id,
                "mazeId": maze_id,
                "direction": direction.as_str(),
            }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_game_settings(&self, user_id: &str) -> Result<GameSettings, ServiceError> {
        let response = self
            .client
            .get(self.url("/api/corn-maze/settings"))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Self::decode(response).await
    }
}
