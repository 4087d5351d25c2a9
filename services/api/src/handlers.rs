//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests that manage
//! agent connections and drive conversational turns. It uses `utoipa` doc
//! comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use preceptor_convai::{ConvAiError, DEFAULT_TURN_TIMEOUT, TurnReply};

use crate::{
    models::{
        ConnectionStatus, CreateConnectionPayload, ErrorResponse, SendMessagePayload, TurnResponse,
    },
    state::AppState,
};

pub enum ApiError {
    NotFound(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Maps core conversation errors onto API responses.
fn convai_error(err: ConvAiError) -> ApiError {
    match err {
        ConvAiError::NoActiveConnection(_) => ApiError::NotFound(err.to_string()),
        ConvAiError::Open(_) | ConvAiError::Transport(_) | ConvAiError::NoReply => {
            ApiError::BadGateway(err.to_string())
        }
        ConvAiError::Encode(_) => ApiError::InternalServerError(err.into()),
    }
}

fn turn_response(reply: TurnReply) -> TurnResponse {
    TurnResponse {
        text: reply.text,
        audio_base_64: if reply.audio.is_empty() {
            None
        } else {
            Some(BASE64.encode(&reply.audio))
        },
    }
}

fn turn_timeout(timeout_secs: Option<u64>) -> Duration {
    timeout_secs.map_or(DEFAULT_TURN_TIMEOUT, Duration::from_secs)
}

/// Open (or replace) a session's connection to its simulated-patient agent.
#[utoipa::path(
    post,
    path = "/sessions/{id}/connection",
    request_body = CreateConnectionPayload,
    responses(
        (status = 201, description = "Connection established"),
        (status = 502, description = "Agent service unreachable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CreateConnectionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .registry
        .create_connection(&id, &payload.agent_id, &payload.signed_url, payload.text_only)
        .await
        .map_err(convai_error)?;

    Ok(StatusCode::CREATED)
}

/// Report whether a session has a usable agent connection.
#[utoipa::path(
    get,
    path = "/sessions/{id}/connection",
    responses(
        (status = 200, description = "Connection status", body = ConnectionStatus)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn connection_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ConnectionStatus> {
    let connection = state.registry.connection(&id).await;
    let connection = connection.filter(|c| c.is_active());
    Json(ConnectionStatus {
        connected: connection.is_some(),
        message_count: connection.map(|c| c.message_count()),
    })
}

/// Close a session's agent connection, if any.
#[utoipa::path(
    delete,
    path = "/sessions/{id}/connection",
    responses(
        (status = 204, description = "Connection closed (idempotent)")
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn close_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.registry.close_connection(&id).await;
    StatusCode::NO_CONTENT
}

/// Run one conversational turn on a session's connection.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "The agent's reply", body = TurnResponse),
        (status = 404, description = "No active connection for the session", body = ErrorResponse),
        (status = 502, description = "Agent stream failed mid-turn", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let reply = state
        .registry
        .send_message(&id, &payload.text, turn_timeout(payload.timeout_secs))
        .await
        .map_err(convai_error)?;

    Ok(Json(turn_response(reply)))
}

/// One-shot turn with a public agent, without a persistent session connection.
#[utoipa::path(
    post,
    path = "/agents/{agent_id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "The agent's reply", body = TurnResponse),
        (status = 502, description = "Agent unreachable or silent", body = ErrorResponse)
    ),
    params(
        ("agent_id" = String, Path, description = "Agent ID")
    )
)]
pub async fn send_once(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let reply = state
        .registry
        .send_once(&agent_id, &payload.text, turn_timeout(payload.timeout_secs))
        .await
        .map_err(convai_error)?;

    Ok(Json(turn_response(reply)))
}
