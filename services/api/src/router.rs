//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ConnectionStatus, CreateConnectionPayload, ErrorResponse, SendMessagePayload, TurnResponse,
    },
    state::AppState,
};

use axum::{Router, routing::post};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_connection,
        handlers::connection_status,
        handlers::close_connection,
        handlers::send_message,
        handlers::send_once,
    ),
    components(
        schemas(CreateConnectionPayload, SendMessagePayload, TurnResponse, ConnectionStatus, ErrorResponse)
    ),
    tags(
        (name = "Preceptor API", description = "Simulated-patient conversation sessions for clinical training")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/sessions/{id}/connection",
            post(handlers::create_connection)
                .get(handlers::connection_status)
                .delete(handlers::close_connection),
        )
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/agents/{agent_id}/messages", post(handlers::send_once))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
