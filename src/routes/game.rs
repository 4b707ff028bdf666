use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::catalog::RoundSummary,
    error::AppError,
    services::{action_service, catalog_service},
    state::{SharedState, game::GameState},
};

/// Routes reading and driving the board.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/state", get(current_state))
        .route("/actions", post(submit_action))
        .route("/catalog", get(list_catalog))
        .route("/catalog/{index}/load", post(load_catalog_round))
}

/// Return this replica's current state.
#[utoipa::path(
    get,
    path = "/state",
    tag = "game",
    responses((status = 200, description = "Current game state", body = GameState))
)]
pub async fn current_state(State(state): State<SharedState>) -> Json<GameState> {
    Json(GameState::clone(&*state.current().await))
}

/// Apply a host command. Unusable commands are ignored and the unchanged state is returned.
#[utoipa::path(
    post,
    path = "/actions",
    tag = "game",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Command tagged by `type`, e.g. {\"type\":\"reveal\",\"index\":2}"
    ),
    responses(
        (status = 200, description = "State after the command", body = GameState),
        (status = 409, description = "This replica is a display")
    )
)]
pub async fn submit_action(
    State(state): State<SharedState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<GameState>, AppError> {
    let next = action_service::submit(&state, body).await?;
    Ok(Json(GameState::clone(&*next)))
}

/// List the round catalog.
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "game",
    responses((status = 200, description = "Rounds available to load", body = [RoundSummary]))
)]
pub async fn list_catalog(State(state): State<SharedState>) -> Json<Vec<RoundSummary>> {
    Json(catalog_service::list_rounds(&state))
}

/// Copy a catalog round onto the board.
#[utoipa::path(
    post,
    path = "/catalog/{index}/load",
    tag = "game",
    params(("index" = usize, Path, description = "Position of the round in the catalog")),
    responses(
        (status = 200, description = "Round loaded", body = GameState),
        (status = 404, description = "No round at this index"),
        (status = 409, description = "This replica is a display")
    )
)]
pub async fn load_catalog_round(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<GameState>, AppError> {
    let next = action_service::load_catalog_round(&state, index).await?;
    Ok(Json(GameState::clone(&*next)))
}
