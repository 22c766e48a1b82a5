use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::services::AuthUser,
    error::AppResult,
    recycle::{
        dto::{SubmitEntryRequest, SubmitEntryResponse, UpdateEntryRequest},
        repo_types::RecycleEntry,
        services,
    },
    state::AppState,
};

pub fn recycle_routes() -> Router<AppState> {
    Router::new()
        .route("/recycle", get(list_entries).post(submit_entry))
        .route("/recycle/:id", put(update_entry))
}

#[instrument(skip(state, payload))]
pub async fn submit_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SubmitEntryRequest>,
) -> AppResult<(StatusCode, Json<SubmitEntryResponse>)> {
    let out = services::submit_entry(&state.db, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<RecycleEntry>>> {
    Ok(Json(services::list_entries(&state.db, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEntryRequest>,
) -> AppResult<Json<RecycleEntry>> {
    Ok(Json(services::update_entry(&state.db, user_id, id, payload).await?))
}
