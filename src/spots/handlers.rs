use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{error::AppResult, spots::repo::{self, Spot}, state::AppState};

pub fn spot_routes() -> Router<AppState> {
    Router::new().route("/spots", get(list_spots))
}

/// Reference data; no token required.
#[instrument(skip(state))]
pub async fn list_spots(State(state): State<AppState>) -> AppResult<Json<Vec<Spot>>> {
    Ok(Json(repo::list_all(&state.db).await?))
}
